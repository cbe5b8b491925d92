pub mod channel;
pub mod message;
pub mod thread;
