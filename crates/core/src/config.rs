use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct RocketConfig {
    pub server: ServerConfig,
    pub credentials: CredentialsConfig,
    pub realtime: RealtimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

/// Account the session authenticates as. Both fields are required so a
/// `ChatApi` implementation can log in with them; nothing in this workspace
/// prints or forwards the password itself.
#[derive(Clone, Debug)]
pub struct CredentialsConfig {
    pub login: String,
    pub password: SecretString,
}

#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    pub handshake_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Log every collaborator request and response body at debug level.
    pub debug_wire: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub handshake_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for RocketConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { host: "localhost".to_string(), port: 3000, tls: false },
            credentials: CredentialsConfig {
                login: String::new(),
                password: String::new().into(),
            },
            realtime: RealtimeConfig { handshake_timeout_ms: 10_000 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Compact,
                debug_wire: false,
            },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl RocketConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rocket.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(host) = server.host {
                self.server.host = host;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(tls) = server.tls {
                self.server.tls = tls;
            }
        }

        if let Some(credentials) = patch.credentials {
            if let Some(login) = credentials.login {
                self.credentials.login = login;
            }
            if let Some(password) = credentials.password {
                self.credentials.password = password.into();
            }
        }

        if let Some(realtime) = patch.realtime {
            if let Some(handshake_timeout_ms) = realtime.handshake_timeout_ms {
                self.realtime.handshake_timeout_ms = handshake_timeout_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
            if let Some(debug_wire) = logging.debug_wire {
                self.logging.debug_wire = debug_wire;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_value("ROCKET_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed("ROCKET_SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(tls) = env_parsed("ROCKET_SERVER_TLS")? {
            self.server.tls = tls;
        }

        if let Some(login) = env_value("ROCKET_LOGIN") {
            self.credentials.login = login;
        }
        if let Some(password) = env_value("ROCKET_PASSWORD") {
            self.credentials.password = password.into();
        }

        if let Some(timeout) = env_parsed("ROCKET_REALTIME_HANDSHAKE_TIMEOUT_MS")? {
            self.realtime.handshake_timeout_ms = timeout;
        }

        if let Some(level) =
            env_value("ROCKET_LOGGING_LEVEL").or_else(|| env_value("ROCKET_LOG_LEVEL"))
        {
            self.logging.level = level;
        }
        if let Some(format) =
            env_value("ROCKET_LOGGING_FORMAT").or_else(|| env_value("ROCKET_LOG_FORMAT"))
        {
            self.logging.format = format.parse()?;
        }
        if let Some(debug_wire) = env_parsed("ROCKET_DEBUG")? {
            self.logging.debug_wire = debug_wire;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(tls) = overrides.tls {
            self.server.tls = tls;
        }
        if let Some(login) = overrides.login {
            self.credentials.login = login;
        }
        if let Some(password) = overrides.password {
            self.credentials.password = password.into();
        }
        if let Some(handshake_timeout_ms) = overrides.handshake_timeout_ms {
            self.realtime.handshake_timeout_ms = handshake_timeout_ms;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_credentials(&self.credentials)?;
        validate_realtime(&self.realtime)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rocket.toml"), PathBuf::from("config/rocket.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${NAME}` with the value of environment variable `NAME`.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after_open[..close];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_owned() })?;
        output.push_str(&value);
        rest = &after_open[close + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    let host = server.host.trim();
    if host.is_empty() {
        return Err(ConfigError::Validation("server.host is required".to_string()));
    }
    if host.contains("://") {
        return Err(ConfigError::Validation(
            "server.host must be a bare host name; use server.tls to pick the scheme".to_string(),
        ));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_credentials(credentials: &CredentialsConfig) -> Result<(), ConfigError> {
    if credentials.login.trim().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.login is required (set ROCKET_LOGIN or [credentials].login)".to_string(),
        ));
    }
    if credentials.password.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.password is required (set ROCKET_PASSWORD or [credentials].password)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_realtime(realtime: &RealtimeConfig) -> Result<(), ConfigError> {
    if realtime.handshake_timeout_ms == 0 || realtime.handshake_timeout_ms > 120_000 {
        return Err(ConfigError::Validation(
            "realtime.handshake_timeout_ms must be in range 1..=120000".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Blank values count as unset.
fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    let Some(value) = env_value(key) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::InvalidEnvOverride { key: key.to_owned(), value }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    credentials: Option<CredentialsPatch>,
    realtime: Option<RealtimePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    host: Option<String>,
    port: Option<u16>,
    tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsPatch {
    login: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RealtimePatch {
    handshake_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
    debug_wire: Option<bool>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        interpolate_env_vars, ConfigError, ConfigOverrides, LoadOptions, LogFormat, RocketConfig,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn credential_overrides() -> ConfigOverrides {
        ConfigOverrides {
            login: Some("bot@example.com".to_string()),
            password: Some("hunter2".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ROCKET_PASSWORD", "from-env-secret");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rocket.toml");
            fs::write(
                &path,
                r#"
[server]
host = "chat.example.com"
port = 443
tls = true

[credentials]
login = "bot@example.com"
password = "${TEST_ROCKET_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                RocketConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.credentials.password.expose_secret() == "from-env-secret",
                "password should be interpolated from environment",
            )?;
            ensure(
                config.server.base_url() == "https://chat.example.com:443",
                "base url should follow tls flag",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ROCKET_PASSWORD"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROCKET_SERVER_HOST", "env.example.com");
        env::set_var("ROCKET_REALTIME_HANDSHAKE_TIMEOUT_MS", "2500");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rocket.toml");
            fs::write(
                &path,
                r#"
[server]
host = "file.example.com"
port = 8443

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = RocketConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..credential_overrides()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.host == "env.example.com", "env host should win over file")?;
            ensure(config.server.port == 8443, "file port should win over default")?;
            ensure(config.realtime.handshake_timeout_ms == 2500, "env timeout should apply")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            Ok(())
        })();

        clear_vars(&["ROCKET_SERVER_HOST", "ROCKET_REALTIME_HANDSHAKE_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROCKET_LOG_LEVEL", "warn");
        env::set_var("ROCKET_LOG_FORMAT", "json");
        env::set_var("ROCKET_DEBUG", "true");

        let result = (|| -> Result<(), String> {
            let config = RocketConfig::load(LoadOptions {
                overrides: credential_overrides(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "log level should be set from env alias")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json format should be set from env alias",
            )?;
            ensure(config.logging.debug_wire, "ROCKET_DEBUG should enable wire logging")?;
            Ok(())
        })();

        clear_vars(&["ROCKET_LOG_LEVEL", "ROCKET_LOG_FORMAT", "ROCKET_DEBUG"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROCKET_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            match RocketConfig::load(LoadOptions {
                overrides: credential_overrides(),
                ..LoadOptions::default()
            }) {
                Ok(_) => Err("expected invalid port override to fail".to_string()),
                Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                    ensure(key == "ROCKET_SERVER_PORT", "error should name the env key")
                }
                Err(other) => Err(format!("unexpected error: {other}")),
            }
        })();

        clear_vars(&["ROCKET_SERVER_PORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_without_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match RocketConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("credentials.login")
        );
        ensure(has_message, "validation failure should mention credentials.login")
    }

    #[test]
    fn host_with_scheme_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = RocketConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                host: Some("https://chat.example.com".to_string()),
                ..credential_overrides()
            },
            ..LoadOptions::default()
        });
        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("server.host")),
            "scheme in host should be rejected",
        )
    }

    #[test]
    fn password_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = RocketConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                password: Some("very-secret-password".to_string()),
                ..credential_overrides()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;
        let debug = format!("{config:?}");

        ensure(!debug.contains("very-secret-password"), "debug output should not contain password")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        ensure(config.server.base_url() == "http://localhost:3000", "default base url")
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let result = RocketConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            overrides: credential_overrides(),
        });
        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(ref missing)) if *missing == path),
            "missing required file should be reported with its path",
        )
    }

    #[test]
    fn interpolation_leaves_plain_text_and_rejects_open_braces() -> Result<(), String> {
        let plain = interpolate_env_vars("price = \"$5\" # {not a var}")
            .map_err(|err| err.to_string())?;
        ensure(plain == "price = \"$5\" # {not a var}", "text without ${ should pass through")?;

        ensure(
            matches!(
                interpolate_env_vars("password = \"${UNCLOSED"),
                Err(ConfigError::UnterminatedInterpolation)
            ),
            "an unclosed ${ should be reported",
        )
    }
}
