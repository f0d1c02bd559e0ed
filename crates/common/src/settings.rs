use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use config::{Config, ConfigError, Environment, File};
use rand::RngCore;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::warn;

pub const ENV_PREFIX: &str = "CRASH_REPORTER";

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_MINIDUMP_SIZE: u64 = 2_000_000;
const DEFAULT_PORT: u16 = 2000;
const DEFAULT_TOKEN_VALIDITY_IN_MINUTES: i64 = 60 * 24;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub port: u16,
    pub url: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            url: "http://your-domain.com".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
    pub directory: String,
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            directory: String::new(),
            level: DEFAULT_LOG_LEVEL.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub upload_dir: String,
    pub download_dir: String,
    pub max_minidump_size: u64,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            upload_dir: "upload-logs/".into(),
            download_dir: "upload-logs/".into(),
            max_minidump_size: DEFAULT_MAX_MINIDUMP_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Database {
    pub url: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub github_oauth_enabled: bool,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub jwt_secret: String,
    pub token_validity_in_minutes: i64,
    pub local_auth_enabled: bool,
    pub local_register_enabled: bool,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            github_oauth_enabled: true,
            github_client_id: String::new(),
            github_client_secret: String::new(),
            jwt_secret: String::new(),
            token_validity_in_minutes: DEFAULT_TOKEN_VALIDITY_IN_MINUTES,
            local_auth_enabled: true,
            local_register_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Mail {
    pub host: String,
    pub pool: bool,
    pub port: u16,
    pub secure: bool,
    pub auth_user: String,
    pub auth_pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub storage: Storage,
    pub database: Database,
    pub auth: Auth,
    pub mail: Mail,
}

/// Flat view of the configuration, one key per `CRASH_REPORTER_*` variable.
///
/// Flags are on only for `true`; anything else reads as off. Numbers take
/// their leading digits and fall back to the default when there are none.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(deserialize_with = "lenient_int")]
    port: Option<u16>,
    url: String,
    log_level: String,
    log_directory: String,
    log_upload_dir: String,
    log_app_crash_dir: String,
    #[serde(deserialize_with = "lenient_int")]
    max_minidump_size: Option<u64>,
    database_url: String,
    database_login: String,
    database_password: String,
    #[serde(deserialize_with = "lenient_bool")]
    auth_github_oauth_enabled: bool,
    auth_github_client_id: String,
    auth_github_client_secret: String,
    auth_jwt_secret: String,
    #[serde(deserialize_with = "lenient_int")]
    auth_token_validity_in_minutes: Option<i64>,
    #[serde(deserialize_with = "lenient_bool")]
    auth_local_auth_enabled: bool,
    #[serde(deserialize_with = "lenient_bool")]
    local_register_enabled: bool,
    mail_host: String,
    #[serde(deserialize_with = "lenient_bool")]
    mail_pool: bool,
    #[serde(deserialize_with = "lenient_int")]
    mail_port: Option<u16>,
    #[serde(deserialize_with = "lenient_bool")]
    mail_secure: bool,
    mail_auth_user: String,
    mail_auth_pass: String,
    mail_from: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Bool(value) => value,
        Loose::Text(value) => value.trim().eq_ignore_ascii_case("true"),
        Loose::Int(_) | Loose::Float(_) => false,
    })
}

fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = match Loose::deserialize(deserializer)? {
        Loose::Int(value) => Some(value),
        Loose::Float(value) => Some(value.trunc() as i64),
        Loose::Text(value) => leading_int(&value),
        Loose::Bool(_) => None,
    };
    Ok(value.and_then(|value| T::try_from(value).ok()))
}

fn or_default<T: std::fmt::Display>(value: Option<T>, key: &str, default: T) -> T {
    value.unwrap_or_else(|| {
        warn!("Invalid value for {key}, using {default}");
        default
    })
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let level = raw.log_level.to_ascii_lowercase();
        let level = if LOG_LEVELS.contains(&level.as_str()) {
            level
        } else {
            DEFAULT_LOG_LEVEL.to_string()
        };

        let download_dir = if raw.log_app_crash_dir.is_empty() {
            raw.log_upload_dir.clone()
        } else {
            raw.log_app_crash_dir
        };

        Settings {
            server: Server {
                port: or_default(raw.port, "port", DEFAULT_PORT),
                url: raw.url.trim_end_matches('/').to_string(),
            },
            logger: Logger {
                directory: raw.log_directory,
                level,
            },
            storage: Storage {
                upload_dir: raw.log_upload_dir,
                download_dir,
                max_minidump_size: or_default(
                    raw.max_minidump_size,
                    "max_minidump_size",
                    DEFAULT_MAX_MINIDUMP_SIZE,
                ),
            },
            database: Database {
                url: raw.database_url,
                login: raw.database_login,
                password: raw.database_password,
            },
            auth: Auth {
                github_oauth_enabled: raw.auth_github_oauth_enabled,
                github_client_id: raw.auth_github_client_id,
                github_client_secret: raw.auth_github_client_secret,
                jwt_secret: raw.auth_jwt_secret,
                token_validity_in_minutes: or_default(
                    raw.auth_token_validity_in_minutes,
                    "auth_token_validity_in_minutes",
                    DEFAULT_TOKEN_VALIDITY_IN_MINUTES,
                ),
                local_auth_enabled: raw.auth_local_auth_enabled,
                local_register_enabled: raw.local_register_enabled,
            },
            mail: Mail {
                host: raw.mail_host,
                pool: raw.mail_pool,
                port: or_default(raw.mail_port, "mail_port", 0),
                secure: raw.mail_secure,
                auth_user: raw.mail_auth_user,
                auth_pass: raw.mail_auth_pass,
                from: raw.mail_from,
            },
        }
    }
}

impl Settings {
    /// Loads settings from `config_dir`, the process environment and the
    /// given command-line overrides, in increasing order of priority.
    pub fn load(config_dir: &str, overrides: &[(&str, String)]) -> Result<Self, ConfigError> {
        Self::load_with_env(config_dir, None, overrides)
    }

    /// Same as [`Settings::load`] but reads variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        config_dir: &str,
        env: Option<HashMap<String, String>>,
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("url", "http://your-domain.com")?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("log_directory", "")?
            .set_default("log_upload_dir", "upload-logs/")?
            .set_default("log_app_crash_dir", "")?
            .set_default("max_minidump_size", DEFAULT_MAX_MINIDUMP_SIZE)?
            .set_default("database_url", "")?
            .set_default("database_login", "")?
            .set_default("database_password", "")?
            .set_default("auth_github_oauth_enabled", true)?
            .set_default("auth_github_client_id", "")?
            .set_default("auth_github_client_secret", "")?
            .set_default("auth_jwt_secret", "")?
            .set_default(
                "auth_token_validity_in_minutes",
                DEFAULT_TOKEN_VALIDITY_IN_MINUTES,
            )?
            .set_default("auth_local_auth_enabled", true)?
            .set_default("local_register_enabled", true)?
            .set_default("mail_host", "")?
            .set_default("mail_pool", false)?
            .set_default("mail_port", 0)?
            .set_default("mail_secure", false)?
            .set_default("mail_auth_user", "")?
            .set_default("mail_auth_pass", "")?
            .set_default("mail_from", "")?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/local")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            );

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        let mut settings = Settings::from(raw);

        if settings.auth.jwt_secret.is_empty() {
            warn!("No JWT secret configured, generating a random one for this process");
            settings.auth.jwt_secret = generate_secret();
        }

        Ok(settings)
    }
}

fn generate_secret() -> String {
    let mut secret = [0u8; 48];
    rand::rng().fill_bytes(&mut secret);
    URL_SAFE_NO_PAD.encode(secret)
}
