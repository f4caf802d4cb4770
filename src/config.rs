use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Krishi Mitra";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_ARTIFACT_DIR: &str = "models";
pub const DEFAULT_DISEASE_TABLE: &str = "data/disease_info.json";
/// 10 MiB, enough for a phone-camera leaf photo.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,krishi_mitra=debug,tower_http=info"
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddr { var: &'static str, value: String },
    #[error("{var} must be a positive integer: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub artifact_dir: PathBuf,
    pub disease_table: PathBuf,
    pub cors_origins: CorsOrigins,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Read `KRISHI_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str, default: &str| -> Result<String, ConfigError> {
            match lookup(var) {
                Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
                Some(v) => Ok(v.trim().to_string()),
                None => Ok(default.to_string()),
            }
        };

        let addr = get("KRISHI_BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let bind_addr = addr.parse().map_err(|_| ConfigError::InvalidAddr {
            var: "KRISHI_BIND_ADDR",
            value: addr.clone(),
        })?;

        let max = get("KRISHI_MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())?;
        let max_upload_bytes = match max.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::InvalidNumber {
                    var: "KRISHI_MAX_UPLOAD_BYTES",
                    value: max,
                })
            }
        };

        let origins = get("KRISHI_CORS_ORIGINS", "*")?;
        let cors_origins = if origins == "*" {
            CorsOrigins::Any
        } else {
            let list: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if list.is_empty() {
                return Err(ConfigError::Empty {
                    var: "KRISHI_CORS_ORIGINS",
                });
            }
            CorsOrigins::List(list)
        };

        Ok(Self {
            bind_addr,
            artifact_dir: get("KRISHI_ARTIFACT_DIR", DEFAULT_ARTIFACT_DIR)?.into(),
            disease_table: get("KRISHI_DISEASE_TABLE", DEFAULT_DISEASE_TABLE)?.into(),
            cors_origins,
            max_upload_bytes,
        })
    }
}
