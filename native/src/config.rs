// Bridge settings read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

pub const DEFAULT_PIPE_NAME: &str = "x4_nvda";
const PIPE_PREFIX: &str = r"\\.\pipe\";

pub const ENV_PIPE_NAME: &str = "NVDA_BRIDGE_PIPE";
pub const ENV_DLL_DIR: &str = "NVDA_BRIDGE_DLL_DIR";
pub const ENV_SENTRY_DSN: &str = "NVDA_BRIDGE_SENTRY_DSN";
pub const ENV_SENTRY_ENVIRONMENT: &str = "SENTRY_ENVIRONMENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Pipe name as the game knows it, without the `\\.\pipe\` prefix.
    pub pipe_name: String,
    /// Extra directory searched first for the controller client.
    pub dll_dir: Option<PathBuf>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            dll_dir: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl BridgeConfig {
    /// Read settings from the process environment. Empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            pipe_name: get(ENV_PIPE_NAME).unwrap_or_else(|| DEFAULT_PIPE_NAME.to_string()),
            dll_dir: get(ENV_DLL_DIR).map(PathBuf::from),
            sentry_dsn: get(ENV_SENTRY_DSN),
            sentry_environment: get(ENV_SENTRY_ENVIRONMENT),
        }
    }

    /// Full pipe path, e.g. `\\.\pipe\x4_nvda`.
    pub fn pipe_path(&self) -> String {
        if self.pipe_name.starts_with(PIPE_PREFIX) {
            self.pipe_name.clone()
        } else {
            format!("{}{}", PIPE_PREFIX, self.pipe_name)
        }
    }
}
