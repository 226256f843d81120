//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP port for the monitoring service
pub const DEFAULT_PORT: u16 = 5001;

/// Default timeout for outbound classifier requests
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default event bus capacity (events buffered before old ones are dropped)
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Runtime configuration for the monitoring service
#[derive(Debug, Clone)]
pub struct MonConfig {
    /// Bind address for the HTTP listener
    pub host: String,
    /// Bind port for the HTTP listener
    pub port: u16,
    /// Root folder holding the database and uploaded audio blobs
    pub root_folder: PathBuf,
    /// Pre-shared key expected in the X-API-Key header on device routes
    pub device_api_key: String,
    /// External classification endpoint (multipart POST target)
    pub classifier_url: String,
    /// Timeout applied to each outbound classifier request
    pub classifier_timeout: Duration,
    /// Event bus channel capacity
    pub event_capacity: usize,
}

impl MonConfig {
    /// Load configuration from the environment on top of a resolved root folder.
    ///
    /// `TBVECTOR_DEVICE_API_KEY` is mandatory: device routes authenticate
    /// machine-to-machine traffic with it, and running without one would leave
    /// the upload and result endpoints open.
    pub fn load(root_folder: PathBuf, port_override: Option<u16>) -> Result<Self> {
        let host =
            std::env::var("TBVECTOR_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = match port_override {
            Some(p) => p,
            None => match std::env::var("TBVECTOR_PORT") {
                Ok(raw) => raw
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("Invalid TBVECTOR_PORT: {}", raw)))?,
                Err(_) => DEFAULT_PORT,
            },
        };

        let device_api_key = std::env::var("TBVECTOR_DEVICE_API_KEY")
            .map_err(|_| Error::Config("TBVECTOR_DEVICE_API_KEY is not set".to_string()))?;
        if device_api_key.is_empty() {
            return Err(Error::Config(
                "TBVECTOR_DEVICE_API_KEY must not be empty".to_string(),
            ));
        }

        let classifier_url = std::env::var("TBVECTOR_CLASSIFIER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8500/api/v1/classify".to_string());

        Ok(Self {
            host,
            port,
            root_folder,
            device_api_key,
            classifier_url,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        })
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("tbvector.db")
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Create the root folder (and uploads subfolder) if missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    std::fs::create_dir_all(root.join("uploads"))?;
    Ok(())
}

/// Get the configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/tbvector/config.toml first, then /etc/tbvector/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("tbvector").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/tbvector/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("tbvector").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tbvector"))
        .unwrap_or_else(|| PathBuf::from("./tbvector_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn cli_argument_wins_over_environment() {
        std::env::set_var("TBVECTOR_TEST_ROOT", "/tmp/from-env");
        let root = resolve_root_folder(Some("/tmp/from-cli"), "TBVECTOR_TEST_ROOT");
        assert_eq!(root, PathBuf::from("/tmp/from-cli"));
        std::env::remove_var("TBVECTOR_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn environment_used_when_no_cli_argument() {
        std::env::set_var("TBVECTOR_TEST_ROOT", "/tmp/from-env");
        let root = resolve_root_folder(None, "TBVECTOR_TEST_ROOT");
        assert_eq!(root, PathBuf::from("/tmp/from-env"));
        std::env::remove_var("TBVECTOR_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn load_requires_device_api_key() {
        std::env::remove_var("TBVECTOR_DEVICE_API_KEY");
        let err = MonConfig::load(PathBuf::from("/tmp/tbvector"), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[serial]
    fn load_reads_port_and_key_from_environment() {
        std::env::set_var("TBVECTOR_DEVICE_API_KEY", "secret");
        std::env::set_var("TBVECTOR_PORT", "6100");
        let config = MonConfig::load(PathBuf::from("/tmp/tbvector"), None).unwrap();
        assert_eq!(config.port, 6100);
        assert_eq!(config.device_api_key, "secret");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/tbvector/tbvector.db"));
        std::env::remove_var("TBVECTOR_DEVICE_API_KEY");
        std::env::remove_var("TBVECTOR_PORT");
    }

    #[test]
    #[serial]
    fn port_override_wins() {
        std::env::set_var("TBVECTOR_DEVICE_API_KEY", "secret");
        std::env::set_var("TBVECTOR_PORT", "6100");
        let config = MonConfig::load(PathBuf::from("/tmp/tbvector"), Some(7000)).unwrap();
        assert_eq!(config.port, 7000);
        std::env::remove_var("TBVECTOR_DEVICE_API_KEY");
        std::env::remove_var("TBVECTOR_PORT");
    }
}
