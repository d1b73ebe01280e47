use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pricing::{BASIS_POINTS, DEFAULT_TAX_RATE_BPS};

pub const DB_FILE_NAME: &str = "dispensary.db";
pub const CONFIG_FILE_NAME: &str = "dispensary.toml";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub session_ttl_hours: i64,
    /// Sales tax in basis points (1000 = 10%).
    pub tax_rate_bps: i64,
    /// Adds `Secure` to the session cookie. Enable behind TLS.
    pub secure_cookies: bool,
    /// min_stock_level for new batches that do not specify one.
    pub low_stock_default: i64,
}

/// Optional overrides read from `dispensary.toml` in the data directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    session_ttl_hours: Option<i64>,
    tax_rate_bps: Option<i64>,
    secure_cookies: Option<bool>,
    low_stock_default: Option<i64>,
}

impl ServerConfig {
    /// Defaults for `data_dir`, overlaid with its `dispensary.toml` if present.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self {
            data_dir: data_dir.into(),
            ..Self::default()
        };

        let path = config.config_path();
        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            config.apply_file(&path, &text)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path, text: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(hours) = file.session_ttl_hours {
            self.session_ttl_hours = hours;
        }
        if let Some(bps) = file.tax_rate_bps {
            self.tax_rate_bps = bps;
        }
        if let Some(secure) = file.secure_cookies {
            self.secure_cookies = secure;
        }
        if let Some(level) = file.low_stock_default {
            self.low_stock_default = level;
        }

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_hours <= 0 {
            return Err(Error::Config("session_ttl_hours must be positive".to_string()));
        }
        if !(0..=BASIS_POINTS).contains(&self.tax_rate_bps) {
            return Err(Error::Config(format!(
                "tax_rate_bps must be between 0 and {BASIS_POINTS}"
            )));
        }
        if self.low_stock_default < 0 {
            return Err(Error::Config("low_stock_default cannot be negative".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            session_ttl_hours: 24,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            secure_cookies: false,
            low_stock_default: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::load(temp.path()).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.tax_rate_bps, 1_000);
        assert_eq!(config.session_ttl(), Duration::hours(24));
        assert_eq!(config.db_path(), temp.path().join("dispensary.db"));
    }

    #[test]
    fn test_load_applies_file_overrides() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "port = 9090\ntax_rate_bps = 800\nsecure_cookies = true\n",
        )
        .unwrap();

        let config = ServerConfig::load(temp.path()).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.tax_rate_bps, 800);
        assert!(config.secure_cookies);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "tax_rate_bps = 20000\n").unwrap();
        assert!(matches!(ServerConfig::load(temp.path()), Err(Error::Config(_))));

        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(ServerConfig::load(temp.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }
}
