//! Runtime configuration
//!
//! All knobs have sensible defaults and can be overridden through `WINSHOT_*`
//! environment variables. There is deliberately no CLI layer here; the
//! config surface is the boundary with whatever launches the server.

use std::{path::PathBuf, time::Duration};

/// Configuration consumed by the capture pipeline and servers
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum width or height of delivered screenshots, in pixels
    pub max_image_dimension: u32,
    /// Maximum encoded size of delivered screenshots, in bytes
    pub max_file_size_bytes: u64,
    /// Port for the WebSocket protocol connection
    pub protocol_port:       u16,
    /// Port for the HTTP file endpoint
    pub file_server_port:    u16,
    /// Directory holding stored images
    pub tmp_dir:             PathBuf,
    /// Time-to-live for stored images
    pub file_expiry:         Duration,
    /// Period of the background eviction sweep
    pub sweep_interval:      Duration,
    /// Bounded wait per capture strategy attempt
    pub attempt_timeout:     Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_image_dimension: 1200,
            max_file_size_bytes: 5_000_000,
            protocol_port:       8765,
            file_server_port:    8766,
            tmp_dir:             std::env::temp_dir().join("winshot"),
            file_expiry:         Duration::from_secs(60 * 60),
            sweep_interval:      Duration::from_secs(60),
            attempt_timeout:     Duration::from_secs(3),
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    ///
    /// Unparsable values are ignored with a warning rather than failing
    /// startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env("WINSHOT_MAX_DIMENSION") {
            config.max_image_dimension = v;
        }
        if let Some(v) = parse_env("WINSHOT_MAX_FILE_SIZE") {
            config.max_file_size_bytes = v;
        }
        if let Some(v) = parse_env("WINSHOT_PORT") {
            config.protocol_port = v;
        }
        if let Some(v) = parse_env("WINSHOT_FILE_PORT") {
            config.file_server_port = v;
        }
        if let Ok(dir) = std::env::var("WINSHOT_TMP_DIR") {
            config.tmp_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_env::<u64>("WINSHOT_FILE_EXPIRY_SECS") {
            config.file_expiry = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("WINSHOT_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("WINSHOT_ATTEMPT_TIMEOUT_SECS") {
            config.attempt_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// URI at which the file server exposes the image with the given hash
    pub fn image_uri(&self, hash: &str) -> String {
        format!("http://127.0.0.1:{}/img/{}", self.file_server_port, hash)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.max_image_dimension, 1200);
        assert_eq!(config.max_file_size_bytes, 5_000_000);
        assert_eq!(config.protocol_port, 8765);
        assert_eq!(config.file_server_port, 8766);
        assert_eq!(config.file_expiry, Duration::from_secs(3600));
        assert!(config.tmp_dir.ends_with("winshot"));
    }

    #[test]
    fn test_image_uri_uses_file_server_port() {
        let config = Config {
            file_server_port: 9000,
            ..Config::default()
        };

        assert_eq!(config.image_uri("abc"), "http://127.0.0.1:9000/img/abc");
    }
}
