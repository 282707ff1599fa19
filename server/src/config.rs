//! Command-line configuration, parsed once at startup.

use clap::Parser;

use crate::error::ConfigError;

#[derive(Parser, Debug, Clone)]
#[command(name = "pong-server", about = "Authoritative two-player Pong server")]
pub struct Config {
    /// Bind address for the UDP game transport.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port for the UDP game transport.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Bind port for the HTTP health surface (`GET /healthcheck`).
    #[arg(long, default_value_t = 8081)]
    pub health_port: u16,

    /// Override for the scheduler's busy-cadence tick rate, in Hz.
    /// Defaults to the ~30Hz implied by `BASE_TICK_MS`.
    #[arg(long)]
    pub tick_rate_hz: Option<u32>,

    /// Override for the minimum spacing between motion-only broadcasts, in
    /// milliseconds. Defaults to `CLIENT_SYNC_MS`.
    #[arg(long)]
    pub client_sync_ms: Option<u64>,

    /// Connection string for the coordination store backing the
    /// matchmaking queue.
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    pub coord_store_url: String,

    /// CORS allow-list for the HTTP health surface. May be repeated.
    #[arg(long = "cors-allow-origin")]
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn parse_args() -> Result<Self, ConfigError> {
        let config = Config::try_parse().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == self.health_port {
            return Err(ConfigError::Invalid(
                "--port and --health-port must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
            .unwrap_or_else(|| (1000 / shared::BASE_TICK_MS) as u32)
    }

    pub fn client_sync_ms(&self) -> u64 {
        self.client_sync_ms.unwrap_or(shared::CLIENT_SYNC_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_rate_defaults_to_base_tick() {
        let config = Config {
            host: "0.0.0.0".into(),
            port: 8080,
            health_port: 8081,
            tick_rate_hz: None,
            client_sync_ms: None,
            coord_store_url: "redis://127.0.0.1:6379".into(),
            cors_allow_origins: vec![],
        };
        assert_eq!(config.tick_rate_hz(), 30);
        assert_eq!(config.client_sync_ms(), 100);
    }

    #[test]
    fn rejects_matching_ports() {
        let config = Config {
            host: "0.0.0.0".into(),
            port: 8080,
            health_port: 8080,
            tick_rate_hz: None,
            client_sync_ms: None,
            coord_store_url: "redis://127.0.0.1:6379".into(),
            cors_allow_origins: vec![],
        };
        assert!(config.validate().is_err());
    }
}
