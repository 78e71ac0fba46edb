//! Runtime tunables for the relay.

use std::time::Duration;

use crate::{
    domain::DEFAULT_HISTORY_CAPACITY,
    usecase::{DEFAULT_GRACE_PERIOD, PersistenceStrategy},
};

/// Where snapshots are kept between restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SnapshotTarget {
    /// Nothing survives a restart
    #[default]
    Memory,
    File(std::path::PathBuf),
    Http {
        url: String,
        token: Option<String>,
    },
}

impl std::fmt::Display for SnapshotTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File(path) => write!(f, "file {}", path.display()),
            // the token stays out of logs
            Self::Http { url, .. } => write!(f, "http {}", url),
        }
    }
}

/// Server configuration, built by the binary from CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Messages kept per room before the oldest is evicted
    pub history_capacity: usize,
    /// How long an empty room survives before it is deleted
    pub grace_period: Duration,
    pub persistence: PersistenceStrategy,
    pub snapshot: SnapshotTarget,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            grace_period: DEFAULT_GRACE_PERIOD,
            persistence: PersistenceStrategy::default(),
            snapshot: SnapshotTarget::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.grace_period, Duration::from_secs(30));
        assert_eq!(
            config.persistence,
            PersistenceStrategy::Debounced(Duration::from_secs(2))
        );
        assert_eq!(config.snapshot, SnapshotTarget::Memory);
    }

    #[test]
    fn test_snapshot_target_display_hides_token() {
        let target = SnapshotTarget::Http {
            url: "https://store.example/rooms".to_string(),
            token: Some("secret".to_string()),
        };

        assert_eq!(target.to_string(), "http https://store.example/rooms");
    }
}
