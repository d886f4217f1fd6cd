/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
/// - `REMINDER_POLL_INTERVAL_SECS`: seconds between polls (default: 30)
/// - `REMINDER_BATCH_SIZE`: reminders claimed per poll (default: 50)
/// - `PUSH_GATEWAY_URL`: push gateway endpoint; reminders are only logged when unset
/// - `PUSH_GATEWAY_KEY`: bearer key for the push gateway

use std::env;
use std::time::Duration;
use twix_shared::notify::PushConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub poll_interval: Duration,
    pub batch_size: i64,

    /// `None` when no gateway is configured
    pub push: Option<PushConfig>,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let parse = |key: &str, default: u64| -> anyhow::Result<u64> {
            match non_empty(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("{} is not a number: {}", key, e)),
                None => Ok(default),
            }
        };

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let poll_secs = parse("REMINDER_POLL_INTERVAL_SECS", 30)?;
        if poll_secs == 0 {
            anyhow::bail!("REMINDER_POLL_INTERVAL_SECS must be at least 1");
        }

        let batch_size = parse("REMINDER_BATCH_SIZE", 50)?;
        if batch_size == 0 {
            anyhow::bail!("REMINDER_BATCH_SIZE must be at least 1");
        }

        let push = non_empty("PUSH_GATEWAY_URL").map(|url| PushConfig {
            api_key: non_empty("PUSH_GATEWAY_KEY"),
            ..PushConfig::new(url)
        });

        Ok(Self {
            database_url,
            max_connections: parse("DATABASE_MAX_CONNECTIONS", 5)? as u32,
            poll_interval: Duration::from_secs(poll_secs),
            batch_size: batch_size as i64,
            push,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        WorkerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/twix")]).unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_connections, 5);
        assert!(config.push.is_none());
    }

    #[test]
    fn test_push_gateway() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/twix"),
            ("PUSH_GATEWAY_URL", "https://push.example/send"),
            ("PUSH_GATEWAY_KEY", "k"),
        ])
        .unwrap();

        let push = config.push.unwrap();
        assert_eq!(push.url, "https://push.example/send");
        assert_eq!(push.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/twix"),
            ("REMINDER_POLL_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_requires_database_url() {
        assert!(load(&[]).is_err());
    }
}
