/// Push notification targets
///
/// A device is a push token registered by a user's client. Tokens are
/// globally unique: registering a token that already exists moves it to the
/// registering user and reactivates it. The push notifier deactivates tokens
/// the gateway reports as gone.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE devices (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token VARCHAR(512) NOT NULL UNIQUE,
///     platform VARCHAR(16) NOT NULL DEFAULT 'android',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Client platform of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,

    #[serde(skip_serializing)]
    pub token: String,

    pub platform: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const DEVICE_COLUMNS: &str = "id, user_id, token, platform, active, created_at, updated_at";

impl Device {
    /// Registers `token` for `user_id`, taking it over if another user had it
    pub async fn register(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
        platform: Platform,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices (user_id, token, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                platform = EXCLUDED.platform,
                active = TRUE,
                updated_at = NOW()
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(token.trim())
        .bind(platform.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Devices that should receive pushes for `user_id`
    pub async fn list_active_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = $1 AND active ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE devices SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Removes one of the user's devices; false when it is not theirs
    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("ios".parse::<Platform>(), Ok(Platform::Ios));
        assert_eq!("web".parse::<Platform>(), Ok(Platform::Web));
        assert!("blackberry".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_matches_column_values() {
        for platform in [Platform::Android, Platform::Ios, Platform::Web] {
            let json = serde_json::to_value(platform).unwrap();
            assert_eq!(json, platform.as_str());
        }
    }
}
