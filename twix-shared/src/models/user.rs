/// User accounts
///
/// A user owns boards and belongs to groups. Registration goes through
/// [`User::register`], which also provisions the user's personal group in the
/// same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CONSTRAINT users_email_lowercase CHECK (email = LOWER(email))
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use twix_shared::models::user::{CreateUser, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let (user, personal) = User::register(
///     &pool,
///     CreateUser {
///         email: "Ada@Example.com".to_string(),
///         name: "Ada".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     },
/// )
/// .await?;
///
/// assert_eq!(user.email, "ada@example.com");
/// assert_eq!(personal.admin_id, user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::group::{Group, PERSONAL_GROUP_NAME};

const USER_COLUMNS: &str = "id, email, name, password_hash, is_active, is_staff, \
                            created_at, updated_at, last_login_at";

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Always stored lowercase, see [`normalize_email`]
    pub email: String,

    /// Display name, empty when the user never set one
    pub name: String,

    /// Argon2id hash; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Inactive users cannot log in and their tokens stop working
    pub is_active: bool,

    pub is_staff: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for [`User::register`]
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Partial update of an account; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

/// Canonical form of an email address: trimmed and lowercased
///
/// Applied on every write and lookup so that uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl User {
    /// Creates the account and its personal group atomically
    ///
    /// The personal group is named "Personal", administered by the new user,
    /// and has the new user as its only member. No board is created.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the (normalized) email is taken.
    pub async fn register(pool: &PgPool, data: CreateUser) -> Result<(Self, Group), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(normalize_email(&data.email))
        .bind(data.name.trim())
        .bind(&data.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let group = Group::insert_with_admin(&mut tx, PERSONAL_GROUP_NAME, user.id).await?;

        tx.commit().await?;

        Ok((user, group))
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Looks a user up by email, ignoring case and surrounding whitespace
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
    }

    /// Active users whose email contains `fragment`, ordered by email
    pub async fn search_by_email(
        pool: &PgPool,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE is_active AND email ILIKE $1
            ORDER BY email
            LIMIT $2
            "#
        ))
        .bind(like_pattern(&normalize_email(fragment)))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update and returns the new row
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                name = COALESCE($3, name),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.email.as_deref().map(normalize_email))
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.password_hash)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the account together with everything it owns (cascade)
    ///
    /// Groups the user administers go with the account, so tasks assigned to
    /// those groups are unassigned first, on whichever board they sit.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET is_assigned = FALSE, group_id = NULL, updated_at = NOW()
            WHERE group_id IN (SELECT id FROM twix_groups WHERE admin_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Name shown to other users: the display name, or the email when unset
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            name: name.to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("plain@x.io"), "plain@x.io");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("a_b%c"), "%a\\_b\\%c%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(user("Ada").display_name(), "Ada");
        assert_eq!(user("  ").display_name(), "ada@example.com");
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(user("Ada")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
