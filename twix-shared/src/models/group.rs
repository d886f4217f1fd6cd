/// Groups and their member sets
///
/// Every group has exactly one admin. Membership is stored separately in
/// `twix_group_members`; the admin is a member only when a membership row
/// says so. Groups created through this module always add their admin as a
/// member, but a later remove-member can take the admin out of the set
/// while they keep administering the group.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE twix_groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     admin_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE twix_group_members (
///     group_id UUID NOT NULL REFERENCES twix_groups(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (group_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::user::User;
use crate::scope::{Relation, Resource};

/// Name of the group provisioned for every new account
pub const PERSONAL_GROUP_NAME: &str = "Personal";

const GROUP_COLUMNS: &str = "g.id, g.name, g.admin_id, g.created_at, g.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates a group administered by `admin_id` and adds the admin as a member
    pub async fn create(pool: &PgPool, name: &str, admin_id: Uuid) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let group = Self::insert_with_admin(&mut tx, name, admin_id).await?;
        tx.commit().await?;
        Ok(group)
    }

    /// Insert half of [`Group::create`], for callers that already hold a transaction
    pub(crate) async fn insert_with_admin(
        conn: &mut PgConnection,
        name: &str,
        admin_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO twix_groups (name, admin_id)
            VALUES ($1, $2)
            RETURNING id, name, admin_id, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(admin_id)
        .fetch_one(&mut *conn)
        .await?;

        Self::add_member(&mut *conn, group.id, admin_id).await?;

        Ok(group)
    }

    /// Groups the principal administers or belongs to
    pub async fn list_scoped(pool: &PgPool, principal: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM twix_groups g WHERE {} ORDER BY g.created_at, g.id",
            Resource::Group.predicate()
        ))
        .bind(principal)
        .fetch_all(pool)
        .await
    }

    /// Fetches one group if it is inside the principal's scope
    pub async fn find_scoped<'e, E>(
        executor: E,
        principal: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM twix_groups g WHERE {} AND g.id = $2",
            Resource::Group.predicate()
        ))
        .bind(principal)
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM twix_groups g WHERE g.id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            UPDATE twix_groups
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, admin_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .fetch_optional(pool)
        .await
    }

    /// Deletes the group after unassigning every task that points at it
    ///
    /// Fan-out rows go with the group through the cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET is_assigned = FALSE, group_id = NULL, updated_at = NOW()
            WHERE group_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM twix_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Members of the group ordered by join time
    pub async fn members<'e, E>(executor: E, group_id: Uuid) -> Result<Vec<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.is_active, u.is_staff,
                   u.created_at, u.updated_at, u.last_login_at
            FROM twix_group_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.created_at, u.id
            "#,
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
    }

    pub async fn member_ids<'e, E>(executor: E, group_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM twix_group_members WHERE group_id = $1")
                .bind(group_id)
                .fetch_all(executor)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn is_member<'e, E>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM twix_group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Adds a member; returns false when the user already belonged to the group
    pub async fn add_member<'e, E>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO twix_group_members (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a member; returns false when the user was not a member
    pub async fn remove_member<'e, E>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM twix_group_members WHERE group_id = $1 AND user_id = $2")
                .bind(group_id)
                .bind(user_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// How `user_id` relates to this group, for policy evaluation
    pub async fn relation_of<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Relation, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let is_member = Self::is_member(executor, self.id, user_id).await?;

        Ok(Relation {
            is_admin: self.admin_id == user_id,
            is_member,
            ..Relation::default()
        })
    }
}
