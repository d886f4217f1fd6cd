/// Per-member copies of a shared task
///
/// One row per (task, group, user). Rows are created and removed only by the
/// assignment engine; clients can read them and flip their own `is_done`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE assigned_tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     group_id UUID NOT NULL REFERENCES twix_groups(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     is_done BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT assigned_tasks_unique_member UNIQUE (task_id, group_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::scope::Resource;

const ASSIGNED_COLUMNS: &str = "a.id, a.task_id, a.group_id, a.user_id, a.is_done, \
                                a.created_at, a.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignedTask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,

    /// Completion of this member's copy, independent of the task's own flag
    pub is_done: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignedTask {
    /// Inserts the row unless it already exists
    ///
    /// Returns true when a row was created. An existing row, and its
    /// `is_done`, is left as it was.
    pub(crate) async fn get_or_create(
        conn: &mut PgConnection,
        task_id: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO assigned_tasks (task_id, group_id, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT assigned_tasks_unique_member DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(group_id)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users currently holding a row for (task, group)
    pub async fn assignee_ids<'e, E>(
        executor: E,
        task_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM assigned_tasks WHERE task_id = $1 AND group_id = $2",
        )
        .bind(task_id)
        .bind(group_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Deletes every row for (task, group); returns the number removed
    pub(crate) async fn delete_for(
        conn: &mut PgConnection,
        task_id: Uuid,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM assigned_tasks WHERE task_id = $1 AND group_id = $2")
            .bind(task_id)
            .bind(group_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes the rows of the given users for (task, group)
    pub(crate) async fn delete_users(
        conn: &mut PgConnection,
        task_id: Uuid,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM assigned_tasks WHERE task_id = $1 AND group_id = $2 AND user_id = ANY($3)",
        )
        .bind(task_id)
        .bind(group_id)
        .bind(user_ids)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Rows assigned to the principal plus rows in groups they administer
    pub async fn list_scoped(pool: &PgPool, principal: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssignedTask>(&format!(
            "SELECT {ASSIGNED_COLUMNS} FROM assigned_tasks a WHERE {} ORDER BY a.created_at, a.id",
            Resource::AssignedTaskList.predicate()
        ))
        .bind(principal)
        .fetch_all(pool)
        .await
    }

    /// A row assigned to the principal
    pub async fn find_for_assignee(
        pool: &PgPool,
        principal: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssignedTask>(&format!(
            "SELECT {ASSIGNED_COLUMNS} FROM assigned_tasks a WHERE {} AND a.id = $2",
            Resource::AssignedTaskDetail.predicate()
        ))
        .bind(principal)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Marks the principal's own row done or not done
    pub async fn set_done(
        pool: &PgPool,
        principal: Uuid,
        id: Uuid,
        is_done: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssignedTask>(&format!(
            r#"
            UPDATE assigned_tasks a
            SET is_done = $3, updated_at = NOW()
            WHERE {} AND a.id = $2
            RETURNING {ASSIGNED_COLUMNS}
            "#,
            Resource::AssignedTaskDetail.predicate()
        ))
        .bind(principal)
        .bind(id)
        .bind(is_done)
        .fetch_optional(pool)
        .await
    }

    /// Users with an unfinished copy of the task, across all groups
    pub async fn pending_assignees<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT DISTINCT user_id FROM assigned_tasks WHERE task_id = $1 AND NOT is_done",
        )
        .bind(task_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
