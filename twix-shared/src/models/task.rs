/// Tasks
///
/// A task lives on exactly one board and may be shared with a group. When
/// `is_assigned` is set the task is fanned out to every member of `group_id`
/// as an [`AssignedTask`](super::assigned_task::AssignedTask); that fan-out is
/// owned by [`AssignmentEngine`](crate::assignment::AssignmentEngine), so the
/// write functions here take a connection and expect to run inside the
/// engine's transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     is_done BOOLEAN NOT NULL DEFAULT FALSE,
///     due_date DATE,
///     reminder TIMESTAMPTZ,
///     reminder_sent_at TIMESTAMPTZ,
///     notes TEXT,
///     is_assigned BOOLEAN NOT NULL DEFAULT FALSE,
///     group_id UUID REFERENCES twix_groups(id) ON DELETE RESTRICT,
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_assigned_requires_group
///         CHECK (NOT is_assigned OR group_id IS NOT NULL)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::assignment::AssignmentState;
use crate::scope::Resource;

const TASK_COLUMNS: &str = "t.id, t.name, t.is_done, t.due_date, t.reminder, t.reminder_sent_at, \
                            t.notes, t.is_assigned, t.group_id, t.board_id, \
                            t.created_at, t.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub is_done: bool,
    pub due_date: Option<NaiveDate>,
    pub reminder: Option<DateTime<Utc>>,

    /// Set by the reminder worker once the reminder went out
    pub reminder_sent_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
    pub is_assigned: bool,
    pub group_id: Option<Uuid>,
    pub board_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub name: String,
    pub board_id: Uuid,
    pub is_done: bool,
    pub due_date: Option<NaiveDate>,
    pub reminder: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_assigned: bool,
    pub group_id: Option<Uuid>,
}

impl CreateTask {
    pub fn assignment(&self) -> AssignmentState {
        AssignmentState {
            is_assigned: self.is_assigned,
            group_id: self.group_id,
        }
    }
}

/// Partial update of a task
///
/// Outer `None` leaves a column alone; for nullable columns `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub is_done: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub reminder: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub is_assigned: Option<bool>,
    pub group_id: Option<Option<Uuid>>,
    pub board_id: Option<Uuid>,
}

impl UpdateTask {
    /// Assignment state the task will have once these changes are applied
    pub fn assignment_after(&self, current: AssignmentState) -> AssignmentState {
        AssignmentState {
            is_assigned: self.is_assigned.unwrap_or(current.is_assigned),
            group_id: self.group_id.unwrap_or(current.group_id),
        }
    }
}

impl Task {
    pub fn assignment(&self) -> AssignmentState {
        AssignmentState {
            is_assigned: self.is_assigned,
            group_id: self.group_id,
        }
    }

    pub(crate) async fn insert(conn: &mut PgConnection, data: &CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks AS t
                (name, board_id, is_done, due_date, reminder, notes, is_assigned, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.name.trim())
        .bind(data.board_id)
        .bind(data.is_done)
        .bind(data.due_date)
        .bind(data.reminder)
        .bind(&data.notes)
        .bind(data.is_assigned)
        .bind(data.group_id)
        .fetch_one(conn)
        .await
    }

    /// Locks a task in the principal's scope until the transaction ends
    pub(crate) async fn lock_scoped(
        conn: &mut PgConnection,
        principal: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE {} AND t.id = $2 FOR UPDATE OF t",
            Resource::Task.predicate()
        ))
        .bind(principal)
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Applies a partial update to a row previously locked with [`Task::lock_scoped`]
    ///
    /// Changing the reminder to a different instant re-arms it by clearing
    /// `reminder_sent_at`.
    pub(crate) async fn apply(
        conn: &mut PgConnection,
        id: Uuid,
        changes: &UpdateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks t
            SET name = COALESCE($2, t.name),
                is_done = COALESCE($3, t.is_done),
                due_date = CASE WHEN $4 THEN $5 ELSE t.due_date END,
                reminder = CASE WHEN $6 THEN $7 ELSE t.reminder END,
                reminder_sent_at = CASE
                    WHEN $6 AND $7 IS DISTINCT FROM t.reminder THEN NULL
                    ELSE t.reminder_sent_at
                END,
                notes = CASE WHEN $8 THEN $9 ELSE t.notes END,
                is_assigned = COALESCE($10, t.is_assigned),
                group_id = CASE WHEN $11 THEN $12 ELSE t.group_id END,
                board_id = COALESCE($13, t.board_id),
                updated_at = NOW()
            WHERE t.id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.is_done)
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .bind(changes.reminder.is_some())
        .bind(changes.reminder.flatten())
        .bind(changes.notes.is_some())
        .bind(changes.notes.clone().flatten())
        .bind(changes.is_assigned)
        .bind(changes.group_id.is_some())
        .bind(changes.group_id.flatten())
        .bind(changes.board_id)
        .fetch_one(conn)
        .await
    }

    /// Tasks on boards the principal owns, optionally narrowed to one board
    pub async fn list_scoped(
        pool: &PgPool,
        principal: Uuid,
        board_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE {} AND ($2::uuid IS NULL OR t.board_id = $2)
            ORDER BY t.created_at, t.id
            "#,
            Resource::Task.predicate()
        ))
        .bind(principal)
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_scoped<'e, E>(
        executor: E,
        principal: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE {} AND t.id = $2",
            Resource::Task.predicate()
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
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a task in scope; its fan-out rows go with it
    pub async fn delete_scoped(pool: &PgPool, principal: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM tasks t WHERE {} AND t.id = $2",
            Resource::Task.predicate()
        ))
        .bind(principal)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_after_keeps_untouched_fields() {
        let group = Uuid::new_v4();
        let current = AssignmentState {
            is_assigned: true,
            group_id: Some(group),
        };

        let rename = UpdateTask {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        assert_eq!(rename.assignment_after(current), current);

        let unassign = UpdateTask {
            is_assigned: Some(false),
            ..Default::default()
        };
        assert_eq!(
            unassign.assignment_after(current),
            AssignmentState {
                is_assigned: false,
                group_id: Some(group),
            }
        );
    }

    #[test]
    fn test_assignment_after_can_clear_group() {
        let current = AssignmentState {
            is_assigned: false,
            group_id: Some(Uuid::new_v4()),
        };
        let clear = UpdateTask {
            group_id: Some(None),
            ..Default::default()
        };
        assert_eq!(clear.assignment_after(current).group_id, None);
    }
}
