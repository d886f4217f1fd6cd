/// Reminder queue
///
/// A task is due when its reminder time has passed, the reminder has not
/// been sent yet and the task is not done. Claiming a batch stamps
/// `reminder_sent_at` in the same statement, and `FOR UPDATE SKIP LOCKED`
/// keeps concurrent workers from claiming the same task.
///
/// Changing a task's reminder clears `reminder_sent_at`, which re-arms it.
///
/// # Example
///
/// ```no_run
/// use twix_worker::queue::ReminderQueue;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let queue = ReminderQueue::new(pool, 50);
/// for due in queue.claim_due(chrono::Utc::now()).await? {
///     println!("Reminder for task {}", due.task.id);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use twix_shared::models::task::Task;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A claimed reminder together with the owner of the task's board
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueReminder {
    #[sqlx(flatten)]
    pub task: Task,

    pub owner_id: Uuid,
}

#[derive(Clone)]
pub struct ReminderQueue {
    db: PgPool,
    batch_size: i64,
}

impl ReminderQueue {
    pub fn new(db: PgPool, batch_size: i64) -> Self {
        Self { db, batch_size }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Claims up to one batch of reminders due at `now`, oldest first
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>, QueueError> {
        let due = sqlx::query_as::<_, DueReminder>(
            r#"
            WITH due AS (
                SELECT t.id
                FROM tasks t
                WHERE t.reminder <= $1
                  AND t.reminder_sent_at IS NULL
                  AND NOT t.is_done
                ORDER BY t.reminder ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE tasks
            SET reminder_sent_at = NOW()
            FROM due, boards
            WHERE tasks.id = due.id
              AND boards.id = tasks.board_id
            RETURNING
                tasks.id,
                tasks.name,
                tasks.is_done,
                tasks.due_date,
                tasks.reminder,
                tasks.reminder_sent_at,
                tasks.notes,
                tasks.is_assigned,
                tasks.group_id,
                tasks.board_id,
                tasks.created_at,
                tasks.updated_at,
                boards.owner_id
            "#,
        )
        .bind(now)
        .bind(self.batch_size)
        .fetch_all(&self.db)
        .await?;

        if !due.is_empty() {
            tracing::info!(count = due.len(), "Claimed due reminders");
        }

        Ok(due)
    }

    /// Reminders due at `now` that no worker has claimed yet
    pub async fn pending_count(&self, now: DateTime<Utc>) -> Result<i64, QueueError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE reminder <= $1 AND reminder_sent_at IS NULL AND NOT is_done
            "#,
        )
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}
