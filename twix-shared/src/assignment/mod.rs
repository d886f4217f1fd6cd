/// Task assignment
///
/// A task with `is_assigned = true` and a group is copied to every member of
/// that group as an assigned task. [`plan`] works out which copies to create
/// or delete; [`engine`] runs task saves and applies the plan in the same
/// transaction, then notifies the members.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use twix_shared::assignment::AssignmentEngine;
/// use twix_shared::auth::principal::Principal;
/// use twix_shared::models::task::UpdateTask;
/// use twix_shared::notify::LogNotifier;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, principal: Principal, task_id: Uuid, group_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = AssignmentEngine::new(Arc::new(LogNotifier));
///
/// let saved = engine
///     .update_task(&pool, &principal, task_id, UpdateTask {
///         is_assigned: Some(true),
///         group_id: Some(Some(group_id)),
///         ..Default::default()
///     })
///     .await?;
///
/// println!("{} copies created", saved.outcome.created);
/// # Ok(())
/// # }
/// ```

pub mod engine;
pub mod plan;

pub use engine::{AssignmentEngine, AssignmentError, ReconcileOutcome, Saved};
pub use plan::{AssignmentState, InconsistentState, Intent, ReconcilePlan};
