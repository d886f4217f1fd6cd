/// Transactional task saves with fan-out reconciliation
///
/// Every task create and update goes through [`AssignmentEngine`]. One save
/// runs in a single transaction:
///
/// 1. lock the task row (`SELECT ... FOR UPDATE`) on update
/// 2. validate the new assignment state and the target board/group
/// 3. write the task
/// 4. apply the [`ReconcilePlan`](super::plan::ReconcilePlan) to `assigned_tasks`
/// 5. commit
///
/// Notifications go out only after the commit, one member at a time, and
/// their outcome never affects the saved task.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::plan::{plan, AssignmentState, InconsistentState, Intent};
use crate::auth::policy::{enforce, Action, PolicyError};
use crate::auth::principal::Principal;
use crate::models::assigned_task::AssignedTask;
use crate::models::board::Board;
use crate::models::group::Group;
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::User;
use crate::notify::{dispatch, DispatchReport, Notifier, PushMessage};
use crate::scope::Relation;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Inconsistent(#[from] InconsistentState),

    #[error("Task not found")]
    TaskNotFound,

    #[error("Board not found")]
    BoardNotFound,

    #[error("Group not found")]
    GroupNotFound,

    #[error(transparent)]
    Forbidden(#[from] PolicyError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row counts from one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub created: u64,
    pub pruned: u64,
    pub cleared: u64,
}

/// Result of a save
#[derive(Debug, Clone)]
pub struct Saved {
    pub task: Task,
    pub outcome: ReconcileOutcome,
    pub dispatch: DispatchReport,
}

/// Notification to send once the transaction has committed
struct PendingNotice {
    recipients: Vec<Uuid>,
    message: PushMessage,
}

#[derive(Clone)]
pub struct AssignmentEngine {
    notifier: Arc<dyn Notifier>,
}

impl AssignmentEngine {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Creates a task on one of the principal's boards
    pub async fn create_task(
        &self,
        pool: &PgPool,
        principal: &Principal,
        data: CreateTask,
    ) -> Result<Saved, AssignmentError> {
        let intent = data.assignment().intent()?;

        let mut tx = pool.begin().await?;

        let board = Board::find_scoped(&mut *tx, principal.user_id, data.board_id)
            .await?
            .ok_or(AssignmentError::BoardNotFound)?;
        enforce(Action::CreateTaskOnBoard, &board_relation(&board, principal))?;

        if let Some(group_id) = group_to_check(None, data.assignment()) {
            check_group_access(&mut *tx, principal.user_id, group_id).await?;
        }

        let task = Task::insert(&mut *tx, &data).await?;
        let (outcome, notice) = reconcile(&mut *tx, &task, None, intent).await?;

        tx.commit().await?;

        info!(task_id = %task.id, board_id = %task.board_id, is_assigned = task.is_assigned, "Task created");

        let dispatch = self.notify(notice).await;
        Ok(Saved {
            task,
            outcome,
            dispatch,
        })
    }

    /// Applies a partial update to a task in the principal's scope
    pub async fn update_task(
        &self,
        pool: &PgPool,
        principal: &Principal,
        task_id: Uuid,
        changes: UpdateTask,
    ) -> Result<Saved, AssignmentError> {
        let mut tx = pool.begin().await?;

        let current = Task::lock_scoped(&mut *tx, principal.user_id, task_id)
            .await?
            .ok_or(AssignmentError::TaskNotFound)?;

        let previous = current.assignment();
        let next = changes.assignment_after(previous);
        let intent = next.intent()?;

        let board = Board::find_scoped(&mut *tx, principal.user_id, current.board_id)
            .await?
            .ok_or(AssignmentError::BoardNotFound)?;
        enforce(Action::UpdateTask, &board_relation(&board, principal))?;

        if let Some(board_id) = changes.board_id.filter(|id| *id != current.board_id) {
            let target = Board::find_scoped(&mut *tx, principal.user_id, board_id)
                .await?
                .ok_or(AssignmentError::BoardNotFound)?;
            enforce(Action::CreateTaskOnBoard, &board_relation(&target, principal))?;
        }

        if let Some(group_id) = group_to_check(Some(previous), next) {
            check_group_access(&mut *tx, principal.user_id, group_id).await?;
        }

        let task = Task::apply(&mut *tx, task_id, &changes).await?;
        let (outcome, notice) = reconcile(&mut *tx, &task, Some(previous), intent).await?;

        tx.commit().await?;

        info!(
            task_id = %task.id,
            is_assigned = task.is_assigned,
            created = outcome.created,
            pruned = outcome.pruned,
            cleared = outcome.cleared,
            "Task updated"
        );

        let dispatch = self.notify(notice).await;
        Ok(Saved {
            task,
            outcome,
            dispatch,
        })
    }

    async fn notify(&self, notice: Option<PendingNotice>) -> DispatchReport {
        match notice {
            Some(notice) => {
                dispatch(self.notifier.as_ref(), &notice.recipients, &notice.message).await
            }
            None => DispatchReport::default(),
        }
    }
}

fn board_relation(board: &Board, principal: &Principal) -> Relation {
    Relation {
        is_owner: board.owner_id == principal.user_id,
        ..Relation::default()
    }
}

/// Group the principal must be allowed to assign to, if the save introduces one
///
/// Re-saving a task that already points at the same group needs no check, so
/// an owner who has since left the group can still edit their task.
fn group_to_check(previous: Option<AssignmentState>, next: AssignmentState) -> Option<Uuid> {
    let group = next.group_id?;
    match previous {
        Some(prev) if prev.group_id == Some(group) && (prev.is_assigned || !next.is_assigned) => {
            None
        }
        _ => Some(group),
    }
}

async fn check_group_access(
    conn: &mut PgConnection,
    principal: Uuid,
    group_id: Uuid,
) -> Result<(), AssignmentError> {
    let group = Group::find_scoped(&mut *conn, principal, group_id)
        .await?
        .ok_or(AssignmentError::GroupNotFound)?;

    let relation = group.relation_of(&mut *conn, principal).await?;
    enforce(Action::AssignTaskToGroup, &relation)?;
    Ok(())
}

async fn reconcile(
    conn: &mut PgConnection,
    task: &Task,
    previous: Option<AssignmentState>,
    intent: Intent,
) -> Result<(ReconcileOutcome, Option<PendingNotice>), AssignmentError> {
    let (members, existing) = match intent {
        Intent::Assigned { group } => (
            Group::member_ids(&mut *conn, group).await?,
            AssignedTask::assignee_ids(&mut *conn, task.id, group).await?,
        ),
        Intent::Unassigned { .. } => (Vec::new(), Vec::new()),
    };

    let plan = plan(previous, intent, &members, &existing);
    let mut outcome = ReconcileOutcome::default();

    for group in &plan.clear_groups {
        outcome.cleared += AssignedTask::delete_for(&mut *conn, task.id, *group).await?;
    }

    let Intent::Assigned { group: group_id } = intent else {
        debug!(task_id = %task.id, cleared = outcome.cleared, "No fan-out for task");
        return Ok((outcome, None));
    };

    for user_id in &plan.create {
        if AssignedTask::get_or_create(&mut *conn, task.id, group_id, *user_id).await? {
            outcome.created += 1;
        }
    }

    let prune: Vec<Uuid> = plan.prune.iter().copied().collect();
    outcome.pruned = AssignedTask::delete_users(&mut *conn, task.id, group_id, &prune).await?;

    let group = Group::find_by_id(&mut *conn, group_id)
        .await?
        .ok_or(AssignmentError::GroupNotFound)?;
    let admin_name = User::find_by_id(&mut *conn, group.admin_id)
        .await?
        .map(|admin| admin.display_name().to_string())
        .unwrap_or_else(|| group.name.clone());

    let mut recipients = members;
    recipients.sort();
    recipients.dedup();

    let notice = PendingNotice {
        recipients,
        message: PushMessage::task_assigned(task, &group, &admin_name),
    };

    Ok((outcome, Some(notice)))
}
