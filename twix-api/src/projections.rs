/// Response shapes
///
/// Each endpoint renders one of these named projections rather than the
/// database rows, so internal columns (password hashes, reminder
/// bookkeeping, device tokens) never leak by accident.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use twix_shared::membership::GroupWithMembers;
use twix_shared::models::{
    assigned_task::AssignedTask, board::Board, device::Device, group::Group, task::Task,
    user::User,
};
use uuid::Uuid;

/// Public face of a user, as seen by other users
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// The principal's own account
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for AccountView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_staff: user.is_staff,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSummary {
    pub id: Uuid,
    pub name: String,
    pub is_personal: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Board> for BoardSummary {
    fn from(board: Board) -> Self {
        Self {
            id: board.id,
            name: board.name,
            is_personal: board.is_personal,
            updated_at: board.updated_at,
        }
    }
}

/// A board with its tasks
#[derive(Debug, Clone, Serialize)]
pub struct BoardDetail {
    pub id: Uuid,
    pub name: String,
    pub is_personal: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: Vec<TaskView>,
}

impl BoardDetail {
    pub fn new(board: Board, tasks: Vec<Task>) -> Self {
        Self {
            id: board.id,
            name: board.name,
            is_personal: board.is_personal,
            owner_id: board.owner_id,
            created_at: board.created_at,
            updated_at: board.updated_at,
            tasks: tasks.into_iter().map(TaskView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub name: String,
    pub is_done: bool,
    pub due_date: Option<NaiveDate>,
    pub reminder: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_assigned: bool,
    pub group_id: Option<Uuid>,
    pub board_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            is_done: task.is_done,
            due_date: task.due_date,
            reminder: task.reminder,
            notes: task.notes,
            is_assigned: task.is_assigned,
            group_id: task.group_id,
            board_id: task.board_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub admin_id: Uuid,
}

impl From<Group> for GroupSummary {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            admin_id: group.admin_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub id: Uuid,
    pub name: String,
    pub admin_id: Uuid,
    pub members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupWithMembers> for GroupDetail {
    fn from(loaded: GroupWithMembers) -> Self {
        let GroupWithMembers { group, members } = loaded;
        Self {
            id: group.id,
            name: group.name,
            admin_id: group.admin_id,
            members: members.iter().map(UserSummary::from).collect(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

/// One member's copy of an assigned task, with the shared task inlined
#[derive(Debug, Clone, Serialize)]
pub struct AssignedTaskView {
    pub id: Uuid,
    pub is_done: bool,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub updated_at: DateTime<Utc>,

    /// `None` only if the task vanished between the two reads
    pub task: Option<TaskView>,
}

impl AssignedTaskView {
    pub fn new(row: AssignedTask, task: Option<Task>) -> Self {
        Self {
            id: row.id,
            is_done: row.is_done,
            group_id: row.group_id,
            user_id: row.user_id,
            updated_at: row.updated_at,
            task: task.map(TaskView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceView {
    pub id: Uuid,
    pub platform: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            platform: device.platform,
            active: device.active,
            created_at: device.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_user_projections_hide_password_hash() {
        let user = user();
        let summary = serde_json::to_value(UserSummary::from(&user)).unwrap();
        let account = serde_json::to_value(AccountView::from(user)).unwrap();

        for json in [summary, account] {
            assert!(json.get("password_hash").is_none());
            assert_eq!(json["email"], "ada@example.com");
        }
    }

    #[test]
    fn test_task_view_drops_reminder_bookkeeping() {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            name: "Ship".to_string(),
            is_done: false,
            due_date: None,
            reminder: Some(now),
            reminder_sent_at: Some(now),
            notes: None,
            is_assigned: false,
            group_id: None,
            board_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(TaskView::from(task)).unwrap();
        assert!(json.get("reminder_sent_at").is_none());
        assert!(json["reminder"].is_string());
        assert!(json["group_id"].is_null());
    }

    #[test]
    fn test_group_detail_lists_members() {
        let admin = user();
        let group = Group {
            id: Uuid::new_v4(),
            name: "Eng".to_string(),
            admin_id: admin.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let detail = GroupDetail::from(GroupWithMembers {
            group,
            members: vec![admin.clone()],
        });

        assert_eq!(detail.admin_id, admin.id);
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].id, admin.id);
    }
}
