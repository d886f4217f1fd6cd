/// Authorization policy
///
/// Every mutation names an [`Action`]. Each action maps to exactly one
/// [`Rule`] that must hold for the principal's [`Relation`] to the target
/// record, and [`authorize`] evaluates it into a [`Decision`]. Handlers
/// evaluate the policy before touching the database and turn a denial into
/// `403 Forbidden` via [`Decision::require`].
///
/// Visibility is not handled here: a record outside the principal's scope is
/// a 404 before the policy is ever consulted (see [`crate::scope`]).
///
/// # Example
///
/// ```
/// use twix_shared::auth::policy::{authorize, Action, Decision};
/// use twix_shared::scope::Relation;
///
/// let member = Relation { is_member: true, ..Default::default() };
///
/// assert_eq!(authorize(Action::AssignTaskToGroup, &member), Decision::Allow);
/// assert!(authorize(Action::AddMember, &member).require().is_err());
/// ```

use serde::Serialize;

use crate::scope::Relation;

/// A guarded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    UpdateBoard,
    DeleteBoard,
    CreateTaskOnBoard,
    UpdateTask,
    DeleteTask,
    AssignTaskToGroup,
    UpdateGroup,
    DeleteGroup,
    AddMember,
    RemoveMember,
    UpdateAssignedTask,
}

/// Condition on the principal's relation to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Owns the board (directly or through the task)
    Owner,

    /// Administers the group
    GroupAdmin,

    /// Administers or belongs to the group
    GroupParticipant,

    /// Holds the assigned task row
    Assignee,
}

impl Action {
    /// The rule guarding this action
    pub const fn rule(self) -> Rule {
        match self {
            Action::UpdateBoard
            | Action::DeleteBoard
            | Action::CreateTaskOnBoard
            | Action::UpdateTask
            | Action::DeleteTask => Rule::Owner,
            Action::AssignTaskToGroup => Rule::GroupParticipant,
            Action::UpdateGroup
            | Action::DeleteGroup
            | Action::AddMember
            | Action::RemoveMember => Rule::GroupAdmin,
            Action::UpdateAssignedTask => Rule::Assignee,
        }
    }
}

impl Rule {
    pub fn holds(self, relation: &Relation) -> bool {
        match self {
            Rule::Owner => relation.is_owner,
            Rule::GroupAdmin => relation.is_admin,
            Rule::GroupParticipant => relation.is_admin || relation.is_member,
            Rule::Assignee => relation.is_assignee,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Rule::Owner => "Only the owner can do this",
            Rule::GroupAdmin => "Only the group admin can do this",
            Rule::GroupParticipant => "You are not a member of this group",
            Rule::Assignee => "This task is not assigned to you",
        }
    }
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { action: Action, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct PolicyError {
    pub action: Action,
    pub reason: &'static str,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into an error for `?`
    pub fn require(self) -> Result<(), PolicyError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny { action, reason } => Err(PolicyError { action, reason }),
        }
    }
}

pub fn authorize(action: Action, relation: &Relation) -> Decision {
    let rule = action.rule();
    if rule.holds(relation) {
        Decision::Allow
    } else {
        Decision::Deny {
            action,
            reason: rule.denial(),
        }
    }
}

/// [`authorize`] followed by [`Decision::require`]
pub fn enforce(action: Action, relation: &Relation) -> Result<(), PolicyError> {
    authorize(action, relation).require()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Action; 11] = [
        Action::UpdateBoard,
        Action::DeleteBoard,
        Action::CreateTaskOnBoard,
        Action::UpdateTask,
        Action::DeleteTask,
        Action::AssignTaskToGroup,
        Action::UpdateGroup,
        Action::DeleteGroup,
        Action::AddMember,
        Action::RemoveMember,
        Action::UpdateAssignedTask,
    ];

    fn admin() -> Relation {
        Relation {
            is_admin: true,
            ..Default::default()
        }
    }

    fn member() -> Relation {
        Relation {
            is_member: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_stranger_is_denied_everything() {
        for action in ALL {
            assert!(!authorize(action, &Relation::default()).is_allowed(), "{:?}", action);
        }
    }

    #[test]
    fn test_membership_admin_only() {
        for action in [
            Action::AddMember,
            Action::RemoveMember,
            Action::UpdateGroup,
            Action::DeleteGroup,
        ] {
            assert_eq!(authorize(action, &admin()), Decision::Allow);
            assert_eq!(
                authorize(action, &member()),
                Decision::Deny {
                    action,
                    reason: "Only the group admin can do this",
                }
            );
        }
    }

    #[test]
    fn test_admin_outside_member_set_can_still_administer() {
        let relation = Relation {
            is_admin: true,
            is_member: false,
            ..Default::default()
        };
        assert!(enforce(Action::AddMember, &relation).is_ok());
        assert!(enforce(Action::AssignTaskToGroup, &relation).is_ok());
    }

    #[test]
    fn test_assign_to_group_allows_members() {
        assert!(enforce(Action::AssignTaskToGroup, &member()).is_ok());
    }

    #[test]
    fn test_enforce_reports_action() {
        let err = enforce(Action::RemoveMember, &member()).unwrap_err();
        assert_eq!(err.action, Action::RemoveMember);
        assert_eq!(err.to_string(), "Only the group admin can do this");
    }

    #[test]
    fn test_owner_rules() {
        let owner = Relation {
            is_owner: true,
            ..Default::default()
        };
        assert!(enforce(Action::UpdateTask, &owner).is_ok());
        assert!(enforce(Action::UpdateTask, &admin()).is_err());
    }
}
