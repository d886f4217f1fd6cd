/// Scope resolution
///
/// Decides which rows of a resource a principal may see. Each [`Resource`]
/// has one SQL predicate that the models splice into their `WHERE` clauses,
/// with the principal's id always bound as `$1`, and one in-memory rule over
/// a [`Relation`] so the same decision can be made about a row that is
/// already loaded.
///
/// | Resource | Visible when |
/// |---|---|
/// | Board | principal owns the board |
/// | Task | principal owns the task's board |
/// | Group | principal is the admin or a member |
/// | Assigned task (list) | row is assigned to the principal, or principal administers its group |
/// | Assigned task (detail, update) | row is assigned to the principal |
///
/// Records outside the scope are reported as not found, never as forbidden.

use serde::Serialize;

/// A resource collection subject to scoping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Board,
    Task,
    Group,
    AssignedTaskList,
    AssignedTaskDetail,
}

/// How a principal relates to one record
///
/// Fields that do not apply to the record's resource stay false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relation {
    /// Owns the board, or the board the task sits on
    pub is_owner: bool,

    /// Administers the group (or the group of an assigned task)
    pub is_admin: bool,

    /// Is in the group's member set
    pub is_member: bool,

    /// The assigned task row belongs to the principal
    pub is_assignee: bool,
}

impl Resource {
    /// SQL predicate restricting the resource to the principal bound as `$1`
    ///
    /// Table aliases: `b` boards, `t` tasks, `g` twix_groups, `a` assigned_tasks.
    pub const fn predicate(self) -> &'static str {
        match self {
            Resource::Board => "b.owner_id = $1",
            Resource::Task => {
                "EXISTS (SELECT 1 FROM boards sb WHERE sb.id = t.board_id AND sb.owner_id = $1)"
            }
            Resource::Group => {
                "(g.admin_id = $1 OR EXISTS (SELECT 1 FROM twix_group_members sm \
                 WHERE sm.group_id = g.id AND sm.user_id = $1))"
            }
            Resource::AssignedTaskList => {
                "(a.user_id = $1 OR EXISTS (SELECT 1 FROM twix_groups sg \
                 WHERE sg.id = a.group_id AND sg.admin_id = $1))"
            }
            Resource::AssignedTaskDetail => "a.user_id = $1",
        }
    }

    /// Whether a record with the given relation is inside the scope
    pub fn admits(self, relation: &Relation) -> bool {
        match self {
            Resource::Board | Resource::Task => relation.is_owner,
            Resource::Group => relation.is_admin || relation.is_member,
            Resource::AssignedTaskList => relation.is_assignee || relation.is_admin,
            Resource::AssignedTaskDetail => relation.is_assignee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Resource; 5] = [
        Resource::Board,
        Resource::Task,
        Resource::Group,
        Resource::AssignedTaskList,
        Resource::AssignedTaskDetail,
    ];

    #[test]
    fn test_stranger_sees_nothing() {
        let stranger = Relation::default();
        for resource in ALL {
            assert!(!resource.admits(&stranger), "{:?} admitted a stranger", resource);
        }
    }

    #[test]
    fn test_group_visible_to_admin_or_member() {
        let admin_only = Relation {
            is_admin: true,
            ..Default::default()
        };
        let member_only = Relation {
            is_member: true,
            ..Default::default()
        };
        assert!(Resource::Group.admits(&admin_only));
        assert!(Resource::Group.admits(&member_only));
    }

    #[test]
    fn test_group_membership_does_not_open_boards() {
        let member = Relation {
            is_admin: true,
            is_member: true,
            ..Default::default()
        };
        assert!(!Resource::Board.admits(&member));
        assert!(!Resource::Task.admits(&member));
    }

    #[test]
    fn test_assigned_task_list_vs_detail() {
        let group_admin = Relation {
            is_admin: true,
            ..Default::default()
        };
        let assignee = Relation {
            is_assignee: true,
            ..Default::default()
        };

        assert!(Resource::AssignedTaskList.admits(&group_admin));
        assert!(!Resource::AssignedTaskDetail.admits(&group_admin));
        assert!(Resource::AssignedTaskList.admits(&assignee));
        assert!(Resource::AssignedTaskDetail.admits(&assignee));
    }

    #[test]
    fn test_predicates_bind_principal_as_first_parameter() {
        for resource in ALL {
            let predicate = resource.predicate();
            assert!(predicate.contains("$1"), "{:?}", resource);
            assert!(!predicate.contains("$2"), "{:?}", resource);
        }
    }
}
