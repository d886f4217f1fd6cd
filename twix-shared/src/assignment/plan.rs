/// Reconciliation planning
///
/// Pure part of the assignment engine: given a task's assignment before and
/// after a save, the group's current members and the users already holding a
/// fan-out row, decide which rows to create, which to prune and which
/// (task, group) pairs to clear entirely. Sets are used throughout, so the
/// order members come back from the database never changes the plan.

use std::collections::BTreeSet;
use uuid::Uuid;

/// The two task columns that drive fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentState {
    pub is_assigned: bool,
    pub group_id: Option<Uuid>,
}

/// `is_assigned` set without a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("A task cannot be assigned without a group")]
pub struct InconsistentState;

/// What a consistent [`AssignmentState`] asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Fan the task out to every member of `group`
    Assigned { group: Uuid },

    /// No fan-out; `group` is the group still recorded on the task, if any
    Unassigned { group: Option<Uuid> },
}

impl AssignmentState {
    pub fn intent(self) -> Result<Intent, InconsistentState> {
        match (self.is_assigned, self.group_id) {
            (true, Some(group)) => Ok(Intent::Assigned { group }),
            (true, None) => Err(InconsistentState),
            (false, group) => Ok(Intent::Unassigned { group }),
        }
    }
}

/// Row changes needed to bring fan-out in line with an intent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Groups whose (task, group) rows are all deleted
    pub clear_groups: BTreeSet<Uuid>,

    /// Members that need a row in the assigned group
    pub create: BTreeSet<Uuid>,

    /// Users holding a row in the assigned group who are no longer members
    pub prune: BTreeSet<Uuid>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.clear_groups.is_empty() && self.create.is_empty() && self.prune.is_empty()
    }
}

/// Plans one save
///
/// `previous` is the state stored before the save (`None` on create).
/// `members` and `existing` only matter for [`Intent::Assigned`]: the
/// assigned group's member ids and the ids already holding a row for
/// (task, group).
pub fn plan(
    previous: Option<AssignmentState>,
    next: Intent,
    members: &[Uuid],
    existing: &[Uuid],
) -> ReconcilePlan {
    let previous_group = previous.and_then(|state| state.group_id);
    let mut out = ReconcilePlan::default();

    match next {
        Intent::Unassigned { group } => {
            out.clear_groups.extend(group);
            out.clear_groups.extend(previous_group);
        }
        Intent::Assigned { group } => {
            if let Some(old) = previous_group.filter(|old| *old != group) {
                out.clear_groups.insert(old);
            }

            let members: BTreeSet<Uuid> = members.iter().copied().collect();
            let existing: BTreeSet<Uuid> = existing.iter().copied().collect();

            out.create = members.difference(&existing).copied().collect();
            out.prune = existing.difference(&members).copied().collect();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn assigned(group: Uuid) -> AssignmentState {
        AssignmentState {
            is_assigned: true,
            group_id: Some(group),
        }
    }

    #[test]
    fn test_intent() {
        let group = Uuid::new_v4();
        assert_eq!(assigned(group).intent(), Ok(Intent::Assigned { group }));
        assert_eq!(
            AssignmentState {
                is_assigned: true,
                group_id: None
            }
            .intent(),
            Err(InconsistentState)
        );
        assert_eq!(
            AssignmentState::default().intent(),
            Ok(Intent::Unassigned { group: None })
        );
    }

    #[test]
    fn test_first_assignment_creates_one_row_per_member() {
        let group = Uuid::new_v4();
        let members = ids(3);

        let plan = plan(None, Intent::Assigned { group }, &members, &[]);

        assert_eq!(plan.create, members.iter().copied().collect());
        assert!(plan.prune.is_empty());
        assert!(plan.clear_groups.is_empty());
    }

    #[test]
    fn test_resave_is_noop() {
        let group = Uuid::new_v4();
        let members = ids(2);

        let plan = plan(
            Some(assigned(group)),
            Intent::Assigned { group },
            &members,
            &members,
        );

        assert!(plan.is_noop());
    }

    #[test]
    fn test_member_order_does_not_matter() {
        let group = Uuid::new_v4();
        let members = ids(4);
        let mut reversed = members.clone();
        reversed.reverse();

        assert_eq!(
            plan(None, Intent::Assigned { group }, &members, &[]),
            plan(None, Intent::Assigned { group }, &reversed, &[])
        );
    }

    #[test]
    fn test_departed_member_is_pruned_and_newcomer_created() {
        let group = Uuid::new_v4();
        let stay = Uuid::new_v4();
        let left = Uuid::new_v4();
        let joined = Uuid::new_v4();

        let plan = plan(
            Some(assigned(group)),
            Intent::Assigned { group },
            &[stay, joined],
            &[stay, left],
        );

        assert_eq!(plan.create, BTreeSet::from([joined]));
        assert_eq!(plan.prune, BTreeSet::from([left]));
    }

    #[test]
    fn test_unassign_clears_group() {
        let group = Uuid::new_v4();

        let plan = plan(
            Some(assigned(group)),
            Intent::Unassigned { group: Some(group) },
            &[],
            &[],
        );

        assert_eq!(plan.clear_groups, BTreeSet::from([group]));
        assert!(plan.create.is_empty());
    }

    #[test]
    fn test_unassign_with_group_change_clears_both() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();

        let plan = plan(
            Some(assigned(old)),
            Intent::Unassigned { group: Some(new) },
            &[],
            &[],
        );

        assert_eq!(plan.clear_groups, BTreeSet::from([old, new]));
    }

    #[test]
    fn test_moving_assignment_clears_old_group() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        let members = ids(2);

        let plan = plan(
            Some(assigned(old)),
            Intent::Assigned { group: new },
            &members,
            &[],
        );

        assert_eq!(plan.clear_groups, BTreeSet::from([old]));
        assert_eq!(plan.create.len(), 2);
    }
}
