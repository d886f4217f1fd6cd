/// Group membership admin actions
///
/// Adding and removing members is reserved to the group's admin. Checks run
/// in a fixed order so clients get a stable error:
///
/// 1. group outside the caller's scope → [`MembershipError::GroupNotFound`]
/// 2. caller is not the admin → [`MembershipError::PermissionDenied`]
/// 3. no user id in the payload → [`MembershipError::UserIdRequired`]
/// 4. user id unknown → [`MembershipError::UserNotFound`]
///
/// Both actions are idempotent: adding a member twice or removing a
/// non-member succeeds without changing the member set. Either way the
/// caller gets the group back with its current members.
///
/// Assigned tasks of the group are not touched here; the new member set is
/// picked up the next time each assigned task is saved.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::policy::{enforce, Action, PolicyError};
use crate::auth::principal::Principal;
use crate::models::group::Group;
use crate::models::user::User;
use crate::scope::Relation;

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Group not found")]
    GroupNotFound,

    #[error(transparent)]
    PermissionDenied(#[from] PolicyError),

    #[error("User id required")]
    UserIdRequired,

    #[error("No user with given id")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberChange {
    Add,
    Remove,
}

impl MemberChange {
    pub fn action(self) -> Action {
        match self {
            MemberChange::Add => Action::AddMember,
            MemberChange::Remove => Action::RemoveMember,
        }
    }
}

/// A group and its current members
#[derive(Debug, Clone)]
pub struct GroupWithMembers {
    pub group: Group,
    pub members: Vec<User>,
}

impl GroupWithMembers {
    pub async fn load(pool: &PgPool, group: Group) -> Result<Self, sqlx::Error> {
        let members = Group::members(pool, group.id).await?;
        Ok(Self { group, members })
    }
}

#[derive(Debug, Clone)]
pub struct MembershipOutcome {
    pub group: GroupWithMembers,

    /// False when the request was a no-op
    pub changed: bool,
}

/// Authorization and payload checks that need no database access
pub fn resolve_member_change(
    change: MemberChange,
    relation: &Relation,
    user_id: Option<Uuid>,
) -> Result<Uuid, MembershipError> {
    enforce(change.action(), relation)?;
    user_id.ok_or(MembershipError::UserIdRequired)
}

pub async fn add_member(
    pool: &PgPool,
    principal: &Principal,
    group_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<MembershipOutcome, MembershipError> {
    change_membership(pool, principal, group_id, user_id, MemberChange::Add).await
}

pub async fn remove_member(
    pool: &PgPool,
    principal: &Principal,
    group_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<MembershipOutcome, MembershipError> {
    change_membership(pool, principal, group_id, user_id, MemberChange::Remove).await
}

async fn change_membership(
    pool: &PgPool,
    principal: &Principal,
    group_id: Uuid,
    user_id: Option<Uuid>,
    change: MemberChange,
) -> Result<MembershipOutcome, MembershipError> {
    let group = Group::find_scoped(pool, principal.user_id, group_id)
        .await?
        .ok_or(MembershipError::GroupNotFound)?;

    let relation = group.relation_of(pool, principal.user_id).await?;
    let user_id = resolve_member_change(change, &relation, user_id)?;

    User::find_by_id(pool, user_id)
        .await?
        .ok_or(MembershipError::UserNotFound)?;

    let changed = match change {
        MemberChange::Add => Group::add_member(pool, group.id, user_id).await?,
        MemberChange::Remove => Group::remove_member(pool, group.id, user_id).await?,
    };

    info!(
        group_id = %group.id,
        %user_id,
        admin_id = %principal.user_id,
        ?change,
        changed,
        "Group membership changed"
    );

    Ok(MembershipOutcome {
        group: GroupWithMembers::load(pool, group).await?,
        changed,
    })
}
