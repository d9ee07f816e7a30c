//! Permission resolver
//!
//! Role membership comes from a static table keyed by [`Role`]. Ownership and
//! advisor-scoping are separate predicates evaluated against the profile
//! directory; holding a permission never bypasses them.

use crate::error::{WorkflowError, WorkflowResult};
use ach_model::{
    AchievementReference, Actor, LecturerId, LecturerProfile, ModelError, Role, StudentId,
    StudentProfile,
};
use ach_store::{ProfileDirectory, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// `resource:action` permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    AchievementsCreate,
    AchievementsUpdate,
    AchievementsDelete,
    AchievementsSubmit,
    AchievementsVerify,
    AchievementsReject,
    AchievementsReadAll,
    AchievementsStats,
    StudentsReadSelf,
    StudentsAdvisees,
    StudentsAssignAdvisor,
    UsersCreate,
    UsersRead,
    UsersUpdate,
    UsersDelete,
    UsersUpdateRole,
}

impl Permission {
    pub const ALL: [Permission; 16] = [
        Permission::AchievementsCreate,
        Permission::AchievementsUpdate,
        Permission::AchievementsDelete,
        Permission::AchievementsSubmit,
        Permission::AchievementsVerify,
        Permission::AchievementsReject,
        Permission::AchievementsReadAll,
        Permission::AchievementsStats,
        Permission::StudentsReadSelf,
        Permission::StudentsAdvisees,
        Permission::StudentsAssignAdvisor,
        Permission::UsersCreate,
        Permission::UsersRead,
        Permission::UsersUpdate,
        Permission::UsersDelete,
        Permission::UsersUpdateRole,
    ];

    /// Canonical `resource:action` name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AchievementsCreate => "achievements:create",
            Permission::AchievementsUpdate => "achievements:update",
            Permission::AchievementsDelete => "achievements:delete",
            Permission::AchievementsSubmit => "achievements:submit",
            Permission::AchievementsVerify => "achievements:verify",
            Permission::AchievementsReject => "achievements:reject",
            Permission::AchievementsReadAll => "achievements:read-all",
            Permission::AchievementsStats => "achievements:stats",
            Permission::StudentsReadSelf => "students:read-self",
            Permission::StudentsAdvisees => "students:advisees",
            Permission::StudentsAssignAdvisor => "students:assign-advisor",
            Permission::UsersCreate => "users:create",
            Permission::UsersRead => "users:read",
            Permission::UsersUpdate => "users:update",
            Permission::UsersDelete => "users:delete",
            Permission::UsersUpdateRole => "users:update-role",
        }
    }

    /// Resource half of the name
    #[must_use]
    pub fn resource(&self) -> &'static str {
        self.as_str().split_once(':').map_or("", |(r, _)| r)
    }

    /// Action half of the name
    #[must_use]
    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map_or("", |(_, a)| a)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ModelError::MalformedPermission(s.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}

const STUDENT_PERMISSIONS: &[Permission] = &[
    Permission::AchievementsCreate,
    Permission::AchievementsUpdate,
    Permission::AchievementsDelete,
    Permission::AchievementsSubmit,
    Permission::StudentsReadSelf,
];

const LECTURER_PERMISSIONS: &[Permission] = &[
    Permission::AchievementsVerify,
    Permission::AchievementsReject,
    Permission::StudentsAdvisees,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AchievementsSubmit,
    Permission::AchievementsVerify,
    Permission::AchievementsReject,
    Permission::AchievementsReadAll,
    Permission::AchievementsStats,
    Permission::UsersCreate,
    Permission::UsersRead,
    Permission::UsersUpdate,
    Permission::UsersDelete,
    Permission::UsersUpdateRole,
    Permission::StudentsAssignAdvisor,
];

/// Static role table
#[must_use]
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Student => STUDENT_PERMISSIONS,
        Role::Lecturer => LECTURER_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    }
}

/// Permissions granted to `role`
#[must_use]
pub fn permissions_for_role(role: Role) -> PermissionSet {
    role_permissions(role).iter().copied().collect()
}

/// Resolved permissions of one actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    #[inline]
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Role, ownership and advisor checks backed by the profile directory
#[derive(Clone)]
pub struct PermissionResolver {
    directory: Arc<dyn ProfileDirectory>,
}

impl fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

impl PermissionResolver {
    #[must_use]
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { directory }
    }

    /// Permissions granted to `role`
    #[inline]
    #[must_use]
    pub fn permissions_for_role(&self, role: Role) -> PermissionSet {
        permissions_for_role(role)
    }

    /// Fail with `Forbidden` unless the actor's role grants `permission`
    pub fn require(&self, actor: &Actor, permission: Permission) -> WorkflowResult<()> {
        if role_permissions(actor.role).contains(&permission) {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "role {} lacks {permission}",
                actor.role
            )))
        }
    }

    /// Student profile of the actor; `NotFound` when there is none
    pub async fn student_of(&self, actor: &Actor) -> WorkflowResult<StudentProfile> {
        self.directory
            .student_by_user(actor.user_id)
            .await
            .map_err(|e| profile_error(e, "student profile", actor))
    }

    /// Lecturer profile of the actor; `NotFound` when there is none
    pub async fn lecturer_of(&self, actor: &Actor) -> WorkflowResult<LecturerProfile> {
        self.directory
            .lecturer_by_user(actor.user_id)
            .await
            .map_err(|e| profile_error(e, "lecturer profile", actor))
    }

    /// Whether `lecturer` is the assigned advisor of `student`
    pub async fn is_advisor_of(
        &self,
        lecturer: LecturerId,
        student: StudentId,
    ) -> WorkflowResult<bool> {
        match self.directory.student_by_id(student).await {
            Ok(profile) => Ok(profile.advisor_id == Some(lecturer)),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(WorkflowError::StoreFailure(e)),
        }
    }

    /// Whether the actor is the student owning `reference`
    pub async fn is_owner(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
    ) -> WorkflowResult<bool> {
        if actor.role != Role::Student {
            return Ok(false);
        }
        match self.directory.student_by_user(actor.user_id).await {
            Ok(profile) => Ok(reference.is_owned_by(profile.id)),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(WorkflowError::StoreFailure(e)),
        }
    }

    /// `Forbidden` unless the actor owns `reference`
    pub async fn ensure_owner(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
    ) -> WorkflowResult<()> {
        if self.is_owner(actor, reference).await? {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "{} does not own reference {}",
                actor.user_id, reference.id
            )))
        }
    }

    /// `Forbidden` unless the actor owns `reference` or is an admin
    pub async fn ensure_owner_or_admin(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
    ) -> WorkflowResult<()> {
        if actor.is_admin() {
            return Ok(());
        }
        self.ensure_owner(actor, reference).await
    }

    /// `Forbidden` unless the actor is an admin or the owning student's advisor
    pub async fn ensure_reviewer(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
    ) -> WorkflowResult<()> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Lecturer => {
                let lecturer = match self.directory.lecturer_by_user(actor.user_id).await {
                    Ok(profile) => profile,
                    Err(StoreError::NotFound(_)) => {
                        return Err(WorkflowError::forbidden(format!(
                            "{} has no lecturer profile",
                            actor.user_id
                        )))
                    }
                    Err(e) => return Err(WorkflowError::StoreFailure(e)),
                };
                if self.is_advisor_of(lecturer.id, reference.student_id).await? {
                    Ok(())
                } else {
                    Err(WorkflowError::forbidden(format!(
                        "lecturer {} is not the advisor of student {}",
                        lecturer.id, reference.student_id
                    )))
                }
            }
            Role::Student => Err(WorkflowError::forbidden("students cannot review")),
        }
    }

    /// Owner, owner's advisor, or admin
    pub async fn can_view(
        &self,
        actor: &Actor,
        reference: &AchievementReference,
    ) -> WorkflowResult<bool> {
        match actor.role {
            Role::Admin => Ok(true),
            Role::Student => self.is_owner(actor, reference).await,
            Role::Lecturer => match self.directory.lecturer_by_user(actor.user_id).await {
                Ok(lecturer) => self.is_advisor_of(lecturer.id, reference.student_id).await,
                Err(StoreError::NotFound(_)) => Ok(false),
                Err(e) => Err(WorkflowError::StoreFailure(e)),
            },
        }
    }
}

fn profile_error(err: StoreError, what: &str, actor: &Actor) -> WorkflowError {
    match err {
        StoreError::NotFound(_) => WorkflowError::not_found(format!("{what} for {}", actor.user_id)),
        other => WorkflowError::StoreFailure(other),
    }
}
