//! Actors and the profiles they resolve to

use crate::error::ModelError;
use crate::ids::{LecturerId, StudentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of roles an authenticated account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns achievements
    Student,
    /// Reviews achievements of assigned advisees
    Lecturer,
    /// Unrestricted operator
    Admin,
}

impl Role {
    /// Canonical lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Lecturer => "lecturer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "lecturer" => Ok(Role::Lecturer),
            "admin" => Ok(Role::Admin),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated caller of a workflow operation
///
/// Produced by the surrounding authentication layer; the engine trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Account identity
    pub user_id: UserId,
    /// Role carried by the account
    pub role: Role,
}

impl Actor {
    /// Create an actor
    #[inline]
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Student actor
    #[inline]
    #[must_use]
    pub fn student(user_id: UserId) -> Self {
        Self::new(user_id, Role::Student)
    }

    /// Lecturer actor
    #[inline]
    #[must_use]
    pub fn lecturer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Lecturer)
    }

    /// Admin actor
    #[inline]
    #[must_use]
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Whether the actor is an admin
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Student profile attached to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub user_id: UserId,
    /// Registration number
    pub student_number: String,
    pub program: String,
    pub academic_year: String,
    /// Assigned academic advisor, if any
    pub advisor_id: Option<LecturerId>,
    pub created_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Create a profile without an advisor
    #[must_use]
    pub fn new(user_id: UserId, student_number: impl Into<String>) -> Self {
        Self {
            id: StudentId::new(),
            user_id,
            student_number: student_number.into(),
            program: String::new(),
            academic_year: String::new(),
            advisor_id: None,
            created_at: Utc::now(),
        }
    }

    /// Assign an advisor
    #[inline]
    #[must_use]
    pub fn with_advisor(mut self, advisor: LecturerId) -> Self {
        self.advisor_id = Some(advisor);
        self
    }
}

/// Lecturer profile attached to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerProfile {
    pub id: LecturerId,
    pub user_id: UserId,
    /// Staff number
    pub lecturer_number: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

impl LecturerProfile {
    /// Create a profile
    #[must_use]
    pub fn new(user_id: UserId, lecturer_number: impl Into<String>) -> Self {
        Self {
            id: LecturerId::new(),
            user_id,
            lecturer_number: lecturer_number.into(),
            department: String::new(),
            created_at: Utc::now(),
        }
    }
}
