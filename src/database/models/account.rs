use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform role. Determines which reference list on [`Account`] is live:
/// `courses` for teachers, `enrollments` (plus `grade`) for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A platform user record. Reference lists are kept role-consistent by the
/// constructors below and by updates never touching `role`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub courses: Vec<Uuid>,
    pub enrollments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    fn new(name: String, email: String, role: Role, grade: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            grade,
            courses: Vec::new(),
            enrollments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn teacher(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name.into(), email.into(), Role::Teacher, None)
    }

    pub fn student(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        Self::new(name.into(), email.into(), Role::Student, Some(grade.into()))
    }

    pub fn admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name.into(), email.into(), Role::Admin, None)
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_keep_role_fields_consistent() {
        let t = Account::teacher("Ada", "ada@school.test");
        assert_eq!(t.role, Role::Teacher);
        assert!(t.grade.is_none());
        assert!(t.enrollments.is_empty());

        let s = Account::student("Lin", "lin@school.test", "5");
        assert_eq!(s.role, Role::Student);
        assert_eq!(s.grade.as_deref(), Some("5"));
        assert!(s.courses.is_empty());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("principal".parse::<Role>().is_err());
    }
}
