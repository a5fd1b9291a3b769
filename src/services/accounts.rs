use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{Account, ActivityAction, Course, CourseStatus, Role, TargetType};
use crate::store::{DirectoryStore, StudentFilter};

use super::{Actor, ActivityLog, ServiceError, ServiceResult};

/// Teacher record with its taught courses attached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDetail {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub courses: Vec<Course>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeacherDetail {
    pub fn new(account: Account, courses: Vec<Course>) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            courses,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// One enrolled course, flattened for the student views.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBrief {
    pub id: Uuid,
    pub name: String,
    pub subject: Option<String>,
    pub status: CourseStatus,
    pub teacher_name: Option<String>,
}

/// Student record with enrollment summaries attached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetail {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub enrollments: Vec<CourseBrief>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub grade: String,
}

/// Partial account patch. `None` fields are left untouched; `role` is never
/// patched through any update path.
#[derive(Debug, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub grade: Option<String>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.grade.is_none()
    }
}

/// CRUD over teacher, student and admin accounts.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DirectoryStore>,
    activity: ActivityLog,
}

impl AccountService {
    pub fn new(store: Arc<dyn DirectoryStore>, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    // -- teachers ---------------------------------------------------------

    pub async fn list_teachers(&self) -> ServiceResult<Vec<Account>> {
        Ok(self.store.list_teachers().await?)
    }

    pub async fn get_teacher(&self, id: Uuid) -> ServiceResult<TeacherDetail> {
        let account = self
            .store
            .find_account(id)
            .await?
            .filter(Account::is_teacher)
            .ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))?;
        let courses = self.store.courses_by_ids(&account.courses).await?;
        Ok(TeacherDetail::new(account, courses))
    }

    pub async fn create_teacher(&self, actor: &Actor, new: NewTeacher) -> ServiceResult<Account> {
        validate_profile(&new.name, &new.email)?;
        if self.store.find_account_by_email(&new.email).await?.is_some() {
            return Err(ServiceError::Conflict("User already exists".into()));
        }

        let teacher = Account::teacher(new.name, new.email);
        self.store.insert_account(&teacher).await?;

        self.activity.record(
            actor,
            ActivityAction::TeacherAdded,
            TargetType::User,
            teacher.id,
            &teacher.name,
            None,
        );
        Ok(teacher)
    }

    pub async fn update_teacher(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: AccountPatch,
    ) -> ServiceResult<Account> {
        let account = self
            .store
            .find_account(id)
            .await?
            .filter(Account::is_teacher)
            .ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))?;

        let updated = self.apply_patch(account, patch).await?;
        self.activity.record(
            actor,
            ActivityAction::TeacherUpdated,
            TargetType::User,
            updated.id,
            &updated.name,
            None,
        );
        Ok(updated)
    }

    // -- students ---------------------------------------------------------

    pub async fn list_students(&self, filter: &StudentFilter) -> ServiceResult<Vec<Account>> {
        Ok(self.store.list_students(filter).await?)
    }

    /// Student listing with enrollment summaries eagerly attached.
    pub async fn list_students_populated(
        &self,
        filter: &StudentFilter,
    ) -> ServiceResult<Vec<StudentDetail>> {
        let students = self.store.list_students(filter).await?;
        let mut out = Vec::with_capacity(students.len());
        for student in students {
            let enrollments = self.course_briefs(&student.enrollments).await?;
            out.push(student_detail(student, enrollments));
        }
        Ok(out)
    }

    pub async fn get_student(&self, id: Uuid) -> ServiceResult<Account> {
        self.store
            .find_account(id)
            .await?
            .filter(Account::is_student)
            .ok_or_else(|| ServiceError::NotFound("Student not found".into()))
    }

    pub async fn get_student_populated(&self, id: Uuid) -> ServiceResult<StudentDetail> {
        let student = self.get_student(id).await?;
        let enrollments = self.course_briefs(&student.enrollments).await?;
        Ok(student_detail(student, enrollments))
    }

    pub async fn create_student(&self, actor: &Actor, new: NewStudent) -> ServiceResult<Account> {
        let mut violations = collect_profile_violations(&new.name, &new.email);
        if new.grade.trim().is_empty() {
            violations.push((
                "grade".to_string(),
                "Student grade level is required".to_string(),
            ));
        }
        if !violations.is_empty() {
            return Err(ServiceError::Validation(violations));
        }
        if self.store.find_account_by_email(&new.email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "User already exists with this email".into(),
            ));
        }

        let student = Account::student(new.name, new.email, new.grade);
        self.store.insert_account(&student).await?;

        self.activity.record(
            actor,
            ActivityAction::StudentAdded,
            TargetType::User,
            student.id,
            &student.name,
            Some(json!({ "grade": student.grade })),
        );
        Ok(student)
    }

    pub async fn update_student(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: AccountPatch,
    ) -> ServiceResult<Account> {
        if patch.is_empty() {
            return Err(ServiceError::Validation(vec![(
                "body".to_string(),
                "No update fields provided.".to_string(),
            )]));
        }

        let account = self.store.find_account(id).await?.filter(Account::is_student).ok_or_else(
            || ServiceError::NotFound("Student not found or user is not a student".into()),
        )?;

        let detail = patch_detail(&patch);
        let updated = self.apply_patch(account, patch).await?;
        self.activity.record(
            actor,
            ActivityAction::StudentUpdated,
            TargetType::User,
            updated.id,
            &updated.name,
            Some(detail),
        );
        Ok(updated)
    }

    // -- admin self settings ----------------------------------------------

    pub async fn get_settings(&self, admin_id: Uuid) -> ServiceResult<Account> {
        self.store
            .find_account(admin_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Admin not found".into()))
    }

    pub async fn update_settings(
        &self,
        actor: &Actor,
        admin_id: Uuid,
        patch: AccountPatch,
    ) -> ServiceResult<Account> {
        let account = self
            .store
            .find_account(admin_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Admin not found".into()))?;

        let updated = self.apply_patch(account, patch).await?;
        self.activity.record(
            actor,
            ActivityAction::AdminSettingsUpdated,
            TargetType::User,
            updated.id,
            &updated.name,
            None,
        );
        Ok(updated)
    }

    // -- shared -----------------------------------------------------------

    /// Apply a partial patch, re-checking email shape and uniqueness against
    /// every other account when the email changes.
    async fn apply_patch(&self, mut account: Account, patch: AccountPatch) -> ServiceResult<Account> {
        if let Some(email) = &patch.email {
            if !is_valid_email(email) {
                return Err(ServiceError::Validation(vec![(
                    "email".to_string(),
                    format!("{} is not a valid email address!", email),
                )]));
            }
            if self.store.email_taken(email, Some(account.id)).await? {
                return Err(ServiceError::Conflict(
                    "Email already in use by another account.".into(),
                ));
            }
        }

        if let Some(name) = patch.name {
            account.name = name;
        }
        if let Some(email) = patch.email {
            account.email = email;
        }
        if let Some(grade) = patch.grade {
            account.grade = Some(grade);
        }

        self.store.update_account(&account).await?;
        Ok(account)
    }

    async fn course_briefs(&self, ids: &[Uuid]) -> ServiceResult<Vec<CourseBrief>> {
        let courses = self.store.courses_by_ids(ids).await?;
        let mut teacher_names: HashMap<Uuid, String> = HashMap::new();
        let mut briefs = Vec::with_capacity(courses.len());
        for course in courses {
            let teacher_name = match course.teacher {
                Some(teacher_id) => {
                    if !teacher_names.contains_key(&teacher_id) {
                        if let Some(account) = self.store.find_account(teacher_id).await? {
                            teacher_names.insert(teacher_id, account.name);
                        }
                    }
                    teacher_names.get(&teacher_id).cloned()
                }
                None => None,
            };
            briefs.push(CourseBrief {
                id: course.id,
                name: course.name,
                subject: course.subject,
                status: course.status,
                teacher_name,
            });
        }
        Ok(briefs)
    }
}

fn student_detail(student: Account, enrollments: Vec<CourseBrief>) -> StudentDetail {
    StudentDetail {
        id: student.id,
        name: student.name,
        email: student.email,
        role: student.role,
        grade: student.grade,
        enrollments,
        created_at: student.created_at,
        updated_at: student.updated_at,
    }
}

fn patch_detail(patch: &AccountPatch) -> serde_json::Value {
    let mut detail = serde_json::Map::new();
    if let Some(name) = &patch.name {
        detail.insert("name".into(), json!(name));
    }
    if let Some(email) = &patch.email {
        detail.insert("email".into(), json!(email));
    }
    if let Some(grade) = &patch.grade {
        detail.insert("grade".into(), json!(grade));
    }
    serde_json::Value::Object(detail)
}

fn collect_profile_violations(name: &str, email: &str) -> Vec<(String, String)> {
    let mut violations = Vec::new();
    if name.trim().is_empty() {
        violations.push(("name".to_string(), "Name is required".to_string()));
    }
    if !is_valid_email(email) {
        violations.push((
            "email".to_string(),
            format!("{} is not a valid email address!", email),
        ));
    }
    violations
}

fn validate_profile(name: &str, email: &str) -> ServiceResult<()> {
    let violations = collect_profile_violations(name, email);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(violations))
    }
}

/// Same shape the original validator accepted: non-empty local part, one `@`,
/// and a domain with an interior dot; no whitespace anywhere.
fn is_valid_email(email: &str) -> bool {
    let ok = |s: &str| !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '@');
    match email.split_once('@') {
        Some((local, domain)) => {
            ok(local)
                && ok(domain)
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("ada@school.test"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada@school"));
        assert!(!is_valid_email("ada@.test"));
        assert!(!is_valid_email("ada@school."));
        assert!(!is_valid_email("ada smith@school.test"));
        assert!(!is_valid_email("ada@@school.test"));
        assert!(!is_valid_email("@school.test"));
    }

    #[test]
    fn student_violations_accumulate() {
        let mut violations = collect_profile_violations("", "nope");
        violations.push((
            "grade".to_string(),
            "Student grade level is required".to_string(),
        ));
        assert_eq!(violations.len(), 3);
        let fields: Vec<&str> = violations.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "grade"]);
    }
}
