use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{Account, ActivityAction, Course, CourseStatus, TargetType};
use crate::store::{CourseFilter, DirectoryStore};

use super::{Actor, ActivityLog, ServiceError, ServiceResult};

/// Assigned-teacher summary attached to course views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Account> for TeacherSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
        }
    }
}

/// Enrolled-student summary attached to the course detail view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl From<Account> for StudentSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            grade: account.grade,
        }
    }
}

/// Course row with the teacher reference resolved to a summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
    pub status: CourseStatus,
    pub teacher: Option<TeacherSummary>,
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseView {
    fn new(course: Course, teacher: Option<TeacherSummary>) -> Self {
        Self {
            id: course.id,
            name: course.name,
            description: course.description,
            subject: course.subject,
            grade: course.grade,
            syllabus: course.syllabus,
            resources: course.resources,
            status: course.status,
            teacher,
            students: course.students,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Course detail: teacher summary plus enrolled-student summaries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
    pub status: CourseStatus,
    pub teacher: Option<TeacherSummary>,
    pub students: Vec<StudentSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,
    pub teacher: Uuid,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
}

/// Partial course patch. Plain fields are skip-if-absent; `teacher` is
/// three-state: absent (keep), `Some(None)` (unassign), `Some(Some(id))`.
#[derive(Debug, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
    pub teacher: Option<Option<Uuid>>,
}

/// CRUD over course records. Cross-reference upkeep for teacher changes is
/// delegated to the paired store writes.
#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn DirectoryStore>,
    activity: ActivityLog,
}

impl CourseService {
    pub fn new(store: Arc<dyn DirectoryStore>, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    pub async fn list(&self, filter: &CourseFilter) -> ServiceResult<Vec<CourseView>> {
        let courses = self.store.list_courses(filter).await?;

        // Resolve each distinct teacher once.
        let mut teachers: HashMap<Uuid, TeacherSummary> = HashMap::new();
        let mut views = Vec::with_capacity(courses.len());
        for course in courses {
            let teacher = match course.teacher {
                Some(id) => {
                    if !teachers.contains_key(&id) {
                        if let Some(account) = self.store.find_account(id).await? {
                            teachers.insert(id, TeacherSummary::from(account));
                        }
                    }
                    teachers.get(&id).cloned()
                }
                None => None,
            };
            views.push(CourseView::new(course, teacher));
        }
        Ok(views)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<CourseDetail> {
        let course = self
            .store
            .find_course(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        let teacher = match course.teacher {
            Some(teacher_id) => self
                .store
                .find_account(teacher_id)
                .await?
                .map(TeacherSummary::from),
            None => None,
        };
        let students = self
            .store
            .accounts_by_ids(&course.students)
            .await?
            .into_iter()
            .map(StudentSummary::from)
            .collect();

        Ok(CourseDetail {
            id: course.id,
            name: course.name,
            description: course.description,
            subject: course.subject,
            grade: course.grade,
            syllabus: course.syllabus,
            resources: course.resources,
            status: course.status,
            teacher,
            students,
            created_at: course.created_at,
            updated_at: course.updated_at,
        })
    }

    pub async fn create(&self, actor: &Actor, new: NewCourse) -> ServiceResult<Course> {
        if new.name.trim().is_empty() {
            return Err(ServiceError::Validation(vec![(
                "name".to_string(),
                "Course name is required".to_string(),
            )]));
        }

        let teacher = self
            .store
            .find_account(new.teacher)
            .await?
            .filter(Account::is_teacher)
            .ok_or_else(|| {
                ServiceError::InvalidReference(
                    "Assigned teacher not found or is not a teacher".into(),
                )
            })?;

        let mut course = Course::new(new.name, teacher.id);
        course.description = new.description;
        course.subject = new.subject;
        course.grade = new.grade;
        course.syllabus = new.syllabus;
        course.resources = new.resources;

        self.store.insert_course(&course).await?;
        self.store.add_course_to_teacher(teacher.id, course.id).await?;

        self.activity.record(
            actor,
            ActivityAction::CourseAdded,
            TargetType::Course,
            course.id,
            &course.name,
            Some(json!({ "teacherAssigned": teacher.name })),
        );
        Ok(course)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, patch: CoursePatch) -> ServiceResult<CourseView> {
        let before = self
            .store
            .find_course(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        // Resolve the incoming teacher before writing anything.
        let mut teacher_name: Option<String> = None;
        if let Some(Some(teacher_id)) = patch.teacher {
            let teacher = self
                .store
                .find_account(teacher_id)
                .await?
                .filter(Account::is_teacher)
                .ok_or_else(|| {
                    ServiceError::InvalidReference(
                        "Assigned teacher not found or is not a teacher".into(),
                    )
                })?;
            teacher_name = Some(teacher.name);
        }

        let mut course = before.clone();
        if let Some(name) = patch.name {
            course.name = name;
        }
        if let Some(description) = patch.description {
            course.description = Some(description);
        }
        if let Some(subject) = patch.subject {
            course.subject = Some(subject);
        }
        if let Some(grade) = patch.grade {
            course.grade = Some(grade);
        }
        if let Some(syllabus) = patch.syllabus {
            course.syllabus = Some(syllabus);
        }
        if let Some(resources) = patch.resources {
            course.resources = Some(resources);
        }
        if let Some(teacher) = patch.teacher {
            course.teacher = teacher;
        }

        self.store.update_course(&course).await?;

        // The generic patch above already rewrote course.teacher; the two
        // teachers' course lists still have to follow.
        if before.teacher != course.teacher {
            self.store
                .reassign_course(course.id, before.teacher, course.teacher)
                .await?;
        }

        self.activity.record(
            actor,
            ActivityAction::CourseUpdated,
            TargetType::Course,
            course.id,
            &course.name,
            Some(json!({ "teacherAssigned": teacher_name })),
        );

        let teacher = match course.teacher {
            Some(teacher_id) => self
                .store
                .find_account(teacher_id)
                .await?
                .map(TeacherSummary::from),
            None => None,
        };
        Ok(CourseView::new(course, teacher))
    }

    pub async fn approve(&self, actor: &Actor, id: Uuid) -> ServiceResult<Course> {
        self.set_status(actor, id, CourseStatus::Approved, ActivityAction::CourseApproved)
            .await
    }

    pub async fn reject(&self, actor: &Actor, id: Uuid) -> ServiceResult<Course> {
        self.set_status(actor, id, CourseStatus::Rejected, ActivityAction::CourseRejected)
            .await
    }

    /// Unconditional status overwrite: any state is reachable from any other
    /// through approve/reject (admin override).
    async fn set_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: CourseStatus,
        action: ActivityAction,
    ) -> ServiceResult<Course> {
        let mut course = self
            .store
            .find_course(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        course.status = status;
        self.store.update_course(&course).await?;

        self.activity
            .record(actor, action, TargetType::Course, course.id, &course.name, None);
        Ok(course)
    }
}
