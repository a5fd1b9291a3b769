use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::database::models::{Account, Course, CourseStatus, Role};
use crate::store::{CourseFilter, DirectoryStore, StudentFilter};

use super::ServiceResult;

/// Dashboard headline counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub teacher_count: i64,
    pub student_count: i64,
    pub course_count: i64,
    pub enrollment_count: i64,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

/// Aggregate report payload for the admin dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub course_status_counts: StatusCounts,
    pub subject_distribution: Vec<NamedCount>,
    pub grade_distribution: Vec<NamedCount>,
    pub courses_per_teacher: Vec<NamedCount>,
    pub total_students: usize,
    pub student_grade_distribution: Vec<NamedCount>,
    pub placeholder_course_completion_rate: f64,
}

/// Read-only rollups over the directories. Stateless: every call folds a
/// fresh snapshot, so it is safe to run alongside any mutation (the result
/// is an eventually-consistent view).
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn DirectoryStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    pub async fn overview(&self) -> ServiceResult<Overview> {
        let (teacher_count, student_count, course_count, enrollment_count) = tokio::try_join!(
            self.store.count_accounts(Role::Teacher),
            self.store.count_accounts(Role::Student),
            self.store.count_courses(),
            self.store.enrollment_total()
        )?;

        Ok(Overview {
            teacher_count,
            student_count,
            course_count,
            enrollment_count,
        })
    }

    pub async fn reports(&self) -> ServiceResult<ReportData> {
        let course_filter = CourseFilter::default();
        let student_filter = StudentFilter::default();
        let (courses, teachers, students) = tokio::try_join!(
            self.store.list_courses(&course_filter),
            self.store.list_teachers(),
            self.store.list_students(&student_filter)
        )?;

        Ok(build_report(&courses, &teachers, &students))
    }
}

/// Pure fold over directory snapshots.
fn build_report(courses: &[Course], teachers: &[Account], students: &[Account]) -> ReportData {
    let mut status = StatusCounts {
        pending: 0,
        approved: 0,
        rejected: 0,
        total: courses.len(),
    };
    let mut per_subject: HashMap<&str, usize> = HashMap::new();
    let mut per_grade: HashMap<&str, usize> = HashMap::new();

    for course in courses {
        match course.status {
            CourseStatus::Pending => status.pending += 1,
            CourseStatus::Approved => status.approved += 1,
            CourseStatus::Rejected => status.rejected += 1,
        }
        let subject = course.subject.as_deref().unwrap_or("Uncategorized");
        *per_subject.entry(subject).or_default() += 1;
        let grade = course.grade.as_deref().unwrap_or("Uncategorized");
        *per_grade.entry(grade).or_default() += 1;
    }

    let mut subject_distribution = to_named_counts(per_subject);
    subject_distribution.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));

    let mut grade_distribution = to_named_counts(per_grade);
    grade_distribution.sort_by(|a, b| a.name.cmp(&b.name));

    let mut courses_per_teacher: Vec<NamedCount> = teachers
        .iter()
        .map(|t| NamedCount {
            name: t.name.clone(),
            count: t.courses.len(),
        })
        .collect();
    courses_per_teacher.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));

    let mut per_student_grade: HashMap<&str, usize> = HashMap::new();
    for student in students {
        let grade = student.grade.as_deref().unwrap_or("Ungraded");
        *per_student_grade.entry(grade).or_default() += 1;
    }
    let mut student_grade_distribution = to_named_counts(per_student_grade);
    student_grade_distribution.sort_by(|a, b| a.name.cmp(&b.name));

    ReportData {
        course_status_counts: status,
        subject_distribution,
        grade_distribution,
        courses_per_teacher,
        total_students: students.len(),
        student_grade_distribution,
        // Completion tracking does not exist yet; the field is part of the
        // dashboard contract.
        placeholder_course_completion_rate: 0.0,
    }
}

fn to_named_counts(map: HashMap<&str, usize>) -> Vec<NamedCount> {
    map.into_iter()
        .map(|(name, count)| NamedCount {
            name: name.to_string(),
            count,
        })
        .collect()
}
