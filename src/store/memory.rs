use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{Account, ActivityLogEntry, Course, Role};

use super::{CourseFilter, DirectoryStore, StoreError, StudentFilter};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    courses: HashMap<Uuid, Course>,
    activity: Vec<ActivityLogEntry>,
}

/// In-memory directory store mirroring the Postgres semantics (set-style
/// array writes, role-scoped deletes, cascade behavior). Backs the test
/// suite; each multi-document write happens under one lock guard, matching
/// the transactional unit of the Postgres implementation.
#[derive(Default)]
pub struct MemoryDirectoryStore {
    inner: RwLock<Inner>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_unique(list: &mut Vec<Uuid>, id: Uuid) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != exclude))
    }

    async fn list_teachers(&self) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().await;
        let mut teachers: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.role == Role::Teacher)
            .cloned()
            .collect();
        teachers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teachers)
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().await;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut students: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.role == Role::Student)
            .filter(|a| match &filter.grade {
                Some(grade) => a.grade.as_deref() == Some(grade.as_str()),
                None => true,
            })
            .filter(|a| match &needle {
                Some(needle) => {
                    a.name.to_lowercase().contains(needle)
                        || a.email.to_lowercase().contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    async fn accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = ids
            .iter()
            .filter_map(|id| inner.accounts.get(id).cloned())
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .accounts
            .values()
            .any(|a| a.email == account.email && a.id != account.id)
        {
            return Err(StoreError::DuplicateEmail);
        }
        match inner.accounts.get_mut(&account.id) {
            Some(existing) => {
                existing.name = account.name.clone();
                existing.email = account.email.clone();
                existing.grade = account.grade.clone();
                existing.courses = account.courses.clone();
                existing.enrollments = account.enrollments.clone();
                existing.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_accounts(&self, role: Role) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().filter(|a| a.role == role).count() as i64)
    }

    async fn enrollment_total(&self) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .filter(|a| a.role == Role::Student)
            .map(|a| a.enrollments.len() as i64)
            .sum())
    }

    async fn student_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .get(&id)
            .map(|a| a.role == Role::Student)
            .unwrap_or(false))
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.inner.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, StoreError> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = inner
            .courses
            .values()
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| {
                filter
                    .subject
                    .as_ref()
                    .map_or(true, |s| c.subject.as_deref() == Some(s.as_str()))
            })
            .filter(|c| {
                filter
                    .grade
                    .as_ref()
                    .map_or(true, |g| c.grade.as_deref() == Some(g.as_str()))
            })
            .filter(|c| filter.teacher.map_or(true, |t| c.teacher == Some(t)))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(courses)
    }

    async fn courses_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = ids
            .iter()
            .filter_map(|id| inner.courses.get(id).cloned())
            .collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(courses)
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.courses.get_mut(&course.id) {
            Some(existing) => {
                let mut updated = course.clone();
                updated.created_at = existing.created_at;
                updated.updated_at = Utc::now();
                *existing = updated;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_courses(&self) -> Result<i64, StoreError> {
        Ok(self.inner.read().await.courses.len() as i64)
    }

    async fn course_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.courses.contains_key(&id))
    }

    async fn reassign_course(
        &self,
        course_id: Uuid,
        from: Option<Uuid>,
        to: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(course) = inner.courses.get_mut(&course_id) {
            course.teacher = to;
            course.updated_at = Utc::now();
        }
        if let Some(old) = from {
            if let Some(account) = inner.accounts.get_mut(&old) {
                account.courses.retain(|c| *c != course_id);
                account.updated_at = Utc::now();
            }
        }
        if let Some(new) = to {
            if let Some(account) = inner.accounts.get_mut(&new) {
                push_unique(&mut account.courses, course_id);
                account.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn add_course_to_teacher(
        &self,
        teacher_id: Uuid,
        course_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&teacher_id) {
            push_unique(&mut account.courses, course_id);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&student_id) {
            push_unique(&mut account.enrollments, course_id);
            account.updated_at = Utc::now();
        }
        if let Some(course) = inner.courses.get_mut(&course_id) {
            push_unique(&mut course.students, student_id);
            course.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn unenroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&student_id) {
            account.enrollments.retain(|c| *c != course_id);
            account.updated_at = Utc::now();
        }
        if let Some(course) = inner.courses.get_mut(&course_id) {
            course.students.retain(|s| *s != student_id);
            course.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&student_id) {
            push_unique(&mut account.enrollments, course_id);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_roster_entry(&self, course_id: Uuid, student_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(course) = inner.courses.get_mut(&course_id) {
            push_unique(&mut course.students, student_id);
            course.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        let mut inner = self.inner.write().await;
        let course = match inner.courses.remove(&course_id) {
            Some(course) => course,
            None => return Ok(None),
        };
        if let Some(teacher) = course.teacher {
            if let Some(account) = inner.accounts.get_mut(&teacher) {
                account.courses.retain(|c| *c != course_id);
                account.updated_at = Utc::now();
            }
        }
        for student_id in &course.students {
            if let Some(account) = inner.accounts.get_mut(student_id) {
                account.enrollments.retain(|c| *c != course_id);
                account.updated_at = Utc::now();
            }
        }
        Ok(Some(course))
    }

    async fn delete_student(&self, student_id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.accounts.get(&student_id) {
            Some(a) if a.role == Role::Student => {}
            _ => return Ok(None),
        }
        let student = inner.accounts.remove(&student_id).expect("checked above");
        for course_id in &student.enrollments {
            if let Some(course) = inner.courses.get_mut(course_id) {
                course.students.retain(|s| *s != student_id);
                course.updated_at = Utc::now();
            }
        }
        Ok(Some(student))
    }

    async fn delete_teacher(&self, teacher_id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.accounts.get(&teacher_id) {
            Some(a) if a.role == Role::Teacher => {}
            _ => return Ok(None),
        }
        Ok(inner.accounts.remove(&teacher_id))
    }

    async fn delete_teacher_orphan(
        &self,
        teacher_id: Uuid,
    ) -> Result<Option<(Account, u64)>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.accounts.get(&teacher_id) {
            Some(a) if a.role == Role::Teacher => {}
            _ => return Ok(None),
        }
        let mut orphaned = 0;
        for course in inner.courses.values_mut() {
            if course.teacher == Some(teacher_id) {
                course.teacher = None;
                course.updated_at = Utc::now();
                orphaned += 1;
            }
        }
        let teacher = inner.accounts.remove(&teacher_id).expect("checked above");
        Ok(Some((teacher, orphaned)))
    }

    async fn delete_teacher_with_courses(
        &self,
        teacher_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<Option<(Account, u64)>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.accounts.get(&teacher_id) {
            Some(a) if a.role == Role::Teacher => {}
            _ => return Ok(None),
        }
        let mut deleted = 0;
        for course_id in course_ids {
            let owned = inner
                .courses
                .get(course_id)
                .map(|c| c.teacher == Some(teacher_id))
                .unwrap_or(false);
            if owned {
                inner.courses.remove(course_id);
                deleted += 1;
            }
        }
        let teacher = inner.accounts.remove(&teacher_id).expect("checked above");
        Ok(Some((teacher, deleted)))
    }

    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        self.inner.write().await.activity.push(entry.clone());
        Ok(())
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .activity
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
