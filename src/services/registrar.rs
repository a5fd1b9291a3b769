use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::database::models::{Account, ActivityAction, Course, CourseStatus, TargetType};
use crate::store::DirectoryStore;

use super::accounts::TeacherDetail;
use super::{Actor, ActivityLog, CourseRef, ServiceError, ServiceResult};

/// Outcome of a teacher removal variant, for the response message.
#[derive(Debug)]
pub struct RemovalOutcome {
    /// Courses deleted alongside (variant 2) or orphaned (variant 3).
    pub affected_courses: u64,
}

/// Keeps the cross-references between accounts and courses consistent:
/// teacher assignment, the teacher-removal variants, cascading deletes, and
/// enrollment. Every multi-document write goes through one paired store
/// operation; reads that feed a decision are fetched concurrently.
#[derive(Clone)]
pub struct RegistrarService {
    store: Arc<dyn DirectoryStore>,
    activity: ActivityLog,
}

impl RegistrarService {
    pub fn new(store: Arc<dyn DirectoryStore>, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Assign a course to a teacher. A course has at most one teacher: the
    /// previous owner (if different) loses the course from their list.
    pub async fn assign_course(
        &self,
        actor: &Actor,
        teacher_id: Uuid,
        course_id: Uuid,
    ) -> ServiceResult<TeacherDetail> {
        let (teacher, course) = tokio::try_join!(
            self.store.find_account(teacher_id),
            self.store.find_course(course_id)
        )?;

        let teacher =
            teacher.ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))?;
        if !teacher.is_teacher() {
            return Err(ServiceError::InvalidReference(
                "Cannot assign course to a non-teacher user".into(),
            ));
        }
        let course = course.ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        if teacher.courses.contains(&course_id) {
            return Err(ServiceError::Conflict(
                "Course already assigned to this teacher's list".into(),
            ));
        }

        self.store
            .reassign_course(course_id, course.teacher, Some(teacher_id))
            .await?;

        self.activity.record(
            actor,
            ActivityAction::CourseAssignedTeacher,
            TargetType::Course,
            course_id,
            &course.name,
            Some(json!({ "teacherId": teacher_id, "teacherName": teacher.name })),
        );

        // Return the teacher with the refreshed course list attached.
        let teacher = self
            .store
            .find_account(teacher_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))?;
        let courses = self.store.courses_by_ids(&teacher.courses).await?;
        Ok(TeacherDetail::new(teacher, courses))
    }

    /// Simple removal: only permitted when the teacher has no courses.
    /// Otherwise the blocking courses come back so the caller can choose a
    /// variant.
    pub async fn remove_teacher(&self, actor: &Actor, teacher_id: Uuid) -> ServiceResult<()> {
        let teacher = self.require_teacher(teacher_id).await?;

        if !teacher.courses.is_empty() {
            let blocking = self
                .store
                .courses_by_ids(&teacher.courses)
                .await?
                .into_iter()
                .map(|c| CourseRef { id: c.id, name: c.name })
                .collect();
            return Err(ServiceError::TeacherHasCourses(blocking));
        }

        self.store.delete_teacher(teacher_id).await?;

        self.activity.record(
            actor,
            ActivityAction::TeacherRemoved,
            TargetType::User,
            teacher_id,
            &teacher.name,
            None,
        );
        Ok(())
    }

    /// Variant 2: delete the teacher together with the listed courses. Only
    /// courses actually owned by this teacher are deleted; foreign ids are
    /// silently ignored.
    pub async fn remove_teacher_with_courses(
        &self,
        actor: &Actor,
        teacher_id: Uuid,
        courses_to_delete: Vec<Uuid>,
    ) -> ServiceResult<RemovalOutcome> {
        let teacher = self.require_teacher(teacher_id).await?;

        self.store
            .delete_teacher_with_courses(teacher_id, &courses_to_delete)
            .await?;

        let requested = courses_to_delete.len() as u64;
        self.activity.record(
            actor,
            ActivityAction::TeacherRemovedWithCourses,
            TargetType::User,
            teacher_id,
            &teacher.name,
            Some(json!({ "deletedCourses": requested })),
        );
        Ok(RemovalOutcome {
            affected_courses: requested,
        })
    }

    /// Variant 3: delete only the teacher; every course referencing them
    /// survives with `teacher = null`.
    pub async fn remove_teacher_orphan_courses(
        &self,
        actor: &Actor,
        teacher_id: Uuid,
    ) -> ServiceResult<RemovalOutcome> {
        let teacher = self.require_teacher(teacher_id).await?;

        let orphaned = match self.store.delete_teacher_orphan(teacher_id).await? {
            Some((_, orphaned)) => orphaned,
            None => 0,
        };

        self.activity.record(
            actor,
            ActivityAction::TeacherRemovedKeepCourses,
            TargetType::User,
            teacher_id,
            &teacher.name,
            Some(json!({ "orphanedCourses": orphaned })),
        );
        Ok(RemovalOutcome {
            affected_courses: orphaned,
        })
    }

    /// Delete a course and detach it everywhere: the former teacher's course
    /// list and every enrolled student's enrollment list.
    pub async fn remove_course(&self, actor: &Actor, course_id: Uuid) -> ServiceResult<Course> {
        let course = self
            .store
            .delete_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        self.activity.record(
            actor,
            ActivityAction::CourseRemoved,
            TargetType::Course,
            course_id,
            &course.name,
            None,
        );
        Ok(course)
    }

    /// Delete a student and pull them from every enrolled course's roster.
    pub async fn remove_student(&self, actor: &Actor, student_id: Uuid) -> ServiceResult<Account> {
        let student = self.store.delete_student(student_id).await?.ok_or_else(|| {
            ServiceError::NotFound("Student not found or user is not a student".into())
        })?;

        self.activity.record(
            actor,
            ActivityAction::StudentRemoved,
            TargetType::User,
            student_id,
            &student.name,
            None,
        );
        Ok(student)
    }

    /// Enroll a student in an approved course. A half-linked pair is repaired
    /// on the missing side but still reported as already enrolled; enroll
    /// never silently succeeds on a linked pair.
    pub async fn enroll(
        &self,
        actor: &Actor,
        student_id: Uuid,
        course_id: Uuid,
    ) -> ServiceResult<()> {
        let (student, course) = tokio::try_join!(
            self.store.find_account(student_id),
            self.store.find_course(course_id)
        )?;

        let student = student
            .filter(Account::is_student)
            .ok_or_else(|| ServiceError::NotFound("Student not found".into()))?;
        let course = course.ok_or_else(|| ServiceError::NotFound("Course not found".into()))?;

        if course.status != CourseStatus::Approved {
            return Err(ServiceError::Conflict(
                "Cannot enroll student in a non-approved course".into(),
            ));
        }

        let linked_on_student = student.enrollments.contains(&course_id);
        let linked_on_course = course.students.contains(&student_id);

        if linked_on_student || linked_on_course {
            if !linked_on_student {
                self.store.add_enrollment(student_id, course_id).await?;
            }
            if !linked_on_course {
                self.store.add_roster_entry(course_id, student_id).await?;
            }
            return Err(ServiceError::Conflict(
                "Student is already enrolled in this course".into(),
            ));
        }

        self.store.enroll(student_id, course_id).await?;

        self.activity.record(
            actor,
            ActivityAction::StudentEnrolled,
            TargetType::User,
            student_id,
            &student.name,
            Some(json!({ "courseId": course_id, "courseName": course.name })),
        );
        Ok(())
    }

    /// Unenroll a student from a course. Existence is checked by count; both
    /// pulls are issued as one paired write.
    pub async fn unenroll(
        &self,
        actor: &Actor,
        student_id: Uuid,
        course_id: Uuid,
    ) -> ServiceResult<()> {
        let (student_exists, course_exists) = tokio::try_join!(
            self.store.student_exists(student_id),
            self.store.course_exists(course_id)
        )?;

        if !student_exists {
            return Err(ServiceError::NotFound("Student not found".into()));
        }
        if !course_exists {
            return Err(ServiceError::NotFound("Course not found".into()));
        }

        self.store.unenroll(student_id, course_id).await?;

        self.activity.record(
            actor,
            ActivityAction::StudentUnenrolled,
            TargetType::User,
            student_id,
            "N/A",
            Some(json!({ "courseId": course_id })),
        );
        Ok(())
    }

    async fn require_teacher(&self, teacher_id: Uuid) -> ServiceResult<Account> {
        self.store
            .find_account(teacher_id)
            .await?
            .filter(Account::is_teacher)
            .ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDirectoryStore;

    fn registrar() -> (RegistrarService, Arc<MemoryDirectoryStore>, Actor) {
        let store = Arc::new(MemoryDirectoryStore::new());
        let shared: Arc<dyn DirectoryStore> = store.clone();
        let activity = ActivityLog::new(shared.clone());
        let actor = Actor {
            id: Uuid::new_v4(),
            name: "Head Admin".into(),
        };
        (RegistrarService::new(shared, activity), store, actor)
    }

    #[tokio::test]
    async fn assign_moves_course_between_teachers() {
        let (registrar, store, actor) = registrar();
        let old = Account::teacher("Ada", "ada@school.test");
        let new = Account::teacher("Grace", "grace@school.test");
        let course = Course::new("Algebra", old.id);
        store.insert_account(&old).await.unwrap();
        store.insert_account(&new).await.unwrap();
        store.insert_course(&course).await.unwrap();
        store.add_course_to_teacher(old.id, course.id).await.unwrap();

        registrar.assign_course(&actor, new.id, course.id).await.unwrap();

        let old = store.find_account(old.id).await.unwrap().unwrap();
        let new = store.find_account(new.id).await.unwrap().unwrap();
        let course = store.find_course(course.id).await.unwrap().unwrap();
        assert!(old.courses.is_empty());
        assert_eq!(new.courses, vec![course.id]);
        assert_eq!(course.teacher, Some(new.id));
    }

    #[tokio::test]
    async fn assign_rejects_already_assigned_without_change() {
        let (registrar, store, actor) = registrar();
        let teacher = Account::teacher("Ada", "ada@school.test");
        let course = Course::new("Algebra", teacher.id);
        store.insert_account(&teacher).await.unwrap();
        store.insert_course(&course).await.unwrap();
        store
            .add_course_to_teacher(teacher.id, course.id)
            .await
            .unwrap();

        let err = registrar
            .assign_course(&actor, teacher.id, course.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let teacher = store.find_account(teacher.id).await.unwrap().unwrap();
        assert_eq!(teacher.courses.len(), 1);
    }

    #[tokio::test]
    async fn enroll_repairs_one_sided_link_and_still_conflicts() {
        let (registrar, store, actor) = registrar();
        let teacher = Account::teacher("Ada", "ada@school.test");
        let student = Account::student("Lin", "lin@school.test", "5");
        let mut course = Course::new("Algebra", teacher.id);
        course.status = CourseStatus::Approved;
        // One-sided: the roster knows the student, the student record does not.
        course.students.push(student.id);
        store.insert_account(&teacher).await.unwrap();
        store.insert_account(&student).await.unwrap();
        store.insert_course(&course).await.unwrap();

        let err = registrar
            .enroll(&actor, student.id, course.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // The missing side was repaired as a side effect.
        let student = store.find_account(student.id).await.unwrap().unwrap();
        assert_eq!(student.enrollments, vec![course.id]);
    }

    #[tokio::test]
    async fn enroll_requires_approved_course() {
        let (registrar, store, actor) = registrar();
        let teacher = Account::teacher("Ada", "ada@school.test");
        let student = Account::student("Lin", "lin@school.test", "5");
        let course = Course::new("Algebra", teacher.id);
        store.insert_account(&teacher).await.unwrap();
        store.insert_account(&student).await.unwrap();
        store.insert_course(&course).await.unwrap();

        let err = registrar
            .enroll(&actor, student.id, course.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let student = store.find_account(student.id).await.unwrap().unwrap();
        assert!(student.enrollments.is_empty());
    }

    #[tokio::test]
    async fn simple_removal_blocks_and_lists_courses() {
        let (registrar, store, actor) = registrar();
        let teacher = Account::teacher("Ada", "ada@school.test");
        let course = Course::new("Algebra", teacher.id);
        store.insert_account(&teacher).await.unwrap();
        store.insert_course(&course).await.unwrap();
        store
            .add_course_to_teacher(teacher.id, course.id)
            .await
            .unwrap();

        let err = registrar.remove_teacher(&actor, teacher.id).await.unwrap_err();
        match err {
            ServiceError::TeacherHasCourses(blocking) => {
                assert_eq!(blocking.len(), 1);
                assert_eq!(blocking[0].id, course.id);
                assert_eq!(blocking[0].name, "Algebra");
            }
            other => panic!("expected TeacherHasCourses, got {:?}", other),
        }
        assert!(store.find_account(teacher.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn course_removal_cascades_both_directions() {
        let (registrar, store, actor) = registrar();
        let teacher = Account::teacher("Ada", "ada@school.test");
        let student = Account::student("Lin", "lin@school.test", "5");
        let mut course = Course::new("Algebra", teacher.id);
        course.status = CourseStatus::Approved;
        store.insert_account(&teacher).await.unwrap();
        store.insert_account(&student).await.unwrap();
        store.insert_course(&course).await.unwrap();
        store
            .add_course_to_teacher(teacher.id, course.id)
            .await
            .unwrap();
        store.enroll(student.id, course.id).await.unwrap();

        registrar.remove_course(&actor, course.id).await.unwrap();

        let teacher = store.find_account(teacher.id).await.unwrap().unwrap();
        let student = store.find_account(student.id).await.unwrap().unwrap();
        assert!(teacher.courses.is_empty());
        assert!(student.enrollments.is_empty());
        assert!(store.find_course(course.id).await.unwrap().is_none());
    }
}
