use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Account, ActivityLogEntry, Course, Role};

use super::{CourseFilter, DirectoryStore, StoreError, StudentFilter};

/// PostgreSQL-backed directory store. Reference lists live as UUID-array
/// columns; every multi-document write runs inside one transaction.
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a unique-violation on the email index into the typed error.
fn map_write_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.constraint() == Some("accounts_email_key") {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Sqlx(e)
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn list_teachers(&self) -> Result<Vec<Account>, StoreError> {
        let teachers = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE role = 'teacher' ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(teachers)
    }

    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Account>, StoreError> {
        let mut sql = String::from("SELECT * FROM accounts WHERE role = 'student'");
        let mut n = 0;
        if filter.grade.is_some() {
            n += 1;
            sql.push_str(&format!(" AND grade = ${}", n));
        }
        if filter.search.is_some() {
            n += 1;
            sql.push_str(&format!(" AND (name ILIKE ${0} OR email ILIKE ${0})", n));
        }
        sql.push_str(" ORDER BY name ASC");

        let mut query = sqlx::query_as::<_, Account>(&sql);
        if let Some(grade) = &filter.grade {
            query = query.bind(grade.clone());
        }
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{}%", escape_like(search)));
        }
        let students = query.fetch_all(&self.pool).await?;
        Ok(students)
    }

    async fn accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE id = ANY($1) ORDER BY name ASC",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (id, name, email, role, grade, courses, enrollments, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.role)
        .bind(&account.grade)
        .bind(&account.courses)
        .bind(&account.enrollments)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE accounts
             SET name = $2, email = $3, grade = $4, courses = $5, enrollments = $6, updated_at = now()
             WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.grade)
        .bind(&account.courses)
        .bind(&account.enrollments)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_accounts(&self, role: Role) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn enrollment_total(&self) -> Result<i64, StoreError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(cardinality(enrollments)), 0) FROM accounts WHERE role = 'student'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn student_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1 AND role = 'student')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, StoreError> {
        let mut sql = String::from("SELECT * FROM courses WHERE TRUE");
        let mut n = 0;
        if filter.status.is_some() {
            n += 1;
            sql.push_str(&format!(" AND status = ${}", n));
        }
        if filter.subject.is_some() {
            n += 1;
            sql.push_str(&format!(" AND subject = ${}", n));
        }
        if filter.grade.is_some() {
            n += 1;
            sql.push_str(&format!(" AND grade = ${}", n));
        }
        if filter.teacher.is_some() {
            n += 1;
            sql.push_str(&format!(" AND teacher = ${}", n));
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut query = sqlx::query_as::<_, Course>(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status);
        }
        if let Some(subject) = &filter.subject {
            query = query.bind(subject.clone());
        }
        if let Some(grade) = &filter.grade {
            query = query.bind(grade.clone());
        }
        if let Some(teacher) = filter.teacher {
            query = query.bind(teacher);
        }
        let courses = query.fetch_all(&self.pool).await?;
        Ok(courses)
    }

    async fn courses_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO courses (id, name, description, subject, grade, syllabus, resources, status, teacher, students, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.subject)
        .bind(&course.grade)
        .bind(&course.syllabus)
        .bind(&course.resources)
        .bind(course.status)
        .bind(course.teacher)
        .bind(&course.students)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE courses
             SET name = $2, description = $3, subject = $4, grade = $5, syllabus = $6,
                 resources = $7, status = $8, teacher = $9, students = $10, updated_at = now()
             WHERE id = $1",
        )
        .bind(course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(&course.subject)
        .bind(&course.grade)
        .bind(&course.syllabus)
        .bind(&course.resources)
        .bind(course.status)
        .bind(course.teacher)
        .bind(&course.students)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_courses(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn course_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn reassign_course(
        &self,
        course_id: Uuid,
        from: Option<Uuid>,
        to: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE courses SET teacher = $2, updated_at = now() WHERE id = $1")
            .bind(course_id)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        if let Some(old) = from {
            sqlx::query(
                "UPDATE accounts SET courses = array_remove(courses, $2), updated_at = now() WHERE id = $1",
            )
            .bind(old)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(new) = to {
            sqlx::query(
                "UPDATE accounts SET courses = array_append(courses, $2), updated_at = now()
                 WHERE id = $1 AND NOT ($2 = ANY(courses))",
            )
            .bind(new)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_course_to_teacher(
        &self,
        teacher_id: Uuid,
        course_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET courses = array_append(courses, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(courses))",
        )
        .bind(teacher_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE accounts SET enrollments = array_append(enrollments, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(enrollments))",
        )
        .bind(student_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE courses SET students = array_append(students, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(students))",
        )
        .bind(course_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unenroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE accounts SET enrollments = array_remove(enrollments, $2), updated_at = now() WHERE id = $1",
        )
        .bind(student_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE courses SET students = array_remove(students, $2), updated_at = now() WHERE id = $1",
        )
        .bind(course_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET enrollments = array_append(enrollments, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(enrollments))",
        )
        .bind(student_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_roster_entry(&self, course_id: Uuid, student_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE courses SET students = array_append(students, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(students))",
        )
        .bind(course_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let course =
            sqlx::query_as::<_, Course>("DELETE FROM courses WHERE id = $1 RETURNING *")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(course) = &course {
            if let Some(teacher) = course.teacher {
                sqlx::query(
                    "UPDATE accounts SET courses = array_remove(courses, $2), updated_at = now() WHERE id = $1",
                )
                .bind(teacher)
                .bind(course_id)
                .execute(&mut *tx)
                .await?;
            }
            if !course.students.is_empty() {
                sqlx::query(
                    "UPDATE accounts SET enrollments = array_remove(enrollments, $2), updated_at = now()
                     WHERE id = ANY($1)",
                )
                .bind(&course.students)
                .bind(course_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(course)
    }

    async fn delete_student(&self, student_id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let student = sqlx::query_as::<_, Account>(
            "DELETE FROM accounts WHERE id = $1 AND role = 'student' RETURNING *",
        )
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(student) = &student {
            if !student.enrollments.is_empty() {
                sqlx::query(
                    "UPDATE courses SET students = array_remove(students, $2), updated_at = now()
                     WHERE id = ANY($1)",
                )
                .bind(&student.enrollments)
                .bind(student_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(student)
    }

    async fn delete_teacher(&self, teacher_id: Uuid) -> Result<Option<Account>, StoreError> {
        let teacher = sqlx::query_as::<_, Account>(
            "DELETE FROM accounts WHERE id = $1 AND role = 'teacher' RETURNING *",
        )
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(teacher)
    }

    async fn delete_teacher_orphan(
        &self,
        teacher_id: Uuid,
    ) -> Result<Option<(Account, u64)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let orphaned =
            sqlx::query("UPDATE courses SET teacher = NULL, updated_at = now() WHERE teacher = $1")
                .bind(teacher_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let teacher = sqlx::query_as::<_, Account>(
            "DELETE FROM accounts WHERE id = $1 AND role = 'teacher' RETURNING *",
        )
        .bind(teacher_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(teacher.map(|t| (t, orphaned)))
    }

    async fn delete_teacher_with_courses(
        &self,
        teacher_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<Option<(Account, u64)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted = if course_ids.is_empty() {
            0
        } else {
            sqlx::query("DELETE FROM courses WHERE id = ANY($1) AND teacher = $2")
                .bind(course_ids.to_vec())
                .bind(teacher_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        let teacher = sqlx::query_as::<_, Account>(
            "DELETE FROM accounts WHERE id = $1 AND role = 'teacher' RETURNING *",
        )
        .bind(teacher_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(teacher.map(|t| (t, deleted)))
    }

    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO activity_log (id, actor_id, actor_name, action, target_type, target_id, target_name, detail, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(&entry.actor_name)
        .bind(entry.action)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.target_name)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>(
            "SELECT * FROM activity_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
