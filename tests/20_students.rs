mod common;

use axum::http::StatusCode;
use campus_admin_api::store::DirectoryStore;
use serde_json::json;

use common::{ids_of, TestApp};

#[tokio::test]
async fn student_creation_requires_grade_and_unique_email() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/admin/students",
            json!({ "name": "Lin", "email": "lin@school.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Student grade level is required"));

    app.seed_student("Lin", "lin@school.test", "5").await;
    let (status, body) = app
        .post(
            "/api/admin/students",
            json!({ "name": "Other", "email": "lin@school.test", "grade": "6" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists with this email");
}

#[tokio::test]
async fn student_search_filters_and_sorts() {
    let app = TestApp::new().await;
    app.seed_student("Alice Johnson", "alice@school.test", "5").await;
    app.seed_student("Bob Stone", "bob@school.test", "6").await;
    app.seed_student("Carol ALISON", "carol@school.test", "5").await;

    // Case-insensitive substring over name or email.
    let (status, body) = app.get("/api/admin/students?search=ali").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alice Johnson", "Carol ALISON"]);

    // Grade filter composes with search.
    let (_, body) = app.get("/api/admin/students?grade=6").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob Stone"]);

    // Search by email works too.
    let (_, body) = app.get("/api/admin/students?search=bob%40school").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn student_listing_populates_enrollment_summaries() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, Some("Math")).await;
    app.approve_course(course).await;

    let (status, _) = app
        .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get("/api/admin/students?populate=enrollments")
        .await;
    assert_eq!(status, StatusCode::OK);
    let enrollment = &body["data"][0]["enrollments"][0];
    assert_eq!(enrollment["name"], "Algebra");
    assert_eq!(enrollment["subject"], "Math");
    assert_eq!(enrollment["status"], "approved");
    assert_eq!(enrollment["teacherName"], "Ada");

    // Without populate the list carries raw course ids.
    let (_, body) = app.get("/api/admin/students").await;
    assert_eq!(ids_of(&body["data"]), vec![lin]);
    assert_eq!(
        common::parse_uuid(&body["data"][0]["enrollments"][0]),
        course
    );
}

#[tokio::test]
async fn student_update_is_partial_and_role_scoped() {
    let app = TestApp::new().await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;

    let (status, body) = app
        .put(&format!("/api/admin/students/{}", lin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No update fields provided.");

    let (status, body) = app
        .put(
            &format!("/api/admin/students/{}", lin),
            json!({ "grade": "6", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["student"]["grade"], "6");
    // Role can never be changed through update.
    assert_eq!(body["data"]["student"]["role"], "student");

    // A teacher id through the student endpoint is not a student.
    let (status, body) = app
        .put(&format!("/api/admin/students/{}", ada), json!({ "grade": "6" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found or user is not a student");
}

#[tokio::test]
async fn enrollment_roundtrip_keeps_both_sides_in_sync() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, None).await;
    app.approve_course(course).await;

    let (status, body) = app
        .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Student enrolled successfully");

    let (_, body) = app.get(&format!("/api/admin/courses/{}", course)).await;
    assert_eq!(ids_of(&body["data"]["students"]), vec![lin]);
    let (_, body) = app.get(&format!("/api/admin/students/{}", lin)).await;
    assert_eq!(common::parse_uuid(&body["data"]["enrollments"][0]), course);

    // Enrolling twice is a conflict.
    let (status, body) = app
        .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student is already enrolled in this course");

    let (status, body) = app
        .delete(&format!("/api/admin/students/{}/unenroll/{}", lin, course))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Student unenrolled successfully");

    let (_, body) = app.get(&format!("/api/admin/courses/{}", course)).await;
    assert_eq!(body["data"]["students"], json!([]));
    let (_, body) = app.get(&format!("/api/admin/students/{}", lin)).await;
    assert_eq!(body["data"]["enrollments"], json!([]));
}

#[tokio::test]
async fn enrollment_requires_an_approved_course() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, None).await;

    let (status, body) = app
        .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot enroll student in a non-approved course"
    );
}

#[tokio::test]
async fn enrollment_repairs_one_sided_links_but_still_conflicts() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, None).await;
    app.approve_course(course).await;

    // Forge a half-linked pair: the roster knows the student, the student
    // record does not.
    app.store.add_roster_entry(course, lin).await.unwrap();

    let (status, body) = app
        .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student is already enrolled in this course");

    // The missing side was repaired as a side effect of the failed enroll.
    let (_, body) = app.get(&format!("/api/admin/students/{}", lin)).await;
    assert_eq!(common::parse_uuid(&body["data"]["enrollments"][0]), course);
    let (_, body) = app.get(&format!("/api/admin/courses/{}", course)).await;
    assert_eq!(ids_of(&body["data"]["students"]), vec![lin]);
}

#[tokio::test]
async fn unenroll_checks_existence_of_both_sides() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, None).await;

    let (status, body) = app
        .delete(&format!(
            "/api/admin/students/{}/unenroll/{}",
            uuid::Uuid::new_v4(),
            course
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found");

    let (status, body) = app
        .delete(&format!(
            "/api/admin/students/{}/unenroll/{}",
            lin,
            uuid::Uuid::new_v4()
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Course not found");

    let (status, body) = app
        .delete(&format!("/api/admin/students/{}/unenroll/not-a-uuid", lin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Student or Course ID");
}

#[tokio::test]
async fn deleting_a_student_pulls_them_from_rosters() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let algebra = app.seed_course("Algebra", ada, None).await;
    let biology = app.seed_course("Biology", ada, None).await;
    app.approve_course(algebra).await;
    app.approve_course(biology).await;
    for course in [algebra, biology] {
        let (status, _) = app
            .post(&format!("/api/admin/students/{}/enroll/{}", lin, course), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.delete(&format!("/api/admin/students/{}", lin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Student removed successfully");

    for course in [algebra, biology] {
        let (_, body) = app.get(&format!("/api/admin/courses/{}", course)).await;
        assert_eq!(body["data"]["students"], json!([]), "roster of {}", course);
    }

    // Deleting a teacher through the student endpoint is a 404.
    let (status, _) = app.delete(&format!("/api/admin/students/{}", ada)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
