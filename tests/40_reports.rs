mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{mint_token, TestApp};

#[tokio::test]
async fn overview_counts_every_collection() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    app.seed_teacher("Grace", "grace@school.test").await;
    let lin = app.seed_student("Lin", "lin@school.test", "5").await;
    let mia = app.seed_student("Mia", "mia@school.test", "6").await;
    let algebra = app.seed_course("Algebra", ada, None).await;
    let biology = app.seed_course("Biology", ada, None).await;
    app.approve_course(algebra).await;
    app.approve_course(biology).await;

    // Three enrollments across the two students.
    for (student, course) in [(lin, algebra), (mia, algebra), (mia, biology)] {
        let (status, _) = app
            .post(
                &format!("/api/admin/students/{}/enroll/{}", student, course),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get("/api/admin/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teacherCount"], 2);
    assert_eq!(body["data"]["studentCount"], 2);
    assert_eq!(body["data"]["courseCount"], 2);
    assert_eq!(body["data"]["enrollmentCount"], 3);
}

#[tokio::test]
async fn report_payload_shapes_and_sort_orders() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let grace = app.seed_teacher("Grace", "grace@school.test").await;
    let algebra = app.seed_course("Algebra", ada, Some("Math")).await;
    app.seed_course("Geometry", ada, Some("Math")).await;
    app.seed_course("Biology", grace, None).await;
    app.approve_course(algebra).await;
    app.seed_student("Lin", "lin@school.test", "5").await;
    app.seed_student("Mia", "mia@school.test", "5").await;
    app.seed_student("Noa", "noa@school.test", "6").await;

    let (status, body) = app.get("/api/admin/reports").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];

    assert_eq!(data["courseStatusCounts"]["total"], 3);
    assert_eq!(data["courseStatusCounts"]["approved"], 1);
    assert_eq!(data["courseStatusCounts"]["pending"], 2);
    assert_eq!(data["courseStatusCounts"]["rejected"], 0);

    // Subjects sorted by descending count; missing subject buckets as
    // "Uncategorized".
    assert_eq!(
        data["subjectDistribution"],
        json!([
            { "name": "Math", "count": 2 },
            { "name": "Uncategorized", "count": 1 },
        ])
    );

    // Teachers sorted by descending course count.
    assert_eq!(
        data["coursesPerTeacher"],
        json!([
            { "name": "Ada", "count": 2 },
            { "name": "Grace", "count": 1 },
        ])
    );

    assert_eq!(data["totalStudents"], 3);
    assert_eq!(
        data["studentGradeDistribution"],
        json!([
            { "name": "5", "count": 2 },
            { "name": "6", "count": 1 },
        ])
    );
    assert_eq!(data["placeholderCourseCompletionRate"], 0.0);
}

#[tokio::test]
async fn activity_feed_returns_newest_first_with_limit() {
    let app = TestApp::new().await;
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    app.seed_student("Lin", "lin@school.test", "5").await;
    let course = app.seed_course("Algebra", ada, None).await;
    app.approve_course(course).await;
    app.settle().await;

    let (status, body) = app.get("/api/admin/activity").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 4);

    // Newest first: the approval is the most recent action.
    assert_eq!(entries[0]["action"], "COURSE_APPROVED");
    assert_eq!(entries[3]["action"], "TEACHER_ADDED");
    assert_eq!(entries[0]["actorName"], "Head Admin");
    assert_eq!(entries[0]["targetName"], "Algebra");

    let (_, body) = app.get("/api/admin/activity?limit=2").await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "COURSE_APPROVED");
    assert_eq!(entries[1]["action"], "COURSE_ADDED");
}

#[tokio::test]
async fn settings_roundtrip_for_the_calling_admin() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/admin/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "admin@school.test");

    let (status, body) = app
        .put(
            "/api/admin/settings",
            json!({ "name": "Principal", "email": "principal@school.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Admin settings updated");
    assert_eq!(body["data"]["admin"]["name"], "Principal");

    // The new email now collides for other accounts.
    let ada = app.seed_teacher("Ada", "ada@school.test").await;
    let (status, body) = app
        .put(
            &format!("/api/admin/teachers/{}", ada),
            json!({ "email": "principal@school.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() {
    let app = TestApp::new().await;

    // No token at all.
    let (status, body) = app.request("GET", "/api/admin/overview", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    // A valid token without the admin role.
    let student_token = mint_token(
        &uuid::Uuid::new_v4(),
        "Lin",
        "lin@school.test",
        "student",
    );
    let (status, body) = app
        .request("GET", "/api/admin/overview", None, Some(&student_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin role required");

    // Garbage bearer token.
    let (status, _) = app
        .request("GET", "/api/admin/overview", None, Some("garbage"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public banner stays open.
    let (status, body) = app.request("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
