#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use campus_admin_api::app::{app, AppState};
use campus_admin_api::auth::{generate_jwt, Claims};
use campus_admin_api::database::models::Account;
use campus_admin_api::store::{DirectoryStore, MemoryDirectoryStore};

/// In-process test harness: the full router over a memory store, seeded with
/// one admin account whose token authenticates every request.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryDirectoryStore>,
    pub admin: Account,
    token: String,
}

impl TestApp {
    pub async fn new() -> TestApp {
        // The config singleton reads this on first access; every test sets
        // the same value so ordering across tests does not matter.
        std::env::set_var("JWT_SECRET", "test-secret");

        let store = Arc::new(MemoryDirectoryStore::new());
        let admin = Account::admin("Head Admin", "admin@school.test");
        store.insert_account(&admin).await.expect("seed admin");

        let shared: Arc<dyn DirectoryStore> = store.clone();
        let state = AppState::new(shared);
        let router = app(state);

        let token = mint_token(&admin.id, "Head Admin", "admin@school.test", "admin");

        TestApp {
            router,
            store,
            admin,
            token,
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request("GET", path, None, Some(&self.token)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(body), Some(&self.token)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", path, Some(body), Some(&self.token)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request("DELETE", path, None, Some(&self.token)).await
    }

    pub async fn delete_with_body(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("DELETE", path, Some(body), Some(&self.token)).await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    // -- seeding shortcuts (through the API, like an operator would) -------

    /// POST a teacher and return its id.
    pub async fn seed_teacher(&self, name: &str, email: &str) -> Uuid {
        let (status, body) = self
            .post("/api/admin/teachers", json!({ "name": name, "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed teacher: {}", body);
        parse_uuid(&body["data"]["teacher"]["id"])
    }

    /// POST a student and return its id.
    pub async fn seed_student(&self, name: &str, email: &str, grade: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/admin/students",
                json!({ "name": name, "email": email, "grade": grade }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed student: {}", body);
        parse_uuid(&body["data"]["student"]["id"])
    }

    /// POST a course owned by `teacher` and return its id.
    pub async fn seed_course(&self, name: &str, teacher: Uuid, subject: Option<&str>) -> Uuid {
        let mut payload = json!({ "name": name, "teacher": teacher.to_string() });
        if let Some(subject) = subject {
            payload["subject"] = json!(subject);
        }
        let (status, body) = self.post("/api/admin/courses", payload).await;
        assert_eq!(status, StatusCode::CREATED, "seed course: {}", body);
        parse_uuid(&body["data"]["course"]["id"])
    }

    pub async fn approve_course(&self, course: Uuid) {
        let (status, body) = self
            .put(&format!("/api/admin/courses/{}/approve", course), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "approve course: {}", body);
    }

    /// Let detached activity-log appends settle before asserting on the feed.
    pub async fn settle(&self) {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

pub fn mint_token(id: &Uuid, name: &str, email: &str, role: &str) -> String {
    let claims = Claims::new(*id, name.to_string(), email.to_string(), role.to_string());
    generate_jwt(&claims).expect("mint token")
}

pub fn parse_uuid(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("expected uuid, got {}", value))
}

/// Ids from an array of objects carrying an `id` field.
pub fn ids_of(value: &Value) -> Vec<Uuid> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|item| parse_uuid(&item["id"]))
        .collect()
}
