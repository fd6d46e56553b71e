//! An in-process fake of the remote `/users/` profile store.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

/// One request as the fake saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct FakeStore {
    users: Mutex<Vec<Value>>,
    next_id: AtomicI64,
    requests: Mutex<Vec<Recorded>>,
    /// When non-zero, `GET /users/` answers with this status.
    list_failure: AtomicU16,
}

impl FakeStore {
    pub fn seed(&self, user: Value) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut user = user;
        user["id"] = json!(id);
        self.users.lock().unwrap().push(user);
        id
    }

    pub fn fail_list_with(&self, status: u16) {
        self.list_failure.store(status, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }

    pub fn users(&self) -> Vec<Value> {
        self.users.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, path: String, body: Option<Value>) {
        self.requests.lock().unwrap().push(Recorded { method, path, body });
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "User not found." }))).into_response()
}

async fn create_user(State(store): State<Arc<FakeStore>>, Json(body): Json<Value>) -> Response {
    store.record("POST", "/users/".to_string(), Some(body.clone()));
    let email = body["email"].as_str().unwrap_or_default().to_lowercase();
    let taken = store
        .users()
        .iter()
        .any(|u| u["email"].as_str().unwrap_or_default().to_lowercase() == email);
    if taken {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered." })),
        )
            .into_response();
    }
    let id = store.seed(body);
    let created = store.users().into_iter().find(|u| u["id"] == json!(id));
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn list_users(State(store): State<Arc<FakeStore>>) -> Response {
    store.record("GET", "/users/".to_string(), None);
    let failure = store.list_failure.load(Ordering::SeqCst);
    if failure != 0 {
        let status = StatusCode::from_u16(failure).unwrap();
        return (status, "Internal Server Error").into_response();
    }
    Json(Value::Array(store.users())).into_response()
}

async fn get_user(State(store): State<Arc<FakeStore>>, Path(id): Path<i64>) -> Response {
    store.record("GET", format!("/users/{id}"), None);
    match store.users().into_iter().find(|u| u["id"] == json!(id)) {
        Some(user) => Json(user).into_response(),
        None => not_found(),
    }
}

async fn update_user(
    State(store): State<Arc<FakeStore>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    store.record("PATCH", format!("/users/{id}"), Some(body.clone()));
    let mut users = store.users.lock().unwrap();
    let Some(user) = users.iter_mut().find(|u| u["id"] == json!(id)) else {
        return not_found();
    };
    if let (Some(target), Some(changes)) = (user.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(store): State<Arc<FakeStore>>, Path(id): Path<i64>) -> Response {
    store.record("DELETE", format!("/users/{id}"), None);
    let mut users = store.users.lock().unwrap();
    let before = users.len();
    users.retain(|u| u["id"] != json!(id));
    if users.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Starts the fake on an ephemeral port and returns its origin.
pub async fn spawn_store(store: Arc<FakeStore>) -> String {
    let app = Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn user(full_name: &str, email: &str, skills: &[&str]) -> Value {
    json!({
        "full_name": full_name,
        "email": email,
        "headline": null,
        "skills": skills,
        "interests": [],
        "github_url": null,
        "colab_url": null,
    })
}
