//! In-memory stores mirroring the SQL guards of the Postgres adapters, plus
//! helpers for driving the router in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    auth::{
        repo::AdminStore,
        repo_types::Admin,
    },
    moderation::{ApprovalStatus, ModerationAction, Outcome},
    projects::{
        repo::ProjectStore,
        repo_types::{NewProject, Project, ProjectChanges},
    },
    storage::StorageClient,
    users::{
        repo::{InsertUserError, UserStore},
        repo_types::{NewUser, User},
    },
};

#[derive(Default)]
pub struct MemoryAdminStore {
    rows: Mutex<Vec<Admin>>,
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Admin>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|a| a.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Admin>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|a| a.id == id).cloned())
    }

    async fn seed(&self, username: &str, password_hash: &str) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|a| a.username == username) {
            return Ok(false);
        }
        rows.push(Admin {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(true)
    }
}

fn stamp(action: ModerationAction) -> Option<OffsetDateTime> {
    match action {
        ModerationAction::Approve => Some(OffsetDateTime::now_utc()),
        ModerationAction::Reject => None,
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == new.email) {
            return Err(InsertUserError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            grade: new.grade,
            class_name: new.class_name,
            student_number: new.student_number,
            status: ApprovalStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            approved_at: None,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut rows: Vec<User> = self.rows.lock().unwrap().iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn moderate(&self, id: Uuid, action: ModerationAction) -> anyhow::Result<Outcome<User>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(Outcome::NotFound);
        };
        if !action.applies_to(user.status) {
            return Ok(Outcome::NoChange);
        }
        user.status = action.target();
        user.approved_at = stamp(action);
        Ok(Outcome::Changed(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryProjectStore {
    rows: Mutex<Vec<Project>>,
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn insert(&self, new: NewProject) -> anyhow::Result<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            category: new.category,
            applicant_name: new.applicant_name,
            contact: new.contact,
            email: new.email,
            project_url: new.project_url,
            image_url: new.image_url,
            image_size: new.image_size,
            detail_description: new.detail_description,
            detail_url: String::new(),
            features: Json(new.features),
            tech_stack: Json(new.tech_stack),
            links: Json(new.links),
            project_images: Json(new.project_images),
            detail_images: Json(Vec::new()),
            status: ApprovalStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            approved_at: None,
        };
        self.rows.lock().unwrap().push(project.clone());
        Ok(project)
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> anyhow::Result<Vec<Project>> {
        let mut rows: Vec<Project> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_approved(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|p| p.id == id && p.status == ApprovalStatus::Approved)
            .cloned())
    }

    async fn moderate(
        &self,
        id: Uuid,
        action: ModerationAction,
    ) -> anyhow::Result<Outcome<Project>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(project) = rows.iter_mut().find(|p| p.id == id) else {
            return Ok(Outcome::NotFound);
        };
        if !action.applies_to(project.status) {
            return Ok(Outcome::NoChange);
        }
        project.status = action.target();
        project.approved_at = stamp(action);
        Ok(Outcome::Changed(project.clone()))
    }

    async fn update_approved(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> anyhow::Result<Option<Project>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(p) = rows
            .iter_mut()
            .find(|p| p.id == id && p.status == ApprovalStatus::Approved)
        else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            p.title = v;
        }
        if let Some(v) = changes.description {
            p.description = v;
        }
        if let Some(v) = changes.project_url {
            p.project_url = v;
        }
        if let Some(v) = changes.image_size {
            p.image_size = v;
        }
        if let Some(v) = changes.detail_url {
            p.detail_url = v;
        }
        if let Some(v) = changes.detail_images {
            p.detail_images = Json(v);
        }
        if let Some(v) = changes.detail_description {
            p.detail_description = v;
        }
        if let Some(v) = changes.features {
            p.features = Json(v);
        }
        if let Some(v) = changes.tech_stack {
            p.tech_stack = Json(v);
        }
        if let Some(v) = changes.links {
            p.links = Json(v);
        }
        Ok(Some(p.clone()))
    }

    async fn delete_approved(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| !(p.id == id && p.status == ApprovalStatus::Approved));
        Ok(rows.len() < before)
    }

    async fn count_by_status(&self, status: ApprovalStatus) -> anyhow::Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|p| p.status == status).count() as i64)
    }
}

/// Records uploads instead of sending them anywhere.
#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), body.len(), content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://fake.local/{key}")
    }
}

/// Sends one request through the router and decodes the JSON answer.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    send_request(app, req).await
}

pub async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
