use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::moderation::ApprovalStatus;
use crate::projects::fields::{ImageSize, ProjectLink};

/// Project submission record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub applicant_name: String,
    pub contact: String,
    pub email: String,
    pub project_url: String,
    pub image_url: String, // first of project_images at submission time
    pub image_size: ImageSize,
    pub detail_description: String,
    pub detail_url: String,
    pub features: Json<Vec<String>>,
    pub tech_stack: Json<Vec<String>>,
    pub links: Json<Vec<ProjectLink>>,
    pub project_images: Json<Vec<String>>,
    pub detail_images: Json<Vec<String>>,
    pub status: ApprovalStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
}

/// Validated submission ready to insert; always stored as pending.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub category: String,
    pub applicant_name: String,
    pub contact: String,
    pub email: String,
    pub project_url: String,
    pub image_url: String,
    pub image_size: ImageSize,
    pub detail_description: String,
    pub features: Vec<String>,
    pub tech_stack: Vec<String>,
    pub links: Vec<ProjectLink>,
    pub project_images: Vec<String>,
}

/// Edits to an approved project. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_url: Option<String>,
    pub image_size: Option<ImageSize>,
    pub detail_url: Option<String>,
    pub detail_images: Option<Vec<String>>,
    pub detail_description: Option<String>,
    pub features: Option<Vec<String>>,
    pub tech_stack: Option<Vec<String>>,
    pub links: Option<Vec<ProjectLink>>,
}
