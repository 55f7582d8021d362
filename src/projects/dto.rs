use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::projects::fields::{LinksInput, ListInput};

/// Body of `POST /api/applications`. Everything is optional at the wire
/// level; required fields are checked by the service so the client gets a
/// readable message instead of a serde error.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub applicant_name: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub project_url: Option<String>,
    pub image_size: Option<String>,
    pub detail_description: Option<String>,
    pub features: Option<ListInput>,
    pub tech_stack: Option<ListInput>,
    pub links: Option<LinksInput>,
    pub project_images: Option<ListInput>,
}

/// Body of `PUT /api/projects/:id`. Absent or null fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_url: Option<String>,
    pub image_size: Option<String>,
    pub detail_url: Option<String>,
    pub detail_images: Option<ListInput>,
    pub detail_description: Option<String>,
    pub features: Option<ListInput>,
    pub tech_stack: Option<ListInput>,
    pub links: Option<LinksInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub project_id: Uuid,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProjectStats {
    pub pending: i64,
    pub approved: i64,
    pub total: i64,
}
