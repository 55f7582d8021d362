//! Validation and normalisation between the wire shapes and the registry.

use crate::{
    auth::services::is_valid_email,
    error::ApiError,
    projects::{
        dto::{SubmitProjectRequest, UpdateProjectRequest},
        fields::{main_image, Fallback, ImageSize},
        repo_types::{NewProject, ProjectChanges},
    },
};

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

fn image_size(raw: Option<String>) -> Result<Option<ImageSize>, ApiError> {
    raw.map(|s| s.parse::<ImageSize>().map_err(ApiError::Validation))
        .transpose()
}

/// Builds a pending submission. The main image is the first project image.
pub fn new_project(req: SubmitProjectRequest) -> Result<NewProject, ApiError> {
    let title = required(req.title, "title")?;
    let description = required(req.description, "description")?;
    let category = required(req.category, "category")?;
    let applicant_name = required(req.applicant_name, "applicant_name")?;
    let contact = required(req.contact, "contact")?;
    let email = required(req.email, "email")?.to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("invalid email".into()));
    }

    let project_images = req
        .project_images
        .map(|v| v.into_items(Fallback::Lines))
        .unwrap_or_default();

    Ok(NewProject {
        title,
        description,
        category,
        applicant_name,
        contact,
        email,
        project_url: req.project_url.unwrap_or_default().trim().to_string(),
        image_url: main_image(&project_images),
        image_size: image_size(req.image_size)?.unwrap_or_default(),
        detail_description: req.detail_description.unwrap_or_default(),
        features: req
            .features
            .map(|v| v.into_items(Fallback::Lines))
            .unwrap_or_default(),
        tech_stack: req
            .tech_stack
            .map(|v| v.into_items(Fallback::Commas))
            .unwrap_or_default(),
        links: req.links.map(|v| v.into_links()).unwrap_or_default(),
        project_images,
    })
}

pub fn project_changes(req: UpdateProjectRequest) -> Result<ProjectChanges, ApiError> {
    let title = req.title.map(|t| t.trim().to_string());
    if title.as_deref() == Some("") {
        return Err(ApiError::Validation("title must not be blank".into()));
    }
    Ok(ProjectChanges {
        title,
        description: req.description,
        project_url: req.project_url.map(|u| u.trim().to_string()),
        image_size: image_size(req.image_size)?,
        detail_url: req.detail_url.map(|u| u.trim().to_string()),
        detail_images: req.detail_images.map(|v| v.into_items(Fallback::Lines)),
        detail_description: req.detail_description,
        features: req.features.map(|v| v.into_items(Fallback::Lines)),
        tech_stack: req.tech_stack.map(|v| v.into_items(Fallback::Commas)),
        links: req.links.map(|v| v.into_links()),
    })
}
