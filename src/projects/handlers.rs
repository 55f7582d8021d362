use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::ApiError,
    moderation::{ApprovalStatus, ModerationAction},
    projects::{
        dto::{ProjectStats, SubmitProjectRequest, Submitted, UpdateProjectRequest},
        repo_types::Project,
        services::{new_project, project_changes},
    },
    response::{Envelope, NoData},
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Submitted>>), ApiError> {
    let Json(payload) = payload?;
    let project = state.projects.insert(new_project(payload)?).await?;
    info!(project_id = %project.id, title = %project.title, "project submitted");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "application received",
            Submitted {
                project_id: project.id,
            },
        )),
    ))
}

#[instrument(skip(state))]
pub async fn list_applications(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(
        state.projects.list_by_status(ApprovalStatus::Pending).await?,
    ))
}

#[instrument(skip(state, id))]
pub async fn approve_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    let project = state
        .projects
        .approve(id)
        .await?
        .settle("project", ModerationAction::Approve)?;
    info!(%admin_id, project_id = %project.id, "project approved");
    Ok(Json(Envelope::ack("project approved")))
}

#[instrument(skip(state, id))]
pub async fn reject_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    let project = state
        .projects
        .reject(id)
        .await?
        .settle("project", ModerationAction::Reject)?;
    info!(%admin_id, project_id = %project.id, "project rejected");
    Ok(Json(Envelope::ack("project rejected")))
}

#[instrument(skip(state))]
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(
        state.projects.list_by_status(ApprovalStatus::Approved).await?,
    ))
}

#[instrument(skip(state, id))]
pub async fn get_project(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Project>, ApiError> {
    let Path(id) = id?;
    state
        .projects
        .find_approved(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("project"))
}

#[instrument(skip(state, id, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = project_changes(payload)?;
    state
        .projects
        .update_approved(id, changes)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    info!(%admin_id, project_id = %id, "project updated");
    Ok(Json(Envelope::ack("project updated")))
}

#[instrument(skip(state, id))]
pub async fn delete_project(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    if !state.projects.delete_approved(id).await? {
        return Err(ApiError::NotFound("project"));
    }
    info!(%admin_id, project_id = %id, "project deleted");
    Ok(Json(Envelope::ack("project deleted")))
}

#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<ProjectStats>, ApiError> {
    let pending = state.projects.count_by_status(ApprovalStatus::Pending).await?;
    let approved = state.projects.count_by_status(ApprovalStatus::Approved).await?;
    Ok(Json(ProjectStats {
        pending,
        approved,
        total: approved,
    }))
}
