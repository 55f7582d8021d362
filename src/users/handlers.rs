use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::StudentProfile,
        extractors::{AdminUser, StudentUser},
    },
    error::ApiError,
    moderation::ModerationAction,
    response::{Envelope, NoData},
    state::AppState,
    users::repo_types::User,
};

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    StudentUser(user_id): StudentUser,
) -> Result<Json<StudentProfile>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, id))]
pub async fn approve_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    let user = state
        .users
        .approve(id)
        .await?
        .settle("user", ModerationAction::Approve)?;
    info!(%admin_id, user_id = %user.id, "user approved");
    Ok(Json(Envelope::ack("user approved")))
}

#[instrument(skip(state, id))]
pub async fn reject_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    let user = state
        .users
        .reject(id)
        .await?
        .settle("user", ModerationAction::Reject)?;
    info!(%admin_id, user_id = %user.id, "user rejected");
    Ok(Json(Envelope::ack("user rejected")))
}

#[instrument(skip(state, id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<NoData>>, ApiError> {
    let Path(id) = id?;
    if !state.users.delete(id).await? {
        return Err(ApiError::NotFound("user"));
    }
    info!(%admin_id, user_id = %id, "user deleted");
    Ok(Json(Envelope::ack("user deleted")))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use uuid::Uuid;

    use crate::{
        app::build_app,
        auth::{claims::Role, jwt::JwtKeys, services::seed_admin},
        moderation::ApprovalStatus,
        state::AppState,
        test_support::send,
        users::repo_types::NewUser,
    };

    async fn admin_token(state: &AppState) -> String {
        seed_admin(state.admins.as_ref(), "admin", "admin123").await.unwrap();
        let admin = state.admins.find_by_username("admin").await.unwrap().unwrap();
        JwtKeys::from(&state.config.jwt)
            .sign_access(admin.id, Role::Admin)
            .unwrap()
    }

    async fn pending_user(state: &AppState, email: &str) -> Uuid {
        state
            .users
            .insert(NewUser {
                email: email.into(),
                password_hash: "x".into(),
                full_name: "Park Seoyeon".into(),
                grade: "3".into(),
                class_name: "1".into(),
                student_number: 7,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn approve_twice_reports_no_change() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        let id = pending_user(&state, "a@school.kr").await;
        let app = build_app(state.clone());
        let uri = format!("/api/users/{id}/approve");

        let (status, body) = send(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.status, ApprovalStatus::Approved);
        let first_approval = user.approved_at;
        assert!(first_approval.is_some());

        let (status, body) = send(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, 409);
        assert_eq!(body["error"], "already approved");

        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.approved_at, first_approval);
    }

    #[tokio::test]
    async fn reject_clears_approval_time() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        let id = pending_user(&state, "b@school.kr").await;
        state.users.approve(id).await.unwrap();
        let app = build_app(state.clone());

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/users/{id}/reject"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        let user = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.status, ApprovalStatus::Rejected);
        assert!(user.approved_at.is_none());
    }

    #[tokio::test]
    async fn unknown_or_malformed_id_is_not_found() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        let app = build_app(state);

        let uri = format!("/api/users/{}/approve", Uuid::new_v4());
        let (status, _) = send(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, 404);

        let (status, _) =
            send(&app, Method::POST, "/api/users/not-a-uuid/approve", Some(&token), None).await;
        assert_eq!(status, 404);

        let uri = format!("/api/users/{}", Uuid::new_v4());
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn listing_hides_password_hashes() {
        let state = AppState::fake();
        let token = admin_token(&state).await;
        pending_user(&state, "c@school.kr").await;
        let app = build_app(state);

        let (status, body) = send(&app, Method::GET, "/api/users", Some(&token), None).await;
        assert_eq!(status, 200);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].get("password_hash").is_none());
        assert_eq!(users[0]["status"], "pending");
    }

    #[tokio::test]
    async fn moderation_needs_an_admin() {
        let state = AppState::fake();
        let id = pending_user(&state, "d@school.kr").await;
        state.users.approve(id).await.unwrap();
        let student = JwtKeys::from(&state.config.jwt)
            .sign_access(id, Role::Student)
            .unwrap();
        let app = build_app(state);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/users/{id}"), None, None).await;
        assert_eq!(status, 401);
        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/users/{id}"), Some(&student), None).await;
        assert_eq!(status, 403);
        let (status, _) = send(&app, Method::GET, "/api/users", Some("garbage"), None).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn token_of_deleted_admin_is_refused() {
        let state = AppState::fake();
        let ghost = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4(), Role::Admin)
            .unwrap();
        let app = build_app(state);
        let (status, _) = send(&app, Method::GET, "/api/users", Some(&ghost), None).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn me_requires_an_approved_student() {
        let state = AppState::fake();
        let id = pending_user(&state, "e@school.kr").await;
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(id, Role::Student)
            .unwrap();
        let app = build_app(state.clone());

        let (status, body) = send(&app, Method::GET, "/api/users/me", Some(&token), None).await;
        assert_eq!(status, 403);
        assert_eq!(body["error"], "pending");

        state.users.approve(id).await.unwrap();
        let (status, body) = send(&app, Method::GET, "/api/users/me", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["email"], "e@school.kr");
        assert_eq!(body["studentNumber"], 7);
    }
}
