use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        dto::{
            AdminLoginRequest, AdminProfile, AdminSession, LoginRequest, RefreshRequest,
            RegisterRequest, Registered, StudentSession, TokenPair,
        },
        extractors::ClientKey,
        jwt::JwtKeys,
        rate_limit::RateDecision,
        services::{
            register_user, verify_admin, verify_user, AuthFailure, RegisterError, Registration,
            UserVerdict,
        },
    },
    error::ApiError,
    moderation::ApprovalStatus,
    response::Envelope,
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<AdminSession>>, ApiError> {
    let Json(payload) = payload?;
    if state.admin_logins.try_begin(&client) == RateDecision::Blocked {
        return Err(ApiError::RateLimited);
    }

    let admin = match verify_admin(state.admins.as_ref(), &payload.username, &payload.password)
        .await
    {
        Ok(admin) => admin,
        Err(AuthFailure::InvalidCredentials) => {
            warn!(%client, "admin login failed");
            return Err(ApiError::InvalidCredentials);
        }
        Err(AuthFailure::Internal(e)) => {
            state.admin_logins.release(&client);
            return Err(e.into());
        }
    };
    state.admin_logins.reset(&client);

    let tokens = JwtKeys::from_ref(&state).issue_pair(admin.id, Role::Admin)?;
    info!(admin_id = %admin.id, "admin logged in");
    Ok(Json(Envelope::ok(
        "login successful",
        AdminSession {
            admin: AdminProfile {
                id: admin.id,
                username: admin.username,
            },
            tokens,
        },
    )))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Registered>>), ApiError> {
    let Json(payload) = payload?;
    let registration = Registration {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        grade: payload.grade,
        class_name: payload.class_name,
        student_number: payload.student_number,
    };

    let user = register_user(state.users.as_ref(), registration)
        .await
        .map_err(|e| match e {
            RegisterError::Invalid(msg) => ApiError::Validation(msg),
            RegisterError::DuplicateEmail => ApiError::DuplicateEmail,
            RegisterError::Internal(e) => ApiError::Internal(e),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "registration received, awaiting administrator approval",
            Registered { user_id: user.id },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn user_login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<StudentSession>>, ApiError> {
    let Json(payload) = payload?;
    if state.user_logins.try_begin(&client) == RateDecision::Blocked {
        return Err(ApiError::RateLimited);
    }

    let verdict = verify_user(state.users.as_ref(), &payload.email, &payload.password)
        .await
        .inspect_err(|_| state.user_logins.release(&client))?;
    let user = match verdict {
        UserVerdict::Approved(user) => user,
        UserVerdict::Pending(user) => {
            state.user_logins.release(&client);
            info!(user_id = %user.id, "login refused, account pending");
            return Err(ApiError::ForbiddenStatus(ApprovalStatus::Pending));
        }
        UserVerdict::Rejected(user) => {
            state.user_logins.release(&client);
            info!(user_id = %user.id, "login refused, account rejected");
            return Err(ApiError::ForbiddenStatus(ApprovalStatus::Rejected));
        }
        UserVerdict::NoMatch => {
            warn!(%client, "user login failed");
            return Err(ApiError::InvalidCredentials);
        }
    };
    state.user_logins.reset(&client);

    let tokens = JwtKeys::from_ref(&state).issue_pair(user.id, Role::Student)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(Envelope::ok(
        "login successful",
        StudentSession {
            user: user.into(),
            tokens,
        },
    )))
}

/// Issues a new token pair after re-checking the principal behind the
/// refresh token.
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Envelope<TokenPair>>, ApiError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired refresh token"))?;

    match claims.role {
        Role::Admin => {
            if state.admins.find_by_id(claims.sub).await?.is_none() {
                return Err(ApiError::Unauthorized("invalid or expired refresh token"));
            }
        }
        Role::Student => {
            let user = state
                .users
                .find_by_id(claims.sub)
                .await?
                .ok_or(ApiError::Unauthorized("invalid or expired refresh token"))?;
            if user.status != ApprovalStatus::Approved {
                return Err(ApiError::ForbiddenStatus(user.status));
            }
        }
    }

    let tokens = keys.issue_pair(claims.sub, claims.role)?;
    Ok(Json(Envelope::ok("token refreshed", tokens)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use crate::{app::build_app, state::AppState, test_support::send};

    fn student(email: &str) -> Value {
        json!({
            "email": email,
            "password": "correct-horse",
            "fullName": "Lee Jiwoo",
            "grade": "1",
            "className": "4",
            "studentNumber": 21
        })
    }

    #[tokio::test]
    async fn admin_login_returns_tokens_for_seeded_admin() {
        let state = AppState::fake();
        crate::auth::services::seed_admin(state.admins.as_ref(), "admin", "admin123")
            .await
            .unwrap();
        let app = build_app(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["admin"]["username"], "admin");
        assert!(body["access_token"].is_string());
        assert!(body["refresh_token"].is_string());
    }

    #[tokio::test]
    async fn sixth_failed_admin_login_is_rate_limited() {
        let state = AppState::fake();
        crate::auth::services::seed_admin(state.admins.as_ref(), "admin", "admin123")
            .await
            .unwrap();
        let app = build_app(state);
        let wrong = json!({"username": "admin", "password": "wrong"});

        for _ in 0..5 {
            let (status, body) =
                send(&app, Method::POST, "/api/admin/login", None, Some(wrong.clone())).await;
            assert_eq!(status, 401);
            assert_eq!(body["success"], false);
        }
        // Even the right password is refused while blocked.
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, 429);
    }

    #[tokio::test]
    async fn register_then_login_walks_the_approval_states() {
        let state = AppState::fake();
        let users = state.users.clone();
        let app = build_app(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/register",
            None,
            Some(student("jiwoo@school.kr")),
        )
        .await;
        assert_eq!(status, 201);
        assert!(body["userId"].is_string());

        let login = json!({"email": "jiwoo@school.kr", "password": "correct-horse"});
        let (status, body) =
            send(&app, Method::POST, "/api/users/login", None, Some(login.clone())).await;
        assert_eq!(status, 403);
        assert_eq!(body["error"], "pending");

        let id = body_user_id(&users, "jiwoo@school.kr").await;
        users.reject(id).await.unwrap();
        let (status, body) =
            send(&app, Method::POST, "/api/users/login", None, Some(login.clone())).await;
        assert_eq!(status, 403);
        assert_eq!(body["error"], "rejected");

        users.approve(id).await.unwrap();
        let (status, body) =
            send(&app, Method::POST, "/api/users/login", None, Some(login)).await;
        assert_eq!(status, 200);
        assert_eq!(body["user"]["fullName"], "Lee Jiwoo");
        assert!(body["access_token"].is_string());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_wrong_passwords_get_only_five_guesses() {
        let state = AppState::fake();
        crate::auth::services::seed_admin(state.admins.as_ref(), "admin", "admin123")
            .await
            .unwrap();
        let app = build_app(state);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move {
                    send(
                        &app,
                        Method::POST,
                        "/api/admin/login",
                        None,
                        Some(json!({"username": "admin", "password": "wrong"})),
                    )
                    .await
                    .0
                })
            })
            .collect();
        let mut evaluated = 0;
        let mut limited = 0;
        for task in tasks {
            match task.await.unwrap().as_u16() {
                401 => evaluated += 1,
                429 => limited += 1,
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!(evaluated, 5);
        assert_eq!(limited, 15);
    }

    #[tokio::test]
    async fn sixth_failed_user_login_is_limited_independently_of_admin() {
        let state = AppState::fake();
        crate::auth::services::seed_admin(state.admins.as_ref(), "admin", "admin123")
            .await
            .unwrap();
        let app = build_app(state);
        let wrong = json!({"email": "nobody@school.kr", "password": "wrong-password"});

        for _ in 0..5 {
            let (status, _) =
                send(&app, Method::POST, "/api/users/login", None, Some(wrong.clone())).await;
            assert_eq!(status, 401);
        }
        let (status, body) =
            send(&app, Method::POST, "/api/users/login", None, Some(wrong)).await;
        assert_eq!(status, 429);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn pending_login_neither_counts_nor_clears_failures() {
        let app = build_app(AppState::fake());
        send(
            &app,
            Method::POST,
            "/api/users/register",
            None,
            Some(student("wait@school.kr")),
        )
        .await;
        let wrong = json!({"email": "wait@school.kr", "password": "wrong-password"});
        let right = json!({"email": "wait@school.kr", "password": "correct-horse"});

        for _ in 0..4 {
            let (status, _) =
                send(&app, Method::POST, "/api/users/login", None, Some(wrong.clone())).await;
            assert_eq!(status, 401);
        }
        // Correct password on a pending account: refused, not counted.
        for _ in 0..3 {
            let (status, body) =
                send(&app, Method::POST, "/api/users/login", None, Some(right.clone())).await;
            assert_eq!(status, 403);
            assert_eq!(body["error"], "pending");
        }
        // Fifth failure is still evaluated, so nothing above was counted.
        let (status, _) =
            send(&app, Method::POST, "/api/users/login", None, Some(wrong)).await;
        assert_eq!(status, 401);
        // And the earlier failures were not cleared either.
        let (status, _) =
            send(&app, Method::POST, "/api/users/login", None, Some(right)).await;
        assert_eq!(status, 429);
    }

    async fn body_user_id(
        users: &std::sync::Arc<dyn crate::users::repo::UserStore>,
        email: &str,
    ) -> uuid::Uuid {
        users.find_by_email(email).await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/users/register",
            None,
            Some(student("dup@school.kr")),
        )
        .await;
        assert_eq!(status, 201);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/register",
            None,
            Some(student("dup@school.kr")),
        )
        .await;
        assert_eq!(status, 409);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"email": "x@y.z"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn refresh_issues_new_pair_and_rejects_access_tokens() {
        let state = AppState::fake();
        crate::auth::services::seed_admin(state.admins.as_ref(), "admin", "admin123")
            .await
            .unwrap();
        let app = build_app(state);
        let (_, login) = send(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": login["refresh_token"]})),
        )
        .await;
        assert_eq!(status, 200);
        assert!(body["access_token"].is_string());

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": login["access_token"]})),
        )
        .await;
        assert_eq!(status, 401);
    }
}
