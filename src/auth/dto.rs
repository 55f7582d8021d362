use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::User;

/// Request body for administrator login.
#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for student registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "full_name")]
    pub full_name: String,
    pub grade: String,
    #[serde(alias = "class_name")]
    pub class_name: String,
    #[serde(alias = "student_number")]
    pub student_number: i32,
}

/// Request body for student login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub username: String,
}

/// Public part of the student returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub grade: String,
    pub class_name: String,
    pub student_number: i32,
}

impl From<User> for StudentProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            grade: u.grade,
            class_name: u.class_name,
            student_number: u.student_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub admin: AdminProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct StudentSession {
    pub user: StudentProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub user_id: Uuid,
}
