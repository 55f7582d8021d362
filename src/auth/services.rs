//! Credential store: verifies administrator and student logins and
//! registers new students.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    auth::{
        password::{hash_password, verify_missing, verify_password},
        repo::AdminStore,
        repo_types::Admin,
    },
    moderation::ApprovalStatus,
    users::{
        repo::{InsertUserError, UserStore},
        repo_types::{NewUser, User},
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Unknown principal and wrong password are deliberately indistinguishable.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result of checking a student's credentials.
#[derive(Debug)]
pub enum UserVerdict {
    Approved(User),
    Pending(User),
    Rejected(User),
    NoMatch,
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{0}")]
    Invalid(String),
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<InsertUserError> for RegisterError {
    fn from(e: InsertUserError) -> Self {
        match e {
            InsertUserError::DuplicateEmail => RegisterError::DuplicateEmail,
            InsertUserError::Storage(e) => RegisterError::Internal(e),
        }
    }
}

/// Registration input as received, before validation.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub grade: String,
    pub class_name: String,
    pub student_number: i32,
}

pub async fn verify_admin(
    admins: &dyn AdminStore,
    username: &str,
    password: &str,
) -> Result<Admin, AuthFailure> {
    let Some(admin) = admins.find_by_username(username.trim()).await? else {
        verify_missing(password);
        debug!("admin login for unknown username");
        return Err(AuthFailure::InvalidCredentials);
    };
    if verify_password(password, &admin.password_hash)? {
        Ok(admin)
    } else {
        debug!(admin_id = %admin.id, "admin login with wrong password");
        Err(AuthFailure::InvalidCredentials)
    }
}

pub async fn verify_user(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> anyhow::Result<UserVerdict> {
    let email = normalize_email(email);
    let Some(user) = users.find_by_email(&email).await? else {
        verify_missing(password);
        return Ok(UserVerdict::NoMatch);
    };
    if !verify_password(password, &user.password_hash)? {
        return Ok(UserVerdict::NoMatch);
    }
    Ok(match user.status {
        ApprovalStatus::Approved => UserVerdict::Approved(user),
        ApprovalStatus::Pending => UserVerdict::Pending(user),
        ApprovalStatus::Rejected => UserVerdict::Rejected(user),
    })
}

fn validate(reg: &Registration) -> Result<(), RegisterError> {
    let invalid = |msg: &str| Err(RegisterError::Invalid(msg.to_string()));
    if !is_valid_email(&reg.email) {
        return invalid("invalid email");
    }
    if reg.password.chars().count() < MIN_PASSWORD_LEN {
        return invalid("password must be at least 8 characters");
    }
    if reg.full_name.trim().is_empty() {
        return invalid("full name is required");
    }
    if reg.grade.trim().is_empty() {
        return invalid("grade is required");
    }
    if reg.class_name.trim().is_empty() {
        return invalid("class name is required");
    }
    if reg.student_number <= 0 {
        return invalid("student number must be positive");
    }
    Ok(())
}

pub async fn register_user(
    users: &dyn UserStore,
    mut reg: Registration,
) -> Result<User, RegisterError> {
    reg.email = normalize_email(&reg.email);
    validate(&reg)?;

    let password_hash = hash_password(&reg.password)?;
    let user = users
        .insert(NewUser {
            email: reg.email,
            password_hash,
            full_name: reg.full_name.trim().to_string(),
            grade: reg.grade.trim().to_string(),
            class_name: reg.class_name.trim().to_string(),
            student_number: reg.student_number,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered, awaiting approval");
    Ok(user)
}

/// Creates the configured administrator if it does not exist yet.
pub async fn seed_admin(
    admins: &dyn AdminStore,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    if admins.find_by_username(username).await?.is_some() {
        debug!(username, "admin already present");
        return Ok(());
    }
    let hash = hash_password(password)?;
    if admins.seed(username, &hash).await? {
        info!(username, "default admin created");
    }
    Ok(())
}
