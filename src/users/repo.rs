use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::is_unique_violation,
    moderation::{settle_unchanged, ModerationAction, Outcome},
    users::repo_types::{NewUser, User},
};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, full_name, grade, class_name,
    student_number, status, created_at, approved_at
"#;

#[derive(Debug, Error)]
pub enum InsertUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a pending user. Uniqueness is enforced by the store itself.
    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// All users, newest first.
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn moderate(&self, id: Uuid, action: ModerationAction) -> anyhow::Result<Outcome<User>>;
    /// True when a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn approve(&self, id: Uuid) -> anyhow::Result<Outcome<User>> {
        self.moderate(id, ModerationAction::Approve).await
    }

    async fn reject(&self, id: Uuid) -> anyhow::Result<Outcome<User>> {
        self.moderate(id, ModerationAction::Reject).await
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError> {
        let sql = format!(
            r#"
                INSERT INTO users (email, password_hash, full_name, grade, class_name, student_number)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.full_name)
            .bind(&new.grade)
            .bind(&new.class_name)
            .bind(new.student_number)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    InsertUserError::DuplicateEmail
                } else {
                    InsertUserError::Storage(anyhow::Error::new(e).context("insert user"))
                }
            })
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
                SELECT {USER_COLUMNS} FROM users WHERE email = $1
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
                SELECT {USER_COLUMNS} FROM users WHERE id = $1
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            r#"
                SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(rows)
    }

    async fn moderate(&self, id: Uuid, action: ModerationAction) -> anyhow::Result<Outcome<User>> {
        // The status guard makes the loser of two concurrent identical
        // transitions see zero rows instead of re-stamping approved_at.
        let sql = format!(
            r#"
                UPDATE users
                SET status = $2,
                approved_at = CASE WHEN $2 = 'approved'::approval_status THEN now() ELSE NULL END
                WHERE id = $1 AND status <> $2
                RETURNING {USER_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(action.target())
            .fetch_optional(&self.db)
            .await
            .context("moderate user")?;
        match updated {
            Some(user) => Ok(Outcome::Changed(user)),
            None => settle_unchanged(&self.db, "users", id).await,
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}
