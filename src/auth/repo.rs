use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::Admin;

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Admin>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Admin>>;
    /// Inserts the admin unless the username already exists. True when inserted.
    async fn seed(&self, username: &str, password_hash: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgAdminStore {
    db: PgPool,
}

impl PgAdminStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find admin by username")?;
        Ok(admin)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM admins
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find admin by id")?;
        Ok(admin)
    }

    async fn seed(&self, username: &str, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("seed admin")?;
        Ok(res.rows_affected() == 1)
    }
}
