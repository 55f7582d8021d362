use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    moderation::{settle_unchanged, ApprovalStatus, ModerationAction, Outcome},
    projects::repo_types::{NewProject, Project, ProjectChanges},
};

const PROJECT_COLUMNS: &str = r#"
    id, title, description, category, applicant_name, contact, email,
    project_url, image_url, image_size, detail_description, detail_url,
    features, tech_stack, links, project_images, detail_images,
    status, created_at, approved_at
"#;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert(&self, new: NewProject) -> anyhow::Result<Project>;
    /// Projects in `status`, newest first.
    async fn list_by_status(&self, status: ApprovalStatus) -> anyhow::Result<Vec<Project>>;
    async fn find_approved(&self, id: Uuid) -> anyhow::Result<Option<Project>>;
    async fn moderate(&self, id: Uuid, action: ModerationAction)
        -> anyhow::Result<Outcome<Project>>;
    /// Applies `changes` only while the project is approved.
    async fn update_approved(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> anyhow::Result<Option<Project>>;
    /// Deletes only while the project is approved. True when a row was removed.
    async fn delete_approved(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_by_status(&self, status: ApprovalStatus) -> anyhow::Result<i64>;

    async fn approve(&self, id: Uuid) -> anyhow::Result<Outcome<Project>> {
        self.moderate(id, ModerationAction::Approve).await
    }

    async fn reject(&self, id: Uuid) -> anyhow::Result<Outcome<Project>> {
        self.moderate(id, ModerationAction::Reject).await
    }
}

#[derive(Clone)]
pub struct PgProjectStore {
    db: PgPool,
}

impl PgProjectStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn insert(&self, new: NewProject) -> anyhow::Result<Project> {
        let sql = format!(
            r#"
                INSERT INTO projects
                (title, description, category, applicant_name, contact, email, project_url,
                image_url, image_size, detail_description, features, tech_stack, links,
                project_images, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'pending')
                RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.category)
            .bind(&new.applicant_name)
            .bind(&new.contact)
            .bind(&new.email)
            .bind(&new.project_url)
            .bind(&new.image_url)
            .bind(new.image_size)
            .bind(&new.detail_description)
            .bind(Json(&new.features))
            .bind(Json(&new.tech_stack))
            .bind(Json(&new.links))
            .bind(Json(&new.project_images))
            .fetch_one(&self.db)
            .await
            .context("insert project")?;
        Ok(project)
    }

    async fn list_by_status(&self, status: ApprovalStatus) -> anyhow::Result<Vec<Project>> {
        let sql = format!(
            r#"
                SELECT {PROJECT_COLUMNS} FROM projects WHERE status = $1 ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Project>(&sql)
            .bind(status)
            .fetch_all(&self.db)
            .await
            .context("list projects")?;
        Ok(rows)
    }

    async fn find_approved(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        let sql = format!(
            r#"
                SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND status = 'approved'
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find approved project")?;
        Ok(project)
    }

    async fn moderate(
        &self,
        id: Uuid,
        action: ModerationAction,
    ) -> anyhow::Result<Outcome<Project>> {
        let sql = format!(
            r#"
                UPDATE projects
                SET status = $2,
                approved_at = CASE WHEN $2 = 'approved'::approval_status THEN now() ELSE NULL END
                WHERE id = $1 AND status <> $2
                RETURNING {PROJECT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(action.target())
            .fetch_optional(&self.db)
            .await
            .context("moderate project")?;
        match updated {
            Some(project) => Ok(Outcome::Changed(project)),
            None => settle_unchanged(&self.db, "projects", id).await,
        }
    }

    async fn update_approved(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> anyhow::Result<Option<Project>> {
        let sql = format!(
            r#"
                UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                project_url = COALESCE($4, project_url),
                image_size = COALESCE($5, image_size),
                detail_url = COALESCE($6, detail_url),
                detail_images = COALESCE($7, detail_images),
                detail_description = COALESCE($8, detail_description),
                features = COALESCE($9, features),
                tech_stack = COALESCE($10, tech_stack),
                links = COALESCE($11, links)
                WHERE id = $1 AND status = 'approved'
                RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.project_url)
            .bind(changes.image_size)
            .bind(changes.detail_url)
            .bind(changes.detail_images.map(Json))
            .bind(changes.detail_description)
            .bind(changes.features.map(Json))
            .bind(changes.tech_stack.map(Json))
            .bind(changes.links.map(Json))
            .fetch_optional(&self.db)
            .await
            .context("update approved project")?;
        Ok(project)
    }

    async fn delete_approved(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM projects WHERE id = $1 AND status = 'approved'")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete approved project")?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_by_status(&self, status: ApprovalStatus) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE status = $1")
            .bind(status)
            .fetch_one(&self.db)
            .await
            .context("count projects")?;
        Ok(count)
    }
}
