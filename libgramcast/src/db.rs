//! Database operations for Gramcast

use sqlx::sqlite::SqlitePool;
use std::path::Path;

use crate::error::Result;
use crate::types::{Account, MediaKind, Post, PostStatus};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::DbError::IoError)?;
        }

        // Use forward slashes for the SQLite URL and mode=rwc so the file is
        // created on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(crate::error::DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(crate::error::DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Insert a new account row
    pub async fn create_account(&self, account: &Account) -> Result<()> {
        let is_active = if account.is_active { 1 } else { 0 };

        sqlx::query(
            r#"
            INSERT INTO accounts (id, instagram_user_id, username, display_name,
                profile_picture_url, access_token, token_expires_at, is_active,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.instagram_user_id)
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(&account.profile_picture_url)
        .bind(&account.access_token)
        .bind(account.token_expires_at)
        .bind(is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Overwrite the mutable fields of an account row. The Instagram user id
    /// and creation time never change.
    pub async fn update_account(&self, account: &Account) -> Result<()> {
        let is_active = if account.is_active { 1 } else { 0 };

        sqlx::query(
            r#"
            UPDATE accounts
            SET username = ?, display_name = ?, profile_picture_url = ?,
                access_token = ?, token_expires_at = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(&account.profile_picture_url)
        .bind(&account.access_token)
        .bind(account.token_expires_at)
        .bind(is_active)
        .bind(account.updated_at)
        .bind(&account.id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Get an account by id, only if it is active
    pub async fn get_active_account(&self, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, instagram_user_id, username, display_name, profile_picture_url,
                   access_token, token_expires_at, is_active, created_at, updated_at
            FROM accounts WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(row.map(|r| row_to_account(&r)))
    }

    /// Get an account by Instagram user id, active or not. Reconnecting an
    /// account must find rows that were previously deactivated.
    pub async fn get_account_by_instagram_user_id(
        &self,
        instagram_user_id: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, instagram_user_id, username, display_name, profile_picture_url,
                   access_token, token_expires_at, is_active, created_at, updated_at
            FROM accounts WHERE instagram_user_id = ?
            "#,
        )
        .bind(instagram_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(row.map(|r| row_to_account(&r)))
    }

    /// List all active accounts, newest first
    pub async fn list_active_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, instagram_user_id, username, display_name, profile_picture_url,
                   access_token, token_expires_at, is_active, created_at, updated_at
            FROM accounts WHERE is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Clear the active flag on an account. Returns false when the account
    /// does not exist or was already inactive.
    pub async fn deactivate_account(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET is_active = 0, updated_at = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a new post row
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, account_id, media_kind, media_url, caption, status,
                container_id, instagram_media_id, permalink, error_message,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.account_id)
        .bind(post.media_kind.as_str())
        .bind(&post.media_url)
        .bind(&post.caption)
        .bind(post.status.as_str())
        .bind(&post.container_id)
        .bind(&post.instagram_media_id)
        .bind(&post.permalink)
        .bind(&post.error_message)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Persist the mutable lifecycle fields of a post row. The media inputs
    /// and creation time never change.
    pub async fn update_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET status = ?, container_id = ?, instagram_media_id = ?,
                permalink = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(post.status.as_str())
        .bind(&post.container_id)
        .bind(&post.instagram_media_id)
        .bind(&post.permalink)
        .bind(&post.error_message)
        .bind(post.updated_at)
        .bind(&post.id)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, media_kind, media_url, caption, status, container_id,
                   instagram_media_id, permalink, error_message, created_at, updated_at
            FROM posts WHERE id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(row.map(|r| row_to_post(&r)))
    }

    /// List all posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, media_kind, media_url, caption, status, container_id,
                   instagram_media_id, permalink, error_message, created_at, updated_at
            FROM posts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::DbError::SqlxError)?;

        Ok(rows.iter().map(row_to_post).collect())
    }
}

fn row_to_account(r: &sqlx::sqlite::SqliteRow) -> Account {
    use sqlx::Row;

    Account {
        id: r.get("id"),
        instagram_user_id: r.get("instagram_user_id"),
        username: r.get("username"),
        display_name: r.get("display_name"),
        profile_picture_url: r.get("profile_picture_url"),
        access_token: r.get("access_token"),
        token_expires_at: r.get("token_expires_at"),
        is_active: r.get::<i32, _>("is_active") != 0,
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn row_to_post(r: &sqlx::sqlite::SqliteRow) -> Post {
    use sqlx::Row;

    Post {
        id: r.get("id"),
        account_id: r.get("account_id"),
        media_kind: MediaKind::parse(&r.get::<String, _>("media_kind"))
            .unwrap_or(MediaKind::Image),
        media_url: r.get("media_url"),
        caption: r.get("caption"),
        status: PostStatus::parse(&r.get::<String, _>("status")).unwrap_or(PostStatus::Pending),
        container_id: r.get("container_id"),
        instagram_media_id: r.get("instagram_media_id"),
        permalink: r.get("permalink"),
        error_message: r.get("error_message"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}
