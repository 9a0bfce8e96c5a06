//! `PostgreSQL` user store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;
use tracing::Instrument;
use uuid::Uuid;

use super::{User, UserStore};
use crate::auth::catalog::Role;

const USER_COLUMNS: &str = r"
    id, username, password_hash, full_name, email,
    role::text AS role, is_active, created_at, last_login_at
";

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = Role::from_str(&role)
        .map_err(|err| anyhow::anyhow!(err))
        .context("unknown role stored for user")?;
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_active_by_username(
        &self,
        username: &str,
        role: Option<Role>,
    ) -> Result<Option<User>> {
        // Inactive accounts are invisible here so that soft-deleted users
        // cannot authenticate.
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username = $1 AND is_active \
             {} LIMIT 1",
            if role.is_some() { "AND role::text = $2" } else { "" }
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let mut select = sqlx::query(&query).bind(username);
        if let Some(role) = role {
            select = select.bind(role.as_str());
        }
        let row = select
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by username")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        let query = "UPDATE users SET last_login_at = NOW() WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record login timestamp")?;
        Ok(())
    }
}
