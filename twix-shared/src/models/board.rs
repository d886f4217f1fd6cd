/// Boards
///
/// A board belongs to exactly one user and holds tasks. All reads and writes
/// here are scoped: a principal only ever touches boards they own, and a
/// board outside that scope behaves as if it did not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     is_personal BOOLEAN NOT NULL DEFAULT FALSE,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::scope::Resource;

const BOARD_COLUMNS: &str = "b.id, b.name, b.is_personal, b.owner_id, b.created_at, b.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub is_personal: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBoard {
    pub name: String,
    pub is_personal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub is_personal: Option<bool>,
}

impl Board {
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: CreateBoard) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (name, is_personal, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, is_personal, owner_id, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.is_personal)
        .bind(owner_id)
        .fetch_one(pool)
        .await
    }

    /// Boards owned by the principal, oldest first
    pub async fn list_scoped(pool: &PgPool, principal: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards b WHERE {} ORDER BY b.created_at, b.id",
            Resource::Board.predicate()
        ))
        .bind(principal)
        .fetch_all(pool)
        .await
    }

    pub async fn find_scoped<'e, E>(
        executor: E,
        principal: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards b WHERE {} AND b.id = $2",
            Resource::Board.predicate()
        ))
        .bind(principal)
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Partial update; `None` when the board is out of scope
    pub async fn update_scoped(
        pool: &PgPool,
        principal: Uuid,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards b
            SET name = COALESCE($3, b.name),
                is_personal = COALESCE($4, b.is_personal),
                updated_at = NOW()
            WHERE {} AND b.id = $2
            RETURNING {BOARD_COLUMNS}
            "#,
            Resource::Board.predicate()
        ))
        .bind(principal)
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.is_personal)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the board and, through the cascade, its tasks
    pub async fn delete_scoped(pool: &PgPool, principal: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM boards b WHERE {} AND b.id = $2",
            Resource::Board.predicate()
        ))
        .bind(principal)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
