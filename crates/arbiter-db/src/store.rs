//! The narrow persistence interface the engine mirrors through.
//!
//! Four operation shapes only: upsert an actor, adjust inventory
//! (single and bulk), adjust health, and set a skill mastery. The core
//! never issues ad-hoc queries beyond these.

use arbiter_types::{ActorId, DeltaMap};
use sqlx::{PgPool, Row};

use crate::error::DbError;

/// Operations on the `actors`, `inventories`, and `actor_skills` tables.
pub struct ActorStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ActorStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create or update an actor row with its kind and position.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_actor(
        &self,
        id: &ActorId,
        kind: &str,
        x: f64,
        y: f64,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO actors (id, kind, x, y)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE
              SET kind = EXCLUDED.kind, x = EXCLUDED.x, y = EXCLUDED.y,
                  updated_at = now()",
        )
        .bind(id.as_str())
        .bind(kind)
        .bind(x)
        .bind(y)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Apply a signed quantity delta to one item, clamping at zero.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn adjust_inventory(
        &self,
        id: &ActorId,
        item: &str,
        delta: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO inventories (actor_id, item, quantity)
              VALUES ($1, $2, GREATEST($3, 0))
              ON CONFLICT (actor_id, item) DO UPDATE
              SET quantity = GREATEST(inventories.quantity + $3, 0)",
        )
        .bind(id.as_str())
        .bind(item)
        .bind(delta)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Apply a set of signed deltas in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any update fails; no delta of
    /// the set is applied in that case.
    pub async fn adjust_inventory_bulk(
        &self,
        id: &ActorId,
        deltas: &DeltaMap,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for (item, delta) in deltas {
            sqlx::query(
                r"INSERT INTO inventories (actor_id, item, quantity)
                  VALUES ($1, $2, GREATEST($3, 0))
                  ON CONFLICT (actor_id, item) DO UPDATE
                  SET quantity = GREATEST(inventories.quantity + $3, 0)",
            )
            .bind(id.as_str())
            .bind(item)
            .bind(delta)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Apply a signed health delta, clamped to `[0.0, 1.0]`, returning
    /// the new health value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn adjust_health(&self, id: &ActorId, delta: f64) -> Result<f64, DbError> {
        let row = sqlx::query(
            r"INSERT INTO actors (id, health)
              VALUES ($1, LEAST(GREATEST(1.0 + $2, 0.0), 1.0))
              ON CONFLICT (id) DO UPDATE
              SET health = LEAST(GREATEST(actors.health + $2, 0.0), 1.0),
                  updated_at = now()
              RETURNING health",
        )
        .bind(id.as_str())
        .bind(delta)
        .fetch_one(self.pool)
        .await?;
        Ok(row.try_get("health")?)
    }

    /// Record a skill mastery level for an actor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn set_skill_mastery(
        &self,
        id: &ActorId,
        skill: &str,
        mastery: u32,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO actor_skills (actor_id, skill, mastery)
              VALUES ($1, $2, $3)
              ON CONFLICT (actor_id, skill) DO UPDATE
              SET mastery = EXCLUDED.mastery",
        )
        .bind(id.as_str())
        .bind(skill)
        .bind(i32::try_from(mastery).unwrap_or(i32::MAX))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
