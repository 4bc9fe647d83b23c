//! PostgreSQL implementation of the itinerary mutations.
//!
//! Every mutation runs in its own transaction; positions are renumbered
//! densely from 0 after each change.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dispatch::{ItineraryMutations, PlannerError};

#[derive(Clone)]
pub struct PgItineraryStore {
    pool: PgPool,
}

impl PgItineraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Renumber the blocks of a day 0..n following their current order
async fn renumber_blocks(
    tx: &mut Transaction<'_, Postgres>,
    day_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE circuit_formulas f
        SET position = r.rn - 1
        FROM (
            SELECT id, ROW_NUMBER() OVER (ORDER BY position, id) AS rn
            FROM circuit_formulas
            WHERE day_id = $1
        ) r
        WHERE f.id = r.id
        "#,
    )
    .bind(day_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Open a gap at list index `position` in a day, or return the end position.
///
/// Stored positions may be sparse or repeated, so the day is renumbered first
/// and the index then matches the order the itinerary is read in.
async fn make_room(
    tx: &mut Transaction<'_, Postgres>,
    day_id: Uuid,
    position: Option<usize>,
) -> Result<i32, PlannerError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM circuit_days WHERE id = $1)")
        .bind(day_id)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(PlannerError::DayNotFound(day_id));
    }

    renumber_blocks(tx, day_id).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM circuit_formulas WHERE day_id = $1")
        .bind(day_id)
        .fetch_one(&mut **tx)
        .await?;

    let at = position.map(|p| (p as i64).min(count)).unwrap_or(count) as i32;

    sqlx::query(
        r#"
        UPDATE circuit_formulas
        SET position = position + 1
        WHERE day_id = $1 AND position >= $2
        "#,
    )
    .bind(day_id)
    .bind(at)
    .execute(&mut **tx)
    .await?;

    Ok(at)
}

/// Copy a formula and its items into a day at a position
async fn copy_formula(
    tx: &mut Transaction<'_, Postgres>,
    source_block_id: Uuid,
    target_day_id: Uuid,
    position: i32,
) -> Result<Uuid, PlannerError> {
    let new_id = Uuid::new_v4();

    let inserted = sqlx::query(
        r#"
        INSERT INTO circuit_formulas
            (id, day_id, kind, name, description, condition_id, condition_option_id, position)
        SELECT $1, $2, kind, name, description, condition_id, condition_option_id, $3
        FROM circuit_formulas
        WHERE id = $4
        "#,
    )
    .bind(new_id)
    .bind(target_day_id)
    .bind(position)
    .bind(source_block_id)
    .execute(&mut **tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(PlannerError::BlockNotFound(source_block_id));
    }

    sqlx::query(
        r#"
        INSERT INTO circuit_items
            (id, formula_id, name, unit_cost, currency, quantity,
             ratio_type, ratio_per, ratio_category, payment_flow, vat_included, position)
        SELECT gen_random_uuid(), $1, name, unit_cost, currency, quantity,
               ratio_type, ratio_per, ratio_category, payment_flow, vat_included, position
        FROM circuit_items
        WHERE formula_id = $2
        "#,
    )
    .bind(new_id)
    .bind(source_block_id)
    .execute(&mut **tx)
    .await?;

    Ok(new_id)
}

#[async_trait]
impl ItineraryMutations for PgItineraryStore {
    async fn reorder_blocks(&self, day_id: Uuid, ordered_ids: &[Uuid]) -> Result<(), PlannerError> {
        let mut tx = self.pool.begin().await?;

        for (position, block_id) in ordered_ids.iter().enumerate() {
            let updated = sqlx::query(
                "UPDATE circuit_formulas SET position = $1 WHERE id = $2 AND day_id = $3",
            )
            .bind(position as i32)
            .bind(block_id)
            .bind(day_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(PlannerError::BlockNotFound(*block_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn move_block(
        &self,
        block_id: Uuid,
        target_day_id: Uuid,
        position: usize,
    ) -> Result<(), PlannerError> {
        let mut tx = self.pool.begin().await?;

        let source_day_id: Option<Uuid> =
            sqlx::query_scalar("SELECT day_id FROM circuit_formulas WHERE id = $1")
                .bind(block_id)
                .fetch_optional(&mut *tx)
                .await?;
        let source_day_id = source_day_id.ok_or(PlannerError::BlockNotFound(block_id))?;

        let at = make_room(&mut tx, target_day_id, Some(position)).await?;

        sqlx::query("UPDATE circuit_formulas SET day_id = $1, position = $2 WHERE id = $3")
            .bind(target_day_id)
            .bind(at)
            .bind(block_id)
            .execute(&mut *tx)
            .await?;

        renumber_blocks(&mut tx, source_day_id).await?;
        renumber_blocks(&mut tx, target_day_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reorder_days(&self, trip_id: Uuid, ordered_ids: &[Uuid]) -> Result<(), PlannerError> {
        let mut tx = self.pool.begin().await?;

        for (position, day_id) in ordered_ids.iter().enumerate() {
            let updated =
                sqlx::query("UPDATE circuit_days SET position = $1 WHERE id = $2 AND trip_id = $3")
                    .bind(position as i32)
                    .bind(day_id)
                    .bind(trip_id)
                    .execute(&mut *tx)
                    .await?;

            if updated.rows_affected() == 0 {
                return Err(PlannerError::DayNotFound(*day_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn duplicate_block(
        &self,
        source_block_id: Uuid,
        target_day_id: Uuid,
        position: Option<usize>,
    ) -> Result<Uuid, PlannerError> {
        let mut tx = self.pool.begin().await?;

        let at = make_room(&mut tx, target_day_id, position).await?;
        let new_id = copy_formula(&mut tx, source_block_id, target_day_id, at).await?;

        tx.commit().await?;
        Ok(new_id)
    }

    async fn copy_day_blocks(
        &self,
        source_day_id: Uuid,
        target_day_id: Uuid,
    ) -> Result<Vec<Uuid>, PlannerError> {
        let mut tx = self.pool.begin().await?;

        let source_blocks: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM circuit_formulas WHERE day_id = $1 ORDER BY position, id",
        )
        .bind(source_day_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(source_blocks.len());
        for source_block_id in source_blocks {
            let at = make_room(&mut tx, target_day_id, None).await?;
            created.push(copy_formula(&mut tx, source_block_id, target_day_id, at).await?);
        }

        tx.commit().await?;
        Ok(created)
    }
}
