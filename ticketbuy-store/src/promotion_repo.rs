use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ticketbuy_catalog::{Promotion, PromotionStatus};
use ticketbuy_core::repository::PromotionRepository;
use ticketbuy_core::{StoreError, StoreResult};

use crate::{corrupt_row, store_error};

pub struct StorePromotionRepository {
    pool: PgPool,
}

impl StorePromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PromotionRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    discount_percent: Decimal,
    status: String,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = StoreError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let status = PromotionStatus::parse(&row.status)
            .ok_or_else(|| corrupt_row("promotions", "status", &row.status))?;
        Ok(Promotion {
            id: row.id,
            code: row.code,
            description: row.description,
            discount_percent: row.discount_percent,
            status,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PromotionRepository for StorePromotionRepository {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Promotion>> {
        let row = sqlx::query_as::<_, PromotionRow>(
            r#"
            SELECT id, code, description, discount_percent, status, valid_from, valid_until,
                   created_at, updated_at
            FROM promotions
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(Promotion::try_from).transpose()
    }

    async fn create_promotion(&self, promotion: &Promotion) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO promotions (id, code, description, discount_percent, status,
                                    valid_from, valid_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(promotion.id)
        .bind(&promotion.code)
        .bind(&promotion.description)
        .bind(promotion.discount_percent)
        .bind(promotion.status.as_str())
        .bind(promotion.valid_from)
        .bind(promotion.valid_until)
        .bind(promotion.created_at)
        .bind(promotion.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
