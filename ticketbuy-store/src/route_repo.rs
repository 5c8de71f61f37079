use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ticketbuy_catalog::Route;
use ticketbuy_core::repository::RouteRepository;
use ticketbuy_core::StoreResult;

use crate::store_error;

pub struct StoreRouteRepository {
    pool: PgPool,
}

impl StoreRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    name: String,
    details: Option<String>,
    price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            name: row.name,
            details: row.details,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl RouteRepository for StoreRouteRepository {
    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(
            "SELECT id, name, details, price, created_at, updated_at FROM routes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(Route::from))
    }

    async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(
            "SELECT id, name, details, price, created_at, updated_at FROM routes ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn create_route(&self, route: &Route) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, name, details, price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(route.id)
        .bind(&route.name)
        .bind(&route.details)
        .bind(route.price)
        .bind(route.created_at)
        .bind(route.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
