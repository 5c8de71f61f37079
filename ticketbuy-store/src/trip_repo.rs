use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ticketbuy_catalog::{Trip, TripListing, TripStatus};
use ticketbuy_core::repository::TripRepository;
use ticketbuy_core::{StoreError, StoreResult};

use crate::{corrupt_row, store_error};

pub(crate) const TRIP_COLUMNS: &str =
    "id, route_id, departure_date, departure_time, total_seats, available_seats, status, created_at, updated_at";

pub struct StoreTripRepository {
    pool: PgPool,
}

impl StoreTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TripRow {
    id: Uuid,
    route_id: Uuid,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    total_seats: i32,
    available_seats: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = StoreError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let status = TripStatus::parse(&row.status).ok_or_else(|| corrupt_row("trips", "status", &row.status))?;
        Ok(Trip {
            id: row.id,
            route_id: row.route_id,
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TripListingRow {
    #[sqlx(flatten)]
    trip: TripRow,
    route_name: String,
    price: Decimal,
}

#[async_trait]
impl TripRepository for StoreTripRepository {
    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(&format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(Trip::try_from).transpose()
    }

    async fn list_trips_on(&self, date: NaiveDate) -> StoreResult<Vec<TripListing>> {
        let rows = sqlx::query_as::<_, TripListingRow>(
            r#"
            SELECT t.id, t.route_id, t.departure_date, t.departure_time, t.total_seats,
                   t.available_seats, t.status, t.created_at, t.updated_at,
                   r.name AS route_name, r.price
            FROM trips t
            JOIN routes r ON r.id = t.route_id
            WHERE t.departure_date = $1 AND t.status = 'active'
            ORDER BY t.departure_time, r.name
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(TripListing {
                    trip: Trip::try_from(row.trip)?,
                    route_name: row.route_name,
                    price: row.price,
                })
            })
            .collect()
    }

    async fn find_trips_for_route(&self, route_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips WHERE route_id = $1 AND departure_date = $2 AND status = 'active' ORDER BY departure_time",
            TRIP_COLUMNS
        ))
        .bind(route_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn create_trip(&self, trip: &Trip) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, route_id, departure_date, departure_time, total_seats,
                               available_seats, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.departure_date)
        .bind(trip.departure_time)
        .bind(trip.total_seats)
        .bind(trip.available_seats)
        .bind(trip.status.as_str())
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
