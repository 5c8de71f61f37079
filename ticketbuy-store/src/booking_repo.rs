use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use ticketbuy_booking::{Booking, BookingStatus, BookingStore, BookingTx, SeatScope};
use ticketbuy_catalog::Trip;
use ticketbuy_core::{StoreError, StoreResult};
use ticketbuy_shared::Masked;

use crate::trip_repo::{TripRow, TRIP_COLUMNS};
use crate::{corrupt_row, store_error};

const BOOKING_COLUMNS: &str = "id, user_id, route_id, trip_id, seat_quantity, seat_numbers, status, \
     departure_date, promotion_code, total_price, discount_amount, contact_name, contact_phone, \
     created_at, updated_at";

/// Booking ledger on PostgreSQL. Seat occupancy lives in `booking_seats`,
/// whose primary key `(trip_id, seat_code)` rejects double booking.
pub struct StoreBookingStore {
    pool: PgPool,
}

impl StoreBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: String,
    route_id: Uuid,
    trip_id: Option<Uuid>,
    seat_quantity: i32,
    seat_numbers: Vec<String>,
    status: String,
    departure_date: NaiveDate,
    promotion_code: Option<String>,
    total_price: Decimal,
    discount_amount: Decimal,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status).ok_or_else(|| corrupt_row("bookings", "status", &row.status))?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            route_id: row.route_id,
            trip_id: row.trip_id,
            seat_quantity: row.seat_quantity,
            seat_numbers: row.seat_numbers,
            status,
            departure_date: row.departure_date,
            promotion_code: row.promotion_code,
            total_price: row.total_price,
            discount_amount: row.discount_amount,
            contact_name: row.contact_name.map(Masked),
            contact_phone: row.contact_phone.map(Masked),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn fetch_booking<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, for_update: bool) -> StoreResult<Option<Booking>> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE id = $1{}",
        BOOKING_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(store_error)?;

    row.map(Booking::try_from).transpose()
}

async fn fetch_occupied<'e, E: PgExecutor<'e>>(
    executor: E,
    scope: SeatScope,
    excluding: Option<Uuid>,
) -> StoreResult<Vec<String>> {
    let query = match scope {
        SeatScope::Trip(trip_id) => sqlx::query_scalar::<_, String>(
            r#"
            SELECT seat_code FROM booking_seats
            WHERE trip_id = $1 AND ($2::uuid IS NULL OR booking_id <> $2)
            "#,
        )
        .bind(trip_id)
        .bind(excluding),
        SeatScope::RouteDate {
            route_id,
            departure_date,
        } => sqlx::query_scalar::<_, String>(
            r#"
            SELECT seat.code
            FROM bookings b
            CROSS JOIN LATERAL unnest(b.seat_numbers) AS seat(code)
            WHERE b.route_id = $1 AND b.departure_date = $2 AND b.status <> 'cancelled'
              AND ($3::uuid IS NULL OR b.id <> $3)
            "#,
        )
        .bind(route_id)
        .bind(departure_date)
        .bind(excluding),
    };

    query.fetch_all(executor).await.map_err(store_error)
}

async fn fetch_promotion_uses<'e, E: PgExecutor<'e>>(executor: E, user_id: &str, code: &str) -> StoreResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND promotion_code = $2 AND status <> 'cancelled'",
    )
    .bind(user_id)
    .bind(code)
    .fetch_one(executor)
    .await
    .map_err(store_error)
}

#[async_trait]
impl BookingStore for StoreBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTx>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgBookingTx { tx }))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        fetch_booking(&self.pool, id, false).await
    }

    async fn list_bookings(&self, user_id: Option<&str>) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE ($1::text IS NULL OR user_id = $1) ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn occupied_seats(&self, scope: SeatScope) -> StoreResult<Vec<String>> {
        fetch_occupied(&self.pool, scope, None).await
    }

    async fn count_promotion_uses(&self, user_id: &str, code: &str) -> StoreResult<i64> {
        fetch_promotion_uses(&self.pool, user_id, code).await
    }
}

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

impl PgBookingTx {
    /// Replaces the booking's seat rows. Cancelled and trip-less bookings hold none.
    async fn sync_seats(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query("DELETE FROM booking_seats WHERE booking_id = $1")
            .bind(booking.id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;

        if let (Some(trip_id), true) = (booking.trip_id, booking.status.holds_seats()) {
            sqlx::query(
                r#"
                INSERT INTO booking_seats (trip_id, seat_code, booking_id)
                SELECT $1, seat_code, $3 FROM unnest($2::text[]) AS seat_code
                "#,
            )
            .bind(trip_id)
            .bind(&booking.seat_numbers)
            .bind(booking.id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_trip(&mut self, trip_id: Uuid) -> StoreResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips WHERE id = $1 FOR UPDATE",
            TRIP_COLUMNS
        ))
        .bind(trip_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;

        row.map(Trip::try_from).transpose()
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        fetch_booking(&mut *self.tx, id, true).await
    }

    async fn occupied_seats(&mut self, scope: SeatScope, excluding: Option<Uuid>) -> StoreResult<Vec<String>> {
        fetch_occupied(&mut *self.tx, scope, excluding).await
    }

    async fn count_promotion_uses(&mut self, user_id: &str, code: &str) -> StoreResult<i64> {
        fetch_promotion_uses(&mut *self.tx, user_id, code).await
    }

    async fn reserve_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE trips
            SET available_seats = available_seats - $2, updated_at = NOW()
            WHERE id = $1 AND available_seats >= $2
            RETURNING available_seats
            "#,
        )
        .bind(trip_id)
        .bind(count)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn release_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE trips
            SET available_seats = LEAST(total_seats, available_seats + $2), updated_at = NOW()
            WHERE id = $1
            RETURNING available_seats
            "#,
        )
        .bind(trip_id)
        .bind(count)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, route_id, trip_id, seat_quantity, seat_numbers, status,
                                  departure_date, promotion_code, total_price, discount_amount,
                                  contact_name, contact_phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.route_id)
        .bind(booking.trip_id)
        .bind(booking.seat_quantity)
        .bind(&booking.seat_numbers)
        .bind(booking.status.as_str())
        .bind(booking.departure_date)
        .bind(&booking.promotion_code)
        .bind(booking.total_price)
        .bind(booking.discount_amount)
        .bind(booking.contact_name.as_ref().map(|n| n.expose().clone()))
        .bind(booking.contact_phone.as_ref().map(|p| p.expose().clone()))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        self.sync_seats(booking).await
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET seat_quantity = $2, seat_numbers = $3, status = $4, departure_date = $5,
                total_price = $6, discount_amount = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.seat_quantity)
        .bind(&booking.seat_numbers)
        .bind(booking.status.as_str())
        .bind(booking.departure_date)
        .bind(booking.total_price)
        .bind(booking.discount_amount)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!("booking {} not found", booking.id)));
        }
        self.sync_seats(booking).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }
}
