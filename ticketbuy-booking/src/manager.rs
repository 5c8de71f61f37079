use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use ticketbuy_catalog::{InventoryError, PriceQuote, Promotion, PromotionRejection, Trip};
use ticketbuy_core::repository::{PromotionRepository, RouteRepository, TripRepository};
use ticketbuy_core::{Actor, StoreError};
use ticketbuy_shared::{Masked, SeatEvent};

use crate::changes::ChangeHandler;
use crate::error::{BookingError, BookingResult};
use crate::ledger::{BookingStore, BookingTx, SeatScope};
use crate::models::{Booking, BookingStatus, BookingUpdate, CreateBooking, SeatQuery};
use crate::seats::{ensure_quantity, find_conflicts, normalize_seat_list};

/// A committed booking change plus the seat events it produced.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub events: Vec<SeatEvent>,
    /// This call moved the booking into `cancelled`.
    pub cancelled: bool,
}

impl BookingOutcome {
    fn unchanged(booking: Booking) -> Self {
        Self {
            booking,
            events: Vec::new(),
            cancelled: false,
        }
    }
}

/// Orchestrates booking creation, edits and cancellation so that trip
/// inventory, seat occupancy and the booking ledger move together.
///
/// Every write runs in one [`BookingTx`]; repository reads happen before the
/// transaction is opened.
pub struct BookingManager {
    routes: Arc<dyn RouteRepository>,
    trips: Arc<dyn TripRepository>,
    promotions: Arc<dyn PromotionRepository>,
    store: Arc<dyn BookingStore>,
    max_seats_per_booking: i32,
}

impl BookingManager {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        trips: Arc<dyn TripRepository>,
        promotions: Arc<dyn PromotionRepository>,
        store: Arc<dyn BookingStore>,
        max_seats_per_booking: i32,
    ) -> Self {
        Self {
            routes,
            trips,
            promotions,
            store,
            max_seats_per_booking,
        }
    }

    /// Seat codes already held for a trip, or for a route and date when no
    /// trip is given. Sorted and deduplicated.
    pub async fn booked_seats(&self, query: &SeatQuery) -> BookingResult<Vec<String>> {
        let scope = match (query.trip_id, query.route_id, query.departure_date) {
            (Some(trip_id), _, _) => {
                self.trips
                    .get_trip(trip_id)
                    .await?
                    .ok_or_else(|| trip_not_found(trip_id))?;
                SeatScope::Trip(trip_id)
            }
            (None, Some(route_id), Some(departure_date)) => SeatScope::RouteDate {
                route_id,
                departure_date,
            },
            _ => {
                return Err(BookingError::Validation(
                    "trip_id, or route_id and departure_date, are required".to_string(),
                ))
            }
        };

        let mut seats = self.store.occupied_seats(scope).await?;
        seats.sort();
        seats.dedup();
        Ok(seats)
    }

    /// Checks a promotion code: existence, status, validity window and, when
    /// `check_usage` is set and a user is known, prior use by that user.
    pub async fn validate_promotion(
        &self,
        code: &str,
        user_id: Option<&str>,
        check_usage: bool,
    ) -> BookingResult<Promotion> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(BookingError::Validation("Promotion code is required".to_string()));
        }

        let promotion = self
            .promotions
            .find_by_code(&code)
            .await?
            .ok_or_else(|| PromotionRejection::Unknown(code.clone()))?;
        promotion.check_at(Utc::now())?;

        if check_usage {
            if let Some(user_id) = user_id {
                if self.store.count_promotion_uses(user_id, &promotion.code).await? > 0 {
                    return Err(PromotionRejection::AlreadyUsed(promotion.code).into());
                }
            }
        }
        Ok(promotion)
    }

    pub async fn create(&self, actor: &Actor, req: CreateBooking) -> BookingResult<BookingOutcome> {
        self.check_quantity(req.seat_quantity)?;
        let seats = normalize_seat_list(&req.seat_numbers)?;
        ensure_quantity(&seats, req.seat_quantity)?;

        let user_id = match req.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(other) if !actor.owns(other) => {
                if !actor.is_admin() {
                    return Err(BookingError::Forbidden(
                        "Only administrators can book on behalf of another user".to_string(),
                    ));
                }
                other.to_string()
            }
            _ => actor.id.clone(),
        };

        let status = req.status.unwrap_or(BookingStatus::Pending);
        ChangeHandler::check_initial(status)?;
        if status == BookingStatus::Confirmed && !actor.is_admin() {
            return Err(BookingError::Forbidden(
                "Only administrators can create confirmed bookings".to_string(),
            ));
        }

        let route = self
            .routes
            .get_route(req.route_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Route {} not found", req.route_id)))?;
        let trip = self
            .resolve_trip(req.route_id, req.trip_id, req.departure_date)
            .await?;
        if !trip.is_bookable() {
            return Err(BookingError::Validation(format!("Trip {} is not open for booking", trip.id)));
        }

        let promotion = match req.promotion_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(self.validate_promotion(code, None, false).await?),
            None => None,
        };
        let quote = PriceQuote::compute(
            route.price,
            req.seat_quantity,
            promotion.as_ref().map(|p| p.discount_percent),
        );

        let mut tx = self.store.begin().await?;
        let mut locked = tx
            .lock_trip(trip.id)
            .await?
            .ok_or_else(|| trip_not_found(trip.id))?;
        if !locked.is_bookable() {
            return Err(BookingError::Validation(format!("Trip {} is not open for booking", trip.id)));
        }

        let mut occupied = tx.occupied_seats(SeatScope::Trip(trip.id), None).await?;
        if req.trip_id.is_none() {
            // Legacy bookings without a trip are only visible by route and date.
            let legacy = tx
                .occupied_seats(
                    SeatScope::RouteDate {
                        route_id: route.id,
                        departure_date: trip.departure_date,
                    },
                    None,
                )
                .await?;
            occupied.extend(legacy);
        }
        let conflicts = find_conflicts(occupied, &seats);
        if !conflicts.is_empty() {
            warn!(trip_id = %trip.id, seats = ?conflicts, "Seat conflict on booking request");
            return Err(BookingError::SeatConflict(conflicts));
        }

        if let Some(promotion) = &promotion {
            if tx.count_promotion_uses(&user_id, &promotion.code).await? > 0 {
                return Err(PromotionRejection::AlreadyUsed(promotion.code.clone()).into());
            }
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id,
            route_id: route.id,
            trip_id: Some(trip.id),
            seat_quantity: req.seat_quantity,
            seat_numbers: seats,
            status,
            departure_date: trip.departure_date,
            promotion_code: promotion.map(|p| p.code),
            total_price: quote.total_price,
            discount_amount: quote.discount_amount,
            contact_name: non_blank(req.contact_name).map(Masked::from),
            contact_phone: non_blank(req.contact_phone).map(Masked::from),
            created_at: now,
            updated_at: now,
        };

        let available = reserve(tx.as_mut(), &mut locked, booking.seat_quantity)
            .await
            .map_err(|e| write_failed(e, "reserve inventory", Some(trip.id), &booking))?;
        tx.insert_booking(&booking)
            .await
            .map_err(|e| write_failed(seat_write_error(e, &booking.seat_numbers), "insert booking", Some(trip.id), &booking))?;
        tx.commit()
            .await
            .map_err(|e| write_failed(e, "commit booking", Some(trip.id), &booking))?;

        info!(
            booking_id = %booking.id,
            trip_id = %trip.id,
            user_id = %booking.user_id,
            seats = ?booking.seat_numbers,
            total_price = %booking.total_price,
            contact_phone = ?booking.contact_phone.as_ref().map(|p| p.hint(3)),
            available_seats = available,
            "Booking created"
        );

        let event = SeatEvent::reserved(trip.id, booking.id, booking.seat_numbers.clone(), available);
        Ok(BookingOutcome {
            booking,
            events: vec![event],
            cancelled: false,
        })
    }

    /// Administrative edit: status, seats and (for legacy bookings) date.
    pub async fn update(&self, actor: &Actor, id: Uuid, update: BookingUpdate) -> BookingResult<BookingOutcome> {
        if !actor.is_admin() {
            return Err(BookingError::Forbidden("Only administrators can edit bookings".to_string()));
        }
        if update.is_empty() {
            return Err(BookingError::Validation("Nothing to update".to_string()));
        }

        let new_seats = match &update.seat_numbers {
            Some(raw) => {
                let seats = normalize_seat_list(raw)?;
                if let Some(quantity) = update.seat_quantity {
                    ensure_quantity(&seats, quantity)?;
                }
                self.check_quantity(seats.len() as i32)?;
                Some(seats)
            }
            None => None,
        };

        let current = self.store.get_booking(id).await?.ok_or_else(|| booking_not_found(id))?;
        let source_trip = self.inventory_trip(&current).await?;
        // A legacy booking moved to another date draws on that date's trip.
        let target_trip = match update.departure_date {
            Some(date) if current.trip_id.is_none() && date != current.departure_date => {
                self.legacy_trip(&current, date).await?
            }
            _ => source_trip,
        };
        let repricing = match &new_seats {
            Some(seats) if seats.len() as i32 != current.seat_quantity => Some(self.pricing_for(&current).await?),
            _ => None,
        };

        let mut tx = self.store.begin().await?;
        let booking = tx.lock_booking(id).await?.ok_or_else(|| booking_not_found(id))?;
        if booking.departure_date != current.departure_date {
            return Err(BookingError::Validation(format!(
                "Booking {} changed while being edited, retry",
                id
            )));
        }
        let mut next = booking.clone();
        let mut events = Vec::new();

        if let Some(date) = update.departure_date {
            if date != booking.departure_date {
                if booking.trip_id.is_some() {
                    return Err(BookingError::Validation(
                        "departure_date follows the trip and cannot be changed".to_string(),
                    ));
                }
                next.departure_date = date;
                next.updated_at = Utc::now();
            }
        }
        let date_moved = next.departure_date != booking.departure_date;

        if new_seats.is_none() {
            if let Some(quantity) = update.seat_quantity {
                if quantity != booking.seat_quantity {
                    return Err(BookingError::Validation(
                        "seat_numbers are required to change seat_quantity".to_string(),
                    ));
                }
            }
        }

        let target = update.status.unwrap_or(booking.status);
        ChangeHandler::check_transition(booking.status, target)?;

        let new_seats = new_seats.filter(|seats| *seats != booking.seat_numbers);
        if new_seats.is_some() && !target.holds_seats() {
            return Err(BookingError::Validation(
                "Seats of a cancelled booking cannot be changed".to_string(),
            ));
        }

        let cancelling = booking.status.holds_seats() && !target.holds_seats();
        if cancelling {
            let released = release_booking(tx.as_mut(), source_trip, &booking)
                .await
                .map_err(|e| write_failed(e, "release inventory", source_trip, &booking))?;
            events.extend(released);
        } else if target.holds_seats() && (new_seats.is_some() || date_moved) {
            let seats = new_seats.unwrap_or_else(|| booking.seat_numbers.clone());
            let scope = match booking.trip_id {
                Some(trip_id) => SeatScope::Trip(trip_id),
                None => SeatScope::RouteDate {
                    route_id: booking.route_id,
                    departure_date: next.departure_date,
                },
            };

            let mut locked = match target_trip {
                Some(trip_id) => Some(
                    tx.lock_trip(trip_id)
                        .await?
                        .ok_or_else(|| trip_not_found(trip_id))?,
                ),
                None => None,
            };

            let occupied = tx.occupied_seats(scope, Some(booking.id)).await?;
            let conflicts = find_conflicts(occupied, &seats);
            if !conflicts.is_empty() {
                warn!(booking_id = %booking.id, seats = ?conflicts, "Seat conflict on booking edit");
                return Err(BookingError::SeatConflict(conflicts));
            }

            if source_trip == target_trip {
                if let Some(trip) = locked.as_mut() {
                    let trip_id = trip.id;
                    let delta = seats.len() as i32 - booking.seat_quantity;
                    let available = if delta > 0 {
                        reserve(tx.as_mut(), trip, delta)
                            .await
                            .map_err(|e| write_failed(e, "reserve inventory", Some(trip_id), &booking))?
                    } else if delta < 0 {
                        tx.release_seats(trip_id, -delta)
                            .await
                            .map_err(|e| write_failed(e, "release inventory", Some(trip_id), &booking))?
                    } else {
                        trip.available_seats
                    };

                    let removed: Vec<String> = booking
                        .seat_numbers
                        .iter()
                        .filter(|s| !seats.contains(s))
                        .cloned()
                        .collect();
                    let added: Vec<String> = seats
                        .iter()
                        .filter(|s| !booking.seat_numbers.contains(s))
                        .cloned()
                        .collect();
                    if !removed.is_empty() {
                        events.push(SeatEvent::released(trip_id, booking.id, removed, available));
                    }
                    if !added.is_empty() {
                        events.push(SeatEvent::reserved(trip_id, booking.id, added, available));
                    }
                }
            } else {
                if let Some(trip_id) = source_trip {
                    let available = tx
                        .release_seats(trip_id, booking.seat_quantity)
                        .await
                        .map_err(|e| write_failed(e, "release inventory", Some(trip_id), &booking))?;
                    events.push(SeatEvent::released(trip_id, booking.id, booking.seat_numbers.clone(), available));
                }
                if let Some(trip) = locked.as_mut() {
                    let trip_id = trip.id;
                    let available = reserve(tx.as_mut(), trip, seats.len() as i32)
                        .await
                        .map_err(|e| write_failed(e, "reserve inventory", Some(trip_id), &booking))?;
                    events.push(SeatEvent::reserved(trip_id, booking.id, seats.clone(), available));
                }
                info!(
                    booking_id = %booking.id,
                    from = %booking.departure_date,
                    to = %next.departure_date,
                    from_trip = ?source_trip,
                    to_trip = ?target_trip,
                    "Legacy booking moved to another date"
                );
            }

            if let Some((unit_price, discount_percent)) = repricing {
                let quote = PriceQuote::compute(unit_price, seats.len() as i32, discount_percent);
                next.total_price = quote.total_price;
                next.discount_amount = quote.discount_amount;
            }
            if seats != booking.seat_numbers {
                next.replace_seats(seats);
            }
        }

        if target != booking.status {
            next.update_status(target);
        }

        if next == booking {
            return Ok(BookingOutcome::unchanged(booking));
        }

        tx.update_booking(&next)
            .await
            .map_err(|e| write_failed(seat_write_error(e, &next.seat_numbers), "update booking", target_trip, &next))?;
        tx.commit()
            .await
            .map_err(|e| write_failed(e, "commit booking update", target_trip, &next))?;

        info!(
            booking_id = %next.id,
            from = %booking.status,
            to = %next.status,
            seats = ?next.seat_numbers,
            "Booking updated"
        );
        Ok(BookingOutcome {
            booking: next,
            events,
            cancelled: cancelling,
        })
    }

    /// Cancels a booking, keeping its row with status `cancelled`.
    /// Cancelling twice is a no-op.
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> BookingResult<BookingOutcome> {
        let current = self.store.get_booking(id).await?.ok_or_else(|| booking_not_found(id))?;
        if !actor.can_access(&current.user_id) {
            return Err(BookingError::Forbidden("You can only cancel your own bookings".to_string()));
        }
        if current.status == BookingStatus::Cancelled {
            return Ok(BookingOutcome::unchanged(current));
        }
        if current.status == BookingStatus::Completed && !actor.is_admin() {
            return Err(BookingError::Forbidden(
                "Completed bookings can only be cancelled by an administrator".to_string(),
            ));
        }

        let inventory_trip = self.inventory_trip(&current).await?;

        let mut tx = self.store.begin().await?;
        let booking = tx.lock_booking(id).await?.ok_or_else(|| booking_not_found(id))?;
        if booking.status == BookingStatus::Cancelled {
            return Ok(BookingOutcome::unchanged(booking));
        }

        let events: Vec<SeatEvent> = release_booking(tx.as_mut(), inventory_trip, &booking)
            .await
            .map_err(|e| write_failed(e, "release inventory", inventory_trip, &booking))?
            .into_iter()
            .collect();

        let mut cancelled = booking.clone();
        cancelled.update_status(BookingStatus::Cancelled);
        tx.update_booking(&cancelled)
            .await
            .map_err(|e| write_failed(e, "cancel booking", inventory_trip, &cancelled))?;
        tx.commit()
            .await
            .map_err(|e| write_failed(e, "commit cancellation", inventory_trip, &cancelled))?;

        info!(
            booking_id = %cancelled.id,
            cancelled_by = %actor.id,
            seats = ?cancelled.seat_numbers,
            "Booking cancelled"
        );
        Ok(BookingOutcome {
            booking: cancelled,
            events,
            cancelled: true,
        })
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> BookingResult<Booking> {
        let booking = self.store.get_booking(id).await?.ok_or_else(|| booking_not_found(id))?;
        if !actor.can_access(&booking.user_id) {
            return Err(BookingError::Forbidden("You can only view your own bookings".to_string()));
        }
        Ok(booking)
    }

    /// Administrators see every booking, customers only their own.
    pub async fn list(&self, actor: &Actor) -> BookingResult<Vec<Booking>> {
        let filter = if actor.is_admin() { None } else { Some(actor.id.as_str()) };
        Ok(self.store.list_bookings(filter).await?)
    }

    fn check_quantity(&self, seat_quantity: i32) -> BookingResult<()> {
        if seat_quantity < 1 {
            return Err(BookingError::Validation("seat_quantity must be at least 1".to_string()));
        }
        if seat_quantity > self.max_seats_per_booking {
            return Err(BookingError::Validation(format!(
                "At most {} seats can be booked at once",
                self.max_seats_per_booking
            )));
        }
        Ok(())
    }

    async fn resolve_trip(
        &self,
        route_id: Uuid,
        trip_id: Option<Uuid>,
        departure_date: Option<NaiveDate>,
    ) -> BookingResult<Trip> {
        match trip_id {
            Some(trip_id) => {
                let trip = self
                    .trips
                    .get_trip(trip_id)
                    .await?
                    .ok_or_else(|| trip_not_found(trip_id))?;
                if trip.route_id != route_id {
                    return Err(BookingError::Validation(format!(
                        "Trip {} does not run on route {}",
                        trip_id, route_id
                    )));
                }
                if let Some(date) = departure_date {
                    if date != trip.departure_date {
                        return Err(BookingError::Validation(format!(
                            "Trip {} departs on {}, not {}",
                            trip_id, trip.departure_date, date
                        )));
                    }
                }
                Ok(trip)
            }
            None => {
                let date = departure_date.ok_or_else(|| {
                    BookingError::Validation(
                        "departure_date is required when trip_id is not provided".to_string(),
                    )
                })?;
                let trip = self
                    .trips
                    .find_trips_for_route(route_id, date)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        BookingError::NotFound(format!("No trip of route {} departs on {}", route_id, date))
                    })?;
                warn!(route_id = %route_id, %date, trip_id = %trip.id, "Booking matched to trip by route and date");
                Ok(trip)
            }
        }
    }

    /// Trip whose inventory a booking draws on. Legacy bookings without a trip
    /// reference fall back to the first trip of their route on their date.
    async fn inventory_trip(&self, booking: &Booking) -> BookingResult<Option<Uuid>> {
        match booking.trip_id {
            Some(trip_id) => Ok(Some(trip_id)),
            None => self.legacy_trip(booking, booking.departure_date).await,
        }
    }

    async fn legacy_trip(&self, booking: &Booking, date: NaiveDate) -> BookingResult<Option<Uuid>> {
        let matched = self
            .trips
            .find_trips_for_route(booking.route_id, date)
            .await?
            .into_iter()
            .next()
            .map(|trip| trip.id);
        match matched {
            Some(trip_id) => warn!(booking_id = %booking.id, %date, %trip_id, "Legacy booking matched to trip by route and date"),
            None => warn!(booking_id = %booking.id, %date, "Legacy booking has no matching trip, inventory left untouched"),
        }
        Ok(matched)
    }

    /// Current unit price and promotion discount, for repricing a seat change.
    async fn pricing_for(&self, booking: &Booking) -> BookingResult<(Decimal, Option<Decimal>)> {
        let route = self
            .routes
            .get_route(booking.route_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Route {} not found", booking.route_id)))?;
        let discount_percent = match &booking.promotion_code {
            Some(code) => self
                .promotions
                .find_by_code(code)
                .await?
                .map(|p| p.discount_percent),
            None => None,
        };
        Ok((route.price, discount_percent))
    }
}

/// Applies the inventory rule to the locked copy, then the conditional
/// decrement in the store. Returns the new available count.
async fn reserve(tx: &mut dyn BookingTx, trip: &mut Trip, count: i32) -> BookingResult<i32> {
    let before = trip.available_seats;
    trip.reserve(count).map_err(|e| inventory_error(trip.id, e))?;

    match tx.reserve_seats(trip.id, count).await? {
        Some(available) => Ok(available),
        None => {
            warn!(trip_id = %trip.id, requested = count, available = before, "Inventory reservation rejected");
            Err(BookingError::InsufficientInventory {
                trip_id: trip.id,
                requested: count,
                available: before,
            })
        }
    }
}

async fn release_booking(
    tx: &mut dyn BookingTx,
    trip_id: Option<Uuid>,
    booking: &Booking,
) -> BookingResult<Option<SeatEvent>> {
    let Some(trip_id) = trip_id else {
        return Ok(None);
    };
    let available = tx.release_seats(trip_id, booking.seat_quantity).await?;
    Ok(Some(SeatEvent::released(
        trip_id,
        booking.id,
        booking.seat_numbers.clone(),
        available,
    )))
}

fn inventory_error(trip_id: Uuid, err: InventoryError) -> BookingError {
    match err {
        InventoryError::InsufficientInventory { requested, available } => {
            warn!(%trip_id, requested, available, "Inventory reservation rejected");
            BookingError::InsufficientInventory {
                trip_id,
                requested,
                available,
            }
        }
        other => BookingError::Validation(other.to_string()),
    }
}

fn seat_write_error(err: StoreError, seats: &[String]) -> BookingError {
    match err {
        StoreError::UniqueViolation(_) => BookingError::SeatConflict(seats.to_vec()),
        other => other.into(),
    }
}

/// Storage failures inside a booking transaction are logged with the trip,
/// seats and booking they were writing; the caller only sees a generic error.
fn write_failed(
    err: impl Into<BookingError>,
    action: &'static str,
    trip_id: Option<Uuid>,
    booking: &Booking,
) -> BookingError {
    let err = err.into();
    if let BookingError::Store(cause) = &err {
        error!(
            action,
            trip_id = ?trip_id,
            booking_id = %booking.id,
            seats = ?booking.seat_numbers,
            booking = ?booking,
            error = %cause,
            "Booking write failed"
        );
    }
    err
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn booking_not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Booking {} not found", id))
}

fn trip_not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("Trip {} not found", id))
}
