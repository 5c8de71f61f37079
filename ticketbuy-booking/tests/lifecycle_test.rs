use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use ticketbuy_booking::{
    Booking, BookingError, BookingManager, BookingStatus, BookingStore, BookingTx, BookingUpdate, CreateBooking,
    MemoryStore, SeatQuery, SeatScope,
};
use ticketbuy_catalog::{Promotion, PromotionRejection, Route, Trip, TripStatus};
use ticketbuy_core::repository::{PromotionRepository, RouteRepository, TripRepository};
use ticketbuy_core::{Actor, StoreError, StoreResult};
use ticketbuy_shared::SeatEventKind;

struct Fixture {
    store: MemoryStore,
    manager: Arc<BookingManager>,
    route: Route,
    trip: Trip,
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 20).unwrap()
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

async fn fixture_with_capacity(total_seats: i32) -> Fixture {
    let store = MemoryStore::new();
    let route = Route::new("Hà Nội → Hải Phòng".to_string(), None, Decimal::new(100_000, 0));
    store.create_route(&route).await.unwrap();
    let trip = Trip::new(route.id, date(), time(8), total_seats).unwrap();
    store.create_trip(&trip).await.unwrap();

    let shared = Arc::new(store.clone());
    let manager = BookingManager::new(shared.clone(), shared.clone(), shared.clone(), shared, 10);

    Fixture {
        store,
        manager: Arc::new(manager),
        route,
        trip,
    }
}

async fn fixture() -> Fixture {
    fixture_with_capacity(40).await
}

fn request(f: &Fixture, seats: &[&str]) -> CreateBooking {
    CreateBooking {
        route_id: f.route.id,
        trip_id: Some(f.trip.id),
        departure_date: None,
        seat_quantity: seats.len() as i32,
        seat_numbers: seats.iter().map(|s| s.to_string()).collect(),
        promotion_code: None,
        status: None,
        user_id: None,
        contact_name: None,
        contact_phone: None,
    }
}

async fn available(f: &Fixture) -> i32 {
    f.store.get_trip(f.trip.id).await.unwrap().unwrap().available_seats
}

/// available_seats == total_seats - seats held by non-cancelled bookings.
async fn assert_inventory_consistent(f: &Fixture) {
    let trip = f.store.get_trip(f.trip.id).await.unwrap().unwrap();
    let held: i32 = f
        .store
        .list_bookings(None)
        .await
        .unwrap()
        .iter()
        .filter(|b| b.trip_id == Some(trip.id) && b.status.holds_seats())
        .map(|b| b.seat_quantity)
        .sum();
    assert_eq!(trip.available_seats, trip.total_seats - held);
    assert!(trip.available_seats >= 0 && trip.available_seats <= trip.total_seats);
}

#[tokio::test]
async fn test_book_cancel_rebook_scenario() {
    let f = fixture().await;
    let alice = Actor::customer("alice");

    let created = f.manager.create(&alice, request(&f, &["A01", "A02", "A03"])).await.unwrap();
    assert_eq!(created.booking.status, BookingStatus::Pending);
    assert_eq!(available(&f).await, 37);
    assert_eq!(created.events.len(), 1);
    assert_eq!(created.events[0].kind, SeatEventKind::Reserved);
    assert_eq!(created.events[0].available_seats, 37);

    let cancelled = f.manager.cancel(&alice, created.booking.id).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(available(&f).await, 40);

    let rebooked = f.manager.create(&alice, request(&f, &["A01", "A02", "A03"])).await.unwrap();
    assert_eq!(rebooked.booking.seat_quantity, 3);
    assert_eq!(available(&f).await, 37);
    assert_inventory_consistent(&f).await;
}

#[tokio::test]
async fn test_conflict_is_rejected_without_touching_inventory() {
    let f = fixture().await;
    f.manager
        .create(&Actor::customer("alice"), request(&f, &["A01"]))
        .await
        .unwrap();
    assert_eq!(available(&f).await, 39);

    let err = f
        .manager
        .create(&Actor::customer("bob"), request(&f, &["a01 ", "A05"]))
        .await
        .unwrap_err();
    match err {
        BookingError::SeatConflict(seats) => assert_eq!(seats, vec!["A01".to_string()]),
        other => panic!("expected seat conflict, got {:?}", other),
    }
    assert_eq!(available(&f).await, 39);
    assert_inventory_consistent(&f).await;
}

#[tokio::test]
async fn test_cancel_twice_releases_once() {
    let f = fixture().await;
    let alice = Actor::customer("alice");
    let booking = f.manager.create(&alice, request(&f, &["B01", "B02"])).await.unwrap().booking;

    f.manager.cancel(&alice, booking.id).await.unwrap();
    let again = f.manager.cancel(&alice, booking.id).await.unwrap();

    assert!(again.events.is_empty());
    assert_eq!(again.booking.status, BookingStatus::Cancelled);
    assert_eq!(available(&f).await, 40);
}

#[tokio::test]
async fn test_booked_seats_round_trip() {
    let f = fixture().await;
    f.manager
        .create(&Actor::customer("alice"), request(&f, &["A02", "A01"]))
        .await
        .unwrap();

    let by_trip = f
        .manager
        .booked_seats(&SeatQuery {
            trip_id: Some(f.trip.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_trip, vec!["A01".to_string(), "A02".to_string()]);

    let by_route = f
        .manager
        .booked_seats(&SeatQuery {
            route_id: Some(f.route.id),
            departure_date: Some(date()),
            trip_id: None,
        })
        .await
        .unwrap();
    assert_eq!(by_route, by_trip);

    let missing = f.manager.booked_seats(&SeatQuery::default()).await.unwrap_err();
    assert!(matches!(missing, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_ownership_rules() {
    let f = fixture().await;
    let alice = Actor::customer("alice");
    let mallory = Actor::customer("mallory");
    let admin = Actor::admin("admin");
    let booking = f.manager.create(&alice, request(&f, &["C01"])).await.unwrap().booking;

    assert!(matches!(f.manager.get(&mallory, booking.id).await, Err(BookingError::Forbidden(_))));
    assert!(matches!(f.manager.cancel(&mallory, booking.id).await, Err(BookingError::Forbidden(_))));
    assert!(f.manager.get(&admin, booking.id).await.is_ok());

    let update = BookingUpdate {
        status: Some(BookingStatus::Confirmed),
        ..Default::default()
    };
    assert!(matches!(
        f.manager.update(&alice, booking.id, update.clone()).await,
        Err(BookingError::Forbidden(_))
    ));

    let mut confirmed = request(&f, &["C02"]);
    confirmed.status = Some(BookingStatus::Confirmed);
    assert!(matches!(f.manager.create(&alice, confirmed).await, Err(BookingError::Forbidden(_))));

    let mut on_behalf = request(&f, &["C03"]);
    on_behalf.user_id = Some("bob".to_string());
    assert!(matches!(f.manager.create(&alice, on_behalf.clone()).await, Err(BookingError::Forbidden(_))));
    let booked = f.manager.create(&admin, on_behalf).await.unwrap().booking;
    assert_eq!(booked.user_id, "bob");

    assert_eq!(f.manager.list(&alice).await.unwrap().len(), 1);
    assert_eq!(f.manager.list(&admin).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_promotion_pricing_and_reuse() {
    let f = fixture().await;
    let promo = Promotion::new("tet10".to_string(), None, Decimal::TEN, None, None).unwrap();
    f.store.create_promotion(&promo).await.unwrap();
    let alice = Actor::customer("alice");

    let mut req = request(&f, &["D01", "D02"]);
    req.promotion_code = Some(" tet10 ".to_string());
    let first = f.manager.create(&alice, req.clone()).await.unwrap().booking;
    assert_eq!(first.total_price, Decimal::new(180_000, 0));
    assert_eq!(first.discount_amount, Decimal::new(20_000, 0));
    assert_eq!(first.promotion_code.as_deref(), Some("TET10"));

    req.seat_numbers = vec!["D03".to_string(), "D04".to_string()];
    let reused = f.manager.create(&alice, req.clone()).await.unwrap_err();
    assert!(matches!(reused, BookingError::Promotion(PromotionRejection::AlreadyUsed(_))));
    assert_eq!(available(&f).await, 38);

    let check = f.manager.validate_promotion("TET10", Some("alice"), true).await;
    assert!(matches!(check, Err(BookingError::Promotion(PromotionRejection::AlreadyUsed(_)))));
    assert!(f.manager.validate_promotion("TET10", Some("bob"), true).await.is_ok());

    f.manager.cancel(&alice, first.id).await.unwrap();
    assert!(f.manager.create(&alice, req).await.is_ok());

    let unknown = f.manager.validate_promotion("NOPE", None, false).await.unwrap_err();
    assert!(matches!(unknown, BookingError::Promotion(PromotionRejection::Unknown(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_seat() {
    let f = fixture().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = f.manager.clone();
        let req = request(&f, &["E01"]);
        handles.push(tokio::spawn(async move {
            manager.create(&Actor::customer(format!("user-{}", i)), req).await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(BookingError::SeatConflict(seats)) => assert_eq!(seats, vec!["E01".to_string()]),
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(available(&f).await, 39);
    assert_inventory_consistent(&f).await;
}

#[tokio::test]
async fn test_insufficient_inventory() {
    let f = fixture_with_capacity(2).await;
    let err = f
        .manager
        .create(&Actor::customer("alice"), request(&f, &["A01", "A02", "A03"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientInventory {
            requested: 3,
            available: 2,
            ..
        }
    ));
    assert_eq!(available(&f).await, 2);
    assert!(f.store.list_bookings(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_request_validation() {
    let f = fixture().await;
    let alice = Actor::customer("alice");

    let mut mismatch = request(&f, &["A01", "A02"]);
    mismatch.seat_quantity = 3;
    assert!(matches!(f.manager.create(&alice, mismatch).await, Err(BookingError::Validation(_))));

    let mut too_many = request(&f, &["A01"]);
    too_many.seat_quantity = 11;
    too_many.seat_numbers = (1..=11).map(|n| format!("A{:02}", n)).collect();
    assert!(matches!(f.manager.create(&alice, too_many).await, Err(BookingError::Validation(_))));

    let mut wrong_route = request(&f, &["A01"]);
    wrong_route.route_id = Uuid::new_v4();
    assert!(matches!(f.manager.create(&alice, wrong_route).await, Err(BookingError::NotFound(_))));

    let other_route = Route::new("Huế → Đà Nẵng".to_string(), None, Decimal::ONE);
    f.store.create_route(&other_route).await.unwrap();
    let mut foreign_trip = request(&f, &["A01"]);
    foreign_trip.route_id = other_route.id;
    assert!(matches!(f.manager.create(&alice, foreign_trip).await, Err(BookingError::Validation(_))));

    let mut cancelled_status = request(&f, &["A01"]);
    cancelled_status.status = Some(BookingStatus::Cancelled);
    assert!(matches!(f.manager.create(&alice, cancelled_status).await, Err(BookingError::Validation(_))));

    assert_eq!(available(&f).await, 40);
}

#[tokio::test]
async fn test_inactive_trip_is_not_bookable() {
    let f = fixture().await;
    let mut closed = Trip::new(f.route.id, date(), time(22), 30).unwrap();
    closed.status = TripStatus::Inactive;
    f.store.create_trip(&closed).await.unwrap();

    let mut req = request(&f, &["A01"]);
    req.trip_id = Some(closed.id);
    let err = f.manager.create(&Actor::customer("alice"), req).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_route_and_date_fallback_picks_earliest_trip() {
    let f = fixture().await;
    let early = Trip::new(f.route.id, date(), time(6), 20).unwrap();
    f.store.create_trip(&early).await.unwrap();

    let mut req = request(&f, &["A01"]);
    req.trip_id = None;
    req.departure_date = Some(date());
    let booking = f.manager.create(&Actor::customer("alice"), req.clone()).await.unwrap().booking;
    assert_eq!(booking.trip_id, Some(early.id));
    assert_eq!(f.store.get_trip(early.id).await.unwrap().unwrap().available_seats, 19);

    req.departure_date = Some(date().succ_opt().unwrap());
    let err = f.manager.create(&Actor::customer("alice"), req).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_admin_status_flow() {
    let f = fixture().await;
    let admin = Actor::admin("admin");
    let alice = Actor::customer("alice");
    let booking = f.manager.create(&alice, request(&f, &["F01", "F02"])).await.unwrap().booking;

    let status = |s| BookingUpdate {
        status: Some(s),
        ..Default::default()
    };

    let confirmed = f.manager.update(&admin, booking.id, status(BookingStatus::Confirmed)).await.unwrap();
    assert_eq!(confirmed.booking.status, BookingStatus::Confirmed);
    assert!(confirmed.events.is_empty());
    assert_eq!(available(&f).await, 38);

    let back = f.manager.update(&admin, booking.id, status(BookingStatus::Pending)).await;
    assert!(matches!(back, Err(BookingError::Validation(_))));

    f.manager.update(&admin, booking.id, status(BookingStatus::Completed)).await.unwrap();
    assert!(matches!(f.manager.cancel(&alice, booking.id).await, Err(BookingError::Forbidden(_))));

    let cancelled = f.manager.update(&admin, booking.id, status(BookingStatus::Cancelled)).await.unwrap();
    assert_eq!(cancelled.events.len(), 1);
    assert_eq!(cancelled.events[0].kind, SeatEventKind::Released);
    assert_eq!(available(&f).await, 40);

    let revive = f.manager.update(&admin, booking.id, status(BookingStatus::Confirmed)).await;
    assert!(matches!(revive, Err(BookingError::Validation(_))));

    let empty = f.manager.update(&admin, booking.id, BookingUpdate::default()).await;
    assert!(matches!(empty, Err(BookingError::Validation(_))));
    assert_inventory_consistent(&f).await;
}

#[tokio::test]
async fn test_admin_seat_change_adjusts_inventory() {
    let f = fixture().await;
    let admin = Actor::admin("admin");
    let booking = f
        .manager
        .create(&Actor::customer("alice"), request(&f, &["G01", "G02"]))
        .await
        .unwrap()
        .booking;
    f.manager
        .create(&Actor::customer("bob"), request(&f, &["G05"]))
        .await
        .unwrap();
    assert_eq!(available(&f).await, 37);

    let grow = BookingUpdate {
        seat_numbers: Some(vec!["G01".to_string(), "G03".to_string(), "G04".to_string()]),
        seat_quantity: Some(3),
        ..Default::default()
    };
    let grown = f.manager.update(&admin, booking.id, grow).await.unwrap().booking;
    assert_eq!(grown.seat_quantity, 3);
    assert_eq!(grown.total_price, Decimal::new(300_000, 0));
    assert_eq!(available(&f).await, 36);

    let seats = f
        .manager
        .booked_seats(&SeatQuery {
            trip_id: Some(f.trip.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!seats.contains(&"G02".to_string()));
    assert!(seats.contains(&"G04".to_string()));

    let clash = BookingUpdate {
        seat_numbers: Some(vec!["G01".to_string(), "G05".to_string()]),
        ..Default::default()
    };
    let err = f.manager.update(&admin, booking.id, clash).await.unwrap_err();
    assert!(matches!(err, BookingError::SeatConflict(ref s) if s == &vec!["G05".to_string()]));
    assert_eq!(available(&f).await, 36);

    let shrink = BookingUpdate {
        seat_numbers: Some(vec!["G04".to_string()]),
        ..Default::default()
    };
    f.manager.update(&admin, booking.id, shrink).await.unwrap();
    assert_eq!(available(&f).await, 38);

    let move_date = BookingUpdate {
        departure_date: Some(date().succ_opt().unwrap()),
        ..Default::default()
    };
    assert!(matches!(
        f.manager.update(&admin, booking.id, move_date).await,
        Err(BookingError::Validation(_))
    ));
    assert_inventory_consistent(&f).await;
}

/// Writes a booking the way rows created before trips were tracked look:
/// no trip reference, seats drawn from `draws_on` when given.
async fn seed_legacy_booking(f: &Fixture, user: &str, seats: &[&str], draws_on: Option<Uuid>) -> Booking {
    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        user_id: user.to_string(),
        route_id: f.route.id,
        trip_id: None,
        seat_quantity: seats.len() as i32,
        seat_numbers: seats.iter().map(|s| s.to_string()).collect(),
        status: BookingStatus::Pending,
        departure_date: date(),
        promotion_code: None,
        total_price: Decimal::new(100_000, 0) * Decimal::from(seats.len() as i32),
        discount_amount: Decimal::ZERO,
        contact_name: None,
        contact_phone: None,
        created_at: now,
        updated_at: now,
    };

    let mut tx = f.store.begin().await.unwrap();
    tx.insert_booking(&booking).await.unwrap();
    if let Some(trip_id) = draws_on {
        tx.reserve_seats(trip_id, booking.seat_quantity).await.unwrap().unwrap();
    }
    tx.commit().await.unwrap();
    booking
}

async fn available_on(f: &Fixture, trip_id: Uuid) -> i32 {
    f.store.get_trip(trip_id).await.unwrap().unwrap().available_seats
}

#[tokio::test]
async fn test_booking_without_trip_sees_legacy_seats() {
    let f = fixture().await;
    seed_legacy_booking(&f, "carol", &["A01"], Some(f.trip.id)).await;
    assert_eq!(available(&f).await, 39);

    let mut req = request(&f, &["A01"]);
    req.trip_id = None;
    req.departure_date = Some(date());
    let err = f.manager.create(&Actor::customer("dave"), req.clone()).await.unwrap_err();
    match err {
        BookingError::SeatConflict(seats) => assert_eq!(seats, vec!["A01".to_string()]),
        other => panic!("expected seat conflict, got {:?}", other),
    }
    assert_eq!(available(&f).await, 39);

    req.seat_numbers = vec!["A02".to_string()];
    let booking = f.manager.create(&Actor::customer("dave"), req).await.unwrap().booking;
    assert_eq!(booking.trip_id, Some(f.trip.id));
    assert_eq!(available(&f).await, 38);

    let seats = f
        .manager
        .booked_seats(&SeatQuery {
            route_id: Some(f.route.id),
            departure_date: Some(date()),
            trip_id: None,
        })
        .await
        .unwrap();
    assert_eq!(seats, vec!["A01".to_string(), "A02".to_string()]);
}

#[tokio::test]
async fn test_legacy_booking_cancel_releases_matched_trip() {
    let f = fixture().await;
    let carol = Actor::customer("carol");
    let legacy = seed_legacy_booking(&f, "carol", &["C01", "C02"], Some(f.trip.id)).await;
    assert_eq!(available(&f).await, 38);

    let outcome = f.manager.cancel(&carol, legacy.id).await.unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].trip_id, f.trip.id);
    assert_eq!(outcome.events[0].kind, SeatEventKind::Released);
    assert_eq!(available(&f).await, 40);

    f.manager.cancel(&carol, legacy.id).await.unwrap();
    assert_eq!(available(&f).await, 40);
}

#[tokio::test]
async fn test_legacy_date_and_seat_change_moves_inventory() {
    let f = fixture().await;
    let admin = Actor::admin("admin");
    let next_day = date().succ_opt().unwrap();
    let later = Trip::new(f.route.id, next_day, time(8), 40).unwrap();
    f.store.create_trip(&later).await.unwrap();

    let legacy = seed_legacy_booking(&f, "carol", &["D01", "D02"], Some(f.trip.id)).await;
    assert_eq!(available(&f).await, 38);

    let edit = BookingUpdate {
        departure_date: Some(next_day),
        seat_numbers: Some(vec!["D01".to_string(), "D02".to_string(), "D03".to_string()]),
        seat_quantity: Some(3),
        ..Default::default()
    };
    let outcome = f.manager.update(&admin, legacy.id, edit).await.unwrap();
    assert_eq!(outcome.booking.departure_date, next_day);
    assert_eq!(outcome.booking.seat_quantity, 3);
    assert_eq!(outcome.booking.total_price, Decimal::new(300_000, 0));
    assert_eq!(available_on(&f, f.trip.id).await, 40);
    assert_eq!(available_on(&f, later.id).await, 37);

    let kinds: Vec<(SeatEventKind, Uuid)> = outcome.events.iter().map(|e| (e.kind, e.trip_id)).collect();
    assert_eq!(
        kinds,
        vec![(SeatEventKind::Released, f.trip.id), (SeatEventKind::Reserved, later.id)]
    );

    f.manager.cancel(&admin, legacy.id).await.unwrap();
    assert_eq!(available_on(&f, f.trip.id).await, 40);
    assert_eq!(available_on(&f, later.id).await, 40);
}

#[tokio::test]
async fn test_legacy_date_change_alone_moves_inventory() {
    let f = fixture().await;
    let admin = Actor::admin("admin");
    let next_day = date().succ_opt().unwrap();
    let later = Trip::new(f.route.id, next_day, time(9), 20).unwrap();
    f.store.create_trip(&later).await.unwrap();

    let legacy = seed_legacy_booking(&f, "carol", &["E01"], Some(f.trip.id)).await;

    let move_day = BookingUpdate {
        departure_date: Some(next_day),
        ..Default::default()
    };
    let moved = f.manager.update(&admin, legacy.id, move_day).await.unwrap().booking;
    assert_eq!(moved.departure_date, next_day);
    assert_eq!(moved.seat_numbers, vec!["E01".to_string()]);
    assert_eq!(available_on(&f, f.trip.id).await, 40);
    assert_eq!(available_on(&f, later.id).await, 19);

    // The date of a trip-linked booking follows its trip.
    let linked = f
        .manager
        .create(&Actor::customer("alice"), request(&f, &["E05"]))
        .await
        .unwrap()
        .booking;
    let err = f
        .manager
        .update(
            &admin,
            linked.id,
            BookingUpdate {
                departure_date: Some(next_day),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

/// Memory store whose transactions fail every booking insert.
struct BrokenInsertStore {
    inner: MemoryStore,
}

struct BrokenInsertTx {
    inner: Box<dyn BookingTx>,
}

#[async_trait]
impl BookingStore for BrokenInsertStore {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTx>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(BrokenInsertTx { inner }))
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn list_bookings(&self, user_id: Option<&str>) -> StoreResult<Vec<Booking>> {
        self.inner.list_bookings(user_id).await
    }

    async fn occupied_seats(&self, scope: SeatScope) -> StoreResult<Vec<String>> {
        self.inner.occupied_seats(scope).await
    }

    async fn count_promotion_uses(&self, user_id: &str, code: &str) -> StoreResult<i64> {
        self.inner.count_promotion_uses(user_id, code).await
    }
}

#[async_trait]
impl BookingTx for BrokenInsertTx {
    async fn lock_trip(&mut self, trip_id: Uuid) -> StoreResult<Option<Trip>> {
        self.inner.lock_trip(trip_id).await
    }

    async fn lock_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.lock_booking(id).await
    }

    async fn occupied_seats(&mut self, scope: SeatScope, excluding: Option<Uuid>) -> StoreResult<Vec<String>> {
        self.inner.occupied_seats(scope, excluding).await
    }

    async fn count_promotion_uses(&mut self, user_id: &str, code: &str) -> StoreResult<i64> {
        self.inner.count_promotion_uses(user_id, code).await
    }

    async fn reserve_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<Option<i32>> {
        self.inner.reserve_seats(trip_id, count).await
    }

    async fn release_seats(&mut self, trip_id: Uuid, count: i32) -> StoreResult<i32> {
        self.inner.release_seats(trip_id, count).await
    }

    async fn insert_booking(&mut self, _booking: &Booking) -> StoreResult<()> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.inner.update_booking(booking).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit().await
    }
}

#[tokio::test]
async fn test_failed_insert_rolls_back_reservation() {
    let f = fixture().await;
    let shared = Arc::new(f.store.clone());
    let broken = Arc::new(BrokenInsertStore {
        inner: f.store.clone(),
    });
    let manager = BookingManager::new(shared.clone(), shared.clone(), shared, broken, 10);

    let err = manager
        .create(&Actor::customer("alice"), request(&f, &["H01", "H02"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Store(StoreError::Backend(_))));
    assert_eq!(available(&f).await, 40);
    assert!(f.store.list_bookings(None).await.unwrap().is_empty());

    // The store lock was released with the dropped transaction.
    f.manager
        .create(&Actor::customer("alice"), request(&f, &["H01"]))
        .await
        .unwrap();
    assert_eq!(available(&f).await, 39);
}
