//! Shared fixtures for service tests: an in-memory database, seeded
//! entities, and the ledger-consistency assertion run after mutations.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use posada_core::{
    Actor, Capabilities, Customer, NotificationEvent, NotificationPort, Operator, Product, Room,
    RoomStatus,
};

use crate::pool::{Database, DbConfig};
use crate::service::stepup::hash_password;

/// Password every seeded operator authenticates with.
pub const OPERATOR_PASSWORD: &str = "operator-secret";

/// A fresh in-memory database with migrations applied.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// A notifier that records every delivered event, for asserting emission.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl CollectingNotifier {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }
}

impl NotificationPort for CollectingNotifier {
    fn deliver(&self, event: &NotificationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A fresh in-memory database wired to a [`CollectingNotifier`].
pub async fn test_db_with_events() -> (Database, CollectingNotifier) {
    let notifier = CollectingNotifier::default();
    let db = Database::with_notifier(DbConfig::in_memory(), Arc::new(notifier.clone()))
        .await
        .expect("in-memory database");
    (db, notifier)
}

/// Seeds an operator with the well-known test password.
pub async fn seed_operator(db: &Database) -> Operator {
    let operator = Operator {
        id: Uuid::new_v4().to_string(),
        name: "Hostal El Prado".into(),
        phone: Some("+59170000000".into()),
        password_hash: hash_password(OPERATOR_PASSWORD).unwrap(),
        created_at: Utc::now(),
    };
    db.operators().create(&operator).await.unwrap();
    operator
}

/// Seeds an available room with no short-stay tariffs.
pub async fn seed_room(db: &Database, operator_id: &str, number: &str, base_price_cents: i64) -> Room {
    seed_room_with_tariffs(db, operator_id, number, base_price_cents, None, None).await
}

/// Seeds an available room with optional short-stay tariffs.
pub async fn seed_room_with_tariffs(
    db: &Database,
    operator_id: &str,
    number: &str,
    base_price_cents: i64,
    p3h: Option<i64>,
    p6h: Option<i64>,
) -> Room {
    let now = Utc::now();
    let room = Room {
        id: Uuid::new_v4().to_string(),
        operator_id: operator_id.to_string(),
        room_number: number.to_string(),
        room_type: "simple".into(),
        base_price_cents,
        short_stay_3h_price_cents: p3h,
        short_stay_6h_price_cents: p6h,
        floor: Some(1),
        max_occupancy: 2,
        status: RoomStatus::Available,
        created_at: now,
        updated_at: now,
    };
    db.rooms().create(&room).await.unwrap();
    room
}

/// Seeds a customer with no completed stays.
pub async fn seed_customer(db: &Database, operator_id: &str, name: &str) -> Customer {
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        operator_id: operator_id.to_string(),
        full_name: name.to_string(),
        document_number: Some("1234567".into()),
        phone: Some("+59171111111".into()),
        age: Some(34),
        nationality: Some("Bolivia".into()),
        origin: Some("La Paz".into()),
        total_stays: 0,
        total_spent_cents: 0,
        last_stay_date: None,
        is_frequent: false,
        created_at: Utc::now(),
    };
    db.customers().create(&customer).await.unwrap();
    customer
}

/// Seeds a catalog product.
pub async fn seed_product(
    db: &Database,
    operator_id: &str,
    name: &str,
    price_cents: i64,
    tax_rate_bps: u32,
    track_inventory: bool,
    stock: i64,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        operator_id: operator_id.to_string(),
        category: "minibar".into(),
        name: name.to_string(),
        price_cents,
        tax_rate_bps,
        track_inventory,
        stock_quantity: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().create(&product).await.unwrap();
    product
}

/// A cashier actor with a fresh id and the given capability set.
pub fn cashier_actor(operator_id: &str, capabilities: Capabilities) -> Actor {
    Actor::cashier(Uuid::new_v4().to_string(), operator_id, capabilities)
}

/// Asserts a booking's incrementally-maintained counters equal the fold of
/// its ledger lines, and that the balance invariant holds.
///
/// Run after every mutating operation in tests to catch counter drift.
pub async fn assert_ledger_consistent(db: &Database, operator_id: &str, booking_id: &str) {
    let repo = db.bookings();
    let booking = repo
        .get(operator_id, booking_id)
        .await
        .unwrap()
        .expect("booking exists");
    let fold = repo.fold_ledger(operator_id, booking_id).await.unwrap();

    assert_eq!(
        booking.additional_charges_cents, fold.charges_cents,
        "charge counter drifted from ledger lines"
    );
    assert_eq!(
        booking.discounts_cents, fold.discounts_cents,
        "discount counter drifted from ledger lines"
    );
    assert_eq!(
        booking.amount_paid_cents,
        fold.payments_cents - fold.refunds_cents,
        "amount_paid drifted from payment/refund lines"
    );
    assert_eq!(
        booking.total_amount_cents,
        booking.base_price_cents * booking.nights
            + booking.additional_income_cents
            + fold.charges_cents
            - fold.discounts_cents,
        "total_amount drifted from stay price + ledger lines"
    );
    assert!(
        booking.balance().cents() >= 0,
        "balance invariant violated: {}",
        booking.balance()
    );
}
