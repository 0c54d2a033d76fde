//! # Ledger Engine
//!
//! Owns a booking's financial ledger and its invariants. Every operation
//! here is one atomic unit: all of its sub-mutations (ledger line insert,
//! counter update, room transition, inventory decrement, customer
//! aggregates) commit together or not at all.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_booking   room available→occupied + booking insert              │
//! │  add_charges      charge lines + counters + stock decrement             │
//! │  apply_payment    payment line + amount_paid (≤ balance, always)        │
//! │  apply_discount   cap check + step-up check + discount line + total     │
//! │  refund           step-up always + refund line + amount_paid            │
//! │  checkout         balance == 0 + room release + customer aggregates     │
//! │                                                                         │
//! │  Invariant at every commit point:                                       │
//! │      0 ≤ balance = total_amount − amount_paid                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use posada_core::validation::{
    validate_amount_cents, validate_full_name, validate_non_negative_cents, validate_quantity,
    validate_rate_bps, validate_reason, MAX_CHARGE_ITEMS,
};
use posada_core::{
    Actor, AuthorizationGate, Booking, BookingStatus, ChargeLine, ChargeSummaryLine, CoreError,
    Customer, DiscountKind, DiscountLine, LedgerAction, Money, NotificationEvent,
    NotificationPort, PaymentLine, PaymentMethod, PricingCalculator, RateBps, RefundLine,
    Requirement, Room, RoomStatus, StayParams, StayType, StepUpToken, ValidationError,
    FREQUENT_GUEST_STAYS,
};

use crate::error::DbError;
use crate::repository::booking::BookingRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::room::RoomRepository;
use crate::service::EngineResult;

// =============================================================================
// Operation inputs and receipts
// =============================================================================

/// Who is checking in: a guest already on file, or a walk-in registered as
/// part of the same check-in transaction.
#[derive(Debug, Clone)]
pub enum BookingCustomer {
    Existing(String),
    New(NewGuest),
}

/// Walk-in guest details for one-shot registration.
#[derive(Debug, Clone)]
pub struct NewGuest {
    pub full_name: String,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub nationality: Option<String>,
    pub origin: Option<String>,
}

/// Check-in request.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer: BookingCustomer,
    pub room_id: String,
    pub stay_type: StayType,

    /// Nights for daily stays; short stays always bill one block.
    pub nights: i64,
    pub guests: i64,

    /// Defaults to now.
    pub check_in: Option<DateTime<Utc>>,
    pub expected_checkout: Option<DateTime<Utc>>,

    /// Extras agreed at check-in (parking, extra bed, ...).
    pub additional_income_cents: i64,

    pub notes: Option<String>,
}

/// One item to charge to a booking.
#[derive(Debug, Clone)]
pub struct ChargeItem {
    /// Catalog product; brings its tax rate and inventory tracking.
    pub product_id: Option<String>,

    /// Defaults to the product name when a product is given.
    pub description: Option<String>,

    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Result of an add-charges operation.
#[derive(Debug, Clone)]
pub struct ChargesReceipt {
    pub lines: Vec<ChargeLine>,
    pub charge_total: Money,
    pub new_total_amount: Money,
}

/// Result of a payment.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub amount: Money,
    pub total_paid: Money,
    pub new_balance: Money,
}

/// Discount request: percentage of the current total (basis points) or a
/// fixed amount (cents).
#[derive(Debug, Clone, Copy)]
pub enum DiscountSpec {
    Percentage(u32),
    Fixed(i64),
}

/// Result of a discount.
#[derive(Debug, Clone)]
pub struct DiscountReceipt {
    pub discount_id: String,
    pub amount: Money,
    pub new_total_amount: Money,

    /// Operator who stepped up, when the discount required it.
    pub authorized_by: Option<String>,
}

/// Result of a refund.
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: Money,
    pub total_paid: Money,
    pub new_balance: Money,
}

/// Result of a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub booking_id: String,
    pub booking_code: String,
    pub room_number: String,
    pub customer_name: String,
    pub total_amount: Money,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,

    /// Whether this stay made (or kept) the guest frequent.
    pub frequent_guest: bool,
}

/// A booking with all of its ledger lines.
#[derive(Debug, Clone)]
pub struct BookingFolio {
    pub booking: Booking,
    pub charges: Vec<ChargeLine>,
    pub payments: Vec<PaymentLine>,
    pub discounts: Vec<DiscountLine>,
    pub refunds: Vec<RefundLine>,
}

// =============================================================================
// Engine
// =============================================================================

/// The booking ledger service, scoped per call to the actor's operator.
#[derive(Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
    notifier: Arc<dyn NotificationPort>,
}

impl fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEngine").finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// Creates a new LedgerEngine.
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationPort>) -> Self {
        LedgerEngine { pool, notifier }
    }

    // -------------------------------------------------------------------------
    // create_booking (check-in)
    // -------------------------------------------------------------------------

    /// Registers a check-in: prices the stay, occupies the room and creates
    /// the booking, atomically.
    ///
    /// The availability check and the available→occupied transition are the
    /// same guarded UPDATE, so two cashiers racing for one room serialize:
    /// exactly one check-in succeeds, the other gets `RoomNotAvailable` and
    /// no booking row exists for it.
    pub async fn create_booking(&self, actor: &Actor, input: NewBooking) -> EngineResult<Booking> {
        AuthorizationGate::evaluate(actor, &LedgerAction::CreateBooking)?;

        validate_non_negative_cents("additional_income", input.additional_income_cents)?;
        if input.guests < 1 {
            return Err(ValidationError::MustBePositive { field: "guests" }.into());
        }
        if let BookingCustomer::New(guest) = &input.customer {
            validate_full_name(&guest.full_name)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // Walk-ins are registered in the same transaction as their
        // check-in: no customer row survives a failed check-in.
        let customer = match &input.customer {
            BookingCustomer::Existing(customer_id) => {
                CustomerRepository::get_tx(&mut tx, &actor.operator_id, customer_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Customer", customer_id))?
            }
            BookingCustomer::New(guest) => {
                let customer = Customer {
                    id: Uuid::new_v4().to_string(),
                    operator_id: actor.operator_id.clone(),
                    full_name: guest.full_name.clone(),
                    document_number: guest.document_number.clone(),
                    phone: guest.phone.clone(),
                    age: guest.age,
                    nationality: guest.nationality.clone(),
                    origin: guest.origin.clone(),
                    total_stays: 0,
                    total_spent_cents: 0,
                    last_stay_date: None,
                    is_frequent: false,
                    created_at: now,
                };
                CustomerRepository::create_tx(&mut tx, &customer).await?;
                customer
            }
        };

        let room = RoomRepository::get_tx(&mut tx, &actor.operator_id, &input.room_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", &input.room_id))?;

        let quote = PricingCalculator::quote(
            &room,
            &StayParams {
                stay_type: input.stay_type,
                nights: input.nights,
                additional_income: Money::from_cents(input.additional_income_cents),
            },
        )?;

        let occupied = RoomRepository::transition(
            &mut tx,
            &actor.operator_id,
            &room.id,
            RoomStatus::Available,
            RoomStatus::Occupied,
            now,
        )
        .await?;
        if !occupied {
            return Err(CoreError::RoomNotAvailable {
                room_id: room.id.clone(),
            }
            .into());
        }

        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            code: generate_booking_code(now),
            operator_id: actor.operator_id.clone(),
            cashier_id: actor.id.clone(),
            customer_id: customer.id.clone(),
            room_id: room.id.clone(),
            check_in: input.check_in.unwrap_or(now),
            expected_checkout: input.expected_checkout,
            actual_checkout: None,
            stay_type: input.stay_type,
            nights: quote.nights,
            guests: input.guests,
            base_price_cents: quote.unit_price.cents(),
            additional_income_cents: input.additional_income_cents,
            additional_charges_cents: 0,
            discounts_cents: 0,
            total_amount_cents: quote.total.cents(),
            amount_paid_cents: 0,
            status: BookingStatus::CheckedIn,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        BookingRepository::insert(&mut tx, &booking).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            booking_id = %booking.id,
            code = %booking.code,
            room_number = %room.room_number,
            customer = %customer.full_name,
            total = %booking.total_amount(),
            "Check-in registered"
        );

        Ok(booking)
    }

    // -------------------------------------------------------------------------
    // add_charges
    // -------------------------------------------------------------------------

    /// Charges items to an active booking's folio.
    ///
    /// Per item: line tax = unit_price × quantity × tax rate; the line total
    /// accumulates into the booking counters, and inventory-tracked products
    /// lose stock - all in the same transaction.
    pub async fn add_charges(
        &self,
        actor: &Actor,
        booking_id: &str,
        items: &[ChargeItem],
    ) -> EngineResult<ChargesReceipt> {
        if items.is_empty() {
            return Err(ValidationError::Empty { field: "items" }.into());
        }
        if items.len() > MAX_CHARGE_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "items",
                min: 1,
                max: MAX_CHARGE_ITEMS as i64,
            }
            .into());
        }
        for item in items {
            validate_quantity(item.quantity)?;
            validate_non_negative_cents("unit_price", item.unit_price_cents)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = BookingRepository::get_tx(&mut tx, &actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        Self::ensure_active(&booking)?;

        let mut lines = Vec::with_capacity(items.len());
        let mut charge_total = Money::zero();

        for item in items {
            let subtotal = Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity);

            // Product charges carry the product's tax rate and consume stock.
            let (tax, description) = match &item.product_id {
                Some(product_id) => {
                    let product =
                        ProductRepository::get_tx(&mut tx, &actor.operator_id, product_id)
                            .await?
                            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

                    if product.track_inventory {
                        ProductRepository::decrement_stock(
                            &mut tx,
                            &actor.operator_id,
                            product_id,
                            item.quantity,
                            now,
                        )
                        .await?;
                    }

                    let description = item
                        .description
                        .clone()
                        .unwrap_or_else(|| product.name.clone());
                    (subtotal.apply_rate(product.tax_rate()), description)
                }
                None => {
                    let description = item.description.clone().ok_or(ValidationError::Required {
                        field: "description",
                    })?;
                    (Money::zero(), description)
                }
            };

            let line = ChargeLine {
                id: Uuid::new_v4().to_string(),
                booking_id: booking.id.clone(),
                operator_id: actor.operator_id.clone(),
                cashier_id: actor.id.clone(),
                product_id: item.product_id.clone(),
                description,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                tax_cents: tax.cents(),
                total_cents: (subtotal + tax).cents(),
                created_at: now,
            };

            BookingRepository::insert_charge(&mut tx, &line).await?;
            charge_total += subtotal + tax;
            lines.push(line);
        }

        let updated = BookingRepository::add_charges_guarded(
            &mut tx,
            &actor.operator_id,
            &booking.id,
            charge_total.cents(),
            now,
        )
        .await?;
        if !updated {
            return Err(Self::not_active(&booking));
        }

        let (room, customer) = self.stay_context(&mut tx, &booking).await?;

        tx.commit().await.map_err(DbError::from)?;

        let new_total_amount = booking.total_amount() + charge_total;
        info!(
            booking_id = %booking.id,
            items = lines.len(),
            charge_total = %charge_total,
            new_total = %new_total_amount,
            "Charges added"
        );

        self.notifier.deliver(&NotificationEvent::ChargeAdded {
            booking_code: booking.code.clone(),
            room_number: room.room_number,
            customer_name: customer.full_name,
            charge_total_cents: charge_total.cents(),
            total_amount_cents: new_total_amount.cents(),
        });

        Ok(ChargesReceipt {
            lines,
            charge_total,
            new_total_amount,
        })
    }

    // -------------------------------------------------------------------------
    // apply_payment
    // -------------------------------------------------------------------------

    /// Records a payment against an active booking.
    ///
    /// `amount_paid` may never exceed `total_amount`: the payment is checked
    /// against the balance, and the counter update re-asserts the bound so a
    /// concurrent payment cannot push the booking into overpayment.
    pub async fn apply_payment(
        &self,
        actor: &Actor,
        booking_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> EngineResult<PaymentReceipt> {
        validate_amount_cents("amount", amount_cents)?;
        let amount = Money::from_cents(amount_cents);

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = BookingRepository::get_tx(&mut tx, &actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        Self::ensure_active(&booking)?;

        let balance = booking.balance();
        if amount > balance {
            return Err(CoreError::OverpaymentRejected { amount, balance }.into());
        }

        let line = PaymentLine {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            operator_id: actor.operator_id.clone(),
            cashier_id: actor.id.clone(),
            amount_cents,
            method,
            reference,
            notes: None,
            created_at: now,
        };
        BookingRepository::insert_payment(&mut tx, &line).await?;

        let updated = BookingRepository::apply_payment_guarded(
            &mut tx,
            &actor.operator_id,
            &booking.id,
            amount_cents,
            now,
        )
        .await?;
        if !updated {
            // The balance moved between the read and the update.
            return Err(CoreError::OverpaymentRejected { amount, balance }.into());
        }

        let (room, customer) = self.stay_context(&mut tx, &booking).await?;

        tx.commit().await.map_err(DbError::from)?;

        let total_paid = booking.amount_paid() + amount;
        let new_balance = balance - amount;

        info!(
            booking_id = %booking.id,
            payment_id = %line.id,
            amount = %amount,
            ?method,
            new_balance = %new_balance,
            "Payment recorded"
        );

        self.notifier.deliver(&NotificationEvent::PaymentRecorded {
            booking_code: booking.code.clone(),
            room_number: room.room_number,
            customer_name: customer.full_name,
            amount_cents,
            total_paid_cents: total_paid.cents(),
            total_amount_cents: booking.total_amount_cents,
            balance_cents: new_balance.cents(),
        });

        Ok(PaymentReceipt {
            payment_id: line.id,
            amount,
            total_paid,
            new_balance,
        })
    }

    // -------------------------------------------------------------------------
    // apply_discount
    // -------------------------------------------------------------------------

    /// Applies a discount to an active booking.
    ///
    /// Two independent, always-run checks:
    /// - percentage discounts are capped by the actor's maximum
    ///   (`ExceedsDiscountLimit`)
    /// - a discount amount above 10% of the total also needs a valid
    ///   step-up token (`AuthorizationRequired` without one)
    ///
    /// The total may never drop below what was already paid.
    pub async fn apply_discount(
        &self,
        actor: &Actor,
        booking_id: &str,
        spec: DiscountSpec,
        reason: &str,
        step_up: Option<&StepUpToken>,
    ) -> EngineResult<DiscountReceipt> {
        validate_reason(reason)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = BookingRepository::get_tx(&mut tx, &actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        Self::ensure_active(&booking)?;

        let total = booking.total_amount();
        let (kind, value, percent_bps, amount) = match spec {
            DiscountSpec::Percentage(bps) => {
                validate_rate_bps("discount_value", bps)?;
                let amount = total.apply_rate(RateBps::from_bps(bps));
                (DiscountKind::Percentage, bps as i64, Some(bps), amount)
            }
            DiscountSpec::Fixed(cents) => {
                validate_amount_cents("discount_value", cents)?;
                (DiscountKind::Fixed, cents, None, Money::from_cents(cents))
            }
        };
        validate_amount_cents("discount_amount", amount.cents())?;

        let requirement = AuthorizationGate::evaluate(
            actor,
            &LedgerAction::ApplyDiscount {
                percent_bps,
                amount,
                booking_total: total,
            },
        )?;

        let authorized_by = match requirement {
            Requirement::None => None,
            Requirement::StepUp => {
                let token = step_up.ok_or(CoreError::AuthorizationRequired {
                    action: "Discount above threshold",
                })?;
                token.validate(&actor.operator_id, now)?;
                Some(token.authorized_by.clone())
            }
        };

        let new_total = total - amount;
        if new_total < booking.amount_paid() {
            return Err(CoreError::ResultingNegativeBalance {
                discount: amount,
                new_total,
                paid: booking.amount_paid(),
            }
            .into());
        }

        let line = DiscountLine {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            operator_id: actor.operator_id.clone(),
            cashier_id: actor.id.clone(),
            authorized_by: authorized_by.clone(),
            kind,
            value,
            amount_cents: amount.cents(),
            reason: reason.to_string(),
            requires_authorization: requirement == Requirement::StepUp,
            created_at: now,
        };
        BookingRepository::insert_discount(&mut tx, &line).await?;

        let updated = BookingRepository::apply_discount_guarded(
            &mut tx,
            &actor.operator_id,
            &booking.id,
            amount.cents(),
            now,
        )
        .await?;
        if !updated {
            return Err(CoreError::ResultingNegativeBalance {
                discount: amount,
                new_total,
                paid: booking.amount_paid(),
            }
            .into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            booking_id = %booking.id,
            discount_id = %line.id,
            amount = %amount,
            authorized = authorized_by.is_some(),
            new_total = %new_total,
            "Discount applied"
        );

        Ok(DiscountReceipt {
            discount_id: line.id,
            amount,
            new_total_amount: new_total,
            authorized_by,
        })
    }

    // -------------------------------------------------------------------------
    // refund
    // -------------------------------------------------------------------------

    /// Refunds previously paid money. Refunds are higher-risk than
    /// discounts: a valid step-up token is required in every case, so the
    /// signature demands one.
    pub async fn refund(
        &self,
        actor: &Actor,
        booking_id: &str,
        amount_cents: i64,
        reason: &str,
        payment_id: Option<String>,
        step_up: &StepUpToken,
    ) -> EngineResult<RefundReceipt> {
        validate_amount_cents("amount", amount_cents)?;
        validate_reason(reason)?;
        let amount = Money::from_cents(amount_cents);

        // Capability check; the gate answers StepUp for every refund.
        AuthorizationGate::evaluate(actor, &LedgerAction::ProcessRefund)?;

        let now = Utc::now();
        step_up.validate(&actor.operator_id, now)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = BookingRepository::get_tx(&mut tx, &actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
        Self::ensure_active(&booking)?;

        let paid = booking.amount_paid();
        if amount > paid {
            return Err(CoreError::RefundExceedsPaid { amount, paid }.into());
        }

        let line = RefundLine {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            operator_id: actor.operator_id.clone(),
            cashier_id: actor.id.clone(),
            authorized_by: step_up.authorized_by.clone(),
            payment_id,
            amount_cents,
            reason: reason.to_string(),
            notes: None,
            created_at: now,
        };
        BookingRepository::insert_refund(&mut tx, &line).await?;

        let updated = BookingRepository::apply_refund_guarded(
            &mut tx,
            &actor.operator_id,
            &booking.id,
            amount_cents,
            now,
        )
        .await?;
        if !updated {
            return Err(CoreError::RefundExceedsPaid { amount, paid }.into());
        }

        tx.commit().await.map_err(DbError::from)?;

        let total_paid = paid - amount;
        let new_balance = booking.total_amount() - total_paid;

        info!(
            booking_id = %booking.id,
            refund_id = %line.id,
            amount = %amount,
            authorized_by = %line.authorized_by,
            "Refund recorded"
        );

        Ok(RefundReceipt {
            refund_id: line.id,
            amount,
            total_paid,
            new_balance,
        })
    }

    // -------------------------------------------------------------------------
    // checkout
    // -------------------------------------------------------------------------

    /// Settles and finishes a stay.
    ///
    /// Requires a zero balance - checkout never leaves a dangling
    /// receivable. Transitions the booking to checked_out, releases the
    /// room, and folds the stay into the customer's aggregates, all in one
    /// transaction. Emits the guest-facing checkout event plus the
    /// operator's audit summary.
    pub async fn checkout(&self, actor: &Actor, booking_id: &str) -> EngineResult<CheckoutSummary> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = BookingRepository::get_tx(&mut tx, &actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;

        // A second checkout lands here: the booking is already
        // checked_out, and nothing below runs (no double room release).
        if booking.status != BookingStatus::CheckedIn {
            return Err(Self::not_active(&booking));
        }

        let pending = booking.balance();
        if !pending.is_zero() {
            return Err(CoreError::BalanceNotSettled { pending }.into());
        }

        let checked_out =
            BookingRepository::checkout_guarded(&mut tx, &actor.operator_id, &booking.id, now)
                .await?;
        if !checked_out {
            return Err(Self::not_active(&booking));
        }

        let room = RoomRepository::get_tx(&mut tx, &actor.operator_id, &booking.room_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", &booking.room_id))?;

        let released = RoomRepository::transition(
            &mut tx,
            &actor.operator_id,
            &room.id,
            RoomStatus::Occupied,
            RoomStatus::Available,
            now,
        )
        .await?;
        if !released {
            // The room is not occupied even though its booking was checked
            // in. Abort rather than check out a stay whose room state is
            // inconsistent.
            return Err(CoreError::InvalidTransition {
                room_id: room.id.clone(),
                status: format!("{:?}", room.status).to_lowercase(),
                attempted: "release",
            }
            .into());
        }

        let customer = CustomerRepository::get_tx(&mut tx, &actor.operator_id, &booking.customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", &booking.customer_id))?;

        let recorded = CustomerRepository::record_stay(
            &mut tx,
            &actor.operator_id,
            &customer.id,
            booking.amount_paid_cents,
            now,
        )
        .await?;
        if !recorded {
            return Err(CoreError::not_found("Customer", &booking.customer_id).into());
        }

        let charges = BookingRepository::charges_for_tx(&mut tx, &booking.id).await?;

        tx.commit().await.map_err(DbError::from)?;

        let frequent_guest = customer.total_stays + 1 >= FREQUENT_GUEST_STAYS;

        info!(
            booking_id = %booking.id,
            code = %booking.code,
            room_number = %room.room_number,
            total = %booking.total_amount(),
            frequent_guest,
            "Check-out completed"
        );

        self.notifier.deliver(&NotificationEvent::CheckoutCompleted {
            booking_code: booking.code.clone(),
            room_number: room.room_number.clone(),
            customer_name: customer.full_name.clone(),
            total_amount_cents: booking.total_amount_cents,
            check_in: booking.check_in,
            check_out: now,
        });

        self.notifier
            .deliver(&NotificationEvent::OperatorCheckoutSummary {
                booking_code: booking.code.clone(),
                room_number: room.room_number.clone(),
                customer_name: customer.full_name.clone(),
                document_number: customer.document_number.clone(),
                age: customer.age,
                nationality: customer.nationality.clone(),
                origin: customer.origin.clone(),
                total_amount_cents: booking.total_amount_cents,
                check_in: booking.check_in,
                check_out: now,
                charges: charges
                    .iter()
                    .map(|c| ChargeSummaryLine {
                        description: c.description.clone(),
                        quantity: c.quantity,
                        total_cents: c.total_cents,
                    })
                    .collect(),
            });

        Ok(CheckoutSummary {
            booking_id: booking.id,
            booking_code: booking.code,
            room_number: room.room_number,
            customer_name: customer.full_name,
            total_amount: Money::from_cents(booking.total_amount_cents),
            check_in: booking.check_in,
            check_out: now,
            frequent_guest,
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// A booking with its complete ledger.
    pub async fn folio(&self, actor: &Actor, booking_id: &str) -> EngineResult<BookingFolio> {
        let repo = BookingRepository::new(self.pool.clone());

        let booking = repo
            .get(&actor.operator_id, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;

        let charges = repo.charges_for(booking_id).await?;
        let payments = repo.payments_for(booking_id).await?;
        let discounts = repo.discounts_for(booking_id).await?;
        let refunds = repo.refunds_for(booking_id).await?;

        Ok(BookingFolio {
            booking,
            charges,
            payments,
            discounts,
            refunds,
        })
    }

    /// Active bookings (reserved or checked in) for the front desk board.
    pub async fn active_bookings(&self, actor: &Actor) -> EngineResult<Vec<Booking>> {
        Ok(BookingRepository::new(self.pool.clone())
            .active(&actor.operator_id)
            .await?)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn ensure_active(booking: &Booking) -> Result<(), crate::service::EngineError> {
        if booking.status.is_active() {
            Ok(())
        } else {
            Err(Self::not_active(booking))
        }
    }

    fn not_active(booking: &Booking) -> crate::service::EngineError {
        CoreError::BookingNotActive {
            booking_id: booking.id.clone(),
            status: format!("{:?}", booking.status).to_lowercase(),
        }
        .into()
    }

    /// Room + customer for a booking, read inside the operation's
    /// transaction (notification payloads need both).
    async fn stay_context(
        &self,
        tx: &mut sqlx::SqliteConnection,
        booking: &Booking,
    ) -> EngineResult<(Room, Customer)> {
        let room = RoomRepository::get_tx(tx, &booking.operator_id, &booking.room_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", &booking.room_id))?;
        let customer = CustomerRepository::get_tx(tx, &booking.operator_id, &booking.customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", &booking.customer_id))?;
        Ok((room, customer))
    }
}

/// Generates a booking code: date-stamped, human-quotable, unique.
fn generate_booking_code(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("BK{}-{}", now.format("%y%m%d"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::reconciler::ReviewAction;
    use crate::testutil::{
        assert_ledger_consistent, cashier_actor, seed_customer, seed_operator, seed_product,
        seed_room, seed_room_with_tariffs, test_db, test_db_with_events, OPERATOR_PASSWORD,
    };
    use chrono::Duration;
    use posada_core::Capabilities;

    fn daily_booking(customer_id: &str, room_id: &str, nights: i64) -> NewBooking {
        NewBooking {
            customer: BookingCustomer::Existing(customer_id.to_string()),
            room_id: room_id.to_string(),
            stay_type: StayType::Daily,
            nights,
            guests: 1,
            check_in: None,
            expected_checkout: None,
            additional_income_cents: 0,
            notes: None,
        }
    }

    fn charge(product_id: Option<&str>, description: Option<&str>, qty: i64, unit: i64) -> ChargeItem {
        ChargeItem {
            product_id: product_id.map(str::to_string),
            description: description.map(str::to_string),
            quantity: qty,
            unit_price_cents: unit,
        }
    }

    // -------------------------------------------------------------------------
    // Check-in
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_in_prices_daily_stay() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let booking = db
            .ledger()
            .create_booking(
                &actor,
                NewBooking {
                    additional_income_cents: 1_500,
                    ..daily_booking(&guest.id, &room.id, 2)
                },
            )
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::CheckedIn);
        assert_eq!(booking.base_price_cents, 10_000);
        assert_eq!(booking.nights, 2);
        assert_eq!(booking.total_amount_cents, 21_500);
        assert_eq!(booking.amount_paid_cents, 0);
        assert!(booking.code.starts_with("BK"));

        let room = db.rooms().get(&op.id, &room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);

        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    #[tokio::test]
    async fn test_check_in_uses_short_stay_tariff() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room_with_tariffs(&db, &op.id, "101", 10_000, Some(4_000), Some(6_000)).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let booking = db
            .ledger()
            .create_booking(
                &actor,
                NewBooking {
                    stay_type: StayType::ThreeHours,
                    nights: 7, // ignored for short stays
                    ..daily_booking(&guest.id, &room.id, 7)
                },
            )
            .await
            .unwrap();

        assert_eq!(booking.nights, 1);
        assert_eq!(booking.total_amount_cents, 4_000);
    }

    #[tokio::test]
    async fn test_check_in_fails_on_occupied_room_without_orphan() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let err = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::RoomNotAvailable { .. })
        ));

        // No orphaned booking from the failed attempt.
        let active = ledger.active_bookings(&actor).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_walk_in_guest_registers_with_check_in() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let busy_room = seed_room(&db, &op.id, "102", 10_000).await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let walk_in = |name: &str, room_id: &str| NewBooking {
            customer: BookingCustomer::New(NewGuest {
                full_name: name.to_string(),
                document_number: Some("9876543".into()),
                phone: None,
                age: Some(41),
                nationality: Some("Perú".into()),
                origin: Some("Cusco".into()),
            }),
            room_id: room_id.to_string(),
            stay_type: StayType::Daily,
            nights: 1,
            guests: 1,
            check_in: None,
            expected_checkout: None,
            additional_income_cents: 0,
            notes: None,
        };

        let booking = db
            .ledger()
            .create_booking(&actor, walk_in("Carla Rojas", &room.id))
            .await
            .unwrap();

        let guest = db
            .customers()
            .get(&op.id, &booking.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guest.full_name, "Carla Rojas");
        assert_eq!(guest.total_stays, 0);

        // A failed check-in (room taken) must not leave the walk-in's
        // customer row behind.
        db.registry()
            .occupy(&Actor::operator(&op.id, &op.id), &busy_room.id)
            .await
            .unwrap();
        db.ledger()
            .create_booking(&actor, walk_in("Nadie Persiste", &busy_room.id))
            .await
            .unwrap_err();

        let ghosts = db.customers().search(&op.id, "Nadie", 10).await.unwrap();
        assert!(ghosts.is_empty());
    }

    #[tokio::test]
    async fn test_check_in_requires_capability() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::none());

        let err = db
            .ledger()
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::MissingCapability { .. })
        ));

        // The room was never touched.
        let room = db.rooms().get(&op.id, &room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Available);
    }

    #[tokio::test]
    async fn test_concurrent_check_ins_single_winner() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let db = db.clone();
            let op_id = op.id.clone();
            let guest_id = guest.id.clone();
            let room_id = room.id.clone();
            handles.push(tokio::spawn(async move {
                let actor = cashier_actor(&op_id, Capabilities::all());
                db.ledger()
                    .create_booking(&actor, daily_booking(&guest_id, &room_id, 1))
                    .await
            }));
        }

        let mut wins = 0;
        let mut not_available = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(err) => {
                    assert!(matches!(
                        err.domain(),
                        Some(CoreError::RoomNotAvailable { .. })
                    ));
                    not_available += 1;
                }
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(not_available, 5);
    }

    // -------------------------------------------------------------------------
    // Charges
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_charges_with_product_tax_and_stock() {
        let (db, events) = test_db_with_events().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let cola = seed_product(&db, &op.id, "Coca-Cola 500ml", 2_000, 1_000, true, 12).await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let receipt = ledger
            .add_charges(&actor, &booking.id, &[charge(Some(&cola.id), None, 1, 2_000)])
            .await
            .unwrap();

        // Bs 20.00 + 10% tax = Bs 22.00.
        assert_eq!(receipt.charge_total.cents(), 2_200);
        assert_eq!(receipt.new_total_amount.cents(), 12_200);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].description, "Coca-Cola 500ml");
        assert_eq!(receipt.lines[0].tax_cents, 200);

        let cola = db.products().get(&op.id, &cola.id).await.unwrap().unwrap();
        assert_eq!(cola.stock_quantity, 11);

        assert_eq!(events.event_names(), vec!["charge_added"]);
        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    #[tokio::test]
    async fn test_ad_hoc_charge_needs_description() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let err = ledger
            .add_charges(&actor, &booking.id, &[charge(None, None, 1, 500)])
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Validation(_))));

        // Ad-hoc charges with a description carry no tax.
        let receipt = ledger
            .add_charges(&actor, &booking.id, &[charge(None, Some("Late checkout"), 1, 500)])
            .await
            .unwrap();
        assert_eq!(receipt.lines[0].tax_cents, 0);
        assert_eq!(receipt.charge_total.cents(), 500);
    }

    #[tokio::test]
    async fn test_add_charges_requires_active_booking() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger.checkout(&actor, &booking.id).await.unwrap();

        let err = ledger
            .add_charges(&actor, &booking.id, &[charge(None, Some("Soda"), 1, 500)])
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::BookingNotActive { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_payment_flow_and_overpayment() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let receipt = ledger
            .apply_payment(&actor, &booking.id, 4_000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert_eq!(receipt.new_balance.cents(), 6_000);
        assert_ledger_consistent(&db, &op.id, &booking.id).await;

        // Paying Bs 150.00 against a Bs 60.00 balance is rejected...
        let err = ledger
            .apply_payment(&actor, &booking.id, 15_000, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        match err.domain() {
            Some(CoreError::OverpaymentRejected { amount, balance }) => {
                assert_eq!(amount.cents(), 15_000);
                assert_eq!(balance.cents(), 6_000);
            }
            other => panic!("expected OverpaymentRejected, got {:?}", other),
        }

        // ...and leaves no trace: neither a payment line nor a counter bump.
        assert_ledger_consistent(&db, &op.id, &booking.id).await;
        let folio = ledger.folio(&actor, &booking.id).await.unwrap();
        assert_eq!(folio.payments.len(), 1);
        assert_eq!(folio.booking.amount_paid_cents, 4_000);

        let receipt = ledger
            .apply_payment(&actor, &booking.id, 6_000, PaymentMethod::Card, None)
            .await
            .unwrap();
        assert!(receipt.new_balance.is_zero());
    }

    #[tokio::test]
    async fn test_payment_rejects_nonpositive_amount() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        for amount in [0, -500] {
            let err = ledger
                .apply_payment(&actor, &booking.id, amount, PaymentMethod::Cash, None)
                .await
                .unwrap_err();
            assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
        }
    }

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_discount_over_cashier_cap() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(
            &op.id,
            Capabilities {
                can_create_bookings: true,
                can_apply_discounts: true,
                max_discount_bps: 1_000, // 10%
                ..Capabilities::none()
            },
        );

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let err = ledger
            .apply_discount(
                &actor,
                &booking.id,
                DiscountSpec::Percentage(2_500),
                "friend of the owner",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::ExceedsDiscountLimit {
                requested_bps: 2_500,
                max_bps: 1_000
            })
        ));

        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    #[tokio::test]
    async fn test_large_discount_step_up_flow() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(
            &op.id,
            Capabilities {
                can_create_bookings: true,
                can_apply_discounts: true,
                max_discount_bps: 5_000,
                ..Capabilities::none()
            },
        );

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        // 20% is within the cashier's cap but above the 10% threshold.
        let err = ledger
            .apply_discount(
                &actor,
                &booking.id,
                DiscountSpec::Percentage(2_000),
                "overbooked, compensation",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::AuthorizationRequired { .. })
        ));

        // With the operator's step-up token it goes through.
        let token = db.step_up().authorize(&op.id, OPERATOR_PASSWORD).await.unwrap();
        let receipt = ledger
            .apply_discount(
                &actor,
                &booking.id,
                DiscountSpec::Percentage(2_000),
                "overbooked, compensation",
                Some(&token),
            )
            .await
            .unwrap();

        assert_eq!(receipt.amount.cents(), 2_000);
        assert_eq!(receipt.new_total_amount.cents(), 8_000);
        assert_eq!(receipt.authorized_by.as_deref(), Some(op.id.as_str()));

        let folio = ledger.folio(&actor, &booking.id).await.unwrap();
        assert!(folio.discounts[0].requires_authorization);
        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    #[tokio::test]
    async fn test_discount_rejects_expired_token() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let stale = StepUpToken {
            authorized_by: op.id.clone(),
            operator_id: op.id.clone(),
            issued_at: Utc::now() - Duration::seconds(900),
            expires_at: Utc::now() - Duration::seconds(600),
        };

        let err = ledger
            .apply_discount(
                &actor,
                &booking.id,
                DiscountSpec::Fixed(5_000),
                "stale token",
                Some(&stale),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::StepUpInvalid)));
    }

    #[tokio::test]
    async fn test_discount_cannot_invert_balance() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 9_500, PaymentMethod::Cash, None)
            .await
            .unwrap();

        // Bs 100.00 total, Bs 95.00 paid: a Bs 8.00 discount would leave
        // total (92) below paid (95).
        let token = db.step_up().authorize(&op.id, OPERATOR_PASSWORD).await.unwrap();
        let err = ledger
            .apply_discount(
                &actor,
                &booking.id,
                DiscountSpec::Fixed(800),
                "too late for this one",
                Some(&token),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::ResultingNegativeBalance { .. })
        ));

        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    // -------------------------------------------------------------------------
    // Refunds
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_refund_flow() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(
            &op.id,
            Capabilities {
                can_create_bookings: true,
                can_process_refunds: true,
                ..Capabilities::none()
            },
        );

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        let payment = ledger
            .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let token = db.step_up().authorize(&op.id, OPERATOR_PASSWORD).await.unwrap();

        // Refunding more than was paid is rejected.
        let err = ledger
            .refund(&actor, &booking.id, 12_000, "guest left early", None, &token)
            .await
            .unwrap_err();
        match err.domain() {
            Some(CoreError::RefundExceedsPaid { amount, paid }) => {
                assert_eq!(amount.cents(), 12_000);
                assert_eq!(paid.cents(), 10_000);
            }
            other => panic!("expected RefundExceedsPaid, got {:?}", other),
        }

        let receipt = ledger
            .refund(
                &actor,
                &booking.id,
                3_000,
                "guest left early",
                Some(payment.payment_id.clone()),
                &token,
            )
            .await
            .unwrap();
        assert_eq!(receipt.total_paid.cents(), 7_000);
        assert_eq!(receipt.new_balance.cents(), 3_000);

        let folio = ledger.folio(&actor, &booking.id).await.unwrap();
        assert_eq!(folio.refunds.len(), 1);
        assert_eq!(folio.refunds[0].authorized_by, op.id);
        assert_ledger_consistent(&db, &op.id, &booking.id).await;
    }

    #[tokio::test]
    async fn test_refund_requires_capability() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let creator = cashier_actor(&op.id, Capabilities::all());
        let actor = cashier_actor(
            &op.id,
            Capabilities {
                can_create_bookings: true,
                ..Capabilities::none()
            },
        );

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&creator, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&creator, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let token = db.step_up().authorize(&op.id, OPERATOR_PASSWORD).await.unwrap();
        let err = ledger
            .refund(&actor, &booking.id, 1_000, "no capability", None, &token)
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::MissingCapability { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_requires_settled_balance() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 7_800, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let err = ledger.checkout(&actor, &booking.id).await.unwrap_err();
        match err.domain() {
            Some(CoreError::BalanceNotSettled { pending }) => {
                assert_eq!(pending.cents(), 2_200);
            }
            other => panic!("expected BalanceNotSettled, got {:?}", other),
        }

        // Still checked in, room still occupied.
        let room = db.rooms().get(&op.id, &room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);
    }

    #[tokio::test]
    async fn test_checkout_is_idempotent_safe() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger.checkout(&actor, &booking.id).await.unwrap();

        // Another guest takes the room.
        let second_guest = seed_customer(&db, &op.id, "Luis Mamani").await;
        ledger
            .create_booking(&actor, daily_booking(&second_guest.id, &room.id, 1))
            .await
            .unwrap();

        // Re-checking-out the finished stay must fail and must NOT release
        // the room under the new guest.
        let err = ledger.checkout(&actor, &booking.id).await.unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::BookingNotActive { .. })
        ));

        let room = db.rooms().get(&op.id, &room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);
    }

    #[tokio::test]
    async fn test_checkout_updates_customer_aggregates() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        for stay in 1..=3 {
            let booking = ledger
                .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
                .await
                .unwrap();
            ledger
                .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
                .await
                .unwrap();
            let summary = ledger.checkout(&actor, &booking.id).await.unwrap();

            let customer = db.customers().get(&op.id, &guest.id).await.unwrap().unwrap();
            assert_eq!(customer.total_stays, stay);
            assert_eq!(customer.total_spent_cents, 10_000 * stay);
            // Frequent from the third completed stay on.
            assert_eq!(customer.is_frequent, stay >= 3);
            assert_eq!(summary.frequent_guest, stay >= 3);
        }
    }

    #[tokio::test]
    async fn test_checkout_emits_guest_and_operator_events() {
        let (db, events) = test_db_with_events().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger.checkout(&actor, &booking.id).await.unwrap();

        assert_eq!(
            events.event_names(),
            vec![
                "payment_recorded",
                "checkout_completed",
                "operator_checkout_summary"
            ]
        );
    }

    #[tokio::test]
    async fn test_cross_tenant_booking_is_not_found() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let other = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let booking = db
            .ledger()
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        let outsider = cashier_actor(&other.id, Capabilities::all());
        let err = db
            .ledger()
            .apply_payment(&outsider, &booking.id, 1_000, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::NotFound { .. })));
    }

    // -------------------------------------------------------------------------
    // Full front-desk day
    // -------------------------------------------------------------------------

    /// Room 101 at Bs 100.00, drawer opened with Bs 50.00: check-in, one
    /// taxed minibar charge, full cash payment, checkout, drawer close with
    /// a perfect count.
    #[tokio::test]
    async fn test_full_day_reconciles_to_zero_variance() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "R101", 10_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let snack = seed_product(&db, &op.id, "Snack", 2_000, 1_000, false, 0).await;
        let actor = cashier_actor(&op.id, Capabilities::all());
        let operator = Actor::operator(&op.id, &op.id);

        let ledger = db.ledger();
        let reconciler = db.reconciler();

        reconciler.open(&actor, 5_000).await.unwrap();

        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        assert_eq!(booking.total_amount_cents, 10_000);

        let charges = ledger
            .add_charges(&actor, &booking.id, &[charge(Some(&snack.id), None, 1, 2_000)])
            .await
            .unwrap();
        assert_eq!(charges.new_total_amount.cents(), 12_200);

        let payment = ledger
            .apply_payment(&actor, &booking.id, 12_200, PaymentMethod::Cash, None)
            .await
            .unwrap();
        assert!(payment.new_balance.is_zero());
        assert_ledger_consistent(&db, &op.id, &booking.id).await;

        ledger.checkout(&actor, &booking.id).await.unwrap();

        let summary = reconciler.current_summary(&actor).await.unwrap();
        assert_eq!(summary.totals.cash_cents, 12_200);
        assert_eq!(summary.expected_cash_cents, 17_200);
        assert_eq!(summary.total_collected_cents, 12_200);
        assert_eq!(summary.totals.transactions, 1);

        let close = reconciler.close(&actor, 17_200, None).await.unwrap();
        assert_eq!(close.expected_cash_cents, 17_200);
        assert_eq!(close.variance_cents, 0);

        let reviewed = reconciler
            .review(&operator, &close.shift_id, ReviewAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, posada_core::ShiftStatus::Approved);
    }

    /// Mixed payment methods: only cash lands in the drawer, everything
    /// counts toward total_collected.
    #[tokio::test]
    async fn test_reconciliation_with_mixed_methods() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 30_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let actor = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let reconciler = db.reconciler();

        reconciler.open(&actor, 10_000).await.unwrap();

        let booking = ledger
            .create_booking(&actor, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 15_000, PaymentMethod::Card, None)
            .await
            .unwrap();
        ledger
            .apply_payment(&actor, &booking.id, 5_000, PaymentMethod::Transfer, None)
            .await
            .unwrap();

        let summary = reconciler.current_summary(&actor).await.unwrap();
        assert_eq!(summary.totals.cash_cents, 10_000);
        assert_eq!(summary.totals.card_cents, 15_000);
        assert_eq!(summary.totals.transfer_cents, 5_000);
        assert_eq!(summary.expected_cash_cents, 20_000);
        assert_eq!(summary.total_collected_cents, 30_000);

        // Declared drawer Bs 195.00 against expected Bs 200.00.
        let close = reconciler.close(&actor, 19_500, Some("missing change")).await.unwrap();
        assert_eq!(close.variance_cents, -500);
    }

    /// Payments recorded before the drawer opened, or by a colleague, are
    /// attributed to other shifts.
    #[tokio::test]
    async fn test_reconciliation_attribution_window() {
        let db = test_db().await;
        let op = seed_operator(&db).await;
        let room = seed_room(&db, &op.id, "101", 50_000).await;
        let guest = seed_customer(&db, &op.id, "Ana Quispe").await;
        let cashier = cashier_actor(&op.id, Capabilities::all());
        let colleague = cashier_actor(&op.id, Capabilities::all());

        let ledger = db.ledger();
        let reconciler = db.reconciler();

        let booking = ledger
            .create_booking(&cashier, daily_booking(&guest.id, &room.id, 1))
            .await
            .unwrap();

        // Taken by this cashier BEFORE their drawer opens: belongs to the
        // previous (unopened) session, not this one.
        ledger
            .apply_payment(&cashier, &booking.id, 10_000, PaymentMethod::Cash, None)
            .await
            .unwrap();

        reconciler.open(&cashier, 0).await.unwrap();

        ledger
            .apply_payment(&cashier, &booking.id, 20_000, PaymentMethod::Cash, None)
            .await
            .unwrap();

        // A colleague's payment inside the window is theirs, not ours.
        ledger
            .apply_payment(&colleague, &booking.id, 5_000, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let summary = reconciler.current_summary(&cashier).await.unwrap();
        assert_eq!(summary.totals.cash_cents, 20_000);
        assert_eq!(summary.expected_cash_cents, 20_000);
    }
}
