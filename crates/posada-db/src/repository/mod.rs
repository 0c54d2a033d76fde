//! # Repository Module
//!
//! Database repositories for each entity family.
//!
//! ## Conventions
//! - Pool-based methods (`&self`) serve reads and single-statement writes.
//! - Methods that must participate in a service transaction are associated
//!   functions taking `&mut SqliteConnection`, so the service controls the
//!   transaction boundary.
//! - Guarded mutations (`UPDATE ... WHERE <precondition>`) return `bool`:
//!   `false` means the precondition did not hold at execution time - either
//!   a plain state conflict or a lost race. The service maps that to the
//!   right domain error.
//! - Every query filters by `operator_id`; a row from another tenant is
//!   indistinguishable from a missing row.

pub mod booking;
pub mod customer;
pub mod operator;
pub mod product;
pub mod room;
pub mod shift;

pub use booking::BookingRepository;
pub use customer::CustomerRepository;
pub use operator::OperatorRepository;
pub use product::ProductRepository;
pub use room::RoomRepository;
pub use shift::ShiftRepository;
