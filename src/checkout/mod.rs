//! Checkout workflow core.
//!
//! `CheckoutController` owns one sale from an opened cart to a committed (or
//! abandoned) order. Step rules live in `state_machine`, arithmetic in
//! `pricing`, and everything remote goes through `crate::backend::PosBackend`.

pub mod controller;
pub mod debounce;
pub mod envelope;
pub mod errors;
pub mod phone;
pub mod pricing;
pub mod session;
pub mod state_machine;
pub mod types;


pub use controller::{CheckoutController, CustomerSearch};
pub use debounce::{Debouncer, Ticket};
pub use envelope::decode_customer_list;
pub use errors::{CheckoutError, ValidationError};
pub use phone::{is_valid_phone, normalize_phone, validated_phone};
pub use session::{CardNumberInput, CheckoutSession, PaymentForm};
pub use state_machine::{CheckoutEvent, CheckoutFlow, CheckoutMachine};
pub use types::*;
