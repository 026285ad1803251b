use thiserror::Error;

use crate::backend::BackendError;
use crate::checkout::types::CheckoutStep;

/// Guard failures. These block a transition and leave the workflow where it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Customer name is required")]
    CustomerNameRequired,
    #[error("Select or register the customer first")]
    CustomerNotSelected,
    #[error("Invalid phone number format: {phone}")]
    InvalidPhone { phone: String },
    #[error("Device count must be between 1 and {max}, got {count}")]
    DeviceCountOutOfRange { count: u32, max: u32 },
    #[error("Device brand is required")]
    DeviceBrandRequired,
    #[error("Device model is required")]
    DeviceModelRequired,
    #[error("Please select a payment method")]
    PaymentMethodRequired,
    #[error("Please enter a valid cash amount")]
    InvalidCashAmount,
    #[error("Cash received ({received:.2}) is less than the amount due ({due:.2})")]
    InsufficientCash { received: f64, due: f64 },
    #[error("Card number must have at least 16 digits, got {digits}")]
    CardNumberTooShort { digits: usize },
    #[error("Discount must be a non-negative amount, got {value}")]
    InvalidDiscount { value: f64 },
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A payment is already being processed")]
    Busy,
    #[error("Cannot {action} while at step {step}")]
    InvalidStep {
        step: CheckoutStep,
        action: &'static str,
    },
    #[error("Backend call failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Payment was not accepted: {message}")]
    PaymentRejected { message: String },
}

impl CheckoutError {
    /// True when the operator can fix the input and try again on the same step
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CheckoutError::InvalidStep { .. })
    }
}
