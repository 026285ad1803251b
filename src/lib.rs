// POS checkout library: workflow core, POS API client and ambient plumbing
// This exposes the core components for the CLI, testing and integration

pub mod backend;
pub mod checkout;
pub mod cli;
pub mod config;
pub mod observability;
pub mod telemetry;

// Re-export key types for easy access
pub use backend::{BackendError, HttpPosBackend, PosBackend};
pub use checkout::{
    CartLine, CheckoutController, CheckoutError, CheckoutReceipt, CheckoutStep, Customer,
    CustomerDraft, CustomerSearch, Device, DeviceInfo, DeviceType, DiscountType, OrderDraft,
    PaymentMethod, PaymentQuote, ValidationError,
};
pub use config::{CheckoutConfig, PosCheckoutConfig};
pub use observability::{api_metrics, ApiMetrics, OperationTimer};
pub use telemetry::{create_checkout_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
