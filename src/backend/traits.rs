// Collaborator interface consumed by the checkout controller

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::BackendError;
use crate::checkout::types::{Customer, CustomerDraft, Device, DeviceDraft, OrderDraft};

/// Remote POS API as seen by the checkout workflow
///
/// Implementations must be cheap to share (`Arc<dyn PosBackend>`); the
/// debounced customer search calls into them from a spawned task.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PosBackend: Send + Sync {
    /// Search customers by normalised phone number. The raw payload is
    /// returned because the endpoint wraps its list in several different
    /// envelopes; decoding is the caller's job.
    async fn search_customers(&self, phone: &str, limit: u32) -> Result<Value, BackendError>;

    /// Create a customer record and return it with its id
    async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, BackendError>;

    /// Devices already registered for a customer
    async fn get_customer_devices(&self, customer_id: &str) -> Result<Vec<Device>, BackendError>;

    async fn create_device(&self, draft: &DeviceDraft) -> Result<Device, BackendError>;

    /// Commit the sale. The response carries at least `status`, and on
    /// success `saleId` and `saleNumber`.
    async fn complete_payment(&self, order: &OrderDraft) -> Result<Value, BackendError>;
}
