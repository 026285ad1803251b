// Mutable checkout session: the order being assembled plus the payment form

use chrono::{DateTime, SecondsFormat, Utc};

use crate::checkout::errors::ValidationError;
use crate::checkout::pricing::{self, Settlement};
use crate::checkout::types::*;

/// Raw card number as typed. Never printed; wiped once the payment guard passes.
#[derive(Clone, Default, PartialEq)]
pub struct CardNumberInput(String);

impl CardNumberInput {
    pub fn set(&mut self, raw: &str) {
        self.0 = raw.to_string();
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CardNumberInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = pricing::card_digits(&self.0);
        write!(f, "CardNumberInput(****{})", pricing::last_four(&digits))
    }
}

/// Payment step form fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentForm {
    pub method: Option<PaymentMethod>,
    pub cash_received: String,
    pub card_number: CardNumberInput,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub discount_reason: Option<String>,
}

/// Everything the workflow has collected so far
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    pub(crate) customer: CustomerInfo,
    pub(crate) devices: Vec<DeviceInfo>,
    pub(crate) device_count: u32,
    pub(crate) known_devices: Vec<DeviceInfo>,
    pub(crate) items: Vec<CartLine>,
    pub(crate) payment: PaymentForm,
    pub(crate) pending_order: Option<OrderDraft>,
    pub(crate) rejection: Option<ValidationError>,
}

impl CheckoutSession {
    pub fn new(items: Vec<CartLine>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Devices already registered for the selected customer
    pub fn known_devices(&self) -> &[DeviceInfo] {
        &self.known_devices
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn payment(&self) -> &PaymentForm {
        &self.payment
    }

    pub fn pending_order(&self) -> Option<&OrderDraft> {
        self.pending_order.as_ref()
    }

    pub fn cart_total(&self) -> f64 {
        pricing::cart_total(&self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.customer == CustomerInfo::default()
            && self.devices.is_empty()
            && self.device_count == 0
            && self.known_devices.is_empty()
            && self.items.is_empty()
            && self.payment == PaymentForm::default()
            && self.pending_order.is_none()
    }

    /// Record a guard failure for the caller to pick up
    pub(crate) fn reject(&mut self, error: ValidationError) {
        tracing::debug!(error = %error, "Checkout guard rejected transition");
        self.rejection = Some(error);
    }

    pub(crate) fn take_rejection(&mut self) -> Option<ValidationError> {
        self.rejection.take()
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn validate_customer(&self) -> Result<(), ValidationError> {
        if self.customer.name.trim().is_empty() {
            return Err(ValidationError::CustomerNameRequired);
        }
        Ok(())
    }

    /// Apply the payment guards and freeze the order. The raw card input is
    /// wiped on success so only the last four digits outlive this call.
    pub(crate) fn settle_payment(&mut self, now: DateTime<Utc>) -> Result<OrderDraft, ValidationError> {
        let Settlement { payment, discount } = pricing::settle(self.cart_total(), &self.payment)?;
        self.payment.card_number.clear();

        let reference = format!(
            "{}-{}",
            payment.method.reference_prefix(),
            now.timestamp_millis()
        );

        Ok(OrderDraft {
            customer: CustomerInfo {
                id: self.customer.id.clone(),
                name: self.customer.name.trim().to_string(),
                phone: self.customer.phone.trim().to_string(),
                email: self
                    .customer
                    .email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            },
            devices: self.devices.clone(),
            items: self.items.clone(),
            payment,
            discount,
            discount_type: self.payment.discount_type,
            discount_reason: self.payment.discount_reason.clone(),
            reference,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cart() -> Vec<CartLine> {
        vec![CartLine {
            id: "line-1".to_string(),
            product_id: "p-1".to_string(),
            name: "Screen protector".to_string(),
            price: 125.0,
            quantity: 2,
            stock: 10,
            category: "accessories".to_string(),
            image: None,
        }]
    }

    #[test]
    fn test_card_input_debug_is_redacted() {
        let mut card = CardNumberInput::default();
        card.set("4111111111111234");
        let printed = format!("{card:?}");
        assert!(!printed.contains("4111111111111234"));
        assert!(printed.contains("1234"));
    }

    #[test]
    fn test_settle_payment_builds_reference_and_timestamp() {
        let mut session = CheckoutSession::new(cart());
        session.customer.name = "  Nimal Perera ".to_string();
        session.customer.phone = "+94771234567".to_string();
        session.payment.method = Some(PaymentMethod::Card);
        session.payment.card_number.set("4111-1111-1111-9876");

        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let order = session.settle_payment(now).unwrap();

        assert_eq!(order.reference, "CARD-1700000000123");
        assert_eq!(order.timestamp, "2023-11-14T22:13:20.123Z");
        assert_eq!(order.customer.name, "Nimal Perera");
        assert_eq!(order.payment.total_amount, 250.0);
        assert_eq!(order.payment.card_number.as_deref(), Some("9876"));
        assert!(session.payment.card_number.is_empty());
    }

    #[test]
    fn test_failed_settlement_keeps_card_input() {
        let mut session = CheckoutSession::new(cart());
        session.payment.method = Some(PaymentMethod::Card);
        session.payment.card_number.set("4111");
        assert!(session.settle_payment(Utc::now()).is_err());
        assert!(!session.payment.card_number.is_empty());
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut session = CheckoutSession::new(cart());
        session.customer.name = "Nimal".to_string();
        session.payment.cash_received = "300".to_string();
        assert!(!session.is_empty());
        session.clear();
        assert!(session.is_empty());
    }
}
