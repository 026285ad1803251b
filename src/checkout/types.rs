// Core types for the checkout workflow

use serde::{Deserialize, Serialize};

/// Steps of the checkout workflow, as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Collecting customer name, phone and email
    CustomerDetails,
    /// Asking how many devices are being booked in
    DeviceCount,
    /// Capturing the device at `index` (zero based)
    DeviceDetails { index: usize },
    /// Choosing payment method, discount and tendered amount
    PaymentMethod,
    /// Sale submitted, waiting for the backend to answer
    Submitting,
    /// Sale accepted by the backend
    Submitted,
    /// Workflow abandoned by the operator
    Cancelled,
}

impl CheckoutStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStep::Submitted | CheckoutStep::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckoutStep::CustomerDetails => "customer_details",
            CheckoutStep::DeviceCount => "device_count",
            CheckoutStep::DeviceDetails { .. } => "device_details",
            CheckoutStep::PaymentMethod => "payment_method",
            CheckoutStep::Submitting => "submitting",
            CheckoutStep::Submitted => "submitted",
            CheckoutStep::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutStep::DeviceDetails { index } => write!(f, "device_details[{index}]"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    /// Prefix used when generating the sale reference
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(format!("unknown payment method '{other}' (expected cash or card)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Absolute currency amount
    #[default]
    Fixed,
    /// Percentage of the cart total
    Percentage,
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(DiscountType::Fixed),
            "percentage" | "percent" => Ok(DiscountType::Percentage),
            other => Err(format!("unknown discount type '{other}' (expected fixed or percentage)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    #[default]
    Mobile,
    Tablet,
    Laptop,
    Desktop,
    Smartwatch,
    Other,
}

impl std::str::FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOBILE" => Ok(DeviceType::Mobile),
            "TABLET" => Ok(DeviceType::Tablet),
            "LAPTOP" => Ok(DeviceType::Laptop),
            "DESKTOP" => Ok(DeviceType::Desktop),
            "SMARTWATCH" => Ok(DeviceType::Smartwatch),
            "OTHER" => Ok(DeviceType::Other),
            other => Err(format!("unknown device type '{other}'")),
        }
    }
}

/// Customer block of an order. `id` is only set when the customer was
/// selected from, or created in, the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A device booked in with the sale. `id` is present only when it was picked
/// from the customer's registered devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub device_type: DeviceType,
    pub brand: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
}

impl DeviceInfo {
    pub fn new(device_type: DeviceType, brand: &str, model: &str) -> Self {
        Self {
            id: None,
            device_type,
            brand: brand.to_string(),
            model: model.to_string(),
            serial_number: None,
            imei: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.brand.trim().is_empty() && !self.model.trim().is_empty()
    }
}

/// Cart line handed over by the shopping cart. Read only for the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBlock {
    pub method: PaymentMethod,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_received: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    /// Last four digits only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

/// Immutable snapshot sent to the sale endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer: CustomerInfo,
    pub devices: Vec<DeviceInfo>,
    pub items: Vec<CartLine>,
    pub payment: PaymentBlock,
    pub discount: f64,
    pub discount_type: DiscountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_reason: Option<String>,
    pub reference: String,
    pub timestamp: String,
}

/// Customer record as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Device record as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub device_type: DeviceType,
    pub brand: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl From<Device> for DeviceInfo {
    fn from(device: Device) -> Self {
        Self {
            id: Some(device.id),
            device_type: device.device_type,
            brand: device.brand,
            model: device.model,
            serial_number: device.serial_number,
            imei: device.imei,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDraft {
    pub customer_id: String,
    pub device_type: DeviceType,
    pub brand: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
}

/// The fields of a sale response the workflow cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    pub status: bool,
    #[serde(default)]
    pub sale_id: Option<String>,
    #[serde(default)]
    pub sale_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a successful checkout, handed to the caller for receipt and
/// invoice handling
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: OrderDraft,
    pub ack: PaymentAck,
    pub raw: serde_json::Value,
}

/// Figures shown on the payment step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuote {
    pub cart_total: f64,
    pub discount_amount: f64,
    pub discounted_total: f64,
    pub change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_draft_serializes_with_backend_field_names() {
        let order = OrderDraft {
            customer: CustomerInfo {
                id: None,
                name: "Nimal".to_string(),
                phone: "+94771234567".to_string(),
                email: None,
            },
            devices: vec![],
            items: vec![],
            payment: PaymentBlock {
                method: PaymentMethod::Cash,
                total_amount: 200.0,
                cash_received: Some(300.0),
                change: Some(100.0),
                card_number: None,
            },
            discount: 50.0,
            discount_type: DiscountType::Fixed,
            discount_reason: None,
            reference: "CASH-1".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        };

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["payment"]["method"], "cash");
        assert_eq!(value["payment"]["totalAmount"], 200.0);
        assert_eq!(value["payment"]["cashReceived"], 300.0);
        assert_eq!(value["discountType"], "FIXED");
        assert!(value["customer"].get("id").is_none());
        assert!(value["payment"].get("cardNumber").is_none());
    }

    #[test]
    fn test_customer_accepts_underscore_id() {
        let customer: Customer =
            serde_json::from_value(serde_json::json!({"_id": "c1", "name": "Kamal"})).unwrap();
        assert_eq!(customer.id, "c1");
        assert_eq!(customer.phone, "");
    }

    #[test]
    fn test_step_display() {
        assert_eq!(CheckoutStep::DeviceDetails { index: 2 }.to_string(), "device_details[2]");
        assert_eq!(CheckoutStep::PaymentMethod.to_string(), "payment_method");
        assert!(CheckoutStep::Cancelled.is_terminal());
        assert!(!CheckoutStep::Submitting.is_terminal());
    }

    #[test]
    fn test_parse_enums_from_cli_text() {
        assert_eq!("CASH".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("percentage".parse::<DiscountType>().unwrap(), DiscountType::Percentage);
        assert_eq!("laptop".parse::<DeviceType>().unwrap(), DeviceType::Laptop);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
