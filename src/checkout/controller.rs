use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use crate::backend::{BackendError, PosBackend};
use crate::checkout::debounce::Debouncer;
use crate::checkout::envelope::decode_customer_list;
use crate::checkout::errors::{CheckoutError, ValidationError};
use crate::checkout::phone::{normalize_phone, validated_phone};
use crate::checkout::pricing;
use crate::checkout::session::CheckoutSession;
use crate::checkout::state_machine::{CheckoutEvent, CheckoutFlow, CheckoutMachine};
use crate::checkout::types::*;
use crate::config::CheckoutConfig;
use crate::observability::{api_metrics, OperationTimer};
use crate::telemetry::{create_checkout_span, generate_correlation_id};

/// Latest state of the debounced customer lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerSearch {
    /// Normalised phone the results belong to
    pub query: String,
    pub customers: Vec<Customer>,
    /// A lookup has fired and not answered yet
    pub searching: bool,
}

/// Drives one checkout at a time against a `PosBackend`.
///
/// Field edits and navigation are synchronous; collaborator calls are async.
/// Guard failures come back as `CheckoutError::Validation` and leave the step
/// unchanged. Only `submit` and `cancel` end a checkout; both reset the
/// controller afterwards, so `open` must be called again for the next sale.
pub struct CheckoutController {
    backend: Arc<dyn PosBackend>,
    settings: CheckoutConfig,
    machine: CheckoutMachine,
    session: CheckoutSession,
    search: Debouncer,
    search_results: Arc<watch::Sender<CustomerSearch>>,
    correlation_id: String,
}

impl CheckoutController {
    pub fn new(backend: Arc<dyn PosBackend>, settings: CheckoutConfig) -> Self {
        let (search_results, _) = watch::channel(CustomerSearch::default());
        Self {
            backend,
            machine: CheckoutMachine::new(flow_for(&settings)),
            session: CheckoutSession::default(),
            search: Debouncer::new(settings.debounce_delay()),
            search_results: Arc::new(search_results),
            correlation_id: generate_correlation_id(),
            settings,
        }
    }

    /// Start a checkout for `cart`. Cart lines are copied as given.
    pub fn open(&mut self, cart: &[CartLine]) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        self.reset();
        self.session = CheckoutSession::new(cart.to_vec());
        info!(
            correlation_id = %self.correlation_id,
            lines = cart.len(),
            cart_total = self.session.cart_total(),
            capture_devices = self.settings.capture_devices,
            "Checkout opened"
        );
        Ok(())
    }

    pub fn step(&self) -> CheckoutStep {
        self.machine.step(&self.session)
    }

    pub fn is_processing(&self) -> bool {
        self.step() == CheckoutStep::Submitting
    }

    pub fn session(&self) -> &CheckoutSession {
        &self.session
    }

    pub fn settings(&self) -> &CheckoutConfig {
        &self.settings
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    // Customer step

    pub fn enter_name(&mut self, name: &str) -> Result<(), CheckoutError> {
        self.ensure_editable("edit the customer")?;
        self.session.customer.name = name.to_string();
        Ok(())
    }

    pub fn enter_email(&mut self, email: &str) -> Result<(), CheckoutError> {
        self.ensure_editable("edit the customer")?;
        let email = email.trim();
        self.session.customer.email = (!email.is_empty()).then(|| email.to_string());
        Ok(())
    }

    /// Record the typed phone and (re)schedule the customer lookup. Must be
    /// called from within a tokio runtime.
    pub fn enter_phone(&mut self, phone: &str) -> Result<(), CheckoutError> {
        self.ensure_editable("edit the customer")?;
        self.session.customer.phone = phone.to_string();

        let typed = phone.trim();
        if self.session.customer.id.is_some()
            || typed.chars().count() < self.settings.phone_search_min_chars
        {
            self.cancel_search();
            return Ok(());
        }

        self.schedule_search(normalize_phone(typed));
        Ok(())
    }

    pub fn select_customer(&mut self, customer: Customer) -> Result<(), CheckoutError> {
        self.ensure_editable("select a customer")?;
        self.cancel_search();
        info!(
            correlation_id = %self.correlation_id,
            customer_id = %customer.id,
            "Customer selected"
        );
        self.session.customer = CustomerInfo {
            id: Some(customer.id),
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
        };
        self.session.known_devices.clear();
        Ok(())
    }

    pub fn clear_selected_customer(&mut self) -> Result<(), CheckoutError> {
        self.ensure_editable("clear the customer")?;
        self.session.customer = CustomerInfo::default();
        self.session.known_devices.clear();
        self.cancel_search();
        Ok(())
    }

    /// Create the customer in the registry and select the stored record
    pub async fn register_customer(&mut self, draft: CustomerDraft) -> Result<Customer, CheckoutError> {
        self.ensure_editable("register a customer")?;
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::CustomerNameRequired.into());
        }
        let phone = validated_phone(&draft.phone)?;
        let email = draft
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        let payload = CustomerDraft { name, phone, email };
        let span = create_checkout_span("register_customer", &self.correlation_id);
        let created = self
            .backend
            .create_customer(&payload)
            .instrument(span)
            .await
            .inspect_err(|e| warn!(error = %e, "Customer registration failed"))?;

        self.select_customer(created.clone())?;
        Ok(created)
    }

    pub fn customer_matches(&self) -> Vec<Customer> {
        self.search_results.borrow().customers.clone()
    }

    pub fn is_searching(&self) -> bool {
        self.search_results.borrow().searching
    }

    pub fn watch_customer_search(&self) -> watch::Receiver<CustomerSearch> {
        self.search_results.subscribe()
    }

    // Device branch

    pub fn set_device_count(&mut self, count: u32) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        self.ensure_step(CheckoutStep::DeviceCount, "set the device count")?;
        self.machine
            .handle(&CheckoutEvent::SetDeviceCount { count }, &mut self.session)?;
        Ok(())
    }

    /// Devices already registered for the selected customer. Lookup failures
    /// and an unregistered customer both give an empty list.
    pub async fn load_customer_devices(&mut self) -> Vec<DeviceInfo> {
        let Some(customer_id) = self.session.customer.id.clone() else {
            self.session.known_devices.clear();
            return Vec::new();
        };

        let span = create_checkout_span("load_customer_devices", &self.correlation_id);
        let devices = match self
            .backend
            .get_customer_devices(&customer_id)
            .instrument(span)
            .await
        {
            Ok(devices) => devices.into_iter().map(DeviceInfo::from).collect(),
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Device lookup failed, offering none");
                api_metrics().record_degraded_lookup("customer_devices");
                Vec::new()
            }
        };

        debug!(customer_id = %customer_id, count = devices.len(), "Customer devices loaded");
        self.session.known_devices = devices.clone();
        devices
    }

    /// Store a new device for the selected customer. The returned record
    /// carries its registry id and can be passed to `save_device`.
    pub async fn register_device(&mut self, device: DeviceInfo) -> Result<DeviceInfo, CheckoutError> {
        self.ensure_editable("register a device")?;
        let customer_id = self
            .session
            .customer
            .id
            .clone()
            .ok_or(ValidationError::CustomerNotSelected)?;
        if device.brand.trim().is_empty() {
            return Err(ValidationError::DeviceBrandRequired.into());
        }
        if device.model.trim().is_empty() {
            return Err(ValidationError::DeviceModelRequired.into());
        }

        let draft = DeviceDraft {
            customer_id,
            device_type: device.device_type,
            brand: device.brand.trim().to_string(),
            model: device.model.trim().to_string(),
            serial_number: device.serial_number,
            imei: device.imei,
        };
        let span = create_checkout_span("register_device", &self.correlation_id);
        let stored: DeviceInfo = self
            .backend
            .create_device(&draft)
            .instrument(span)
            .await
            .inspect_err(|e| warn!(error = %e, "Device registration failed"))?
            .into();

        self.session.known_devices.push(stored.clone());
        Ok(stored)
    }

    pub fn save_device(&mut self, device: DeviceInfo) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        let step = self.step();
        if !matches!(step, CheckoutStep::DeviceDetails { .. }) {
            return Err(CheckoutError::InvalidStep {
                step,
                action: "save a device",
            });
        }
        self.machine
            .handle(&CheckoutEvent::SaveDevice { device }, &mut self.session)?;
        Ok(())
    }

    // Payment step

    pub fn select_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.ensure_editable("change the payment")?;
        self.session.payment.method = Some(method);
        Ok(())
    }

    pub fn enter_cash_received(&mut self, raw: &str) -> Result<(), CheckoutError> {
        self.ensure_editable("change the payment")?;
        self.session.payment.cash_received = raw.to_string();
        Ok(())
    }

    pub fn enter_card_number(&mut self, raw: &str) -> Result<(), CheckoutError> {
        self.ensure_editable("change the payment")?;
        self.session.payment.card_number.set(raw);
        Ok(())
    }

    pub fn apply_discount(
        &mut self,
        kind: DiscountType,
        value: f64,
        reason: Option<&str>,
    ) -> Result<(), CheckoutError> {
        self.ensure_editable("change the payment")?;
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidDiscount { value }.into());
        }
        let payment = &mut self.session.payment;
        payment.discount_type = kind;
        payment.discount_value = value;
        payment.discount_reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Ok(())
    }

    /// Figures for display, computed from the form as it is now
    pub fn quote(&self) -> PaymentQuote {
        let total = self.session.cart_total();
        let form = &self.session.payment;
        let due = pricing::round_currency(pricing::discounted_total(
            total,
            form.discount_type,
            form.discount_value,
        ));
        let cash = pricing::parse_amount(&form.cash_received).unwrap_or(0.0);
        PaymentQuote {
            cart_total: pricing::round_currency(total),
            discount_amount: pricing::round_currency(pricing::discount_amount(
                total,
                form.discount_type,
                form.discount_value,
            )),
            discounted_total: due,
            change: pricing::round_currency(pricing::change_due(cash, due)),
        }
    }

    // Navigation

    /// Leave the customer step. The device steps advance through
    /// `set_device_count` and `save_device`, the payment step through `submit`.
    pub fn continue_to_next(&mut self) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        self.ensure_step(CheckoutStep::CustomerDetails, "continue")?;
        if self.session.items.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        self.cancel_search();
        self.machine.handle(&CheckoutEvent::Continue, &mut self.session)?;
        Ok(())
    }

    /// Commit the sale. Calls the backend exactly once; on failure the
    /// workflow is back on the payment step with the form intact.
    pub async fn submit(&mut self) -> Result<CheckoutReceipt, CheckoutError> {
        self.ensure_idle()?;
        self.ensure_step(CheckoutStep::PaymentMethod, "submit")?;
        self.machine.handle(&CheckoutEvent::Submit, &mut self.session)?;

        let order = match self.session.pending_order.clone() {
            Some(order) => order,
            None => {
                return Err(CheckoutError::InvalidStep {
                    step: self.step(),
                    action: "submit",
                })
            }
        };

        let span = create_checkout_span("submit", &self.correlation_id);
        let backend = Arc::clone(&self.backend);
        let timer = OperationTimer::new("complete_payment");
        let outcome = {
            let guard = SubmissionGuard {
                machine: &mut self.machine,
                session: &mut self.session,
                armed: true,
            };
            let result = backend.complete_payment(&order).instrument(span).await;
            let (event, outcome) = interpret_payment(result);
            guard.resolve(event);
            outcome
        };
        timer.finish();

        let (ack, raw) = match outcome {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(
                    correlation_id = %self.correlation_id,
                    reference = %order.reference,
                    error = %e,
                    "Sale not completed"
                );
                return Err(e);
            }
        };

        info!(
            correlation_id = %self.correlation_id,
            reference = %order.reference,
            sale_id = ?ack.sale_id,
            sale_number = ?ack.sale_number,
            total_amount = order.payment.total_amount,
            "Sale completed"
        );
        api_metrics().record_completed_sale();
        let receipt = CheckoutReceipt { order, ack, raw };
        self.settle_then_reset().await;
        Ok(receipt)
    }

    /// Abandon the checkout. Refused while a payment is in flight.
    pub async fn cancel(&mut self) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        let step = self.step();
        if step.is_terminal() {
            return Err(CheckoutError::InvalidStep {
                step,
                action: "cancel",
            });
        }
        self.cancel_search();
        self.machine.handle(&CheckoutEvent::Cancel, &mut self.session)?;
        self.settle_then_reset().await;
        Ok(())
    }

    /// Hold the terminal step for `settle_delay`, then start over. The reset
    /// also happens if this future is dropped during the pause, so a caller
    /// that stops waiting never leaves the controller parked on a finished
    /// sale. The receipt of such a sale is only in the `Sale completed` log.
    async fn settle_then_reset(&mut self) {
        let delay = self.settings.settle_delay();
        let pending = PendingReset(self);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        drop(pending);
    }

    fn ensure_idle(&self) -> Result<(), CheckoutError> {
        if self.is_processing() {
            return Err(CheckoutError::Busy);
        }
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), CheckoutError> {
        self.ensure_idle()?;
        let step = self.step();
        if step.is_terminal() {
            return Err(CheckoutError::InvalidStep { step, action });
        }
        Ok(())
    }

    fn ensure_step(&self, expected: CheckoutStep, action: &'static str) -> Result<(), CheckoutError> {
        let step = self.step();
        if step != expected {
            return Err(CheckoutError::InvalidStep { step, action });
        }
        Ok(())
    }

    fn schedule_search(&mut self, query: String) {
        let backend = Arc::clone(&self.backend);
        let results = Arc::clone(&self.search_results);
        let limit = self.settings.customer_search_limit;

        self.search.schedule(move |ticket| async move {
            if !ticket.is_current() {
                return;
            }
            results.send_modify(|search| {
                search.query = query.clone();
                search.searching = true;
            });

            let customers = match backend.search_customers(&query, limit).await {
                Ok(payload) => decode_customer_list(payload),
                Err(e) => {
                    warn!(query = %query, error = %e, "Customer search failed, showing no matches");
                    api_metrics().record_degraded_lookup("customer_search");
                    Vec::new()
                }
            };

            if ticket.is_current() {
                debug!(query = %query, matches = customers.len(), "Customer search finished");
                results.send_replace(CustomerSearch {
                    query,
                    customers,
                    searching: false,
                });
            } else {
                debug!(
                    query = %query,
                    generation = ticket.generation(),
                    "Discarding stale customer search result"
                );
            }
        });
    }

    fn cancel_search(&mut self) {
        self.search.cancel();
        self.search_results.send_replace(CustomerSearch::default());
    }

    /// Back to a blank customer step with no cart
    fn reset(&mut self) {
        self.cancel_search();
        self.machine = CheckoutMachine::new(flow_for(&self.settings));
        self.session = CheckoutSession::default();
        self.correlation_id = generate_correlation_id();
    }
}

fn flow_for(settings: &CheckoutConfig) -> CheckoutFlow {
    CheckoutFlow::new(settings.capture_devices, settings.max_devices)
}

struct PendingReset<'a>(&'a mut CheckoutController);

impl Drop for PendingReset<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Settles a submission exactly once. If the submitting future is dropped
/// before the backend answers, the workflow falls back to the payment step.
struct SubmissionGuard<'a> {
    machine: &'a mut CheckoutMachine,
    session: &'a mut CheckoutSession,
    armed: bool,
}

impl SubmissionGuard<'_> {
    fn resolve(mut self, event: CheckoutEvent) {
        self.armed = false;
        let _ = self.machine.handle(&event, &mut *self.session);
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Submission abandoned before the backend answered");
            api_metrics().record_abandoned_submission();
            let _ = self.machine.handle(
                &CheckoutEvent::PaymentFailed {
                    reason: "submission abandoned".to_string(),
                },
                &mut *self.session,
            );
        }
    }
}

type PaymentOutcome = Result<(PaymentAck, Value), CheckoutError>;

fn interpret_payment(result: Result<Value, BackendError>) -> (CheckoutEvent, PaymentOutcome) {
    let raw = match result {
        Ok(raw) => raw,
        Err(e) => {
            return (
                CheckoutEvent::PaymentFailed {
                    reason: e.to_string(),
                },
                Err(CheckoutError::Backend(e)),
            )
        }
    };

    match read_ack(&raw) {
        Some(ack) if ack.status => (CheckoutEvent::PaymentSettled, Ok((ack, raw))),
        Some(ack) => {
            api_metrics().record_rejected_payment();
            let message = ack
                .message
                .unwrap_or_else(|| "Payment failed".to_string());
            (
                CheckoutEvent::PaymentFailed {
                    reason: message.clone(),
                },
                Err(CheckoutError::PaymentRejected { message }),
            )
        }
        None => {
            api_metrics().record_rejected_payment();
            let message = "Payment response did not include a status".to_string();
            (
                CheckoutEvent::PaymentFailed {
                    reason: message.clone(),
                },
                Err(CheckoutError::PaymentRejected { message }),
            )
        }
    }
}

/// Read the sale acknowledgement. Ids may come back as strings or numbers,
/// at the top level or under `data`.
fn read_ack(raw: &Value) -> Option<PaymentAck> {
    let status = raw.get("status")?.as_bool()?;
    let field = |key: &str| {
        raw.get(key)
            .or_else(|| raw.get("data").and_then(|data| data.get(key)))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    };
    Some(PaymentAck {
        status,
        sale_id: field("saleId"),
        sale_number: field("saleNumber"),
        message: field("message"),
    })
}
