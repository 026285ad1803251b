use chrono::Utc;
use statig::prelude::*;

use crate::checkout::errors::ValidationError;
use crate::checkout::session::CheckoutSession;
use crate::checkout::types::{CheckoutStep, DeviceInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    Continue,
    SetDeviceCount { count: u32 },
    SaveDevice { device: DeviceInfo },
    Submit,
    PaymentSettled,
    PaymentFailed { reason: String },
    Cancel,
}

/// Transition rules of the checkout workflow. The data being collected lives
/// in the `CheckoutSession` passed as context on every event.
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    pub capture_devices: bool,
    pub max_devices: u32,
}

impl CheckoutFlow {
    pub fn new(capture_devices: bool, max_devices: u32) -> Self {
        Self {
            capture_devices,
            max_devices,
        }
    }

    fn cancel(&self, context: &mut CheckoutSession) -> Outcome<State> {
        context.clear();
        tracing::info!("Checkout cancelled");
        Transition(State::cancelled())
    }
}

#[state_machine(initial = "State::customer_details()")]
impl CheckoutFlow {
    #[state]
    fn customer_details(&mut self, context: &mut CheckoutSession, event: &CheckoutEvent) -> Outcome<State> {
        match event {
            CheckoutEvent::Continue => {
                if let Err(e) = context.validate_customer() {
                    context.reject(e);
                    return Handled;
                }
                tracing::info!(
                    customer_id = ?context.customer.id,
                    capture_devices = self.capture_devices,
                    "Customer details accepted"
                );
                if self.capture_devices {
                    Transition(State::device_count())
                } else {
                    Transition(State::payment_method())
                }
            }
            CheckoutEvent::Cancel => self.cancel(context),
            _ => Handled,
        }
    }

    #[state]
    fn device_count(&mut self, context: &mut CheckoutSession, event: &CheckoutEvent) -> Outcome<State> {
        match event {
            CheckoutEvent::SetDeviceCount { count } => {
                if *count < 1 || *count > self.max_devices {
                    context.reject(ValidationError::DeviceCountOutOfRange {
                        count: *count,
                        max: self.max_devices,
                    });
                    return Handled;
                }
                context.device_count = *count;
                context.devices.clear();
                tracing::info!(device_count = count, "Device count set");
                Transition(State::device_details())
            }
            CheckoutEvent::Cancel => self.cancel(context),
            _ => Handled,
        }
    }

    #[state]
    fn device_details(&mut self, context: &mut CheckoutSession, event: &CheckoutEvent) -> Outcome<State> {
        match event {
            CheckoutEvent::SaveDevice { device } => {
                if device.brand.trim().is_empty() {
                    context.reject(ValidationError::DeviceBrandRequired);
                    return Handled;
                }
                if device.model.trim().is_empty() {
                    context.reject(ValidationError::DeviceModelRequired);
                    return Handled;
                }
                context.devices.push(device.clone());
                tracing::info!(
                    index = context.devices.len() - 1,
                    brand = %device.brand,
                    model = %device.model,
                    existing = device.id.is_some(),
                    "Device saved"
                );
                if context.devices.len() >= context.device_count as usize {
                    Transition(State::payment_method())
                } else {
                    Handled
                }
            }
            CheckoutEvent::Cancel => self.cancel(context),
            _ => Handled,
        }
    }

    #[state]
    fn payment_method(&mut self, context: &mut CheckoutSession, event: &CheckoutEvent) -> Outcome<State> {
        match event {
            CheckoutEvent::Submit => match context.settle_payment(Utc::now()) {
                Ok(order) => {
                    tracing::info!(
                        reference = %order.reference,
                        total_amount = order.payment.total_amount,
                        discount = order.discount,
                        "Payment accepted for submission"
                    );
                    context.pending_order = Some(order);
                    Transition(State::submitting())
                }
                Err(e) => {
                    context.reject(e);
                    Handled
                }
            },
            CheckoutEvent::Cancel => self.cancel(context),
            _ => Handled,
        }
    }

    #[state]
    fn submitting(&mut self, context: &mut CheckoutSession, event: &CheckoutEvent) -> Outcome<State> {
        match event {
            CheckoutEvent::PaymentSettled => Transition(State::submitted()),
            CheckoutEvent::PaymentFailed { reason } => {
                let reference = context.pending_order.take().map(|o| o.reference);
                tracing::warn!(reference = ?reference, reason = %reason, "Payment failed, back to payment step");
                Transition(State::payment_method())
            }
            _ => Handled,
        }
    }

    #[state]
    fn submitted(&mut self, event: &CheckoutEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }

    #[state]
    fn cancelled(&mut self, event: &CheckoutEvent) -> Outcome<State> {
        let _ = event;
        Handled
    }
}

/// Owns the running state machine and translates its states into `CheckoutStep`
pub struct CheckoutMachine {
    inner: StateMachine<CheckoutFlow>,
}

impl CheckoutMachine {
    pub fn new(flow: CheckoutFlow) -> Self {
        Self {
            inner: flow.state_machine(),
        }
    }

    /// Feed one event. Returns the guard failure if the event was rejected.
    pub fn handle(
        &mut self,
        event: &CheckoutEvent,
        session: &mut CheckoutSession,
    ) -> Result<(), ValidationError> {
        session.rejection = None;
        self.inner.handle_with_context(event, session);
        match session.take_rejection() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn step(&self, session: &CheckoutSession) -> CheckoutStep {
        match self.inner.state() {
            State::CustomerDetails { .. } => CheckoutStep::CustomerDetails,
            State::DeviceCount { .. } => CheckoutStep::DeviceCount,
            State::DeviceDetails { .. } => CheckoutStep::DeviceDetails {
                index: session.devices.len(),
            },
            State::PaymentMethod { .. } => CheckoutStep::PaymentMethod,
            State::Submitting { .. } => CheckoutStep::Submitting,
            State::Submitted { .. } => CheckoutStep::Submitted,
            State::Cancelled { .. } => CheckoutStep::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::types::{CartLine, DeviceType, PaymentMethod};

    fn session() -> CheckoutSession {
        CheckoutSession::new(vec![CartLine {
            id: "l1".to_string(),
            product_id: "p1".to_string(),
            name: "Charger".to_string(),
            price: 250.0,
            quantity: 1,
            stock: 5,
            category: "accessories".to_string(),
            image: None,
        }])
    }

    #[test]
    fn test_default_path_skips_devices() {
        let mut machine = CheckoutMachine::new(CheckoutFlow::new(false, 10));
        let mut session = session();

        assert_eq!(machine.step(&session), CheckoutStep::CustomerDetails);
        assert_eq!(
            machine.handle(&CheckoutEvent::Continue, &mut session),
            Err(ValidationError::CustomerNameRequired)
        );
        assert_eq!(machine.step(&session), CheckoutStep::CustomerDetails);

        session.customer.name = "Nimal".to_string();
        machine.handle(&CheckoutEvent::Continue, &mut session).unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::PaymentMethod);
    }

    #[test]
    fn test_device_branch() {
        let mut machine = CheckoutMachine::new(CheckoutFlow::new(true, 10));
        let mut session = session();
        session.customer.name = "Nimal".to_string();

        machine.handle(&CheckoutEvent::Continue, &mut session).unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::DeviceCount);

        assert_eq!(
            machine.handle(&CheckoutEvent::SetDeviceCount { count: 11 }, &mut session),
            Err(ValidationError::DeviceCountOutOfRange { count: 11, max: 10 })
        );
        assert_eq!(
            machine.handle(&CheckoutEvent::SetDeviceCount { count: 0 }, &mut session),
            Err(ValidationError::DeviceCountOutOfRange { count: 0, max: 10 })
        );
        machine
            .handle(&CheckoutEvent::SetDeviceCount { count: 2 }, &mut session)
            .unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::DeviceDetails { index: 0 });

        let half_filled = DeviceInfo::new(DeviceType::Mobile, "Samsung", " ");
        assert_eq!(
            machine.handle(&CheckoutEvent::SaveDevice { device: half_filled }, &mut session),
            Err(ValidationError::DeviceModelRequired)
        );
        assert!(session.devices.is_empty());

        let phone = DeviceInfo::new(DeviceType::Mobile, "Samsung", "A54");
        machine
            .handle(&CheckoutEvent::SaveDevice { device: phone }, &mut session)
            .unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::DeviceDetails { index: 1 });

        let laptop = DeviceInfo::new(DeviceType::Laptop, "Lenovo", "T14");
        machine
            .handle(&CheckoutEvent::SaveDevice { device: laptop }, &mut session)
            .unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::PaymentMethod);
        assert_eq!(session.devices.len(), 2);
        assert_eq!(session.devices[1].brand, "Lenovo");
    }

    #[test]
    fn test_submit_guard_and_failure_path() {
        let mut machine = CheckoutMachine::new(CheckoutFlow::new(false, 10));
        let mut session = session();
        session.customer.name = "Nimal".to_string();
        machine.handle(&CheckoutEvent::Continue, &mut session).unwrap();

        session.payment.method = Some(PaymentMethod::Cash);
        session.payment.cash_received = "200".to_string();
        assert!(matches!(
            machine.handle(&CheckoutEvent::Submit, &mut session),
            Err(ValidationError::InsufficientCash { .. })
        ));
        assert_eq!(machine.step(&session), CheckoutStep::PaymentMethod);
        assert!(session.pending_order.is_none());

        session.payment.cash_received = "300".to_string();
        machine.handle(&CheckoutEvent::Submit, &mut session).unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::Submitting);
        assert_eq!(
            session.pending_order.as_ref().map(|o| o.payment.change),
            Some(Some(50.0))
        );

        // cancel is ignored while the sale is in flight
        machine.handle(&CheckoutEvent::Cancel, &mut session).unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::Submitting);

        machine
            .handle(
                &CheckoutEvent::PaymentFailed {
                    reason: "timeout".to_string(),
                },
                &mut session,
            )
            .unwrap();
        assert_eq!(machine.step(&session), CheckoutStep::PaymentMethod);
        assert!(session.pending_order.is_none());
        assert_eq!(session.payment.cash_received, "300");
    }

    #[test]
    fn test_cancel_clears_session() {
        let mut machine = CheckoutMachine::new(CheckoutFlow::new(true, 10));
        let mut session = session();
        session.customer.name = "Nimal".to_string();
        machine.handle(&CheckoutEvent::Continue, &mut session).unwrap();
        machine.handle(&CheckoutEvent::Cancel, &mut session).unwrap();

        assert_eq!(machine.step(&session), CheckoutStep::Cancelled);
        assert!(session.is_empty());
    }
}
