//! Payment settlement arithmetic.
//!
//! Pure functions only. Amounts are currency units held in `f64`, rounded to
//! two decimals wherever a figure ends up in an order.
//!
//! Percentage discounts are not floored: a discount above 100% yields a
//! negative discounted total, while fixed discounts are floored at zero. The
//! order's `payment.totalAmount` is floored in both cases.

use crate::checkout::errors::ValidationError;
use crate::checkout::session::PaymentForm;
use crate::checkout::types::{CartLine, DiscountType, PaymentBlock, PaymentMethod};

/// Minimum number of digits accepted for a card number
pub const MIN_CARD_DIGITS: usize = 16;

pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn cart_total(items: &[CartLine]) -> f64 {
    items.iter().map(CartLine::line_total).sum()
}

pub fn discount_amount(total: f64, kind: DiscountType, value: f64) -> f64 {
    match kind {
        DiscountType::Percentage => total * value / 100.0,
        DiscountType::Fixed => value,
    }
}

pub fn discounted_total(total: f64, kind: DiscountType, value: f64) -> f64 {
    match kind {
        DiscountType::Percentage => total - total * value / 100.0,
        DiscountType::Fixed => (total - value).max(0.0),
    }
}

pub fn change_due(cash_received: f64, discounted_total: f64) -> f64 {
    if cash_received >= discounted_total {
        cash_received - discounted_total
    } else {
        0.0
    }
}

/// Parse an operator-typed amount. Blank, non-numeric and non-finite input is rejected.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn card_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn last_four(digits: &str) -> String {
    let skip = digits.chars().count().saturating_sub(4);
    digits.chars().skip(skip).collect()
}

/// Outcome of settling the payment form against a cart total
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub payment: PaymentBlock,
    pub discount: f64,
}

/// Run the payment-step guards and compute the payment block.
///
/// The discounted total is computed here from the current form rather than
/// taken from an earlier quote, so a discount edited after the cash amount was
/// typed is still checked.
pub fn settle(total: f64, form: &PaymentForm) -> Result<Settlement, ValidationError> {
    let method = form.method.ok_or(ValidationError::PaymentMethodRequired)?;
    let discount = discount_amount(total, form.discount_type, form.discount_value);
    // guard and change use the same two-decimal figure the operator is shown
    let due = round_currency(discounted_total(total, form.discount_type, form.discount_value));
    let total_amount = round_currency(total - discount).max(0.0);

    let payment = match method {
        PaymentMethod::Cash => {
            let received =
                parse_amount(&form.cash_received).ok_or(ValidationError::InvalidCashAmount)?;
            if received < due {
                return Err(ValidationError::InsufficientCash { received, due });
            }
            PaymentBlock {
                method,
                total_amount,
                cash_received: Some(received),
                change: Some(round_currency(change_due(received, due))),
                card_number: None,
            }
        }
        PaymentMethod::Card => {
            let digits = card_digits(form.card_number.expose());
            if digits.len() < MIN_CARD_DIGITS {
                return Err(ValidationError::CardNumberTooShort {
                    digits: digits.len(),
                });
            }
            PaymentBlock {
                method,
                total_amount,
                cash_received: None,
                change: None,
                card_number: Some(last_four(&digits)),
            }
        }
    };

    Ok(Settlement {
        payment,
        discount: round_currency(discount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash_form(received: &str, kind: DiscountType, value: f64) -> PaymentForm {
        PaymentForm {
            method: Some(PaymentMethod::Cash),
            cash_received: received.to_string(),
            discount_type: kind,
            discount_value: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_discount_is_floored() {
        assert_eq!(discounted_total(100.0, DiscountType::Fixed, 20.0), 80.0);
        assert_eq!(discounted_total(100.0, DiscountType::Fixed, 150.0), 0.0);
    }

    #[test]
    fn test_percentage_discount_is_not_floored() {
        assert_eq!(discounted_total(100.0, DiscountType::Percentage, 10.0), 90.0);
        assert_eq!(discounted_total(100.0, DiscountType::Percentage, 150.0), -50.0);
        assert_eq!(discount_amount(200.0, DiscountType::Percentage, 10.0), 20.0);
    }

    #[test]
    fn test_change_due() {
        assert_eq!(change_due(150.0, 120.0), 30.0);
        assert_eq!(change_due(100.0, 120.0), 0.0);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(" 300 "), Some(300.0));
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_last_four() {
        assert_eq!(last_four("4111111111111111"), "1111");
        assert_eq!(last_four("12"), "12");
        assert_eq!(card_digits("4111 1111-1111 1234"), "4111111111111234");
    }

    #[test]
    fn test_settle_cash_with_fixed_discount() {
        let settlement = settle(250.0, &cash_form("300", DiscountType::Fixed, 50.0)).unwrap();
        assert_eq!(settlement.payment.total_amount, 200.0);
        assert_eq!(settlement.payment.change, Some(100.0));
        assert_eq!(settlement.payment.cash_received, Some(300.0));
        assert_eq!(settlement.discount, 50.0);
    }

    #[test]
    fn test_settle_rejects_short_cash() {
        let err = settle(120.0, &cash_form("100", DiscountType::Fixed, 0.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientCash {
                received: 100.0,
                due: 120.0
            }
        );
        let err = settle(120.0, &cash_form("lots", DiscountType::Fixed, 0.0)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidCashAmount);
    }

    fn line(id: &str, price: f64) -> CartLine {
        CartLine {
            id: id.to_string(),
            product_id: id.to_string(),
            name: id.to_string(),
            price,
            quantity: 1,
            stock: 10,
            category: "accessories".to_string(),
            image: None,
        }
    }

    #[test]
    fn test_exact_cash_for_drifting_float_total() {
        let total = cart_total(&[line("cable", 1.10), line("case", 2.20)]);
        assert!(total > 3.30);

        let settlement = settle(total, &cash_form("3.30", DiscountType::Fixed, 0.0)).unwrap();
        assert_eq!(settlement.payment.total_amount, 3.30);
        assert_eq!(settlement.payment.change, Some(0.0));

        let settlement = settle(total, &cash_form("5", DiscountType::Fixed, 0.0)).unwrap();
        assert_eq!(settlement.payment.change, Some(1.70));

        assert_eq!(
            settle(total, &cash_form("3.29", DiscountType::Fixed, 0.0)).unwrap_err(),
            ValidationError::InsufficientCash {
                received: 3.29,
                due: 3.30
            }
        );
    }

    #[test]
    fn test_settle_requires_method() {
        let form = PaymentForm::default();
        assert_eq!(
            settle(10.0, &form).unwrap_err(),
            ValidationError::PaymentMethodRequired
        );
    }

    #[test]
    fn test_settle_total_amount_floored_for_large_percentage() {
        let settlement =
            settle(100.0, &cash_form("0", DiscountType::Percentage, 150.0)).unwrap();
        assert_eq!(settlement.payment.total_amount, 0.0);
        assert_eq!(settlement.discount, 150.0);
        // change is measured against the unfloored discounted total
        assert_eq!(settlement.payment.change, Some(50.0));
    }

    #[test]
    fn test_settle_card_keeps_last_four_only() {
        let mut form = PaymentForm {
            method: Some(PaymentMethod::Card),
            ..Default::default()
        };
        form.card_number.set("4111 1111 1111 4242");
        let settlement = settle(99.99, &form).unwrap();
        assert_eq!(settlement.payment.card_number.as_deref(), Some("4242"));
        assert_eq!(settlement.payment.total_amount, 99.99);

        form.card_number.set("4111 1111");
        assert_eq!(
            settle(99.99, &form).unwrap_err(),
            ValidationError::CardNumberTooShort { digits: 8 }
        );
    }
}
