//! Decoding of customer search responses.
//!
//! The search endpoint has answered with a bare array, `{customers: [...]}`,
//! `{data: [...]}` and `{data: {data: [...]}}` over time. All of them decode to
//! a plain list. Nothing in here fails: unknown shapes give an empty list and
//! individual records that do not parse are skipped.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::checkout::types::Customer;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CustomerEnvelope {
    List(Vec<Value>),
    Customers { customers: Vec<Value> },
    Data { data: Box<CustomerEnvelope> },
}

impl CustomerEnvelope {
    fn into_records(self) -> Vec<Value> {
        match self {
            CustomerEnvelope::List(records) => records,
            CustomerEnvelope::Customers { customers } => customers,
            CustomerEnvelope::Data { data } => data.into_records(),
        }
    }
}

pub fn decode_customer_list(payload: Value) -> Vec<Customer> {
    let records = match serde_json::from_value::<CustomerEnvelope>(payload) {
        Ok(envelope) => envelope.into_records(),
        Err(e) => {
            debug!(error = %e, "Unrecognised customer search envelope");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Customer>(record) {
            Ok(customer) => Some(customer),
            Err(e) => {
                debug!(error = %e, "Skipping malformed customer record");
                None
            }
        })
        .collect()
}
