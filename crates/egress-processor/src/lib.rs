//! Egress processor: signs, encodes, and publishes outbound messages.
//!
//! Two surfaces: [`EgressProcessor::publish`] for callers that want the
//! delivery result, and the channel-fed [`EgressWorker`] so dispatch
//! handlers can submit outbound messages without blocking on the broker.

mod error;
mod processor;
mod worker;

pub use error::EgressError;
pub use processor::EgressProcessor;
pub use worker::{EgressSender, EgressWorker};
