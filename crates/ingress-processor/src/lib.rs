//! Ingress processor: consumes inbound commands and dispatches them.
//!
//! Each delivery goes decode → signature policy check → dispatch, with
//! in-flight dispatches bounded by a semaphore. At a concurrency limit of
//! 1, handler invocation order matches delivery order. Deliveries are
//! acknowledged to the broker only after dispatch settles, so messages in
//! flight during a connection loss are redelivered rather than lost.

mod counters;
mod processor;

pub use counters::IngressCounters;
pub use processor::{IngressHandle, IngressProcessor, ProcessorState};
