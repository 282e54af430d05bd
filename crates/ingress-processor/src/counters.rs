use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for the ingress worker.
///
/// Message-scoped faults never crash the processor; they land here and in
/// the log instead.
#[derive(Debug, Default)]
pub struct IngressCounters {
    received: AtomicU64,
    dispatched: AtomicU64,
    decode_failures: AtomicU64,
    unhandled: AtomicU64,
    rejected_signatures: AtomicU64,
    handler_failures: AtomicU64,
}

impl IngressCounters {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unhandled(&self) {
        self.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_signature(&self) {
        self.rejected_signatures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn unhandled(&self) -> u64 {
        self.unhandled.load(Ordering::Relaxed)
    }

    pub fn rejected_signatures(&self) -> u64 {
        self.rejected_signatures.load(Ordering::Relaxed)
    }

    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }
}
