//! RAS message envelopes, wire codec, and message signing.
//!
//! Every message exchanged with the management system travels as a
//! [`MessageEnvelope`]: a uuid, a dotted message type, a timestamp, a JSON
//! payload, and (on signed egress traffic) an HMAC signature with expiry.
//! Envelopes are created per message, consumed once, and discarded.

mod codec;
mod envelope;
mod signer;

pub use codec::{decode, encode, CodecError};
pub use envelope::{MessageEnvelope, MessageSignature};
pub use signer::{Signer, Verifier};
