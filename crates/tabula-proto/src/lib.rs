//! Wire model
//!
//! Shared wire-level types for the tabula live-sync protocol: the frame
//! vocabulary exchanged with the broker, destination namespaces with their
//! normalization rules, and the JSON payloads carried on each topic.
//!
//! Frames are destination-addressed rather than opcode-addressed: the broker
//! routes on the destination path, and the payload type is implied by the
//! topic it arrives on. Bodies use JSON because the upstream services speak
//! JSON; field names stay camelCase on the wire (`fromCell`, `playedBy`) and
//! map to snake_case in Rust via serde renames.
//!
//! # Components
//!
//! - [`Frame`]: subscribe/unsubscribe/send vocabulary
//! - [`destination`]: namespace prefixes, well-known topics, normalization
//! - [`payloads`]: typed JSON bodies per topic
//! - [`ProtocolError`]: decode/encode failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod destination;
mod errors;
mod frame;
pub mod payloads;

pub use errors::ProtocolError;
pub use frame::Frame;
pub use payloads::UserId;
