//! # sensorhub-protocol
//!
//! Wire formats for the marine sensor hub.
//!
//! - [`messages`]: the fields every leaf-measurement payload shares
//! - [`codec`]: JSON payload decoding and record encoding
//! - [`line_protocol`]: InfluxDB v2 line protocol formatting

pub mod codec;
pub mod line_protocol;
pub mod messages;

pub use codec::{decode_flat, decode_leaf, encode_record, CodecError};
pub use line_protocol::LineProtocolWriter;
pub use messages::CommonFields;
