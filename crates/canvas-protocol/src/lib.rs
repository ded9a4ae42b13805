//! canvas-protocol
//!
//! Wire-level encoding/decoding for the canvas server.
//!
//! This crate is responsible for turning logical canvas messages
//! (`canvas_core::ClientMessage` / `ServerMessage`) into bytes and
//! back again.
//!
//! - [`wire_types`]   : message kinds and frame sizes
//! - [`binary_codec`] : the frame layouts themselves

pub mod wire_types;
pub mod binary_codec;

pub use binary_codec::{
    ProtocolError,
    decode_client,
    encode_client,
    decode_server,
    encode_server,
};
