//! Dissector for the Namecoin (Bitcoin-style) peer-to-peer wire protocol.
//!
//! Bytes flow through the crate like so:
//! - [stream::Conversation] claims a stream by its magic, and buffers segments,
//! - [frame::Framer] cuts whole messages out of the buffer using the header's length,
//! - [dispatch::dispatch] picks a payload parser by command name,
//! - [tree::Dissect] describes the parsed records as fields for display.
// https://en.bitcoin.it/wiki/Protocol_documentation

pub mod constants;
pub mod dispatch;
pub mod frame;
pub mod message;
pub mod schema;
pub mod stream;
pub mod tree;
pub mod wire;

pub use dispatch::{dispatch, MessageBody};
pub use frame::{FrameError, Framer, RawMessage};
pub use stream::{Config, Conversation, Dissection, Event, Feed};
