//! Receiving side of a live audio/video link.
//!
//! Sockets produced by the [`connector`] are handed to per-media [`pipeline`]s through
//! handover queues. Each pipeline sends its start request, reads frames with the
//! `avlink-proto` reader, decodes them and pushes the result to a [`sink::MediaSink`].
//! [`context::StreamContext`] wires everything together.

pub mod config;
pub mod connector;
pub mod context;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod signal;
pub mod sink;
pub mod status;
pub mod worker;

#[cfg(test)]
mod testing;

pub use connector::{Endpoint, StreamSocket};
pub use context::{StreamContext, StreamController};
pub use error::StreamError;
pub use worker::{Action, ActionHandler, AutoConnect};
