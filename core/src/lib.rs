//! Block sampling and verification confidence engine for the Avail light client.
//!
//! Arrived blocks are queued, processed strictly one at a time, and every sampled
//! cell is verified against its row commitment. Progress is published as immutable
//! snapshots and events through the [`observer`] module.

pub mod api;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod network;
pub mod observer;
pub mod proof;
pub mod queue;
pub mod sampler;
pub mod shutdown;
pub mod source;
pub mod types;
pub mod utils;
