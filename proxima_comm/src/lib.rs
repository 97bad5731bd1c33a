// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proxima Comm: message passing for SPMD search steps.
//!
//! Every distributed step in Proxima is written against [`Communicator`], a
//! small blocking send/receive interface over a fixed group of ranks.
//!
//! - [`LocalGroup`] runs a group in-process, one thread per rank, with a
//!   FIFO channel per ordered rank pair.
//! - [`collective`] provides typed helpers: `all_gather`, `all_reduce` and
//!   `exchange_counts`.
//! - [`Distributor`] is a reusable plan that routes items to destination
//!   ranks with point-to-point messages, only between ranks that actually
//!   exchange something.
//!
//! Payloads are encoded with `bincode`, so anything `serde` can serialize can
//! cross ranks.
//!
//! ## Collective calls
//!
//! Collective functions and [`Distributor`] construction must be called by
//! every rank of the group in the same order. A rank with nothing to send
//! still participates with empty inputs.

pub mod collective;
pub mod communicator;
pub mod distributor;
pub mod error;
pub mod local;

pub use communicator::{Communicator, Rank, Tag};
pub use distributor::Distributor;
pub use error::{CommError, Result};
pub use local::{GroupConfig, LocalComm, LocalGroup};
