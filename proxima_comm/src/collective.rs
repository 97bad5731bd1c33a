// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed point-to-point helpers and group-wide collectives.
//!
//! Every function here except [`send_value`] and [`recv_value`] is collective:
//! all ranks must call it, in the same order, even when they have nothing to
//! contribute.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::communicator::{Communicator, Rank, Tag};
use crate::error::{CommError, Result};

/// Encode `value` and send it to `dest`.
pub fn send_value<C, T>(comm: &C, dest: Rank, tag: Tag, value: &T) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Serialize + ?Sized,
{
    comm.send(dest, tag, bincode::serialize(value)?)
}

/// Receive and decode the next message from `source`.
pub fn recv_value<C, T>(comm: &C, source: Rank, tag: Tag) -> Result<T>
where
    C: Communicator + ?Sized,
    T: DeserializeOwned,
{
    let bytes = comm.recv(source, tag)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Every rank's `value`, indexed by rank. Identical on all ranks.
pub fn all_gather<C, T>(comm: &C, value: &T) -> Result<Vec<T>>
where
    C: Communicator + ?Sized,
    T: Serialize + DeserializeOwned + Clone,
{
    let me = comm.rank();
    let n = comm.size();
    for dest in (0..n).filter(|r| *r != me) {
        send_value(comm, dest, Tag::GATHER, value)?;
    }
    let mut out = Vec::with_capacity(n);
    for source in 0..n {
        if source == me {
            out.push(value.clone());
        } else {
            out.push(recv_value(comm, source, Tag::GATHER)?);
        }
    }
    Ok(out)
}

/// Fold every rank's `value` with `combine`, in rank order. Identical on all ranks.
pub fn all_reduce<C, T, F>(comm: &C, value: &T, combine: F) -> Result<T>
where
    C: Communicator + ?Sized,
    T: Serialize + DeserializeOwned + Clone,
    F: Fn(T, T) -> T,
{
    let mut all = all_gather(comm, value)?.into_iter();
    // all_gather always yields `size >= 1` values.
    let first = all.next().unwrap_or_else(|| value.clone());
    Ok(all.fold(first, combine))
}

/// Tell every rank how many items this rank will send it.
///
/// `send_counts[r]` is the number of items for rank `r`; the result holds, for
/// every source rank, the number of items it will send here.
pub fn exchange_counts<C>(comm: &C, send_counts: &[usize]) -> Result<Vec<usize>>
where
    C: Communicator + ?Sized,
{
    let me = comm.rank();
    let n = comm.size();
    if send_counts.len() != n {
        return Err(CommError::LengthMismatch {
            expected: n,
            actual: send_counts.len(),
        });
    }
    for dest in (0..n).filter(|r| *r != me) {
        send_value(comm, dest, Tag::COUNTS, &send_counts[dest])?;
    }
    let mut out = vec![0; n];
    for (source, count) in out.iter_mut().enumerate() {
        *count = if source == me {
            send_counts[me]
        } else {
            recv_value(comm, source, Tag::COUNTS)?
        };
    }
    Ok(out)
}
