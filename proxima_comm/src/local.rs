// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process group: one OS thread per rank, one FIFO channel per ordered rank pair.

use std::fmt;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, trace};

use crate::communicator::{Communicator, Rank, Tag};
use crate::error::{CommError, Result};

/// Settings for a [`LocalGroup`].
#[derive(Clone, Debug, Default)]
pub struct GroupConfig {
    /// Fail a receive with [`CommError::Timeout`] instead of blocking forever.
    ///
    /// `None` (the default) matches the usual message passing contract, where a
    /// rank skipping a collective hangs its peers.
    pub recv_timeout: Option<Duration>,
}

/// A fixed-size group of ranks running as threads of this process.
///
/// ```
/// use proxima_comm::{Communicator, LocalGroup, collective};
///
/// let sums = LocalGroup::new(4)
///     .run(|comm| {
///         let all = collective::all_gather(&comm, &comm.rank()).unwrap();
///         all.iter().sum::<usize>()
///     })
///     .unwrap();
/// assert_eq!(sums, vec![6, 6, 6, 6]);
/// ```
#[derive(Clone, Debug)]
pub struct LocalGroup {
    size: usize,
    config: GroupConfig,
}

impl LocalGroup {
    /// A group of `size` ranks with default settings.
    pub fn new(size: usize) -> Self {
        Self::with_config(size, GroupConfig::default())
    }

    /// A group of `size` ranks with explicit settings.
    pub fn with_config(size: usize, config: GroupConfig) -> Self {
        assert!(size > 0, "a process group needs at least one rank");
        Self { size, config }
    }

    /// Number of ranks.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` once per rank, each on its own thread, and collect the results by rank.
    ///
    /// Returns [`CommError::RankPanicked`] for the lowest rank whose closure panicked.
    pub fn run<F, R>(&self, f: F) -> Result<Vec<R>>
    where
        F: Fn(LocalComm) -> R + Sync,
        R: Send,
    {
        let comms = self.connect();
        let f = &f;
        thread::scope(|s| -> Result<Vec<R>> {
            let mut handles = Vec::with_capacity(self.size);
            for comm in comms {
                let rank = comm.rank;
                let handle = thread::Builder::new()
                    .name(format!("proxima-rank-{rank}"))
                    .spawn_scoped(s, move || f(comm))?;
                handles.push((rank, handle));
            }
            let mut out = Vec::with_capacity(self.size);
            let mut failure = None;
            for (rank, handle) in handles {
                match handle.join() {
                    Ok(r) => out.push(r),
                    Err(_) => {
                        failure.get_or_insert(CommError::RankPanicked { rank });
                    }
                }
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(out),
            }
        })
    }

    fn connect(&self) -> Vec<LocalComm> {
        let n = self.size;
        // outgoing[src][dst] / incoming[dst][src] are the two ends of one channel.
        let mut outgoing: Vec<Vec<Sender<Envelope>>> = Vec::with_capacity(n);
        let mut incoming: Vec<Vec<Receiver<Envelope>>> =
            (0..n).map(|_| Vec::with_capacity(n)).collect();
        for _ in 0..n {
            let senders = incoming
                .iter_mut()
                .map(|receivers| {
                    let (tx, rx) = unbounded();
                    receivers.push(rx);
                    tx
                })
                .collect();
            outgoing.push(senders);
        }
        outgoing
            .into_iter()
            .zip(incoming)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| LocalComm {
                rank,
                size: n,
                outgoing,
                incoming,
                recv_timeout: self.config.recv_timeout,
            })
            .collect()
    }
}

struct Envelope {
    tag: Tag,
    payload: Vec<u8>,
}

/// One rank's endpoint inside a [`LocalGroup`].
pub struct LocalComm {
    rank: Rank,
    size: usize,
    outgoing: Vec<Sender<Envelope>>,
    incoming: Vec<Receiver<Envelope>>,
    recv_timeout: Option<Duration>,
}

impl fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("recv_timeout", &self.recv_timeout)
            .finish_non_exhaustive()
    }
}

impl LocalComm {
    fn check_rank(&self, rank: Rank) -> Result<()> {
        if rank >= self.size {
            return Err(CommError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<()> {
        self.check_rank(dest)?;
        trace!(from = self.rank, to = dest, ?tag, bytes = payload.len(), "send");
        self.outgoing[dest]
            .send(Envelope { tag, payload })
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Vec<u8>> {
        self.check_rank(source)?;
        let rx = &self.incoming[source];
        let envelope = match self.recv_timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => CommError::Timeout { peer: source },
                RecvTimeoutError::Disconnected => CommError::Disconnected { peer: source },
            })?,
            None => rx
                .recv()
                .map_err(|_| CommError::Disconnected { peer: source })?,
        };
        if envelope.tag != tag {
            return Err(CommError::TagMismatch {
                peer: source,
                expected: tag,
                found: envelope.tag,
            });
        }
        trace!(from = source, to = self.rank, ?tag, bytes = envelope.payload.len(), "recv");
        Ok(envelope.payload)
    }

    fn barrier(&self) -> Result<()> {
        for dest in (0..self.size).filter(|r| *r != self.rank) {
            self.send(dest, Tag::BARRIER, Vec::new())?;
        }
        for source in (0..self.size).filter(|r| *r != self.rank) {
            self.recv(source, Tag::BARRIER)?;
        }
        debug!(rank = self.rank, "barrier passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_between_a_pair_keep_order() {
        let got = LocalGroup::new(2)
            .run(|comm| {
                if comm.rank() == 0 {
                    for i in 0..10_u8 {
                        comm.send(1, Tag::USER, vec![i]).unwrap();
                    }
                    Vec::new()
                } else {
                    (0..10)
                        .map(|_| comm.recv(0, Tag::USER).unwrap()[0])
                        .collect::<Vec<_>>()
                }
            })
            .unwrap();
        assert_eq!(got[1], (0..10).collect::<Vec<u8>>(), "FIFO order per pair");
    }

    #[test]
    fn self_messages_are_delivered() {
        let got = LocalGroup::new(1)
            .run(|comm| {
                comm.send(0, Tag::USER, vec![1, 2, 3]).unwrap();
                comm.recv(0, Tag::USER).unwrap()
            })
            .unwrap();
        assert_eq!(got, vec![vec![1, 2, 3]], "a rank can message itself");
    }

    #[test]
    fn wrong_tag_is_reported() {
        let got = LocalGroup::new(2)
            .run(|comm| {
                if comm.rank() == 0 {
                    comm.send(1, Tag(40), Vec::new()).unwrap();
                    None
                } else {
                    Some(comm.recv(0, Tag(41)))
                }
            })
            .unwrap();
        assert!(
            matches!(
                got[1],
                Some(Err(CommError::TagMismatch {
                    peer: 0,
                    expected: Tag(41),
                    found: Tag(40),
                }))
            ),
            "receiver must see the tag mismatch"
        );
    }

    #[test]
    fn missing_sender_times_out_or_disconnects() {
        let config = GroupConfig {
            recv_timeout: Some(Duration::from_millis(50)),
        };
        let got = LocalGroup::with_config(2, config)
            .run(|comm| {
                if comm.rank() == 1 {
                    Some(comm.recv(0, Tag::USER))
                } else {
                    // Keep the endpoint alive past the timeout.
                    thread::sleep(Duration::from_millis(200));
                    None
                }
            })
            .unwrap();
        assert!(
            matches!(got[1], Some(Err(CommError::Timeout { peer: 0 }))),
            "a silent peer must time out"
        );
    }

    #[test]
    fn out_of_range_rank_is_rejected() {
        let got = LocalGroup::new(2)
            .run(|comm| comm.send(5, Tag::USER, Vec::new()))
            .unwrap();
        assert!(
            matches!(got[0], Err(CommError::InvalidRank { rank: 5, size: 2 })),
            "rank 5 does not exist in a group of 2"
        );
    }

    #[test]
    fn panicking_rank_is_reported() {
        let result = LocalGroup::new(3).run(|comm| {
            assert!(comm.rank() != 2, "rank 2 fails on purpose");
            comm.rank()
        });
        assert!(
            matches!(result, Err(CommError::RankPanicked { rank: 2 })),
            "the panicking rank must be named"
        );
    }

    #[test]
    fn barrier_completes() {
        let got = LocalGroup::new(4)
            .run(|comm| comm.barrier().is_ok())
            .unwrap();
        assert!(got.iter().all(|ok| *ok), "every rank passes the barrier");
    }
}
