// Copyright 2025 the Proxima Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-rank exchanges over the in-process group.

use proxima_comm::collective::{all_gather, exchange_counts};
use proxima_comm::{CommError, Communicator, Distributor, GroupConfig, LocalGroup, Tag};
use std::time::Duration;

#[test]
fn ring_shift_over_many_group_sizes() {
    for size in 1..=6 {
        let got = LocalGroup::new(size)
            .run(|comm| {
                let next = (comm.rank() + 1) % comm.size();
                let plan = Distributor::new(&comm, &[next]).unwrap();
                plan.distribute(&[comm.rank() as u64]).unwrap()
            })
            .unwrap();
        for (rank, received) in got.iter().enumerate() {
            let prev = (rank + size - 1) % size;
            assert_eq!(received, &vec![prev as u64], "size {size}, rank {rank}");
        }
    }
}

#[test]
fn broadcast_like_plan_with_idle_ranks() {
    // Only rank 0 exports; everyone else takes part with nothing.
    let got = LocalGroup::new(4)
        .run(|comm| {
            let (dests, values) = if comm.rank() == 0 {
                (vec![1, 2, 3, 3], vec!["a", "b", "c", "d"])
            } else {
                (Vec::new(), Vec::new())
            };
            let values: Vec<String> = values.into_iter().map(str::to_owned).collect();
            let plan = Distributor::new(&comm, &dests).unwrap();
            plan.distribute(&values).unwrap()
        })
        .unwrap();
    assert!(got[0].is_empty(), "rank 0 exports only");
    assert_eq!(got[1], vec!["a"], "rank 1");
    assert_eq!(got[2], vec!["b"], "rank 2");
    assert_eq!(got[3], vec!["c", "d"], "rank 3 keeps export order");
}

#[test]
fn collectives_compose_in_sequence() {
    let got = LocalGroup::new(3)
        .run(|comm| {
            let sizes = all_gather(&comm, &(comm.rank() * 2)).unwrap();
            let counts = exchange_counts(&comm, &[1, 0, 2]).unwrap();
            comm.barrier().unwrap();
            (sizes, counts)
        })
        .unwrap();
    for (rank, (sizes, counts)) in got.iter().enumerate() {
        assert_eq!(sizes, &vec![0, 2, 4], "gather on rank {rank}");
        let expected = [1, 0, 2][rank];
        assert_eq!(counts, &vec![expected; 3], "counts on rank {rank}");
    }
}

#[test]
fn skipped_collective_surfaces_as_timeout() {
    let config = GroupConfig {
        recv_timeout: Some(Duration::from_millis(50)),
    };
    let got = LocalGroup::with_config(2, config)
        .run(|comm| {
            if comm.rank() == 0 {
                all_gather(&comm, &0_u8).map(|_| ())
            } else {
                // Rank 1 skips the gather, then lingers.
                std::thread::sleep(Duration::from_millis(200));
                comm.recv(0, Tag::GATHER).map(|_| ())
            }
        })
        .unwrap();
    assert!(
        matches!(got[0], Err(CommError::Timeout { peer: 1 })),
        "the gathering rank gives up on its silent peer"
    );
    assert!(got[1].is_ok(), "the late receive still finds the message");
}
