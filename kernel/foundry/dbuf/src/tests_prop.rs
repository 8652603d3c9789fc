//! Interleavings of driver ("interrupt") and client operations on one pool.
//!
//! Every generated sequence is applied step by step; the queue partition is
//! checked after each step and the counts are compared with a simple model.

use crate::{BufferPool, DbufState, PoolConfig};
use alloc::{sync::Arc, vec::Vec};
use driver_api::{mem::PageAllocator, testing::FakePages};
use netmux_core::net::DbufToken;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    // Interrupt context.
    Refill,
    Complete { pick: usize, length: usize },
    Reclaim { pick: usize },
    DrainTx,
    // Client context.
    ClaimForTx,
    Stage { pick: usize, length: usize },
    Consume,
    Donate { pick: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Refill),
        (any::<usize>(), 0usize..=1514).prop_map(|(pick, length)| Op::Complete { pick, length }),
        any::<usize>().prop_map(|pick| Op::Reclaim { pick }),
        Just(Op::DrainTx),
        Just(Op::ClaimForTx),
        (any::<usize>(), 0usize..=1514).prop_map(|(pick, length)| Op::Stage { pick, length }),
        Just(Op::Consume),
        any::<usize>().prop_map(|pick| Op::Donate { pick }),
    ]
}

#[derive(Default)]
struct Model {
    /// Buffers posted to "hardware".
    posted: Vec<DbufToken>,
    /// Buffers held by the client.
    held: Vec<DbufToken>,
    /// Buffers the driver took from `tx` and is sending.
    sending: Vec<DbufToken>,
    rx: usize,
    tx: usize,
}

fn take(from: &mut Vec<DbufToken>, pick: usize) -> Option<DbufToken> {
    (!from.is_empty()).then(|| from.remove(pick % from.len()))
}

fn apply(pool: &BufferPool, model: &mut Model, op: &Op) {
    match *op {
        Op::Refill => {
            if let Some(token) = pool.acquire_free() {
                pool.mark_pending(token).unwrap();
                model.posted.push(token);
            }
        }
        Op::Complete { pick, length } => {
            if let Some(token) = take(&mut model.posted, pick) {
                pool.publish_rx(token, length).unwrap();
                model.rx += 1;
            }
        }
        Op::Reclaim { pick } => {
            if let Some(token) = take(&mut model.sending, pick) {
                pool.release_to_free(token).unwrap();
            }
        }
        Op::DrainTx => {
            if let Some(token) = pool.take_tx() {
                pool.mark_pending(token).unwrap();
                model.tx -= 1;
                model.sending.push(token);
            }
        }
        Op::ClaimForTx => {
            if let Some(token) = pool.acquire_free() {
                model.held.push(token);
            }
        }
        Op::Stage { pick, length } => {
            if let Some(token) = take(&mut model.held, pick) {
                pool.publish_tx(token, length).unwrap();
                model.tx += 1;
            }
        }
        Op::Consume => {
            if let Some(token) = pool.take_rx() {
                assert_eq!(pool.state(token), Ok(DbufState::Claimed));
                model.rx -= 1;
                model.held.push(token);
            }
        }
        Op::Donate { pick } => {
            if let Some(token) = take(&mut model.held, pick) {
                pool.release_to_free(token).unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn partition_holds_under_interleaving(ops in proptest::collection::vec(arb_op(), 0..256)) {
        let fake = Arc::new(FakePages::new());
        let pages: Arc<dyn PageAllocator> = fake.clone();
        let pool = BufferPool::new(&pages, PoolConfig { buffers: 8, ..PoolConfig::default() }).unwrap();
        let allocs = fake.alloc_calls();
        let mut model = Model::default();

        for op in &ops {
            apply(&pool, &mut model, op);
            pool.check_partition();

            let counts = pool.counts();
            let lent = model.posted.len() + model.held.len() + model.sending.len();
            prop_assert_eq!(counts.total(), 8);
            prop_assert_eq!(counts.rx, model.rx);
            prop_assert_eq!(counts.tx, model.tx);
            prop_assert_eq!(counts.lent, lent);
        }
        prop_assert_eq!(fake.alloc_calls(), allocs);
    }

    #[test]
    fn rx_queue_is_fifo(lengths in proptest::collection::vec(0usize..=1514, 1..8)) {
        let pages: Arc<dyn PageAllocator> = Arc::new(FakePages::new());
        let pool = BufferPool::new(&pages, PoolConfig { buffers: 8, ..PoolConfig::default() }).unwrap();

        let tokens = lengths
            .iter()
            .map(|&length| {
                let token = pool.acquire_free().unwrap();
                pool.publish_rx(token, length).unwrap();
                token
            })
            .collect::<Vec<_>>();

        for (&token, &length) in tokens.iter().zip(&lengths) {
            prop_assert_eq!(pool.take_rx(), Some(token));
            prop_assert_eq!(pool.data_length(token), Ok(length));
        }
        prop_assert_eq!(pool.take_rx(), None);
    }
}
