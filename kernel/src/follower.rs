// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The chain-following state machine: poll the node, append the next
//! block or roll back on a fork, and repeat. Runs on a dedicated thread
//! so `start`/`stop`/`running` can be driven by a supervisor on another
//! thread without blocking on the in-flight cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;

use crate::{
    config::{FollowerConfig, LogLevel},
    error::{Error, Result},
    hash::{Byte32, ScriptHasher},
    rpc::RpcClient,
    storage::Storage,
    types::BlockView,
    Runtime,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowerState {
    Stopped,
    Running,
    Failed,
}

enum Delay {
    FastCatchup,
    NoNewBlock,
}

/// Owns the polling loop. `new` connects a read-only handle used for
/// status queries (`tip`); `start` spawns the writer thread, which opens
/// its own connection and is the sole path appending or rolling back.
pub struct ChainFollower {
    runtime: Runtime,
    database_url: String,
    rpc: Arc<dyn RpcClient>,
    hasher: Arc<dyn ScriptHasher>,
    config: FollowerConfig,
    status: Storage,
    state: Arc<RwLock<FollowerState>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ChainFollower {
    pub fn new(
        runtime: Runtime,
        database_url: &str,
        rpc: Arc<dyn RpcClient>,
        hasher: Arc<dyn ScriptHasher>,
        config: FollowerConfig,
    ) -> Result<Self> {
        let status = Storage::connect(Arc::clone(&runtime), database_url)?;
        status.initialize()?;
        Ok(Self {
            runtime,
            database_url: database_url.to_owned(),
            rpc,
            hasher,
            config,
            status,
            state: Arc::new(RwLock::new(FollowerState::Stopped)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }

    pub fn state(&self) -> FollowerState {
        *self.state.read()
    }

    pub fn running(&self) -> bool {
        self.state() == FollowerState::Running
    }

    pub fn tip(&self) -> Result<Option<u64>> {
        self.status.tip()
    }

    pub fn config_liveness_interval(&self) -> Duration {
        self.config.liveness_check_interval()
    }

    /// Spawns the writer thread if it isn't already running.
    pub fn start(&mut self) -> Result<()> {
        if self.running() {
            return Ok(());
        }
        self.stop_flag.store(false, Ordering::SeqCst);
        *self.state.write() = FollowerState::Running;

        let runtime = Arc::clone(&self.runtime);
        let database_url = self.database_url.clone();
        let rpc = Arc::clone(&self.rpc);
        let hasher = Arc::clone(&self.hasher);
        let config = self.config.clone();
        let state = Arc::clone(&self.state);
        let stop_flag = Arc::clone(&self.stop_flag);

        self.worker = Some(thread::spawn(move || {
            let mut storage = match Storage::connect(runtime, &database_url) {
                Ok(storage) => storage,
                Err(err) => {
                    log::error!("follower failed to connect: {}", err);
                    *state.write() = FollowerState::Failed;
                    return;
                }
            };
            if let Err(err) = storage.initialize() {
                log::error!("follower failed to initialize storage: {}", err);
                *state.write() = FollowerState::Failed;
                return;
            }
            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    *state.write() = FollowerState::Stopped;
                    return;
                }
                match tick(&mut storage, rpc.as_ref(), hasher.as_ref(), &config) {
                    Ok(Delay::FastCatchup) => thread::sleep(Duration::from_millis(1)),
                    Ok(Delay::NoNewBlock) => thread::sleep(config.poll_interval()),
                    Err(err) => {
                        log::error!("follower poll cycle failed: {}", err);
                        config.log(LogLevel::Error, &format!("poll cycle failed: {}", err));
                        *state.write() = FollowerState::Failed;
                        return;
                    }
                }
            }
        }));
        Ok(())
    }

    /// Requests the writer thread stop and waits for the in-flight cycle
    /// to finish.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        *self.state.write() = FollowerState::Stopped;
    }
}

/// What one poll cycle should do once the node's candidate next block (if
/// any) is known. Pulled out of `tick` as a pure function of the tip hash
/// and the node's answer, with no storage access, so the chain-following
/// decision itself is testable without a live store.
#[derive(Debug, PartialEq, Eq)]
enum NextStep {
    NoNewBlock,
    Append(BlockView),
    Rollback,
}

fn decide(tip_hash: &Byte32, next_block: Option<BlockView>) -> NextStep {
    match next_block {
        None => NextStep::NoNewBlock,
        Some(block) if &block.header.parent_hash == tip_hash => NextStep::Append(block),
        Some(_) => NextStep::Rollback,
    }
}

fn tick(
    storage: &mut Storage,
    rpc: &dyn RpcClient,
    hasher: &dyn ScriptHasher,
    config: &FollowerConfig,
) -> Result<Delay> {
    match storage.tip()? {
        None => {
            let block = rpc
                .get_block_by_number(0)?
                .ok_or_else(|| Error::Rpc("genesis block not available".to_owned()))?;
            storage.append(hasher, config, &block)?;
            Ok(Delay::FastCatchup)
        }
        Some(tip_number) => {
            let tip_hash = storage
                .block_hash(tip_number)?
                .ok_or_else(|| Error::Consistency(format!("tip block {} has no digest", tip_number)))?;
            let next = tip_number + 1;
            let next_block = rpc.get_block_by_number(next)?;
            match decide(&tip_hash, next_block) {
                NextStep::NoNewBlock => Ok(Delay::NoNewBlock),
                NextStep::Append(block) => {
                    storage.append(hasher, config, &block)?;
                    Ok(Delay::FastCatchup)
                }
                NextStep::Rollback => {
                    storage.rollback()?;
                    Ok(Delay::FastCatchup)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::FakeRpcClient;
    use crate::types::HeaderView;

    fn block(number: u64, hash: u8, parent_hash: u8) -> BlockView {
        BlockView {
            header: HeaderView {
                number,
                hash: [hash; 32].into(),
                parent_hash: [parent_hash; 32].into(),
                dao: Byte32::zero(),
                epoch: [0u8; 7],
                timestamp: 0,
            },
            transactions: Vec::new(),
        }
    }

    #[test]
    fn state_starts_stopped() {
        let state = Arc::new(RwLock::new(FollowerState::Stopped));
        assert_eq!(*state.read(), FollowerState::Stopped);
    }

    #[test]
    fn genesis_is_fetched_at_block_number_zero() {
        let rpc = FakeRpcClient::new();
        rpc.set_block(0, block(0, 0x01, 0x00));
        let fetched = rpc.get_block_by_number(0).unwrap();
        assert_eq!(fetched.unwrap().header.hash, Byte32::from([0x01; 32]));
    }

    #[test]
    fn no_next_block_means_wait() {
        let tip_hash: Byte32 = [0xaa; 32].into();
        assert_eq!(decide(&tip_hash, None), NextStep::NoNewBlock);
    }

    #[test]
    fn matching_parent_hash_appends() {
        let tip_hash: Byte32 = [0xaa; 32].into();
        let next = block(2, 0xbb, 0xaa);
        assert_eq!(decide(&tip_hash, Some(next.clone())), NextStep::Append(next));
    }

    #[test]
    fn mismatched_parent_hash_rolls_back() {
        let tip_hash: Byte32 = [0xaa; 32].into();
        let next = block(2, 0xbb, 0xff);
        assert_eq!(decide(&tip_hash, Some(next)), NextStep::Rollback);
    }
}
