// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Runtime as RawRuntime;

pub use tokio_postgres as postgres;

pub mod codec;
pub mod collector;
pub mod config;
pub mod error;
pub mod follower;
pub mod hash;
pub mod rpc;
pub mod supervisor;
pub mod types;

mod storage;

pub use config::{FollowerConfig, LogLevel};
pub use follower::{ChainFollower, FollowerState};
pub use hash::{Blake2bScriptHasher, Byte32, ScriptHasher};
pub use rpc::RpcClient;
pub use storage::Storage;
pub use supervisor::Supervisor;

/// A runtime shared between the store and the follower. Wrapped in a
/// `parking_lot::RwLock` so a future caller could in principle swap the
/// runtime out; in practice every call site only ever takes `.read()`,
/// since the follower is a single writer and never mutates the runtime
/// itself.
pub(crate) type Runtime = Arc<RwLock<RawRuntime>>;

pub fn new_runtime() -> error::Result<Runtime> {
    RawRuntime::new()
        .map(RwLock::new)
        .map(Arc::new)
        .map_err(|err| error::Error::Rpc(format!("failed to start tokio runtime: {}", err)))
}
