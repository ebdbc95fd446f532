// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A thin liveness watchdog: starts the follower, wakes up periodically,
//! and restarts it if it has stopped running.

use std::thread;

use crate::follower::ChainFollower;

pub struct Supervisor {
    follower: ChainFollower,
}

impl Supervisor {
    pub fn new(follower: ChainFollower) -> Self {
        Self { follower }
    }

    pub fn follower(&self) -> &ChainFollower {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut ChainFollower {
        &mut self.follower
    }

    /// Starts the follower and loops forever, checking liveness every
    /// `livenessCheckIntervalSeconds` and restarting on failure.
    pub fn start_forever(&mut self) -> crate::error::Result<()> {
        self.follower.start()?;
        loop {
            thread::sleep(self.follower_liveness_interval());
            self.tick();
        }
    }

    /// One liveness check: restart a non-running follower, otherwise log
    /// the current tip. Split out from `start_forever`'s infinite loop so
    /// the check itself stays a single, callable step.
    pub(crate) fn tick(&mut self) {
        if !self.follower.running() {
            log::error!("follower is not running, restarting");
            if let Err(err) = self.follower.start() {
                log::error!("failed to restart follower: {}", err);
            }
        } else {
            match self.follower.tip() {
                Ok(tip) => log::info!("follower is running, current tip is {:?}", tip),
                Err(err) => log::error!("failed to read current tip: {}", err),
            }
        }
    }

    fn follower_liveness_interval(&self) -> std::time::Duration {
        // the follower carries the config the supervisor was built from
        self.follower.config_liveness_interval()
    }
}
