// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Follower configuration: the enumerated knobs plus the two process-wide
//! callbacks (logger, new-block listener), passed in explicitly rather
//! than reached for via ambient globals.

use std::sync::Arc;
use std::time::Duration;

use property::Property;

use crate::types::BlockView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

pub type LoggerFn = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;
pub type NewBlockListenerFn = Arc<dyn Fn(&BlockView) + Send + Sync>;

/// Configuration for the chain follower and supervisor, mirroring the
/// enumerated knobs: polling/liveness cadence, retained-history depth,
/// prune cadence, plus the logger and new-block-listener callbacks.
#[derive(Clone, Property)]
#[property(get(public), set(public), mut(disable))]
pub struct FollowerConfig {
    poll_interval_seconds: u64,
    liveness_check_interval_seconds: u64,
    keep_num: u64,
    prune_interval: u64,
    #[property(get(disable), set(disable))]
    logger: Option<LoggerFn>,
    #[property(get(disable), set(disable))]
    new_block_listener: Option<NewBlockListenerFn>,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 2,
            liveness_check_interval_seconds: 5,
            keep_num: 10_000,
            prune_interval: 2_000,
            logger: None,
            new_block_listener: None,
        }
    }
}

impl FollowerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn liveness_check_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_check_interval_seconds)
    }

    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn with_new_block_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&BlockView) + Send + Sync + 'static,
    {
        self.new_block_listener = Some(Arc::new(listener));
        self
    }

    /// Calls the configured logger callback, if any, in addition to the
    /// `log` crate macros the follower already emits at each call site.
    pub(crate) fn log(&self, level: LogLevel, msg: &str) {
        if let Some(logger) = &self.logger {
            logger(level, msg);
        }
    }

    pub(crate) fn notify_new_block(&self, block: &BlockView) {
        if let Some(listener) = &self.new_block_listener {
            listener(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_have_expected_values() {
        let config = FollowerConfig::default();
        assert_eq!(config.poll_interval_seconds(), &2);
        assert_eq!(config.liveness_check_interval_seconds(), &5);
        assert_eq!(config.keep_num(), &10_000);
        assert_eq!(config.prune_interval(), &2_000);
    }

    #[test]
    fn logger_callback_is_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let config = FollowerConfig::default().with_logger(move |_level, _msg| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        config.log(LogLevel::Info, "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
