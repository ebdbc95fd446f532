// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;
use std::time::Duration;

use property::Property;

use crate::error::{Error, Result};

/// Parsed command-line configuration: node/store connection info plus
/// the follower's enumerated knobs, each overridable and otherwise
/// defaulting to `kernel::FollowerConfig::default()`'s values.
#[derive(Property)]
pub(crate) struct Arguments {
    rpc_url: String,
    database_url: String,
    rpc_timeout: Duration,
    poll_interval_seconds: u64,
    liveness_check_interval_seconds: u64,
    keep_num: u64,
    prune_interval: u64,
}

pub(crate) fn build_commandline() -> Result<Arguments> {
    let yaml = clap::load_yaml!("cli.yaml");
    let matches = clap::App::from_yaml(yaml)
        .version(clap::crate_version!())
        .author(clap::crate_authors!("\n"))
        .get_matches();
    Arguments::try_from(&matches)
}

fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| Error::Unreachable(format!("no argument '{}'", name)))
}

fn parse<'a, T>(matches: &'a clap::ArgMatches, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    required(matches, name)?
        .parse()
        .map_err(|err| Error::Argument(format!("'{}': {}", name, err)))
}

impl<'a> TryFrom<&'a clap::ArgMatches<'a>> for Arguments {
    type Error = Error;

    fn try_from(matches: &'a clap::ArgMatches) -> Result<Self> {
        let rpc_url = required(matches, "rpc-url")?.to_owned();
        let database_url = required(matches, "database-url")?.to_owned();
        let rpc_timeout = Duration::from_secs(parse(matches, "rpc-timeout-secs")?);
        let poll_interval_seconds = parse(matches, "poll-interval-seconds")?;
        let liveness_check_interval_seconds = parse(matches, "liveness-check-interval-seconds")?;
        let keep_num = parse(matches, "keep-num")?;
        let prune_interval = parse(matches, "prune-interval")?;
        Ok(Self {
            rpc_url,
            database_url,
            rpc_timeout,
            poll_interval_seconds,
            liveness_check_interval_seconds,
            keep_num,
            prune_interval,
        })
    }
}
