// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{process, sync::Arc};

mod arguments;
mod error;

use kernel::{rpc::HttpRpcClient, Blake2bScriptHasher, ChainFollower, LogLevel, Supervisor};

fn main() {
    pretty_env_logger::init_timed();

    log::info!("begin to run ...");

    if let Err(error) = execute() {
        eprintln!("fatal: {}", error);
        process::exit(1);
    }

    log::info!("exit.");
}

fn execute() -> anyhow::Result<()> {
    let args = arguments::build_commandline()?;

    let mut config = kernel::FollowerConfig::default();
    config.set_poll_interval_seconds(*args.poll_interval_seconds());
    config.set_liveness_check_interval_seconds(*args.liveness_check_interval_seconds());
    config.set_keep_num(*args.keep_num());
    config.set_prune_interval(*args.prune_interval());
    let config = config
        .with_logger(|level, msg| match level {
            LogLevel::Info => log::info!("{}", msg),
            LogLevel::Error => log::error!("{}", msg),
        })
        .with_new_block_listener(|block| {
            log::info!(
                "new block {} {:#x}",
                block.header.number, block.header.hash
            );
        });

    let runtime = kernel::new_runtime()?;
    let rpc = HttpRpcClient::new(args.rpc_url().to_owned(), *args.rpc_timeout())?;
    let follower = ChainFollower::new(
        runtime,
        args.database_url(),
        Arc::new(rpc),
        Arc::new(Blake2bScriptHasher),
        config,
    )?;

    let mut supervisor = Supervisor::new(follower);
    supervisor.start_forever()?;
    Ok(())
}
