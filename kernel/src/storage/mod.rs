// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{future::Future, sync::Arc};

use property::Property;

use crate::{error::Result, postgres as pg, Runtime};

mod append;
mod interner;
mod prune;
mod query;
mod rollback;
mod schema;

pub(crate) use query::hash_from_row;

/// A handle to the relational store. The chain follower holds the only
/// write path; `Storage::collector_handle` opens a second connection for
/// read-only collector use, so collectors never contend with an
/// in-progress append's open transaction.
#[derive(Property)]
#[property(get(public), set(disable), mut(crate))]
pub struct Storage {
    client: pg::Client,
    #[property(get(disable))]
    runtime: Runtime,
    #[property(get(disable))]
    database_url: String,
}

impl Storage {
    pub fn connect(rt: Runtime, database_url: &str) -> Result<Self> {
        let client = Self::open_connection(&rt, database_url)?;
        Ok(Self {
            client,
            runtime: rt,
            database_url: database_url.to_owned(),
        })
    }

    /// Opens a second, independent connection sharing this store's runtime
    /// and URL, intended for a read-only collector so it observes a
    /// consistent snapshot without blocking on the follower's writer
    /// connection.
    pub fn collector_handle(&self) -> Result<Self> {
        let client = Self::open_connection(&self.runtime, &self.database_url)?;
        Ok(Self {
            client,
            runtime: Arc::clone(&self.runtime),
            database_url: self.database_url.clone(),
        })
    }

    fn open_connection(rt: &Runtime, database_url: &str) -> Result<pg::Client> {
        let (client, connection) = rt.read().block_on(pg::connect(database_url, pg::NoTls))?;
        rt.read().spawn(async {
            if let Err(err) = connection.await {
                log::error!("connection error: {}", err);
            }
        });
        Ok(client)
    }

    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        log::trace!("block on a future");
        self.runtime().read().block_on(future)
    }

    pub fn runtime(&self) -> Runtime {
        Arc::clone(&self.runtime)
    }
}
