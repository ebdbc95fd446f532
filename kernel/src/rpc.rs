// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The node's RPC interface, treated as an opaque source of blocks and
//! transactions. `RpcClient` is the contract the follower and transaction
//! collector depend on; `HttpRpcClient` is a minimal JSON-RPC 2.0
//! implementation over `reqwest`'s blocking client, since the transport
//! itself is explicitly out of scope for this crate's core engineering.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::types::{BlockView, TransactionWithStatus};

pub trait RpcClient: Send + Sync {
    fn get_block_by_number(&self, number: u64) -> Result<Option<BlockView>>;
    fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionWithStatus>>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A blocking JSON-RPC 2.0 client over HTTP, with a bounded request
/// timeout per the concurrency model's requirement that RPC calls not
/// block indefinitely.
pub struct HttpRpcClient {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Rpc(format!("failed to build http client: {}", err)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|err| Error::Rpc(format!("{} request failed: {}", method, err)))?;
        let body: JsonRpcResponse<T> = response
            .json()
            .map_err(|err| Error::Rpc(format!("{} response malformed: {}", method, err)))?;
        if let Some(error) = body.error {
            return Err(Error::Rpc(format!(
                "{} returned error {}: {}",
                method, error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| Error::Rpc(format!("{} returned no result and no error", method)))
    }
}

impl RpcClient for HttpRpcClient {
    fn get_block_by_number(&self, number: u64) -> Result<Option<BlockView>> {
        self.call("get_block_by_number", json!([format!("0x{:x}", number)]))
    }

    fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionWithStatus>> {
        self.call("get_transaction", json!([tx_hash]))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! An in-memory `RpcClient` used by follower/collector unit tests, so
    //! chain-following logic can be exercised without a live node.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeRpcClient {
        blocks: Mutex<HashMap<u64, BlockView>>,
        transactions: Mutex<HashMap<String, TransactionWithStatus>>,
    }

    impl FakeRpcClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_block(&self, number: u64, block: BlockView) {
            self.blocks.lock().unwrap().insert(number, block);
        }

        pub fn remove_block(&self, number: u64) {
            self.blocks.lock().unwrap().remove(&number);
        }

        pub fn set_transaction(&self, tx_hash: String, tx: TransactionWithStatus) {
            self.transactions.lock().unwrap().insert(tx_hash, tx);
        }
    }

    impl RpcClient for FakeRpcClient {
        fn get_block_by_number(&self, number: u64) -> Result<Option<BlockView>> {
            Ok(self.blocks.lock().unwrap().get(&number).cloned())
        }

        fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionWithStatus>> {
            Ok(self.transactions.lock().unwrap().get(tx_hash).cloned())
        }
    }
}
