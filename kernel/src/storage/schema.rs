// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Table creation/teardown and the tip lookup. Migrations are a batch of
//! `CREATE TABLE IF NOT EXISTS`/`DROP TABLE IF EXISTS` statements run
//! concurrently via `try_join_all`, the same inline-SQL convention this
//! codebase already uses rather than an external migration framework.

use futures::future::try_join_all;

use super::Storage;
use crate::{error::Result, postgres as pg};

const TABLES: &[&str] = &[
    "block_digests",
    "transaction_digests",
    "transaction_inputs",
    "transactions_scripts",
    "cells",
    "scripts",
];

pub(super) async fn is_first_run(cli: &pg::Client) -> Result<bool> {
    log::trace!("check if is the first run");
    cli.query("SELECT 1 FROM block_digests;", &[])
        .await
        .map(|_| false)
        .or_else(|err| {
            let undefined = err
                .code()
                .map(|s| *s == pg::error::SqlState::UNDEFINED_TABLE)
                .unwrap_or(false);
            if undefined {
                Ok(true)
            } else {
                Err(err)
            }
        })
        .map_err(Into::into)
}

pub(super) async fn create_tables(cli: &pg::Client) -> Result<Vec<u64>> {
    log::trace!("create all tables");
    let sqls: Vec<&str> = vec![
        r#"
        CREATE TABLE IF NOT EXISTS block_digests (
            block_number    BIGINT      NOT NULL PRIMARY KEY,
            block_hash      BYTEA       NOT NULL,
            epoch           BYTEA       NOT NULL,
            dao             BYTEA       NOT NULL,
            timestamp       BIGINT      NOT NULL
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS transaction_digests (
            id              BIGSERIAL   PRIMARY KEY,
            tx_hash         BYTEA       NOT NULL UNIQUE,
            tx_index        INTEGER     NOT NULL,
            output_count    INTEGER     NOT NULL,
            block_number    BIGINT      NOT NULL,
            UNIQUE (block_number, tx_index)
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS transaction_inputs (
            transaction_digest_id   BIGINT      NOT NULL,
            previous_tx_hash        BYTEA       NOT NULL,
            previous_index          BIGINT      NOT NULL,
            input_index             BIGINT      NOT NULL,
            PRIMARY KEY (transaction_digest_id, input_index)
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS scripts (
            id              BIGSERIAL   PRIMARY KEY,
            code_hash       BYTEA       NOT NULL,
            hash_type       SMALLINT    NOT NULL,
            args            BYTEA       NOT NULL,
            script_hash     BYTEA       NOT NULL,
            UNIQUE (code_hash, hash_type, args)
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS cells (
            id              BIGSERIAL   PRIMARY KEY,
            tx_hash         BYTEA       NOT NULL,
            index           BIGINT      NOT NULL,
            block_number    BIGINT      NOT NULL,
            tx_index        INTEGER     NOT NULL,
            capacity        BIGINT      NOT NULL,
            data            BYTEA       NOT NULL,
            udt_amount      TEXT        NOT NULL,
            lock_script_id  BIGINT      NOT NULL REFERENCES scripts (id),
            type_script_id  BIGINT      REFERENCES scripts (id),
            consumed        BOOLEAN     NOT NULL DEFAULT FALSE,
            UNIQUE (tx_hash, index)
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS transactions_scripts (
            transaction_digest_id   BIGINT      NOT NULL,
            script_type             SMALLINT    NOT NULL,
            io_type                 SMALLINT    NOT NULL,
            index                   INTEGER     NOT NULL,
            script_id                BIGINT      NOT NULL
        );"#,
    ];
    let futures = sqls.into_iter().map(|sql| cli.execute(sql, &[]));
    let mut results = try_join_all(futures).await?;

    let index_sqls: Vec<&str> = vec![
        "CREATE INDEX IF NOT EXISTS idx_cells_live_order ON cells (consumed, block_number, tx_index, index);",
        "CREATE INDEX IF NOT EXISTS idx_cells_lock_script ON cells (lock_script_id);",
        "CREATE INDEX IF NOT EXISTS idx_cells_type_script ON cells (type_script_id);",
        "CREATE INDEX IF NOT EXISTS idx_transaction_digests_order ON transaction_digests (block_number, tx_index);",
        "CREATE INDEX IF NOT EXISTS idx_transactions_scripts_lookup ON transactions_scripts (script_id, script_type, io_type);",
        "CREATE INDEX IF NOT EXISTS idx_scripts_lookup ON scripts (code_hash, hash_type, args);",
    ];
    let index_futures = index_sqls.into_iter().map(|sql| cli.execute(sql, &[]));
    results.extend(try_join_all(index_futures).await?);
    Ok(results)
}

pub(super) async fn drop_tables(cli: &pg::Client) -> Result<Vec<u64>> {
    log::trace!("drop all tables");
    let futures = TABLES.iter().map(|name| drop_table(cli, name));
    try_join_all(futures).await
}

pub(super) async fn drop_table(cli: &pg::Client, table: &str) -> Result<u64> {
    let sql = format!("DROP TABLE IF EXISTS {};", table);
    cli.execute(sql.as_str(), &[]).await.map_err(Into::into)
}

pub(super) async fn check_current_block(cli: &pg::Client) -> Result<Option<u64>> {
    log::trace!("check the number of the current tip block");
    cli.query_one("SELECT MAX(block_number) FROM block_digests;", &[])
        .await
        .and_then(|row| {
            row.try_get::<_, Option<i64>>(0)
                .map(|num_opt| num_opt.map(|num| num as u64))
        })
        .map_err(Into::into)
}

pub(super) async fn block_hash(cli: &pg::Client, number: u64) -> Result<Option<crate::hash::Byte32>> {
    let sql = "SELECT block_hash FROM block_digests WHERE block_number = $1;";
    cli.query_opt(sql, &[&(number as i64)])
        .await?
        .map(|row| super::hash_from_row(&row, 0))
        .transpose()
}

impl Storage {
    /// Creates the schema on first run and returns the current tip block
    /// number, or `None` if the store is empty.
    pub fn initialize(&self) -> Result<Option<u64>> {
        log::trace!("initialize the storage");
        let cli = self.client();
        self.block_on(async {
            if is_first_run(cli).await? {
                create_tables(cli).await?;
            }
            check_current_block(cli).await
        })
    }

    pub fn destroy(&self) -> Result<Vec<u64>> {
        log::trace!("destroy the storage");
        let cli = self.client();
        self.block_on(drop_tables(cli))
    }

    pub fn tip(&self) -> Result<Option<u64>> {
        let cli = self.client();
        self.block_on(check_current_block(cli))
    }

    /// Hash of the block at `number`, if the store still retains it.
    pub fn block_hash(&self, number: u64) -> Result<Option<crate::hash::Byte32>> {
        let cli = self.client();
        self.block_on(block_hash(cli, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_list_matches_the_schema() {
        assert_eq!(TABLES.len(), 6);
        assert!(TABLES.contains(&"cells"));
        assert!(TABLES.contains(&"scripts"));
    }
}
