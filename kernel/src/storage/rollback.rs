// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Undoes exactly the current tip block: restores cells it consumed,
//! drops the rows it created. Called once per reorg step; repeated calls
//! unwind deeper forks one block at a time.

use super::{schema, Storage};
use crate::{
    error::{Error, Result},
    postgres as pg,
};

impl Storage {
    /// Removes the current tip block, restoring the cells it consumed. A
    /// no-op if the store is empty.
    pub fn rollback(&mut self) -> Result<()> {
        let rt = self.runtime();
        let number = match rt.read().block_on(schema::check_current_block(self.client()))? {
            Some(number) => number,
            None => return Ok(()),
        };
        log::trace!("rollback block {}", number);
        let cli = self.mut_client();
        let txn = rt.read().block_on(cli.transaction())?;
        rt.read().block_on(async {
            let transactions = fetch_transaction_digests(&txn, number).await?;
            for (tx_id, tx_index) in transactions {
                if tx_index > 0 {
                    restore_consumed_cells(&txn, tx_id).await?;
                }
                remove_transaction_inputs(&txn, tx_id).await?;
                remove_transactions_scripts(&txn, tx_id).await?;
            }
            remove_cells_for_block(&txn, number).await?;
            remove_transaction_digests(&txn, number).await?;
            remove_block_digest(&txn, number).await?;
            txn.commit().await.map_err(Into::<Error>::into)
        })?;
        Ok(())
    }
}

async fn fetch_transaction_digests(
    txn: &pg::Transaction<'_>,
    block_number: u64,
) -> Result<Vec<(i64, i32)>> {
    let sql = r#"
        SELECT id, tx_index
          FROM transaction_digests
         WHERE block_number = $1
         ORDER BY tx_index
    ;"#;
    let rows = txn.query(sql, &[&(block_number as i64)]).await?;
    rows.iter()
        .map(|row| Ok((row.try_get::<_, i64>(0)?, row.try_get::<_, i32>(1)?)))
        .collect()
}

async fn restore_consumed_cells(txn: &pg::Transaction<'_>, tx_id: i64) -> Result<u64> {
    let sql = r#"
        UPDATE cells
           SET consumed = false
         WHERE (tx_hash, index) IN (
             SELECT previous_tx_hash, previous_index
               FROM transaction_inputs
              WHERE transaction_digest_id = $1
         )
    ;"#;
    txn.execute(sql, &[&tx_id]).await.map_err(Into::into)
}

async fn remove_transaction_inputs(txn: &pg::Transaction<'_>, tx_id: i64) -> Result<u64> {
    txn.execute(
        "DELETE FROM transaction_inputs WHERE transaction_digest_id = $1;",
        &[&tx_id],
    )
    .await
    .map_err(Into::into)
}

async fn remove_transactions_scripts(txn: &pg::Transaction<'_>, tx_id: i64) -> Result<u64> {
    txn.execute(
        "DELETE FROM transactions_scripts WHERE transaction_digest_id = $1;",
        &[&tx_id],
    )
    .await
    .map_err(Into::into)
}

async fn remove_cells_for_block(txn: &pg::Transaction<'_>, block_number: u64) -> Result<u64> {
    txn.execute(
        "DELETE FROM cells WHERE block_number = $1;",
        &[&(block_number as i64)],
    )
    .await
    .map_err(Into::into)
}

async fn remove_transaction_digests(txn: &pg::Transaction<'_>, block_number: u64) -> Result<u64> {
    txn.execute(
        "DELETE FROM transaction_digests WHERE block_number = $1;",
        &[&(block_number as i64)],
    )
    .await
    .map_err(Into::into)
}

async fn remove_block_digest(txn: &pg::Transaction<'_>, block_number: u64) -> Result<u64> {
    txn.execute(
        "DELETE FROM block_digests WHERE block_number = $1;",
        &[&(block_number as i64)],
    )
    .await
    .map_err(Into::into)
}
