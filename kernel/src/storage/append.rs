// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Appends one block to the store inside a single transaction: block
//! digest, per-transaction digest/input rows, cell creation, script
//! interning, and the transaction/script index.

use super::interner;
use super::Storage;
use crate::{
    config::{FollowerConfig, LogLevel},
    error::{Error, Result},
    hash::{Byte32, ScriptHasher},
    postgres as pg,
    types::{BlockView, HeaderView},
};

const SCRIPT_TYPE_LOCK: i16 = 0;
const SCRIPT_TYPE_TYPE: i16 = 1;
const IO_TYPE_INPUT: i16 = 0;
const IO_TYPE_OUTPUT: i16 = 1;

impl Storage {
    /// Appends `block` in a single transaction. Fires the configured
    /// new-block listener after commit and triggers a prune when the
    /// block number lands on `pruneInterval`.
    pub fn append(
        &mut self,
        hasher: &dyn ScriptHasher,
        config: &FollowerConfig,
        block: &BlockView,
    ) -> Result<()> {
        log::trace!(
            "append block {} {:#x}",
            block.header.number,
            block.header.hash
        );
        let rt = self.runtime();
        if block.header.number > 0 && !rt.read().block_on(verify_parent(self.client(), &block.header))? {
            return Err(Error::UnknownParentBlock {
                number: block.header.number - 1,
                hash: block.header.parent_hash,
            });
        }
        let cli = self.mut_client();
        let txn = rt.read().block_on(cli.transaction())?;
        rt.read().block_on(async {
            insert_block_digest(&txn, &block.header).await?;
            for (tx_index, tx) in block.transactions.iter().enumerate() {
                let output_count = tx.outputs.len() as i32;
                let tx_id = insert_transaction_digest(
                    &txn,
                    &tx.hash,
                    tx_index as i32,
                    output_count,
                    block.header.number,
                )
                .await?;

                for (input_index, input) in tx.inputs.iter().enumerate() {
                    insert_transaction_input(
                        &txn,
                        tx_id,
                        &input.previous_output.tx_hash,
                        input.previous_output.index,
                        input_index as i64,
                    )
                    .await?;
                    if tx_index != 0 {
                        consume_cell(
                            &txn,
                            config,
                            tx_id,
                            input_index as i32,
                            &input.previous_output.tx_hash,
                            input.previous_output.index,
                        )
                        .await?;
                    }
                }

                for (output_index, output) in tx.outputs.iter().enumerate() {
                    let data = tx
                        .outputs_data
                        .get(output_index)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    let lock_id = interner::ensure_script(&txn, hasher, &output.lock).await?;
                    let type_id = match &output.type_ {
                        Some(script) => Some(interner::ensure_script(&txn, hasher, script).await?),
                        None => None,
                    };
                    insert_cell(
                        &txn,
                        &tx.hash,
                        output_index as i64,
                        block.header.number,
                        tx_index as i32,
                        output.capacity,
                        data,
                        lock_id,
                        type_id,
                    )
                    .await?;
                    insert_transaction_script(
                        &txn,
                        tx_id,
                        SCRIPT_TYPE_LOCK,
                        IO_TYPE_OUTPUT,
                        output_index as i32,
                        lock_id,
                    )
                    .await?;
                    if let Some(type_id) = type_id {
                        insert_transaction_script(
                            &txn,
                            tx_id,
                            SCRIPT_TYPE_TYPE,
                            IO_TYPE_OUTPUT,
                            output_index as i32,
                            type_id,
                        )
                        .await?;
                    }
                }
            }
            txn.commit().await.map_err(Into::<Error>::into)
        })?;

        config.notify_new_block(block);
        let prune_interval = *config.prune_interval();
        if prune_interval > 0 && block.header.number % prune_interval == 0 {
            self.prune(*config.keep_num())?;
        }
        Ok(())
    }
}

async fn verify_parent(cli: &pg::Client, header: &HeaderView) -> Result<bool> {
    let sql = r#"
        SELECT 1
          FROM block_digests
         WHERE block_number = $1
           AND block_hash = $2
    ;"#;
    cli.query_opt(
        sql,
        &[
            &(header.number as i64 - 1),
            &header.parent_hash.as_slice(),
        ],
    )
    .await
    .map(|row_opt| row_opt.is_some())
    .map_err(Into::into)
}

async fn insert_block_digest(txn: &pg::Transaction<'_>, header: &HeaderView) -> Result<u64> {
    log::trace!("insert block digest {:#x}", header.hash);
    let sql = r#"
        INSERT INTO block_digests (
            block_number, block_hash, epoch, dao, timestamp
        ) VALUES (
            $1, $2, $3, $4, $5
        )
    ;"#;
    txn.execute(
        sql,
        &[
            &(header.number as i64),
            &header.hash.as_slice(),
            &header.epoch.as_ref(),
            &header.dao.as_slice(),
            &(header.timestamp as i64),
        ],
    )
    .await
    .map_err(Into::into)
}

async fn insert_transaction_digest(
    txn: &pg::Transaction<'_>,
    tx_hash: &Byte32,
    tx_index: i32,
    output_count: i32,
    block_number: u64,
) -> Result<i64> {
    log::trace!("insert transaction digest {:#x}", tx_hash);
    let sql = r#"
        INSERT INTO transaction_digests (
            tx_hash, tx_index, output_count, block_number
        ) VALUES (
            $1, $2, $3, $4
        )
        RETURNING id
    ;"#;
    let row = txn
        .query_one(
            sql,
            &[
                &tx_hash.as_slice(),
                &tx_index,
                &output_count,
                &(block_number as i64),
            ],
        )
        .await?;
    row.try_get::<_, i64>(0).map_err(Into::into)
}

async fn insert_transaction_input(
    txn: &pg::Transaction<'_>,
    tx_id: i64,
    previous_tx_hash: &Byte32,
    previous_index: u32,
    input_index: i64,
) -> Result<u64> {
    let sql = r#"
        INSERT INTO transaction_inputs (
            transaction_digest_id, previous_tx_hash, previous_index, input_index
        ) VALUES (
            $1, $2, $3, $4
        )
    ;"#;
    txn.execute(
        sql,
        &[
            &tx_id,
            &previous_tx_hash.as_slice(),
            &(previous_index as i64),
            &input_index,
        ],
    )
    .await
    .map_err(Into::into)
}

/// Marks the cell referenced by `(previous_tx_hash, previous_index)` as
/// consumed and records its lock/type scripts as input entries in the
/// transaction/script index. A missing referenced cell is a consistency
/// error: logged, the append continues regardless (it may legally occur
/// only once pruning has already removed the cell).
async fn consume_cell(
    txn: &pg::Transaction<'_>,
    config: &FollowerConfig,
    tx_id: i64,
    input_index: i32,
    previous_tx_hash: &Byte32,
    previous_index: u32,
) -> Result<()> {
    let sql = r#"
        UPDATE cells
           SET consumed = true
         WHERE tx_hash = $1
           AND index = $2
           AND consumed = false
        RETURNING lock_script_id, type_script_id
    ;"#;
    let row_opt = txn
        .query_opt(
            sql,
            &[&previous_tx_hash.as_slice(), &(previous_index as i64)],
        )
        .await?;
    match row_opt {
        Some(row) => {
            let lock_id: i64 = row.try_get(0)?;
            let type_id: Option<i64> = row.try_get(1)?;
            insert_transaction_script(txn, tx_id, SCRIPT_TYPE_LOCK, IO_TYPE_INPUT, input_index, lock_id)
                .await?;
            if let Some(type_id) = type_id {
                insert_transaction_script(
                    txn,
                    tx_id,
                    SCRIPT_TYPE_TYPE,
                    IO_TYPE_INPUT,
                    input_index,
                    type_id,
                )
                .await?;
            }
            Ok(())
        }
        None => {
            let msg = format!(
                "consistency error: no live cell for input {:#x}:{}",
                previous_tx_hash, previous_index
            );
            log::error!("{}", msg);
            config.log(LogLevel::Error, &msg);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_cell(
    txn: &pg::Transaction<'_>,
    tx_hash: &Byte32,
    index: i64,
    block_number: u64,
    tx_index: i32,
    capacity: u64,
    data: &[u8],
    lock_script_id: i64,
    type_script_id: Option<i64>,
) -> Result<u64> {
    let udt_amount = crate::codec::data_le_to_u128_decimal(data);
    let sql = r#"
        INSERT INTO cells (
            tx_hash, index, block_number, tx_index, capacity, data,
            udt_amount, lock_script_id, type_script_id, consumed
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, false
        )
    ;"#;
    txn.execute(
        sql,
        &[
            &tx_hash.as_slice(),
            &index,
            &(block_number as i64),
            &tx_index,
            &(capacity as i64),
            &data,
            &udt_amount,
            &lock_script_id,
            &type_script_id,
        ],
    )
    .await
    .map_err(Into::into)
}

async fn insert_transaction_script(
    txn: &pg::Transaction<'_>,
    tx_id: i64,
    script_type: i16,
    io_type: i16,
    index: i32,
    script_id: i64,
) -> Result<u64> {
    let sql = r#"
        INSERT INTO transactions_scripts (
            transaction_digest_id, script_type, io_type, index, script_id
        ) VALUES (
            $1, $2, $3, $4, $5
        )
    ;"#;
    txn.execute(sql, &[&tx_id, &script_type, &io_type, &index, &script_id])
        .await
        .map_err(Into::into)
}
