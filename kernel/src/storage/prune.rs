// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bounded-history garbage collection: drops consumed cells and their
//! spending inputs older than `tip - keepNum`. Block/transaction digests
//! and the transaction/script index are retained for lookup.

use super::{schema, Storage};
use crate::{error::Result, postgres as pg};

impl Storage {
    /// Prunes consumed cells and their inputs below `tip - keep_num`. A
    /// no-op while the chain hasn't grown past `keep_num` yet.
    pub fn prune(&self, keep_num: u64) -> Result<()> {
        let cli = self.client();
        let tip = match self.block_on(schema::check_current_block(cli))? {
            Some(tip) => tip,
            None => return Ok(()),
        };
        if tip <= keep_num {
            return Ok(());
        }
        let prune_below = tip - keep_num;
        log::trace!("prune below block {}", prune_below);
        self.block_on(async {
            remove_consumed_cells(cli, prune_below).await?;
            remove_old_transaction_inputs(cli, prune_below).await?;
            Ok(())
        })
    }
}

async fn remove_consumed_cells(cli: &pg::Client, prune_below: u64) -> Result<u64> {
    let sql = r#"
        DELETE FROM cells
         WHERE consumed = true
           AND block_number < $1
    ;"#;
    cli.execute(sql, &[&(prune_below as i64)])
        .await
        .map_err(Into::into)
}

async fn remove_old_transaction_inputs(cli: &pg::Client, prune_below: u64) -> Result<u64> {
    let sql = r#"
        DELETE FROM transaction_inputs ti
          USING transaction_digests td
         WHERE ti.transaction_digest_id = td.id
           AND td.block_number < $1
    ;"#;
    cli.execute(sql, &[&(prune_below as i64)])
        .await
        .map_err(Into::into)
}
