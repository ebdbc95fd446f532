// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Intersects up to four independent script filters over the
//! transaction/script index and fetches matching transaction bodies
//! from the node.

use std::collections::HashSet;
use std::convert::TryFrom;

use crate::{
    codec,
    error::{Error, Result},
    hash::Byte32,
    rpc::RpcClient,
    storage::Storage,
    types::{Script, TransactionView, TransactionWithStatus},
};

const SCRIPT_TYPE_LOCK: i16 = 0;
const SCRIPT_TYPE_TYPE: i16 = 1;
const IO_TYPE_INPUT: i16 = 0;
const IO_TYPE_OUTPUT: i16 = 1;

/// The four independent filters a transaction collection may combine.
/// Every populated filter narrows the result; the collector returns the
/// ordered intersection.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub input_lock: Option<Script>,
    pub output_lock: Option<Script>,
    pub input_type: Option<Script>,
    pub output_type: Option<Script>,
}

impl TransactionFilter {
    pub fn validate(&self) -> Result<()> {
        if self.input_lock.is_none()
            && self.output_lock.is_none()
            && self.input_type.is_none()
            && self.output_type.is_none()
        {
            return Err(Error::Validation(
                "transaction collector requires at least one filter".to_owned(),
            ));
        }
        for script in [
            &self.input_lock,
            &self.output_lock,
            &self.input_type,
            &self.output_type,
        ]
        .iter()
        .filter_map(|s| s.as_ref())
        {
            script.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TransactionCollectorOptions {
    pub skip_missing: bool,
    pub include_status: bool,
}

impl Default for TransactionCollectorOptions {
    fn default() -> Self {
        Self {
            skip_missing: false,
            include_status: true,
        }
    }
}

#[derive(Clone, Debug)]
pub enum TransactionResult {
    WithStatus(TransactionWithStatus),
    Body(TransactionView),
}

pub struct TransactionCollector<'a> {
    storage: &'a Storage,
    rpc: &'a dyn RpcClient,
    filter: TransactionFilter,
    options: TransactionCollectorOptions,
}

impl<'a> TransactionCollector<'a> {
    pub fn new(
        storage: &'a Storage,
        rpc: &'a dyn RpcClient,
        filter: TransactionFilter,
        options: TransactionCollectorOptions,
    ) -> Result<Self> {
        filter.validate()?;
        Ok(Self {
            storage,
            rpc,
            filter,
            options,
        })
    }

    pub fn collect(&self) -> Result<Vec<TransactionResult>> {
        let mut sets = Vec::with_capacity(4);
        if let Some(script) = &self.filter.input_lock {
            sets.push(self.fetch_tx_hashes(SCRIPT_TYPE_LOCK, IO_TYPE_INPUT, script)?);
        }
        if let Some(script) = &self.filter.output_lock {
            sets.push(self.fetch_tx_hashes(SCRIPT_TYPE_LOCK, IO_TYPE_OUTPUT, script)?);
        }
        if let Some(script) = &self.filter.input_type {
            sets.push(self.fetch_tx_hashes(SCRIPT_TYPE_TYPE, IO_TYPE_INPUT, script)?);
        }
        if let Some(script) = &self.filter.output_type {
            sets.push(self.fetch_tx_hashes(SCRIPT_TYPE_TYPE, IO_TYPE_OUTPUT, script)?);
        }

        let hashes = intersect_preserving_order(sets);

        let mut results = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let hex_hash = codec::bytes_to_hex(hash.as_slice());
            match self.rpc.get_transaction(&hex_hash)? {
                Some(with_status) => results.push(if self.options.include_status {
                    TransactionResult::WithStatus(with_status)
                } else {
                    TransactionResult::Body(with_status.transaction)
                }),
                None if self.options.skip_missing => continue,
                None => return Err(Error::MissingTransaction(hash)),
            }
        }
        Ok(results)
    }

    fn fetch_tx_hashes(&self, script_type: i16, io_type: i16, script: &Script) -> Result<Vec<Byte32>> {
        let sql = r#"
            SELECT DISTINCT td.tx_hash, td.block_number, td.tx_index
              FROM transaction_digests td
              JOIN transactions_scripts tsx ON tsx.transaction_digest_id = td.id
              JOIN scripts s ON s.id = tsx.script_id
             WHERE tsx.script_type = $1
               AND tsx.io_type = $2
               AND s.code_hash = $3
               AND s.hash_type = $4
               AND s.args = $5
             ORDER BY td.block_number, td.tx_index
        ;"#;
        let hash_type = script.hash_type as i16;
        let cli = self.storage.client();
        let rows = self.storage.block_on(cli.query(
            sql,
            &[
                &script_type,
                &io_type,
                &script.code_hash.as_slice(),
                &hash_type,
                &script.args,
            ],
        ))?;
        rows.iter()
            .map(|row| Byte32::try_from(row.try_get::<_, Vec<u8>>(0)?))
            .collect()
    }
}

/// Intersects filter result sets, seeding the accumulator with the first
/// populated set rather than an empty one (an empty seed would force
/// every intersection to come out empty, which isn't the intended
/// semantics of "no filter supplied yet").
fn intersect_preserving_order(sets: Vec<Vec<Byte32>>) -> Vec<Byte32> {
    let mut iter = sets.into_iter();
    let first = match iter.next() {
        Some(set) => set,
        None => return Vec::new(),
    };
    iter.fold(first, |accumulator, set| {
        let allowed: HashSet<Byte32> = set.into_iter().collect();
        accumulator
            .into_iter()
            .filter(|hash| allowed.contains(hash))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> Byte32 {
        [byte; 32].into()
    }

    #[test]
    fn validate_rejects_an_empty_filter() {
        let filter = TransactionFilter::default();
        assert!(filter.validate().is_err());
    }

    #[test]
    fn intersection_is_seeded_by_the_first_set_not_empty() {
        let sets = vec![vec![hash(1), hash(2), hash(3)]];
        assert_eq!(intersect_preserving_order(sets), vec![hash(1), hash(2), hash(3)]);
    }

    #[test]
    fn intersection_narrows_across_sets_preserving_first_order() {
        let sets = vec![
            vec![hash(1), hash(2), hash(3)],
            vec![hash(3), hash(1)],
        ];
        assert_eq!(intersect_preserving_order(sets), vec![hash(1), hash(3)]);
    }

    #[test]
    fn intersection_of_no_sets_is_empty() {
        let sets: Vec<Vec<Byte32>> = Vec::new();
        assert!(intersect_preserving_order(sets).is_empty());
    }
}
