// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compiles a lock/type/data filter into one ordered SQL scan over live
//! cells and materializes rich cell records.

use std::convert::TryFrom;

use crate::{
    error::{Error, Result},
    hash::Byte32,
    postgres as pg,
    storage::Storage,
    types::{HashType, Script},
};

use super::params::Params;

/// The `type` filter's three-way shape: unset, the `"empty"` sentinel
/// (no type script at all), or a concrete script to match against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeFilter {
    None,
    Empty,
    Script(Script),
}

/// Construction options for the cell collector. At least one of `lock`
/// or `type_filter` must be populated.
#[derive(Clone, Debug)]
pub struct CellFilter {
    lock: Option<Script>,
    type_filter: TypeFilter,
    args_len: i64,
    data: Option<Vec<u8>>,
}

impl CellFilter {
    pub fn new(
        lock: Option<Script>,
        type_filter: TypeFilter,
        args_len: i64,
        data: Option<Vec<u8>>,
    ) -> Result<Self> {
        if lock.is_none() && type_filter == TypeFilter::None {
            return Err(Error::Validation(
                "cell collector requires a lock or type filter".to_owned(),
            ));
        }
        if let Some(script) = &lock {
            script.validate()?;
        }
        if let TypeFilter::Script(script) = &type_filter {
            script.validate()?;
        }
        Ok(Self {
            lock,
            type_filter,
            args_len,
            data,
        })
    }
}

/// A materialized live cell, resolved with its lock and optional type
/// script bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RichCell {
    pub tx_hash: Byte32,
    pub index: u64,
    pub block_hash: Byte32,
    pub block_number: u64,
    pub capacity: u64,
    pub data: Vec<u8>,
    pub lock: Script,
    pub type_: Option<Script>,
}

pub struct CellCollector<'a> {
    storage: &'a Storage,
    filter: CellFilter,
}

impl<'a> CellCollector<'a> {
    pub fn new(storage: &'a Storage, filter: CellFilter) -> Self {
        Self { storage, filter }
    }

    /// Runs the filter with no ordering and returns the row count.
    pub fn count(&self) -> Result<u64> {
        let (conditions, params) = build_conditions(&self.filter);
        let sql = format!(
            r#"
            SELECT COUNT(*)
              FROM cells c
              JOIN scripts ls ON ls.id = c.lock_script_id
         LEFT JOIN scripts ts ON ts.id = c.type_script_id
             WHERE {}
            ;"#,
            conditions.join(" AND ")
        );
        let cli = self.storage.client();
        let refs = params.as_refs();
        let count: i64 = self
            .storage
            .block_on(cli.query_one(sql.as_str(), &refs[..]))?
            .try_get(0)?;
        Ok(count as u64)
    }

    /// Runs the filter ordered by `(block_number, tx_index, index)` and
    /// materializes every matching live cell.
    pub fn collect(&self) -> Result<Vec<RichCell>> {
        let (conditions, params) = build_conditions(&self.filter);
        let sql = format!(
            r#"
            SELECT c.tx_hash, c.index, c.block_number, bd.block_hash, c.capacity, c.data,
                   ls.code_hash, ls.hash_type, ls.args,
                   ts.code_hash, ts.hash_type, ts.args
              FROM cells c
              JOIN scripts ls ON ls.id = c.lock_script_id
         LEFT JOIN scripts ts ON ts.id = c.type_script_id
              JOIN block_digests bd ON bd.block_number = c.block_number
             WHERE {}
             ORDER BY c.block_number ASC, c.tx_index ASC, c.index ASC
            ;"#,
            conditions.join(" AND ")
        );
        let cli = self.storage.client();
        let refs = params.as_refs();
        let rows = self.storage.block_on(cli.query(sql.as_str(), &refs[..]))?;
        rows.iter().map(row_to_cell).collect()
    }
}

fn row_to_cell(row: &pg::Row) -> Result<RichCell> {
    let tx_hash = Byte32::try_from(row.try_get::<_, Vec<u8>>(0)?)?;
    let index = row.try_get::<_, i64>(1)? as u64;
    let block_number = row.try_get::<_, i64>(2)? as u64;
    let block_hash = Byte32::try_from(row.try_get::<_, Vec<u8>>(3)?)?;
    let capacity = row.try_get::<_, i64>(4)? as u64;
    let data = row.try_get::<_, Vec<u8>>(5)?;
    let lock = Script {
        code_hash: Byte32::try_from(row.try_get::<_, Vec<u8>>(6)?)?,
        hash_type: HashType::try_from(row.try_get::<_, i16>(7)? as u8)?,
        args: row.try_get::<_, Vec<u8>>(8)?,
    };
    let type_ = match row.try_get::<_, Option<Vec<u8>>>(9)? {
        Some(code_hash) => Some(Script {
            code_hash: Byte32::try_from(code_hash)?,
            hash_type: HashType::try_from(row.try_get::<_, i16>(10)? as u8)?,
            args: row.try_get::<_, Vec<u8>>(11)?,
        }),
        None => None,
    };
    Ok(RichCell {
        tx_hash,
        index,
        block_hash,
        block_number,
        capacity,
        data,
        lock,
        type_,
    })
}

/// Builds the shared `WHERE` conditions and bound parameters for both
/// `count` and `collect`.
fn build_conditions(filter: &CellFilter) -> (Vec<String>, Params) {
    let mut conditions = vec!["c.consumed = false".to_owned()];
    let mut params = Params::new();

    if let Some(lock) = &filter.lock {
        push_script_condition(&mut conditions, &mut params, "ls", lock, filter.args_len);
    }
    match &filter.type_filter {
        TypeFilter::None => {}
        TypeFilter::Empty => conditions.push("c.type_script_id IS NULL".to_owned()),
        TypeFilter::Script(script) => {
            push_script_condition(&mut conditions, &mut params, "ts", script, filter.args_len)
        }
    }
    if let Some(data) = &filter.data {
        let idx = params.push(data.clone());
        conditions.push(format!("c.data = ${}", idx));
    }

    (conditions, params)
}

fn push_script_condition(
    conditions: &mut Vec<String>,
    params: &mut Params,
    alias: &str,
    script: &Script,
    args_len: i64,
) {
    let code_hash_idx = params.push(script.code_hash.as_slice().to_vec());
    let hash_type_idx = params.push(script.hash_type as i16);
    let args_idx = params.push(script.args.clone());
    conditions.push(format!(
        "{alias}.code_hash = ${code} AND {alias}.hash_type = ${hash_type} AND substring({alias}.args from 1 for length(${args})) = ${args}",
        alias = alias,
        code = code_hash_idx,
        hash_type = hash_type_idx,
        args = args_idx,
    ));
    if args_len > 0 {
        // argsLen is counted in hex characters (2 per byte), matching the
        // wire representation callers filter against, not the raw bytea
        // length Postgres reports.
        let len_idx = params.push(args_len);
        conditions.push(format!("length({}.args) * 2 = ${}", alias, len_idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_filter_with_neither_lock_nor_type() {
        let result = CellFilter::new(None, TypeFilter::None, -1, None);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_a_lock_only_filter() {
        let lock = Script {
            code_hash: [0x01u8; 32].into(),
            hash_type: HashType::Data,
            args: vec![],
        };
        assert!(CellFilter::new(Some(lock), TypeFilter::None, -1, None).is_ok());
    }

    #[test]
    fn prefix_condition_binds_three_params() {
        let lock = Script {
            code_hash: [0x01u8; 32].into(),
            hash_type: HashType::Data,
            args: vec![0xde, 0xad],
        };
        let filter = CellFilter::new(Some(lock), TypeFilter::None, -1, None).unwrap();
        let (conditions, params) = build_conditions(&filter);
        assert_eq!(params.as_refs().len(), 3);
        assert!(conditions.iter().any(|c| c.contains("ls.code_hash")));
    }

    #[test]
    fn args_len_adds_a_hex_character_length_condition() {
        let lock = Script {
            code_hash: [0x01u8; 32].into(),
            hash_type: HashType::Data,
            args: vec![0xde, 0xad],
        };
        let filter = CellFilter::new(Some(lock), TypeFilter::None, 4, None).unwrap();
        let (conditions, params) = build_conditions(&filter);
        assert_eq!(params.as_refs().len(), 4);
        assert!(conditions
            .iter()
            .any(|c| c.contains("length(ls.args) * 2")));
    }
}
