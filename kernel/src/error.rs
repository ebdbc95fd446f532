// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error as ThisError;

use crate::hash::Byte32;

/// Errors surfaced by the kernel: storage, RPC, and collector construction.
///
/// Variants map onto the error kinds a chain follower needs to distinguish:
/// caller-fault validation errors are raised synchronously; `Rpc` and `Db`
/// are transient/fatal and drive the follower into `Failed`; `Consistency`
/// is logged and does not abort an in-flight append.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("db error: {0}")]
    Db(postgres::Error),

    #[error("data error: {0}")]
    Data(String),

    /// An appended block's parent hash doesn't match the local tip. Drives
    /// the follower's rollback path; the caller should `remove_block(number)`
    /// and retry from there.
    #[error("data error: unknown parent block ({number}, {hash:#x})")]
    UnknownParentBlock { number: u64, hash: Byte32 },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// An input referenced a cell that is neither present nor known to have
    /// been pruned. Logged by the follower; the transaction still commits.
    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("missing transaction: {0:#x}")]
    MissingTransaction(Byte32),

    #[error("intern failure: could not obtain an id for script {0:#x}")]
    InternFailure(Byte32),

    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl ::std::convert::From<postgres::Error> for Error {
    fn from(error: postgres::Error) -> Self {
        Self::Db(error)
    }
}
