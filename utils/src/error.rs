// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub(crate) enum Error {
    #[error("internal error: should be unreachable, {0}")]
    Unreachable(String),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("kernel error: {0}")]
    Kernel(#[from] kernel::error::Error),
}

pub(crate) type Result<T> = ::std::result::Result<T, Error>;
