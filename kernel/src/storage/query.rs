// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;

use crate::{error::Result, hash::Byte32, postgres as pg};

pub(crate) fn hash_from_value(bytes: Vec<u8>) -> Result<Byte32> {
    Byte32::try_from(bytes)
}

pub(crate) fn hash_from_row(row: &pg::Row, idx: usize) -> Result<Byte32> {
    hash_from_value(row.try_get::<_, Vec<u8>>(idx)?)
}
