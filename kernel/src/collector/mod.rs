// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Read-only query compilers over the store: the cell collector turns a
//! script/data filter into an ordered live-cell scan; the transaction
//! collector intersects script filters over the transaction/script
//! index and fetches bodies via RPC.

pub mod cell;
mod params;
pub mod transaction;

pub use cell::{CellCollector, CellFilter, RichCell, TypeFilter};
pub use transaction::{TransactionCollector, TransactionCollectorOptions, TransactionFilter, TransactionResult};
