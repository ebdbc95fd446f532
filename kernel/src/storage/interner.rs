// Copyright (C) 2019-2020 Boyu Yang
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Deduplicates script values by content hash, returning a stable small
//! integer identifier. The follower is the sole writer, so a unique-
//! constraint race on insert can't happen in practice; if it ever did,
//! that's `InternFailure`, not something to retry around.

use crate::{
    error::{Error, Result},
    hash::ScriptHasher,
    postgres as pg,
    types::Script,
};

/// Looks up or creates the `scripts` row for `script`, returning its id.
pub(super) async fn ensure_script(
    txn: &pg::Transaction<'_>,
    hasher: &dyn ScriptHasher,
    script: &Script,
) -> Result<i64> {
    let script_hash = hasher.hash(script);
    let hash_type = script.hash_type as i16;
    let sql = r#"
        INSERT INTO scripts (
            code_hash, hash_type, args, script_hash
        ) VALUES (
            $1, $2, $3, $4
        )
        ON CONFLICT (code_hash, hash_type, args)
        DO UPDATE SET code_hash = EXCLUDED.code_hash
        RETURNING id
    ;"#;
    let row = txn
        .query_one(
            sql,
            &[
                &script.code_hash.as_slice(),
                &hash_type,
                &script.args,
                &script_hash.as_slice(),
            ],
        )
        .await
        .map_err(|_| Error::InternFailure(script_hash))?;
    row.try_get::<_, i64>(0)
        .map_err(|_| Error::InternFailure(script_hash))
}
