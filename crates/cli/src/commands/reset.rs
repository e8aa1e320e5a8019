// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::Workspace;
use crate::error::Result;

/// Clears the queue and/or the cache. With neither flag, clears both.
pub fn run(start: &Path, queue: bool, cache: bool) -> Result<()> {
    let workspace = Workspace::open_locked(start)?;
    let mut engine = workspace.engine()?;
    let both = !queue && !cache;

    if queue || both {
        let dropped = engine.pending().len();
        engine.clear_queue()?;
        println!("cleared queue ({} pending changes dropped)", dropped);
    }
    if cache || both {
        engine.clear_cache()?;
        println!("cleared cache");
    }
    Ok(())
}
