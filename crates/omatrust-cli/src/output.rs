//! JSON output helpers.

use anyhow::{Context, Result};
use serde::Serialize;

/// Exit code for a positive result.
pub const EXIT_OK: u8 = 0;
/// Exit code for an invalid input or a negative check.
pub const EXIT_NEGATIVE: u8 = 1;

/// Print `value` as pretty JSON on stdout.
pub fn emit<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{text}");
    Ok(())
}

/// Map a boolean outcome onto an exit code.
pub fn exit_code(ok: bool) -> u8 {
    if ok {
        EXIT_OK
    } else {
        EXIT_NEGATIVE
    }
}
