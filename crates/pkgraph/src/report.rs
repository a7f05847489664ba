//! Cycle reporting.

use crate::{Error, Result};
use tracing::warn;

/// Report dependency cycles found by cycle analysis.
///
/// With `reject_cycles` set any cycle is an error listing every path.
/// Otherwise each path is logged as a warning and analysis carries on.
///
/// # Errors
///
/// Returns [`Error::CyclesDetected`] if `paths` is not empty and
/// `reject_cycles` is set.
pub fn report_cycles(paths: &[String], reject_cycles: bool) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }

    if reject_cycles {
        return Err(Error::CyclesDetected {
            paths: paths.to_vec(),
        });
    }

    for path in paths {
        warn!(cycle = %path, "Dependency cycle detected, you should fix this!");
    }

    Ok(())
}
