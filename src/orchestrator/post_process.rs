//! Post-run processing: turn an outcome into the report presentation layers print.

use crate::model::{OperationKind, OperationReport, Outcome};
use std::path::Path;
use std::time::Duration;

/// Build the report for a finished operation, stamped with the current UTC time.
pub fn build_report(
    kind: OperationKind,
    input_path: &Path,
    output_path: &Path,
    elapsed: Duration,
    outcome: Outcome,
) -> OperationReport {
    OperationReport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        kind,
        input_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        outcome,
    }
}
