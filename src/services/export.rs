//! The monthly readings sheet handed to billing.

use csv::WriterBuilder;

use crate::errors::ServiceError;
use crate::models::{BillingPeriod, Branch, MeterKind};
use crate::services::readings::ReadingsView;

pub const SHEET_HEADER: [&str; 4] = ["Code", "Mono", "Colour", "Scan"];

pub fn sheet_filename(period: BillingPeriod, branch: Branch) -> String {
    format!("readings-{}-{}.csv", branch.code().to_ascii_lowercase(), period)
}

/// One row per machine keyed by serial number. A cell is left blank when the
/// machine lacks that meter or nothing was captured for it.
pub fn render_sheet(view: &ReadingsView) -> Result<String, ServiceError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(SHEET_HEADER)
        .map_err(|e| ServiceError::InternalError(format!("Failed to write sheet header: {}", e)))?;

    for entry in &view.machines {
        let mut record = vec![entry.machine.serial_number.clone()];
        record.extend(MeterKind::ALL.iter().map(|&kind| {
            entry
                .export_value(kind)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&record).map_err(|e| {
            ServiceError::InternalError(format!(
                "Failed to write sheet row for {}: {}",
                entry.machine.serial_number, e
            ))
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("Failed to flush sheet: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ServiceError::InternalError(format!("Sheet is not valid UTF-8: {}", e)))
}
