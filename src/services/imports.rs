//! Tabular import parsing and the per-row outcome report shared by the
//! readings and part-order imports.
//!
//! Rows are numbered the way a spreadsheet shows them: the header is row 1,
//! so the first data row is row 2.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::MAX_METER_VALUE;

/// Spreadsheet row number of the data record at `index`.
pub fn sheet_row(index: usize) -> usize {
    index + 2
}

/// One row of a monthly readings sheet. Values stay textual until the row is
/// processed so a malformed cell fails only its own row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReadingImportRow {
    pub serial_number: String,
    pub mono: Option<String>,
    pub colour: Option<String>,
    pub scan: Option<String>,
    pub note: Option<String>,
}

/// One row of a consumable order sheet. The part is matched by item code
/// first and by name second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PartOrderImportRow {
    pub serial_number: String,
    pub item_code: Option<String>,
    pub part_name: Option<String>,
    pub order_date: String,
    pub current_reading: Option<String>,
    pub remaining_toner_percent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportFailure {
    pub row: usize,
    pub error: String,
}

/// Outcome of an import: one bad row never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn record<T, E: std::fmt::Display>(&mut self, row: usize, outcome: Result<T, E>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(e) => self.failed.push(ImportFailure {
                row,
                error: e.to_string(),
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

pub fn parse_reading_rows(data: &[u8]) -> Result<Vec<ReadingImportRow>, ServiceError> {
    parse_rows(data, &["serial_number"])
}

pub fn parse_part_order_rows(data: &[u8]) -> Result<Vec<PartOrderImportRow>, ServiceError> {
    parse_rows(data, &["serial_number", "order_date"])
}

/// Header cells are matched loosely: `Serial Number`, `serial-number` and
/// `serial_number` all name the same column.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

fn parse_rows<T: DeserializeOwned>(
    data: &[u8],
    required: &[&str],
) -> Result<Vec<T>, ServiceError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ServiceError::ValidationError(format!("Unreadable header row: {}", e)))?;
    let headers: StringRecord = headers.iter().map(normalize_header).collect();

    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ServiceError::ValidationError(format!(
                "Missing required column '{}'",
                column
            )));
        }
    }
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        let row: T = record.map_err(|e| {
            ServiceError::ValidationError(format!("Row {}: {}", sheet_row(index), e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an optional meter count. Thousands separators are accepted.
pub fn parse_count(field: &str, value: Option<&str>) -> Result<Option<i64>, String> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ',' | ' ' | '_')).collect();
    match cleaned.parse::<i64>() {
        Ok(n) if n < 0 => Err(format!("{} must not be negative", field)),
        Ok(n) if n > MAX_METER_VALUE => Err(format!("{} exceeds {}", field, MAX_METER_VALUE)),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(format!("{} '{}' is not a whole number", field, raw)),
    }
}

/// Parses an optional percentage such as `40`, `40%` or `12.5`.
pub fn parse_percent(field: &str, value: Option<&str>) -> Result<Option<Decimal>, String> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    Decimal::from_str(raw.trim_end_matches('%').trim())
        .map(Some)
        .map_err(|_| format!("{} '{}' is not a number", field, raw))
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err(format!("{} is required", field));
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("{} '{}' is not a date (expected YYYY-MM-DD)", field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn reading_sheet_tolerates_loose_headers_and_blank_cells() {
        let sheet = "Serial Number, Mono ,Colour,Scan,Note\nSN-1,1 200,,5,\nSN-2,,,,away\n";

        let rows = parse_reading_rows(sheet.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].serial_number, "SN-1");
        assert_eq!(rows[0].mono.as_deref(), Some("1 200"));
        assert_eq!(rows[0].colour, None);
        assert_eq!(rows[1].note.as_deref(), Some("away"));
    }

    #[test]
    fn part_order_sheet_requires_order_date_column() {
        let sheet = "serial_number,item_code\nSN-1,TN-1\n";
        assert_matches!(
            parse_part_order_rows(sheet.as_bytes()),
            Err(ServiceError::ValidationError(msg)) if msg.contains("order_date")
        );
    }

    #[test]
    fn part_order_sheet_parses_optional_columns() {
        let sheet = "serial_number,item_code,part_name,order_date,current_reading,remaining_toner_percent\n\
                     SN-1,TN-1,,2024-03-05,15000,40%\n";

        let rows = parse_part_order_rows(sheet.as_bytes()).unwrap();

        assert_eq!(rows[0].item_code.as_deref(), Some("TN-1"));
        assert_eq!(rows[0].part_name, None);
        assert_eq!(rows[0].order_date, "2024-03-05");
    }

    #[test]
    fn cell_parsers() {
        assert_eq!(parse_count("mono", Some("12,345")), Ok(Some(12_345)));
        assert_eq!(parse_count("mono", Some("  ")), Ok(None));
        assert!(parse_count("mono", Some("-4")).is_err());
        assert!(parse_count("mono", Some("lots")).is_err());
        assert!(parse_count("mono", Some("9223372036854775807")).is_err());

        assert_eq!(parse_percent("toner", Some("40%")), Ok(Some(dec!(40))));
        assert_eq!(parse_percent("toner", None), Ok(None));
        assert!(parse_percent("toner", Some("half")).is_err());

        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("order_date", "2024-03-05"), Ok(expected));
        assert_eq!(parse_date("order_date", "05/03/2024"), Ok(expected));
        assert!(parse_date("order_date", "").is_err());
    }

    #[test]
    fn report_isolates_failures() {
        let mut report = ImportReport::default();
        report.record(2, Ok::<_, String>(()));
        report.record(3, Err::<(), _>("Machine SN-9 not found"));
        report.record(4, Ok::<_, String>(()));

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.total(), 3);
        assert_eq!(
            report.failed,
            vec![ImportFailure {
                row: 3,
                error: "Machine SN-9 not found".into()
            }]
        );
    }
}
