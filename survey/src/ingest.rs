//! Spreadsheet ingestion.
//!
//! A survey workbook has two sheets:
//!
//! - `schema`: header row, then one `key, text, type` row per question
//! - `raw data`: header row of question keys, then one row per response

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};

use crate::schema::{QuestionType, Response, Schema, SchemaEntry, SurveyData};
use crate::{Error, Result};

/// Sheet holding the question definitions.
pub const SCHEMA_SHEET: &str = "schema";

/// Sheet holding one row per response.
pub const RESPONSES_SHEET: &str = "raw data";

/// Read a survey workbook (xlsx, xls, ods).
pub fn read_workbook(path: &Path) -> Result<SurveyData> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Spreadsheet(format!("failed to open {}: {}", path.display(), e)))?;

    let schema_rows = sheet_rows(&mut workbook, SCHEMA_SHEET)?;
    let raw_rows = sheet_rows(&mut workbook, RESPONSES_SHEET)?;

    let data = build_survey(&schema_rows, &raw_rows)?;
    tracing::info!(
        path = %path.display(),
        questions = data.schema.len(),
        responses = data.responses.len(),
        "read survey workbook"
    );
    Ok(data)
}

fn sheet_rows(workbook: &mut Sheets<BufReader<File>>, name: &str) -> Result<Vec<Vec<String>>> {
    let range: Range<Data> = workbook
        .worksheet_range(name)
        .map_err(|e| Error::Spreadsheet(format!("failed to read {:?} sheet: {}", name, e)))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Render a cell the way it appears in the sheet.
///
/// Whole-number floats drop the fractional part (`3.0` -> `3`).
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Build survey data from the string rows of both sheets.
///
/// Schema rows with fewer than three cells or an unknown type are skipped.
/// Raw data columns without a schema entry are ignored.
pub fn build_survey(schema_rows: &[Vec<String>], raw_rows: &[Vec<String>]) -> Result<SurveyData> {
    let mut schema = Schema::new();
    for row in schema_rows.iter().skip(1) {
        let [key, text, qtype, ..] = row.as_slice() else {
            continue;
        };
        let qtype = match qtype.parse::<QuestionType>() {
            Ok(qtype) => qtype,
            Err(e) => {
                tracing::warn!(key = %key, "skipping schema row: {}", e);
                continue;
            }
        };
        if !schema.add(SchemaEntry::new(key.as_str(), text.as_str(), qtype)) {
            tracing::debug!(key = %key, "duplicate schema key, keeping first definition");
        }
    }

    let Some((headers, rows)) = raw_rows.split_first() else {
        return Err(Error::Spreadsheet(format!("{:?} sheet is empty", RESPONSES_SHEET)));
    };

    // Resolve each column to its schema entry once
    let columns: Vec<Option<usize>> = headers.iter().map(|key| schema.position(key)).collect();

    let mut responses = Vec::with_capacity(rows.len());
    for row in rows {
        let mut response = Response::new();
        for (cell, (key, column)) in row.iter().zip(headers.iter().zip(&columns)) {
            let Some(entry) = column.and_then(|i| schema.entry_mut(i)) else {
                continue;
            };
            response.insert(key.clone(), entry.parse_value(cell));
        }
        responses.push(response);
    }

    Ok(SurveyData { schema, responses })
}
