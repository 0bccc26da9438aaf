use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// One ledger row exactly as loaded: category (possibly blank, to be
/// forward-filled), item name and the raw value cells aligned with the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub category: Option<String>,
    pub item: String,
    pub cells: Vec<Option<String>>,
}

/// The raw ledger. `header` names the value columns only (the two label
/// columns are not part of it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLedger {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawLedger {
    /// Builds a ledger from string records as produced by a CSV reader: the
    /// first record is the header, the first two fields of each record are the
    /// category and item labels. Blank fields become `None`.
    pub fn from_records<I, R, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = records.into_iter();

        let header: Vec<String> = match records.next() {
            Some(first) => first
                .into_iter()
                .skip(2)
                .map(|s| s.as_ref().trim().to_string())
                .collect(),
            None => return Err(LedgerError::MalformedLedger("Ledger has no header".to_string())),
        };

        let mut rows = Vec::new();
        for (idx, record) in records.enumerate() {
            let mut fields = record.into_iter().map(|s| blank_to_none(s.as_ref()));

            let category = fields.next().flatten();
            let item = fields.next().flatten().ok_or_else(|| {
                LedgerError::MalformedLedger(format!("Row {} has no item name", idx + 1))
            })?;

            let mut cells: Vec<Option<String>> = fields.collect();
            if cells.len() > header.len() {
                return Err(LedgerError::MalformedLedger(format!(
                    "Row {} ('{}') has {} value cells but the header has {}",
                    idx + 1,
                    item,
                    cells.len(),
                    header.len()
                )));
            }
            cells.resize(header.len(), None);

            rows.push(RawRow {
                category,
                item,
                cells,
            });
        }

        Ok(Self { header, rows })
    }
}

fn blank_to_none(field: &str) -> Option<String> {
    if field.trim().is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}
