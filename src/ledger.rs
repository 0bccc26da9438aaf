use crate::error::{LedgerError, Result};
use crate::hierarchy::HierarchyMaps;
use crate::ingestion::RawLedger;
use crate::overrides::{
    apply_others, apply_quantity_scales, apply_reassignments, apply_unification,
    UNIFICATIONS_TABLE,
};
use crate::period::{reconcile_period, Period, PeriodSet};
use crate::schema::{CategoryScheme, ItemKey, LedgerOverrides};
use crate::table::{ItemSeries, ItemTable};
use crate::utils::parse_locale_number;
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Header prefix of the metadata column closing an intermediate monthly rollup.
pub const ROLLUP_MARKER: &str = "Info";

// Working representation during normalization; values are positional per period column.
#[derive(Debug, Clone)]
pub(crate) struct LedgerRow {
    pub key: ItemKey,
    pub cost: Vec<f64>,
    pub quantity: Vec<f64>,
}

impl LedgerRow {
    pub(crate) fn zeroed(key: ItemKey, width: usize) -> Self {
        Self {
            key,
            cost: vec![0.0; width],
            quantity: vec![0.0; width],
        }
    }

    pub(crate) fn absorb(&mut self, other: &LedgerRow) {
        for (a, b) in self.cost.iter_mut().zip(&other.cost) {
            *a += b;
        }
        for (a, b) in self.quantity.iter_mut().zip(&other.quantity) {
            *a += b;
        }
    }

    fn is_zero_cost(&self) -> bool {
        self.cost.iter().all(|c| *c == 0.0)
    }
}

/// Raw items of the catch-all category, before they are swept together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OthersTables {
    pub cost: ItemTable,
    pub quantity: ItemTable,
    pub meaningful: Vec<String>,
    pub miscellaneous: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLedger {
    pub periods: PeriodSet,
    pub cost: ItemTable,
    pub quantity: ItemTable,
    pub others: OthersTables,
    pub maps: HierarchyMaps,
}

pub struct LedgerNormalizer<'a> {
    overrides: &'a LedgerOverrides,
    scheme: &'a CategoryScheme,
}

impl<'a> LedgerNormalizer<'a> {
    pub fn new(overrides: &'a LedgerOverrides, scheme: &'a CategoryScheme) -> Self {
        Self { overrides, scheme }
    }

    pub fn normalize(&self, raw: &RawLedger) -> Result<NormalizedLedger> {
        let kept = prune_rollup_columns(&raw.header);
        if kept.len() % 2 != 0 {
            return Err(LedgerError::MalformedLedger(format!(
                "Expected (cost, quantity) column pairs after removing rollups, found {} columns",
                kept.len()
            )));
        }

        let reconciled = kept
            .iter()
            .step_by(2)
            .map(|&i| reconcile_period(&raw.header[i]))
            .collect::<Result<Vec<Period>>>()?;
        let ends: Vec<NaiveDate> = reconciled.iter().map(|p| p.end).collect();
        let periods = PeriodSet::from_periods(reconciled)?;

        debug!(
            "Kept {} of {} value columns ({} periods)",
            kept.len(),
            raw.header.len(),
            periods.len()
        );

        let mut rows = self.parse_rows(raw, &kept)?;

        apply_reassignments(&mut rows, &self.overrides.reassignments)?;

        let others = match &self.overrides.others {
            Some(catch_all) => {
                let captured: Vec<&LedgerRow> = rows
                    .iter()
                    .filter(|r| r.key.category == catch_all.category)
                    .collect();
                let (cost, quantity) = build_tables(captured.iter().copied(), &ends);
                (cost, quantity, catch_all.meaningful_items.clone())
            }
            None => (ItemTable::new(), ItemTable::new(), Vec::new()),
        };

        for group in &self.overrides.unifications {
            apply_unification(&mut rows, group, UNIFICATIONS_TABLE)?;
        }

        let miscellaneous = match &self.overrides.others {
            Some(catch_all) => apply_others(&mut rows, catch_all)?,
            None => Vec::new(),
        };

        apply_quantity_scales(&mut rows, &self.overrides.quantity_scales)?;

        let before = rows.len();
        rows.retain(|r| !r.is_zero_cost());
        debug!("Dropped {} items with zero cost in every period", before - rows.len());

        let maps = HierarchyMaps::from_items(
            rows.iter().map(|r| (r.key.item.as_str(), r.key.category.as_str())),
            self.scheme,
        )?;
        let (cost, quantity) = build_tables(rows.iter(), &ends);

        info!(
            "Normalized ledger: {} items, {} periods",
            cost.len(),
            periods.len()
        );

        Ok(NormalizedLedger {
            periods,
            cost,
            quantity,
            others: OthersTables {
                cost: others.0,
                quantity: others.1,
                meaningful: others.2,
                miscellaneous,
            },
            maps,
        })
    }

    fn parse_rows(&self, raw: &RawLedger, kept: &[usize]) -> Result<Vec<LedgerRow>> {
        let mut rows = Vec::with_capacity(raw.rows.len());
        let mut current_category: Option<String> = None;

        for (idx, raw_row) in raw.rows.iter().enumerate() {
            if raw_row.cells.len() != raw.header.len() {
                return Err(LedgerError::MalformedLedger(format!(
                    "Row {} ('{}') has {} cells, header has {}",
                    idx,
                    raw_row.item.trim(),
                    raw_row.cells.len(),
                    raw.header.len()
                )));
            }

            let category = raw_row
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty());
            if let Some(category) = category {
                current_category = Some(category.to_string());
            }
            let category = current_category
                .clone()
                .ok_or(LedgerError::MissingCategory { row: idx })?;
            let item = raw_row.item.trim().to_string();

            let mut cost = Vec::with_capacity(kept.len() / 2);
            let mut quantity = Vec::with_capacity(kept.len() / 2);
            for pair in kept.chunks(2) {
                cost.push(coerce_cell(&raw_row.cells[pair[0]], &item, &raw.header[pair[0]])?);
                quantity.push(coerce_cell(&raw_row.cells[pair[1]], &item, &raw.header[pair[0]])?);
            }

            rows.push(LedgerRow {
                key: ItemKey::new(category, item),
                cost,
                quantity,
            });
        }

        Ok(rows)
    }
}

/// Indices of the value columns that survive rollup pruning. A rollup is the
/// marker column plus the two columns before it.
pub fn prune_rollup_columns(header: &[String]) -> Vec<usize> {
    let mut dropped = vec![false; header.len()];
    for (idx, name) in header.iter().enumerate() {
        if name.starts_with(ROLLUP_MARKER) {
            for offset in 0..=2 {
                if let Some(i) = idx.checked_sub(offset) {
                    dropped[i] = true;
                }
            }
        }
    }

    (0..header.len()).filter(|i| !dropped[*i]).collect()
}

fn coerce_cell(cell: &Option<String>, item: &str, column: &str) -> Result<f64> {
    let value = cell
        .as_deref()
        .and_then(parse_locale_number)
        .unwrap_or(0.0);

    if !value.is_finite() || value < 0.0 {
        return Err(LedgerError::DataIntegrityViolation {
            item: item.to_string(),
            column: column.to_string(),
            details: format!("value {} is not a non-negative number", value),
        });
    }

    Ok(value)
}

fn build_tables<'r, I>(rows: I, ends: &[NaiveDate]) -> (ItemTable, ItemTable)
where
    I: IntoIterator<Item = &'r LedgerRow>,
{
    let mut cost = ItemTable::new();
    let mut quantity = ItemTable::new();

    for row in rows {
        let cost_series: ItemSeries = ends.iter().copied().zip(row.cost.iter().copied()).collect();
        let quantity_series: ItemSeries = ends
            .iter()
            .copied()
            .zip(row.quantity.iter().copied())
            .collect();
        cost.insert(row.key.item.clone(), cost_series);
        quantity.insert(row.key.item.clone(), quantity_series);
    }

    (cost, quantity)
}
