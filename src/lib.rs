//! # Expense Hierarchy Builder
//!
//! A library for turning an irregularly-periodized expense ledger into canonical
//! per-period tables and linked item → subcategory → category hierarchies.
//!
//! ## Core Concepts
//!
//! - **Periods**: Ledger columns cover either a single shopping day or a range of
//!   days. Each is reduced to an end date plus a length (0 for a single day)
//! - **Normalization**: Rollup columns are pruned, labels forward-filled and the
//!   hand-maintained override tables (reassignments, unifications, the catch-all
//!   sweep) applied before zero-cost items are dropped
//! - **Hierarchies**: Cost, volume and pack-count views aggregate the same items
//!   into a tree whose every node equals the sum of its children
//! - **Selections**: Views are built for a date range, a period kind and an
//!   optional category, subcategory or item filter
//! - **Drill-down**: A click on one view zooms the linked views to the nearest
//!   node they share
//!
//! ## Example
//!
//! ```rust,ignore
//! use expense_hierarchy_builder::*;
//!
//! let raw = RawLedger::from_records(vec![
//!     vec!["", "", "13.02.21", "", "14.02.21-20.02.21", ""],
//!     vec!["Dairy", "Milk", "89,90", "1", "100", "2"],
//!     vec!["", "Kefir", "", "", "70", "1"],
//!     vec!["Household items", "Soap", "120", "1", "", ""],
//! ])?;
//!
//! let config = LedgerConfig::default();
//! let ledger = process_ledger(&raw, &config)?;
//! let views = build_views(&ledger, &PeriodSelection::all(), &config)?;
//!
//! let click = ClickEvent::new("Foodstuff", "Total", "Total");
//! for (metric, result) in views.drill_down(Metric::Cost, &click) {
//!     println!("{:?}: {:?}", metric, result);
//! }
//! ```

pub mod drilldown;
pub mod error;
pub mod hierarchy;
pub mod ingestion;
pub mod ledger;
pub mod overrides;
pub mod period;
pub mod report;
pub mod schema;
pub mod sunburst;
pub mod table;
pub mod units;
pub mod utils;

pub use drilldown::{drill_down, synchronize, ClickEvent, DrillDown, SelectionSlice};
pub use error::{LedgerError, Result};
pub use hierarchy::{HierarchyMaps, ItemFilter};
pub use ingestion::*;
pub use ledger::{prune_rollup_columns, LedgerNormalizer, NormalizedLedger, OthersTables};
pub use period::*;
pub use report::{
    LedgerSummary, OthersReport, OthersRow, OthersSlice, PeriodPoint, PeriodSeries,
};
pub use schema::*;
pub use sunburst::{
    build_sunburst_set, Collapse, HierarchyNode, Metric, NodeLevel, SelectionState,
    SunburstBuilder, SunburstSet, SunburstTable,
};
pub use table::{has_partial_quantity, ItemSeries, ItemTable};
pub use units::{UnitFamily, UnitSplit};
pub use utils::*;

use log::{debug, info};
use serde::Serialize;

/// Everything derived from one selection of a normalized ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerViews {
    pub periods: PeriodSet,
    pub cost: ItemTable,
    pub quantity: ItemTable,
    /// Hierarchy of the items accepted by the item filter.
    pub maps: HierarchyMaps,
    pub units: UnitSplit,
    pub sunburst: SunburstSet,
    pub summary: LedgerSummary,
    /// Empty unless the catch-all subcategory is part of the selection.
    pub others: OthersReport,
    /// Spending of the chosen items over every ledger period.
    pub series: PeriodSeries,
}

impl LedgerViews {
    /// Applies a click on the `source` view to the two linked views.
    pub fn drill_down(&self, source: Metric, click: &ClickEvent) -> Vec<(Metric, DrillDown)> {
        let source_table = self.sunburst.get(source);
        self.sunburst
            .linked(source)
            .into_iter()
            .map(|target| (target.metric(), drilldown::drill_down(click, source_table, target)))
            .collect()
    }

    pub fn verify(&self, tolerance: f64) -> Result<()> {
        self.sunburst.cost.verify_tree_sums(tolerance)?;
        self.sunburst.volume.verify_tree_sums(tolerance)?;
        self.sunburst.packs.verify_tree_sums(tolerance)
    }
}

pub struct LedgerProcessor;

impl LedgerProcessor {
    pub fn process(raw: &RawLedger, config: &LedgerConfig) -> Result<NormalizedLedger> {
        validate_config_integrity(config)?;

        info!(
            "Processing ledger with {} rows and {} value columns",
            raw.rows.len(),
            raw.header.len()
        );
        debug!(
            "Configuration contains {} reassignments, {} unification groups and {} quantity scales",
            config.overrides.reassignments.len(),
            config.overrides.unifications.len(),
            config.overrides.quantity_scales.len()
        );

        LedgerNormalizer::new(&config.overrides, &config.scheme).normalize(raw)
    }

    pub fn build_views(
        ledger: &NormalizedLedger,
        selection: &PeriodSelection,
        config: &LedgerConfig,
    ) -> Result<LedgerViews> {
        let periods = ledger.periods.select(selection);
        let chosen = ledger
            .cost
            .filter_items(|item| selection.items.accepts(item, &ledger.maps));
        let maps = ledger.maps.restrict_to(chosen.items());

        let cost = chosen.select(&periods);
        let quantity = ledger.quantity.select_like(&periods, &cost);

        // Unit families come from the full history so they do not flip with the selection
        let units = UnitSplit::classify(&ledger.quantity, &config.units);

        debug!(
            "Selection keeps {} of {} periods and {} of {} items",
            periods.len(),
            ledger.periods.len(),
            cost.len(),
            ledger.cost.len()
        );

        let sunburst = build_sunburst_set(&cost, &quantity, &units, &maps, &config.root_label)?;
        let summary = LedgerSummary::compute(&cost, &quantity, &periods, &units);
        let series = PeriodSeries::compute(&chosen, &ledger.periods);

        let others_selected = config
            .overrides
            .others
            .as_ref()
            .is_some_and(|catch_all| maps.category_of(&catch_all.category).is_some());
        let others = if others_selected {
            let others_cost = ledger.others.cost.select(&periods);
            let others_quantity = ledger.others.quantity.select_like(&periods, &others_cost);
            OthersReport::build(&others_cost, &others_quantity, &periods)
        } else {
            debug!("Catch-all subcategory is not selected, skipping the others report");
            OthersReport::default()
        };

        Ok(LedgerViews {
            periods,
            cost,
            quantity,
            maps,
            units,
            sunburst,
            summary,
            others,
            series,
        })
    }

    pub fn build_views_with_verification(
        ledger: &NormalizedLedger,
        selection: &PeriodSelection,
        config: &LedgerConfig,
        tolerance: f64,
    ) -> Result<LedgerViews> {
        let views = Self::build_views(ledger, selection, config)?;

        views.verify(tolerance)?;

        Ok(views)
    }
}

pub fn process_ledger(raw: &RawLedger, config: &LedgerConfig) -> Result<NormalizedLedger> {
    LedgerProcessor::process(raw, config)
}

pub fn build_views(
    ledger: &NormalizedLedger,
    selection: &PeriodSelection,
    config: &LedgerConfig,
) -> Result<LedgerViews> {
    LedgerProcessor::build_views(ledger, selection, config)
}

fn validate_config_integrity(config: &LedgerConfig) -> Result<()> {
    if config.root_label.trim().is_empty() {
        return Err(LedgerError::InvalidConfig {
            field: "root_label".to_string(),
            details: "Root label must not be empty".to_string(),
        });
    }

    for (idx, group) in config.overrides.unifications.iter().enumerate() {
        if group.items_to_unite.is_empty() {
            return Err(LedgerError::InvalidConfig {
                field: format!("unifications[{}]", idx),
                details: format!(
                    "Group for ({}, {}) has no items to unite",
                    group.category, group.new_item
                ),
            });
        }
    }

    for scale in &config.overrides.quantity_scales {
        if !scale.factor.is_finite() || scale.factor <= 0.0 {
            return Err(LedgerError::InvalidConfig {
                field: format!("quantity_scales.{}", scale.item),
                details: format!("Scale factor {} must be a positive number", scale.factor),
            });
        }
    }

    Ok(())
}
