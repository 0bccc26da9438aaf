use crate::period::{KindFilter, PeriodKind, PeriodSelection, PeriodSet};
use crate::table::ItemTable;
use crate::units::UnitSplit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Headline figures for one period selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub items: usize,
    /// Σ (length_days + 1) over the selected periods.
    pub days: u64,
    pub cost_per_day: f64,
    pub volume_per_day: f64,
    /// Rounded up to whole packs.
    pub packs_per_day: u64,
}

impl LedgerSummary {
    /// `units` must be classified on the full quantity history, not on the
    /// selection, so an item keeps its family whatever slice is shown.
    pub fn compute(
        cost: &ItemTable,
        quantity: &ItemTable,
        periods: &PeriodSet,
        units: &UnitSplit,
    ) -> Self {
        let days = periods.total_days();
        if days == 0 {
            return Self {
                items: cost.len(),
                ..Self::default()
            };
        }
        let days_f = days as f64;

        let total_cost = cost.grand_total(cost.items());
        let volume = quantity.grand_total(
            quantity
                .items()
                .filter(|item| units.weight_volume.contains(*item)),
        );
        let packs =
            quantity.grand_total(quantity.items().filter(|item| units.packs.contains(*item)));

        Self {
            items: cost.len(),
            days,
            cost_per_day: round_to(total_cost / days_f, 2),
            volume_per_day: round_to(volume / days_f, 1),
            packs_per_day: (packs / days_f).ceil() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OthersRow {
    pub name: String,
    pub cost: f64,
    pub quantity: f64,
    /// Periods with a nonzero cost.
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OthersSlice {
    pub rows: Vec<OthersRow>,
    /// Items bought at least once without a recorded quantity.
    pub partial_quantity: Vec<String>,
}

impl OthersSlice {
    fn from_tables(cost: &ItemTable, quantity: &ItemTable, periods: &PeriodSet) -> Self {
        let ends: Vec<NaiveDate> = periods.ends().collect();
        let mut slice = Self::default();

        // ItemTable iterates in name order
        for item in cost.items() {
            let mut row = OthersRow {
                name: item.to_string(),
                cost: 0.0,
                quantity: 0.0,
                count: 0,
            };
            let mut partial = false;
            for end in &ends {
                let c = cost.value(item, end);
                let q = quantity.value(item, end);
                row.cost += c;
                row.quantity += q;
                if c != 0.0 {
                    row.count += 1;
                    partial |= q == 0.0;
                }
            }
            if partial {
                slice.partial_quantity.push(item.to_string());
            }
            slice.rows.push(row);
        }

        slice
    }

    pub fn total_cost(&self) -> f64 {
        self.rows.iter().map(|r| r.cost).sum()
    }
}

/// Per-item breakdown of the catch-all subcategory before it was swept into
/// a single item, split by period kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OthersReport {
    pub single_day: OthersSlice,
    pub multi_day: OthersSlice,
    pub all: OthersSlice,
}

impl OthersReport {
    pub fn build(cost: &ItemTable, quantity: &ItemTable, periods: &PeriodSet) -> Self {
        let single = periods.select(&PeriodSelection::all().with_kind(KindFilter::SingleDay));
        let multi = periods.select(&PeriodSelection::all().with_kind(KindFilter::MultiDay));

        Self {
            single_day: OthersSlice::from_tables(cost, quantity, &single),
            multi_day: OthersSlice::from_tables(cost, quantity, &multi),
            all: OthersSlice::from_tables(cost, quantity, periods),
        }
    }

    pub fn slice(&self, kind: KindFilter) -> &OthersSlice {
        match kind {
            KindFilter::All => &self.all,
            KindFilter::SingleDay => &self.single_day,
            KindFilter::MultiDay => &self.multi_day,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.rows.is_empty()
    }
}

/// Median of the nonzero values, or 0 when there are none.
fn nonzero_median(mut values: Vec<f64>) -> f64 {
    values.retain(|v| *v != 0.0);
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodPoint {
    pub end: NaiveDate,
    pub kind: PeriodKind,
    pub cost: f64,
    /// Items with a nonzero cost in this period.
    pub item_count: usize,
    /// Median over the nonzero item costs of this period.
    pub median_item_cost: f64,
}

impl PeriodPoint {
    pub fn is_empty(&self) -> bool {
        self.item_count == 0 && self.median_item_cost == 0.0
    }
}

/// Per-period spending of a fixed item set, ordered by end date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSeries {
    pub points: Vec<PeriodPoint>,
}

impl PeriodSeries {
    pub fn compute(cost: &ItemTable, periods: &PeriodSet) -> Self {
        let points = periods
            .iter()
            .map(|period| {
                let values: Vec<f64> = cost
                    .items()
                    .map(|item| cost.value(item, &period.end))
                    .collect();
                PeriodPoint {
                    end: period.end,
                    kind: period.kind(),
                    cost: values.iter().sum(),
                    item_count: values.iter().filter(|v| **v != 0.0).count(),
                    median_item_cost: nonzero_median(values),
                }
            })
            .collect();

        Self { points }
    }

    /// Points for a count/median scatter plot: periods without any purchase
    /// are left out.
    pub fn scatter_points(&self) -> impl Iterator<Item = &PeriodPoint> {
        self.points.iter().filter(|p| !p.is_empty())
    }

    pub fn scatter_points_of(&self, kind: PeriodKind) -> impl Iterator<Item = &PeriodPoint> {
        self.scatter_points().filter(move |p| p.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
