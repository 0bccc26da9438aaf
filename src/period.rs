use crate::error::{LedgerError, Result};
use crate::hierarchy::ItemFilter;
use crate::utils::{days_between, parse_ledger_date};
use chrono::{Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    /// One trip on one day (hypermarket visits).
    SingleDay,
    /// Several trips summed over a range of days (supermarket visits).
    MultiDay,
}

/// A ledger column reduced to its end date and length. Columns are labelled
/// either with a single shopping date (`"13.02.21"`) or with a range covering
/// several trips (`"01.03.21-15.03.21"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub end: NaiveDate,
    pub length_days: u32,
}

impl Period {
    pub fn kind(&self) -> PeriodKind {
        if self.length_days == 0 {
            PeriodKind::SingleDay
        } else {
            PeriodKind::MultiDay
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.end
            .checked_sub_days(Days::new(self.length_days as u64))
            .unwrap_or(self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodLabel {
    Single(NaiveDate),
    Range { start: NaiveDate, end: NaiveDate },
}

pub fn parse_period_label(label: &str) -> Result<PeriodLabel> {
    let parts: Vec<&str> = label.split('-').map(str::trim).collect();

    match parts.as_slice() {
        [single] => Ok(PeriodLabel::Single(parse_ledger_date(single).map_err(|_| {
            malformed(label, "Expected a single date or a 'start-end' range")
        })?)),
        [start, end] => {
            let start = parse_ledger_date(start)
                .map_err(|_| malformed(label, "Range start is not a valid date"))?;
            let end = parse_ledger_date(end)
                .map_err(|_| malformed(label, "Range end is not a valid date"))?;
            if end < start {
                return Err(malformed(
                    label,
                    &format!("Range ends on {} before it starts on {}", end, start),
                ));
            }
            Ok(PeriodLabel::Range { start, end })
        }
        _ => Err(malformed(label, "Expected a single date or a 'start-end' range")),
    }
}

/// Reduces one raw column label to its canonical period.
///
/// A one-day range is treated exactly like a single date: both are the
/// single-day period kind.
pub fn reconcile_period(label: &str) -> Result<Period> {
    match parse_period_label(label)? {
        PeriodLabel::Single(date) => Ok(Period {
            end: date,
            length_days: 0,
        }),
        PeriodLabel::Range { start, end } => {
            let days = days_between(start, end) as u32;
            Ok(Period {
                end,
                length_days: if days == 1 { 0 } else { days },
            })
        }
    }
}

pub fn reconcile_periods<S: AsRef<str>>(labels: &[S]) -> Result<PeriodSet> {
    let periods = labels
        .iter()
        .map(|label| reconcile_period(label.as_ref()))
        .collect::<Result<Vec<Period>>>()?;

    PeriodSet::from_periods(periods)
}

fn malformed(label: &str, details: &str) -> LedgerError {
    LedgerError::MalformedPeriodLabel {
        label: label.to_string(),
        details: details.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KindFilter {
    #[default]
    All,
    SingleDay,
    MultiDay,
}

impl KindFilter {
    pub fn accepts(&self, kind: PeriodKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::SingleDay => kind == PeriodKind::SingleDay,
            KindFilter::MultiDay => kind == PeriodKind::MultiDay,
        }
    }
}

/// Date range, period kind and items chosen by the user. Bounds are inclusive
/// and compared against period end dates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub kind: KindFilter,
    #[serde(default)]
    pub items: ItemFilter,
}

impl PeriodSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_items(mut self, items: ItemFilter) -> Self {
        self.items = items;
        self
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn contains(&self, period: &Period) -> bool {
        self.in_range(period.end) && self.kind.accepts(period.kind())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSet {
    periods: BTreeMap<NaiveDate, Period>,
}

impl PeriodSet {
    /// Keys periods by end date. Two periods sharing an end date are rejected.
    pub fn from_periods<I>(periods: I) -> Result<PeriodSet>
    where
        I: IntoIterator<Item = Period>,
    {
        let mut by_end = BTreeMap::new();

        for period in periods {
            if by_end.insert(period.end, period).is_some() {
                return Err(LedgerError::DuplicatePeriodEnd { end: period.end });
            }
        }

        debug!("Reconciled {} periods", by_end.len());

        Ok(PeriodSet { periods: by_end })
    }

    pub fn get(&self, end: &NaiveDate) -> Option<&Period> {
        self.periods.get(end)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    pub fn ends(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.periods.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn kind_of(&self, end: &NaiveDate) -> Option<PeriodKind> {
        self.periods.get(end).map(Period::kind)
    }

    /// Calendar days covered: every period counts its own day plus its length.
    pub fn total_days(&self) -> u64 {
        self.periods
            .values()
            .map(|p| p.length_days as u64 + 1)
            .sum()
    }

    pub fn select(&self, selection: &PeriodSelection) -> PeriodSet {
        PeriodSet {
            periods: self
                .periods
                .iter()
                .filter(|(_, p)| selection.contains(p))
                .map(|(d, p)| (*d, *p))
                .collect(),
        }
    }

    pub fn available_kinds(&self, start: NaiveDate, end: NaiveDate) -> BTreeSet<PeriodKind> {
        self.select(&PeriodSelection::between(start, end))
            .iter()
            .map(Period::kind)
            .collect()
    }
}
