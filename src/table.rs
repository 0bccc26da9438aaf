use crate::error::Result;
use crate::period::PeriodSet;
use crate::utils::csv_into_string;
use chrono::NaiveDate;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ItemSeries = BTreeMap<NaiveDate, f64>;

/// Canonical cost or quantity matrix: one series per item, keyed by period end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTable {
    series: BTreeMap<String, ItemSeries>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: impl Into<String>, series: ItemSeries) {
        self.series.insert(item.into(), series);
    }

    pub fn get(&self, item: &str) -> Option<&ItemSeries> {
        self.series.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.series.contains_key(item)
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn item_set(&self) -> BTreeSet<String> {
        self.series.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn periods(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.keys())
            .copied()
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    pub fn value(&self, item: &str, period: &NaiveDate) -> f64 {
        self.series
            .get(item)
            .and_then(|s| s.get(period))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total(&self, item: &str) -> f64 {
        self.series
            .get(item)
            .map(|s| s.values().sum())
            .unwrap_or(0.0)
    }

    pub fn grand_total<'a, I>(&self, items: I) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        items.into_iter().map(|item| self.total(item)).sum()
    }

    /// Number of periods in which the item has a nonzero value.
    pub fn nonzero_count(&self, item: &str) -> usize {
        self.series
            .get(item)
            .map(|s| s.values().filter(|v| **v != 0.0).count())
            .unwrap_or(0)
    }

    /// Keeps the given periods and drops every item that is zero throughout
    /// the remaining slice.
    pub fn select(&self, periods: &PeriodSet) -> ItemTable {
        let series = self
            .series
            .iter()
            .map(|(item, s)| {
                let sliced: ItemSeries = s
                    .iter()
                    .filter(|(d, _)| periods.get(d).is_some())
                    .map(|(d, v)| (*d, *v))
                    .collect();
                (item.clone(), sliced)
            })
            .filter(|(_, s)| s.values().any(|v| *v != 0.0))
            .collect();

        ItemTable { series }
    }

    /// Keeps the given periods and exactly the items of `reference`, zero or
    /// not. Used to slice a quantity table alongside its cost table.
    pub fn select_like(&self, periods: &PeriodSet, reference: &ItemTable) -> ItemTable {
        reference
            .items()
            .map(|item| {
                let sliced: ItemSeries = self
                    .series
                    .get(item)
                    .into_iter()
                    .flatten()
                    .filter(|(d, _)| periods.get(d).is_some())
                    .map(|(d, v)| (*d, *v))
                    .collect();
                (item.to_string(), sliced)
            })
            .collect()
    }

    /// Keeps only the items accepted by `keep`, leaving their series untouched.
    pub fn filter_items<F>(&self, keep: F) -> ItemTable
    where
        F: Fn(&str) -> bool,
    {
        self.series
            .iter()
            .filter(|(item, _)| keep(item))
            .map(|(item, s)| (item.clone(), s.clone()))
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(Vec::new());

        let mut header = vec!["Period"];
        header.extend(self.items());
        wtr.write_record(&header)?;

        for date in self.periods() {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            record.extend(
                self.series
                    .keys()
                    .map(|name| format!("{:.2}", self.value(name, &date))),
            );
            wtr.write_record(&record)?;
        }

        csv_into_string(wtr)
    }
}

impl FromIterator<(String, ItemSeries)> for ItemTable {
    fn from_iter<T: IntoIterator<Item = (String, ItemSeries)>>(iter: T) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}

/// True when some period records a cost for the item but no quantity.
pub fn has_partial_quantity(cost: &ItemTable, quantity: &ItemTable, item: &str) -> bool {
    match cost.get(item) {
        Some(series) => series
            .iter()
            .any(|(date, c)| *c != 0.0 && quantity.value(item, date) == 0.0),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{reconcile_periods, KindFilter, PeriodSelection};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(values: &[(NaiveDate, f64)]) -> ItemSeries {
        values.iter().copied().collect()
    }

    #[test]
    fn test_totals_and_counts() {
        let mut table = ItemTable::new();
        table.insert("Milk", series(&[(date(2021, 2, 13), 80.0), (date(2021, 2, 20), 0.0)]));
        table.insert("Bread", series(&[(date(2021, 2, 13), 30.0), (date(2021, 2, 20), 35.0)]));

        assert_eq!(table.total("Milk"), 80.0);
        assert_eq!(table.nonzero_count("Milk"), 1);
        assert_eq!(table.grand_total(["Milk", "Bread"]), 145.0);
        assert_eq!(table.total("Cheese"), 0.0);
        assert_eq!(table.periods().len(), 2);
    }

    #[test]
    fn test_select_drops_zero_items() {
        let periods = reconcile_periods(&["13.02.21", "14.02.21-20.02.21"]).unwrap();
        let mut table = ItemTable::new();
        table.insert("Milk", series(&[(date(2021, 2, 13), 80.0), (date(2021, 2, 20), 0.0)]));
        table.insert("Bread", series(&[(date(2021, 2, 13), 30.0), (date(2021, 2, 20), 35.0)]));

        let multi = periods.select(&PeriodSelection::all().with_kind(KindFilter::MultiDay));
        let sliced = table.select(&multi);

        assert_eq!(sliced.items().collect::<Vec<_>>(), vec!["Bread"]);
        assert_eq!(sliced.total("Bread"), 35.0);

        let mut quantity = ItemTable::new();
        quantity.insert("Milk", series(&[(date(2021, 2, 13), 1.0), (date(2021, 2, 20), 0.0)]));
        quantity.insert("Bread", series(&[(date(2021, 2, 13), 1.0), (date(2021, 2, 20), 0.0)]));
        let quantity_slice = quantity.select_like(&multi, &sliced);
        assert_eq!(quantity_slice.items().collect::<Vec<_>>(), vec!["Bread"]);
        assert_eq!(quantity_slice.get("Bread").map(|s| s.len()), Some(1));
        assert_eq!(quantity_slice.total("Bread"), 0.0);
    }

    #[test]
    fn test_partial_quantity() {
        let mut cost = ItemTable::new();
        let mut quantity = ItemTable::new();
        cost.insert("Milk", series(&[(date(2021, 2, 13), 80.0), (date(2021, 2, 20), 40.0)]));
        quantity.insert("Milk", series(&[(date(2021, 2, 13), 1.0), (date(2021, 2, 20), 0.0)]));
        cost.insert("Bread", series(&[(date(2021, 2, 13), 30.0), (date(2021, 2, 20), 0.0)]));
        quantity.insert("Bread", series(&[(date(2021, 2, 13), 1.0), (date(2021, 2, 20), 0.0)]));

        assert!(has_partial_quantity(&cost, &quantity, "Milk"));
        assert!(!has_partial_quantity(&cost, &quantity, "Bread"));
    }

    #[test]
    fn test_filter_items() {
        let mut table = ItemTable::new();
        table.insert("Milk", series(&[(date(2021, 2, 13), 80.0), (date(2021, 2, 20), 10.0)]));
        table.insert("Bread", series(&[(date(2021, 2, 13), 30.0)]));

        let only_milk = table.filter_items(|item| item == "Milk");
        assert_eq!(only_milk.items().collect::<Vec<_>>(), vec!["Milk"]);
        assert_eq!(only_milk.total("Milk"), 90.0);
        assert!(table.filter_items(|_| false).is_empty());
    }

    #[test]
    fn test_to_csv() {
        let mut table = ItemTable::new();
        table.insert("Milk", series(&[(date(2021, 2, 13), 80.0)]));
        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("Period,Milk\n"));
        assert!(csv.contains("2021-02-13,80.00"));
    }

    #[test]
    fn test_to_csv_quotes_item_names_with_commas() {
        let mut table = ItemTable::new();
        table.insert("Cheese, soft", series(&[(date(2021, 2, 13), 250.0)]));
        table.insert("Milk", series(&[(date(2021, 2, 13), 80.0)]));

        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("Period,\"Cheese, soft\",Milk\n"));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["Period", "Cheese, soft", "Milk"]);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "2021-02-13");
        assert_eq!(&records[0][1], "250.00");
        assert_eq!(&records[0][2], "80.00");
    }
}
