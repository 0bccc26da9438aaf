use crate::error::{LedgerError, Result};
use crate::schema::CategoryScheme;
use crate::utils::csv_into_string;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Narrows a view to part of the hierarchy. An empty list accepts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemFilter {
    #[default]
    All,
    Categories(BTreeSet<String>),
    Subcategories(BTreeSet<String>),
    Items(BTreeSet<String>),
}

impl ItemFilter {
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ItemFilter::Categories(names.into_iter().map(Into::into).collect())
    }

    pub fn subcategories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ItemFilter::Subcategories(names.into_iter().map(Into::into).collect())
    }

    pub fn items<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ItemFilter::Items(names.into_iter().map(Into::into).collect())
    }

    /// Items unknown to `maps` are only accepted by `All` and `Items`.
    pub fn accepts(&self, item: &str, maps: &HierarchyMaps) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::Categories(names) => maps
                .category_of_item(item)
                .is_some_and(|c| names.contains(c)),
            ItemFilter::Subcategories(names) => maps
                .subcategory_of(item)
                .is_some_and(|s| names.contains(s)),
            ItemFilter::Items(names) => names.contains(item),
        }
    }
}

/// Item → subcategory and subcategory → category lookups for one ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyMaps {
    item_subcategory: BTreeMap<String, String>,
    subcategory_category: BTreeMap<String, String>,
}

impl HierarchyMaps {
    /// Builds the maps from `(item, subcategory)` pairs. Item names must be
    /// unique across the whole ledger.
    pub fn from_items<'a, I>(pairs: I, scheme: &CategoryScheme) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut maps = Self::default();

        for (item, subcategory) in pairs {
            if let Some(existing) = maps.item_subcategory.get(item) {
                return Err(LedgerError::DuplicateItem {
                    item: item.to_string(),
                    first: existing.clone(),
                    second: subcategory.to_string(),
                });
            }
            maps.item_subcategory
                .insert(item.to_string(), subcategory.to_string());
            maps.subcategory_category
                .entry(subcategory.to_string())
                .or_insert_with(|| scheme.category_for(subcategory).to_string());
        }

        Ok(maps)
    }

    pub fn subcategory_of(&self, item: &str) -> Option<&str> {
        self.item_subcategory.get(item).map(String::as_str)
    }

    pub fn category_of(&self, subcategory: &str) -> Option<&str> {
        self.subcategory_category.get(subcategory).map(String::as_str)
    }

    pub fn category_of_item(&self, item: &str) -> Option<&str> {
        self.subcategory_of(item).and_then(|s| self.category_of(s))
    }

    pub fn item_subcategory(&self) -> &BTreeMap<String, String> {
        &self.item_subcategory
    }

    pub fn subcategory_category(&self) -> &BTreeMap<String, String> {
        &self.subcategory_category
    }

    pub fn items_by_subcategory(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (item, subcategory) in &self.item_subcategory {
            grouped.entry(subcategory.as_str()).or_default().push(item.as_str());
        }
        grouped
    }

    pub fn subcategories_by_category(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (subcategory, category) in &self.subcategory_category {
            grouped.entry(category.as_str()).or_default().push(subcategory.as_str());
        }
        grouped
    }

    pub fn total_items(&self) -> usize {
        self.item_subcategory.len()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Maps restricted to `items`. Subcategories left without items are dropped.
    pub fn restrict_to<'a, I>(&self, items: I) -> HierarchyMaps
    where
        I: IntoIterator<Item = &'a str>,
    {
        let item_subcategory: BTreeMap<String, String> = items
            .into_iter()
            .filter_map(|item| {
                self.item_subcategory
                    .get_key_value(item)
                    .map(|(k, v)| (k.clone(), v.clone()))
            })
            .collect();
        let subcategory_category = self
            .subcategory_category
            .iter()
            .filter(|(subcategory, _)| item_subcategory.values().any(|s| s == *subcategory))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        HierarchyMaps {
            item_subcategory,
            subcategory_category,
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(["Category", "Subcategory", "Item"])?;

        for (item, subcategory) in &self.item_subcategory {
            let category = self.category_of(subcategory).unwrap_or_default();
            wtr.write_record([category, subcategory.as_str(), item.as_str()])?;
        }

        csv_into_string(wtr)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let items = self.items_by_subcategory();

        for (category, subcategories) in self.subcategories_by_category() {
            output.push_str(&format!("## {}\n\n", category));
            for subcategory in subcategories {
                output.push_str(&format!("### {}\n\n", subcategory));
                for item in items.get(subcategory).into_iter().flatten() {
                    output.push_str(&format!("- {}\n", item));
                }
                output.push('\n');
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HierarchyMaps {
        HierarchyMaps::from_items(
            [
                ("Milk", "Dairy"),
                ("Kefir", "Dairy"),
                ("Soap", "Household items"),
            ],
            &CategoryScheme::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_lookups() {
        let maps = sample();
        assert_eq!(maps.subcategory_of("Milk"), Some("Dairy"));
        assert_eq!(maps.category_of("Dairy"), Some("Foodstuff"));
        assert_eq!(maps.category_of_item("Soap"), Some("Household"));
        assert_eq!(maps.total_items(), 3);
        assert_eq!(maps.items_by_subcategory()["Dairy"], vec!["Kefir", "Milk"]);
    }

    #[test]
    fn test_item_in_two_subcategories_is_rejected() {
        let result = HierarchyMaps::from_items(
            [("Tuna", "Fish"), ("Tuna", "Canned food")],
            &CategoryScheme::default(),
        );
        assert!(matches!(result, Err(LedgerError::DuplicateItem { .. })));
    }

    #[test]
    fn test_item_filter() {
        let maps = sample();

        assert!(ItemFilter::All.accepts("Milk", &maps));
        assert!(ItemFilter::categories(["Household"]).accepts("Soap", &maps));
        assert!(!ItemFilter::categories(["Household"]).accepts("Milk", &maps));
        assert!(ItemFilter::subcategories(["Dairy"]).accepts("Kefir", &maps));
        assert!(!ItemFilter::subcategories(["Dairy"]).accepts("Bread", &maps));
        assert!(ItemFilter::items(["Milk"]).accepts("Milk", &maps));
        assert!(!ItemFilter::items(Vec::<String>::new()).accepts("Milk", &maps));
    }

    #[test]
    fn test_restrict_to_drops_empty_subcategories() {
        let maps = sample();
        let restricted = maps.restrict_to(["Milk", "Bread"]);

        assert_eq!(restricted.total_items(), 1);
        assert_eq!(restricted.subcategory_of("Milk"), Some("Dairy"));
        assert_eq!(restricted.category_of("Dairy"), Some("Foodstuff"));
        assert_eq!(restricted.category_of("Household items"), None);
        assert!(maps.restrict_to(std::iter::empty()).subcategory_category().is_empty());
    }

    #[test]
    fn test_csv_export_quotes_commas() {
        let maps = HierarchyMaps::from_items(
            [("Cheese, soft", "Dairy"), ("Milk", "Dairy")],
            &CategoryScheme::default(),
        )
        .unwrap();

        let csv = maps.to_csv().unwrap();
        assert!(csv.contains("Foodstuff,Dairy,\"Cheese, soft\""));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["Foodstuff", "Dairy", "Cheese, soft"],
                vec!["Foodstuff", "Dairy", "Milk"],
            ]
        );
    }

    #[test]
    fn test_exports() {
        let maps = sample();
        let csv = maps.to_csv().unwrap();
        assert!(csv.contains("Category,Subcategory,Item"));
        assert!(csv.contains("Foodstuff,Dairy,Milk"));

        let markdown = maps.to_markdown();
        assert!(markdown.contains("## Household"));
        assert!(markdown.contains("- Soap"));
    }
}
