use crate::schema::UnitOverrides;
use crate::table::ItemTable;
use crate::utils::is_whole_number;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitFamily {
    /// Kilograms or litres.
    WeightVolume,
    /// Discrete packs or pieces.
    Packs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitSplit {
    pub weight_volume: BTreeSet<String>,
    pub packs: BTreeSet<String>,
}

impl UnitSplit {
    /// Classifies items by their full quantity history: an item whose every
    /// recorded quantity is a whole number is counted in packs.
    pub fn classify(quantity: &ItemTable, overrides: &UnitOverrides) -> Self {
        let mut split = Self::default();

        for (item, series) in quantity.iter() {
            let forced = overrides.weight_volume_items.iter().any(|i| i == item);
            if !forced && series.values().all(|q| is_whole_number(*q)) {
                split.packs.insert(item.to_string());
            } else {
                split.weight_volume.insert(item.to_string());
            }
        }

        split
    }

    pub fn family_of(&self, item: &str) -> Option<UnitFamily> {
        if self.packs.contains(item) {
            Some(UnitFamily::Packs)
        } else if self.weight_volume.contains(item) {
            Some(UnitFamily::WeightVolume)
        } else {
            None
        }
    }

    pub fn items(&self, family: UnitFamily) -> &BTreeSet<String> {
        match family {
            UnitFamily::WeightVolume => &self.weight_volume,
            UnitFamily::Packs => &self.packs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_classify() {
        let d1 = NaiveDate::from_ymd_opt(2021, 2, 13).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2021, 2, 20).unwrap();

        let mut quantity = ItemTable::new();
        quantity.insert("Milk", [(d1, 1.0), (d2, 2.0)].into_iter().collect());
        quantity.insert("Cheese", [(d1, 0.35), (d2, 0.0)].into_iter().collect());
        quantity.insert("Flour", [(d1, 2.0), (d2, 1.0)].into_iter().collect());

        let overrides = UnitOverrides {
            weight_volume_items: vec!["Flour".to_string()],
        };
        let split = UnitSplit::classify(&quantity, &overrides);

        assert_eq!(split.family_of("Milk"), Some(UnitFamily::Packs));
        assert_eq!(split.family_of("Cheese"), Some(UnitFamily::WeightVolume));
        assert_eq!(split.family_of("Flour"), Some(UnitFamily::WeightVolume));
        assert_eq!(split.family_of("Bread"), None);
        assert_eq!(split.items(UnitFamily::Packs).len(), 1);
    }
}
