use crate::sunburst::{HierarchyNode, NodeLevel, SunburstTable};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub label: String,
    pub parent: Option<String>,
    /// Centre of the source view at the time of the click.
    pub entry: Option<String>,
}

impl ClickEvent {
    /// Builds an event from chart callback fields, where an empty string
    /// stands for "absent".
    pub fn new(label: &str, parent: &str, entry: &str) -> Self {
        let present = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            label: label.to_string(),
            parent: present(parent),
            entry: present(entry),
        }
    }

    /// Clicking a node other than the current centre zooms into it; clicking
    /// the centre zooms back out.
    pub fn zooms_in(&self) -> bool {
        self.entry.as_deref().is_some_and(|e| e != self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSlice {
    pub anchor: String,
    /// Anchor and descendants in target table order; the anchor is detached.
    pub rows: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrillDown {
    /// Keep whatever the target currently shows.
    Unchanged,
    Zoomed(SelectionSlice),
    /// Show the whole target table.
    Full,
}

impl DrillDown {
    /// Rows the target should display, or `None` to leave it as is.
    pub fn rows<'t>(&'t self, target: &'t SunburstTable) -> Option<&'t [HierarchyNode]> {
        match self {
            DrillDown::Unchanged => None,
            DrillDown::Zoomed(slice) => Some(&slice.rows),
            DrillDown::Full => Some(target.rows()),
        }
    }
}

/// Zooms `target` to the node nearest to the click that it also shows.
///
/// A node clicked in the source may be missing from the target, or collapsed
/// away there. The target then zooms to the nearest ancestor it does have,
/// or shows everything.
pub fn drill_down(
    click: &ClickEvent,
    source: &SunburstTable,
    target: &SunburstTable,
) -> DrillDown {
    let Some(parent) = click.parent.as_deref() else {
        return DrillDown::Unchanged;
    };
    if source.is_leaf(&click.label) {
        return DrillDown::Unchanged;
    }

    let mut candidates: Vec<&str> = Vec::new();
    if click.zooms_in() {
        candidates.push(&click.label);
    }
    candidates.push(parent);
    candidates.extend(source.ancestors(parent));

    let anchor = candidates.into_iter().find_map(|label| {
        target
            .get(label)
            .filter(|node| node.level != NodeLevel::Item)
    });

    match anchor {
        Some(node) if node.parent.is_some() => {
            debug!(
                "Click on '{}' anchors {:?} view at '{}'",
                click.label,
                target.metric(),
                node.label
            );
            DrillDown::Zoomed(slice(target, &node.label))
        }
        _ => DrillDown::Full,
    }
}

/// Applies one click to every linked target.
pub fn synchronize(
    click: &ClickEvent,
    source: &SunburstTable,
    targets: &[&SunburstTable],
) -> Vec<DrillDown> {
    targets
        .iter()
        .map(|target| drill_down(click, source, target))
        .collect()
}

fn slice(target: &SunburstTable, anchor: &str) -> SelectionSlice {
    let mut rows: Vec<HierarchyNode> = target.subtree(anchor).into_iter().cloned().collect();
    if let Some(node) = rows.iter_mut().find(|n| n.label == anchor) {
        node.detach();
    }
    SelectionSlice {
        anchor: anchor.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyMaps;
    use crate::schema::CategoryScheme;
    use crate::sunburst::{Metric, SunburstBuilder};
    use crate::table::ItemTable;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    struct Views {
        cost: SunburstTable,
        volume: SunburstTable,
        packs: SunburstTable,
    }

    fn views() -> Views {
        let maps = HierarchyMaps::from_items(
            [
                ("Milk", "Dairy"),
                ("Kefir", "Dairy"),
                ("Bread", "Bakery"),
                ("Soap", "Household items"),
            ],
            &CategoryScheme::default(),
        )
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let mut cost = ItemTable::new();
        let mut quantity = ItemTable::new();
        for (item, c, q) in [
            ("Milk", 80.0, 1.5),
            ("Kefir", 50.0, 0.5),
            ("Bread", 30.0, 1.0),
            ("Soap", 200.0, 2.0),
        ] {
            cost.insert(item, [(day, c)].into_iter().collect());
            quantity.insert(item, [(day, q)].into_iter().collect());
        }

        let set = |items: &[&str]| -> BTreeSet<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        let builder = SunburstBuilder::new(&maps, "Total");
        Views {
            cost: builder
                .build(Metric::Cost, &cost, &quantity, &cost.item_set())
                .unwrap(),
            volume: builder
                .build(Metric::Volume, &cost, &quantity, &set(&["Milk", "Kefir"]))
                .unwrap(),
            packs: builder
                .build(Metric::Packs, &cost, &quantity, &set(&["Bread", "Soap"]))
                .unwrap(),
        }
    }

    fn labels(result: &DrillDown) -> Vec<&str> {
        match result {
            DrillDown::Zoomed(slice) => slice.rows.iter().map(|n| n.label.as_str()).collect(),
            other => panic!("expected a zoomed slice, got {:?}", other),
        }
    }

    #[test]
    fn test_click_event_from_callback_fields() {
        let click = ClickEvent::new("Dairy", "Foodstuff", "");
        assert_eq!(click.parent.as_deref(), Some("Foodstuff"));
        assert_eq!(click.entry, None);
        assert!(!click.zooms_in());
        assert!(ClickEvent::new("Dairy", "Foodstuff", "Total").zooms_in());
    }

    #[test]
    fn test_leaf_and_root_clicks_are_ignored() {
        let v = views();
        let leaf = ClickEvent::new("Milk", "Dairy", "Total");
        assert_eq!(drill_down(&leaf, &v.cost, &v.packs), DrillDown::Unchanged);

        let root = ClickEvent::new("Total", "", "");
        assert_eq!(drill_down(&root, &v.cost, &v.packs), DrillDown::Unchanged);
    }

    #[test]
    fn test_zoom_in_exact_match() {
        let v = views();
        let click = ClickEvent::new("Household", "Total", "Total");
        let result = drill_down(&click, &v.cost, &v.packs);

        assert_eq!(labels(&result), vec!["Soap", "Household items", "Household"]);
        if let DrillDown::Zoomed(slice) = &result {
            assert_eq!(slice.anchor, "Household");
            let anchor = slice.rows.last().unwrap();
            assert_eq!(anchor.parent, None);
            assert_eq!(anchor.share_of_parent, None);
            assert_eq!(anchor.share_of_total, None);
            let soap = &slice.rows[0];
            assert_eq!(soap.parent.as_deref(), Some("Household items"));
        }
    }

    #[test]
    fn test_zoom_in_falls_back_to_nearest_surviving_ancestor() {
        let v = views();
        let click = ClickEvent::new("Dairy", "Foodstuff", "Total");

        let result = drill_down(&click, &v.cost, &v.packs);
        assert_eq!(labels(&result), vec!["Bread", "Bakery", "Foodstuff"]);
    }

    #[test]
    fn test_collapsed_target_shows_everything() {
        let v = views();
        let click = ClickEvent::new("Dairy", "Foodstuff", "Total");
        assert_eq!(drill_down(&click, &v.cost, &v.volume), DrillDown::Full);
        assert_eq!(
            DrillDown::Full.rows(&v.volume).map(<[HierarchyNode]>::len),
            Some(v.volume.len())
        );
    }

    #[test]
    fn test_zoom_out_anchors_at_parent() {
        let v = views();
        let click = ClickEvent::new("Dairy", "Foodstuff", "Dairy");
        let result = drill_down(&click, &v.cost, &v.packs);
        assert_eq!(labels(&result), vec!["Bread", "Bakery", "Foodstuff"]);

        let to_root = ClickEvent::new("Foodstuff", "Total", "Foodstuff");
        assert_eq!(drill_down(&to_root, &v.cost, &v.packs), DrillDown::Full);
    }

    #[test]
    fn test_synchronize_every_target() {
        let v = views();
        let click = ClickEvent::new("Dairy", "Foodstuff", "Total");
        let results = synchronize(&click, &v.cost, &[&v.volume, &v.packs]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], DrillDown::Full);
        assert!(matches!(results[1], DrillDown::Zoomed(ref s) if s.anchor == "Foodstuff"));
        assert_eq!(results[1].rows(&v.packs).map(<[HierarchyNode]>::len), Some(3));
    }
}
