use crate::error::{LedgerError, Result};
use crate::hierarchy::HierarchyMaps;
use crate::table::{has_partial_quantity, ItemTable};
use crate::units::{UnitFamily, UnitSplit};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Cost,
    Volume,
    Packs,
}

impl Metric {
    pub fn unit_family(&self) -> Option<UnitFamily> {
        match self {
            Metric::Cost => None,
            Metric::Volume => Some(UnitFamily::WeightVolume),
            Metric::Packs => Some(UnitFamily::Packs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeLevel {
    Item,
    Subcategory,
    Category,
    Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub label: String,
    /// `None` for the root (or for the anchor of a drill-down slice).
    pub parent: Option<String>,
    pub level: NodeLevel,
    pub value: f64,
    pub share_of_parent: Option<f64>,
    /// Items only: share of the top-level category, when that level is shown.
    pub share_of_category: Option<f64>,
    /// Omitted when the parent is the root, where it equals `share_of_parent`.
    pub share_of_total: Option<f64>,
    /// Some item at or below this node has cost recorded without quantity.
    pub partial_quantity: bool,
}

impl HierarchyNode {
    fn new(label: &str, parent: Option<&str>, level: NodeLevel, value: f64) -> Self {
        Self {
            label: label.to_string(),
            parent: parent.map(str::to_string),
            level,
            value,
            share_of_parent: None,
            share_of_category: None,
            share_of_total: None,
            partial_quantity: false,
        }
    }

    pub(crate) fn detach(&mut self) {
        self.parent = None;
        self.share_of_parent = None;
        self.share_of_category = None;
        self.share_of_total = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionState {
    Populated,
    /// No active items: the table is a single zero-valued root.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collapse {
    pub subcategories: bool,
    pub categories: bool,
}

/// One row per label of the item → subcategory → category → root tree for a
/// single metric, stored in an arena with parent and child indices.
///
/// Levels with a single member are collapsed: with one subcategory the items
/// hang directly off the root; with one category the subcategories do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstTable {
    metric: Metric,
    rows: Vec<HierarchyNode>,
    collapse: Collapse,
    state: SelectionState,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
    #[serde(skip)]
    parents: Vec<Option<usize>>,
    #[serde(skip)]
    children: Vec<Vec<usize>>,
}

struct Links {
    index: BTreeMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

fn link(rows: &[HierarchyNode]) -> Result<Links> {
    let mut index = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        if index.insert(row.label.clone(), i).is_some() {
            return Err(LedgerError::LabelCollision(row.label.clone()));
        }
    }

    let mut parents = vec![None; rows.len()];
    let mut children = vec![Vec::new(); rows.len()];
    for (i, row) in rows.iter().enumerate() {
        if let Some(parent) = &row.parent {
            let p = *index.get(parent).ok_or_else(|| {
                LedgerError::DataIntegrityViolation {
                    item: row.label.clone(),
                    column: "parent".to_string(),
                    details: format!("parent '{}' is not part of the hierarchy", parent),
                }
            })?;
            parents[i] = Some(p);
            children[p].push(i);
        }
    }

    Ok(Links {
        index,
        parents,
        children,
    })
}

fn ratio(value: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(value / denominator)
    }
}

impl SunburstTable {
    fn assemble(
        metric: Metric,
        rows: Vec<HierarchyNode>,
        collapse: Collapse,
        state: SelectionState,
        links: Links,
    ) -> Self {
        Self {
            metric,
            rows,
            collapse,
            state,
            index: links.index,
            parents: links.parents,
            children: links.children,
        }
    }

    fn empty(metric: Metric, root_label: &str) -> Self {
        let rows = vec![HierarchyNode::new(root_label, None, NodeLevel::Root, 0.0)];
        let links = Links {
            index: BTreeMap::from([(root_label.to_string(), 0)]),
            parents: vec![None],
            children: vec![Vec::new()],
        };
        Self::assemble(metric, rows, Collapse::default(), SelectionState::Empty, links)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn rows(&self) -> &[HierarchyNode] {
        &self.rows
    }

    pub fn collapse(&self) -> Collapse {
        self.collapse
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn root(&self) -> &HierarchyNode {
        let idx = self.parents.iter().position(Option::is_none).unwrap_or(0);
        &self.rows[idx]
    }

    pub fn get(&self, label: &str) -> Option<&HierarchyNode> {
        self.index.get(label).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn is_leaf(&self, label: &str) -> bool {
        self.get(label).is_some_and(|n| n.level == NodeLevel::Item)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|n| n.level == NodeLevel::Item)
            .map(|n| n.label.as_str())
    }

    pub fn children(&self, label: &str) -> Vec<&HierarchyNode> {
        match self.index.get(label) {
            Some(&i) => self.children[i].iter().map(|&c| &self.rows[c]).collect(),
            None => Vec::new(),
        }
    }

    /// Labels from the node's parent up to the root.
    pub fn ancestors(&self, label: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.index.get(label).and_then(|&i| self.parents[i]);
        while let Some(i) = current {
            chain.push(self.rows[i].label.as_str());
            current = self.parents[i];
        }
        chain
    }

    /// The node and all its descendants, in table order.
    pub fn subtree(&self, label: &str) -> Vec<&HierarchyNode> {
        let Some(&start) = self.index.get(label) else {
            return Vec::new();
        };

        let mut members = Vec::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            members.push(i);
            stack.extend(self.children[i].iter().copied());
        }
        members.sort_unstable();

        members.into_iter().map(|i| &self.rows[i]).collect()
    }

    /// Checks that every inner node's value equals the sum of its children.
    pub fn verify_tree_sums(&self, tolerance: f64) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if self.children[i].is_empty() {
                continue;
            }
            let sum: f64 = self.children[i].iter().map(|&c| self.rows[c].value).sum();
            let difference = (row.value - sum).abs();
            if difference > tolerance {
                return Err(LedgerError::DataIntegrityViolation {
                    item: row.label.clone(),
                    column: "value".to_string(),
                    details: format!(
                        "node value {} differs from the sum of its children {} by {}",
                        row.value, sum, difference
                    ),
                });
            }
        }
        Ok(())
    }
}

pub struct SunburstBuilder<'a> {
    maps: &'a HierarchyMaps,
    root_label: &'a str,
}

impl<'a> SunburstBuilder<'a> {
    pub fn new(maps: &'a HierarchyMaps, root_label: &'a str) -> Self {
        Self { maps, root_label }
    }

    /// Aggregates `metric` over the items of its table that are in
    /// `active_items`. Partial-quantity flags always compare the cost and
    /// quantity tables, whatever the metric.
    pub fn build(
        &self,
        metric: Metric,
        cost: &ItemTable,
        quantity: &ItemTable,
        active_items: &BTreeSet<String>,
    ) -> Result<SunburstTable> {
        let table = match metric {
            Metric::Cost => cost,
            Metric::Volume | Metric::Packs => quantity,
        };

        let items: Vec<&str> = table
            .items()
            .filter(|item| active_items.contains(*item))
            .collect();

        if items.is_empty() {
            warn!("No active items for {:?} hierarchy; returning an empty root", metric);
            return Ok(SunburstTable::empty(metric, self.root_label));
        }

        let mut subcategories: Vec<&str> = Vec::new();
        let mut item_parents: Vec<usize> = Vec::with_capacity(items.len());
        for item in &items {
            let subcategory = self.maps.subcategory_of(item).ok_or_else(|| {
                LedgerError::DataIntegrityViolation {
                    item: item.to_string(),
                    column: "subcategory".to_string(),
                    details: "active item has no subcategory in the hierarchy maps".to_string(),
                }
            })?;
            item_parents.push(position_or_push(&mut subcategories, subcategory));
        }

        let mut categories: Vec<&str> = Vec::new();
        let mut subcategory_parents: Vec<usize> = Vec::with_capacity(subcategories.len());
        for subcategory in &subcategories {
            let category = self.maps.category_of(subcategory).ok_or_else(|| {
                LedgerError::DataIntegrityViolation {
                    item: subcategory.to_string(),
                    column: "category".to_string(),
                    details: "subcategory has no category in the hierarchy maps".to_string(),
                }
            })?;
            subcategory_parents.push(position_or_push(&mut categories, category));
        }

        let collapse = Collapse {
            subcategories: subcategories.len() == 1,
            categories: categories.len() == 1,
        };

        let item_values: Vec<f64> = items.iter().map(|item| table.total(item)).collect();
        let mut subcategory_values = vec![0.0; subcategories.len()];
        for (i, &s) in item_parents.iter().enumerate() {
            subcategory_values[s] += item_values[i];
        }
        let mut category_values = vec![0.0; categories.len()];
        for (s, &c) in subcategory_parents.iter().enumerate() {
            category_values[c] += subcategory_values[s];
        }
        let root_value: f64 = item_values.iter().sum();

        let root = self.root_label;
        let mut rows = Vec::with_capacity(items.len() + subcategories.len() + categories.len() + 1);

        for (i, item) in items.iter().enumerate() {
            let parent = if collapse.subcategories {
                root
            } else {
                subcategories[item_parents[i]]
            };
            rows.push(HierarchyNode::new(item, Some(parent), NodeLevel::Item, item_values[i]));
        }
        if !collapse.subcategories {
            for (s, subcategory) in subcategories.iter().enumerate() {
                let parent = if collapse.categories {
                    root
                } else {
                    categories[subcategory_parents[s]]
                };
                rows.push(HierarchyNode::new(
                    subcategory,
                    Some(parent),
                    NodeLevel::Subcategory,
                    subcategory_values[s],
                ));
            }
        }
        if !collapse.categories {
            for (c, category) in categories.iter().enumerate() {
                rows.push(HierarchyNode::new(
                    category,
                    Some(root),
                    NodeLevel::Category,
                    category_values[c],
                ));
            }
        }
        rows.push(HierarchyNode::new(root, None, NodeLevel::Root, root_value));

        let links = link(&rows)?;

        if root_value != 0.0 {
            assign_shares(&mut rows, &links.parents, root_value);
        }

        for i in 0..rows.len() {
            if rows[i].level == NodeLevel::Item
                && has_partial_quantity(cost, quantity, &rows[i].label)
            {
                let mut current = Some(i);
                while let Some(j) = current {
                    rows[j].partial_quantity = true;
                    current = links.parents[j];
                }
            }
        }

        debug!(
            "Built {:?} hierarchy: {} items, {} subcategories, {} categories, collapse {:?}",
            metric,
            items.len(),
            subcategories.len(),
            categories.len(),
            collapse
        );

        Ok(SunburstTable::assemble(
            metric,
            rows,
            collapse,
            SelectionState::Populated,
            links,
        ))
    }
}

fn position_or_push<'s>(labels: &mut Vec<&'s str>, label: &'s str) -> usize {
    match labels.iter().position(|l| *l == label) {
        Some(pos) => pos,
        None => {
            labels.push(label);
            labels.len() - 1
        }
    }
}

fn assign_shares(rows: &mut [HierarchyNode], parents: &[Option<usize>], root_value: f64) {
    for i in 0..rows.len() {
        let Some(p) = parents[i] else {
            continue;
        };
        let value = rows[i].value;
        rows[i].share_of_parent = ratio(value, rows[p].value);

        if let Some(grandparent) = parents[p] {
            rows[i].share_of_total = ratio(value, root_value);
            if rows[i].level == NodeLevel::Item && rows[grandparent].level == NodeLevel::Category {
                rows[i].share_of_category = ratio(value, rows[grandparent].value);
            }
        }
    }
}

/// The three linked views of one period selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstSet {
    pub cost: SunburstTable,
    pub volume: SunburstTable,
    pub packs: SunburstTable,
    /// Leaf items of the cost view; clicks on these never drill down.
    pub leaf_items: BTreeSet<String>,
}

impl SunburstSet {
    pub fn get(&self, metric: Metric) -> &SunburstTable {
        match metric {
            Metric::Cost => &self.cost,
            Metric::Volume => &self.volume,
            Metric::Packs => &self.packs,
        }
    }

    /// Every view other than `metric`'s.
    pub fn linked(&self, metric: Metric) -> Vec<&SunburstTable> {
        [&self.cost, &self.volume, &self.packs]
            .into_iter()
            .filter(|t| t.metric() != metric)
            .collect()
    }
}

pub fn build_sunburst_set(
    cost: &ItemTable,
    quantity: &ItemTable,
    units: &UnitSplit,
    maps: &HierarchyMaps,
    root_label: &str,
) -> Result<SunburstSet> {
    let builder = SunburstBuilder::new(maps, root_label);
    let all_items = cost.item_set();
    let build = |metric: Metric| {
        let active = match metric.unit_family() {
            Some(family) => units.items(family),
            None => &all_items,
        };
        builder.build(metric, cost, quantity, active)
    };

    let cost_table = build(Metric::Cost)?;
    let volume = build(Metric::Volume)?;
    let packs = build(Metric::Packs)?;
    let leaf_items = cost_table.leaves().map(str::to_string).collect();

    Ok(SunburstSet {
        cost: cost_table,
        volume,
        packs,
        leaf_items,
    })
}
