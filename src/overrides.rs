use crate::error::{LedgerError, Result};
use crate::ledger::LedgerRow;
use crate::schema::{
    CategoryReassignment, ItemKey, MeaningfulOthers, QuantityScale, UnificationGroup,
};
use log::debug;

pub const REASSIGNMENTS_TABLE: &str = "reassignments";
pub const UNIFICATIONS_TABLE: &str = "unifications";
pub const OTHERS_TABLE: &str = "meaningful_others";
pub const QUANTITY_SCALES_TABLE: &str = "quantity_scales";

fn unknown(table: &str, category: &str, item: &str) -> LedgerError {
    LedgerError::UnknownUnificationTarget {
        table: table.to_string(),
        category: category.to_string(),
        item: item.to_string(),
    }
}

pub(crate) fn apply_reassignments(
    rows: &mut [LedgerRow],
    reassignments: &[CategoryReassignment],
) -> Result<()> {
    for reassignment in reassignments {
        let mut matched = false;
        for row in rows.iter_mut().filter(|r| r.key.item == reassignment.item_name) {
            row.key.category = reassignment.new_category.clone();
            matched = true;
        }
        if !matched {
            return Err(unknown(REASSIGNMENTS_TABLE, "*", &reassignment.item_name));
        }
    }
    Ok(())
}

/// Sums the source rows into the group's target row and removes the sources.
/// A target that already exists (and is not a source) absorbs the sum.
pub(crate) fn apply_unification(
    rows: &mut Vec<LedgerRow>,
    group: &UnificationGroup,
    table: &str,
) -> Result<()> {
    let width = rows.first().map(|r| r.cost.len()).unwrap_or(0);
    let target_key = ItemKey::new(group.category.clone(), group.new_item.clone());
    let mut merged = LedgerRow::zeroed(target_key.clone(), width);
    let mut indices_to_remove = Vec::new();

    for key in &group.items_to_unite {
        let idx = rows
            .iter()
            .position(|r| r.key == *key)
            .ok_or_else(|| unknown(table, &key.category, &key.item))?;
        if indices_to_remove.contains(&idx) {
            continue;
        }
        merged.absorb(&rows[idx]);
        indices_to_remove.push(idx);
    }

    indices_to_remove.sort_by(|a, b| b.cmp(a));
    for i in indices_to_remove {
        rows.remove(i);
    }

    if let Some(existing) = rows.iter_mut().find(|r| r.key == target_key) {
        existing.absorb(&merged);
    } else {
        rows.push(merged);
    }

    debug!(
        "Unified {} rows into ({}, {})",
        group.items_to_unite.len(),
        group.category,
        group.new_item
    );

    Ok(())
}

/// Sweeps every unclaimed row of the catch-all category into one item.
/// Returns the names of the swept rows.
pub(crate) fn apply_others(
    rows: &mut Vec<LedgerRow>,
    others: &MeaningfulOthers,
) -> Result<Vec<String>> {
    for meaningful in &others.meaningful_items {
        let present = rows
            .iter()
            .any(|r| r.key.category == others.category && r.key.item == *meaningful);
        if !present {
            return Err(unknown(OTHERS_TABLE, &others.category, meaningful));
        }
    }

    let sources: Vec<ItemKey> = rows
        .iter()
        .filter(|r| {
            r.key.category == others.category
                && r.key.item != others.new_item
                && !others.meaningful_items.contains(&r.key.item)
        })
        .map(|r| r.key.clone())
        .collect();

    if sources.is_empty() {
        return Ok(Vec::new());
    }

    let swept = sources.iter().map(|k| k.item.clone()).collect();
    let group = UnificationGroup {
        category: others.category.clone(),
        new_item: others.new_item.clone(),
        items_to_unite: sources,
    };
    apply_unification(rows, &group, OTHERS_TABLE)?;

    Ok(swept)
}

pub(crate) fn apply_quantity_scales(
    rows: &mut [LedgerRow],
    scales: &[QuantityScale],
) -> Result<()> {
    for scale in scales {
        let row = rows
            .iter_mut()
            .find(|r| r.key.item == scale.item)
            .ok_or_else(|| unknown(QUANTITY_SCALES_TABLE, "*", &scale.item))?;
        for q in &mut row.quantity {
            *q *= scale.factor;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, item: &str, cost: &[f64]) -> LedgerRow {
        LedgerRow {
            key: ItemKey::new(category, item),
            cost: cost.to_vec(),
            quantity: cost.iter().map(|c| if *c > 0.0 { 1.0 } else { 0.0 }).collect(),
        }
    }

    fn find<'a>(rows: &'a [LedgerRow], item: &str) -> Option<&'a LedgerRow> {
        rows.iter().find(|r| r.key.item == item)
    }

    #[test]
    fn test_unification_sums_and_removes_sources() {
        let mut rows = vec![
            row("Snacks", "A", &[1.0, 2.0, 3.0]),
            row("Snacks", "B", &[4.0, 0.0, 1.0]),
            row("Snacks", "D", &[9.0, 9.0, 9.0]),
        ];
        let group = UnificationGroup {
            category: "Snacks".to_string(),
            new_item: "C".to_string(),
            items_to_unite: vec![ItemKey::new("Snacks", "A"), ItemKey::new("Snacks", "B")],
        };

        apply_unification(&mut rows, &group, UNIFICATIONS_TABLE).unwrap();

        assert!(find(&rows, "A").is_none());
        assert!(find(&rows, "B").is_none());
        let c = find(&rows, "C").unwrap();
        assert_eq!(c.cost, vec![5.0, 2.0, 4.0]);
        assert_eq!(c.quantity, vec![2.0, 1.0, 2.0]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_unification_target_may_be_a_source() {
        let mut rows = vec![
            row("Grocery", "Sugar", &[1.0, 0.0]),
            row("Grocery", "Icing sugar", &[0.0, 2.0]),
        ];
        let group = UnificationGroup {
            category: "Grocery".to_string(),
            new_item: "Sugar".to_string(),
            items_to_unite: vec![
                ItemKey::new("Grocery", "Sugar"),
                ItemKey::new("Grocery", "Icing sugar"),
            ],
        };

        apply_unification(&mut rows, &group, UNIFICATIONS_TABLE).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cost, vec![1.0, 2.0]);
    }

    #[test]
    fn test_unknown_source_is_fatal() {
        let mut rows = vec![row("Snacks", "A", &[1.0])];
        let group = UnificationGroup {
            category: "Snacks".to_string(),
            new_item: "C".to_string(),
            items_to_unite: vec![ItemKey::new("Snacks", "A"), ItemKey::new("Fish", "A")],
        };

        let err = apply_unification(&mut rows, &group, UNIFICATIONS_TABLE).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnknownUnificationTarget { ref category, .. } if category == "Fish"
        ));
        assert_eq!(rows.len(), 1, "rows must be untouched on error");
    }

    #[test]
    fn test_reassignment() {
        let mut rows = vec![row("Dairy", "Toffee", &[1.0])];
        apply_reassignments(
            &mut rows,
            &[CategoryReassignment {
                item_name: "Toffee".to_string(),
                new_category: "Sweets".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(rows[0].key.category, "Sweets");

        let missing = apply_reassignments(
            &mut rows,
            &[CategoryReassignment {
                item_name: "Fudge".to_string(),
                new_category: "Sweets".to_string(),
            }],
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_others_sweep() {
        let mut rows = vec![
            row("Other expenses", "Glasses", &[100.0]),
            row("Other expenses", "Batteries", &[10.0]),
            row("Other expenses", "Light bulb", &[5.0]),
            row("Dairy", "Milk", &[1.0]),
        ];
        let others = MeaningfulOthers {
            category: "Other expenses".to_string(),
            new_item: "Miscellaneous".to_string(),
            meaningful_items: vec!["Glasses".to_string()],
        };

        let swept = apply_others(&mut rows, &others).unwrap();
        assert_eq!(swept, vec!["Batteries", "Light bulb"]);
        assert_eq!(find(&rows, "Miscellaneous").unwrap().cost, vec![15.0]);
        assert!(find(&rows, "Glasses").is_some());
        assert!(find(&rows, "Milk").is_some());
    }

    #[test]
    fn test_quantity_scale() {
        let mut rows = vec![row("Eggs", "Chicken eggs", &[90.0, 0.0])];
        apply_quantity_scales(
            &mut rows,
            &[QuantityScale {
                item: "Chicken eggs".to_string(),
                factor: 10.0,
            }],
        )
        .unwrap();
        assert_eq!(rows[0].quantity, vec![10.0, 0.0]);
    }
}
