use expense_hierarchy_builder::*;

fn print_rows(rows: &[HierarchyNode]) {
    for row in rows {
        let share = row
            .share_of_parent
            .map(|s| format!("{:>6.1}%", s * 100.0))
            .unwrap_or_else(|| "      -".to_string());
        let partial = if row.partial_quantity { " *" } else { "" };
        println!(
            "  {:<18} {:<18} {:>10.2} {}{}",
            row.label,
            row.parent.as_deref().unwrap_or("-"),
            row.value,
            share,
            partial
        );
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("🧺 Expense Hierarchy Demo\n");

    let raw = RawLedger::from_records(vec![
        vec!["", "", "13.02.21", "", "14.02.21-20.02.21", "", "01.02.21-28.02.21", "", "Info", "5.3.21", ""],
        vec!["Dairy", "Milk", "89,90", "1", "100", "2", "189,90", "3", "", "79,90", "1"],
        vec!["", "Cheese", "250", "0,35", "", "", "250", "0,35", "", "", ""],
        vec!["Bakery", "Bread", "30", "1", "35", "", "65", "1", "", "32", "1"],
        vec!["Household items", "Soap", "120", "1", "", "", "120", "1", "", "", ""],
        vec!["Other expenses", "Batteries", "", "", "50", "2", "50", "2", "", "", ""],
        vec!["", "Light bulb", "", "", "", "", "", "", "", "25", "1"],
    ])?;

    let config = LedgerConfig::from_json(
        r#"{
            "overrides": {
                "others": {
                    "category": "Other expenses",
                    "new_item": "Miscellaneous",
                    "meaningful_items": []
                }
            }
        }"#,
    )?;

    let ledger = process_ledger(&raw, &config)?;

    println!("📅 Periods:");
    for period in ledger.periods.iter() {
        println!("  {} ({} days, {:?})", period.end, period.length_days, period.kind());
    }

    let views = LedgerProcessor::build_views_with_verification(
        &ledger,
        &PeriodSelection::all(),
        &config,
        1e-6,
    )?;

    println!("\n📊 Summary:");
    println!("  Items:        {}", views.summary.items);
    println!("  Days:         {}", views.summary.days);
    println!("  Cost per day: {:.2}", views.summary.cost_per_day);
    println!(
        "  Volume/packs: {} / {}",
        views.summary.volume_per_day, views.summary.packs_per_day
    );

    println!("\n🌞 Cost hierarchy (* = cost recorded without quantity):");
    print_rows(views.sunburst.cost.rows());

    let click = ClickEvent::new("Dairy", "Foodstuff", "Total");
    println!("\n🔍 Drill-down on '{}':", click.label);
    for (metric, result) in views.drill_down(Metric::Cost, &click) {
        match result.rows(views.sunburst.get(metric)) {
            Some(rows) => {
                println!(" {:?} view:", metric);
                print_rows(rows);
            }
            None => println!(" {:?} view unchanged", metric),
        }
    }

    println!("\n🧾 Other expenses:");
    for row in &views.others.all.rows {
        println!("  {:<12} {:>8.2} x{}", row.name, row.cost, row.count);
    }

    Ok(())
}
