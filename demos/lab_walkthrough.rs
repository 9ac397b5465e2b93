//! Lab Walkthrough
//!
//! Stocks a small catalog, schedules and runs experiments, prints the
//! statistics report, then saves and reloads the catalog.
//!
//! Run with: RUST_LOG=debug cargo run --example lab_walkthrough

use anyhow::Context;
use chrono::NaiveDate;
use labtrack::catalog::dates::format_expiry;
use labtrack::catalog::{
    Conversion, MeasurementSpec, ReagentId, ReagentRecord, RecipeId, RecipeRecord,
};
use labtrack::config::LabConfig;
use labtrack::Lab;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== labtrack walkthrough ===\n");

    let data_dir = std::env::temp_dir().join("labtrack-walkthrough");
    let config = LabConfig::builder().data_dir(&data_dir).build()?;
    let mut lab = Lab::builder().config(config.clone()).build()?;
    let today = NaiveDate::from_ymd_opt(2024, 5, 2).context("invalid date")?;

    // -------------------------------------------------------------------------
    // 1. Stock reagents
    // -------------------------------------------------------------------------
    println!("1. Stocking reagents...");
    let registry = lab.registry_mut();
    registry.add_reagent(
        ReagentRecord::builder(ReagentId(1), "Sodium hydroxide", "g")
            .category("base")
            .cost(0.35)
            .inventory(120.0)
            .minimum(50.0)
            .expiry(NaiveDate::from_ymd_opt(2025, 1, 1).context("invalid date")?)
            .conversion(Conversion::new("kg", 0.001)?)
            .build()?,
    )?;
    registry.add_reagent(
        ReagentRecord::builder(ReagentId(2), "Hydrochloric acid", "mL")
            .category("acid")
            .cost(0.12)
            .inventory(40.0)
            .minimum(100.0)
            .build()?,
    )?;
    for reagent in registry.reagents() {
        println!(
            "   {} {}: {} {} (expires {})",
            reagent.id(),
            reagent.name(),
            reagent.inventory(),
            reagent.unit(),
            format_expiry(reagent.expiry())
        );
    }

    // -------------------------------------------------------------------------
    // 2. Define a recipe
    // -------------------------------------------------------------------------
    println!("\n2. Defining recipe...");
    registry.add_recipe(
        RecipeRecord::builder(RecipeId(1), "Neutralization")
            .objective("Neutralize a base with acid")
            .step("Dissolve NaOH in water")
            .step("Titrate with HCl")
            .requirement(ReagentId(1), 20.0, "g")
            .requirement(ReagentId(2), 15.0, "mL")
            .measurement(MeasurementSpec::new("pH", "-log[H+]", 6.5, 8.5))
            .build()?,
    )?;
    println!("   list cost: {:.2}", registry.list_cost(RecipeId(1))?);

    // -------------------------------------------------------------------------
    // 3. Run experiments until stock runs out
    // -------------------------------------------------------------------------
    println!("\n3. Running experiments...");
    for team in [vec!["Ana", "Ben"], vec!["Ana"], vec!["Cy"]] {
        let responsible = team.into_iter().map(String::from).collect();
        match lab.registry_mut().create_experiment(RecipeId(1), responsible, today) {
            Ok(id) => {
                let report = lab.run_experiment(id, today)?;
                print!("   {}", report.result);
            }
            Err(e) => println!("   cannot schedule: {e}"),
        }
    }

    // -------------------------------------------------------------------------
    // 4. Statistics
    // -------------------------------------------------------------------------
    println!("\n4. Statistics...");
    let stats = lab.statistics(today)?;
    println!("   top investigators: {:?}", stats.top_investigators);
    if let Some(frequency) = &stats.run_frequency {
        println!("   most run: {:?}, least run: {:?}", frequency.most, frequency.least);
    }
    println!("   most used reagents: {:?}", stats.most_used_reagents);
    println!("   highest waste: {:?}", stats.top_waste_reagents);
    println!("   restock: {:?}", stats.restock_candidates);
    println!(
        "   results: {} within, {} outside parameters",
        stats.validity.valid, stats.validity.invalid
    );

    // -------------------------------------------------------------------------
    // 5. Persist
    // -------------------------------------------------------------------------
    println!("\n5. Saving to {}...", data_dir.display());
    lab.save()?;
    let mut reloaded = Lab::builder().config(config).build()?;
    let report = reloaded.load()?;
    println!(
        "   reloaded {} reagents, {} recipes, {} experiments, {} results",
        report.reagents, report.recipes, report.experiments, report.results
    );

    Ok(())
}
