//! Lab facade tests: builder, configuration and end-to-end workflow

use std::fs;

use chrono::NaiveDate;
use labtrack::catalog::{MeasurementSpec, ReagentId, ReagentRecord, RecipeId, RecipeRecord};
use labtrack::config::{FractionRange, LabConfig};
use labtrack::{Error, Lab};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn stock(lab: &mut Lab) {
    let registry = lab.registry_mut();
    registry
        .add_reagent(
            ReagentRecord::builder(ReagentId(1), "Glucose", "g")
                .cost(0.4)
                .inventory(250.0)
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .add_recipe(
            RecipeRecord::builder(RecipeId(1), "Ferment")
                .requirement(ReagentId(1), 50.0, "g")
                .measurement(MeasurementSpec::new("ethanol", "g/L", 10.0, 12.0))
                .build()
                .unwrap(),
        )
        .unwrap();
}

#[test]
fn test_builder_defaults() {
    let lab = Lab::builder().build().unwrap();
    assert!(lab.registry().is_empty());
    assert_eq!(lab.config(), &LabConfig::default());
}

#[test]
fn test_builder_rejects_bad_config() {
    let config = LabConfig {
        top_waste: 0,
        ..LabConfig::default()
    };
    let result = Lab::builder().config(config).build();
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_run_uses_configured_ranges() {
    let config = LabConfig::builder()
        .consumption_error(FractionRange::new(0.1, 0.1))
        .measurement_error(FractionRange::new(0.0, 0.0))
        .build()
        .unwrap();
    let mut lab = Lab::builder().config(config).build().unwrap();
    stock(&mut lab);
    let id = lab
        .registry_mut()
        .create_experiment(RecipeId(1), vec!["Ana".into()], today())
        .unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let report = lab.run_experiment_with_rng(id, today(), &mut rng).unwrap();
    assert!((report.consumption[0].consumed - 55.0).abs() < 1e-9);
    assert!((lab.registry().reagent(ReagentId(1)).unwrap().inventory() - 195.0).abs() < 1e-9);
    assert!(report.result.is_valid());
    assert!((report.cost - 20.0).abs() < 1e-12);
}

#[test]
fn test_workflow_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let config = LabConfig::builder().data_dir(dir.path()).build().unwrap();
    let mut lab = Lab::builder().config(config.clone()).build().unwrap();
    stock(&mut lab);

    for name in ["Ana", "Ben", "Ana"] {
        let id = lab
            .registry_mut()
            .create_experiment(RecipeId(1), vec![name.into()], today())
            .unwrap();
        lab.run_experiment(id, today()).unwrap();
    }
    lab.save().unwrap();

    let mut reloaded = Lab::builder().config(config).build().unwrap();
    let report = reloaded.load().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.results, 3);

    let mut rng = StdRng::seed_from_u64(5);
    let stats = reloaded.statistics_with_rng(today(), &mut rng).unwrap();
    assert_eq!(
        stats.top_investigators,
        vec![("Ana".to_string(), 2), ("Ben".to_string(), 1)]
    );
    assert_eq!(
        stats.run_frequency.map(|f| f.most),
        Some(("Ferment".to_string(), 3))
    );
    assert_eq!(stats.validity.valid + stats.validity.invalid, 3);
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lab.json");
    fs::write(
        &path,
        r#"{"top_investigators": 2, "waste_fraction": {"min": 0.05, "max": 0.1}}"#,
    )
    .unwrap();

    let config = LabConfig::from_json_file(&path).unwrap();
    assert_eq!(config.top_investigators, 2);
    assert_eq!(config.waste_fraction, FractionRange::new(0.05, 0.1));
    assert_eq!(config.consumption_error, FractionRange::CONSUMPTION_ERROR);

    fs::write(&path, r#"{"measurement_error": {"min": -1.0, "max": 1.0}}"#).unwrap();
    assert!(matches!(
        LabConfig::from_json_file(&path),
        Err(Error::InvalidInput(_))
    ));
}
