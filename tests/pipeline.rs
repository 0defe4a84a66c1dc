use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use sales_dashboard::analysis::{DEFAULT_TOP_N, analyze, category_rollup, regional_rollup};
use sales_dashboard::cleaning::{CleaningOptions, clean};
use sales_dashboard::data_generation::{GeneratorConfig, generate_raw_orders};
use sales_dashboard::data_ingestion::{open_file, read_cleaned_orders, write_cleaned_orders};
use sales_dashboard::export::export_report;
use sales_dashboard::model::RawOrderLine;
use sales_dashboard::{PipelineError, generate_mock_data};

fn as_of() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

#[test]
fn end_to_end_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("raw.csv");
    let cleaned_path = dir.path().join("cleaned.csv");
    let output_dir = dir.path().join("analysis_output");

    let written = generate_mock_data(&raw_path, &GeneratorConfig::new(1200, 42, as_of())).unwrap();
    assert_eq!(written, 1224);

    let raw = open_file(&raw_path).unwrap();
    assert_eq!(raw.len(), written);

    let table = clean(&raw, &CleaningOptions::new(as_of())).unwrap();
    assert_eq!(table.report.duplicates_removed, 24);
    assert_eq!(
        table.report.imputed_price + table.report.imputed_quantity + table.report.imputed_region,
        60
    );
    assert!(table.lines.len() <= 1200);

    write_cleaned_orders(&cleaned_path, &table.lines).unwrap();
    let reloaded = read_cleaned_orders(&cleaned_path).unwrap();
    assert_eq!(reloaded, table.lines);

    let report = analyze(&reloaded, DEFAULT_TOP_N);
    assert_eq!(report.top_by_quantity.len(), 10);
    assert_eq!(report.top_by_revenue.len(), 10);
    assert_eq!(report.categories.len(), 10);

    export_report(&report, &output_dir).unwrap();
    for name in [
        "top_products_by_quantity.csv",
        "top_products_by_revenue.csv",
        "category_analysis.csv",
        "monthly_trends.csv",
        "quarterly_trends.csv",
        "regional_analysis.csv",
        "aov_by_category.csv",
        "aov_by_region.csv",
        "total_metrics.json",
    ] {
        assert!(output_dir.join(name).exists(), "{name} was not written");
    }
}

#[test]
fn cleaned_rows_hold_invariants() {
    let raw = generate_raw_orders(&GeneratorConfig::new(2000, 9, as_of()));
    let table = clean(&raw, &CleaningOptions::new(as_of())).unwrap();
    for line in &table.lines {
        assert!(line.price > 0.0);
        assert!(line.quantity > 0);
        assert!(line.revenue > 0.0);
        assert!((line.revenue - line.price * line.quantity as f64).abs() < 1e-9);
        assert_eq!(line.total_sales, line.revenue);
        assert!(!line.region.is_empty());
    }
}

#[test]
fn recleaning_keeps_rows_and_revenue() {
    let raw = generate_raw_orders(&GeneratorConfig::new(1500, 5, as_of()));
    let first = clean(&raw, &CleaningOptions::new(as_of())).unwrap();

    let again: Vec<RawOrderLine> = first.lines.iter().map(RawOrderLine::from).collect();
    let later = as_of() + chrono::Duration::days(3);
    let second = clean(&again, &CleaningOptions::new(later)).unwrap();

    assert_eq!(second.lines.len(), first.lines.len());
    let revenue = |lines: &[sales_dashboard::model::CleanedOrderLine]| -> f64 {
        lines.iter().map(|l| l.revenue).sum()
    };
    assert!((revenue(&first.lines) - revenue(&second.lines)).abs() < 1e-6);
}

#[test]
fn totals_agree_with_category_rollup() {
    let raw = generate_raw_orders(&GeneratorConfig::new(1000, 11, as_of()));
    let lines = clean(&raw, &CleaningOptions::new(as_of())).unwrap().lines;
    let report = analyze(&lines, DEFAULT_TOP_N);

    let by_category: f64 = report.categories.iter().map(|c| c.total_revenue).sum();
    // each category total is rounded on its own
    assert!((report.totals.total_revenue - by_category).abs() <= 0.005 * 10.0 + 1e-9);

    let by_region: f64 = report.regions.iter().map(|r| r.total_revenue).sum();
    assert!((report.totals.total_revenue - by_region).abs() <= 0.005 * 7.0 + 1e-9);
}

#[test]
fn unknown_category_in_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    fs::write(
        &path,
        "OrderID,ProductID,ProductName,Category,Quantity,Price,Revenue,OrderDate,CustomerID,Region\n\
         O1,P1,Gizmo,Gadgets,1,10.0,10.0,2024-03-01,C1,Europe\n",
    )
    .unwrap();

    let raw = open_file(&path).unwrap();
    let err = clean(&raw, &CleaningOptions::new(as_of())).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownCategory { ref category, .. } if category == "Gadgets"));
}

#[test]
fn header_only_file_flows_through_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    fs::write(
        &path,
        "OrderID,ProductID,ProductName,Category,Quantity,Price,Revenue,OrderDate,CustomerID,Region\n",
    )
    .unwrap();

    let raw = open_file(&path).unwrap();
    let table = clean(&raw, &CleaningOptions::new(as_of())).unwrap();
    let report = analyze(&table.lines, DEFAULT_TOP_N);
    assert_eq!(report.totals.total_orders, 0);
    assert_eq!(report.totals.average_order_value, 0.0);
    assert!(report.categories.is_empty());
    export_report(&report, &dir.path().join("out")).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn rollup_percentages_sum_to_hundred(seed in any::<u64>(), records in 1usize..400) {
        let raw = generate_raw_orders(&GeneratorConfig::new(records, seed, as_of()));
        let lines = clean(&raw, &CleaningOptions::new(as_of())).unwrap().lines;
        prop_assume!(!lines.is_empty());

        let categories: f64 = category_rollup(&lines).iter().map(|c| c.revenue_percentage).sum();
        prop_assert!((categories - 100.0).abs() <= 0.051, "categories sum to {}", categories);

        let regions: f64 = regional_rollup(&lines).iter().map(|r| r.revenue_percentage).sum();
        prop_assert!((regions - 100.0).abs() <= 0.051, "regions sum to {}", regions);
    }

    #[test]
    fn cleaning_never_keeps_invalid_rows(
        seed in any::<u64>(),
        records in 0usize..300,
        missing_rate in 0.0f64..0.5,
    ) {
        let mut config = GeneratorConfig::new(records, seed, as_of());
        config.missing_rate = missing_rate;
        let raw = generate_raw_orders(&config);
        let table = clean(&raw, &CleaningOptions::new(as_of())).unwrap();

        prop_assert!(table.lines.len() <= records);
        for line in &table.lines {
            prop_assert!(line.price > 0.0 && line.quantity > 0 && line.revenue > 0.0);
        }
    }
}
