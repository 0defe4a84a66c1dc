use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use tracing::info;

use crate::analysis::{
    AnalysisReport, CategoryOrderValue, CategoryRollup, MonthlyTrend, ProductSales,
    QuarterlyTrend, RegionOrderValue, RegionalRollup,
};
use crate::data_ingestion::{CsvTable, write_table};
use crate::error::Result;

impl CsvTable for ProductSales {
    const COLUMNS: &'static [&'static str] = &[
        "ProductID",
        "ProductName",
        "Category",
        "TotalQuantity",
        "TotalRevenue",
        "OrderCount",
    ];
}

impl CsvTable for CategoryRollup {
    const COLUMNS: &'static [&'static str] = &[
        "Category",
        "TotalRevenue",
        "AvgRevenue",
        "TotalQuantity",
        "OrderCount",
        "TotalProfit",
        "RevenuePercentage",
    ];
}

impl CsvTable for MonthlyTrend {
    const COLUMNS: &'static [&'static str] = &[
        "YearMonth",
        "TotalRevenue",
        "TotalQuantity",
        "OrderCount",
        "TotalProfit",
    ];
}

impl CsvTable for QuarterlyTrend {
    const COLUMNS: &'static [&'static str] = &[
        "Year",
        "Quarter",
        "TotalRevenue",
        "TotalQuantity",
        "OrderCount",
        "TotalProfit",
        "YearQuarter",
    ];
}

impl CsvTable for RegionalRollup {
    const COLUMNS: &'static [&'static str] = &[
        "Region",
        "TotalRevenue",
        "TotalQuantity",
        "OrderCount",
        "CustomerCount",
        "TotalProfit",
        "RevenuePercentage",
    ];
}

impl CsvTable for CategoryOrderValue {
    const COLUMNS: &'static [&'static str] = &["Category", "AverageOrderValue"];
}

impl CsvTable for RegionOrderValue {
    const COLUMNS: &'static [&'static str] = &["Region", "AverageOrderValue"];
}

pub const TOTAL_METRICS_FILE: &str = "total_metrics.json";

fn write_view<T: CsvTable>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    let path = dir.join(name);
    write_table(File::create(&path)?, rows)?;
    info!(rows = rows.len(), path = %path.display(), "exported view");
    Ok(())
}

/// Writes one CSV per view plus the headline metrics as JSON.
pub fn export_report(report: &AnalysisReport, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_view(dir, "top_products_by_quantity.csv", &report.top_by_quantity)?;
    write_view(dir, "top_products_by_revenue.csv", &report.top_by_revenue)?;
    write_view(dir, "category_analysis.csv", &report.categories)?;
    write_view(dir, "monthly_trends.csv", &report.monthly)?;
    write_view(dir, "quarterly_trends.csv", &report.quarterly)?;
    write_view(dir, "regional_analysis.csv", &report.regions)?;
    write_view(dir, "aov_by_category.csv", &report.aov_by_category)?;
    write_view(dir, "aov_by_region.csv", &report.aov_by_region)?;

    let writer = BufWriter::new(File::create(dir.join(TOTAL_METRICS_FILE))?);
    serde_json::to_writer_pretty(writer, &report.totals)?;

    info!(dir = %dir.display(), "all analysis results exported");
    Ok(())
}
