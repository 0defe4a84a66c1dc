//! Cleaning stage: raw order lines in, validated and enriched lines out.
//!
//! The steps run in a fixed order and each one only sees the output of the
//! previous one:
//!
//! 1. drop duplicate rows, numeric cells compared by value (first
//!    occurrence wins)
//! 2. parse price/quantity and impute blanks (category median price,
//!    quantity 1, region `"Unknown"`), then recompute revenue for every row
//! 3. parse order dates and resolve categories
//! 4. derive profit and calendar columns
//! 5. drop non-positive rows, then per-category price outliers
//!
//! Malformed cells and unknown categories abort the run; blank cells and
//! outliers are corrected or filtered without raising.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::model::{Category, CleanedOrderLine, RawOrderLine, UNKNOWN_REGION};

#[derive(Debug, Clone)]
pub struct CleaningOptions {
    /// Reference instant for `days_since_order`.
    pub as_of: NaiveDateTime,
    /// Rows further than this many standard deviations from their category's
    /// mean price are dropped.
    pub outlier_sigma: f64,
}

impl CleaningOptions {
    pub fn new(as_of: NaiveDateTime) -> Self {
        Self {
            as_of,
            outlier_sigma: 3.0,
        }
    }
}

/// Row counts for each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub imputed_price: usize,
    pub imputed_quantity: usize,
    pub imputed_region: usize,
    /// Rows with a blank price in a category that has no known prices.
    pub unpriced_removed: usize,
    pub invalid_removed: usize,
    pub outliers_removed: BTreeMap<Category, usize>,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub lines: Vec<CleanedOrderLine>,
    pub report: CleaningReport,
}

/// Order line between imputation and type normalization.
struct ImputedLine<'a> {
    raw: &'a RawOrderLine,
    row: usize,
    price: f64,
    quantity: i64,
    revenue: f64,
    region: String,
}

pub fn clean(raw: &[RawOrderLine], options: &CleaningOptions) -> Result<CleanedTable> {
    let mut report = CleaningReport {
        input_rows: raw.len(),
        ..CleaningReport::default()
    };
    if raw.is_empty() {
        warn!("raw table has no rows, nothing to clean");
    }

    let unique = deduplicate(raw);
    report.duplicates_removed = raw.len() - unique.len();
    info!(
        removed = report.duplicates_removed,
        remaining = unique.len(),
        "removed duplicate rows"
    );

    let imputed = impute(&unique, &mut report)?;

    let mut lines = Vec::with_capacity(imputed.len());
    for line in &imputed {
        lines.push(normalize(line, options.as_of)?);
    }
    debug!(rows = lines.len(), "normalized types and derived columns");

    let before = lines.len();
    lines.retain(|l| l.price > 0.0 && l.quantity > 0 && l.revenue > 0.0);
    report.invalid_removed = before - lines.len();
    if report.invalid_removed > 0 {
        info!(removed = report.invalid_removed, "removed rows with invalid values");
    }

    report.outliers_removed = remove_price_outliers(&mut lines, options.outlier_sigma);
    for (category, removed) in &report.outliers_removed {
        info!(%category, removed, "removed price outliers");
    }

    report.output_rows = lines.len();
    info!(
        input = report.input_rows,
        output = report.output_rows,
        "data cleaning completed"
    );
    Ok(CleanedTable { lines, report })
}

/// Largest quantity a single order line may carry.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// A numeric cell as duplicate detection sees it: `10`, `10.0` and `10.00`
/// are one value, blank and `NaN` are one blank.
#[derive(PartialEq, Eq, Hash)]
enum NumericCell<'a> {
    Blank,
    Value(u64),
    Text(&'a str),
}

impl<'a> NumericCell<'a> {
    fn new(cell: Option<&'a str>) -> Self {
        let Some(text) = cell.map(str::trim).filter(|t| !t.is_empty()) else {
            return NumericCell::Blank;
        };
        match text.parse::<f64>() {
            Ok(value) if value.is_nan() => NumericCell::Blank,
            // adding 0.0 folds -0.0 into 0.0
            Ok(value) => NumericCell::Value((value + 0.0).to_bits()),
            // left for `impute` to reject
            Err(_) => NumericCell::Text(text),
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
struct RowKey<'a> {
    order_id: &'a str,
    product_id: &'a str,
    product_name: &'a str,
    category: &'a str,
    quantity: NumericCell<'a>,
    price: NumericCell<'a>,
    revenue: NumericCell<'a>,
    order_date: &'a str,
    customer_id: &'a str,
    region: Option<&'a str>,
}

impl<'a> From<&'a RawOrderLine> for RowKey<'a> {
    fn from(line: &'a RawOrderLine) -> Self {
        RowKey {
            order_id: &line.order_id,
            product_id: &line.product_id,
            product_name: &line.product_name,
            category: &line.category,
            quantity: NumericCell::new(line.quantity.as_deref()),
            price: NumericCell::new(line.price.as_deref()),
            revenue: NumericCell::new(line.revenue.as_deref()),
            order_date: &line.order_date,
            customer_id: &line.customer_id,
            region: line.region.as_deref(),
        }
    }
}

/// Keeps the first occurrence of every distinct row, paired with its
/// 1-based position in the input. Numeric cells compare by value.
fn deduplicate(raw: &[RawOrderLine]) -> Vec<(usize, &RawOrderLine)> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.iter()
        .enumerate()
        .filter(|&(_, line)| seen.insert(RowKey::from(line)))
        .map(|(idx, line)| (idx + 1, line))
        .collect()
}

fn impute<'a>(
    rows: &[(usize, &'a RawOrderLine)],
    report: &mut CleaningReport,
) -> Result<Vec<ImputedLine<'a>>> {
    let mut parsed = Vec::with_capacity(rows.len());
    for &(row, raw) in rows {
        let price = parse_price(raw.price.as_deref(), row)?;
        let quantity = parse_quantity(raw.quantity.as_deref(), row)?;
        parsed.push((row, raw, price, quantity));
    }

    // medians come from the deduplicated rows that still have a price
    let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for &(_, raw, price, _) in &parsed {
        if let Some(price) = price {
            by_category
                .entry(raw.category.trim())
                .or_default()
                .push(price);
        }
    }
    let medians: BTreeMap<&str, f64> = by_category
        .into_iter()
        .map(|(category, prices)| (category, Data::new(prices).median()))
        .collect();

    let mut imputed = Vec::with_capacity(parsed.len());
    for (row, raw, price, quantity) in parsed {
        let price = match price {
            Some(price) => price,
            None => match medians.get(raw.category.trim()) {
                Some(median) => {
                    report.imputed_price += 1;
                    *median
                }
                None => {
                    if raw.category.parse::<Category>().is_err() {
                        return Err(PipelineError::UnknownCategory {
                            category: raw.category.clone(),
                            row,
                        });
                    }
                    report.unpriced_removed += 1;
                    continue;
                }
            },
        };
        let quantity = quantity.unwrap_or_else(|| {
            report.imputed_quantity += 1;
            1
        });
        let region = match raw.region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => region.to_string(),
            _ => {
                report.imputed_region += 1;
                UNKNOWN_REGION.to_string()
            }
        };

        imputed.push(ImputedLine {
            raw,
            row,
            price,
            quantity,
            revenue: price * quantity as f64,
            region,
        });
    }

    info!(
        price = report.imputed_price,
        quantity = report.imputed_quantity,
        region = report.imputed_region,
        "filled missing values"
    );
    if report.unpriced_removed > 0 {
        warn!(
            removed = report.unpriced_removed,
            "dropped rows whose category has no price to impute from"
        );
    }
    Ok(imputed)
}

fn normalize(line: &ImputedLine<'_>, as_of: NaiveDateTime) -> Result<CleanedOrderLine> {
    let raw = line.raw;
    let category: Category = raw
        .category
        .parse()
        .map_err(|_| PipelineError::UnknownCategory {
            category: raw.category.clone(),
            row: line.row,
        })?;
    let order_date = parse_order_date(&raw.order_date, line.row)?;
    let profit_margin = category.profit_margin();

    Ok(CleanedOrderLine {
        order_id: raw.order_id.clone(),
        product_id: raw.product_id.clone(),
        product_name: raw.product_name.clone(),
        category,
        quantity: line.quantity,
        price: line.price,
        revenue: line.revenue,
        order_date,
        customer_id: raw.customer_id.clone(),
        region: line.region.clone(),
        total_sales: line.revenue,
        profit_margin,
        profit: line.revenue * profit_margin,
        year: order_date.year(),
        month: order_date.month(),
        quarter: (order_date.month() - 1) / 3 + 1,
        month_name: order_date.format("%B").to_string(),
        year_month: order_date.format("%Y-%m").to_string(),
        days_since_order: (as_of - order_date).num_days(),
    })
}

/// Drops rows whose price lies outside `mean ± sigma·stddev` of their own
/// category. Every category's window is computed from that category's rows
/// as they stand before any outlier is removed.
fn remove_price_outliers(
    lines: &mut Vec<CleanedOrderLine>,
    sigma: f64,
) -> BTreeMap<Category, usize> {
    let mut prices: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    for line in lines.iter() {
        prices.entry(line.category).or_default().push(line.price);
    }

    let windows: BTreeMap<Category, (f64, f64)> = prices
        .into_iter()
        .filter(|(_, prices)| prices.len() >= 2)
        .filter_map(|(category, prices)| {
            let mean = prices.iter().mean();
            let std_dev = prices.iter().std_dev();
            if mean.is_finite() && std_dev.is_finite() {
                Some((category, (mean - sigma * std_dev, mean + sigma * std_dev)))
            } else {
                None
            }
        })
        .collect();

    let mut removed: BTreeMap<Category, usize> = BTreeMap::new();
    lines.retain(|line| match windows.get(&line.category) {
        Some(&(lower, upper)) if line.price < lower || line.price > upper => {
            *removed.entry(line.category).or_default() += 1;
            false
        }
        _ => true,
    });
    removed
}

fn parse_price(cell: Option<&str>, row: usize) -> Result<Option<f64>> {
    let Some(text) = cell.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let value: f64 = text
        .parse()
        .map_err(|_| PipelineError::invalid("Price", text, row))?;
    if value.is_nan() {
        Ok(None)
    } else if value.is_infinite() {
        Err(PipelineError::invalid("Price", text, row))
    } else {
        Ok(Some(value))
    }
}

/// Accepts whole numbers up to [`MAX_QUANTITY`], including float spellings
/// like `3.0`.
fn parse_quantity(cell: Option<&str>, row: usize) -> Result<Option<i64>> {
    let Some(text) = cell.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let value = match text.parse::<i64>() {
        Ok(value) => value,
        Err(_) => match text.parse::<f64>() {
            Ok(value) if value.is_nan() => return Ok(None),
            Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
                value as i64
            }
            _ => return Err(PipelineError::invalid("Quantity", text, row)),
        },
    };
    if value > MAX_QUANTITY {
        return Err(PipelineError::invalid("Quantity", text, row));
    }
    Ok(Some(value))
}

fn parse_order_date(cell: &str, row: usize) -> Result<NaiveDateTime> {
    let text = cell.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(date);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| PipelineError::invalid("OrderDate", text, row))
}

impl From<&CleanedOrderLine> for RawOrderLine {
    fn from(line: &CleanedOrderLine) -> Self {
        RawOrderLine {
            order_id: line.order_id.clone(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            category: line.category.as_str().to_string(),
            quantity: Some(line.quantity.to_string()),
            price: Some(line.price.to_string()),
            revenue: Some(line.revenue.to_string()),
            order_date: line.order_date.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            customer_id: line.customer_id.clone(),
            region: Some(line.region.clone()),
        }
    }
}
