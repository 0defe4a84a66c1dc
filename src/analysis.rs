//! Aggregation stage.
//!
//! Every view is a pure function of the cleaned table. Grouping goes through
//! `BTreeMap`s so rows come out key-ordered before the final sort, which makes
//! ties resolve by ascending key.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Category, CleanedOrderLine};
use crate::round2;

pub const DEFAULT_TOP_N: usize = 10;

/// Headline scalars for the whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalMetrics {
    pub total_revenue: f64,
    pub total_sales: f64,
    pub total_profit: f64,
    pub total_orders: usize,
    pub total_products_sold: i64,
    /// Total revenue over distinct orders
    pub average_order_value: f64,
    /// Mean of per-order revenue sums
    pub overall_average_order_value: f64,
    pub unique_customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "ProductName")]
    pub product_name: String,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "TotalQuantity")]
    pub total_quantity: i64,
    #[serde(rename = "TotalRevenue")]
    pub total_revenue: f64,
    #[serde(rename = "OrderCount")]
    pub order_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryRollup {
    pub category: Category,
    pub total_revenue: f64,
    pub avg_revenue: f64,
    pub total_quantity: i64,
    pub order_count: usize,
    pub total_profit: f64,
    pub revenue_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonthlyTrend {
    pub year_month: String,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub order_count: usize,
    pub total_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuarterlyTrend {
    pub year: i32,
    pub quarter: u32,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub order_count: usize,
    pub total_profit: f64,
    pub year_quarter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionalRollup {
    pub region: String,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub order_count: usize,
    pub customer_count: usize,
    pub total_profit: f64,
    pub revenue_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryOrderValue {
    pub category: Category,
    pub average_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionOrderValue {
    pub region: String,
    pub average_order_value: f64,
}

/// All summary views of one cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub totals: TotalMetrics,
    pub top_by_quantity: Vec<ProductSales>,
    pub top_by_revenue: Vec<ProductSales>,
    pub categories: Vec<CategoryRollup>,
    pub monthly: Vec<MonthlyTrend>,
    pub quarterly: Vec<QuarterlyTrend>,
    pub regions: Vec<RegionalRollup>,
    pub aov_by_category: Vec<CategoryOrderValue>,
    pub aov_by_region: Vec<RegionOrderValue>,
}

/// Running sums for one group.
#[derive(Default)]
struct GroupTotals<'a> {
    revenue: f64,
    quantity: i64,
    profit: f64,
    lines: usize,
    orders: HashSet<&'a str>,
    customers: HashSet<&'a str>,
}

impl<'a> GroupTotals<'a> {
    fn add(&mut self, line: &'a CleanedOrderLine) {
        self.revenue += line.revenue;
        // rows loaded from a cleaned file are not re-bounded
        self.quantity = self.quantity.saturating_add(line.quantity);
        self.profit += line.profit;
        self.lines += 1;
        self.orders.insert(&line.order_id);
        self.customers.insert(&line.customer_id);
    }
}

fn group_by<'a, K, F>(lines: &'a [CleanedOrderLine], key: F) -> BTreeMap<K, GroupTotals<'a>>
where
    K: Ord,
    F: Fn(&'a CleanedOrderLine) -> K,
{
    let mut groups: BTreeMap<K, GroupTotals<'a>> = BTreeMap::new();
    for line in lines {
        groups.entry(key(line)).or_default().add(line);
    }
    groups
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        round2(part / whole * 100.0)
    }
}

/// Mean of the per-order revenue sums, 0 for no orders.
fn mean_order_value<'a>(lines: impl IntoIterator<Item = &'a CleanedOrderLine>) -> f64 {
    let mut per_order: BTreeMap<&str, f64> = BTreeMap::new();
    for line in lines {
        *per_order.entry(line.order_id.as_str()).or_default() += line.revenue;
    }
    if per_order.is_empty() {
        0.0
    } else {
        per_order.values().sum::<f64>() / per_order.len() as f64
    }
}

pub fn total_metrics(lines: &[CleanedOrderLine]) -> TotalMetrics {
    let mut totals = GroupTotals::default();
    let mut total_sales = 0.0;
    for line in lines {
        totals.add(line);
        total_sales += line.total_sales;
    }

    let total_orders = totals.orders.len();
    let average_order_value = if total_orders > 0 {
        totals.revenue / total_orders as f64
    } else {
        0.0
    };

    TotalMetrics {
        total_revenue: round2(totals.revenue),
        total_sales: round2(total_sales),
        total_profit: round2(totals.profit),
        total_orders,
        total_products_sold: totals.quantity,
        average_order_value: round2(average_order_value),
        overall_average_order_value: round2(mean_order_value(lines)),
        unique_customers: totals.customers.len(),
    }
}

fn product_sales(lines: &[CleanedOrderLine]) -> Vec<ProductSales> {
    group_by(lines, |l| (l.product_id.as_str(), l.product_name.as_str(), l.category))
        .into_iter()
        .map(|((product_id, product_name, category), totals)| ProductSales {
            product_id: product_id.to_string(),
            product_name: product_name.to_string(),
            category,
            total_quantity: totals.quantity,
            total_revenue: round2(totals.revenue),
            order_count: totals.orders.len(),
        })
        .collect()
}

pub fn best_sellers_by_quantity(lines: &[CleanedOrderLine], top_n: usize) -> Vec<ProductSales> {
    let mut products = product_sales(lines);
    products.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
    products.truncate(top_n);
    products
}

pub fn best_sellers_by_revenue(lines: &[CleanedOrderLine], top_n: usize) -> Vec<ProductSales> {
    let mut products = product_sales(lines);
    products.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    products.truncate(top_n);
    products
}

pub fn category_rollup(lines: &[CleanedOrderLine]) -> Vec<CategoryRollup> {
    let groups = group_by(lines, |l| l.category);
    let grand_total: f64 = groups.values().map(|g| g.revenue).sum();

    let mut rollup: Vec<CategoryRollup> = groups
        .into_iter()
        .map(|(category, totals)| CategoryRollup {
            category,
            total_revenue: round2(totals.revenue),
            avg_revenue: round2(totals.revenue / totals.lines as f64),
            total_quantity: totals.quantity,
            order_count: totals.orders.len(),
            total_profit: round2(totals.profit),
            revenue_percentage: percentage(totals.revenue, grand_total),
        })
        .collect();
    rollup.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    rollup
}

pub fn monthly_trend(lines: &[CleanedOrderLine]) -> Vec<MonthlyTrend> {
    group_by(lines, |l| l.year_month.as_str())
        .into_iter()
        .map(|(year_month, totals)| MonthlyTrend {
            year_month: year_month.to_string(),
            total_revenue: round2(totals.revenue),
            total_quantity: totals.quantity,
            order_count: totals.orders.len(),
            total_profit: round2(totals.profit),
        })
        .collect()
}

pub fn quarterly_trend(lines: &[CleanedOrderLine]) -> Vec<QuarterlyTrend> {
    group_by(lines, |l| (l.year, l.quarter))
        .into_iter()
        .map(|((year, quarter), totals)| QuarterlyTrend {
            year,
            quarter,
            total_revenue: round2(totals.revenue),
            total_quantity: totals.quantity,
            order_count: totals.orders.len(),
            total_profit: round2(totals.profit),
            year_quarter: format!("{year}-Q{quarter}"),
        })
        .collect()
}

pub fn regional_rollup(lines: &[CleanedOrderLine]) -> Vec<RegionalRollup> {
    let groups = group_by(lines, |l| l.region.as_str());
    let grand_total: f64 = groups.values().map(|g| g.revenue).sum();

    let mut rollup: Vec<RegionalRollup> = groups
        .into_iter()
        .map(|(region, totals)| RegionalRollup {
            region: region.to_string(),
            total_revenue: round2(totals.revenue),
            total_quantity: totals.quantity,
            order_count: totals.orders.len(),
            customer_count: totals.customers.len(),
            total_profit: round2(totals.profit),
            revenue_percentage: percentage(totals.revenue, grand_total),
        })
        .collect();
    rollup.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    rollup
}

/// Per-group mean of per-order sums: an order spanning several groups
/// contributes its partial sum to each of them.
fn order_value_by<'a, K, F>(lines: &'a [CleanedOrderLine], key: F) -> Vec<(K, f64)>
where
    K: Ord,
    F: Fn(&'a CleanedOrderLine) -> K,
{
    let mut groups: BTreeMap<K, Vec<&'a CleanedOrderLine>> = BTreeMap::new();
    for line in lines {
        groups.entry(key(line)).or_default().push(line);
    }

    let mut values: Vec<(K, f64)> = groups
        .into_iter()
        .map(|(k, group)| (k, round2(mean_order_value(group))))
        .collect();
    values.sort_by(|a, b| b.1.total_cmp(&a.1));
    values
}

pub fn aov_by_category(lines: &[CleanedOrderLine]) -> Vec<CategoryOrderValue> {
    order_value_by(lines, |l| l.category)
        .into_iter()
        .map(|(category, average_order_value)| CategoryOrderValue {
            category,
            average_order_value,
        })
        .collect()
}

pub fn aov_by_region(lines: &[CleanedOrderLine]) -> Vec<RegionOrderValue> {
    order_value_by(lines, |l| l.region.as_str())
        .into_iter()
        .map(|(region, average_order_value)| RegionOrderValue {
            region: region.to_string(),
            average_order_value,
        })
        .collect()
}

/// Computes every view one after another.
pub fn analyze(lines: &[CleanedOrderLine], top_n: usize) -> AnalysisReport {
    AnalysisReport {
        totals: total_metrics(lines),
        top_by_quantity: best_sellers_by_quantity(lines, top_n),
        top_by_revenue: best_sellers_by_revenue(lines, top_n),
        categories: category_rollup(lines),
        monthly: monthly_trend(lines),
        quarterly: quarterly_trend(lines),
        regions: regional_rollup(lines),
        aov_by_category: aov_by_category(lines),
        aov_by_region: aov_by_region(lines),
    }
}

/// Same report as [`analyze`], with the views spread over the rayon pool.
#[cfg(feature = "rayon")]
pub fn analyze_rayon(lines: &[CleanedOrderLine], top_n: usize) -> AnalysisReport {
    let ((totals, (top_by_quantity, top_by_revenue)), ((categories, regions), (monthly, quarterly))) =
        rayon::join(
            || {
                rayon::join(
                    || total_metrics(lines),
                    || {
                        rayon::join(
                            || best_sellers_by_quantity(lines, top_n),
                            || best_sellers_by_revenue(lines, top_n),
                        )
                    },
                )
            },
            || {
                rayon::join(
                    || rayon::join(|| category_rollup(lines), || regional_rollup(lines)),
                    || rayon::join(|| monthly_trend(lines), || quarterly_trend(lines)),
                )
            },
        );
    let (aov_by_category, aov_by_region) =
        rayon::join(|| aov_by_category(lines), || aov_by_region(lines));

    AnalysisReport {
        totals,
        top_by_quantity,
        top_by_revenue,
        categories,
        monthly,
        quarterly,
        regions,
        aov_by_category,
        aov_by_region,
    }
}

/// Total revenue and row count through a polars `DataFrame`.
#[cfg(feature = "polars")]
pub fn analyze_polars(lines: &[CleanedOrderLine]) -> polars::prelude::PolarsResult<(f64, usize)> {
    use polars::prelude::*;

    let revenue: Vec<f64> = lines.iter().map(|l| l.revenue).collect();
    let category: Vec<&str> = lines.iter().map(|l| l.category.as_str()).collect();
    let df = DataFrame::new(vec![
        Series::new("category".into(), category).into(),
        Series::new("revenue".into(), revenue).into(),
    ])?;

    let total = df
        .column("revenue")?
        .as_materialized_series()
        .f64()?
        .sum()
        .unwrap_or(0.0);
    Ok((total, df.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn line(order: &str, category: Category, price: f64, quantity: i64, region: &str) -> CleanedOrderLine {
        let order_date = NaiveDate::from_ymd_opt(2024, 2, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let revenue = price * quantity as f64;
        CleanedOrderLine {
            order_id: order.to_string(),
            product_id: format!("P-{category}"),
            product_name: "Thing".to_string(),
            category,
            quantity,
            price,
            revenue,
            order_date,
            customer_id: format!("C-{order}"),
            region: region.to_string(),
            total_sales: revenue,
            profit_margin: category.profit_margin(),
            profit: revenue * category.profit_margin(),
            year: 2024,
            month: 2,
            quarter: 1,
            month_name: "February".to_string(),
            year_month: "2024-02".to_string(),
            days_since_order: 0,
        }
    }

    fn dated(mut l: CleanedOrderLine, year: i32, month: u32) -> CleanedOrderLine {
        l.year = year;
        l.month = month;
        l.quarter = (month - 1) / 3 + 1;
        l.year_month = format!("{year}-{month:02}");
        l
    }

    #[test]
    fn books_example() {
        let lines = vec![
            line("O1", Category::Books, 10.0, 2, "Europe"),
            line("O2", Category::Books, 30.0, 1, "Europe"),
        ];
        let rollup = category_rollup(&lines);
        assert_eq!(rollup.len(), 1);
        assert_eq!(rollup[0].total_revenue, 50.0);
        assert_eq!(rollup[0].total_quantity, 3);
        assert_eq!(rollup[0].order_count, 2);
        assert_eq!(rollup[0].revenue_percentage, 100.0);

        let aov = aov_by_category(&lines);
        assert_eq!(aov[0].average_order_value, 25.0);
    }

    #[test]
    fn empty_table_degrades_to_zeroes() {
        let report = analyze(&[], DEFAULT_TOP_N);
        assert_eq!(report.totals, TotalMetrics::default());
        assert!(report.top_by_quantity.is_empty());
        assert!(report.top_by_revenue.is_empty());
        assert!(report.categories.is_empty());
        assert!(report.monthly.is_empty());
        assert!(report.quarterly.is_empty());
        assert!(report.regions.is_empty());
        assert!(report.aov_by_category.is_empty());
        assert!(report.aov_by_region.is_empty());
    }

    #[test]
    fn huge_quantities_do_not_overflow() {
        let lines = vec![
            line("O1", Category::Books, 1.0, 5_000_000_000_000_000_000, "Europe"),
            line("O2", Category::Books, 1.0, 5_000_000_000_000_000_000, "Europe"),
        ];
        let totals = total_metrics(&lines);
        assert_eq!(totals.total_products_sold, i64::MAX);
        assert_eq!(category_rollup(&lines)[0].total_quantity, i64::MAX);
    }

    #[test]
    fn totals_count_distinct_orders() {
        let lines = vec![
            line("O1", Category::Books, 10.0, 2, "Europe"),
            line("O1", Category::Clothing, 5.0, 1, "Europe"),
            line("O2", Category::Books, 15.0, 1, "Africa"),
        ];
        let totals = total_metrics(&lines);
        assert_eq!(totals.total_revenue, 40.0);
        assert_eq!(totals.total_sales, 40.0);
        assert_eq!(totals.total_orders, 2);
        assert_eq!(totals.total_products_sold, 4);
        assert_eq!(totals.average_order_value, 20.0);
        assert_eq!(totals.overall_average_order_value, 20.0);
        assert_eq!(totals.total_profit, 15.75);
    }

    #[test]
    fn aov_uses_partial_order_sums_per_group() {
        // O1 spans two categories
        let lines = vec![
            line("O1", Category::Books, 10.0, 1, "Europe"),
            line("O1", Category::Books, 20.0, 1, "Europe"),
            line("O1", Category::Electronics, 100.0, 1, "Europe"),
            line("O2", Category::Books, 6.0, 1, "Asia Pacific"),
        ];
        let by_category = aov_by_category(&lines);
        assert_eq!(by_category[0].category, Category::Electronics);
        assert_eq!(by_category[0].average_order_value, 100.0);
        assert_eq!(by_category[1].category, Category::Books);
        assert_eq!(by_category[1].average_order_value, 18.0);

        let by_region = aov_by_region(&lines);
        assert_eq!(by_region[0].region, "Europe");
        assert_eq!(by_region[0].average_order_value, 130.0);
        assert_eq!(by_region[1].average_order_value, 6.0);
    }

    #[test]
    fn best_sellers_are_ranked_and_truncated() {
        let lines = vec![
            line("O1", Category::Books, 5.0, 9, "Europe"),
            line("O2", Category::Electronics, 500.0, 1, "Europe"),
            line("O3", Category::Clothing, 20.0, 4, "Europe"),
            line("O4", Category::Clothing, 20.0, 1, "Europe"),
        ];
        let by_quantity = best_sellers_by_quantity(&lines, 2);
        assert_eq!(by_quantity.len(), 2);
        assert_eq!(by_quantity[0].category, Category::Books);
        assert_eq!(by_quantity[1].category, Category::Clothing);
        assert_eq!(by_quantity[1].total_quantity, 5);
        assert_eq!(by_quantity[1].order_count, 2);

        let by_revenue = best_sellers_by_revenue(&lines, 10);
        assert_eq!(by_revenue.len(), 3);
        assert_eq!(by_revenue[0].category, Category::Electronics);
        assert_eq!(by_revenue[0].total_revenue, 500.0);
    }

    #[test]
    fn trends_are_chronological() {
        let lines = vec![
            dated(line("O1", Category::Books, 10.0, 1, "Europe"), 2024, 11),
            dated(line("O2", Category::Books, 10.0, 1, "Europe"), 2023, 3),
            dated(line("O3", Category::Books, 10.0, 1, "Europe"), 2024, 2),
            dated(line("O4", Category::Books, 10.0, 2, "Europe"), 2024, 2),
        ];
        let monthly = monthly_trend(&lines);
        let months: Vec<&str> = monthly.iter().map(|m| m.year_month.as_str()).collect();
        assert_eq!(months, ["2023-03", "2024-02", "2024-11"]);
        assert_eq!(monthly[1].total_revenue, 30.0);
        assert_eq!(monthly[1].order_count, 2);

        let quarterly = quarterly_trend(&lines);
        let labels: Vec<&str> = quarterly.iter().map(|q| q.year_quarter.as_str()).collect();
        assert_eq!(labels, ["2023-Q1", "2024-Q1", "2024-Q4"]);
    }

    #[test]
    fn regional_rollup_counts_customers_and_shares() {
        let mut a = line("O1", Category::Books, 30.0, 1, "Europe");
        let mut b = line("O2", Category::Books, 10.0, 1, "Europe");
        a.customer_id = "C1".to_string();
        b.customer_id = "C1".to_string();
        let c = line("O3", Category::Books, 60.0, 1, "Africa");

        let regions = regional_rollup(&[a, b, c]);
        assert_eq!(regions[0].region, "Africa");
        assert_eq!(regions[0].revenue_percentage, 60.0);
        assert_eq!(regions[1].region, "Europe");
        assert_eq!(regions[1].customer_count, 1);
        assert_eq!(regions[1].order_count, 2);
        assert_eq!(regions[1].revenue_percentage, 40.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn rayon_report_matches_sequential() {
        let lines: Vec<CleanedOrderLine> = (0..50)
            .map(|i| {
                let category = Category::ALL[i % Category::ALL.len()];
                line(&format!("O{i}"), category, 3.0 + i as f64, 1 + (i % 4) as i64, "Europe")
            })
            .collect();
        assert_eq!(analyze_rayon(&lines, 5), analyze(&lines, 5));
    }
}
