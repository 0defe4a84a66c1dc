//! Static HTML dashboard.
//!
//! The page is self-contained apart from Tailwind and Chart.js, which load
//! from their CDNs. Chart configs are built as JSON values and dropped into a
//! single script block.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde_json::{Value, json};
use tracing::info;

use crate::analysis::AnalysisReport;
use crate::error::Result;

const PALETTE: [&str; 10] = [
    "#1e3a8a", "#2563eb", "#0891b2", "#0d9488", "#65a30d", "#ca8a04", "#ea580c", "#dc2626",
    "#9333ea", "#475569",
];

pub fn render_dashboard(report: &AnalysisReport, generated_at: NaiveDateTime) -> String {
    let totals = &report.totals;
    let margin = if totals.total_revenue > 0.0 {
        totals.total_profit / totals.total_revenue * 100.0
    } else {
        0.0
    };

    let cards = [
        kpi_card("Total Revenue", &format_money(totals.total_revenue), None),
        kpi_card(
            "Total Profit",
            &format_money(totals.total_profit),
            Some(&format!("{margin:.1}% margin")),
        ),
        kpi_card("Total Orders", &group_thousands(totals.total_orders as i64), None),
        kpi_card("Average Order Value", &format_money(totals.average_order_value), None),
        kpi_card("Products Sold", &group_thousands(totals.total_products_sold), None),
        kpi_card("Unique Customers", &group_thousands(totals.unique_customers as i64), None),
    ]
    .concat();

    let panels = [
        chart_panel("categoryChart", "Revenue by Category"),
        chart_panel("monthlyChart", "Monthly Sales Trend"),
        chart_panel("quarterlyChart", "Quarterly Revenue"),
        chart_panel("regionalChart", "Revenue by Region"),
        chart_panel("aovChart", "Average Order Value by Category"),
        chart_panel("profitChart", "Profit by Category"),
    ]
    .concat();

    let mut product_rows = String::new();
    for (rank, product) in report.top_by_revenue.iter().take(10).enumerate() {
        let _ = write!(
            product_rows,
            r#"<tr class="border-t border-slate-100"><td class="py-2 pr-4">{}</td><td class="py-2 pr-4">{}</td><td class="py-2 pr-4">{}</td><td class="py-2 pr-4 text-right">{}</td><td class="py-2 text-right">{}</td></tr>"#,
            rank + 1,
            escape_html(&product.product_name),
            escape_html(product.category.as_str()),
            group_thousands(product.total_quantity),
            format_money(product.total_revenue),
        );
        product_rows.push('\n');
    }

    let mut scripts = String::new();
    for (id, config) in chart_configs(report) {
        let config = serde_json::to_string(&config)
            .unwrap_or_else(|_| "{}".to_string())
            .replace("</", "<\\/");
        let _ = writeln!(
            scripts,
            "new Chart(document.getElementById('{id}'), {config});"
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Business Sales Dashboard</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>
</head>
<body class="bg-slate-100 text-slate-900">
    <div class="max-w-7xl mx-auto px-6 py-8">
        <header class="mb-8 border-b border-slate-200 pb-6 flex flex-col gap-2 sm:flex-row sm:items-end sm:justify-between">
            <div>
                <h1 class="text-2xl font-semibold">Business Sales Dashboard</h1>
                <p class="mt-1 text-sm text-slate-500">E-commerce performance overview</p>
            </div>
            <p class="text-xs text-slate-400">Last updated {updated}</p>
        </header>
        <section aria-label="Key metrics" class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4 mb-8">
{cards}        </section>
        <section aria-label="Charts" class="grid grid-cols-1 lg:grid-cols-2 gap-6 mb-8">
{panels}        </section>
        <section class="bg-white border border-slate-200 rounded-lg p-4 shadow-sm">
            <h2 class="text-sm font-medium text-slate-700 mb-3">Top 10 Products by Revenue</h2>
            <table class="min-w-full text-sm text-left">
                <thead class="text-xs uppercase text-slate-500">
                    <tr><th class="pb-2 pr-4">#</th><th class="pb-2 pr-4">Product</th><th class="pb-2 pr-4">Category</th><th class="pb-2 pr-4 text-right">Quantity</th><th class="pb-2 text-right">Revenue</th></tr>
                </thead>
                <tbody>
{product_rows}                </tbody>
            </table>
        </section>
    </div>
    <script>
        Chart.defaults.color = '#0f172a';
        Chart.defaults.borderColor = '#e5e7eb';
{scripts}    </script>
</body>
</html>
"#,
        updated = generated_at.format("%B %d, %Y %H:%M"),
    )
}

pub fn write_dashboard(
    report: &AnalysisReport,
    generated_at: NaiveDateTime,
    path: &Path,
) -> Result<()> {
    fs::write(path, render_dashboard(report, generated_at))?;
    info!(path = %path.display(), "dashboard written");
    Ok(())
}

fn chart_configs(report: &AnalysisReport) -> Vec<(&'static str, Value)> {
    let categories: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
    let months: Vec<&str> = report.monthly.iter().map(|m| m.year_month.as_str()).collect();
    let quarters: Vec<&str> = report.quarterly.iter().map(|q| q.year_quarter.as_str()).collect();
    let regions: Vec<&str> = report.regions.iter().map(|r| r.region.as_str()).collect();
    let aov_labels: Vec<&str> = report
        .aov_by_category
        .iter()
        .map(|a| a.category.as_str())
        .collect();

    vec![
        (
            "categoryChart",
            json!({
                "type": "bar",
                "data": {
                    "labels": categories,
                    "datasets": [{
                        "label": "Revenue",
                        "data": report.categories.iter().map(|c| c.total_revenue).collect::<Vec<_>>(),
                        "backgroundColor": PALETTE[1],
                    }],
                },
                "options": { "maintainAspectRatio": false, "plugins": { "legend": { "display": false } } },
            }),
        ),
        (
            "monthlyChart",
            json!({
                "type": "line",
                "data": {
                    "labels": months,
                    "datasets": [
                        {
                            "label": "Revenue",
                            "data": report.monthly.iter().map(|m| m.total_revenue).collect::<Vec<_>>(),
                            "borderColor": PALETTE[1],
                            "yAxisID": "y",
                            "tension": 0.3,
                        },
                        {
                            "label": "Orders",
                            "data": report.monthly.iter().map(|m| m.order_count).collect::<Vec<_>>(),
                            "borderColor": PALETTE[6],
                            "yAxisID": "y1",
                            "tension": 0.3,
                        },
                    ],
                },
                "options": {
                    "maintainAspectRatio": false,
                    "scales": {
                        "y": { "position": "left" },
                        "y1": { "position": "right", "grid": { "drawOnChartArea": false } },
                    },
                },
            }),
        ),
        (
            "quarterlyChart",
            json!({
                "type": "bar",
                "data": {
                    "labels": quarters,
                    "datasets": [{
                        "label": "Revenue",
                        "data": report.quarterly.iter().map(|q| q.total_revenue).collect::<Vec<_>>(),
                        "backgroundColor": PALETTE[3],
                    }],
                },
                "options": { "maintainAspectRatio": false, "plugins": { "legend": { "display": false } } },
            }),
        ),
        (
            "regionalChart",
            json!({
                "type": "doughnut",
                "data": {
                    "labels": regions,
                    "datasets": [{
                        "data": report.regions.iter().map(|r| r.total_revenue).collect::<Vec<_>>(),
                        "backgroundColor": PALETTE,
                    }],
                },
                "options": { "maintainAspectRatio": false },
            }),
        ),
        (
            "aovChart",
            json!({
                "type": "bar",
                "data": {
                    "labels": aov_labels,
                    "datasets": [{
                        "label": "Average Order Value",
                        "data": report.aov_by_category.iter().map(|a| a.average_order_value).collect::<Vec<_>>(),
                        "backgroundColor": PALETTE[5],
                    }],
                },
                "options": {
                    "indexAxis": "y",
                    "maintainAspectRatio": false,
                    "plugins": { "legend": { "display": false } },
                },
            }),
        ),
        (
            "profitChart",
            json!({
                "type": "bar",
                "data": {
                    "labels": categories,
                    "datasets": [{
                        "label": "Profit",
                        "data": report.categories.iter().map(|c| c.total_profit).collect::<Vec<_>>(),
                        "backgroundColor": PALETTE[4],
                    }],
                },
                "options": { "maintainAspectRatio": false, "plugins": { "legend": { "display": false } } },
            }),
        ),
    ]
}

fn kpi_card(title: &str, value: &str, note: Option<&str>) -> String {
    let note = note
        .map(|n| format!(r#"<p class="mt-1 text-xs text-slate-500">{}</p>"#, escape_html(n)))
        .unwrap_or_default();
    format!(
        r#"            <div class="bg-white border border-slate-200 rounded-lg p-4 shadow-sm">
                <p class="text-xs font-medium text-slate-500 uppercase tracking-wide">{title}</p>
                <p class="mt-2 text-2xl font-semibold">{value}</p>{note}
            </div>
"#
    )
}

fn chart_panel(id: &str, title: &str) -> String {
    format!(
        r#"            <div class="bg-white border border-slate-200 rounded-lg p-4 shadow-sm">
                <h2 class="text-sm font-medium text-slate-700 mb-3">{title}</h2>
                <div class="h-64"><canvas id="{id}"></canvas></div>
            </div>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as i64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DEFAULT_TOP_N, ProductSales, analyze};
    use crate::model::Category;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(15, 7, 0)
            .unwrap()
    }

    #[test]
    fn money_and_counts_are_grouped() {
        assert_eq!(format_money(1234567.891), "$1,234,567.89");
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(-12.5), "-$12.50");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
    }

    #[test]
    fn empty_report_renders_with_zero_margin() {
        let html = render_dashboard(&analyze(&[], DEFAULT_TOP_N), generated_at());
        assert!(html.contains("0.0% margin"));
        assert!(html.contains("Last updated March 04, 2025 15:07"));
        assert!(html.contains("id=\"categoryChart\""));
        assert!(html.contains("new Chart(document.getElementById('profitChart')"));
    }

    #[test]
    fn product_names_are_escaped() {
        let mut report = analyze(&[], DEFAULT_TOP_N);
        report.top_by_revenue.push(ProductSales {
            product_id: "P1".to_string(),
            product_name: "<b>Bold</b> & Co".to_string(),
            category: Category::Books,
            total_quantity: 1200,
            total_revenue: 5000.0,
            order_count: 3,
        });
        let html = render_dashboard(&report, generated_at());
        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt; &amp; Co"));
        assert!(html.contains("$5,000.00"));
        assert!(html.contains("1,200"));
    }
}
