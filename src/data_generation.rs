//! Synthetic raw order data.
//!
//! Output is a pure function of [`GeneratorConfig`]: the RNG is seeded from
//! the config and the date window is anchored on `as_of`, so two runs with
//! the same config produce byte-identical files.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngExt, SeedableRng};
use tracing::{debug, info};

use crate::data_ingestion::write_raw_orders;
use crate::error::Result;
use crate::model::{Category, REGIONS, RawOrderLine};
use crate::round2;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub num_records: usize,
    pub seed: u64,
    pub missing_rate: f64,
    pub duplicate_rate: f64,
    pub history_days: i64,
    pub as_of: NaiveDateTime,
}

impl GeneratorConfig {
    pub fn new(num_records: usize, seed: u64, as_of: NaiveDateTime) -> Self {
        Self {
            num_records,
            seed,
            missing_rate: 0.05,
            duplicate_rate: 0.02,
            history_days: 730,
            as_of,
        }
    }
}

pub fn generate_raw_orders(config: &GeneratorConfig) -> Vec<RawOrderLine> {
    // seeded per call, never shared between runs
    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.num_records;
    let start = config.as_of - Duration::days(config.history_days);
    let mut rows = Vec::with_capacity(n + n / 50 + 1);

    for i in 0..n {
        let category = Category::ALL[rng.random_range(0..Category::ALL.len())];
        let product = rng.random_range(0..category.products().len());
        let (min_price, max_price) = category.price_band();
        let price = round2(rng.random_range(min_price..max_price));
        let quantity: i64 = rng.random_range(1..=10);
        let revenue = round2(price * quantity as f64);
        let days_offset = if config.history_days > 0 {
            rng.random_range(0..config.history_days)
        } else {
            0
        };
        let order_date = start + Duration::days(days_offset);
        let customer: u32 = rng.random_range(1..=500);
        let region = REGIONS[rng.random_range(0..REGIONS.len())];

        rows.push(RawOrderLine {
            order_id: format!("ORD{:06}", i + 1),
            product_id: category.product_id(product),
            product_name: category.products()[product].to_string(),
            category: category.as_str().to_string(),
            quantity: Some(quantity.to_string()),
            price: Some(format!("{price:.2}")),
            revenue: Some(format!("{revenue:.2}")),
            order_date: order_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            customer_id: format!("CUST{customer:04}"),
            region: Some(region.to_string()),
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();

    // blank one of price/quantity/region on a few distinct rows
    let missing = ((n as f64 * config.missing_rate).floor() as usize).min(n);
    indices.shuffle(&mut rng);
    for &idx in indices.iter().take(missing) {
        let row = &mut rows[idx];
        match rng.random_range(0..3) {
            0 => row.price = None,
            1 => row.quantity = None,
            _ => row.region = None,
        }
    }

    // and replay a few rows verbatim
    let duplicates = ((n as f64 * config.duplicate_rate).floor() as usize).min(n);
    indices.shuffle(&mut rng);
    for &idx in indices.iter().take(duplicates) {
        rows.push(rows[idx].clone());
    }

    debug!(missing, duplicates, "injected dirty rows");
    rows
}

/// Generates a raw table and writes it as CSV, returning the row count.
pub fn generate_mock_data(path: &Path, config: &GeneratorConfig) -> Result<usize> {
    let rows = generate_raw_orders(config);
    write_raw_orders(path, &rows)?;
    info!(
        records = rows.len(),
        seed = config.seed,
        path = %path.display(),
        "generated raw order data"
    );
    Ok(rows.len())
}
