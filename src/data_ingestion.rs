use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::model::{CleanedOrderLine, RAW_COLUMNS, RawOrderLine};

/// A row type that is stored as one CSV table with a fixed header.
pub trait CsvTable: Serialize {
    const COLUMNS: &'static [&'static str];
}

impl CsvTable for RawOrderLine {
    const COLUMNS: &'static [&'static str] = &RAW_COLUMNS;
}

impl CsvTable for CleanedOrderLine {
    const COLUMNS: &'static [&'static str] = &[
        "OrderID",
        "ProductID",
        "ProductName",
        "Category",
        "Quantity",
        "Price",
        "Revenue",
        "OrderDate",
        "CustomerID",
        "Region",
        "TotalSales",
        "ProfitMargin",
        "Profit",
        "Year",
        "Month",
        "Quarter",
        "MonthName",
        "YearMonth",
        "DaysSinceOrder",
    ];
}

/// Loads the raw order table.
pub fn open_file(path: impl AsRef<Path>) -> Result<Vec<RawOrderLine>> {
    let path = path.as_ref();
    let rows = read_table(File::open(path)?, &path.display().to_string())?;
    info!(records = rows.len(), path = %path.display(), "loaded raw data");
    Ok(rows)
}

pub fn read_raw_orders<R: Read>(reader: R, source: &str) -> Result<Vec<RawOrderLine>> {
    read_table(reader, source)
}

pub fn read_cleaned_orders(path: impl AsRef<Path>) -> Result<Vec<CleanedOrderLine>> {
    let path = path.as_ref();
    let rows = read_table(File::open(path)?, &path.display().to_string())?;
    info!(records = rows.len(), path = %path.display(), "loaded cleaned data");
    Ok(rows)
}

pub fn write_raw_orders(path: impl AsRef<Path>, rows: &[RawOrderLine]) -> Result<()> {
    write_table(File::create(path)?, rows)
}

pub fn write_cleaned_orders(path: impl AsRef<Path>, rows: &[CleanedOrderLine]) -> Result<()> {
    let path = path.as_ref();
    write_table(File::create(path)?, rows)?;
    info!(records = rows.len(), path = %path.display(), "saved cleaned data");
    Ok(())
}

/// Reads a whole table after checking every column of `T` is in the header.
pub fn read_table<T, R>(reader: R, source: &str) -> Result<Vec<T>>
where
    T: CsvTable + DeserializeOwned,
    R: Read,
{
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(PipelineError::EmptyInput {
            path: source.to_string(),
        });
    }
    check_columns(&headers, T::COLUMNS)?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn check_columns(headers: &StringRecord, required: &[&str]) -> Result<()> {
    match required
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        Some(column) => Err(PipelineError::MissingColumn {
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes `rows` with a header line, even when there are no rows.
pub fn write_table<T: CsvTable, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
