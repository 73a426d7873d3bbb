use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use calamine::{Data, DataType, Reader, Xlsx};
use chrono::NaiveDateTime;
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::sales::dataset::{BestAndWorst, SalesData};
use crate::sales::transaction::{parse_order_date, parse_price, Transaction};
use crate::sales::{EmptyReason, LoadError};

const REQUIRED_COLUMNS: [&str; 3] = ["order_date", "item", "price"];

/// One cell as read from the source, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// A cell the source itself stores as a timestamp (spreadsheet date cells).
    DateTime(NaiveDateTime),
}

impl Cell {
    fn order_date(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Text(text) => parse_order_date(text),
            Cell::DateTime(datetime) => Some(*datetime),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::DateTime(datetime) => datetime.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct RawRow {
    /// 1-based line (CSV) or row (spreadsheet) number in the source.
    pub line: u64,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[enum_dispatch]
pub trait TransactionSource {
    fn describe(&self) -> String;
    fn read_table(&self) -> Result<RawTable, LoadError>;
}

#[enum_dispatch(TransactionSource)]
pub enum Source {
    CsvFile,
    CsvText,
    XlsxFile,
}

impl Source {
    /// Picks the reader from the file extension; anything but `.xlsx` is read as CSV.
    pub fn from_path(path: impl Into<PathBuf>) -> Source {
        let path = path.into();
        let is_xlsx = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("xlsx"));

        if is_xlsx {
            Source::XlsxFile(XlsxFile::new(path))
        } else {
            Source::CsvFile(CsvFile::new(path))
        }
    }
}

fn open_file(path: &Path) -> Result<File, LoadError> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(LoadError::NotFound(path.display().to_string())),
        Err(err) => Err(LoadError::unreadable_from(format!("cannot open {}", path.display()), err)),
    }
}

/// Headers are trimmed, cell values are kept exactly as written.
fn read_csv_table<R: Read>(reader: R) -> Result<RawTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|err| LoadError::unreadable_from("failed to read header row", err))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| LoadError::unreadable_from("malformed row", err))?;
        rows.push(RawRow {
            line: record.position().map_or(0, |position| position.line()),
            cells: record.iter().map(|field| Cell::Text(field.to_string())).collect(),
        });
    }

    Ok(RawTable { headers, rows })
}

pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> CsvFile {
        CsvFile { path: path.into() }
    }
}

impl TransactionSource for CsvFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_table(&self) -> Result<RawTable, LoadError> {
        read_csv_table(open_file(&self.path)?)
    }
}

/// Sales table held in memory, e.g. an upload or a test fixture.
pub struct CsvText {
    text: String,
}

impl CsvText {
    pub fn new(text: impl Into<String>) -> CsvText {
        CsvText { text: text.into() }
    }
}

impl TransactionSource for CsvText {
    fn describe(&self) -> String {
        "<in-memory csv>".to_string()
    }

    fn read_table(&self) -> Result<RawTable, LoadError> {
        read_csv_table(self.text.as_bytes())
    }
}

/// First worksheet of an Excel workbook; its first row holds the headers.
pub struct XlsxFile {
    path: PathBuf,
}

impl XlsxFile {
    pub fn new(path: impl Into<PathBuf>) -> XlsxFile {
        XlsxFile { path: path.into() }
    }
}

impl TransactionSource for XlsxFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_table(&self) -> Result<RawTable, LoadError> {
        let file = open_file(&self.path)?;
        let mut workbook: Xlsx<_> = Xlsx::new(BufReader::new(file))
            .map_err(|err| LoadError::unreadable_from(format!("{} is not an xlsx workbook", self.describe()), err))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::unreadable(format!("{} has no worksheets", self.describe())))?
            .map_err(|err| LoadError::unreadable_from("failed to read worksheet", err))?;

        let first_row = range.start().map_or(0, |(row, _)| u64::from(row));
        let mut rows = range.rows();

        let Some(header_row) = rows.next() else {
            return Ok(RawTable::default());
        };
        let headers = header_row.iter().map(|cell| cell.to_string().trim().to_string()).collect();

        let rows = rows
            .enumerate()
            .map(|(index, row)| RawRow {
                line: first_row + index as u64 + 2,
                cells: row.iter().map(spreadsheet_cell).collect(),
            })
            .collect();

        Ok(RawTable { headers, rows })
    }
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(datetime) => Cell::DateTime(datetime),
            None => Cell::Text(cell.to_string()),
        },
        Data::Empty => Cell::Text(String::new()),
        other => Cell::Text(other.to_string()),
    }
}

fn column_index(headers: &[String], column: &str) -> Option<usize> {
    headers.iter().position(|header| header == column)
}

/// Reads every row of `source`, discards the ones that cannot be used and
/// derives the calendar fields of the rest.
///
/// A row is discarded when its `order_date` is not a recognisable timestamp,
/// its `price` is not a number or its `item` is blank. Discarded rows are
/// logged at debug level and never abort the load. Other columns are carried
/// through untouched.
pub fn load(source: impl Into<Source>) -> Result<SalesData, LoadError> {
    let source = source.into();
    let table = source.read_table()?;

    let (Some(date_idx), Some(item_idx), Some(price_idx)) = (
        column_index(&table.headers, "order_date"),
        column_index(&table.headers, "item"),
        column_index(&table.headers, "price"),
    ) else {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| column_index(&table.headers, column).is_none())
            .collect();
        return Err(LoadError::unreadable(format!("missing columns: {}", missing.join(", "))));
    };

    let empty = Cell::Text(String::new());
    let mut transactions = Vec::new();
    let mut dropped = 0;

    for row in &table.rows {
        let line = row.line;
        let cell = |index: usize| row.cells.get(index).unwrap_or(&empty);

        let Some(order_date) = cell(date_idx).order_date() else {
            debug!("invalid order_date, line={}, value={:?}", line, cell(date_idx));
            dropped += 1;
            continue;
        };
        let Some(price) = parse_price(&cell(price_idx).to_text()) else {
            debug!("invalid price, line={}, value={:?}", line, cell(price_idx));
            dropped += 1;
            continue;
        };
        let item = cell(item_idx).to_text().trim().to_string();
        if item.is_empty() {
            debug!("missing item, line={}", line);
            dropped += 1;
            continue;
        }

        let extra = table
            .headers
            .iter()
            .enumerate()
            .filter(|(index, _)| ![date_idx, item_idx, price_idx].contains(index))
            .map(|(index, header)| (header.clone(), cell(index).to_text()))
            .collect();

        transactions.push(Transaction::new(order_date, item, price).with_extra(extra));
    }

    info!(
        "loaded {} transactions from {}, dropped {} rows",
        transactions.len(),
        source.describe(),
        dropped
    );

    if transactions.is_empty() {
        let reason = if dropped == 0 {
            EmptyReason::NoRows
        } else {
            EmptyReason::AllRowsInvalid { dropped }
        };
        return Err(LoadError::Empty(reason));
    }

    Ok(SalesData::new(transactions))
}

#[derive(Debug, Serialize)]
struct MonthlySalesRecord {
    month: u32,
    price: Decimal,
}

#[derive(Debug, Serialize)]
struct YearlySalesRecord {
    year: i32,
    price: Decimal,
}

#[derive(Debug, Serialize)]
struct ProductSalesRecord<'a> {
    item: &'a str,
    price: Decimal,
}

#[derive(Debug, Serialize)]
struct RankedProductRecord<'a> {
    rank: &'a str,
    item: &'a str,
    price: Decimal,
}

/// Writes transactions with their derived and pass-through columns.
///
/// Pass-through headers are taken from the first transaction; every
/// transaction of one load shares them.
pub fn export_transactions<W: Write>(transactions: &[&Transaction], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["order_date", "item", "price", "year", "month"];
    if let Some(first) = transactions.first() {
        header.extend(first.extra().iter().map(|(name, _)| name.as_str()));
    }
    csv_writer.write_record(&header)?;

    for tx in transactions {
        let mut row = vec![
            tx.order_date().to_string(),
            tx.item().clone(),
            tx.price().to_string(),
            tx.year().to_string(),
            tx.month().to_string(),
        ];
        row.extend(tx.extra().iter().map(|(_, value)| value.clone()));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;

    Ok(())
}

pub fn export_monthly_sales<W: Write>(sales: impl IntoIterator<Item = (u32, Decimal)>, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for (month, price) in sales {
        csv_writer.serialize(MonthlySalesRecord { month, price })?;
    }

    csv_writer.flush()?;

    Ok(())
}

pub fn export_yearly_sales<W: Write>(sales: impl IntoIterator<Item = (i32, Decimal)>, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for (year, price) in sales {
        csv_writer.serialize(YearlySalesRecord { year, price })?;
    }

    csv_writer.flush()?;

    Ok(())
}

pub fn export_product_sales<W: Write>(sales: impl IntoIterator<Item = (String, Decimal)>, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for (item, price) in sales {
        csv_writer.serialize(ProductSalesRecord { item: &item, price })?;
    }

    csv_writer.flush()?;

    Ok(())
}

pub fn export_best_and_worst<W: Write>(result: &BestAndWorst, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for (rank, product) in [("best", &result.best), ("worst", &result.worst)] {
        csv_writer.serialize(RankedProductRecord {
            rank,
            item: &product.item,
            price: product.total,
        })?;
    }

    csv_writer.flush()?;

    Ok(())
}
