use chrono::NaiveDate;
use derive_more::Display;
use sea_orm::prelude::Decimal;
use serde::{Serialize, Serializer};

/// A single scalar read back from an aggregate query.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Date(NaiveDate),
    Label(String),
    Amount(Decimal),
    Count(i64),
    Null,
}

impl Cell {
    fn type_name(&self) -> &'static str {
        match self {
            Cell::Date(_) => "date",
            Cell::Label(_) => "label",
            Cell::Amount(_) => "amount",
            Cell::Count(_) => "count",
            Cell::Null => "null",
        }
    }

    fn to_label(&self) -> Option<String> {
        match self {
            Cell::Date(date) => Some(date.format(ISO_DATE).to_string()),
            Cell::Label(label) => Some(label.clone()),
            Cell::Amount(amount) => Some(amount.to_string()),
            Cell::Count(count) => Some(count.to_string()),
            Cell::Null => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow(pub Vec<Cell>);

/// How the first two columns of a row are read.
///
/// `Day` rows come from bucket queries (a day or month plus its total),
/// `Lifetime` rows from whole-history aggregates where column 0 is only a
/// label. The query that produced the row decides the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    Day,
    Lifetime,
}

impl RowShape {
    /// Picks a shape from the runtime type of column 0, for rows whose
    /// originating query is unknown.
    pub fn infer(row: &RawRow) -> Self {
        match row.0.first() {
            Some(Cell::Date(_)) => RowShape::Day,
            _ => RowShape::Lifetime,
        }
    }
}

/// Money totals stay decimal, counts stay integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Amount(Decimal),
    Count(i64),
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Amount(amount) => serializer.collect_str(amount),
            Metric::Count(count) => serializer.serialize_i64(*count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAggregate {
    #[serde(serialize_with = "serialize_iso_date")]
    pub date: NaiveDate,
    pub sum: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_paid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<i64>,
}

/// Whole-history aggregate. The template reads the label as `sum` and the
/// total as `report_sum`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifetimeAggregate {
    #[serde(rename = "sum")]
    pub label: Option<String>,
    #[serde(rename = "report_sum")]
    pub total_sum: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_paid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapedRecord {
    Day(DayAggregate),
    Lifetime(LifetimeAggregate),
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ShapeError {
    #[display("expected 2 to 4 columns, got {_0}")]
    Arity(usize),
    #[display("column {column} must be a date, got {found}")]
    ExpectedDate { column: usize, found: &'static str },
    #[display("column {column} must be numeric, got {found}")]
    ExpectedNumber { column: usize, found: &'static str },
}

impl std::error::Error for ShapeError {}

const ISO_DATE: &str = "%Y-%m-%d";

fn serialize_iso_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(ISO_DATE))
}

pub fn shape_row(shape: RowShape, row: &RawRow) -> Result<ShapedRecord, ShapeError> {
    let cells = &row.0;
    if !(2..=4).contains(&cells.len()) {
        return Err(ShapeError::Arity(cells.len()));
    }

    let total = metric_at(cells, 1)?;
    let not_paid = count_at(cells, 2)?;
    let paid = count_at(cells, 3)?;

    let record = match shape {
        RowShape::Day => {
            let date = match &cells[0] {
                Cell::Date(date) => *date,
                other => {
                    return Err(ShapeError::ExpectedDate {
                        column: 0,
                        found: other.type_name(),
                    })
                }
            };
            ShapedRecord::Day(DayAggregate {
                date,
                sum: total,
                not_paid,
                paid,
            })
        }
        RowShape::Lifetime => ShapedRecord::Lifetime(LifetimeAggregate {
            label: cells[0].to_label(),
            total_sum: total,
            not_paid,
            paid,
        }),
    };

    Ok(record)
}

fn metric_at(cells: &[Cell], column: usize) -> Result<Metric, ShapeError> {
    match &cells[column] {
        Cell::Amount(amount) => Ok(Metric::Amount(*amount)),
        Cell::Count(count) => Ok(Metric::Count(*count)),
        other => Err(ShapeError::ExpectedNumber {
            column,
            found: other.type_name(),
        }),
    }
}

// Absent column -> None; a present column must hold a count.
fn count_at(cells: &[Cell], column: usize) -> Result<Option<i64>, ShapeError> {
    match cells.get(column) {
        None => Ok(None),
        Some(Cell::Count(count)) => Ok(Some(*count)),
        Some(other) => Err(ShapeError::ExpectedNumber {
            column,
            found: other.type_name(),
        }),
    }
}
