use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::{Column, Value};

// ---------------------------------------------------------------------------
// Column classification: which filter control fits a column
// ---------------------------------------------------------------------------

/// Columns with fewer distinct values than this are treated as categorical,
/// whatever their cell representation. Strict: exactly 10 distinct values
/// already falls through to the representation checks.
pub const CATEGORICAL_MAX_DISTINCT: usize = 10;

/// The semantic kind of a column. Exactly one per column, assigned by
/// [`classify`] with first-match-wins ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Categorical,
    Numeric,
    Temporal,
    Text,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Categorical => "categorical",
            Kind::Numeric => "numeric",
            Kind::Temporal => "temporal",
            Kind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A column as seen by one filtering pass: its kind, plus the cells the
/// predicates should run against. When the text-to-temporal reinterpretation
/// succeeded the cells are the parsed instants; otherwise they borrow the
/// column's own cells unchanged.
pub struct Classified<'a> {
    pub kind: Kind,
    pub values: Cow<'a, [Value]>,
}

/// Classify a column. Ordered checks, first match wins:
///
/// 1. upstream categorical tag, or fewer than
///    [`CATEGORICAL_MAX_DISTINCT`] distinct non-null values → `Categorical`
///    (an empty column has 0 distinct values and lands here);
/// 2. otherwise text cells get one best-effort temporal reinterpretation;
/// 3. a numeric representation → `Numeric`;
/// 4. a temporal representation (native or reinterpreted) → `Temporal`;
/// 5. everything else → `Text`.
pub fn classify(column: &Column) -> Kind {
    classify_column(column).kind
}

/// Like [`classify`], but also hands back the (possibly reinterpreted) cells
/// so the predicate engine can evaluate against them without a second parse.
pub fn classify_column(column: &Column) -> Classified<'_> {
    if column.categorical || column.distinct_count() < CATEGORICAL_MAX_DISTINCT {
        return Classified {
            kind: Kind::Categorical,
            values: Cow::Borrowed(&column.values),
        };
    }

    let values: Cow<'_, [Value]> = match reinterpret_temporal(column) {
        Some(instants) => Cow::Owned(instants),
        None => Cow::Borrowed(&column.values),
    };

    let kind = if is_numeric(&values) {
        Kind::Numeric
    } else if is_temporal(&values) {
        Kind::Temporal
    } else {
        Kind::Text
    };
    Classified { kind, values }
}

/// Every non-null cell is a machine number, and there is at least one.
fn is_numeric(values: &[Value]) -> bool {
    let mut seen = false;
    for v in values {
        match v {
            Value::Integer(_) | Value::Float(_) => seen = true,
            Value::Null => {}
            _ => return false,
        }
    }
    seen
}

/// Every non-null cell is an instant, and there is at least one.
fn is_temporal(values: &[Value]) -> bool {
    let mut seen = false;
    for v in values {
        match v {
            Value::DateTime(_) => seen = true,
            Value::Null => {}
            _ => return false,
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Best-effort text → temporal reinterpretation
// ---------------------------------------------------------------------------

/// Try to reinterpret a generic text column as instants.
///
/// Pure and total: returns the fully parsed cells, or `None` when the column
/// is not all-text or any single value fails to parse. There is no partial
/// conversion and no error — an unparsable column simply keeps its text
/// representation. Nulls pass through as nulls.
pub fn reinterpret_temporal(column: &Column) -> Option<Vec<Value>> {
    let mut out = Vec::with_capacity(column.values.len());
    let mut parsed_any = false;
    for v in &column.values {
        match v {
            Value::Null => out.push(Value::Null),
            Value::Text(s) => {
                out.push(Value::DateTime(parse_instant(s)?));
                parsed_any = true;
            }
            // Not a generic text column: leave it alone.
            _ => return None,
        }
    }
    parsed_any.then_some(out)
}

/// Accepted datetime layouts, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Accepted date-only layouts; parsed values land at midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

fn parse_instant(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // Offset-aware input keeps its wall-clock reading: the offset is
    // discarded, not converted to UTC.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    None
}
