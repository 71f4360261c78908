use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common registry-export dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Timezone-naive instant; offsets are discarded at parse time.
    DateTime(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                DateTime(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::DateTime(dt) => {
                // Midnight instants came from plain dates: show them as such.
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64` for range filtering.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The instant behind a temporal cell, if any.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Column – one named column of the table
// ---------------------------------------------------------------------------

/// A single named column: its cells plus the optional categorical tag the
/// source schema may carry (e.g. Parquet dictionary encoding).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Tagged categorical by the upstream schema.
    pub categorical: bool,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            categorical: false,
            values,
        }
    }

    /// Mark the column categorical per the source schema.
    pub fn with_categorical_tag(mut self) -> Self {
        self.categorical = true;
        self
    }

    /// Number of distinct non-null values. Nulls do not count towards
    /// distinctness, matching how the registry tooling counts uniques.
    pub fn distinct_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Sorted set of unique values, nulls included – the domain offered to
    /// a categorical filter.
    pub fn unique_values(&self) -> BTreeSet<Value> {
        self.values.iter().cloned().collect()
    }

    /// Observed `(min, max)` over the numeric cells, if there are any.
    pub fn numeric_span(&self) -> Option<(f64, f64)> {
        let mut span: Option<(f64, f64)> = None;
        for v in self.values.iter().filter_map(Value::as_f64) {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        span
    }

    /// Observed `(earliest, latest)` over the temporal cells, if there are any.
    pub fn temporal_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut span: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for v in self.values.iter().filter_map(Value::as_datetime) {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        span
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An in-memory dataset: ordered named columns, all row-aligned.
///
/// The loader guarantees equal column lengths, so the table never
/// re-validates shape. A `Table` is a value: filtering derives fresh tables
/// and never mutates the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns
                .windows(2)
                .all(|w| w[0].values.len() == w[1].values.len()),
            "columns must be row-aligned"
        );
        Table { columns }
    }

    /// Number of rows (0 for a table with no columns).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Columns in their original order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in their original order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Derive a fresh table keeping only the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                categorical: col.categorical,
                values: indices.iter().map(|&i| col.values[i].clone()).collect(),
            })
            .collect();
        Table { columns }
    }
}
