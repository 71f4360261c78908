use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use super::classify::{classify, classify_column, Kind};
use super::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Filter parameters: one shape per column kind
// ---------------------------------------------------------------------------

/// A caller-supplied filter parameter for one column.
///
/// The variant must match the column's classified [`Kind`]; supplying the
/// wrong shape is a caller bug and fails fast in [`filtered_indices`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// Categorical: row passes when its value is in the set. The full value
    /// domain is the unfiltered default; an empty set excludes every row.
    OneOf(BTreeSet<Value>),
    /// Numeric: inclusive closed range `[min, max]`.
    NumberRange { min: f64, max: f64 },
    /// Temporal: inclusive closed range. Engages only when both endpoints
    /// are present; a half-open input is a no-op. Null instants never pass.
    DateRange {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
    /// Text: substring or regular expression, case-sensitive containment
    /// over the value's string form. An empty pattern is a no-op.
    Matches(String),
}

impl ColumnFilter {
    fn shape(&self) -> &'static str {
        match self {
            ColumnFilter::OneOf(_) => "value set",
            ColumnFilter::NumberRange { .. } => "number range",
            ColumnFilter::DateRange { .. } => "date range",
            ColumnFilter::Matches(_) => "text match",
        }
    }
}

/// Per-column filter selections: maps column_name → parameter.
/// Columns absent from the mapping are unconstrained (pass-through).
pub type FilterParams = BTreeMap<String, ColumnFilter>;

/// The unfiltered parameter for a column, per its kind: the full value
/// domain, the observed numeric span, an open date range, an empty pattern.
pub fn unfiltered(column: &Column) -> ColumnFilter {
    match classify(column) {
        Kind::Categorical => ColumnFilter::OneOf(column.unique_values()),
        Kind::Numeric => {
            let (min, max) = column.numeric_span().unwrap_or((0.0, 0.0));
            ColumnFilter::NumberRange { min, max }
        }
        Kind::Temporal => ColumnFilter::DateRange {
            start: None,
            end: None,
        },
        Kind::Text => ColumnFilter::Matches(String::new()),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Contract violations raised by the predicate engine.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The parameter shape does not fit the column's classified kind.
    /// Surfaced immediately rather than coerced.
    #[error("{shape} filter does not apply to {kind} column '{column}'")]
    KindMismatch {
        column: String,
        kind: Kind,
        shape: &'static str,
    },
    #[error("no such column: '{0}'")]
    UnknownColumn(String),
}

// ---------------------------------------------------------------------------
// The conjunction driver
// ---------------------------------------------------------------------------

/// Return indices of rows passing all supplied filters, in row order.
///
/// Each `(column, parameter)` pair contributes one per-row predicate; the
/// predicates are AND-combined, so application order cannot change the
/// result. An empty mapping keeps every row.
pub fn filtered_indices(table: &Table, params: &FilterParams) -> Result<Vec<usize>, FilterError> {
    let mut passing = vec![true; table.row_count()];

    for (name, filter) in params {
        let column = table
            .column(name)
            .ok_or_else(|| FilterError::UnknownColumn(name.clone()))?;
        let classified = classify_column(column);
        apply_one(name, classified.kind, &classified.values, filter, &mut passing)?;
    }

    Ok(passing
        .iter()
        .enumerate()
        .filter_map(|(i, pass)| pass.then_some(i))
        .collect())
}

/// Return a fresh table containing exactly the rows that pass every filter,
/// columns and row order unchanged. The input table is never mutated and
/// stays available for re-filtering from scratch.
pub fn apply_filters(table: &Table, params: &FilterParams) -> Result<Table, FilterError> {
    let indices = filtered_indices(table, params)?;
    Ok(table.take_rows(&indices))
}

/// AND one column's predicate into the `passing` mask.
fn apply_one(
    name: &str,
    kind: Kind,
    values: &[Value],
    filter: &ColumnFilter,
    passing: &mut [bool],
) -> Result<(), FilterError> {
    match (kind, filter) {
        (Kind::Categorical, ColumnFilter::OneOf(allowed)) => {
            for (i, v) in values.iter().enumerate() {
                if !allowed.contains(v) {
                    passing[i] = false;
                }
            }
        }
        (Kind::Numeric, ColumnFilter::NumberRange { min, max }) => {
            for (i, v) in values.iter().enumerate() {
                let inside = v.as_f64().is_some_and(|x| *min <= x && x <= *max);
                if !inside {
                    passing[i] = false;
                }
            }
        }
        (
            Kind::Temporal,
            ColumnFilter::DateRange {
                start: Some(start),
                end: Some(end),
            },
        ) => {
            for (i, v) in values.iter().enumerate() {
                let inside = v.as_datetime().is_some_and(|d| *start <= d && d <= *end);
                if !inside {
                    passing[i] = false;
                }
            }
        }
        // Single-endpoint input is ignored.
        (Kind::Temporal, ColumnFilter::DateRange { .. }) => {}
        (Kind::Text, ColumnFilter::Matches(pattern)) => {
            if pattern.is_empty() {
                return Ok(());
            }
            let matcher = TextMatcher::new(pattern);
            for (i, v) in values.iter().enumerate() {
                if !matcher.is_match(&v.to_string()) {
                    passing[i] = false;
                }
            }
        }
        _ => {
            return Err(FilterError::KindMismatch {
                column: name.to_string(),
                kind,
                shape: filter.shape(),
            })
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Text matching: regex with a literal fallback
// ---------------------------------------------------------------------------

/// Case-sensitive containment. The pattern is compiled as a regular
/// expression when it is one; anything that fails to compile is matched as
/// a plain substring instead.
enum TextMatcher {
    Pattern(Regex),
    Literal(String),
}

impl TextMatcher {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => TextMatcher::Pattern(re),
            Err(_) => TextMatcher::Literal(pattern.to_string()),
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            TextMatcher::Pattern(re) => re.is_match(haystack),
            TextMatcher::Literal(lit) => haystack.contains(lit.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn set(values: &[Value]) -> BTreeSet<Value> {
        values.iter().cloned().collect()
    }

    /// Small registry-shaped fixture: Status is tagged categorical and Age
    /// is captured by the distinct-count rule.
    fn small_fixture() -> Table {
        Table::new(vec![
            Column::new(
                "Status",
                vec![
                    Value::Text("Active".into()),
                    Value::Text("Active".into()),
                    Value::Text("Closed".into()),
                ],
            )
            .with_categorical_tag(),
            Column::new(
                "Age",
                vec![Value::Integer(20), Value::Integer(45), Value::Integer(67)],
            ),
        ])
    }

    const NAMES: [&str; 12] = [
        "Federal University of Parana",
        "State University of Campinas",
        "Federal Institute of Bahia",
        "Private College Alfa",
        "Municipal Faculty Beta",
        "Federal University of Pelotas",
        "State College Gamma",
        "Technical School Delta",
        "Federal Institute of Ceara",
        "Private University Epsilon",
        "Municipal School Zeta",
        "State Faculty Eta",
    ];

    /// Wide fixture: 12 rows so Name / Score / Since escape the categorical
    /// capture and classify Text / Numeric / Temporal. The first three Since
    /// values are the interesting ones for the range checks.
    fn wide_fixture() -> Table {
        let since: Vec<Value> = vec![dt(2020, 1, 1), dt(2020, 6, 1), dt(2021, 1, 1)]
            .into_iter()
            .chain((1..=9).map(|d| dt(2022, 1, d)))
            .map(Value::DateTime)
            .collect();
        Table::new(vec![
            Column::new(
                "Name",
                NAMES.iter().map(|s| Value::Text(s.to_string())).collect(),
            ),
            Column::new(
                "Score",
                (0..12).map(|i| Value::Float(i as f64 / 2.0)).collect(),
            ),
            Column::new("Since", since),
        ])
    }

    #[test]
    fn empty_params_is_the_identity() {
        let table = wide_fixture();
        let out = apply_filters(&table, &FilterParams::new()).unwrap();
        assert_eq!(out, table);
    }

    #[test]
    fn filtering_is_idempotent() {
        // Wide enough that the narrowed columns stay above the categorical
        // threshold, so the second pass classifies them identically.
        let table = Table::new(vec![
            Column::new(
                "Name",
                (0..30)
                    .map(|i| Value::Text(format!("Institution {i}")))
                    .collect(),
            ),
            Column::new("Score", (0..30).map(|i| Value::Float(i as f64)).collect()),
        ]);
        let mut params = FilterParams::new();
        params.insert(
            "Score".into(),
            ColumnFilter::NumberRange {
                min: 5.0,
                max: 25.0,
            },
        );
        params.insert("Name".into(), ColumnFilter::Matches("1".into()));
        let once = apply_filters(&table, &params).unwrap();
        let twice = apply_filters(&once, &params).unwrap();
        assert_eq!(once, twice);
        assert!(once.row_count() < table.row_count());
        assert!(once.row_count() > 0);
    }

    #[test]
    fn categorical_membership_and_conjunction() {
        let table = small_fixture();
        let mut params = FilterParams::new();
        params.insert(
            "Status".into(),
            ColumnFilter::OneOf(set(&[Value::Text("Active".into())])),
        );
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out.row_count(), 2);

        // Age is also categorical (3 distinct < 10); no row is both Active
        // and 67.
        params.insert("Age".into(), ColumnFilter::OneOf(set(&[Value::Integer(67)])));
        assert_eq!(apply_filters(&table, &params).unwrap().row_count(), 0);

        // Row 2 is Active/45, so the conjunction keeps exactly it.
        params.insert("Age".into(), ColumnFilter::OneOf(set(&[Value::Integer(45)])));
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.column("Age").unwrap().values, vec![Value::Integer(45)]);
    }

    #[test]
    fn empty_allowed_set_excludes_all_rows() {
        let table = small_fixture();
        let mut params = FilterParams::new();
        params.insert("Status".into(), ColumnFilter::OneOf(BTreeSet::new()));
        assert_eq!(apply_filters(&table, &params).unwrap().row_count(), 0);
    }

    #[test]
    fn numeric_range_is_inclusive_at_both_ends() {
        let table = wide_fixture();
        let (min, max) = table.column("Score").unwrap().numeric_span().unwrap();
        let mut params = FilterParams::new();
        params.insert("Score".into(), ColumnFilter::NumberRange { min, max });
        // The observed span keeps every row.
        assert_eq!(
            apply_filters(&table, &params).unwrap().row_count(),
            table.row_count()
        );
    }

    #[test]
    fn temporal_range_keeps_rows_inside_both_endpoints() {
        let table = wide_fixture();
        let mut params = FilterParams::new();
        params.insert(
            "Since".into(),
            ColumnFilter::DateRange {
                start: Some(dt(2020, 1, 1)),
                end: Some(dt(2020, 12, 31)),
            },
        );
        let out = apply_filters(&table, &params).unwrap();
        // Exactly 2020-01-01 and 2020-06-01 fall inside; 2021-01-01 and the
        // 2022 tail do not.
        assert_eq!(out.row_count(), 2);
        assert_eq!(
            out.column("Since").unwrap().values,
            vec![
                Value::DateTime(dt(2020, 1, 1)),
                Value::DateTime(dt(2020, 6, 1)),
            ]
        );
    }

    #[test]
    fn half_open_date_range_is_a_no_op() {
        let table = wide_fixture();
        let mut params = FilterParams::new();
        params.insert(
            "Since".into(),
            ColumnFilter::DateRange {
                start: Some(dt(2020, 6, 1)),
                end: None,
            },
        );
        assert_eq!(
            apply_filters(&table, &params).unwrap().row_count(),
            table.row_count()
        );
    }

    #[test]
    fn null_instants_never_pass_an_engaged_date_range() {
        let values: Vec<Value> = (1..=11)
            .map(|d| Value::DateTime(dt(2020, 1, d)))
            .chain(std::iter::once(Value::Null))
            .collect();
        let table = Table::new(vec![Column::new("Since", values)]);
        let mut params = FilterParams::new();
        params.insert(
            "Since".into(),
            ColumnFilter::DateRange {
                start: Some(dt(2019, 1, 1)),
                end: Some(dt(2021, 1, 1)),
            },
        );
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out.row_count(), 11);
        assert!(out
            .column("Since")
            .unwrap()
            .values
            .iter()
            .all(|v| !v.is_null()));
    }

    #[test]
    fn empty_text_pattern_is_a_no_op() {
        let table = wide_fixture();
        let mut params = FilterParams::new();
        params.insert("Name".into(), ColumnFilter::Matches(String::new()));
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out, table);
    }

    #[test]
    fn text_matches_substring_and_regex() {
        let table = wide_fixture();
        let mut params = FilterParams::new();
        params.insert("Name".into(), ColumnFilter::Matches("Univer".into()));
        assert_eq!(apply_filters(&table, &params).unwrap().row_count(), 4);

        params.insert(
            "Name".into(),
            ColumnFilter::Matches("^(Federal|State)".into()),
        );
        assert_eq!(apply_filters(&table, &params).unwrap().row_count(), 7);

        // Case-sensitive containment.
        params.insert("Name".into(), ColumnFilter::Matches("university".into()));
        assert_eq!(apply_filters(&table, &params).unwrap().row_count(), 0);
    }

    #[test]
    fn invalid_regex_falls_back_to_literal_containment() {
        let values = [
            "price (BRL)",
            "price",
            "count (n",
            "d",
            "e",
            "f",
            "g",
            "h",
            "i",
            "j",
        ];
        let table = Table::new(vec![Column::new(
            "Name",
            values.iter().map(|s| Value::Text(s.to_string())).collect(),
        )]);
        let mut params = FilterParams::new();
        // "(n" is not a valid regex; it still matches as a substring.
        params.insert("Name".into(), ColumnFilter::Matches("(n".into()));
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(
            out.column("Name").unwrap().values,
            vec![Value::Text("count (n".into())]
        );
    }

    #[test]
    fn date_range_filters_reinterpreted_text_dates() {
        let days: Vec<Value> = (1..=12)
            .map(|d| Value::Text(format!("2020-03-{d:02}")))
            .collect();
        let table = Table::new(vec![Column::new("when", days)]);
        let mut params = FilterParams::new();
        params.insert(
            "when".into(),
            ColumnFilter::DateRange {
                start: Some(dt(2020, 3, 5)),
                end: Some(dt(2020, 3, 8)),
            },
        );
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out.row_count(), 4);
        // The surviving cells keep their original text representation.
        assert_eq!(
            out.column("when").unwrap().values[0],
            Value::Text("2020-03-05".into())
        );
    }

    #[test]
    fn text_parameter_on_a_reinterpreted_column_is_a_mismatch() {
        // A text column of dates classifies temporal, so a text parameter on
        // it is a contract violation.
        let days: Vec<Value> = (1..=12)
            .map(|d| Value::Text(format!("2020-03-{d:02}")))
            .collect();
        let table = Table::new(vec![Column::new("when", days)]);
        let mut params = FilterParams::new();
        params.insert("when".into(), ColumnFilter::Matches("2020".into()));
        assert!(matches!(
            apply_filters(&table, &params),
            Err(FilterError::KindMismatch { .. })
        ));
    }

    #[test]
    fn kind_mismatch_fails_fast() {
        let table = small_fixture();
        let mut params = FilterParams::new();
        params.insert(
            "Status".into(),
            ColumnFilter::NumberRange { min: 0.0, max: 1.0 },
        );
        let err = apply_filters(&table, &params).unwrap_err();
        assert!(matches!(err, FilterError::KindMismatch { .. }));
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let table = small_fixture();
        let mut params = FilterParams::new();
        params.insert("Nope".into(), ColumnFilter::Matches("x".into()));
        assert!(matches!(
            apply_filters(&table, &params),
            Err(FilterError::UnknownColumn(_))
        ));
    }

    #[test]
    fn unfiltered_defaults_keep_every_row() {
        let table = wide_fixture();
        let mut params = FilterParams::new();
        for col in table.columns() {
            params.insert(col.name.clone(), unfiltered(col));
        }
        let out = apply_filters(&table, &params).unwrap();
        assert_eq!(out, table);
    }
}
