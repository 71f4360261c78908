use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use crate::data::classify::{classify_column, Kind};
use crate::data::filter::{filtered_indices, ColumnFilter, FilterParams};
use crate::data::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Filter controls – widget state per filtered column
// ---------------------------------------------------------------------------

/// Widget-side state for one column's filter control.
///
/// The control is materialized into a [`ColumnFilter`] parameter before each
/// filtering pass; the engine only ever sees that explicit parameter mapping,
/// never this state.
#[derive(Debug, Clone)]
pub enum FilterControl {
    /// Checkbox list over the value domain.
    Categorical {
        selected: BTreeSet<Value>,
        domain: BTreeSet<Value>,
    },
    /// Two sliders between the observed bounds, stepped at 1/100 of the span.
    Numeric {
        bound_min: f64,
        bound_max: f64,
        lo: f64,
        hi: f64,
        step: f64,
    },
    /// Two date pickers; the filter only engages when both ends are on.
    Temporal {
        use_start: bool,
        start: NaiveDate,
        use_end: bool,
        end: NaiveDate,
    },
    /// Free-text substring / regex box.
    Text { pattern: String },
}

impl FilterControl {
    /// Build the unfiltered default control for a column, per its kind.
    pub fn for_column(column: &Column) -> Self {
        let classified = classify_column(column);
        match classified.kind {
            Kind::Categorical => {
                let domain = column.unique_values();
                FilterControl::Categorical {
                    selected: domain.clone(),
                    domain,
                }
            }
            Kind::Numeric => {
                let (min, max) = column.numeric_span().unwrap_or((0.0, 0.0));
                FilterControl::Numeric {
                    bound_min: min,
                    bound_max: max,
                    lo: min,
                    hi: max,
                    step: (max - min) / 100.0,
                }
            }
            Kind::Temporal => {
                // Span over the classified cells, so text columns that
                // reinterpreted to instants get real bounds.
                let mut span: Option<(NaiveDate, NaiveDate)> = None;
                for d in classified.values.iter().filter_map(Value::as_datetime) {
                    let d = d.date();
                    span = Some(match span {
                        Some((lo, hi)) => (lo.min(d), hi.max(d)),
                        None => (d, d),
                    });
                }
                let (earliest, latest) = span.unwrap_or_default();
                FilterControl::Temporal {
                    use_start: true,
                    start: earliest,
                    use_end: true,
                    end: latest,
                }
            }
            Kind::Text => FilterControl::Text {
                pattern: String::new(),
            },
        }
    }

    /// The engine-side parameter this control currently describes.
    pub fn to_param(&self) -> ColumnFilter {
        match self {
            FilterControl::Categorical { selected, .. } => ColumnFilter::OneOf(selected.clone()),
            FilterControl::Numeric { lo, hi, .. } => ColumnFilter::NumberRange {
                min: *lo,
                max: *hi,
            },
            FilterControl::Temporal {
                use_start,
                start,
                use_end,
                end,
            } => ColumnFilter::DateRange {
                start: use_start.then(|| start.and_time(NaiveTime::MIN)),
                end: use_end.then(|| end.and_time(NaiveTime::MIN)),
            },
            FilterControl::Text { pattern } => ColumnFilter::Matches(pattern.clone()),
        }
    }

    /// Short kind label for the panel header.
    pub fn kind_label(&self) -> &'static str {
        match self {
            FilterControl::Categorical { .. } => "values",
            FilterControl::Numeric { .. } => "range",
            FilterControl::Temporal { .. } => "dates",
            FilterControl::Text { .. } => "match",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<Table>,

    /// Columns the user picked for filtering, in pick order, each with its
    /// widget state.
    pub controls: Vec<(String, FilterControl)>,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            controls: Vec::new(),
            visible_indices: Vec::new(),
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded dataset and reset the filters.
    pub fn set_dataset(&mut self, dataset: Table) {
        self.controls.clear();
        self.visible_indices = (0..dataset.row_count()).collect();
        self.dataset = Some(dataset);
        self.status_message = None;
        self.loading = false;
    }

    /// The explicit parameter mapping for the current controls.
    pub fn params(&self) -> FilterParams {
        self.controls
            .iter()
            .map(|(name, control)| (name.clone(), control.to_param()))
            .collect()
    }

    /// Recompute `visible_indices` from scratch after any filter change.
    pub fn refilter(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        match filtered_indices(dataset, &self.params()) {
            Ok(indices) => self.visible_indices = indices,
            Err(e) => {
                // Controls are built from classified kinds, so this is a bug.
                log::error!("filtering failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Start filtering on a column, with the unfiltered default control.
    pub fn add_filter(&mut self, column: &Column) {
        if !self.is_filtered(&column.name) {
            self.controls
                .push((column.name.clone(), FilterControl::for_column(column)));
            self.refilter();
        }
    }

    /// Stop filtering on a column.
    pub fn remove_filter(&mut self, name: &str) {
        self.controls.retain(|(n, _)| n != name);
        self.refilter();
    }

    pub fn is_filtered(&self, name: &str) -> bool {
        self.controls.iter().any(|(n, _)| n == name)
    }

    /// The narrowed table the current filters describe, for the exporters.
    pub fn filtered_table(&self) -> Option<Table> {
        self.dataset
            .as_ref()
            .map(|ds| ds.take_rows(&self.visible_indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Table {
        let names: Vec<Value> = (0..12)
            .map(|i| Value::Text(format!("Institution {i}")))
            .collect();
        let scores: Vec<Value> = (0..12).map(|i| Value::Float(1.0 + i as f64 * 0.3)).collect();
        let since: Vec<Value> = (1..=12)
            .map(|d| Value::Text(format!("2019-{d:02}-01")))
            .collect();
        Table::new(vec![
            Column::new("Name", names),
            Column::new("Score", scores),
            Column::new("Since", since),
        ])
    }

    #[test]
    fn default_controls_keep_every_row() {
        let mut state = AppState::default();
        state.set_dataset(registry());
        let table = state.dataset.clone().unwrap();
        for col in table.columns() {
            state.add_filter(col);
        }
        assert_eq!(state.visible_indices.len(), 12);
    }

    #[test]
    fn numeric_control_steps_at_a_hundredth_of_the_span() {
        let table = registry();
        let control = FilterControl::for_column(table.column("Score").unwrap());
        let FilterControl::Numeric { step, bound_min, bound_max, .. } = control else {
            panic!("Score should build a numeric control");
        };
        assert!((step - (bound_max - bound_min) / 100.0).abs() < 1e-12);
    }

    #[test]
    fn temporal_control_defaults_to_the_observed_span() {
        let table = registry();
        let control = FilterControl::for_column(table.column("Since").unwrap());
        let FilterControl::Temporal { use_start, start, use_end, end } = control else {
            panic!("Since should build a temporal control");
        };
        assert!(use_start && use_end);
        assert_eq!(start, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2019, 12, 1).unwrap());
    }

    #[test]
    fn disengaged_endpoint_materializes_as_none() {
        let control = FilterControl::Temporal {
            use_start: true,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            use_end: false,
            end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        };
        let ColumnFilter::DateRange { start, end } = control.to_param() else {
            panic!("temporal control must materialize a date range");
        };
        assert!(start.is_some());
        assert!(end.is_none());
    }

    #[test]
    fn narrowing_a_control_narrows_the_view() {
        let mut state = AppState::default();
        state.set_dataset(registry());
        state.controls.push((
            "Name".into(),
            FilterControl::Text {
                pattern: "Institution 1".into(),
            },
        ));
        state.refilter();
        // "Institution 1", "Institution 10", "Institution 11"
        assert_eq!(state.visible_indices, vec![1, 10, 11]);

        // The original table is untouched and refilters from scratch.
        state.controls.clear();
        state.refilter();
        assert_eq!(state.visible_indices.len(), 12);
    }
}
