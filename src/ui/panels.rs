use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::loader::{self, LoadError};
use crate::state::{AppState, FilterControl};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Clone the names so we can mutate state inside the loop.
    let names: Vec<String> = state
        .dataset
        .as_ref()
        .map(|ds| ds.column_names().map(str::to_string).collect())
        .unwrap_or_default();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column picker ----
            ui.strong("Filter on");
            for name in &names {
                let mut on = state.is_filtered(name);
                if ui.checkbox(&mut on, name).changed() {
                    if on {
                        let column = state
                            .dataset
                            .as_ref()
                            .and_then(|ds| ds.column(name))
                            .cloned();
                        if let Some(column) = column {
                            state.add_filter(&column);
                        }
                    } else {
                        state.remove_filter(name);
                    }
                }
            }
            ui.separator();

            // ---- Per-column filter controls (collapsible) ----
            for (name, control) in &mut state.controls {
                let header = format!("{name}  ({})", control.kind_label());
                egui::CollapsingHeader::new(RichText::new(header).strong())
                    .id_salt(name.as_str())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        control_widget(ui, name, control);
                    });
            }
        });

    // Recompute visible rows after any widget change.
    state.refilter();
}

/// The kind-specific control for one filtered column.
fn control_widget(ui: &mut Ui, name: &str, control: &mut FilterControl) {
    match control {
        FilterControl::Categorical { selected, domain } => {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    *selected = domain.clone();
                }
                if ui.small_button("None").clicked() {
                    selected.clear();
                }
            });
            for val in domain.iter() {
                let mut checked = selected.contains(val);
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    if checked {
                        selected.insert(val.clone());
                    } else {
                        selected.remove(val);
                    }
                }
            }
        }
        FilterControl::Numeric {
            bound_min,
            bound_max,
            lo,
            hi,
            step,
        } => {
            let range = *bound_min..=*bound_max;
            ui.add(egui::Slider::new(lo, range.clone()).step_by(*step).text("min"));
            ui.add(egui::Slider::new(hi, range).step_by(*step).text("max"));
            if *lo > *hi {
                *hi = *lo;
            }
        }
        FilterControl::Temporal {
            use_start,
            start,
            use_end,
            end,
        } => {
            ui.horizontal(|ui: &mut Ui| {
                ui.checkbox(use_start, "from");
                ui.add_enabled(
                    *use_start,
                    DatePickerButton::new(start).id_salt(&format!("{name}_start")),
                );
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.checkbox(use_end, "until");
                ui.add_enabled(
                    *use_end,
                    DatePickerButton::new(end).id_salt(&format!("{name}_end")),
                );
            });
            if !(*use_start && *use_end) {
                ui.small("Both ends are needed for the range to apply.");
            }
        }
        FilterControl::Text { pattern } => {
            ui.add(egui::TextEdit::singleline(pattern).hint_text("substring or regex"));
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let loaded = state.dataset.is_some();
            if ui
                .add_enabled(loaded, egui::Button::new("Export PDF…"))
                .clicked()
            {
                export_pdf_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(loaded, egui::Button::new("Export spreadsheet…"))
                .clicked()
            {
                export_sheet_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} rows loaded, {} visible",
                ds.row_count(),
                state.visible_indices.len()
            ));
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open registry export")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.loading = true;
        match loader::load_file(&path) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows with columns {:?}",
                    table.row_count(),
                    table.column_names().collect::<Vec<_>>()
                );
                state.set_dataset(table);
            }
            Err(LoadError::SourceUnavailable { path }) => {
                log::error!("data source missing: {}", path.display());
                state.status_message = Some(format!(
                    "File not found: {}. Check that it still exists and try again.",
                    path.display()
                ));
                state.loading = false;
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
                state.loading = false;
            }
        }
    }
}

fn export_pdf_dialog(state: &mut AppState) {
    let Some(table) = state.filtered_table() else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export PDF")
        .set_file_name("relatorio_filtrado.pdf")
        .add_filter("PDF", &["pdf"])
        .save_file();

    if let Some(path) = file {
        let written = crate::export::pdf::render(&table)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(anyhow::Error::from));
        match written {
            Ok(()) => {
                log::info!("Exported {} rows to {}", table.row_count(), path.display());
                state.status_message = None;
            }
            Err(e) => {
                log::error!("PDF export failed: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn export_sheet_dialog(state: &mut AppState) {
    let Some(table) = state.filtered_table() else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export spreadsheet")
        .set_file_name("relatorio_filtrado.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        let written = crate::export::sheet::render(&table)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(anyhow::Error::from));
        match written {
            Ok(()) => {
                log::info!("Exported {} rows to {}", table.row_count(), path.display());
                state.status_message = None;
            }
            Err(e) => {
                log::error!("Spreadsheet export failed: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
