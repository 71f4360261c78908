use eframe::egui::{self, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Data table (central panel)
// ---------------------------------------------------------------------------

/// Render the central data table: header row plus the currently visible rows.
pub fn data_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a registry export to view it  (File → Open…)");
        });
        return;
    };

    let row_height = egui::TextStyle::Body.resolve(ui.style()).size + 6.0;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(
            TableColumn::auto().at_least(80.0).clip(true),
            dataset.columns().len(),
        )
        .header(row_height + 4.0, |mut header| {
            for name in dataset.column_names() {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(row_height, state.visible_indices.len(), |mut row| {
                let idx = state.visible_indices[row.index()];
                for col in dataset.columns() {
                    row.col(|ui: &mut Ui| {
                        ui.label(col.values[idx].to_string());
                    });
                }
            });
        });
}
