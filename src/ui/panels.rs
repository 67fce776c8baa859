use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use survey_lens::DatasetKind;

use crate::state::{AppState, ViewChoice};

// ---------------------------------------------------------------------------
// Left side panel – variable selection and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Vista");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No hay datos cargados.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let dataset = dataset.clone();
    let table = dataset.table();
    let categorical = state.classification.categorical.clone();
    let continuous = state.classification.continuous.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Chart selector ----
            for choice in ViewChoice::ALL {
                if ui
                    .selectable_label(state.view == choice, choice.label())
                    .clicked()
                {
                    state.view = choice;
                    state.refresh();
                }
            }
            ui.separator();

            // ---- Column selectors ----
            if let Some(col) = column_combo(ui, "Agrupar por", "group_by", &state.group_column, &categorical) {
                state.set_group_column(col);
            }
            if let Some(col) = column_combo(ui, "Variable numérica", "value", &state.value_column, &continuous) {
                state.value_column = Some(col);
                state.refresh();
            }
            if let Some(col) = column_combo(ui, "Variable categórica", "category", &state.category_column, &categorical) {
                state.category_column = Some(col);
                state.refresh();
            }
            if state.view == ViewChoice::Histogram {
                let mut bins = state.histogram_bins;
                if ui
                    .add(egui::Slider::new(&mut bins, 1..=50).text("Intervalos"))
                    .changed()
                {
                    state.histogram_bins = bins;
                    state.refresh();
                }
            }
            ui.separator();

            // ---- Per-column filter widgets (collapsible) ----
            ui.strong("Filtros");
            for col in &categorical {
                let Some(all_values) = table.unique_values(col) else {
                    continue;
                };

                let n_total = all_values.len();
                let header_text = match state.filters.allowed(col) {
                    Some(selected) => format!("{col}  ({}/{n_total})", selected.len()),
                    None => format!("{col}  (todos)"),
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(state.group_column.as_ref() == Some(col))
                    .show(ui, |ui: &mut Ui| {
                        // Select all / none buttons
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("Todos").clicked() {
                                state.select_all(col);
                            }
                            if ui.small_button("Ninguno").clicked() {
                                state.select_none(col);
                            }
                            if ui.small_button("Quitar filtro").clicked() {
                                state.clear_filter(col);
                            }
                        });

                        for val in &all_values {
                            let mut checked = state
                                .filters
                                .allowed(col)
                                .map_or(true, |selected| selected.contains(val));

                            let mut text = RichText::new(val.to_string());
                            if state.group_column.as_ref() == Some(col) {
                                if let Some(cm) = &state.color_map {
                                    text = text.color(cm.color_for(val));
                                }
                            }

                            if ui.checkbox(&mut checked, text).changed() {
                                if state.filters.allowed(col).is_none() {
                                    // First edit of an unconstrained column:
                                    // start from everything selected.
                                    state.select_all(col);
                                }
                                state.toggle_filter_value(col, val);
                            }
                        }
                    });
            }
        });
}

/// A labelled combo box over `options`; returns the newly picked column.
fn column_combo(
    ui: &mut Ui,
    label: &str,
    id: &str,
    current: &Option<String>,
    options: &[String],
) -> Option<String> {
    let mut picked = None;
    ui.strong(label);
    let current = current.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt(id)
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for col in options {
                if ui.selectable_label(current == *col, col).clicked() {
                    picked = Some(col.clone());
                }
            }
        });
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Archivo", |ui: &mut Ui| {
            for kind in DatasetKind::ALL {
                if ui.button(kind.label()).clicked() {
                    let path = state.config.datasets.path_for(kind).to_path_buf();
                    state.open_path(&path, kind.label());
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Exportar resultado…").clicked() {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let visible = state
                .rows_matched()
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            ui.label(format!(
                "{}: {} filas, {} visibles",
                ds.label(),
                ds.table().len(),
                visible
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir encuesta")
        .add_filter("Formatos soportados", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        state.open_path(&path, &label);
    }
}

/// Save the current view's result as JSON.
pub fn export_dialog(state: &mut AppState) {
    let Some(Ok(response)) = &state.response else {
        state.status_message = Some("Nada que exportar.".to_string());
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Exportar resultado")
        .add_filter("JSON", &["json"])
        .set_file_name("resultado.json")
        .save_file()
    else {
        return;
    };

    let written = serde_json::to_string_pretty(response)
        .map_err(anyhow::Error::from)
        .and_then(|text| std::fs::write(&path, text).map_err(anyhow::Error::from));
    match written {
        Ok(()) => log::info!("Exported view to {}", path.display()),
        Err(e) => {
            log::error!("Failed to export: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
