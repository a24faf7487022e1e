use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use epidash::data::aggregate::Granularity;

use crate::state::{AppState, Tab};
use crate::ui::charts;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(bounds) = state.date_bounds() else {
        ui.label("No dataset loaded.");
        return;
    };

    // ---- Period ----
    ui.strong("Period");
    let mut start = state.filters.date_range.start;
    let mut end = state.filters.date_range.end;
    egui::Grid::new("period_grid").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Start");
        ui.add(DatePickerButton::new(&mut start).id_salt("start_date"));
        ui.end_row();
        ui.label("End");
        ui.add(DatePickerButton::new(&mut end).id_salt("end_date"));
        ui.end_row();
    });
    if start != state.filters.date_range.start || end != state.filters.date_range.end {
        state.set_date_range(start, end);
    }
    ui.label(
        RichText::new(format!(
            "Data available {} – {}",
            bounds.start.format("%d/%m/%Y"),
            bounds.end.format("%d/%m/%Y")
        ))
        .small()
        .weak(),
    );
    ui.separator();

    // ---- Diagnostic codes ----
    ui.strong(format!(
        "Diagnostic codes (≥ {} visits)",
        charts::format_count(state.config.relevance_threshold)
    ));
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Search");
        ui.text_edit_singleline(&mut state.code_search);
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{} selected", state.filters.codes.len()));
        if ui.small_button("Clear").clicked() {
            state.clear_codes();
        }
    });
    if state.filters.codes.is_empty() {
        ui.label(RichText::new("No selection: all codes shown").small().weak());
    }

    // Collect toggles first; the list borrows `state`.
    let mut toggled: Vec<String> = Vec::new();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for code in state.searched_codes() {
                let mut checked = state.filters.codes.contains(&code.label);
                let text = format!("{}  ({})", code.label, charts::format_count(code.frequency));
                if ui.checkbox(&mut checked, text).changed() {
                    toggled.push(code.label.clone());
                }
            }
        });
    for label in toggled {
        state.toggle_code(&label);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                open_dataset_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open boundaries…").clicked() {
                open_boundary_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Reload").clicked() {
                state.load_configured();
                ui.close_menu();
            }
            if ui.button("Clear cache").clicked() {
                state.clear_cache();
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(view)) = (&state.dataset, &state.view) {
            ui.label(format!(
                "{} visits loaded, {} in view",
                charts::format_count(ds.len()),
                charts::format_count(view.visible)
            ));
        }

        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Summary, "Summary & demographics");
        ui.selectable_value(&mut state.tab, Tab::Epidemiology, "Epidemiology");

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Granularity selector for the temporal chart.
pub fn granularity_selector(ui: &mut Ui, state: &mut AppState) {
    let mut granularity = state.options.granularity;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("View by:");
        for g in Granularity::ALL {
            ui.radio_value(&mut granularity, g, g.label());
        }
    });
    state.set_granularity(granularity);
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open visits dataset")
        .add_filter("Supported files", &["csv", "txt", "zip", "parquet", "pq"])
        .add_filter("Delimited text", &["csv", "txt"])
        .add_filter("Zipped text", &["zip"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_dataset(&path);
        if let Some(ds) = &state.dataset {
            log::info!(
                "Dataset ready: {} visits, {} relevant codes",
                ds.len(),
                state.relevant_codes.len()
            );
        }
    }
}

pub fn open_boundary_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open municipality boundaries")
        .add_filter("GeoJSON", &["json", "geojson"])
        .pick_file();

    if let Some(path) = file {
        state.load_boundaries(&path);
    }
}
