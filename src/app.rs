use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::state::{AppState, Tab};
use crate::ui::{charts, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(300.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.view.is_none() {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Open a dataset to start  (File → Open dataset…)");
                });
                return;
            }
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| match self.state.tab {
                    Tab::Summary => summary_tab(ui, &self.state),
                    Tab::Epidemiology => epidemiology_tab(ui, &mut self.state),
                });
        });
    }
}

fn summary_tab(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else {
        return;
    };

    ui.heading("Period and filter summary");
    ui.horizontal(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.set_width(ui.available_width() * 0.7);
            charts::kpi_row(ui, &view.kpis);
        });
        ui.vertical(|ui: &mut Ui| {
            charts::sex_pie(ui, &view.sexes, &state.sex_colors);
        });
    });
    ui.separator();

    ui.heading("Resources and demand");
    ui.columns(2, |cols: &mut [Ui]| {
        charts::ranking_bars(
            &mut cols[0],
            "top_specialties",
            &format!("Top {} specialties", state.options.top_n),
            &view.specialties,
            true,
        );
        charts::ranking_bars(
            &mut cols[1],
            "top_insurers",
            &format!("Top {} insurers", state.options.top_n),
            &view.insurers,
            false,
        );
    });
    ui.separator();

    egui::CollapsingHeader::new(RichText::new("Age pyramid").strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            charts::age_pyramid(ui, &view.pyramid);
        });
}

fn epidemiology_tab(ui: &mut Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Visits by municipality").strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            match (&state.boundaries, state.view.as_ref().and_then(|v| v.map.as_ref())) {
                (Some(boundaries), Some(map)) => charts::choropleth_map(ui, boundaries, map),
                _ => {
                    let reason = state
                        .map_message
                        .as_deref()
                        .unwrap_or("No boundary file loaded");
                    ui.colored_label(egui::Color32::RED, format!("Map unavailable: {reason}"));
                }
            }
        });

    egui::CollapsingHeader::new(RichText::new("Temporal analysis").strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            panels::granularity_selector(ui, state);
            if let Some(view) = &state.view {
                charts::timeline(ui, &view.timeline, state.options.granularity);
            }
        });
}
