use std::f64::consts::TAU;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Polygon, Text};
use epidash::data::aggregate::{AgePyramid, AggregateTable, Choropleth, Granularity, Kpis};
use epidash::data::geo::BoundarySet;

use crate::color::{self, ColorMap};

/// Thousands separated by dots, as in `12.345`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

fn no_data(ui: &mut Ui) {
    ui.label(RichText::new("No data for the selected period and filters.").color(Color32::YELLOW));
}

/// Label of the category drawn at integer position `value`, if any.
fn category_label(labels: &[String], value: f64) -> String {
    let index = value.round();
    if (value - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

pub fn kpi_row(ui: &mut Ui, kpis: &Kpis) {
    ui.columns(3, |cols: &mut [Ui]| {
        metric(&mut cols[0], "Total visits", format_count(kpis.total_visits));
        metric(&mut cols[1], "Unique patients", format_count(kpis.unique_patients));
        metric(&mut cols[2], "Mean patient age", format!("{} years", kpis.mean_age));
    });
}

fn metric(ui: &mut Ui, title: &str, value: String) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(RichText::new(title).weak());
        ui.label(RichText::new(value).size(28.0).strong());
    });
}

// ---------------------------------------------------------------------------
// Sex distribution pie
// ---------------------------------------------------------------------------

/// Pie of visits per sex; nothing is drawn for an empty table.
pub fn sex_pie(ui: &mut Ui, sexes: &AggregateTable<String>, colors: &ColorMap) {
    let total = sexes.total();
    if total == 0 {
        return;
    }

    Plot::new("sex_pie")
        .height(200.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            let mut angle = 0.0_f64;
            for (label, count) in sexes.iter() {
                let share = *count as f64 / total as f64;
                let sweep = share * TAU;
                let steps = ((sweep / TAU) * 96.0).ceil().max(2.0) as usize;

                let mut points = vec![[0.0, 0.0]];
                points.extend((0..=steps).map(|s| {
                    let a = angle + sweep * s as f64 / steps as f64;
                    [a.cos(), a.sin()]
                }));

                let color = colors.color_for(label);
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(points))
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, Color32::WHITE))
                        .name(label),
                );

                let mid = angle + sweep / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(0.6 * mid.cos(), 0.6 * mid.sin()),
                    RichText::new(format!("{label}\n{:.1}%", share * 100.0)).color(Color32::WHITE),
                ));
                angle += sweep;
            }
        });
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Bar chart of a ranking in table order. Horizontal charts place the first
/// entry at the bottom.
pub fn ranking_bars(
    ui: &mut Ui,
    id: &str,
    title: &str,
    table: &AggregateTable<String>,
    horizontal: bool,
) {
    ui.strong(title);
    if table.is_empty() {
        no_data(ui);
        return;
    }

    let labels: Vec<String> = table.iter().map(|(label, _)| label.clone()).collect();
    let bars: Vec<Bar> = table
        .iter()
        .enumerate()
        .map(|(i, (label, count))| Bar::new(i as f64, *count as f64).name(label).width(0.7))
        .collect();

    let mut chart = BarChart::new(bars).color(color::BAR).name("Visits");
    if horizontal {
        chart = chart.horizontal();
    }

    let plot = Plot::new(id)
        .height(380.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false);
    let plot = if horizontal {
        plot.y_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
            .x_axis_label("Visits")
            .include_x(0.0)
    } else {
        plot.x_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
            .y_axis_label("Visits")
            .include_y(0.0)
    };
    plot.show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

// ---------------------------------------------------------------------------
// Age pyramid
// ---------------------------------------------------------------------------

pub fn age_pyramid(ui: &mut Ui, pyramid: &AgePyramid) {
    if pyramid.is_empty() {
        ui.label(RichText::new("No data available for the age pyramid.").color(Color32::YELLOW));
        return;
    }

    let labels: Vec<String> = pyramid.rows.iter().map(|r| r.band.to_string()).collect();
    let male: Vec<Bar> = pyramid
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| Bar::new(i as f64, r.male_bar()).name(r.band.label()).width(0.9))
        .collect();
    let female: Vec<Bar> = pyramid
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| Bar::new(i as f64, r.female_bar()).name(r.band.label()).width(0.9))
        .collect();

    let axis = pyramid.axis_max;
    Plot::new("age_pyramid")
        .height(360.0)
        .legend(Legend::default())
        .include_x(-axis)
        .include_x(axis)
        .x_axis_label("Visits")
        .y_axis_label("Age band")
        .x_axis_formatter(|mark, _range| format_count(mark.value.abs().round() as usize))
        .y_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(male).horizontal().color(color::MALE).name("Male"));
            plot_ui.bar_chart(
                BarChart::new(female)
                    .horizontal()
                    .color(color::FEMALE)
                    .name("Female"),
            );
        });
}

// ---------------------------------------------------------------------------
// Choropleth
// ---------------------------------------------------------------------------

pub fn choropleth_map(ui: &mut Ui, boundaries: &BoundarySet, map: &Choropleth) {
    let max = map.max_count();
    ui.label(format!(
        "{} visits matched to {} regions (max {} per region)",
        format_count(map.matched_total()),
        map.regions.iter().filter(|r| r.count > 0).count(),
        format_count(max)
    ));

    let mut plot = Plot::new("choropleth")
        .height(600.0)
        .data_aspect(1.0)
        .show_grid(false)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude");
    if let Some((lo, hi)) = boundaries.bounds() {
        plot = plot
            .include_x(lo[0])
            .include_x(hi[0])
            .include_y(lo[1])
            .include_y(hi[1]);
    }

    plot.show(ui, |plot_ui| {
        for (region, counted) in boundaries.regions.iter().zip(&map.regions) {
            let fill = color::heat_color(counted.count, max);
            for ring in &region.rings {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(ring.clone()))
                        .fill_color(fill)
                        .stroke(Stroke::new(0.5, Color32::DARK_GRAY))
                        .name(format!("{}: {}", counted.name, format_count(counted.count))),
                );
            }
        }
    });

    if !map.unmatched.is_empty() {
        egui::CollapsingHeader::new(format!(
            "{} municipalities without a boundary ({} visits)",
            map.unmatched.len(),
            format_count(map.unmatched.total())
        ))
        .id_salt("unmatched_municipalities")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("unmatched_grid").striped(true).show(ui, |ui: &mut Ui| {
                for (name, count) in map.unmatched.iter() {
                    ui.label(name);
                    ui.label(format_count(*count));
                    ui.end_row();
                }
            });
        });
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn bucket_label(value: f64, granularity: Granularity) -> String {
    let Some(date) = NaiveDate::from_num_days_from_ce_opt(value.round() as i32) else {
        return String::new();
    };
    match granularity {
        Granularity::Month => date.format("%m/%Y").to_string(),
        Granularity::Day | Granularity::Week => date.format("%d/%m/%Y").to_string(),
    }
}

pub fn timeline(ui: &mut Ui, series: &AggregateTable<NaiveDate>, granularity: Granularity) {
    ui.strong(format!("Visits per {}", granularity.label().to_lowercase()));
    if series.is_empty() {
        no_data(ui);
        return;
    }

    let points: PlotPoints = series
        .iter()
        .map(|(bucket, count)| [day_number(*bucket), *count as f64])
        .collect();

    Plot::new("timeline")
        .height(360.0)
        .include_y(0.0)
        .x_axis_label("Period")
        .y_axis_label("Visits")
        .x_axis_formatter(move |mark, _range| bucket_label(mark.value, granularity))
        .label_formatter(move |_name, point| {
            format!("{}\n{} visits", bucket_label(point.x, granularity), point.y.round())
        })
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).color(color::BAR).width(1.5).name("Visits"));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_use_dot_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1.000");
        assert_eq!(format_count(1234567), "1.234.567");
    }

    #[test]
    fn category_labels_only_on_integer_marks() {
        let labels = vec!["A".to_string(), "B".to_string()];
        assert_eq!(category_label(&labels, 1.0), "B");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 2.0), "");
    }

    #[test]
    fn bucket_labels_round_trip_day_numbers() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(bucket_label(day_number(date), Granularity::Day), "01/03/2024");
        assert_eq!(bucket_label(day_number(date), Granularity::Month), "03/2024");
    }
}
