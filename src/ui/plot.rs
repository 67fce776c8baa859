use std::f64::consts::TAU;

use eframe::egui::{Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};

use survey_lens::data::aggregate::{CrossTab, GroupCount, GroupMean, GroupProfile, HistogramBin};
use survey_lens::data::pipeline::ViewResult;
use survey_lens::Value;

use crate::color::{generate_palette, ColorMap};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel: draw the current view
// ---------------------------------------------------------------------------

/// Render the current pipeline response in the central panel.
pub fn view_panel(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra una encuesta para comenzar  (Archivo → …)");
        });
        return;
    }

    let response = match &state.response {
        Some(Ok(r)) => r,
        Some(Err(e)) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label(RichText::new(format!("Vista no disponible: {e}")).color(Color32::RED));
            });
            return;
        }
        None => {
            ui.label("Seleccione las columnas de la vista.");
            return;
        }
    };

    if response.result.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No hay datos para la selección actual.");
        });
        return;
    }

    let colors = state.color_map.as_ref();
    match &response.result {
        ViewResult::Means(means) => mean_bars(ui, means, colors),
        ViewResult::Counts(counts) => grouped_bars(ui, counts),
        ViewResult::CrossTab(tab) => cross_tab_table(ui, tab),
        ViewResult::Histogram(bins) => histogram_bars(ui, bins),
        ViewResult::ValueCounts(counts) => frequency_bars(ui, counts),
        ViewResult::Profiles(profiles) => radar(ui, profiles, &state.profile_columns(), colors),
    }
}

fn group_color(colors: Option<&ColorMap>, group: &Value) -> Color32 {
    colors.map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(group))
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// One bar per group; groups without any value are left out of the plot.
fn mean_bars(ui: &mut Ui, means: &[GroupMean], colors: Option<&ColorMap>) {
    Plot::new("mean_plot")
        .legend(Legend::default())
        .y_axis_label("Promedio")
        .show(ui, |plot_ui| {
            for (i, gm) in means.iter().enumerate() {
                let Some(mean) = gm.mean else {
                    continue;
                };
                let color = group_color(colors, &gm.group);
                let bar = Bar::new(i as f64, mean).width(0.7).fill(color);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .name(format!("{} (n={})", gm.group, gm.count))
                        .color(color),
                );
            }
        });
}

/// Bars side by side within each group, one series per category.
fn grouped_bars(ui: &mut Ui, counts: &[GroupCount]) {
    let mut groups: Vec<&Value> = Vec::new();
    let mut categories: Vec<&Value> = Vec::new();
    for c in counts {
        if !groups.contains(&&c.group) {
            groups.push(&c.group);
        }
        if !categories.contains(&&c.category) {
            categories.push(&c.category);
        }
    }
    let palette = generate_palette(categories.len());
    let width = 0.8 / categories.len().max(1) as f64;

    Plot::new("count_plot")
        .legend(Legend::default())
        .y_axis_label("Conteo")
        .show(ui, |plot_ui| {
            for (ci, category) in categories.iter().enumerate() {
                let bars: Vec<Bar> = counts
                    .iter()
                    .filter(|c| &&c.category == category)
                    .filter_map(|c| {
                        let gi = groups.iter().position(|g| *g == &c.group)?;
                        let x = gi as f64 - 0.4 + width * (ci as f64 + 0.5);
                        Some(Bar::new(x, c.count as f64).width(width).name(&c.group))
                    })
                    .collect();
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(category.to_string())
                        .color(palette[ci]),
                );
            }
        });
}

fn histogram_bars(ui: &mut Ui, bins: &[HistogramBin]) {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            Bar::new((b.lower + b.upper) / 2.0, b.count as f64)
                .width((b.upper - b.lower).max(f64::EPSILON))
        })
        .collect();
    Plot::new("histogram_plot")
        .y_axis_label("Frecuencia")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
        });
}

fn frequency_bars(ui: &mut Ui, counts: &[(Value, u64)]) {
    let palette = generate_palette(counts.len());
    Plot::new("frequency_plot")
        .legend(Legend::default())
        .y_axis_label("Frecuencia")
        .show(ui, |plot_ui| {
            for (i, (value, n)) in counts.iter().enumerate() {
                let bar = Bar::new(i as f64, *n as f64).width(0.7).fill(palette[i]);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .name(format!("{value} ({n})"))
                        .color(palette[i]),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Cross-tabulation
// ---------------------------------------------------------------------------

fn cross_tab_table(ui: &mut Ui, tab: &CrossTab) {
    ui.heading(format!("{} × {}", tab.row_column, tab.col_column));
    let row_totals = tab.row_totals();
    let col_totals = tab.column_totals();

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.0))
        .columns(Column::auto().at_least(60.0), tab.col_keys.len() + 1)
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong(&tab.row_column);
            });
            for key in &tab.col_keys {
                header.col(|ui| {
                    ui.strong(key.to_string());
                });
            }
            header.col(|ui| {
                ui.strong("Total");
            });
        })
        .body(|mut body| {
            for (r, key) in tab.row_keys.iter().enumerate() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(key.to_string());
                    });
                    for n in &tab.counts[r] {
                        row.col(|ui| {
                            ui.label(n.to_string());
                        });
                    }
                    row.col(|ui| {
                        ui.strong(row_totals[r].to_string());
                    });
                });
            }
            body.row(18.0, |mut row| {
                row.col(|ui| {
                    ui.strong("Total");
                });
                for n in &col_totals {
                    row.col(|ui| {
                        ui.strong(n.to_string());
                    });
                }
                row.col(|ui| {
                    ui.strong(tab.total().to_string());
                });
            });
        });
}

// ---------------------------------------------------------------------------
// Radar
// ---------------------------------------------------------------------------

/// One closed polygon per group. Radii are rescaled to [0.1, 1] over all
/// plotted means so negative z-scores stay drawable.
fn radar(ui: &mut Ui, profiles: &[GroupProfile], axes: &[String], colors: Option<&ColorMap>) {
    let n = axes.len();
    let defined = profiles.iter().flat_map(|p| p.means.iter().flatten());
    let (min, max) = defined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
        (lo.min(m), hi.max(m))
    });
    let span = if (max - min).abs() < f64::EPSILON { 1.0 } else { max - min };
    let radius = |m: f64| 0.1 + 0.9 * (m - min) / span;
    let angle = |k: usize| TAU * k as f64 / n.max(1) as f64;

    Plot::new("radar_plot")
        .legend(Legend::default())
        .data_aspect(1.0)
        .show(ui, |plot_ui| {
            for (k, axis) in axes.iter().enumerate() {
                let (s, c) = angle(k).sin_cos();
                plot_ui.line(
                    Line::new(PlotPoints::from(vec![[0.0, 0.0], [c * 1.05, s * 1.05]]))
                        .name(axis)
                        .color(Color32::DARK_GRAY),
                );
            }
            for profile in profiles {
                // groups missing an axis value are drawn through the centre
                let mut points: Vec<[f64; 2]> = profile
                    .means
                    .iter()
                    .enumerate()
                    .map(|(k, m)| {
                        let r = m.map_or(0.0, |v| radius(v));
                        let (s, c) = angle(k).sin_cos();
                        [r * c, r * s]
                    })
                    .collect();
                if let Some(first) = points.first().copied() {
                    points.push(first);
                }
                plot_ui.line(
                    Line::new(PlotPoints::from(points))
                        .name(profile.group.to_string())
                        .color(group_color(colors, &profile.group))
                        .width(2.0),
                );
            }
        });
}
