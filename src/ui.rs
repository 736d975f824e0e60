use crate::{charts::CURVE_SAMPLES, config::AnalyzerConfig, loader::load_groups, sweep::run_sweep};
use crate::model::{OutlierScan, PriceRecommendation, ProductChart};
use crate::sweep::SweepReport;
use egui::{Color32, Context, FontFamily, FontId, Margin, RichText, Stroke, Vec2, Visuals};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Legend, Line, LineStyle, Plot, Points, VLine};
use tracing::{info, warn};

const GOLD: Color32 = Color32::from_rgb(255, 210, 100);
const MUTED: Color32 = Color32::from_rgb(200, 180, 140);

pub fn set_custom_style(ctx: &Context) {
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(20, 18, 14);
    visuals.window_fill = Color32::from_rgb(28, 25, 20);
    visuals.extreme_bg_color = Color32::from_rgb(40, 35, 28);
    visuals.faint_bg_color = Color32::from_rgb(33, 29, 23);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 40, 32);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(80, 70, 50));
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(70, 60, 42);
    visuals.widgets.hovered.bg_stroke = Stroke::new(2.0, Color32::from_rgb(200, 170, 90));
    visuals.widgets.active.bg_fill = Color32::from_rgb(90, 75, 50);
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, GOLD);

    visuals.selection.bg_fill = Color32::from_rgb(100, 85, 55);
    visuals.selection.stroke = Stroke::new(1.0, GOLD);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(12.0, 8.0);

    style.text_styles.insert(egui::TextStyle::Body, FontId::new(15.0, FontFamily::Proportional));
    style.text_styles.insert(egui::TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional));
    style.text_styles.insert(egui::TextStyle::Button, FontId::new(15.0, FontFamily::Proportional));
    style.text_styles.insert(egui::TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace));

    ctx.set_style(style);
}

/// Rows matching the delta filter and a case-insensitive part search.
pub fn filter_rows<'a>(
    rows: &'a [PriceRecommendation],
    delta: Option<f64>,
    search: &str,
) -> Vec<&'a PriceRecommendation> {
    let needle = search.trim().to_lowercase();
    rows.iter()
        .filter(|r| delta.map_or(true, |d| r.delta == d))
        .filter(|r| needle.is_empty() || r.product_id.to_lowercase().contains(&needle))
        .collect()
}

fn format_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

pub struct PriceApp {
    config: AnalyzerConfig,
    report: Option<SweepReport>,
    status: String,
    search: String,
    delta_filter: Option<f64>,
    selected_product: Option<String>,
}

impl PriceApp {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            report: None,
            status: "Not run yet".into(),
            search: String::new(),
            delta_filter: None,
            selected_product: None,
        }
    }

    fn run_sweep(&mut self) {
        let groups = match load_groups(&self.config.input) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "viewer could not load input");
                self.status = format!("Load failed: {}", e);
                return;
            }
        };

        let report = run_sweep(&groups, &self.config.pricing);
        self.status = format!(
            "{} rows, {} products",
            report.recommendations.len(),
            report.charts.len()
        );
        info!(status = %self.status, "viewer sweep finished");

        let still_there = self
            .selected_product
            .as_ref()
            .is_some_and(|id| report.charts.iter().any(|c| &c.product_id == id));
        if !still_there {
            self.selected_product = report.charts.first().map(|c| c.product_id.clone());
        }
        self.report = Some(report);
    }

    fn selected_chart(&self) -> Option<&ProductChart> {
        let id = self.selected_product.as_ref()?;
        self.report.as_ref()?.charts.iter().find(|c| &c.product_id == id)
    }

    fn parameters_panel(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        let p = &mut self.config.pricing;

        ui.label(RichText::new("Parameters").strong());
        egui::Grid::new("params").num_columns(2).show(ui, |ui| {
            ui.label("Competitor price");
            changed |= ui.add(egui::DragValue::new(&mut p.competitor_price).speed(50.0)).changed();
            ui.end_row();

            ui.label("Unit cost");
            changed |= ui.add(egui::DragValue::new(&mut p.unit_cost).speed(50.0)).changed();
            ui.end_row();

            ui.label("Target price");
            changed |= ui.add(egui::DragValue::new(&mut p.target_price).speed(50.0)).changed();
            ui.end_row();

            ui.label("Expected demand");
            changed |= ui
                .add(egui::DragValue::new(&mut p.expected_demand).speed(0.5).range(0.0..=1.0e6))
                .changed();
            ui.end_row();

            ui.label("Min margin");
            changed |= ui.add(egui::Slider::new(&mut p.min_margin, 0.0..=0.5)).changed();
            ui.end_row();

            ui.label("Max deviation");
            changed |= ui
                .add(egui::Slider::new(&mut p.max_competitor_deviation, 0.0..=0.5))
                .changed();
            ui.end_row();

            ui.label("Outlier penalty");
            changed |= ui.add(egui::Slider::new(&mut p.outlier_penalty, 0.0..=0.9)).changed();
            ui.end_row();
        });
        changed
    }

    fn results_table(&mut self, ui: &mut egui::Ui) {
        let Some(report) = &self.report else { return };
        let rows = filter_rows(&report.recommendations, self.delta_filter, &self.search);
        let mut clicked: Option<String> = None;

        TableBuilder::new(ui)
            .striped(true)
            .vscroll(true)
            .max_scroll_height(320.0)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(60.0)) // Delta
            .column(Column::remainder().at_least(140.0).clip(true)) // Part
            .column(Column::exact(110.0)) // Historical optimum
            .column(Column::exact(110.0)) // Adjusted
            .column(Column::exact(110.0)) // Demand target
            .column(Column::exact(90.0)) // Predicted qty
            .column(Column::exact(90.0)) // Elasticity
            .column(Column::exact(50.0)) // Days
            .column(Column::exact(200.0).clip(true)) // Outliers
            .header(28.0, |mut header| {
                for title in [
                    "Δ", "Part", "Hist. opt", "Adjusted", "Demand", "Pred. qty", "Elasticity", "Days", "Outliers",
                ] {
                    header.col(|ui| {
                        ui.label(RichText::new(title).color(MUTED).strong());
                    });
                }
            })
            .body(|body| {
                body.rows(26.0, rows.len(), |mut row| {
                    let r = rows[row.index()];
                    let is_selected = self.selected_product.as_deref() == Some(r.product_id.as_str());

                    row.col(|ui| {
                        ui.label(format!("{:.0}%", r.delta * 100.0));
                    });
                    row.col(|ui| {
                        let text = if is_selected {
                            RichText::new(&r.product_id).color(GOLD).strong()
                        } else {
                            RichText::new(&r.product_id)
                        };
                        if ui.selectable_label(is_selected, text).clicked() {
                            clicked = Some(r.product_id.clone());
                        }
                    });
                    row.col(|ui| {
                        ui.label(format_price(r.historical_optimal_price));
                    });
                    row.col(|ui| {
                        ui.label(
                            RichText::new(format_price(Some(r.competitor_adjusted_price)))
                                .color(Color32::from_rgb(150, 255, 150)),
                        );
                    });
                    row.col(|ui| {
                        ui.label(format_price(r.demand_target_price));
                    });
                    row.col(|ui| {
                        ui.label(format_price(r.predicted_quantity));
                    });
                    row.col(|ui| {
                        ui.label(format_price(r.elasticity));
                    });
                    row.col(|ui| {
                        ui.label(r.days_analyzed.to_string());
                    });
                    row.col(|ui| {
                        let color = match &r.outliers {
                            OutlierScan::None => Color32::LIGHT_GRAY,
                            OutlierScan::Found(_) => Color32::from_rgb(255, 170, 100),
                            OutlierScan::Unknown(_) => Color32::from_rgb(255, 100, 100),
                        };
                        let label = ui.label(RichText::new(r.outliers.render()).color(color));
                        if let OutlierScan::Unknown(reason) = &r.outliers {
                            label.on_hover_text(reason);
                        }
                    });
                });
            });

        if clicked.is_some() {
            self.selected_product = clicked;
        }
    }

    fn chart(&self, ui: &mut egui::Ui) {
        let Some(chart) = self.selected_chart() else {
            ui.label(RichText::new("Select a part to see its chart").color(MUTED));
            return;
        };

        ui.label(
            RichText::new(format!("Price analysis: part {}", chart.product_id))
                .color(GOLD)
                .strong(),
        );

        let scatter: Vec<[f64; 2]> = chart.series.iter().map(|s| [s.price, s.quantity as f64]).collect();
        let curve = chart.fitted_curve(CURVE_SAMPLES);

        Plot::new("price_chart")
            .legend(Legend::default())
            .x_axis_label("Price")
            .y_axis_label("Quantity sold")
            .show(ui, |plot_ui| {
                plot_ui.points(
                    Points::new("Historical", scatter)
                        .radius(4.0)
                        .color(Color32::from_rgb(120, 170, 255)),
                );
                if !curve.is_empty() {
                    plot_ui.line(
                        Line::new("Elasticity model", curve)
                            .color(Color32::from_rgb(255, 90, 90))
                            .style(LineStyle::dashed_loose()),
                    );
                }
                if let Some(p) = chart.historical_optimal_price {
                    plot_ui.vline(
                        VLine::new("Historical optimum", p)
                            .color(Color32::from_rgb(80, 220, 120))
                            .style(LineStyle::dotted_dense()),
                    );
                }
                if let Some(p) = chart.demand_target_price {
                    plot_ui.vline(
                        VLine::new("Demand target", p)
                            .color(Color32::from_rgb(220, 90, 220))
                            .style(LineStyle::dashed_dense()),
                    );
                }
                for &(delta, price) in &chart.adjusted_prices {
                    plot_ui.vline(
                        VLine::new(format!("Δ={:.0}%", delta * 100.0), price)
                            .color(Color32::from_rgba_unmultiplied(255, 210, 100, 90)),
                    );
                }
            });
    }
}

impl eframe::App for PriceApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading(RichText::new("Price Recommendation Analyzer").color(GOLD).strong());
            });
            ui.separator();

            ui.horizontal(|ui| {
                if ui
                    .add_sized(
                        Vec2::new(110.0, 32.0),
                        egui::Button::new(RichText::new("▶ Run sweep").color(GOLD).strong()),
                    )
                    .clicked()
                {
                    self.run_sweep();
                }

                ui.separator();
                ui.label(RichText::new("Δ:").color(MUTED));
                let selected = match self.delta_filter {
                    Some(d) => format!("{:.0}%", d * 100.0),
                    None => "All".to_string(),
                };
                egui::ComboBox::from_id_salt("delta_filter")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.delta_filter, None, "All");
                        for &d in &self.config.pricing.deltas {
                            ui.selectable_value(&mut self.delta_filter, Some(d), format!("{:.0}%", d * 100.0));
                        }
                    });

                ui.separator();
                ui.add(
                    egui::TextEdit::singleline(&mut self.search)
                        .hint_text("Search parts...")
                        .desired_width(200.0),
                );

                ui.separator();
                ui.label(RichText::new(&self.status).color(MUTED).italics());
            });
            ui.add_space(2.0);
        });

        egui::SidePanel::right("settings")
            .min_width(260.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                if self.parameters_panel(ui) && self.report.is_some() {
                    self.run_sweep();
                }

                ui.add_space(10.0);
                ui.separator();
                ui.label(RichText::new("Parts").strong());

                let ids: Vec<String> = self
                    .report
                    .as_ref()
                    .map(|r| r.charts.iter().map(|c| c.product_id.clone()).collect())
                    .unwrap_or_default();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for id in ids {
                        let is_selected = self.selected_product.as_deref() == Some(id.as_str());
                        if ui.selectable_label(is_selected, &id).clicked() {
                            self.selected_product = Some(id);
                        }
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.report.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new("Click 'Run sweep' to analyse the configured input")
                            .size(20.0)
                            .color(MUTED),
                    );
                });
                return;
            }

            if self.report.as_ref().is_some_and(|r| r.is_empty()) {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No results. Check the input data.").size(20.0).color(MUTED));
                });
                return;
            }

            self.results_table(ui);
            ui.add_space(10.0);
            ui.separator();
            self.chart(ui);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(delta: f64, id: &str) -> PriceRecommendation {
        PriceRecommendation {
            delta,
            product_id: id.to_string(),
            historical_optimal_price: None,
            competitor_adjusted_price: 28500.0,
            demand_target_price: None,
            predicted_quantity: None,
            elasticity: None,
            intercept: None,
            days_analyzed: 3,
            outliers: OutlierScan::None,
        }
    }

    #[test]
    fn test_filter_rows() {
        let rows = vec![row(0.05, "AX-1"), row(0.05, "B2"), row(0.06, "ax-9")];
        assert_eq!(filter_rows(&rows, None, "").len(), 3);
        assert_eq!(filter_rows(&rows, Some(0.05), "").len(), 2);
        let hits = filter_rows(&rows, None, " ax ");
        assert_eq!(hits.len(), 2);
        assert_eq!(filter_rows(&rows, Some(0.06), "ax")[0].product_id, "ax-9");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(28000.456)), "28000.46");
        assert_eq!(format_price(None), "-");
    }
}
