//! Plotters-powered price history chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call, so `render()`
/// only draws. X values are month indices (see `plot::month_index`).
pub struct TrendChart<'a> {
    /// Observed prices of the focused region.
    pub history: &'a [(f64, f64)],
    /// National monthly average for the same fuel type.
    pub national: &'a [(f64, f64)],
    /// Optional estimate for the requested month, drawn as a highlighted dot.
    pub estimate: Option<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Formatting of tick labels.
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl Widget for TrendChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart this small.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let national_color = RGBColor(255, 255, 0); // yellow
            let history_color = RGBColor(0, 255, 255); // cyan
            let estimate_color = RGBColor(0, 255, 0); // green

            chart.draw_series(LineSeries::new(self.national.iter().copied(), &national_color))?;
            chart.draw_series(LineSeries::new(self.history.iter().copied(), &history_color))?;
            chart.draw_series(self.history.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;

            // `Circle` radii come out far too large through the ratatui backend;
            // a `Pixel` is the reliable marker.
            if let Some((x, y)) = self.estimate {
                chart.draw_series(std::iter::once(Pixel::new((x, y), estimate_color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
