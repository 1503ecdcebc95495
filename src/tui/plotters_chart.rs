//! Plotters-powered profit bar chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct ProfitBarsChart<'a> {
    /// `(slot, profit)` per service, in table order.
    pub bars: &'a [(f64, f64)],
    /// Slot drawn in the highlight color.
    pub selected: Option<usize>,
    /// X bounds (service slots, padded by one on each side).
    pub x_bounds: [f64; 2],
    /// Y bounds (dollars, always containing zero).
    pub y_bounds: [f64; 2],
    pub y_label: &'a str,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for ProfitBarsChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 1)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .disable_x_axis()
                .y_desc(self.y_label)
                .y_labels(5)
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            let profit_color = RGBColor(0, 255, 0);
            let loss_color = RGBColor(255, 0, 0);
            let selected_color = RGBColor(255, 255, 0);

            // Zero line.
            chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], &WHITE))?;

            // One vertical stroke per service, from zero to its profit.
            chart.draw_series(self.bars.iter().enumerate().map(|(idx, &(x, profit))| {
                let color = if Some(idx) == self.selected {
                    selected_color
                } else if profit >= 0.0 {
                    profit_color
                } else {
                    loss_color
                };
                PathElement::new(vec![(x, 0.0), (x, profit)], color)
            }))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
