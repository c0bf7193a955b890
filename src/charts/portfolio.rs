// advisory-report-service/src/charts/portfolio.rs

use crate::models::ProjectionYearRecord;

use super::{draw_frame, draw_legend, draw_year_labels, ChartStyle, Palette, SvgCanvas};

/// Stacked-area chart of the three portfolio layers over time. Each
/// layer's top edge is the running sum of itself and the layers below,
/// so the outline of the top layer traces the total portfolio value.
pub(super) fn render(
    years: &[ProjectionYearRecord],
    style: &ChartStyle,
    palette: &Palette,
) -> String {
    let mut svg = SvgCanvas::new(style.width, style.height, palette.background);

    let max_total = years
        .iter()
        .map(|y| y.pension_value + y.investment_value + y.cash_value)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let (left, top, plot_w, plot_h) =
        draw_frame(&mut svg, style, palette, "Portfolio Composition", max_total);

    if !years.is_empty() {
        let span = (years.len() - 1).max(1) as f64;
        let x_at = |i: usize| left + plot_w * i as f64 / span;
        let y_at = |v: f64| top + plot_h * (1.0 - v / max_total);

        // Cumulative tops, bottom layer first.
        let layers: [(&str, Box<dyn Fn(&ProjectionYearRecord) -> f64>); 3] = [
            ("Pension", Box::new(|y| y.pension_value)),
            ("Investments", Box::new(|y| y.pension_value + y.investment_value)),
            (
                "Cash",
                Box::new(|y| y.pension_value + y.investment_value + y.cash_value),
            ),
        ];

        let mut lower: Vec<f64> = vec![0.0; years.len()];
        for (layer_idx, (_, cumulative)) in layers.iter().enumerate() {
            let upper: Vec<f64> = years.iter().map(|y| cumulative(y)).collect();

            let mut points = Vec::with_capacity(years.len() * 2);
            for (i, v) in upper.iter().enumerate() {
                points.push((x_at(i), y_at(*v)));
            }
            for (i, v) in lower.iter().enumerate().rev() {
                points.push((x_at(i), y_at(*v)));
            }
            svg.polygon(
                &points,
                palette.series[layer_idx],
                palette.series[layer_idx],
                palette.stroke_width,
            );
            lower = upper;
        }
    }

    draw_year_labels(&mut svg, years, palette, left, top, plot_w, plot_h);
    draw_legend(
        &mut svg,
        &[
            ("Pension", palette.series[0]),
            ("Investments", palette.series[1]),
            ("Cash", palette.series[2]),
        ],
        palette,
        style,
    );

    svg.finish()
}
