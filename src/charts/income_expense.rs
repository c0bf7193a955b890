// advisory-report-service/src/charts/income_expense.rs

use crate::models::ProjectionYearRecord;

use super::{draw_frame, draw_legend, draw_year_labels, ChartStyle, Palette, SvgCanvas};

/// Grouped bar chart, two bars per projection year.
pub(super) fn render(
    years: &[ProjectionYearRecord],
    style: &ChartStyle,
    palette: &Palette,
) -> String {
    let mut svg = SvgCanvas::new(style.width, style.height, palette.background);

    let max_value = years
        .iter()
        .flat_map(|y| [y.income, y.expenses])
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let (left, top, plot_w, plot_h) =
        draw_frame(&mut svg, style, palette, "Income vs Expenses", max_value);

    if !years.is_empty() {
        let group_w = plot_w / years.len() as f64;
        let bar_w = (group_w * 0.35).min(24.0);

        for (i, record) in years.iter().enumerate() {
            let center = left + group_w * (i as f64 + 0.5);
            for (offset, value, color) in [
                (-bar_w, record.income, palette.series[1]),
                (0.0, record.expenses, palette.series[3]),
            ] {
                let bar_h = plot_h * (value.max(0.0) / max_value);
                svg.rect(center + offset, top + plot_h - bar_h, bar_w, bar_h, color);
            }
        }
    }

    draw_year_labels(&mut svg, years, palette, left, top, plot_w, plot_h);
    draw_legend(
        &mut svg,
        &[
            ("Income", palette.series[1]),
            ("Expenses", palette.series[3]),
        ],
        palette,
        style,
    );

    svg.finish()
}
