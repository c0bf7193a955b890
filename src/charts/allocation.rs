// advisory-report-service/src/charts/allocation.rs

use std::f64::consts::PI;

use crate::models::AssetAllocation;

use super::{ChartStyle, Palette, SvgCanvas};

/// Doughnut chart over the named allocation categories. Percentages are
/// expected to sum to at most 100; any shortfall is folded into the cash
/// slice so the ring always closes.
pub(super) fn render(
    allocation: &AssetAllocation,
    style: &ChartStyle,
    palette: &Palette,
) -> String {
    let mut svg = SvgCanvas::new(style.width, style.height, palette.background);
    svg.title(style.width, "Asset Allocation", palette.text);

    let equities = allocation.equities.max(0.0);
    let bonds = allocation.bonds.max(0.0);
    let mut cash = allocation.cash.max(0.0);
    let alternatives = allocation.alternatives.max(0.0);

    let specified = equities + bonds + cash + alternatives;
    if specified < 100.0 {
        cash += 100.0 - specified;
    }
    let total = (equities + bonds + cash + alternatives).max(1.0);

    let slices = [
        ("Equities", equities, palette.series[0]),
        ("Bonds", bonds, palette.series[1]),
        ("Cash", cash, palette.series[2]),
        ("Alternatives", alternatives, palette.series[3]),
    ];

    let (w, h) = (style.width as f64, style.height as f64);
    let (cx, cy) = (w * 0.38, h * 0.54);
    let radius = (h * 0.32).min(w * 0.28);

    let mut angle = -PI / 2.0;
    for (_, value, color) in slices.iter().filter(|(_, v, _)| *v > 0.0) {
        let sweep = 2.0 * PI * value / total;
        if sweep >= 2.0 * PI - 1e-6 {
            // A single 100% slice is a full ring; arcs degenerate there.
            svg.circle(cx, cy, radius, color, palette.background, 1.0);
        } else {
            let (x1, y1) = point_on(cx, cy, radius, angle);
            let (x2, y2) = point_on(cx, cy, radius, angle + sweep);
            let large_arc = i32::from(sweep > PI);
            let d = format!(
                "M {cx:.2} {cy:.2} L {x1:.2} {y1:.2} A {radius:.2} {radius:.2} 0 {large_arc} 1 {x2:.2} {y2:.2} Z"
            );
            svg.path(&d, color, palette.background, 1.0);
        }
        angle += sweep;
    }

    // Punch the doughnut hole.
    svg.circle(cx, cy, radius * 0.55, palette.background, palette.grid, 1.0);

    // Side legend with resolved percentages.
    let mut y = h * 0.34;
    for (label, value, color) in slices {
        svg.rect(w * 0.66, y - 9.0, 10.0, 10.0, color);
        svg.text_anchored(
            w * 0.66 + 16.0,
            y,
            &format!("{label} {value:.0}%"),
            11.0,
            palette.text,
            "start",
        );
        y += 22.0;
    }

    svg.finish()
}

fn point_on(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    (cx + radius * angle.cos(), cy + radius * angle.sin())
}
