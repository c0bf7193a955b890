// advisory-report-service/src/charts/risk_radar.rs

use std::f64::consts::PI;

use crate::models::{ProjectionYearRecord, Scenario};

use super::{ChartStyle, Palette, SvgCanvas};

/// Radar chart over the four fixed risk axes, scored from the scenario's
/// assessed risk profile. Reference rings sit at a third, two thirds and
/// the full radius.
pub(super) fn render(
    scenario: &Scenario,
    _years: &[ProjectionYearRecord],
    style: &ChartStyle,
    palette: &Palette,
) -> String {
    let profile = &scenario.risk_profile;
    render_scores(
        [
            profile.shortfall.resolve(),
            profile.longevity.resolve(),
            profile.inflation.resolve(),
            profile.sequence.resolve(),
        ],
        style,
        palette,
    )
}

/// Axis order is fixed: shortfall top, longevity right, inflation bottom,
/// sequence left.
pub(super) fn render_scores(
    scores: [f64; 4],
    style: &ChartStyle,
    palette: &Palette,
) -> String {
    const AXES: [&str; 4] = ["Shortfall", "Longevity", "Inflation", "Sequence"];

    let mut svg = SvgCanvas::new(style.width, style.height, palette.background);
    svg.title(style.width, "Risk Analysis", palette.text);

    let (w, h) = (style.width as f64, style.height as f64);
    let (cx, cy) = (w / 2.0, h * 0.55);
    let radius = (h * 0.33).min(w * 0.3);

    // Reference rings at 33/66/100% radius.
    for frac in [0.33, 0.66, 1.0] {
        svg.circle(cx, cy, radius * frac, "none", palette.grid, 0.8);
    }

    let direction = |i: usize| {
        let angle = -PI / 2.0 + i as f64 * PI / 2.0;
        (angle.cos(), angle.sin())
    };

    // Axis spokes and labels.
    for (i, label) in AXES.iter().enumerate() {
        let (dx, dy) = direction(i);
        svg.line(
            cx,
            cy,
            cx + dx * radius,
            cy + dy * radius,
            palette.grid,
            palette.stroke_width,
        );
        let anchor = match i {
            1 => "start",
            3 => "end",
            _ => "middle",
        };
        svg.text_anchored(
            cx + dx * (radius + 16.0),
            cy + dy * (radius + 16.0) + 4.0,
            label,
            11.0,
            palette.text,
            anchor,
        );
    }

    // Score polygon.
    let points: Vec<(f64, f64)> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            let (dx, dy) = direction(i);
            let r = radius * score.clamp(0.0, 1.0);
            (cx + dx * r, cy + dy * r)
        })
        .collect();
    svg.polygon_translucent(
        &points,
        palette.series[0],
        palette.series[0],
        palette.stroke_width + 0.5,
    );
    for (x, y) in &points {
        svg.circle(*x, *y, 3.0, palette.series[0], palette.background, 1.0);
    }

    svg.finish()
}
