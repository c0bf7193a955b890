// advisory-report-service/src/charts/mod.rs
//
// Self-contained SVG chart synthesis. No graphics stack: each chart is a
// scalable vector markup string built directly, embeddable as a data-URI
// and persistable as raw bytes.

mod allocation;
mod income_expense;
mod portfolio;
mod risk_radar;

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::models::{
    ChartImageResult, ChartKind, ProjectionYearRecord, ReportOptions, Scenario, Theme,
};

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 400;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Style inputs the synthesizer honors, derived from the report options.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub theme: Theme,
    pub high_contrast: bool,
    pub width: u32,
    pub height: u32,
}

impl ChartStyle {
    pub fn from_options(options: &ReportOptions) -> Self {
        Self {
            theme: options.theme,
            high_contrast: options.accessibility.high_contrast,
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
        }
    }

    pub(crate) fn palette(&self) -> Palette {
        if self.high_contrast {
            return Palette {
                background: "#ffffff",
                text: "#000000",
                grid: "#000000",
                series: ["#000000", "#333333", "#666666", "#999999"],
                stroke_width: 2.5,
            };
        }
        match self.theme {
            // A standalone SVG has no media queries to consult; auto
            // resolves to the light palette.
            Theme::Light | Theme::Auto => Palette {
                background: "#ffffff",
                text: "#1f2933",
                grid: "#d2d8de",
                series: ["#2563eb", "#059669", "#d97706", "#dc2626"],
                stroke_width: 1.5,
            },
            Theme::Dark => Palette {
                background: "#111827",
                text: "#e5e7eb",
                grid: "#374151",
                series: ["#60a5fa", "#34d399", "#fbbf24", "#f87171"],
                stroke_width: 1.5,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
    pub series: [&'static str; 4],
    pub stroke_width: f64,
}

pub fn chart_title(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Portfolio => "Portfolio Composition",
        ChartKind::IncomeExpense => "Income vs Expenses",
        ChartKind::AssetAllocation => "Asset Allocation",
        ChartKind::RiskAnalysis => "Risk Analysis",
    }
}

/// Alt text for the embedded image, also read out by screen readers.
pub fn chart_description(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Portfolio => {
            "Stacked area chart of pension, investment and cash values over the projection period"
        }
        ChartKind::IncomeExpense => "Bar chart comparing income and expenses for each year",
        ChartKind::AssetAllocation => {
            "Doughnut chart of the allocation across equities, bonds, cash and alternatives"
        }
        ChartKind::RiskAnalysis => {
            "Radar chart of shortfall, longevity, inflation and sequence risk scores"
        }
    }
}

pub struct ChartSynthesizer;

impl ChartSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Render one chart. An empty projection series produces a valid
    /// empty-axis chart rather than an error, so preview mode can call
    /// with partial data.
    pub fn synthesize(
        &self,
        years: &[ProjectionYearRecord],
        scenario: &Scenario,
        kind: ChartKind,
        style: &ChartStyle,
    ) -> Result<ChartImageResult> {
        if style.width == 0 || style.height == 0 {
            return Err(ReportError::Chart(format!(
                "degenerate chart dimensions {}x{}",
                style.width, style.height
            )));
        }

        let palette = style.palette();
        let svg = match kind {
            ChartKind::Portfolio => portfolio::render(years, style, &palette),
            ChartKind::IncomeExpense => income_expense::render(years, style, &palette),
            ChartKind::AssetAllocation => {
                allocation::render(&scenario.allocation, style, &palette)
            }
            ChartKind::RiskAnalysis => risk_radar::render(scenario, years, style, &palette),
        };

        debug!(kind = kind.as_str(), bytes = svg.len(), "chart synthesized");
        Ok(into_image_result(kind, svg, style))
    }

    /// Render a batch, skipping kinds that fail instead of aborting;
    /// a partial chart set is an acceptable degraded result. Invokes
    /// `on_progress(done, total)` after each kind for sub-progress scaling.
    pub fn synthesize_many(
        &self,
        kinds: &[ChartKind],
        years: &[ProjectionYearRecord],
        scenario: &Scenario,
        style: &ChartStyle,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Vec<ChartImageResult> {
        let mut charts = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.iter().enumerate() {
            match self.synthesize(years, scenario, *kind, style) {
                Ok(chart) => charts.push(chart),
                Err(e) => {
                    warn!(kind = kind.as_str(), error = %e, "skipping failed chart");
                }
            }
            on_progress(i + 1, kinds.len());
        }
        charts
    }

    /// Labeled degraded chart used when preview synthesis fails.
    pub fn placeholder(&self, kind: ChartKind, style: &ChartStyle) -> ChartImageResult {
        let palette = style.palette();
        let (w, h) = (style.width as f64, style.height as f64);
        let mut svg = SvgCanvas::new(style.width, style.height, palette.background);
        svg.rect_outlined(
            8.0,
            8.0,
            w - 16.0,
            h - 16.0,
            "none",
            palette.grid,
            1.0,
            Some("6 4"),
        );
        svg.text_anchored(
            w / 2.0,
            h / 2.0 - 8.0,
            chart_title(kind),
            16.0,
            palette.text,
            "middle",
        );
        svg.text_anchored(
            w / 2.0,
            h / 2.0 + 16.0,
            "Chart unavailable",
            12.0,
            palette.grid,
            "middle",
        );
        into_image_result(kind, svg.finish(), style)
    }
}

impl Default for ChartSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn into_image_result(kind: ChartKind, svg: String, style: &ChartStyle) -> ChartImageResult {
    let raw_bytes = svg.into_bytes();
    let data_uri = format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(&raw_bytes)
    );
    ChartImageResult {
        chart_kind: kind,
        content_type: SVG_CONTENT_TYPE.to_string(),
        raw_bytes,
        data_uri,
        width: style.width,
        height: style.height,
        url: None,
    }
}

/// Minimal append-only SVG builder shared by the chart renderers.
pub(crate) struct SvgCanvas {
    buf: String,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32, background: &str) -> Self {
        let mut buf = String::with_capacity(4096);
        buf.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        ));
        buf.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{background}\"/>"
        ));
        Self { buf }
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) {
        self.buf.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{stroke}\" stroke-width=\"{width:.2}\"/>"
        ));
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        self.buf.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{fill}\"/>"
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rect_outlined(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: &str,
        stroke: &str,
        stroke_width: f64,
        dash: Option<&str>,
    ) {
        let dash_attr = dash
            .map(|d| format!(" stroke-dasharray=\"{d}\""))
            .unwrap_or_default();
        self.buf.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width:.2}\"{dash_attr}/>"
        ));
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, stroke: &str, width: f64) {
        self.buf.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{width:.2}\"/>"
        ));
    }

    pub fn polygon(&mut self, points: &[(f64, f64)], fill: &str, stroke: &str, width: f64) {
        self.buf.push_str(&format!(
            "<polygon points=\"{}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{width:.2}\" fill-opacity=\"0.85\"/>",
            points_attr(points)
        ));
    }

    pub fn polygon_translucent(
        &mut self,
        points: &[(f64, f64)],
        fill: &str,
        stroke: &str,
        width: f64,
    ) {
        self.buf.push_str(&format!(
            "<polygon points=\"{}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{width:.2}\" fill-opacity=\"0.35\"/>",
            points_attr(points)
        ));
    }

    pub fn path(&mut self, d: &str, fill: &str, stroke: &str, width: f64) {
        self.buf.push_str(&format!(
            "<path d=\"{d}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{width:.2}\"/>"
        ));
    }

    pub fn text_anchored(
        &mut self,
        x: f64,
        y: f64,
        content: &str,
        size: f64,
        fill: &str,
        anchor: &str,
    ) {
        self.buf.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"{size:.1}\" fill=\"{fill}\" text-anchor=\"{anchor}\">{}</text>",
            escape_xml(content)
        ));
    }

    pub fn title(&mut self, width: u32, content: &str, fill: &str) {
        self.text_anchored(width as f64 / 2.0, 26.0, content, 16.0, fill, "middle");
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</svg>");
        self.buf
    }
}

fn points_attr(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Compact axis-label form of a monetary amount: 1.2M, 250k, 900.
pub(crate) fn short_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.0}k", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

/// Shared plot frame: title, axes, horizontal gridlines with value labels.
/// Returns the plot region (left, top, width, height).
pub(crate) fn draw_frame(
    svg: &mut SvgCanvas,
    style: &ChartStyle,
    palette: &Palette,
    title: &str,
    y_max: f64,
) -> (f64, f64, f64, f64) {
    let (w, h) = (style.width as f64, style.height as f64);
    let (left, right, top, bottom) = (70.0, 20.0, 48.0, 40.0);
    let plot_w = w - left - right;
    let plot_h = h - top - bottom;

    svg.title(style.width, title, palette.text);

    // Horizontal gridlines at quarters of the y range.
    for step in 0..=4 {
        let frac = step as f64 / 4.0;
        let y = top + plot_h * (1.0 - frac);
        svg.line(left, y, left + plot_w, y, palette.grid, 0.5);
        svg.text_anchored(
            left - 8.0,
            y + 4.0,
            &short_amount(y_max * frac),
            10.0,
            palette.text,
            "end",
        );
    }

    // Axes.
    svg.line(left, top, left, top + plot_h, palette.grid, palette.stroke_width);
    svg.line(
        left,
        top + plot_h,
        left + plot_w,
        top + plot_h,
        palette.grid,
        palette.stroke_width,
    );

    (left, top, plot_w, plot_h)
}

/// X-axis year labels at the first, middle and last positions only.
pub(crate) fn draw_year_labels(
    svg: &mut SvgCanvas,
    years: &[ProjectionYearRecord],
    palette: &Palette,
    left: f64,
    top: f64,
    plot_w: f64,
    plot_h: f64,
) {
    if years.is_empty() {
        return;
    }
    let mut indexes = vec![0];
    if years.len() > 2 {
        indexes.push(years.len() / 2);
    }
    if years.len() > 1 {
        indexes.push(years.len() - 1);
    }
    let span = (years.len() - 1).max(1) as f64;
    for i in indexes {
        let x = left + plot_w * i as f64 / span;
        svg.text_anchored(
            x,
            top + plot_h + 16.0,
            &format!("Year {}", years[i].year),
            10.0,
            palette.text,
            "middle",
        );
    }
}

/// Legend swatches along the bottom edge.
pub(crate) fn draw_legend(
    svg: &mut SvgCanvas,
    entries: &[(&str, &str)],
    palette: &Palette,
    style: &ChartStyle,
) {
    let y = style.height as f64 - 10.0;
    let mut x = 70.0;
    for (label, color) in entries {
        svg.rect(x, y - 9.0, 10.0, 10.0, color);
        svg.text_anchored(x + 14.0, y, label, 10.0, palette.text, "start");
        x += 14.0 + 7.0 * label.len() as f64 + 24.0;
    }
}
