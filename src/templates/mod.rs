// advisory-report-service/src/templates/mod.rs

pub mod engine;

use crate::models::{FontSize, ReportKind, ReportOptions, Theme};

/// Produces the raw markup for a report kind and style configuration.
/// Placeholders use `{{NAME}}`, conditional sections `{{#if FLAG}}...{{/if}}`
/// (flat, never nested). Selection never fails: unrecognized kind names
/// fall back to the cash-flow template.
pub struct TemplateLibrary;

impl TemplateLibrary {
    pub fn new() -> Self {
        Self
    }

    pub fn select_template(&self, kind: ReportKind, options: &ReportOptions) -> String {
        let body = match kind {
            ReportKind::Cashflow => cashflow_body(),
            ReportKind::Suitability => suitability_body(),
            ReportKind::Review => review_body(),
        };
        format!(
            "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\"/>\n\
             <title>{{{{REPORT_TITLE}}}}</title>\n<style>\n{style}</style>\n</head>\n<body>\n\
             {header}\n{body}\n{footer}\n</body>\n</html>\n",
            lang = html_lang(&options.locale),
            style = style_block(options),
            header = HEADER,
            footer = FOOTER,
        )
    }

    /// Selection by kind name, for callers holding the platform's string
    /// identifiers. Unknown names get the cash-flow template.
    pub fn select_template_named(&self, kind: &str, options: &ReportOptions) -> String {
        let kind = ReportKind::try_from(kind.to_string()).unwrap_or(ReportKind::Cashflow);
        self.select_template(kind, options)
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn html_lang(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or("en")
}

struct StyleColors {
    background: String,
    text: String,
    muted: String,
    accent: String,
    border: String,
}

fn theme_colors(theme: Theme, high_contrast: bool) -> StyleColors {
    if high_contrast {
        return StyleColors {
            background: "#ffffff".into(),
            text: "#000000".into(),
            muted: "#000000".into(),
            accent: "#000000".into(),
            border: "#000000".into(),
        };
    }
    match theme {
        Theme::Light | Theme::Auto => StyleColors {
            background: "#ffffff".into(),
            text: "#1f2933".into(),
            muted: "#5f6b76".into(),
            accent: "#2563eb".into(),
            border: "#d2d8de".into(),
        },
        Theme::Dark => StyleColors {
            background: "#111827".into(),
            text: "#e5e7eb".into(),
            muted: "#9ca3af".into(),
            accent: "#60a5fa".into(),
            border: "#374151".into(),
        },
    }
}

/// Shared style block. Theme, contrast and font-size scale the custom
/// properties; per-firm overrides replace them wholesale.
fn style_block(options: &ReportOptions) -> String {
    let mut colors = theme_colors(options.theme, options.accessibility.high_contrast);
    if let Some(overrides) = &options.customizations.color_overrides {
        for (name, value) in overrides {
            match name.as_str() {
                "background" => colors.background = value.clone(),
                "text" => colors.text = value.clone(),
                "muted" => colors.muted = value.clone(),
                "accent" => colors.accent = value.clone(),
                "border" => colors.border = value.clone(),
                _ => {}
            }
        }
    }

    let base_size = match options.accessibility.font_size {
        FontSize::Small => 12,
        FontSize::Medium => 14,
        FontSize::Large => 17,
    };
    let border_width = if options.accessibility.high_contrast { 2 } else { 1 };

    let font_family = options
        .customizations
        .font_overrides
        .as_ref()
        .and_then(|fonts| fonts.get("body").cloned())
        .unwrap_or_else(|| "Helvetica, Arial, sans-serif".to_string());

    let mut css = format!(
        ":root {{ --bg: {bg}; --text: {text}; --muted: {muted}; --accent: {accent}; --border: {border}; }}\n\
         body {{ background: var(--bg); color: var(--text); font-family: {font_family}; font-size: {base_size}px; margin: 2rem auto; max-width: 54rem; line-height: 1.5; }}\n\
         h1 {{ color: var(--accent); font-size: 1.8em; margin-bottom: 0.2em; }}\n\
         h2 {{ border-bottom: {border_width}px solid var(--border); padding-bottom: 0.2em; margin-top: 1.6em; }}\n\
         .subtitle {{ color: var(--muted); }}\n\
         table {{ border-collapse: collapse; width: 100%; margin: 0.8em 0; }}\n\
         th, td {{ border: {border_width}px solid var(--border); padding: 0.4em 0.6em; text-align: left; }}\n\
         th {{ background: var(--border); }}\n\
         .metrics {{ display: flex; gap: 1em; flex-wrap: wrap; margin: 1em 0; }}\n\
         .metric {{ border: {border_width}px solid var(--border); border-radius: 6px; padding: 0.8em 1em; min-width: 10rem; }}\n\
         .metric .value {{ font-size: 1.4em; font-weight: bold; color: var(--accent); }}\n\
         .metric .label {{ color: var(--muted); font-size: 0.85em; }}\n\
         .chart {{ margin: 1em 0; }}\n\
         .chart img {{ max-width: 100%; border: {border_width}px solid var(--border); }}\n\
         .insights li {{ margin: 0.3em 0; }}\n\
         .recommendation {{ border-left: 4px solid var(--accent); padding: 0.6em 1em; margin: 1em 0; background: var(--border); }}\n\
         .timeline li {{ margin: 0.4em 0; }}\n\
         .logo {{ max-height: 48px; float: right; }}\n\
         .sr-only {{ position: absolute; width: 1px; height: 1px; overflow: hidden; clip: rect(0 0 0 0); }}\n\
         footer {{ color: var(--muted); font-size: 0.8em; border-top: {border_width}px solid var(--border); margin-top: 2em; padding-top: 0.8em; }}\n",
        bg = colors.background,
        text = colors.text,
        muted = colors.muted,
        accent = colors.accent,
        border = colors.border,
    );

    // Auto theme defers to the reader's colour scheme at view time.
    if options.theme == Theme::Auto && !options.accessibility.high_contrast {
        css.push_str(
            "@media (prefers-color-scheme: dark) {\n\
             :root { --bg: #111827; --text: #e5e7eb; --muted: #9ca3af; --accent: #60a5fa; --border: #374151; }\n\
             }\n",
        );
    }

    css
}

const HEADER: &str = "<header>\n\
{{#if HAS_LOGO}}<img class=\"logo\" src=\"{{LOGO_URL}}\" alt=\"{{FIRM_NAME}}\"/>{{/if}}\n\
<h1>{{REPORT_TITLE}}</h1>\n\
<p class=\"subtitle\">Prepared for {{CLIENT_NAME}} by {{ADVISOR_NAME}}, {{FIRM_NAME}}</p>\n\
<p class=\"subtitle\">{{REPORT_DATE}}</p>\n\
</header>";

const FOOTER: &str = "<footer>\n\
<p>{{FIRM_NAME}} | {{REPORT_DATE}} | Scenario: {{SCENARIO_NAME}}</p>\n\
<p>This report illustrates projected outcomes based on stated assumptions. \
Projections are not guarantees of future performance.</p>\n\
</footer>";

const SCENARIO_SECTION: &str = "<h2>Scenario</h2>\n\
<table>\n\
<tr><th>Scenario</th><td>{{SCENARIO_NAME}}</td><th>Type</th><td>{{SCENARIO_TYPE}}</td></tr>\n\
<tr><th>Projection horizon</th><td>{{PROJECTION_YEARS}} years</td><th>Current age</th><td>{{CURRENT_AGE}}</td></tr>\n\
<tr><th>Retirement age</th><td>{{RETIREMENT_AGE}}</td><th>Life expectancy</th><td>{{LIFE_EXPECTANCY}}</td></tr>\n\
</table>";

const POSITION_SECTION: &str = "<h2>Current Position</h2>\n\
<table>\n\
<tr><th>Cash savings</th><td>{{CURRENT_SAVINGS}}</td><th>Pension</th><td>{{PENSION_VALUE}}</td></tr>\n\
<tr><th>Investments</th><td>{{INVESTMENT_VALUE}}</td><th>Annual income</th><td>{{ANNUAL_INCOME}}</td></tr>\n\
<tr><th>Annual expenses</th><td>{{ANNUAL_EXPENSES}}</td><th></th><td></td></tr>\n\
</table>";

const OPTIONAL_SECTIONS: &str = "{{#if INCLUDE_CHARTS}}\n<h2>Charts</h2>\n{{CHARTS_BLOCK}}\n{{/if}}\n\
{{#if INCLUDE_PROJECTION_TABLE}}\n<h2>Year-by-Year Projection</h2>\n{{PROJECTION_TABLE}}\n{{/if}}\n\
{{#if INCLUDE_ASSUMPTIONS}}\n<h2>Assumptions</h2>\n{{ASSUMPTIONS_TABLE}}\n{{/if}}\n\
{{#if INCLUDE_RISK_ANALYSIS}}\n<h2>Risk Analysis</h2>\n{{RISK_ANALYSIS_BLOCK}}\n{{/if}}";

const METRICS_GRID: &str = "<div class=\"metrics\">\n\
<div class=\"metric\"><div class=\"value\">{{FINAL_PORTFOLIO_VALUE}}</div><div class=\"label\">Projected portfolio (nominal)</div></div>\n\
<div class=\"metric\"><div class=\"value\">{{FINAL_REAL_VALUE}}</div><div class=\"label\">Projected portfolio (real terms)</div></div>\n\
<div class=\"metric\"><div class=\"value\">{{AVERAGE_RETURN}}</div><div class=\"label\">Average annual return</div></div>\n\
<div class=\"metric\"><div class=\"value\">{{SUSTAINABILITY_RATING}}/10</div><div class=\"label\">Sustainability rating</div></div>\n\
</div>";

const INSIGHTS_SECTION: &str = "<h2>Key Insights</h2>\n{{INSIGHTS_LIST}}";

const SUITABILITY_MATRIX: &str = "<h2>Risk and Objective Matrix</h2>\n\
<table>\n\
<tr><th>Dimension</th><th>Assessment</th></tr>\n\
<tr><td>Shortfall risk</td><td>{{RISK_SHORTFALL}}</td></tr>\n\
<tr><td>Longevity risk</td><td>{{RISK_LONGEVITY}}</td></tr>\n\
<tr><td>Inflation risk</td><td>{{RISK_INFLATION}}</td></tr>\n\
<tr><td>Sequence risk</td><td>{{RISK_SEQUENCE}}</td></tr>\n\
<tr><td>Objective achieved</td><td>{{GOAL_ACHIEVED}}</td></tr>\n\
<tr><td>Fund lasts the full horizon</td><td>{{FUND_SURVIVES}}</td></tr>\n\
</table>";

const RECOMMENDATION_BOX: &str =
    "<h2>Recommendation</h2>\n<div class=\"recommendation\">{{RECOMMENDATION}}</div>";

const FLOWS_TABLE: &str = "<h2>Contributions and Withdrawals</h2>\n\
<table>\n\
<tr><th>Total contributions</th><td>{{TOTAL_CONTRIBUTIONS}}</td>\
<th>Total withdrawals</th><td>{{TOTAL_WITHDRAWALS}}</td></tr>\n\
</table>";

const TIMELINE_SECTION: &str = "<h2>Milestone Timeline</h2>\n{{TIMELINE_BLOCK}}";

/// Cash flow: metrics grid up front, then the year table and supporting
/// sections.
fn cashflow_body() -> String {
    [
        METRICS_GRID,
        SCENARIO_SECTION,
        POSITION_SECTION,
        INSIGHTS_SECTION,
        OPTIONAL_SECTIONS,
    ]
    .join("\n")
}

/// Suitability: the risk/objective matrix and recommendation carry the
/// document.
fn suitability_body() -> String {
    [
        SCENARIO_SECTION,
        SUITABILITY_MATRIX,
        RECOMMENDATION_BOX,
        INSIGHTS_SECTION,
        OPTIONAL_SECTIONS,
    ]
    .join("\n")
}

/// Annual review: performance highlight plus the milestone timeline.
fn review_body() -> String {
    [
        METRICS_GRID,
        FLOWS_TABLE,
        TIMELINE_SECTION,
        INSIGHTS_SECTION,
        OPTIONAL_SECTIONS,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessibilityOptions;

    #[test]
    fn every_kind_produces_markup_with_shared_placeholders() {
        let library = TemplateLibrary::new();
        let options = ReportOptions::default();
        for kind in [ReportKind::Cashflow, ReportKind::Suitability, ReportKind::Review] {
            let template = library.select_template(kind, &options);
            assert!(template.contains("{{REPORT_TITLE}}"), "{kind:?}");
            assert!(template.contains("{{CLIENT_NAME}}"), "{kind:?}");
            assert!(template.contains("{{#if INCLUDE_CHARTS}}"), "{kind:?}");
            assert!(template.contains("</html>"), "{kind:?}");
        }
    }

    #[test]
    fn unknown_kind_name_falls_back_to_cashflow() {
        let library = TemplateLibrary::new();
        let options = ReportOptions::default();
        let fallback = library.select_template_named("quarterly_summary", &options);
        let cashflow = library.select_template(ReportKind::Cashflow, &options);
        assert_eq!(fallback, cashflow);
    }

    #[test]
    fn high_contrast_styles_use_black_on_white() {
        let options = ReportOptions {
            accessibility: AccessibilityOptions {
                high_contrast: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let template = TemplateLibrary::new().select_template(ReportKind::Cashflow, &options);
        assert!(template.contains("--text: #000000"));
        assert!(template.contains("--bg: #ffffff"));
        assert!(template.contains("2px solid"));
    }

    #[test]
    fn conditionals_never_nest() {
        let library = TemplateLibrary::new();
        let options = ReportOptions::default();
        for kind in [ReportKind::Cashflow, ReportKind::Suitability, ReportKind::Review] {
            let template = library.select_template(kind, &options);
            let mut rest = template.as_str();
            while let Some(open) = rest.find("{{#if") {
                let after_open = &rest[open + 5..];
                let close = after_open
                    .find("{{/if}}")
                    .unwrap_or_else(|| panic!("unterminated conditional in {kind:?}"));
                let region = &after_open[..close];
                assert!(!region.contains("{{#if"), "nested conditional in {kind:?}");
                rest = &after_open[close + 7..];
            }
        }
    }
}
