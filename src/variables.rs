// advisory-report-service/src/variables.rs
//
// Computes the full placeholder → value map the template engine consumes.
// Pure: everything is a function of the fetched records, the options and
// the generation timestamp. Section flags are emitted as the literal
// strings "true"/"false" because the engine's conditional evaluator
// compares against those strings.

use chrono::{DateTime, Datelike, Utc};

use crate::charts::{chart_description, chart_title};
use crate::models::{
    ChartImageResult, Client, ProjectionResult, ReportKind, ReportOptions, RiskScore, Scenario,
    VariableMap,
};

// ------------------------------------------------------------
// Locale-aware formatting
// ------------------------------------------------------------

/// Currency inferred from the locale prefix unless the scenario
/// overrides it: English locales bill in sterling, everything else in
/// euros.
fn currency_symbol(locale: &str, currency_override: Option<&str>) -> &'static str {
    match currency_override {
        Some("GBP") => "£",
        Some("EUR") => "€",
        Some("USD") => "$",
        Some(_) => "¤",
        None if locale.starts_with("en") => "£",
        None => "€",
    }
}

fn thousands_separator(locale: &str) -> char {
    if locale.starts_with("en") {
        ','
    } else {
        '.'
    }
}

fn decimal_point(locale: &str) -> char {
    if locale.starts_with("en") {
        '.'
    } else {
        ','
    }
}

fn group_digits(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

/// Whole-unit currency rendering: `format_currency(1234.0, "en-GB")` is
/// "£1,234". Zero and negative amounts render without surprises.
pub fn format_currency(amount: f64, locale: &str) -> String {
    format_currency_as(amount, locale, None)
}

pub fn format_currency_as(amount: f64, locale: &str, currency_override: Option<&str>) -> String {
    let symbol = currency_symbol(locale, currency_override);
    let rounded = amount.abs().round() as u64;
    let sign = if amount < -0.5 { "-" } else { "" };
    format!(
        "{sign}{symbol}{}",
        group_digits(rounded, thousands_separator(locale))
    )
}

/// Fraction → one-decimal percentage: 0.052 becomes "5.2%".
pub fn format_percent(fraction: f64, locale: &str) -> String {
    let rendered = format!("{:.1}", fraction * 100.0);
    format!("{}%", rendered.replace('.', &decimal_point(locale).to_string()))
}

pub fn format_date(date: DateTime<Utc>, locale: &str) -> String {
    if locale.starts_with("en-US") {
        date.format("%B %-d, %Y").to_string()
    } else if locale.starts_with("en") {
        date.format("%-d %B %Y").to_string()
    } else {
        date.format("%d.%m.%Y").to_string()
    }
}

/// Localized yes/no, falling back to English for unknown languages.
pub fn yes_no(value: bool, locale: &str) -> &'static str {
    let lang = locale.split(['-', '_']).next().unwrap_or("en");
    match (lang, value) {
        ("de", true) => "Ja",
        ("de", false) => "Nein",
        ("fr", true) => "Oui",
        ("fr", false) => "Non",
        ("es", true) => "Sí",
        ("es", false) => "No",
        (_, true) => "Yes",
        (_, false) => "No",
    }
}

fn escape_html(value: &str) -> String {
    crate::charts::escape_xml(value)
}

fn flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

fn risk_label(score: &RiskScore) -> String {
    score.label().to_string()
}

// ------------------------------------------------------------
// Timeline
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub age: u8,
    pub label: String,
    /// Monetary amount, for capital events only.
    pub amount: Option<f64>,
}

/// Milestones ordered ascending by the client's age at occurrence.
/// Ties keep insertion order: retirement, state pension, mortgage
/// payoff, then capital events.
pub fn build_timeline_events(scenario: &Scenario) -> Vec<TimelineEvent> {
    let mut events = vec![
        TimelineEvent {
            age: scenario.retirement_age,
            label: "Retirement".to_string(),
            amount: None,
        },
        TimelineEvent {
            age: scenario.state_pension_age,
            label: "State Pension begins".to_string(),
            amount: None,
        },
    ];

    if let Some(mortgage) = &scenario.mortgage {
        if mortgage.annual_payment > 0.0 && mortgage.balance > 0.0 {
            let years_left = (mortgage.balance / mortgage.annual_payment).ceil() as u32;
            let payoff_age = u32::from(scenario.current_age) + years_left;
            events.push(TimelineEvent {
                age: payoff_age.min(u8::MAX as u32) as u8,
                label: "Mortgage repaid".to_string(),
                amount: None,
            });
        }
    }

    for event in &scenario.capital_events {
        events.push(TimelineEvent {
            age: event.age,
            label: event.description.clone(),
            amount: Some(event.amount),
        });
    }

    events.sort_by_key(|e| e.age);
    events
}

fn render_timeline(scenario: &Scenario, locale: &str, generated_year: i32) -> String {
    let mut html = String::from("<ol class=\"timeline\">\n");
    for event in build_timeline_events(scenario) {
        let calendar_year =
            generated_year + i32::from(event.age) - i32::from(scenario.current_age);
        let detail = event
            .amount
            .map(|amount| {
                format!(
                    " ({})",
                    format_currency_as(amount, locale, scenario.currency_override.as_deref())
                )
            })
            .unwrap_or_default();
        html.push_str(&format!(
            "<li>Age {} ({}): {}{}</li>\n",
            event.age,
            calendar_year,
            escape_html(&event.label),
            detail
        ));
    }
    html.push_str("</ol>");
    html
}

// ------------------------------------------------------------
// HTML fragments
// ------------------------------------------------------------

fn render_insights(insights: &[String]) -> String {
    if insights.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"insights\">\n");
    for insight in insights {
        html.push_str(&format!("<li>{}</li>\n", escape_html(insight)));
    }
    html.push_str("</ul>");
    html
}

fn render_charts_block(charts: &[ChartImageResult], screen_reader: bool) -> String {
    let mut html = String::new();
    for chart in charts {
        let description = chart_description(chart.chart_kind);
        html.push_str(&format!(
            "<figure class=\"chart\">\n<img src=\"{}\" alt=\"{}\" width=\"{}\" height=\"{}\"/>\n",
            chart.data_uri, description, chart.width, chart.height
        ));
        if screen_reader {
            html.push_str(&format!("<span class=\"sr-only\">{description}</span>\n"));
        }
        html.push_str(&format!(
            "<figcaption>{}</figcaption>\n</figure>\n",
            chart_title(chart.chart_kind)
        ));
    }
    html
}

fn render_projection_table(
    projection: &ProjectionResult,
    options: &ReportOptions,
    currency: Option<&str>,
) -> String {
    let locale = options.locale.as_str();
    let mut html = String::from(
        "<table>\n<tr><th>Year</th><th>Age</th><th>Income</th><th>Expenses</th>\
         <th>Portfolio</th><th>Real terms</th><th>Surplus</th></tr>\n",
    );
    for record in projection
        .years
        .iter()
        .take(options.report_period_years as usize)
    {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            record.year,
            record.age,
            format_currency_as(record.income, locale, currency),
            format_currency_as(record.expenses, locale, currency),
            format_currency_as(record.asset_total, locale, currency),
            format_currency_as(record.real_value, locale, currency),
            format_currency_as(record.surplus, locale, currency),
        ));
    }
    html.push_str("</table>");
    html
}

fn render_assumptions_table(scenario: &Scenario, locale: &str) -> String {
    let a = &scenario.assumptions;
    format!(
        "<table>\n\
         <tr><th>Inflation</th><td>{}</td></tr>\n\
         <tr><th>Pension growth</th><td>{}</td></tr>\n\
         <tr><th>Investment growth</th><td>{}</td></tr>\n\
         <tr><th>Cash growth</th><td>{}</td></tr>\n\
         </table>",
        format_percent(a.inflation_rate, locale),
        format_percent(a.pension_growth_rate, locale),
        format_percent(a.investment_growth_rate, locale),
        format_percent(a.cash_growth_rate, locale),
    )
}

fn render_risk_narrative(projection: &ProjectionResult) -> String {
    let metrics = &projection.summary.risk_metrics;
    let entries = [
        ("Shortfall risk", &metrics.shortfall, "the plan running out of accessible funds"),
        ("Longevity risk", &metrics.longevity, "outliving the projected portfolio"),
        ("Inflation risk", &metrics.inflation, "rising prices eroding real spending power"),
        ("Sequence risk", &metrics.sequence, "poor early returns while drawing down"),
    ];
    let mut html = String::new();
    for (name, score, explanation) in entries {
        html.push_str(&format!(
            "<p><strong>{name}</strong> is assessed as {} ({:.0}%), reflecting the chance of {explanation}.</p>\n",
            score.label(),
            score.resolve() * 100.0
        ));
    }
    html
}

fn recommendation_text(projection: &ProjectionResult) -> String {
    let summary = &projection.summary;
    if summary.goal_achieved && summary.fund_survives {
        "The current strategy remains suitable: projected assets meet the stated objective \
         across the full planning horizon. Continue the existing contribution pattern and \
         review annually."
            .to_string()
    } else if summary.fund_survives {
        "The portfolio is projected to last the planning horizon but falls short of the \
         stated objective. Consider increasing contributions or revisiting the target."
            .to_string()
    } else {
        "Projected assets are exhausted before the end of the planning horizon. A higher \
         contribution rate, later retirement or reduced drawdown should be discussed."
            .to_string()
    }
}

// ------------------------------------------------------------
// The map
// ------------------------------------------------------------

/// Build the complete placeholder map for one report.
pub fn build_variables(
    client: &Client,
    scenario: &Scenario,
    projection: &ProjectionResult,
    options: &ReportOptions,
    charts: &[ChartImageResult],
    report_kind: ReportKind,
    generated_at: DateTime<Utc>,
) -> VariableMap {
    let locale = options.locale.as_str();
    let currency = scenario.currency_override.as_deref();
    let money = |amount: f64| format_currency_as(amount, locale, currency);
    let summary = &projection.summary;

    let mut vars = VariableMap::new();
    let mut set = |name: &str, value: String| {
        vars.insert(name.to_string(), value);
    };

    // Identity and report header.
    set("CLIENT_NAME", escape_html(&client.display_name()));
    set(
        "CLIENT_EMAIL",
        escape_html(client.email.as_deref().unwrap_or("")),
    );
    set("REPORT_TITLE", report_kind.title().to_string());
    set("REPORT_DATE", format_date(generated_at, locale));
    set(
        "ADVISOR_NAME",
        escape_html(client.advisor_name.as_deref().unwrap_or("Your advisor")),
    );
    set(
        "FIRM_NAME",
        escape_html(client.firm_name.as_deref().unwrap_or("Your advisory firm")),
    );

    // Scenario parameters.
    set("SCENARIO_NAME", escape_html(&scenario.name));
    set("SCENARIO_TYPE", escape_html(&scenario.scenario_type));
    set("PROJECTION_YEARS", scenario.projection_years.to_string());
    set("CURRENT_AGE", scenario.current_age.to_string());
    set("RETIREMENT_AGE", scenario.retirement_age.to_string());
    set("LIFE_EXPECTANCY", scenario.life_expectancy.to_string());
    set("STATE_PENSION_AGE", scenario.state_pension_age.to_string());

    // Current position and market assumptions.
    set("CURRENT_SAVINGS", money(scenario.current_savings));
    set("PENSION_VALUE", money(scenario.pension_value));
    set("INVESTMENT_VALUE", money(scenario.investment_value));
    set("ANNUAL_INCOME", money(scenario.annual_income));
    set("ANNUAL_EXPENSES", money(scenario.annual_expenses));
    set(
        "INFLATION_RATE",
        format_percent(scenario.assumptions.inflation_rate, locale),
    );

    // Headline results.
    set("FINAL_PORTFOLIO_VALUE", money(summary.final_portfolio_value));
    set("FINAL_REAL_VALUE", money(summary.final_real_value));
    set("TOTAL_CONTRIBUTIONS", money(summary.total_contributions));
    set("TOTAL_WITHDRAWALS", money(summary.total_withdrawals));
    set(
        "AVERAGE_RETURN",
        format_percent(summary.average_annual_return, locale),
    );
    set(
        "SUSTAINABILITY_RATING",
        format!("{:.0}", summary.sustainability_rating),
    );
    set("GOAL_ACHIEVED", yes_no(summary.goal_achieved, locale).to_string());
    set("FUND_SURVIVES", yes_no(summary.fund_survives, locale).to_string());

    // Risk metrics.
    set("RISK_SHORTFALL", risk_label(&summary.risk_metrics.shortfall));
    set("RISK_LONGEVITY", risk_label(&summary.risk_metrics.longevity));
    set("RISK_INFLATION", risk_label(&summary.risk_metrics.inflation));
    set("RISK_SEQUENCE", risk_label(&summary.risk_metrics.sequence));

    // Pre-rendered fragments.
    set("INSIGHTS_LIST", render_insights(&summary.key_insights));
    set(
        "CHARTS_BLOCK",
        render_charts_block(charts, options.accessibility.screen_reader),
    );
    set("RECOMMENDATION", recommendation_text(projection));

    // Section flags: string-typed booleans, by contract.
    set("INCLUDE_CHARTS", flag(options.include_charts && !charts.is_empty()));
    set(
        "INCLUDE_PROJECTION_TABLE",
        flag(options.include_projection_table),
    );
    set("INCLUDE_ASSUMPTIONS", flag(options.include_assumptions));
    set("INCLUDE_RISK_ANALYSIS", flag(options.include_risk_analysis));

    let logo = options.customizations.logo.as_deref().unwrap_or("");
    set("HAS_LOGO", flag(!logo.is_empty()));
    set("LOGO_URL", escape_html(logo));

    // Option-gated derived content.
    if options.include_projection_table {
        set(
            "PROJECTION_TABLE",
            render_projection_table(projection, options, currency),
        );
    }
    if options.include_assumptions {
        set("ASSUMPTIONS_TABLE", render_assumptions_table(scenario, locale));
    }
    if options.include_risk_analysis {
        set("RISK_ANALYSIS_BLOCK", render_risk_narrative(projection));
    }
    set(
        "TIMELINE_BLOCK",
        render_timeline(scenario, locale, generated_at.year()),
    );

    vars
}
