// advisory-report-service/src/models.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================
// Request types
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Cashflow,
    Suitability,
    Review,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Cashflow => "cashflow",
            ReportKind::Suitability => "suitability",
            ReportKind::Review => "review",
        }
    }

    /// Human title used in document headers.
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Cashflow => "Cash Flow Analysis",
            ReportKind::Suitability => "Suitability Assessment",
            ReportKind::Review => "Annual Review",
        }
    }
}

impl TryFrom<String> for ReportKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "cashflow" => Ok(ReportKind::Cashflow),
            "suitability" => Ok(ReportKind::Suitability),
            "review" => Ok(ReportKind::Review),
            other => Err(format!("unknown report kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Html,
    Pdf,
    Excel,
    Slidedeck,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Excel => "excel",
            OutputFormat::Slidedeck => "slidedeck",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Excel => "xlsx",
            OutputFormat::Slidedeck => "pptx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html; charset=utf-8",
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputFormat::Slidedeck => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Portfolio,
    IncomeExpense,
    AssetAllocation,
    RiskAnalysis,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Portfolio => "portfolio",
            ChartKind::IncomeExpense => "income_expense",
            ChartKind::AssetAllocation => "asset_allocation",
            ChartKind::RiskAnalysis => "risk_analysis",
        }
    }

    pub fn all() -> [ChartKind; 4] {
        [
            ChartKind::Portfolio,
            ChartKind::IncomeExpense,
            ChartKind::AssetAllocation,
            ChartKind::RiskAnalysis,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessibilityOptions {
    #[serde(default)]
    pub high_contrast: bool,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default)]
    pub screen_reader: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_overrides: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_overrides: Option<HashMap<String, String>>,
}

fn default_report_period_years() -> u32 {
    20
}

fn default_locale() -> String {
    "en-GB".to_string()
}

fn default_chart_kinds() -> Vec<ChartKind> {
    ChartKind::all().to_vec()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default = "default_true")]
    pub include_charts: bool,
    #[serde(default = "default_true")]
    pub include_assumptions: bool,
    #[serde(default = "default_true")]
    pub include_risk_analysis: bool,
    #[serde(default = "default_true")]
    pub include_projection_table: bool,
    #[serde(default = "default_report_period_years")]
    pub report_period_years: u32,
    #[serde(default = "OutputFormat::default")]
    pub output_format: OutputFormat,
    #[serde(default = "default_chart_kinds")]
    pub chart_kinds: Vec<ChartKind>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub accessibility: AccessibilityOptions,
    #[serde(default)]
    pub customizations: Customizations,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Html
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_charts: true,
            include_assumptions: true,
            include_risk_analysis: true,
            include_projection_table: true,
            report_period_years: default_report_period_years(),
            output_format: OutputFormat::Html,
            chart_kinds: default_chart_kinds(),
            locale: default_locale(),
            theme: Theme::Light,
            accessibility: AccessibilityOptions::default(),
            customizations: Customizations::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub scenario_id: Uuid,
    pub report_kind: ReportKind,
    #[serde(default)]
    pub options: ReportOptions,
}

// ============================================================
// Domain records (read-only inputs from the stores)
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm_name: Option<String>,
}

impl Client {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAssumptions {
    /// Annual rates as fractions, e.g. 0.025 for 2.5%.
    pub inflation_rate: f64,
    pub pension_growth_rate: f64,
    pub investment_growth_rate: f64,
    pub cash_growth_rate: f64,
}

/// Target allocation percentages. May sum to less than 100; the shortfall
/// is treated as uninvested cash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetAllocation {
    #[serde(default)]
    pub equities: f64,
    #[serde(default)]
    pub bonds: f64,
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub alternatives: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A risk metric arrives either as a 0–1 score or as a coarse label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskScore {
    Value(f64),
    Level(RiskLevel),
}

impl RiskScore {
    /// Collapse to a 0–1 score: low/medium/high map to 0.3/0.6/0.9.
    pub fn resolve(&self) -> f64 {
        match self {
            RiskScore::Value(v) => v.clamp(0.0, 1.0),
            RiskScore::Level(RiskLevel::Low) => 0.3,
            RiskScore::Level(RiskLevel::Medium) => 0.6,
            RiskScore::Level(RiskLevel::High) => 0.9,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.resolve() {
            v if v < 0.45 => "low",
            v if v < 0.75 => "medium",
            _ => "high",
        }
    }
}

impl Default for RiskScore {
    fn default() -> Self {
        RiskScore::Level(RiskLevel::Medium)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    #[serde(default)]
    pub shortfall: RiskScore,
    #[serde(default)]
    pub longevity: RiskScore,
    #[serde(default)]
    pub inflation: RiskScore,
    #[serde(default)]
    pub sequence: RiskScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mortgage {
    pub balance: f64,
    pub annual_payment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalEvent {
    pub description: String,
    /// Client age at which the event occurs.
    pub age: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub scenario_type: String,
    pub current_age: u8,
    pub retirement_age: u8,
    pub life_expectancy: u8,
    pub state_pension_age: u8,
    pub projection_years: u32,
    pub current_savings: f64,
    pub pension_value: f64,
    pub investment_value: f64,
    pub annual_income: f64,
    pub annual_expenses: f64,
    pub assumptions: MarketAssumptions,
    #[serde(default)]
    pub allocation: AssetAllocation,
    /// Risk profile assessed when the scenario was created; feeds the
    /// risk radar chart.
    #[serde(default)]
    pub risk_profile: RiskMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortgage: Option<Mortgage>,
    #[serde(default)]
    pub capital_events: Vec<CapitalEvent>,
    /// ISO 4217 code; when absent the currency is inferred from the locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_override: Option<String>,
}

// ============================================================
// Projection output (produced by the external engine)
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionYearRecord {
    pub year: u32,
    pub age: u8,
    pub income: f64,
    pub expenses: f64,
    pub pension_value: f64,
    pub investment_value: f64,
    pub cash_value: f64,
    pub asset_total: f64,
    pub nominal_value: f64,
    pub real_value: f64,
    pub surplus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub final_portfolio_value: f64,
    pub final_real_value: f64,
    pub total_contributions: f64,
    pub total_withdrawals: f64,
    /// Annualized return as a fraction.
    pub average_annual_return: f64,
    /// 0–10 scale.
    pub sustainability_rating: f64,
    pub goal_achieved: bool,
    pub fund_survives: bool,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub risk_metrics: RiskMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub summary: ProjectionSummary,
    pub years: Vec<ProjectionYearRecord>,
}

/// Placeholder name → formatted value (or pre-rendered HTML fragment).
/// Built fresh per request and read-only once handed to the template
/// engine. Boolean section flags are carried as the literal strings
/// "true"/"false"; the engine's truthiness rules depend on that.
pub type VariableMap = BTreeMap<String, String>;

// ============================================================
// Chart output
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartImageResult {
    pub chart_kind: ChartKind,
    /// Always a vector mime type; no raster stack is involved.
    pub content_type: String,
    pub raw_bytes: Vec<u8>,
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    /// Set once the image has been persisted, absent in preview mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ============================================================
// Progress
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    Initializing,
    GatheringData,
    GeneratingCharts,
    CreatingDocument,
    Finalizing,
    Complete,
    Error,
}

impl ReportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStage::Initializing => "initializing",
            ReportStage::GatheringData => "gathering_data",
            ReportStage::GeneratingCharts => "generating_charts",
            ReportStage::CreatingDocument => "creating_document",
            ReportStage::Finalizing => "finalizing",
            ReportStage::Complete => "complete",
            ReportStage::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStage::Complete | ReportStage::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProgress {
    pub report_id: String,
    pub stage: ReportStage,
    pub percent_complete: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_ms_remaining: Option<u64>,
}

// ============================================================
// Results
// ============================================================

/// Reference to the persisted document artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub chart_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportResult {
    pub fn success(
        document: DocumentRef,
        download_url: String,
        chart_urls: Vec<String>,
        metadata: Option<ReportMetadata>,
    ) -> Self {
        Self {
            success: true,
            document: Some(document),
            download_url: Some(download_url),
            chart_urls,
            metadata,
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            document: None,
            download_url: None,
            chart_urls: vec![],
            metadata: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewResult {
    pub fn success(html_content: String) -> Self {
        Self {
            success: true,
            html_content: Some(html_content),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            html_content: None,
            error: Some(error),
        }
    }
}

// ============================================================
// Persisted metadata
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportMetadata {
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub client_id: Uuid,
    #[sqlx(try_from = "String")]
    pub report_kind: ReportKind,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub file_size: i64,
    pub language: String,
    pub accessibility_flag: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_options_deserialize_with_defaults() {
        let options: ReportOptions = serde_json::from_str("{}").unwrap();
        assert!(options.include_charts);
        assert_eq!(options.report_period_years, 20);
        assert_eq!(options.locale, "en-GB");
        assert_eq!(options.output_format, OutputFormat::Html);
        assert_eq!(options.chart_kinds.len(), 4);
        assert_eq!(options.theme, Theme::Light);
        assert!(!options.accessibility.high_contrast);
    }

    #[test]
    fn risk_score_accepts_numbers_and_labels() {
        let numeric: RiskScore = serde_json::from_str("0.42").unwrap();
        assert!((numeric.resolve() - 0.42).abs() < f64::EPSILON);

        let label: RiskScore = serde_json::from_str("\"high\"").unwrap();
        assert!((label.resolve() - 0.9).abs() < f64::EPSILON);

        let out_of_range = RiskScore::Value(3.5);
        assert!((out_of_range.resolve() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_kind_round_trips_through_strings() {
        for kind in [ReportKind::Cashflow, ReportKind::Suitability, ReportKind::Review] {
            let parsed = ReportKind::try_from(kind.as_str().to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
        assert!(ReportKind::try_from("quarterly".to_string()).is_err());
    }
}
