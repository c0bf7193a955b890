// advisory-report-service/src/emitter.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::charts::chart_title;
use crate::error::Result;
use crate::models::{
    ChartImageResult, Client, DocumentRef, OutputFormat, ProjectionResult, ReportKind, Scenario,
};
use crate::stores::{
    ObjectStore, PageLayout, PdfEncoder, SlideContent, SlideDeckData, SlideDeckEncoder,
    SpreadsheetEncoder, WorkbookData, WorksheetData,
};
use crate::variables::{format_currency_as, format_percent};

/// Everything a format strategy may need: the populated markup for the
/// markup-based formats, and the underlying structured records for the
/// formats that bypass markup entirely.
pub struct EmitPayload<'a> {
    pub report_kind: ReportKind,
    pub markup: String,
    pub client: &'a Client,
    pub scenario: &'a Scenario,
    pub projection: &'a ProjectionResult,
    pub charts: &'a [ChartImageResult],
    pub locale: &'a str,
    pub generated_at: DateTime<Utc>,
}

pub struct EmittedDocument {
    pub document: DocumentRef,
    pub download_url: String,
}

struct EncodedArtifact {
    bytes: Vec<u8>,
    content_type: &'static str,
    extension: &'static str,
}

/// Dispatches on the requested output format, persists exactly one
/// object per report and returns a time-limited download URL for it.
pub struct DocumentEmitter {
    object_store: Arc<dyn ObjectStore>,
    pdf_encoder: Arc<dyn PdfEncoder>,
    spreadsheet_encoder: Arc<dyn SpreadsheetEncoder>,
    slide_encoder: Arc<dyn SlideDeckEncoder>,
    document_prefix: String,
    signed_url_ttl: Duration,
}

impl DocumentEmitter {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        pdf_encoder: Arc<dyn PdfEncoder>,
        spreadsheet_encoder: Arc<dyn SpreadsheetEncoder>,
        slide_encoder: Arc<dyn SlideDeckEncoder>,
        document_prefix: String,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            object_store,
            pdf_encoder,
            spreadsheet_encoder,
            slide_encoder,
            document_prefix,
            signed_url_ttl,
        }
    }

    /// Object path convention:
    /// `{prefix}/{client_id}/{kind}-{client_id}-{timestamp}.{ext}`.
    fn document_path(&self, payload: &EmitPayload<'_>, extension: &str) -> (String, String) {
        let file_name = format!(
            "{}-{}-{}.{}",
            payload.report_kind.as_str(),
            payload.client.id,
            payload.generated_at.timestamp_millis(),
            extension,
        );
        let path = format!("{}/{}/{}", self.document_prefix, payload.client.id, file_name);
        (path, file_name)
    }

    #[instrument(skip(self, payload), fields(
        format = format.as_str(),
        kind = payload.report_kind.as_str(),
        client_id = %payload.client.id,
    ))]
    pub async fn emit(
        &self,
        format: OutputFormat,
        payload: &EmitPayload<'_>,
    ) -> Result<EmittedDocument> {
        let artifact = match format {
            OutputFormat::Html => self.encode_html(payload),
            OutputFormat::Pdf => self.encode_pdf(payload).await?,
            OutputFormat::Excel => self.encode_excel(payload).await?,
            OutputFormat::Slidedeck => self.encode_slidedeck(payload).await?,
        };

        let (path, file_name) = self.document_path(payload, artifact.extension);
        let file_size = artifact.bytes.len() as i64;

        self.object_store
            .upload(&path, &artifact.bytes, artifact.content_type)
            .await?;
        let download_url = self
            .object_store
            .create_signed_url(&path, self.signed_url_ttl)
            .await?;

        info!(path = %path, file_size, "report artifact persisted");

        Ok(EmittedDocument {
            document: DocumentRef {
                path,
                file_name,
                content_type: artifact.content_type.to_string(),
                file_size,
            },
            download_url,
        })
    }

    /// Persist chart images alongside the document, concurrently and
    /// best-effort: the document embeds every chart as a data-URI, so a
    /// failed chart upload costs only the standalone URL.
    pub async fn persist_charts(
        &self,
        client_id: uuid::Uuid,
        report_kind: ReportKind,
        generated_at: DateTime<Utc>,
        charts: Vec<ChartImageResult>,
    ) -> Vec<ChartImageResult> {
        let uploads = charts.into_iter().map(|mut chart| async move {
            let path = format!(
                "{}/{}/charts/{}-{}-{}.svg",
                self.document_prefix,
                client_id,
                report_kind.as_str(),
                chart.chart_kind.as_str(),
                generated_at.timestamp_millis(),
            );
            let upload = self
                .object_store
                .upload(&path, &chart.raw_bytes, &chart.content_type)
                .await;
            match upload {
                Ok(()) => match self.object_store.create_signed_url(&path, self.signed_url_ttl).await {
                    Ok(url) => chart.url = Some(url),
                    Err(e) => {
                        warn!(chart = chart.chart_kind.as_str(), error = %e, "chart URL signing failed");
                    }
                },
                Err(e) => {
                    warn!(chart = chart.chart_kind.as_str(), error = %e, "chart upload failed");
                }
            }
            chart
        });
        join_all(uploads).await
    }

    fn encode_html(&self, payload: &EmitPayload<'_>) -> EncodedArtifact {
        EncodedArtifact {
            bytes: payload.markup.clone().into_bytes(),
            content_type: OutputFormat::Html.content_type(),
            extension: OutputFormat::Html.extension(),
        }
    }

    async fn encode_pdf(&self, payload: &EmitPayload<'_>) -> Result<EncodedArtifact> {
        let layout = PageLayout {
            page_size: "A4",
            landscape: false,
            header: format!(
                "{} | {}",
                payload.report_kind.title(),
                payload.client.display_name()
            ),
            footer: payload
                .client
                .firm_name
                .clone()
                .unwrap_or_else(|| "Generated report".to_string()),
        };
        let bytes = self.pdf_encoder.encode(&payload.markup, &layout).await?;
        Ok(EncodedArtifact {
            bytes,
            content_type: OutputFormat::Pdf.content_type(),
            extension: OutputFormat::Pdf.extension(),
        })
    }

    /// The spreadsheet path hands the encoder the structured records
    /// directly; markup never enters the workbook.
    async fn encode_excel(&self, payload: &EmitPayload<'_>) -> Result<EncodedArtifact> {
        let bytes = self
            .spreadsheet_encoder
            .encode(&build_workbook(payload))
            .await?;
        Ok(EncodedArtifact {
            bytes,
            content_type: OutputFormat::Excel.content_type(),
            extension: OutputFormat::Excel.extension(),
        })
    }

    async fn encode_slidedeck(&self, payload: &EmitPayload<'_>) -> Result<EncodedArtifact> {
        let bytes = self.slide_encoder.encode(&build_deck(payload)).await?;
        Ok(EncodedArtifact {
            bytes,
            content_type: OutputFormat::Slidedeck.content_type(),
            extension: OutputFormat::Slidedeck.extension(),
        })
    }
}

fn build_workbook(payload: &EmitPayload<'_>) -> WorkbookData {
    let scenario = payload.scenario;
    let summary = &payload.projection.summary;
    let currency = scenario.currency_override.as_deref();
    let money = |amount: f64| format_currency_as(amount, payload.locale, currency);

    let summary_sheet = WorksheetData {
        name: "Summary".to_string(),
        header: vec!["Item".to_string(), "Value".to_string()],
        rows: vec![
            vec!["Client".to_string(), payload.client.display_name()],
            vec!["Scenario".to_string(), scenario.name.clone()],
            vec![
                "Final portfolio value".to_string(),
                money(summary.final_portfolio_value),
            ],
            vec![
                "Final value (real terms)".to_string(),
                money(summary.final_real_value),
            ],
            vec![
                "Average annual return".to_string(),
                format_percent(summary.average_annual_return, payload.locale),
            ],
            vec![
                "Sustainability rating".to_string(),
                format!("{:.0}/10", summary.sustainability_rating),
            ],
        ],
    };

    let projection_sheet = WorksheetData {
        name: "Projection".to_string(),
        header: ["Year", "Age", "Income", "Expenses", "Portfolio", "Real terms", "Surplus"]
            .map(String::from)
            .to_vec(),
        rows: payload
            .projection
            .years
            .iter()
            .map(|y| {
                vec![
                    y.year.to_string(),
                    y.age.to_string(),
                    format!("{:.2}", y.income),
                    format!("{:.2}", y.expenses),
                    format!("{:.2}", y.asset_total),
                    format!("{:.2}", y.real_value),
                    format!("{:.2}", y.surplus),
                ]
            })
            .collect(),
    };

    WorkbookData {
        title: format!(
            "{} - {}",
            payload.report_kind.title(),
            payload.client.display_name()
        ),
        sheets: vec![summary_sheet, projection_sheet],
    }
}

fn build_deck(payload: &EmitPayload<'_>) -> SlideDeckData {
    let summary = &payload.projection.summary;
    let currency = payload.scenario.currency_override.as_deref();
    let money = |amount: f64| format_currency_as(amount, payload.locale, currency);

    let mut slides = vec![SlideContent {
        title: payload.report_kind.title().to_string(),
        bullets: vec![
            format!("Prepared for {}", payload.client.display_name()),
            format!("Scenario: {}", payload.scenario.name),
        ],
        image_data_uri: None,
    }];

    slides.push(SlideContent {
        title: "Headline Results".to_string(),
        bullets: vec![
            format!("Projected portfolio: {}", money(summary.final_portfolio_value)),
            format!("In today's terms: {}", money(summary.final_real_value)),
            format!(
                "Average annual return: {}",
                format_percent(summary.average_annual_return, payload.locale)
            ),
            format!("Sustainability: {:.0}/10", summary.sustainability_rating),
        ],
        image_data_uri: None,
    });

    if !summary.key_insights.is_empty() {
        slides.push(SlideContent {
            title: "Key Insights".to_string(),
            bullets: summary.key_insights.clone(),
            image_data_uri: None,
        });
    }

    for chart in payload.charts {
        slides.push(SlideContent {
            title: chart_title(chart.chart_kind).to_string(),
            bullets: vec![],
            image_data_uri: Some(chart.data_uri.clone()),
        });
    }

    SlideDeckData {
        title: format!(
            "{} - {}",
            payload.report_kind.title(),
            payload.client.display_name()
        ),
        slides,
    }
}
