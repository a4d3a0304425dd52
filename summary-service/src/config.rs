use serde::{Deserialize, Serialize};

use crate::error::{SummaryError, SummaryResult};

/// How extraction runs for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ExtractionMethod {
    /// External provider first, pattern fallback on failure.
    #[serde(rename = "hybrid")]
    Hybrid,
    /// External provider only; provider failure surfaces to the caller.
    #[serde(rename = "ai")]
    AiOnly,
    /// Pattern rules only, fully offline.
    #[serde(rename = "regex")]
    PatternOnly,
}

/// External extraction provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtractionProvider {
    /// Google Gemini structured-output extraction.
    Gemini {
        api_url: String,
        api_key: String,
        model: String,
    },
}

/// Which rendered document layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryTemplate {
    /// Full neurosurgery discharge summary.
    Neurosurgery,
    /// Condensed layout for transfer paperwork.
    Brief,
}

/// Summary service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryConfig {
    pub method: ExtractionMethod,
    pub provider: Option<ExtractionProvider>,
    /// Populated fields scoring below this produce validation warnings.
    pub confidence_threshold: f64,
    pub template: SummaryTemplate,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            method: ExtractionMethod::Hybrid,
            provider: None,
            confidence_threshold: 0.5,
            template: SummaryTemplate::Neurosurgery,
        }
    }
}

impl SummaryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> SummaryResult<Self> {
        let method = match std::env::var("SUMMARY_EXTRACTION_METHOD") {
            Ok(value) => match value.to_lowercase().as_str() {
                "hybrid" => ExtractionMethod::Hybrid,
                "ai" => ExtractionMethod::AiOnly,
                "regex" | "pattern" => ExtractionMethod::PatternOnly,
                other => {
                    return Err(SummaryError::Config(format!(
                        "Unknown extraction method: {}",
                        other
                    )))
                }
            },
            Err(_) => ExtractionMethod::Hybrid,
        };

        let provider = std::env::var("GEMINI_API_KEY").ok().map(|api_key| {
            ExtractionProvider::Gemini {
                api_url: std::env::var("GEMINI_API_URL").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
                api_key,
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string()),
            }
        });

        let confidence_threshold = std::env::var("SUMMARY_CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5);

        let template = match std::env::var("SUMMARY_TEMPLATE") {
            Ok(value) => match value.to_lowercase().as_str() {
                "neurosurgery" => SummaryTemplate::Neurosurgery,
                "brief" => SummaryTemplate::Brief,
                other => {
                    return Err(SummaryError::Config(format!(
                        "Unknown summary template: {}",
                        other
                    )))
                }
            },
            Err(_) => SummaryTemplate::Neurosurgery,
        };

        Ok(Self {
            method,
            provider,
            confidence_threshold,
            template,
        })
    }
}
