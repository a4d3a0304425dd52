/// Gemini Extractor - structured-output extraction via the Google
/// generative language API.
///
/// The request pins `responseMimeType` to JSON with a response schema
/// mirroring the discharge record, so a successful call parses directly
/// into [`ClinicalRecord`]. Externally extracted fields all carry the same
/// fixed confidence; the provider gives no per-field signal.
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use extraction_engine::{ClinicalRecord, ConfidenceMap, NoteSections, TrainingState};

use crate::config::ExtractionProvider;
use crate::error::{SummaryError, SummaryResult};
use crate::extractors::{ExtractionOutcome, Extractor};

/// Confidence assigned to every populated externally-extracted field.
const EXTERNAL_CONFIDENCE: f64 = 0.95;

pub struct GeminiExtractor {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractionProvider) -> SummaryResult<Self> {
        let ExtractionProvider::Gemini {
            api_url,
            api_key,
            model,
        } = config;
        if api_key.trim().is_empty() {
            return Err(SummaryError::Config(
                "Gemini API key is not configured".to_string(),
            ));
        }
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
            model: model.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn prompt(sections: &NoteSections) -> String {
        let mut notes = String::new();
        for (label, content) in [
            ("ADMISSION", &sections.admission),
            ("PROGRESS", &sections.progress),
            ("CONSULTANT", &sections.consultant),
            ("PROCEDURE", &sections.procedure),
            ("FINAL", &sections.final_note),
        ] {
            if !content.trim().is_empty() {
                notes.push_str(&format!("{} NOTE:\n{}\n\n", label, content));
            }
        }
        format!(
            "Analyze these clinical notes and extract all information for a \
             discharge summary. Be thorough and accurate. Extract dates in \
             MM/DD/YYYY format.\n\n{}\
             Extract: patient demographics, dates, diagnoses, procedures, \
             hospital course, complications, current status, medications, \
             history, disposition, and follow-up.",
            notes
        )
    }

    fn response_schema() -> Value {
        let string = json!({ "type": "STRING" });
        let string_array = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        let mut properties = serde_json::Map::new();
        for field in ClinicalRecord::FIELD_NAMES {
            let list_valued = matches!(
                field,
                "procedures" | "complications" | "dischargeMedications" | "pmh" | "psh" | "followUp"
            );
            properties.insert(
                field.to_string(),
                if list_valued { string_array.clone() } else { string.clone() },
            );
        }
        json!({ "type": "OBJECT", "properties": properties })
    }

    /// Uniform confidence for every field the provider populated; fields it
    /// left empty stay out of the map.
    fn confidence_for(record: &ClinicalRecord) -> ConfidenceMap {
        let mut confidence = ConfidenceMap::new();
        let Ok(value) = serde_json::to_value(record) else {
            return confidence;
        };
        for field in ClinicalRecord::FIELD_NAMES {
            let populated = match &value[field] {
                Value::String(text) => !text.trim().is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => false,
            };
            if populated {
                confidence.insert(field.to_string(), EXTERNAL_CONFIDENCE);
            }
        }
        confidence
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(
        &self,
        sections: &NoteSections,
        _training: &TrainingState,
    ) -> SummaryResult<ExtractionOutcome> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(sections) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::response_schema(),
            },
        });

        debug!(model = %self.model, "requesting external extraction");
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(SummaryError::Provider(format!(
                "API error: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                SummaryError::Provider("response carried no candidate text".to_string())
            })?;
        let record: ClinicalRecord = serde_json::from_str(text)?;
        let confidence = Self::confidence_for(&record);

        Ok(ExtractionOutcome { record, confidence })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_covers_every_record_field() {
        let schema = GeminiExtractor::response_schema();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), ClinicalRecord::FIELD_NAMES.len());
        assert_eq!(properties["procedures"]["type"], "ARRAY");
        assert_eq!(properties["patientName"]["type"], "STRING");
    }

    #[test]
    fn prompt_labels_only_populated_sections() {
        let sections = NoteSections {
            admission: "Admitted with headache".to_string(),
            final_note: "Discharged home".to_string(),
            ..Default::default()
        };
        let prompt = GeminiExtractor::prompt(&sections);
        assert!(prompt.contains("ADMISSION NOTE:"));
        assert!(prompt.contains("FINAL NOTE:"));
        assert!(!prompt.contains("PROGRESS NOTE:"));
    }

    #[test]
    fn confidence_covers_only_populated_fields() {
        let mut record = ClinicalRecord::default();
        record.patient_name = "John Carter".to_string();
        record.discharge_medications = vec!["Nimodipine 60mg PO q4h".to_string()];

        let confidence = GeminiExtractor::confidence_for(&record);
        assert_eq!(confidence.len(), 2);
        assert_eq!(confidence["patientName"], EXTERNAL_CONFIDENCE);
        assert_eq!(confidence["dischargeMedications"], EXTERNAL_CONFIDENCE);
        assert!(!confidence.contains_key("mrn"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = ExtractionProvider::Gemini {
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "  ".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
        };
        assert!(GeminiExtractor::new(&config).is_err());
    }
}
