//! Discharge Summary Service for Neurosurgical Documentation
//!
//! Turns free-text clinical notes into a structured discharge record and a
//! formatted discharge summary, with **offline-first** extraction and an
//! optional external structured-output provider.
//!
//! # Extraction Methods
//!
//! 1. **hybrid** (default) - external provider first, rule-based fallback
//! 2. **ai** - external provider only; failures surface to the caller
//! 3. **regex** - rule-based patterns only, fully offline
//!
//! # Pipeline
//!
//! Segmentation → abbreviation expansion → field extraction → entity
//! recognition → condition/procedure detection → risk scoring →
//! evidence-based recommendations → validation → summary rendering.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use summary_service::{DischargeSummaryService, SummaryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SummaryConfig::from_env()?;
//! let mut service = DischargeSummaryService::new(config)?;
//!
//! let analysis = service
//!     .process_unified("ADMISSION NOTE\nJohn Carter is a 58 year old male with SAH.")
//!     .await?;
//!
//! let summary = service.render_summary(&analysis, chrono::Utc::now());
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod error;
pub mod extractors;
pub mod renderer;
pub mod service;
pub mod store;
pub mod validation;

pub use config::{ExtractionMethod, ExtractionProvider, SummaryConfig, SummaryTemplate};
pub use error::{SummaryError, SummaryResult};
pub use extractors::{create_extractor, ExtractionOutcome, Extractor};
pub use renderer::{render, SummaryInputs};
pub use service::{DischargeSummaryService, EntitySets, NoteAnalysis};
pub use store::{KeyValueStore, MemoryStore};
pub use validation::{validate, ValidationReport};
