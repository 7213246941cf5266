//! One end-to-end report run: inventory, charts, web text, narratives, document.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Local;
use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::assemble::{assemble, write_report, ReportError};
use crate::charts::{self, ChartArtifact, ChartError};
use crate::config::{Config, ModelChoice, ReportFormat};
use crate::intake::sanitize;
use crate::inventory;
use crate::narrative::{NarrativeError, NarrativeGenerator};
use crate::web::WebEnricher;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create run directory {path}: {source}")]
    RunDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Inputs of one run.
#[derive(Clone, Debug, Default)]
pub struct ReportRequest {
    pub product_name: String,
    /// Raw bytes of an uploaded CSV, if any.
    pub upload: Option<Vec<u8>>,
}

impl ReportRequest {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            upload: None,
        }
    }

    pub fn with_upload(mut self, upload: impl Into<Option<Vec<u8>>>) -> Self {
        self.upload = upload.into();
        self
    }
}

/// The document written by a run.
#[derive(Clone, Debug)]
pub struct GeneratedReport {
    pub product: String,
    pub path: PathBuf,
    pub file_name: String,
    pub format: ReportFormat,
    pub charts: Vec<ChartArtifact>,
}

impl GeneratedReport {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

pub struct ReportPipeline {
    config: Config,
    narrator: NarrativeGenerator,
    enricher: Option<WebEnricher>,
}

impl ReportPipeline {
    /// Builds a pipeline whose clients follow `config`.
    ///
    /// A client that cannot be constructed is disabled for every run: narratives use the
    /// unconfigured fallback and web enrichment yields no text.
    pub fn new(config: Config) -> Self {
        let narrator = narrator_or_unconfigured(NarrativeGenerator::from_config(&config), config.model);
        let enricher = match WebEnricher::from_config(&config) {
            Ok(enricher) => Some(enricher),
            Err(err) => {
                warn!("Web enrichment disabled: {}", err);
                None
            }
        };
        Self {
            config,
            narrator,
            enricher,
        }
    }

    /// Replaces the narrative generator.
    pub fn with_narrator(mut self, narrator: NarrativeGenerator) -> Self {
        self.narrator = narrator;
        self
    }

    /// Runs the whole pipeline and writes the document into a fresh run directory.
    pub fn run(&self, request: &ReportRequest) -> Result<GeneratedReport, PipelineError> {
        let product = sanitize(&request.product_name);
        let run_dir = self
            .config
            .output_dir
            .join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&run_dir).map_err(|source| PipelineError::RunDirectory {
            path: run_dir.clone(),
            source,
        })?;
        info!("Generating report for `{}` in {}", product, run_dir.display());

        let table = inventory::load_or_synthesize(request.upload.as_deref());
        let charts = charts::render(&table, &run_dir)?;
        let web_text = self.web_text(&product);
        let narratives = self.narrator.generate_all(&product);
        let date = Local::now().date_naive();

        let report = assemble(&product, &table, &charts, &web_text, &narratives, date);
        let path = write_report(&report, self.config.format, &run_dir)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(GeneratedReport {
            product,
            path,
            file_name,
            format: self.config.format,
            charts,
        })
    }

    fn web_text(&self, product: &str) -> String {
        let Some(enricher) = &self.enricher else {
            return String::new();
        };
        enricher.enrich(product).unwrap_or_else(|err| {
            warn!("Web enrichment for `{}` failed: {}", product, err);
            String::new()
        })
    }
}

fn narrator_or_unconfigured(
    narrator: Result<NarrativeGenerator, NarrativeError>,
    model: ModelChoice,
) -> NarrativeGenerator {
    narrator.unwrap_or_else(|err| {
        warn!("Narrative client disabled: {}", err);
        NarrativeGenerator::unconfigured(model)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn narrative_client_failure_degrades_to_fallbacks() {
        let narrator = narrator_or_unconfigured(
            Err(NarrativeError::Timeout(Duration::from_secs(5))),
            ModelChoice::Gpt4Turbo,
        );
        assert!(!narrator.is_configured());
        assert_eq!(
            narrator.generate("Executive Summary", "Cup"),
            "[Fallback] Executive Summary content for Cup would go here."
        );
    }

    #[test]
    fn configured_credential_builds_a_client() {
        let config = Config::default()
            .with_credential(Some("sk-test".to_owned()))
            .with_http_timeout(Duration::from_secs(2));
        let pipeline = ReportPipeline::new(config);
        assert!(pipeline.narrator.is_configured());
    }
}
