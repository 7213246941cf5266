//! Life cycle assessment report generation.
//!
//! A run loads (or synthesises) an inventory table, renders one bar chart per metric column,
//! collects web snippets and language-model narratives for the product, and writes a DOCX or
//! PDF document.  [`pipeline::ReportPipeline`] wires the steps together.

pub mod assemble;
pub mod charts;
pub mod config;
pub mod docx;
pub mod elements;
pub mod fonts;
pub mod intake;
pub mod inventory;
pub mod model;
pub mod narrative;
pub mod pdf;
pub mod pipeline;
pub mod richtext;
pub mod web;

pub use config::{Config, ModelChoice, ReportFormat};
pub use pipeline::{GeneratedReport, PipelineError, ReportPipeline, ReportRequest};
