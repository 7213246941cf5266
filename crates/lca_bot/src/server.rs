//! Single-page web front end for report generation.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use lca_report::{Config, ModelChoice, ReportPipeline, ReportRequest};
use tower_http::trace::TraceLayer;

/// Product name pre-filled in the form.
pub const DEFAULT_PRODUCT: &str = "Electric Toothbrush";

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn create_router(config: Config) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report", post(generate_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(config))
}

/// Renders the upload form.
pub fn index_page(selected: ModelChoice) -> String {
    let options: String = ModelChoice::ALL
        .iter()
        .map(|model| {
            let marker = if *model == selected { " selected" } else { "" };
            format!("<option value=\"{model}\"{marker}>{model}</option>")
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>LCA Report Generator</title></head>
<body>
<h1>LCA Report Generator</h1>
<form action="/report" method="post" enctype="multipart/form-data">
<p><label>Upload inventory data (CSV) <input type="file" name="dataset" accept=".csv"></label></p>
<p><label>Product name <input type="text" name="product" value="{DEFAULT_PRODUCT}"></label></p>
<p><label>Language model <select name="model">{options}</select></label></p>
<p><button type="submit">Generate report</button></p>
</form>
</body>
</html>
"#
    )
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(index_page(state.config.model))
}

async fn generate_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut product = None;
    let mut upload = None;
    let mut model = state.config.model;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("product") => product = Some(field.text().await?),
            Some("dataset") => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload = Some(bytes.to_vec());
                }
            }
            Some("model") => {
                let value = field.text().await?;
                model = value.parse::<ModelChoice>().map_err(|err| AppError::bad_request(anyhow!(err)))?;
            }
            _ => {}
        }
    }

    let request = ReportRequest::new(product.unwrap_or_else(|| DEFAULT_PRODUCT.to_owned()))
        .with_upload(upload);
    let config = state.config.as_ref().clone().with_model(model);

    tracing::info!(product = %request.product_name, %model, "generating report");
    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        Ok(ReportPipeline::new(config).run(&request)?)
    })
    .await
    .context("report task panicked")??;

    let bytes = tokio::fs::read(&report.path)
        .await
        .with_context(|| format!("failed to read {}", report.path.display()))?;
    let disposition = HeaderValue::from_bytes(
        format!("attachment; filename=\"{}\"", report.file_name).as_bytes(),
    )
    .context("report file name is not a valid header value")?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(report.mime_type())),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Handler error rendered as a plain-text response.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn bad_request(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(status = %self.status, "request failed: {:#}", self.error);
        (self.status, format!("Report generation failed: {:#}", self.error)).into_response()
    }
}
