// src/pipeline/extract.rs

//! Dry extraction.

use crate::error::{AppError, Result};
use crate::models::{Config, SpecDocument};
use crate::services::{Extractor, HttpSpecSource, SpecSource};
use crate::utils::http;

/// Fetch the carrier and extract the current document.
///
/// Only the source settings are required; nothing is persisted.
pub async fn run_extract(config: &Config) -> Result<SpecDocument> {
    let url = config.source_url()?;
    let client = http::create_client(&config.source.user_agent, config.source.timeout_secs)?;
    let source = HttpSpecSource::new(client, url);
    let extractor = Extractor::from_config(&config.source)?;

    extract_from(&source, &extractor).await
}

pub(crate) async fn extract_from(
    source: &dyn SpecSource,
    extractor: &Extractor,
) -> Result<SpecDocument> {
    let carrier = source.fetch().await?;
    let doc = extractor.extract(&carrier)?;
    log::info!(
        "Extracted {} ({} operations, {})",
        doc.title().unwrap_or("<untitled>"),
        doc.operation_count(),
        doc.short_fingerprint()
    );
    Ok(doc)
}

/// Render a document the way it is shown to the user.
pub fn to_pretty_json(doc: &SpecDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;
    use tiny_http::{Response, Server};

    use super::*;

    #[tokio::test]
    async fn test_run_extract_from_http_source() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let body = r#"let options = {"swaggerDoc": {"openapi": "3.0.0", "paths": {}}};"#;
                let _ = request.respond(Response::from_string(body));
            }
        });

        let mut config = Config::default();
        config.source.url = Some(format!("http://{addr}/docs/swagger-ui-init.js"));

        let doc = run_extract(&config).await.unwrap();
        assert_eq!(doc.as_value(), &json!({ "openapi": "3.0.0", "paths": {} }));
        assert!(to_pretty_json(&doc).unwrap().contains("\"openapi\": \"3.0.0\""));
    }

    #[tokio::test]
    async fn test_run_extract_requires_source_url() {
        let err = run_extract(&Config::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
