//! HTTP server exposing the evaluation pipeline.
//!
//! Provider credentials come from the environment at startup. A missing
//! primary key is a startup error; a missing fallback key just disables
//! fallback.

mod handlers;
mod routes;

use axum::Router;
use promptcheck_core::{CompletionConfig, CompletionService, HttpProvider};
use promptcheck_eval::{HttpRunSink, RunSink};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub service: CompletionService,
    pub sink: Option<Arc<dyn RunSink>>,
}

/// Build the completion service from environment variables.
///
/// `OPENAI_API_KEY` is required. `OPENAI_BASE_URL` / `OPENAI_MODEL` override
/// the primary defaults; `FALLBACK_API_KEY` (with `FALLBACK_BASE_URL` /
/// `FALLBACK_MODEL`) enables the fallback provider.
fn service_from_env() -> Result<CompletionService, String> {
    let primary_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| "OPENAI_API_KEY is not set".to_string())?;
    let primary_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let primary_model =
        std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    let primary = Arc::new(HttpProvider::new(
        "primary",
        primary_url,
        primary_key,
        primary_model,
    ));
    let mut service = CompletionService::new(primary, CompletionConfig::default());

    match std::env::var("FALLBACK_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let url = std::env::var("FALLBACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
            let model = std::env::var("FALLBACK_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string());
            service = service.with_fallback(Arc::new(HttpProvider::new(
                "fallback", url, key, model,
            )));
            log::info!("Fallback provider enabled");
        }
        _ => log::info!("FALLBACK_API_KEY not set, fallback disabled"),
    }

    Ok(service)
}

/// Build the trace sink from environment variables, when configured.
///
/// `TRACE_SINK_URL` and `TRACE_SINK_API_KEY` must both be set; with only
/// one present a warning is logged and recording stays disabled.
fn sink_from_env() -> Option<Arc<dyn RunSink>> {
    match (std::env::var("TRACE_SINK_URL"), std::env::var("TRACE_SINK_API_KEY")) {
        (Ok(url), Ok(key)) if !url.is_empty() && !key.is_empty() => {
            log::info!("Trace sink enabled at {}", url);
            Some(Arc::new(HttpRunSink::new(url, key)))
        }
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            log::warn!("Trace sink needs both TRACE_SINK_URL and TRACE_SINK_API_KEY; recording disabled");
            None
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let service = match service_from_env() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(AppState {
        service,
        sink: sink_from_env(),
    });
    let app = Router::new().merge(routes::routes()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
