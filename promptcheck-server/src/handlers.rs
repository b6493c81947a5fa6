//! HTTP route handlers.
//!
//! Both pipeline endpoints return a server-sent-event stream: one `log`
//! message per progress event, then exactly one terminal `complete` or
//! `error` message, after which the stream ends. The pipeline runs in a
//! spawned task; an abandoned connection only discards its results, it
//! does not cancel the run.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use futures_util::Stream;
use promptcheck_eval::{Pipeline, PipelineReport, PipelineRequest, ProgressEvent, ProgressReporter};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::AppState;

/// One message on the outbound event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    /// A progress event from the running pipeline
    Log { log: ProgressEvent },
    /// Terminal: the pipeline finished and this is its report
    Complete { evaluation: Box<PipelineReport> },
    /// Terminal: the pipeline aborted
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl StreamMessage {
    fn is_terminal(&self) -> bool {
        matches!(self, StreamMessage::Complete { .. } | StreamMessage::Error { .. })
    }
}

/// Which pipeline entry point a request drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Evaluate,
    Optimize,
}

/// POST /api/evaluate - evaluate a prompt without optimizing it
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PipelineRequest>,
) -> impl IntoResponse {
    stream_response(spawn_pipeline(state, request, Mode::Evaluate))
}

/// POST /api/optimize - evaluate, optimize, and re-evaluate a prompt
pub async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PipelineRequest>,
) -> impl IntoResponse {
    stream_response(spawn_pipeline(state, request, Mode::Optimize))
}

/// GET /health - liveness check
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Run the pipeline in a background task, returning the message channel
/// the SSE stream drains.
///
/// Log messages are forwarded as the pipeline emits them; the terminal
/// message is sent only after the forwarder has drained every buffered
/// event, so a consumer never sees `complete` before the last `log`.
fn spawn_pipeline(
    state: Arc<AppState>,
    request: PipelineRequest,
    mode: Mode,
) -> mpsc::UnboundedReceiver<StreamMessage> {
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let forward_tx = msg_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if forward_tx.send(StreamMessage::Log { log: event }).is_err() {
                    break;
                }
            }
        });

        let mut pipeline = Pipeline::new(state.service.clone());
        if let Some(sink) = &state.sink {
            pipeline = pipeline.with_sink(sink.clone());
        }
        let mut reporter = ProgressReporter::with_subscriber(event_tx);
        let outcome = match mode {
            Mode::Evaluate => pipeline.evaluate(request, &mut reporter).await,
            Mode::Optimize => pipeline.run(request, &mut reporter).await,
        };

        // Dropping the reporter closes the event channel; waiting for the
        // forwarder keeps log messages ahead of the terminal message.
        drop(reporter);
        let _ = forwarder.await;

        let message = match outcome {
            Ok(report) => StreamMessage::Complete {
                evaluation: Box::new(report),
            },
            Err(e) => {
                log::warn!("pipeline aborted: {}", e);
                StreamMessage::Error {
                    error: e.to_string(),
                    details: e.is_configuration().then(|| {
                        "request was rejected before any provider call".to_string()
                    }),
                }
            }
        };
        let _ = msg_tx.send(message);
    });

    msg_rx
}

/// Turn the message channel into an SSE response that ends after the
/// terminal message.
fn stream_response(
    mut messages: mpsc::UnboundedReceiver<StreamMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(message) = messages.recv().await {
            let terminal = message.is_terminal();
            match Event::default().json_data(&message) {
                Ok(event) => yield Ok(event),
                Err(e) => {
                    log::error!("failed to serialize stream message: {}", e);
                    break;
                }
            }
            if terminal {
                break;
            }
        }
    };
    Sse::new(stream)
}
