use std::convert::Infallible;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use log::{error, info};
use serde::Deserialize;

use crate::config::{Config, ResponseMode};
use crate::error::ApiError;
use crate::{Message, Segment, answer, transcript};

#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub config: Config,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transcript", get(get_transcript))
        .route("/answer", post(post_answer))
        .with_state(state)
}

/// Bind and run the API server until shutdown.
pub async fn serve(state: AppState) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(&state.config.bind).await?;
    info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TranscriptQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// `GET /transcript?videoId=<id>` — the raw timed segments for a video.
async fn get_transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<Vec<Segment>>, ApiError> {
    let video_id = query
        .video_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Video ID is required".to_string()))?;

    info!("Fetching transcript for video {video_id}");
    let segments = transcript::fetch_segments(&state.client, &video_id, &state.config.lang).await?;
    if transcript::normalize(&segments).is_empty() {
        return Err(ApiError::EmptyResult);
    }
    Ok(Json(segments))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    messages: Option<Vec<Message>>,
    transcript: Option<String>,
}

/// `POST /answer` — answer the latest question in `messages` from the
/// transcript. Responds with `{"answer": ...}` in buffered mode or a
/// chunked text body in streaming mode.
async fn post_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Response, ApiError> {
    let missing = || ApiError::InvalidInput("Messages and transcript are required".to_string());
    let messages = request.messages.filter(|m| !m.is_empty()).ok_or_else(missing)?;
    let transcript = request.transcript.filter(|t| !t.trim().is_empty()).ok_or_else(missing)?;

    info!("Answering question ({} history messages)", messages.len());

    match state.config.response_mode {
        ResponseMode::Buffered => {
            let answer =
                answer::generate(&state.client, &state.config.model, &messages, &transcript).await?;
            Ok(Json(serde_json::json!({ "answer": answer })).into_response())
        }
        ResponseMode::Streaming => {
            let (tx, mut rx) = futures::channel::mpsc::unbounded::<Result<Bytes, Infallible>>();
            let client = state.client.clone();
            let model = state.config.model.clone();

            let generation = tokio::spawn(async move {
                let result = answer::generate_streaming(
                    &client,
                    &model,
                    &messages,
                    &transcript,
                    |chunk| {
                        let _ = tx.unbounded_send(Ok(Bytes::copy_from_slice(chunk.as_bytes())));
                    },
                )
                .await;
                // The sender drops here either way, which ends the body
                if let Err(ref err) = result {
                    error!("Streaming answer failed: {err}");
                }
                result
            });

            // Hold the status line until the first token arrives, so a
            // failure before any output still maps to a 500. A later error
            // can only truncate the already-committed body.
            match rx.next().await {
                Some(first) => Ok((
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    Body::from_stream(futures::stream::iter([first]).chain(rx)),
                )
                    .into_response()),
                None => match generation.await {
                    Ok(Err(err)) => Err(err),
                    Ok(Ok(_)) => Err(ApiError::upstream(
                        "Failed to generate answer",
                        "completion stream carried no content",
                    )),
                    Err(err) => Err(ApiError::upstream("Failed to generate answer", err.to_string())),
                },
            }
        }
    }
}
