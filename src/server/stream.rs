//! WebSocket chunk stream.
//!
//! Every inbound data frame becomes one record, stamped with the stream's
//! fixed submitter and session ids and the time of receipt, and is answered
//! with a text acknowledgement.

use crate::defaults;
use crate::pipeline::{ChunkRecord, SubmissionGate, SubmitError};
use crate::server::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;

/// `GET /ws`
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let gate = state.pipeline.gate();
    ws.on_upgrade(move |socket| handle_socket(socket, gate))
}

async fn handle_socket(mut socket: WebSocket, gate: SubmissionGate) {
    tracing::debug!("stream connected");

    while let Some(message) = socket.recv().await {
        let payload = match message {
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Text(text)) => text.as_str().as_bytes().to_vec(),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stream read failed");
                break;
            }
        };

        let record = stream_record(payload);
        let id = record.id().to_string();
        let ack = ack_for(&id, gate.submit(record));

        if let Err(e) = socket.send(Message::Text(ack.into())).await {
            tracing::debug!(error = %e, "stream ack failed");
            break;
        }
    }

    tracing::debug!("stream closed");
}

/// Builds the record for one stream message.
pub fn stream_record(payload: Vec<u8>) -> ChunkRecord {
    ChunkRecord::new(
        defaults::STREAM_SUBMITTER_ID,
        defaults::STREAM_SESSION_ID,
        Utc::now().timestamp(),
        payload,
    )
    .with_generated_id()
}

/// Acknowledgement text for a submission outcome.
pub fn ack_for(id: &str, outcome: Result<(), SubmitError>) -> String {
    match outcome {
        Ok(()) => format!("chunk accepted: {id}"),
        Err(SubmitError::Backpressure) => "backpressure: queue full".to_string(),
        Err(SubmitError::Closed) => "pipeline closed".to_string(),
    }
}
