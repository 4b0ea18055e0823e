//! WebSocket transport for the live session protocol.
//!
//! Speaks the wire envelope of the remote streaming API: a one-time
//! `setup` frame, then interleaved realtime-media / text / tool-response
//! frames outbound and demuxed server events inbound.

use crate::protocol::{ClientMessage, ServerEvent, SessionSetup};
use crate::transport::{LiveConnection, LiveTransport, OutboundSink};
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use voxlink_core::{ToolCall, TransportError, TransportErrorKind, VoxlinkError, VoxlinkResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Inbound event buffer; the engine drains continuously, so this only
/// absorbs short bursts.
const EVENT_BUFFER: usize = 256;

/// WebSocket-backed [`LiveTransport`].
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Creates a transport that dials the given `wss://` endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

fn classify_ws_error(e: &WsError) -> TransportErrorKind {
    match e {
        WsError::Io(_) | WsError::Tls(_) => TransportErrorKind::Network,
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportErrorKind::Closed,
        WsError::Http(response) => match response.status().as_u16() {
            401 | 403 => TransportErrorKind::PermissionDenied,
            400 | 422 => TransportErrorKind::InvalidConfig,
            502 | 503 | 504 => TransportErrorKind::Unavailable,
            _ => TransportErrorKind::Other,
        },
        WsError::Protocol(_) => TransportErrorKind::Aborted,
        _ => TransportErrorKind::Other,
    }
}

#[async_trait]
impl LiveTransport for WsTransport {
    async fn connect(&self, setup: &SessionSetup) -> Result<LiveConnection, TransportError> {
        let (ws, _response) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::new(classify_ws_error(&e), e.to_string()))?;
        info!(url = %self.url, "websocket open");

        let (mut sink, mut stream) = ws.split();

        let setup_frame = json!({ "setup": setup_payload(setup) });
        sink.send(Message::Text(setup_frame.to_string()))
            .await
            .map_err(|e| TransportError::new(classify_ws_error(&e), e.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let parsed: Value = match serde_json::from_str(&text) {
                            Ok(v) => v,
                            Err(e) => {
                                warn!(error = %e, "dropping unparseable server frame");
                                continue;
                            }
                        };
                        for event in parse_server_message(&parsed) {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("server closed the websocket");
                        let _ = event_tx.send(ServerEvent::Closed).await;
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        let _ = event_tx.send(ServerEvent::Failed(e.to_string())).await;
                        return;
                    }
                }
            }
            let _ = event_tx.send(ServerEvent::Closed).await;
        });

        Ok(LiveConnection {
            sender: Arc::new(WsSender {
                sink: Mutex::new(sink),
            }),
            events: event_rx,
        })
    }
}

struct WsSender {
    sink: Mutex<WsSink>,
}

#[async_trait]
impl OutboundSink for WsSender {
    async fn send(&self, message: ClientMessage) -> VoxlinkResult<()> {
        let frame = client_frame(&message);
        self.sink
            .lock()
            .await
            .send(Message::Text(frame.to_string()))
            .await
            .map_err(|e| {
                VoxlinkError::Transport(TransportError::new(
                    classify_ws_error(&e),
                    e.to_string(),
                ))
            })
    }

    async fn close(&self) -> VoxlinkResult<()> {
        self.sink.lock().await.close().await.map_err(|e| {
            VoxlinkError::Transport(TransportError::new(classify_ws_error(&e), e.to_string()))
        })
    }
}

fn setup_payload(setup: &SessionSetup) -> Value {
    json!({
        "responseModalities": setup.response_modalities,
        "inputAudioTranscription": if setup.input_audio_transcription { json!({}) } else { Value::Null },
        "outputAudioTranscription": if setup.output_audio_transcription { json!({}) } else { Value::Null },
        "speechConfig": {
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": setup.voice } }
        },
        "systemInstruction": setup.system_instruction,
        "tools": [{ "functionDeclarations": setup.tool_declarations }],
    })
}

fn client_frame(message: &ClientMessage) -> Value {
    match message {
        ClientMessage::Realtime { media } => json!({
            "realtimeInput": { "media": { "data": media.data, "mimeType": media.mime_type } }
        }),
        ClientMessage::Text { text } => json!({
            "realtimeInput": { "text": text }
        }),
        ClientMessage::ToolResponse { id, name, response } => json!({
            "toolResponse": {
                "functionResponses": { "id": id, "name": name, "response": response }
            }
        }),
    }
}

/// Demuxes one server frame into zero or more events, preserving the
/// order fields appear in the envelope.
fn parse_server_message(frame: &Value) -> Vec<ServerEvent> {
    let mut events = Vec::new();

    if let Some(calls) = frame["toolCall"]["functionCalls"].as_array() {
        let batch: Vec<ToolCall> = calls
            .iter()
            .map(|c| ToolCall {
                id: c["id"].as_str().unwrap_or_default().to_string(),
                name: c["name"].as_str().unwrap_or_default().to_string(),
                arguments: c.get("args").cloned().unwrap_or(Value::Null),
            })
            .collect();
        if !batch.is_empty() {
            events.push(ServerEvent::ToolCalls(batch));
        }
    }

    let content = &frame["serverContent"];
    if content.is_object() {
        if let Some(chunks) = content["groundingMetadata"]["groundingChunks"].as_array() {
            events.push(ServerEvent::Grounding(Value::Array(chunks.clone())));
        }
        if let Some(text) = content["inputTranscription"]["text"].as_str() {
            events.push(ServerEvent::InputTranscription(text.to_string()));
        }
        if let Some(text) = content["outputTranscription"]["text"].as_str() {
            events.push(ServerEvent::OutputTranscription(text.to_string()));
        }
        if let Some(data) = content["modelTurn"]["parts"][0]["inlineData"]["data"].as_str() {
            events.push(ServerEvent::AudioChunk(data.to_string()));
        }
        if content["interrupted"].as_bool() == Some(true) {
            events.push(ServerEvent::Interrupted);
        }
        if content["turnComplete"].as_bool() == Some(true) {
            events.push(ServerEvent::TurnComplete);
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxlink_media::MediaChunk;

    #[test]
    fn transcription_and_audio_frames_demux_in_order() {
        let frame = json!({
            "serverContent": {
                "inputTranscription": { "text": "hel" },
                "outputTranscription": { "text": "hi " },
                "modelTurn": { "parts": [ { "inlineData": { "data": "AAAA" } } ] }
            }
        });
        let events = parse_server_message(&frame);
        assert_eq!(
            events,
            vec![
                ServerEvent::InputTranscription("hel".into()),
                ServerEvent::OutputTranscription("hi ".into()),
                ServerEvent::AudioChunk("AAAA".into()),
            ]
        );
    }

    #[test]
    fn control_signals_demux() {
        let frame = json!({
            "serverContent": { "interrupted": true, "turnComplete": true }
        });
        assert_eq!(
            parse_server_message(&frame),
            vec![ServerEvent::Interrupted, ServerEvent::TurnComplete]
        );
    }

    #[test]
    fn tool_call_batches_keep_order() {
        let frame = json!({
            "toolCall": {
                "functionCalls": [
                    { "id": "a", "name": "search_web", "args": { "query": "x" } },
                    { "id": "b", "name": "check_inventory", "args": { "sku": "GEM-001" } }
                ]
            }
        });
        let events = parse_server_message(&frame);
        let ServerEvent::ToolCalls(batch) = &events[0] else {
            panic!("expected a tool call batch");
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, "a");
        assert_eq!(batch[1].name, "check_inventory");
    }

    #[test]
    fn unknown_frames_yield_nothing() {
        assert!(parse_server_message(&json!({ "keepalive": true })).is_empty());
        assert!(parse_server_message(&json!("just a string")).is_empty());
    }

    #[test]
    fn client_frames_match_the_wire_shapes() {
        let realtime = client_frame(&ClientMessage::Realtime {
            media: MediaChunk {
                data: "QUJD".into(),
                mime_type: "audio/pcm;rate=16000".into(),
            },
        });
        assert_eq!(realtime["realtimeInput"]["media"]["mimeType"], "audio/pcm;rate=16000");

        let text = client_frame(&ClientMessage::Text { text: "hello".into() });
        assert_eq!(text["realtimeInput"]["text"], "hello");

        let tool = client_frame(&ClientMessage::ToolResponse {
            id: "c1".into(),
            name: "search_web".into(),
            response: json!({ "result": "ok" }),
        });
        assert_eq!(tool["toolResponse"]["functionResponses"]["id"], "c1");
    }
}
