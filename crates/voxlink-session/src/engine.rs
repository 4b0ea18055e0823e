//! The session engine: lifecycle state machine, media pumps, inbound
//! dispatch, and tool-call round-trips over one live connection.

use crate::capture::{CaptureRequest, MediaDevices};
use crate::config::SessionConfig;
use crate::history::SnapshotStore;
use crate::instructions::build_system_instruction;
use crate::protocol::{ClientMessage, ServerEvent, SessionSetup};
use crate::security::SecurityContext;
use crate::sensors::SensorProvider;
use crate::transport::{Connector, LiveTransport, OutboundSink, RetryPolicy};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use voxlink_core::{
    ConversationSession, DocumentData, EngineEvent, MissionTask, SecurityStatus, ToolCall,
    ToolResult, TranscriptTurn, VoxlinkError, VoxlinkResult,
};
use voxlink_media::ambient::brown_noise;
use voxlink_media::codec::{decode_pcm_chunk, encode_pcm_chunk, jpeg_chunk, OUTPUT_SAMPLE_RATE};
use voxlink_media::{NetworkQuality, PlaybackScheduler, StreamProfile, VideoFeed};
use voxlink_tools::audit::{AuditEntry, AuditOutcome, AuditSink};
use voxlink_tools::{
    AmbientAction, ClientHooks, GithubConfig, MissionOp, SystemStatus, ToolArgs, ToolContext,
    ToolRouter,
};

/// Ambient loop buffer length in seconds.
const AMBIENT_SECONDS: f64 = 2.0;

/// Declarations for the session-local tools the engine intercepts.
///
/// Routed handlers declare themselves through the router; these have no
/// handler entry, so the engine appends them to the catalog at session
/// open. `generate_chart` is absent because its routed acknowledgement
/// handler already declares it.
fn intercepted_declarations() -> Vec<Value> {
    vec![
        json!({
            "name": "display_emotion",
            "description": "Display a detected-emotion label to the user alongside an empathetic spoken response.",
            "parameters": {
                "type": "object",
                "properties": {
                    "emotion": { "type": "string", "description": "The detected emotion, e.g. joy, sadness, stress." },
                    "response": { "type": "string", "description": "The empathetic response to speak." }
                },
                "required": ["emotion", "response"]
            }
        }),
        json!({
            "name": "confirm_biometric_identity",
            "description": "Report the result of visually verifying the person on camera against the registered description of the authorized user.",
            "parameters": {
                "type": "object",
                "properties": {
                    "match": { "type": "boolean", "description": "Whether the person matches the authorized user." }
                },
                "required": ["match"]
            }
        }),
        json!({
            "name": "play_ambient_audio",
            "description": "Start or stop a looping ambient focus noise under the conversation.",
            "parameters": {
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["start", "stop"] }
                },
                "required": ["action"]
            }
        }),
        json!({
            "name": "update_semantic_memory",
            "description": "Save a durable user preference or personal detail to long-lived memory.",
            "parameters": {
                "type": "object",
                "properties": {
                    "new_preference": { "type": "string", "description": "The preference or detail to remember." }
                },
                "required": ["new_preference"]
            }
        }),
        json!({
            "name": "mission_log",
            "description": "Manage the session mission log: add, complete, remove, or list tasks.",
            "parameters": {
                "type": "object",
                "properties": {
                    "op": { "type": "string", "enum": ["add", "complete", "remove", "list"] },
                    "description": { "type": "string", "description": "Task description, required for add." },
                    "id": { "type": "string", "description": "Task id, required for complete and remove." }
                },
                "required": ["op"]
            }
        }),
    ]
}

/// Lifecycle states of the one live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No connection, no media captured.
    Idle,
    /// Media acquisition and connection (with retries) in progress.
    Connecting,
    /// Connected; pumps running, inbound events dispatched.
    Open,
    /// Teardown in progress.
    Closing,
}

/// Everything the engine needs injected. All external boundaries are
/// traits so tests run against scripted implementations.
pub struct EngineDeps {
    /// Connection factory.
    pub transport: Arc<dyn LiveTransport>,
    /// Local media devices.
    pub devices: Arc<dyn MediaDevices>,
    /// Routed tool registry.
    pub router: Arc<ToolRouter>,
    /// Audit trail for intercepted tool dispatches.
    pub audit: Arc<dyn AuditSink>,
    /// Interrupted-session snapshot storage.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Output audio scheduler.
    pub scheduler: Arc<PlaybackScheduler>,
    /// Ambient sensor provider, polled per tool dispatch.
    pub sensors: Arc<dyn SensorProvider>,
    /// Client-side effect hooks for device tools.
    pub hooks: Arc<dyn ClientHooks>,
    /// Connect-phase retry bounds.
    pub retry: RetryPolicy,
}

struct ActiveSession {
    sender: Arc<dyn OutboundSink>,
    feed: Option<Arc<VideoFeed>>,
    security: Arc<SecurityContext>,
    document: Option<DocumentData>,
    project_dir: Option<PathBuf>,
    github: Option<GithubConfig>,
    vision_enabled: bool,
    network: NetworkQuality,
    coaching_mode: bool,
    user_transcript: String,
    assistant_transcript: String,
    emotion: Option<String>,
    turns: Vec<TranscriptTurn>,
    missions: Vec<MissionTask>,
    tasks: Vec<JoinHandle<()>>,
}

struct EngineState {
    lifecycle: Lifecycle,
    active: Option<ActiveSession>,
}

/// The session lifecycle and streaming-media orchestration engine.
///
/// Owns the connection and all media handles exclusively. Exactly one
/// session is live at a time; `start()` while one is active forces a
/// stop-then-start. Every spawned pump captures the generation token
/// current at its creation and stands down once a newer session exists.
pub struct SessionEngine {
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn MediaDevices>,
    router: Arc<ToolRouter>,
    audit: Arc<dyn AuditSink>,
    snapshots: Arc<dyn SnapshotStore>,
    scheduler: Arc<PlaybackScheduler>,
    sensors: Arc<dyn SensorProvider>,
    hooks: Arc<dyn ClientHooks>,
    retry: RetryPolicy,
    events: mpsc::UnboundedSender<EngineEvent>,
    generation: AtomicU64,
    state: Mutex<EngineState>,
}

impl SessionEngine {
    /// Creates an idle engine and the event stream it reports through.
    pub fn new(deps: EngineDeps) -> (Arc<Self>, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            transport: deps.transport,
            devices: deps.devices,
            router: deps.router,
            audit: deps.audit,
            snapshots: deps.snapshots,
            scheduler: deps.scheduler,
            sensors: deps.sensors,
            hooks: deps.hooks,
            retry: deps.retry,
            events: tx,
            generation: AtomicU64::new(0),
            state: Mutex::new(EngineState {
                lifecycle: Lifecycle::Idle,
                active: None,
            }),
        });
        (engine, rx)
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// The security gate state of the live session, if one exists.
    pub fn security_status(&self) -> Option<SecurityStatus> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|a| a.security.status())
    }

    /// Whether the live session is currently streaming display capture.
    pub fn is_screen_sharing(&self) -> bool {
        self.state
            .lock()
            .active
            .as_ref()
            .and_then(|a| a.feed.as_ref())
            .is_some_and(|f| f.is_sharing())
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn fail_to_idle(&self, message: String) {
        self.state.lock().lifecycle = Lifecycle::Idle;
        self.emit(EngineEvent::Error { message });
    }

    /// Opens a new live session.
    ///
    /// Fails fast when offline, forces a clean stop of any prior
    /// session, acquires media, then connects with bounded retry. On any
    /// failure the engine is back in `Idle` with no leaked handles.
    pub async fn start(self: &Arc<Self>, config: SessionConfig) -> VoxlinkResult<()> {
        if !config.is_online {
            let message = "Cannot start session: you are offline.".to_string();
            self.emit(EngineEvent::Error {
                message: message.clone(),
            });
            return Err(VoxlinkError::Session(message));
        }

        self.stop(false).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().lifecycle = Lifecycle::Connecting;
        self.emit(EngineEvent::Connecting);

        let profile = StreamProfile::for_quality(config.network);
        let request = CaptureRequest {
            vision: config.vision_enabled,
            profile,
        };
        let media = match self.devices.acquire(&request).await {
            Ok(media) => media,
            Err(e) => {
                self.fail_to_idle(format!("Media acquisition failed: {e}"));
                return Err(e);
            }
        };
        let feed = media.camera.map(|camera| Arc::new(VideoFeed::new(camera)));

        let mut tool_declarations = intercepted_declarations();
        tool_declarations.extend(self.router.declarations());
        let setup = SessionSetup {
            response_modalities: vec!["AUDIO".to_string()],
            input_audio_transcription: true,
            output_audio_transcription: true,
            voice: config.voice.clone(),
            system_instruction: build_system_instruction(&config),
            tool_declarations,
        };
        let connector = Connector::new(self.retry.clone());
        let connection = match connector.connect(self.transport.as_ref(), &setup).await {
            Ok(connection) => connection,
            Err(e) => {
                // `media` drops here, releasing whatever was acquired.
                self.fail_to_idle(format!("Session error: {e}"));
                return Err(e.into());
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            let _ = connection.sender.close().await;
            return Err(VoxlinkError::Session("start superseded".to_string()));
        }

        self.scheduler.set_gain(config.volume);

        let security = Arc::new(SecurityContext::new(config.face_reference.clone()));
        let resumed = config.resumed_turns.clone();
        let sender = connection.sender.clone();

        let mut tasks = Vec::with_capacity(3);
        tasks.push(self.spawn_mic_pump(generation, media.mic, sender.clone()));
        if let Some(feed) = &feed {
            tasks.push(self.spawn_frame_sampler(generation, feed.clone(), profile, sender.clone()));
        }
        tasks.push(self.spawn_inbound_loop(generation, connection.events));

        {
            let mut state = self.state.lock();
            state.active = Some(ActiveSession {
                sender,
                feed,
                security,
                document: config.document.clone(),
                project_dir: config.project_dir.clone(),
                github: config.github.clone(),
                vision_enabled: config.vision_enabled,
                network: config.network,
                coaching_mode: config.coaching_mode,
                user_transcript: String::new(),
                assistant_transcript: String::new(),
                emotion: None,
                turns: resumed.clone(),
                missions: Vec::new(),
                tasks,
            });
            state.lifecycle = Lifecycle::Open;
        }

        for turn in resumed {
            self.emit(EngineEvent::TurnCommitted { turn });
        }
        info!(generation, "session open");
        self.emit(EngineEvent::Started);
        Ok(())
    }

    /// Tears the live session down.
    ///
    /// Idempotent: calling on an idle engine changes nothing. Every
    /// teardown step is independently guarded so partial initialization
    /// never prevents the rest. Returns the finished transcript as a
    /// history record when `save_history` is set and turns exist.
    pub async fn stop(&self, save_history: bool) -> VoxlinkResult<Option<ConversationSession>> {
        let active = {
            let mut state = self.state.lock();
            if state.active.is_none() && state.lifecycle == Lifecycle::Idle {
                return Ok(None);
            }
            state.lifecycle = Lifecycle::Closing;
            state.active.take()
        };

        // Invalidate in-flight callbacks from this session immediately.
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut record = None;
        if let Some(mut active) = active {
            for task in active.tasks.drain(..) {
                task.abort();
            }

            self.scheduler.shutdown();

            if save_history {
                let user = std::mem::take(&mut active.user_transcript);
                let assistant = std::mem::take(&mut active.assistant_transcript);
                let user = user.trim().to_string();
                let assistant = assistant.trim().to_string();
                if !user.is_empty() || !assistant.is_empty() {
                    let mut turn = TranscriptTurn::new(user, assistant);
                    turn.emotion = active.emotion.take();
                    active.turns.push(turn);
                }
            }

            if let Err(e) = active.sender.close().await {
                warn!(error = %e, "error closing session");
            }
            active.security.teardown();

            if save_history && !active.turns.is_empty() {
                record = Some(ConversationSession::from_turns(active.turns));
            }
        }

        if let Err(e) = self.snapshots.clear().await {
            warn!(error = %e, "failed to clear session snapshot");
        }

        self.state.lock().lifecycle = Lifecycle::Idle;
        self.emit(EngineEvent::Stopped);
        Ok(record)
    }

    /// Sends free-text input over the live session. The text appears in
    /// the transcript immediately; delivery is fire-and-forget.
    pub async fn send_text(&self, message: &str) -> VoxlinkResult<()> {
        let text = message.trim();
        if text.is_empty() {
            return Ok(());
        }
        let (sender, turn) = {
            let mut state = self.state.lock();
            let active = state
                .active
                .as_mut()
                .ok_or_else(|| VoxlinkError::Session("no live session".to_string()))?;
            let turn = TranscriptTurn::new(text, "");
            active.turns.push(turn.clone());
            (active.sender.clone(), turn)
        };
        self.emit(EngineEvent::TurnCommitted { turn });
        if let Err(e) = sender
            .send(ClientMessage::Text {
                text: text.to_string(),
            })
            .await
        {
            warn!(error = %e, "failed to send text input");
        }
        Ok(())
    }

    /// Applies a new playback volume to all in-flight and future audio.
    pub fn set_volume(&self, volume: f32) {
        self.scheduler.set_gain(volume);
    }

    /// Swaps the outgoing video between camera and display capture
    /// without touching the microphone or the connection. Returns the
    /// new sharing state.
    pub async fn toggle_screen_share(&self) -> VoxlinkResult<bool> {
        let feed = {
            let state = self.state.lock();
            state
                .active
                .as_ref()
                .and_then(|a| a.feed.clone())
                .ok_or_else(|| VoxlinkError::Session("no video track in this session".to_string()))?
        };
        if feed.is_sharing() {
            feed.restore_camera();
            self.emit(EngineEvent::ScreenShare { active: false });
            Ok(false)
        } else {
            let display = self.devices.capture_display().await?;
            feed.set_display(display);
            self.emit(EngineEvent::ScreenShare { active: true });
            Ok(true)
        }
    }

    fn spawn_mic_pump(
        self: &Arc<Self>,
        generation: u64,
        mut mic: mpsc::Receiver<Vec<f32>>,
        sender: Arc<dyn OutboundSink>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = mic.recv().await {
                if engine.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                let chunk = encode_pcm_chunk(&frame);
                if let Err(e) = sender.send(ClientMessage::Realtime { media: chunk }).await {
                    debug!(error = %e, "dropping mic chunk");
                }
            }
        })
    }

    fn spawn_frame_sampler(
        self: &Arc<Self>,
        generation: u64,
        feed: Arc<VideoFeed>,
        profile: StreamProfile,
        sender: Arc<dyn OutboundSink>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(profile.frame_interval_ms()));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if engine.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                if feed.reconcile() {
                    engine.emit(EngineEvent::ScreenShare { active: false });
                }
                // No current frame (mid camera swap) is not an error.
                let Some(frame) = feed.grab_frame() else {
                    continue;
                };
                let chunk = jpeg_chunk(&frame);
                if let Err(e) = sender.send(ClientMessage::Realtime { media: chunk }).await {
                    debug!(error = %e, "dropping video frame");
                }
            }
        })
    }

    fn spawn_inbound_loop(
        self: &Arc<Self>,
        generation: u64,
        mut events: mpsc::Receiver<ServerEvent>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if engine.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                match event {
                    ServerEvent::Closed => {
                        info!("server closed the session");
                        Self::spawn_teardown(&engine);
                        break;
                    }
                    ServerEvent::Failed(message) => {
                        warn!(%message, "session connection failed");
                        engine.emit(EngineEvent::Error {
                            message: format!("Session error: {message}"),
                        });
                        Self::spawn_teardown(&engine);
                        break;
                    }
                    other => engine.handle_server_event(other).await,
                }
            }
        })
    }

    async fn handle_server_event(self: &Arc<Self>, event: ServerEvent) {
        match event {
            ServerEvent::InputTranscription(text) => {
                let full = {
                    let mut state = self.state.lock();
                    let Some(active) = state.active.as_mut() else {
                        return;
                    };
                    active.user_transcript.push_str(&text);
                    active.user_transcript.clone()
                };
                self.emit(EngineEvent::UserTranscript { text: full });
            }
            ServerEvent::OutputTranscription(text) => {
                let full = {
                    let mut state = self.state.lock();
                    let Some(active) = state.active.as_mut() else {
                        return;
                    };
                    active.assistant_transcript.push_str(&text);
                    active.assistant_transcript.clone()
                };
                self.emit(EngineEvent::AssistantTranscript { text: full });
            }
            ServerEvent::AudioChunk(data) => {
                match decode_pcm_chunk(&data, OUTPUT_SAMPLE_RATE) {
                    Ok(buffer) => {
                        self.scheduler.schedule(buffer);
                    }
                    // A bad chunk is dropped; the session lives on.
                    Err(e) => warn!(error = %e, "dropping undecodable audio chunk"),
                }
            }
            ServerEvent::Interrupted => {
                self.scheduler.interrupt();
            }
            ServerEvent::TurnComplete => {
                self.finalize_turn().await;
            }
            ServerEvent::ToolCalls(batch) => {
                self.handle_tool_calls(batch).await;
            }
            ServerEvent::Grounding(chunks) => {
                self.emit(EngineEvent::Grounding { chunks });
            }
            // Terminal events are handled by the inbound loop itself.
            ServerEvent::Closed | ServerEvent::Failed(_) => {}
        }
    }

    /// Runs the full stop from a task other than the inbound loop, so
    /// aborting that loop's handle cannot cut teardown short.
    fn spawn_teardown(engine: &Arc<Self>) {
        let engine = Arc::clone(engine);
        tokio::spawn(async move {
            if let Err(e) = engine.stop(false).await {
                warn!(error = %e, "teardown after connection loss failed");
            }
        });
    }

    /// Finalizes the current accumulation into a turn. Turns with no
    /// text are suppressed, not persisted.
    async fn finalize_turn(&self) {
        let committed = {
            let mut state = self.state.lock();
            let Some(active) = state.active.as_mut() else {
                return;
            };
            let user = std::mem::take(&mut active.user_transcript);
            let assistant = std::mem::take(&mut active.assistant_transcript);
            let emotion = active.emotion.take();
            let user = user.trim().to_string();
            let assistant = assistant.trim().to_string();
            if user.is_empty() && assistant.is_empty() {
                None
            } else {
                let mut turn = TranscriptTurn::new(user, assistant);
                turn.emotion = emotion;
                active.turns.push(turn.clone());
                Some((turn, active.turns.clone()))
            }
        };

        let Some((turn, turns)) = committed else {
            return;
        };
        self.emit(EngineEvent::TurnCommitted { turn });
        self.emit(EngineEvent::Emotion { label: None });
        if let Err(e) = self.snapshots.save(&turns).await {
            warn!(error = %e, "failed to save session snapshot");
        }
    }

    fn tool_context(&self) -> ToolContext {
        let sensors = self.sensors.snapshot();
        let state = self.state.lock();
        let active = state.active.as_ref();
        ToolContext {
            document: active.and_then(|a| a.document.clone()),
            project_dir: active.and_then(|a| a.project_dir.clone()),
            github: active.and_then(|a| a.github.clone()),
            status: SystemStatus {
                is_online: true,
                vision_enabled: active.is_some_and(|a| a.vision_enabled),
                security: active
                    .map(|a| a.security.status())
                    .unwrap_or(SecurityStatus::Open),
                network: active.map(|a| a.network).unwrap_or(NetworkQuality::Optimal),
                motion: sensors.motion,
                location: sensors.location,
                coaching_mode: active.is_some_and(|a| a.coaching_mode),
            },
            hooks: self.hooks.clone(),
        }
    }

    /// Processes one tool-call batch in arrival order. Every call gets
    /// exactly one correlated response; failures become error-shaped
    /// results and never tear the session down.
    async fn handle_tool_calls(self: &Arc<Self>, batch: Vec<ToolCall>) {
        for call in batch {
            self.emit(EngineEvent::ToolCallPending {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            });

            let result = if Self::is_intercepted(&call.name) {
                self.handle_intercepted(&call).await
            } else {
                let ctx = self.tool_context();
                self.router.dispatch(&call, &ctx).await
            };

            let sender = {
                let state = self.state.lock();
                state.active.as_ref().map(|a| a.sender.clone())
            };
            let Some(sender) = sender else {
                warn!(tool = %call.name, "session gone before tool response could be sent");
                return;
            };
            if let Err(e) = sender
                .send(ClientMessage::ToolResponse {
                    id: result.call_id.clone(),
                    name: call.name.clone(),
                    response: result.response_body(),
                })
                .await
            {
                warn!(tool = %call.name, error = %e, "failed to send tool response");
            }
        }
    }

    /// Tools that mutate session-local state directly and never reach
    /// the generic router. `generate_chart` is the one exception that
    /// does both: the engine injects the chart turn, then routes the
    /// call for its textual acknowledgement.
    fn is_intercepted(name: &str) -> bool {
        matches!(
            name,
            "display_emotion"
                | "confirm_biometric_identity"
                | "generate_chart"
                | "play_ambient_audio"
                | "update_semantic_memory"
                | "mission_log"
        )
    }

    async fn handle_intercepted(self: &Arc<Self>, call: &ToolCall) -> ToolResult {
        let args = match ToolArgs::parse(&call.name, &call.arguments) {
            Ok(args) => args,
            Err(e) => {
                let result = ToolResult::error(&call.id, e.to_string());
                self.audit.record(AuditEntry::new(
                    "SYSTEM",
                    &call.name,
                    AuditOutcome::Error,
                    &result.content,
                ));
                return result;
            }
        };

        let result = match args {
            ToolArgs::DisplayEmotion { emotion, response } => {
                let full = {
                    let mut state = self.state.lock();
                    let Some(active) = state.active.as_mut() else {
                        return ToolResult::error(&call.id, "no live session");
                    };
                    active.emotion = Some(emotion.clone());
                    active.assistant_transcript.push_str(&response);
                    active.assistant_transcript.clone()
                };
                self.emit(EngineEvent::Emotion {
                    label: Some(emotion),
                });
                self.emit(EngineEvent::AssistantTranscript { text: full });
                ToolResult::success(&call.id, "Emotion displayed to user.")
            }
            ToolArgs::ConfirmBiometricIdentity { matched } => {
                let security = {
                    let state = self.state.lock();
                    state.active.as_ref().map(|a| a.security.clone())
                };
                let Some(security) = security else {
                    return ToolResult::error(&call.id, "no live session");
                };
                let status = security.apply_verification(matched);
                self.emit(EngineEvent::SecurityChanged { status });
                if matched {
                    ToolResult::success(
                        &call.id,
                        "Biometric verification SUCCESSFUL. Security UNLOCKED. You may now \
                         access full system capabilities.",
                    )
                } else {
                    ToolResult::success(
                        &call.id,
                        "Biometric verification FAILED. Security LOCKED. Access denied.",
                    )
                }
            }
            ToolArgs::GenerateChart { chart } => {
                let turn = TranscriptTurn::chart(chart);
                {
                    let mut state = self.state.lock();
                    if let Some(active) = state.active.as_mut() {
                        active.turns.push(turn.clone());
                    }
                }
                self.emit(EngineEvent::TurnCommitted { turn });
                let ctx = self.tool_context();
                // Routed for the acknowledgement the model expects.
                return self.router.dispatch(call, &ctx).await;
            }
            ToolArgs::PlayAmbientAudio { action } => match action {
                AmbientAction::Start => {
                    self.scheduler
                        .start_ambient(brown_noise(AMBIENT_SECONDS, OUTPUT_SAMPLE_RATE));
                    ToolResult::success(&call.id, "Started playing ambient focus noise.")
                }
                AmbientAction::Stop => {
                    self.scheduler.stop_ambient();
                    ToolResult::success(&call.id, "Stopped ambient audio.")
                }
            },
            ToolArgs::UpdateSemanticMemory { preference } => {
                self.emit(EngineEvent::MemoryUpdated {
                    preference: preference.clone(),
                });
                ToolResult::success(&call.id, "User preference has been saved.")
            }
            ToolArgs::MissionLog { op } => self.apply_mission_op(&call.id, op),
            other => ToolResult::error(
                &call.id,
                format!("tool '{}' is not session-local: {other:?}", call.name),
            ),
        };

        let outcome = if result.is_error {
            AuditOutcome::Error
        } else {
            AuditOutcome::Success
        };
        self.audit.record(AuditEntry::new(
            "SYSTEM",
            &call.name,
            outcome,
            &result.content,
        ));
        result
    }

    fn apply_mission_op(&self, call_id: &str, op: MissionOp) -> ToolResult {
        let mut state = self.state.lock();
        let Some(active) = state.active.as_mut() else {
            return ToolResult::error(call_id, "no live session");
        };
        match op {
            MissionOp::Add { description } => {
                let task = MissionTask::new(description);
                let id = task.id;
                active.missions.push(task);
                ToolResult::success(call_id, format!("Task added to the mission log (id {id})."))
            }
            MissionOp::Complete { id } => {
                match active.missions.iter_mut().find(|t| t.id == id) {
                    Some(task) => {
                        task.completed = true;
                        ToolResult::success(call_id, "Task marked complete.")
                    }
                    None => ToolResult::error(call_id, format!("no task with id {id}")),
                }
            }
            MissionOp::Remove { id } => {
                let before = active.missions.len();
                active.missions.retain(|t| t.id != id);
                if active.missions.len() < before {
                    ToolResult::success(call_id, "Task removed from the mission log.")
                } else {
                    ToolResult::error(call_id, format!("no task with id {id}"))
                }
            }
            MissionOp::List => match serde_json::to_string(&active.missions) {
                Ok(json) => ToolResult::success(call_id, json),
                Err(e) => ToolResult::error(call_id, format!("failed to list tasks: {e}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedMedia;
    use crate::transport::LiveConnection;
    use crate::sensors::StaticSensorProvider;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU32};
    use uuid::Uuid;
    use voxlink_core::{TransportError, TransportErrorKind};
    use voxlink_media::codec::AudioBuffer;
    use voxlink_media::{PlaybackClock, PlaybackSink, VideoSource};
    use voxlink_tools::audit::MemoryAuditTrail;
    use voxlink_tools::router::{AgentKind, ToolDescriptor, ToolHandler};
    use voxlink_tools::NoopHooks;

    // ── scripted boundaries ──────────────────────────────────────────

    struct MockSender {
        sent: PlMutex<Vec<ClientMessage>>,
        closed: AtomicBool,
    }

    impl MockSender {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: PlMutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            })
        }

        fn tool_responses(&self) -> Vec<(String, serde_json::Value)> {
            self.sent
                .lock()
                .iter()
                .filter_map(|m| match m {
                    ClientMessage::ToolResponse { id, response, .. } => {
                        Some((id.clone(), response.clone()))
                    }
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl OutboundSink for MockSender {
        async fn send(&self, message: ClientMessage) -> VoxlinkResult<()> {
            self.sent.lock().push(message);
            Ok(())
        }
        async fn close(&self) -> VoxlinkResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockTransport {
        failures: u32,
        kind: TransportErrorKind,
        calls: AtomicU32,
        link: PlMutex<Option<(Arc<MockSender>, mpsc::Sender<ServerEvent>)>>,
        setup: PlMutex<Option<SessionSetup>>,
    }

    impl MockTransport {
        fn ok() -> Arc<Self> {
            Self::failing(0, TransportErrorKind::Network)
        }

        fn failing(failures: u32, kind: TransportErrorKind) -> Arc<Self> {
            Arc::new(Self {
                failures,
                kind,
                calls: AtomicU32::new(0),
                link: PlMutex::new(None),
                setup: PlMutex::new(None),
            })
        }

        fn link(&self) -> (Arc<MockSender>, mpsc::Sender<ServerEvent>) {
            self.link.lock().clone().expect("no connection made")
        }

        fn setup(&self) -> SessionSetup {
            self.setup.lock().clone().expect("no connection made")
        }
    }

    #[async_trait]
    impl LiveTransport for MockTransport {
        async fn connect(&self, setup: &SessionSetup) -> Result<LiveConnection, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(TransportError::new(self.kind, "scripted failure"));
            }
            *self.setup.lock() = Some(setup.clone());
            let sender = MockSender::new();
            let (tx, rx) = mpsc::channel(64);
            *self.link.lock() = Some((sender.clone(), tx));
            Ok(LiveConnection { sender, events: rx })
        }
    }

    struct StaticCamera;

    impl VideoSource for StaticCamera {
        fn grab_frame(&self) -> Option<Vec<u8>> {
            Some(vec![0xFF, 0xD8, 0xFF])
        }
    }

    struct MockDisplay {
        ended: AtomicBool,
    }

    impl VideoSource for MockDisplay {
        fn grab_frame(&self) -> Option<Vec<u8>> {
            Some(vec![0xAA])
        }
        fn is_ended(&self) -> bool {
            self.ended.load(Ordering::SeqCst)
        }
    }

    struct MockDevices {
        fail: bool,
        mic_tx: PlMutex<Option<mpsc::Sender<Vec<f32>>>>,
        display: PlMutex<Option<Arc<MockDisplay>>>,
    }

    impl MockDevices {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                mic_tx: PlMutex::new(None),
                display: PlMutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                mic_tx: PlMutex::new(None),
                display: PlMutex::new(None),
            })
        }

        fn mic(&self) -> mpsc::Sender<Vec<f32>> {
            self.mic_tx.lock().clone().expect("no media acquired")
        }
    }

    #[async_trait]
    impl MediaDevices for MockDevices {
        async fn acquire(&self, request: &CaptureRequest) -> VoxlinkResult<CapturedMedia> {
            if self.fail {
                return Err(VoxlinkError::Capture("microphone permission denied".into()));
            }
            let (tx, rx) = mpsc::channel(64);
            *self.mic_tx.lock() = Some(tx);
            Ok(CapturedMedia {
                mic: rx,
                camera: request.vision.then(|| Arc::new(StaticCamera) as Arc<dyn VideoSource>),
            })
        }

        async fn capture_display(&self) -> VoxlinkResult<Arc<dyn VideoSource>> {
            let display = Arc::new(MockDisplay {
                ended: AtomicBool::new(false),
            });
            *self.display.lock() = Some(display.clone());
            Ok(display)
        }
    }

    struct MemorySnapshots {
        data: PlMutex<Option<Vec<TranscriptTurn>>>,
    }

    impl MemorySnapshots {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                data: PlMutex::new(None),
            })
        }
    }

    #[async_trait]
    impl SnapshotStore for MemorySnapshots {
        async fn save(&self, turns: &[TranscriptTurn]) -> VoxlinkResult<()> {
            *self.data.lock() = Some(turns.to_vec());
            Ok(())
        }
        async fn load(&self) -> VoxlinkResult<Option<Vec<TranscriptTurn>>> {
            Ok(self.data.lock().clone())
        }
        async fn clear(&self) -> VoxlinkResult<()> {
            *self.data.lock() = None;
            Ok(())
        }
    }

    struct TestClock {
        now: PlMutex<f64>,
    }

    impl PlaybackClock for TestClock {
        fn now(&self) -> f64 {
            *self.now.lock()
        }
    }

    struct CountingSink {
        stops: AtomicU32,
    }

    impl PlaybackSink for CountingSink {
        fn start(&self, _id: u64, _buffer: &AudioBuffer, _at: f64, _looping: bool) {}
        fn stop(&self, _id: u64) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        fn set_gain(&self, _gain: f32) {}
    }

    struct OkTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl ToolHandler for OkTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }
        async fn run(&self, _args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
            Ok("52 results".to_string())
        }
    }

    struct FailingTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }
        async fn run(&self, _args: ToolArgs, _ctx: &ToolContext) -> VoxlinkResult<String> {
            Err(VoxlinkError::Tool("upstream on fire".to_string()))
        }
    }

    fn test_router(audit: Arc<dyn AuditSink>) -> Arc<ToolRouter> {
        let mut router = ToolRouter::new(audit);
        router.register(Arc::new(OkTool {
            descriptor: ToolDescriptor {
                name: "search_web".into(),
                agent: AgentKind::Analyst,
                description: "test".into(),
                parameters_schema: json!({}),
            },
        }));
        router.register(Arc::new(FailingTool {
            descriptor: ToolDescriptor {
                name: "check_inventory".into(),
                agent: AgentKind::Navigator,
                description: "test".into(),
                parameters_schema: json!({}),
            },
        }));
        Arc::new(router)
    }

    struct Rig {
        engine: Arc<SessionEngine>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        transport: Arc<MockTransport>,
        devices: Arc<MockDevices>,
        scheduler: Arc<PlaybackScheduler>,
        clock: Arc<TestClock>,
        sink: Arc<CountingSink>,
        snapshots: Arc<MemorySnapshots>,
        audit: Arc<MemoryAuditTrail>,
    }

    fn rig_with(transport: Arc<MockTransport>, devices: Arc<MockDevices>) -> Rig {
        let clock = Arc::new(TestClock {
            now: PlMutex::new(0.0),
        });
        let sink = Arc::new(CountingSink {
            stops: AtomicU32::new(0),
        });
        let scheduler = Arc::new(PlaybackScheduler::new(clock.clone(), sink.clone(), 1.0));
        let snapshots = MemorySnapshots::new();
        let audit = Arc::new(MemoryAuditTrail::new());
        let (engine, events) = SessionEngine::new(EngineDeps {
            transport: transport.clone(),
            devices: devices.clone(),
            router: test_router(audit.clone()),
            audit: audit.clone(),
            snapshots: snapshots.clone(),
            scheduler: scheduler.clone(),
            sensors: Arc::new(StaticSensorProvider::default()),
            hooks: Arc::new(NoopHooks),
            retry: RetryPolicy {
                max_attempts: 5,
                base_delay_ms: 0,
                max_jitter_ms: 0,
            },
        });
        Rig {
            engine,
            events,
            transport,
            devices,
            scheduler,
            clock,
            sink,
            snapshots,
            audit,
        }
    }

    fn rig() -> Rig {
        rig_with(MockTransport::ok(), MockDevices::new())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    fn pcm_b64(seconds: f64) -> String {
        use base64::engine::general_purpose::STANDARD as B64;
        use base64::Engine as _;
        let samples = (seconds * f64::from(OUTPUT_SAMPLE_RATE)) as usize;
        B64.encode(vec![0u8; samples * 2])
    }

    // ── lifecycle ────────────────────────────────────────────────────

    #[tokio::test]
    async fn stop_is_idempotent_on_an_idle_engine() {
        let r = rig();
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
        assert!(r.engine.stop(true).await.unwrap().is_none());
        assert!(r.engine.stop(false).await.unwrap().is_none());
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn start_reaches_open_and_stop_returns_to_idle() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);

        let (sender, _events) = r.transport.link();
        r.engine.stop(false).await.unwrap();
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
        assert!(sender.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn offline_start_fails_without_touching_devices() {
        let r = rig();
        let config = SessionConfig {
            is_online: false,
            ..Default::default()
        };
        assert!(r.engine.start(config).await.is_err());
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
        assert_eq!(r.transport.calls.load(Ordering::SeqCst), 0);
        assert!(r.devices.mic_tx.lock().is_none());
    }

    #[tokio::test]
    async fn media_failure_aborts_start_cleanly() {
        let r = rig_with(MockTransport::ok(), MockDevices::failing());
        let err = r.engine.start(SessionConfig::default()).await.unwrap_err();
        assert!(matches!(err, VoxlinkError::Capture(_)));
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
        // The connection was never even attempted.
        assert_eq!(r.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retriable_failures_hit_the_ceiling_then_surface() {
        let r = rig_with(
            MockTransport::failing(u32::MAX, TransportErrorKind::Network),
            MockDevices::new(),
        );
        let err = r.engine.start(SessionConfig::default()).await.unwrap_err();
        assert!(matches!(err, VoxlinkError::Transport(_)));
        assert_eq!(r.transport.calls.load(Ordering::SeqCst), 5);
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn non_retriable_failure_gives_up_at_once() {
        let r = rig_with(
            MockTransport::failing(u32::MAX, TransportErrorKind::InvalidConfig),
            MockDevices::new(),
        );
        assert!(r.engine.start(SessionConfig::default()).await.is_err());
        assert_eq!(r.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_open_declares_intercepted_tools_alongside_routed_ones() {
        let r = rig();
        let config = SessionConfig {
            face_reference: Some("tall, glasses".into()),
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();

        let setup = r.transport.setup();
        let declared: Vec<&str> = setup
            .tool_declarations
            .iter()
            .filter_map(|d| d["name"].as_str())
            .collect();
        for name in [
            "display_emotion",
            "confirm_biometric_identity",
            "play_ambient_audio",
            "update_semantic_memory",
            "mission_log",
        ] {
            assert!(
                declared.contains(&name),
                "'{name}' missing from declared catalog: {declared:?}"
            );
        }
        // Routed handlers still declare themselves.
        assert!(declared.contains(&"search_web"));
        assert!(declared.contains(&"check_inventory"));

        // The instruction that tells the model to verify identity refers
        // to a tool the catalog actually carries.
        assert!(setup.system_instruction.contains("confirm_biometric_identity"));
    }

    #[tokio::test]
    async fn read_failure_surfaces_an_error_before_teardown() {
        let mut r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();

        events
            .send(ServerEvent::Failed("tls stream torn down".into()))
            .await
            .unwrap();
        settle().await;
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);

        let mut seen = Vec::new();
        while let Ok(event) = r.events.try_recv() {
            seen.push(event);
        }
        let error_at = seen
            .iter()
            .position(|e| {
                matches!(e, EngineEvent::Error { message } if message.contains("tls stream torn down"))
            })
            .expect("connection failure must surface as an error event");
        let stopped_at = seen
            .iter()
            .position(|e| matches!(e, EngineEvent::Stopped))
            .expect("teardown must complete");
        assert!(error_at < stopped_at, "error must precede the stop: {seen:?}");
    }

    #[tokio::test]
    async fn starting_over_a_live_session_forces_stop_then_start() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (first_sender, _first_events) = r.transport.link();

        r.engine.start(SessionConfig::default()).await.unwrap();
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);
        assert!(first_sender.closed.load(Ordering::SeqCst));
        assert_eq!(r.transport.calls.load(Ordering::SeqCst), 2);
    }

    // ── transcripts and turns ────────────────────────────────────────

    #[tokio::test]
    async fn clean_session_commits_two_turns() {
        let mut r = rig();
        let config = SessionConfig {
            face_reference: Some("tall, glasses".into()),
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();
        assert_eq!(r.engine.security_status(), Some(SecurityStatus::Locked));

        let (_sender, events) = r.transport.link();
        events
            .send(ServerEvent::InputTranscription("hello".into()))
            .await
            .unwrap();
        events
            .send(ServerEvent::OutputTranscription("hi there".into()))
            .await
            .unwrap();
        events.send(ServerEvent::TurnComplete).await.unwrap();
        events
            .send(ServerEvent::InputTranscription("still there?".into()))
            .await
            .unwrap();
        events
            .send(ServerEvent::OutputTranscription("yes".into()))
            .await
            .unwrap();
        events.send(ServerEvent::TurnComplete).await.unwrap();
        settle().await;

        // The in-flight snapshot tracks the committed turns.
        assert_eq!(r.snapshots.data.lock().as_ref().map(Vec::len), Some(2));

        let record = r.engine.stop(true).await.unwrap().expect("history record");
        assert_eq!(record.turns.len(), 2);
        assert_eq!(record.turns[0].user, "hello");
        assert_eq!(record.turns[0].assistant, "hi there");
        assert_eq!(record.turns[1].user, "still there?");

        // Clean stop cleared the resume snapshot.
        assert!(r.snapshots.data.lock().is_none());

        let mut committed = 0;
        while let Ok(event) = r.events.try_recv() {
            if matches!(event, EngineEvent::TurnCommitted { .. }) {
                committed += 1;
            }
        }
        assert_eq!(committed, 2);
    }

    #[tokio::test]
    async fn empty_turns_are_suppressed() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();
        events.send(ServerEvent::TurnComplete).await.unwrap();
        settle().await;

        assert!(r.snapshots.data.lock().is_none());
        assert!(r.engine.stop(true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resumed_turns_seed_the_transcript() {
        let r = rig();
        let prior = vec![TranscriptTurn::new("where were we", "discussing the plan")];
        let config = SessionConfig {
            resumed_turns: prior.clone(),
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();

        let record = r.engine.stop(true).await.unwrap().expect("history record");
        assert_eq!(record.turns, prior);
    }

    #[tokio::test]
    async fn send_text_commits_a_user_turn_and_hits_the_wire() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (sender, _events) = r.transport.link();

        r.engine.send_text("  status report  ").await.unwrap();
        r.engine.send_text("   ").await.unwrap();

        let sent = sender.sent.lock().clone();
        assert_eq!(
            sent,
            vec![ClientMessage::Text {
                text: "status report".into()
            }]
        );

        let record = r.engine.stop(true).await.unwrap().expect("history record");
        assert_eq!(record.turns.len(), 1);
        assert_eq!(record.turns[0].user, "status report");
    }

    // ── media pipeline ───────────────────────────────────────────────

    #[tokio::test]
    async fn mic_frames_stream_as_pcm_chunks() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (sender, _events) = r.transport.link();

        r.devices.mic().send(vec![0.0_f32; 512]).await.unwrap();
        settle().await;

        let sent = sender.sent.lock().clone();
        let ClientMessage::Realtime { media } = &sent[0] else {
            panic!("expected a realtime chunk, got {sent:?}");
        };
        assert_eq!(media.mime_type, "audio/pcm;rate=16000");
    }

    #[tokio::test]
    async fn vision_sessions_sample_jpeg_frames() {
        let r = rig();
        let config = SessionConfig {
            vision_enabled: true,
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();
        let (sender, _events) = r.transport.link();
        settle().await;

        let frames: usize = sender
            .sent
            .lock()
            .iter()
            .filter(|m| {
                matches!(m, ClientMessage::Realtime { media } if media.mime_type == "image/jpeg")
            })
            .count();
        assert!(frames >= 1, "expected at least one sampled frame");
    }

    #[tokio::test]
    async fn barge_in_flushes_playback_and_resets_the_clock() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();

        for _ in 0..3 {
            events
                .send(ServerEvent::AudioChunk(pcm_b64(1.0)))
                .await
                .unwrap();
        }
        settle().await;
        assert_eq!(r.scheduler.active_count(), 3);

        // Mid first chunk: nothing has completed naturally yet.
        *r.clock.now.lock() = 0.5;
        events.send(ServerEvent::Interrupted).await.unwrap();
        settle().await;

        assert_eq!(r.scheduler.active_count(), 0);
        assert_eq!(r.sink.stops.load(Ordering::SeqCst), 3);
        assert!((r.scheduler.next_start() - 0.0).abs() < 1e-9);

        // Session is untouched by the flush.
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);
    }

    #[tokio::test]
    async fn undecodable_audio_is_dropped_not_fatal() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();

        events
            .send(ServerEvent::AudioChunk("!!not-base64!!".into()))
            .await
            .unwrap();
        settle().await;

        assert_eq!(r.scheduler.active_count(), 0);
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);
    }

    #[tokio::test]
    async fn screen_share_toggles_and_ended_capture_restores_camera() {
        let r = rig();
        let config = SessionConfig {
            vision_enabled: true,
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();

        assert!(r.engine.toggle_screen_share().await.unwrap());
        assert!(r.engine.is_screen_sharing());

        // The platform-level "stop sharing" affordance ends the track;
        // the sampler reconciles back to the camera.
        r.devices
            .display
            .lock()
            .as_ref()
            .unwrap()
            .ended
            .store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!r.engine.is_screen_sharing());
    }

    // ── tool dispatch ────────────────────────────────────────────────

    #[tokio::test]
    async fn every_call_in_a_batch_gets_exactly_one_response() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (sender, events) = r.transport.link();

        events
            .send(ServerEvent::ToolCalls(vec![
                ToolCall {
                    id: "c1".into(),
                    name: "search_web".into(),
                    arguments: json!({"query": "weather"}),
                },
                ToolCall {
                    id: "c2".into(),
                    name: "check_inventory".into(),
                    arguments: json!({"sku": "GEM-001"}),
                },
                ToolCall {
                    id: "c3".into(),
                    name: "display_emotion".into(),
                    arguments: json!({"emotion": "joy", "response": "Great news!"}),
                },
            ]))
            .await
            .unwrap();
        settle().await;

        let responses = sender.tool_responses();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].0, "c1");
        assert_eq!(responses[0].1["result"], "52 results");
        // The failing handler comes back error-shaped, in order.
        assert_eq!(responses[1].0, "c2");
        assert!(responses[1].1["error"]
            .as_str()
            .unwrap()
            .contains("upstream on fire"));
        assert_eq!(responses[2].0, "c3");
        assert_eq!(responses[2].1["result"], "Emotion displayed to user.");

        // Tool failure never tears the session down.
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);
        // One audit entry per dispatch: two routed, one intercepted.
        assert_eq!(r.audit.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn biometric_tool_flips_the_security_gate() {
        let r = rig();
        let config = SessionConfig {
            face_reference: Some("tall, glasses".into()),
            ..Default::default()
        };
        r.engine.start(config).await.unwrap();
        let (sender, events) = r.transport.link();
        assert_eq!(r.engine.security_status(), Some(SecurityStatus::Locked));

        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c1".into(),
                name: "confirm_biometric_identity".into(),
                arguments: json!({"match": true}),
            }]))
            .await
            .unwrap();
        settle().await;

        assert_eq!(r.engine.security_status(), Some(SecurityStatus::Unlocked));
        let responses = sender.tool_responses();
        assert!(responses[0].1["result"]
            .as_str()
            .unwrap()
            .contains("UNLOCKED"));
    }

    #[tokio::test]
    async fn chart_tool_injects_a_turn_and_acknowledges() {
        let mut r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (sender, events) = r.transport.link();

        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c1".into(),
                name: "generate_chart".into(),
                arguments: json!({
                    "title": "Daily volume",
                    "type": "bar",
                    "data": [{"label": "Mon", "value": 3.0}]
                }),
            }]))
            .await
            .unwrap();
        settle().await;

        // The response is error-shaped only because the test router has
        // no chart handler; the injected turn happened regardless.
        assert_eq!(sender.tool_responses().len(), 1);
        let mut chart_turns = 0;
        while let Ok(event) = r.events.try_recv() {
            if let EngineEvent::TurnCommitted { turn } = event {
                if turn.chart.is_some() {
                    assert!(turn.autonomous);
                    chart_turns += 1;
                }
            }
        }
        assert_eq!(chart_turns, 1);
    }

    #[tokio::test]
    async fn ambient_audio_tool_starts_and_stops_the_loop() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();

        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c1".into(),
                name: "play_ambient_audio".into(),
                arguments: json!({"action": "start"}),
            }]))
            .await
            .unwrap();
        settle().await;
        assert!(r.scheduler.ambient_active());

        // Barge-in leaves the ambient loop alone.
        events.send(ServerEvent::Interrupted).await.unwrap();
        settle().await;
        assert!(r.scheduler.ambient_active());

        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c2".into(),
                name: "play_ambient_audio".into(),
                arguments: json!({"action": "stop"}),
            }]))
            .await
            .unwrap();
        settle().await;
        assert!(!r.scheduler.ambient_active());
    }

    #[tokio::test]
    async fn mission_log_crud_round_trips() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (sender, events) = r.transport.link();

        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c1".into(),
                name: "mission_log".into(),
                arguments: json!({"op": "add", "description": "ship the build"}),
            }]))
            .await
            .unwrap();
        settle().await;
        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c2".into(),
                name: "mission_log".into(),
                arguments: json!({"op": "list"}),
            }]))
            .await
            .unwrap();
        settle().await;

        let responses = sender.tool_responses();
        assert_eq!(responses.len(), 2);
        let listing = responses[1].1["result"].as_str().unwrap();
        let tasks: Vec<MissionTask> = serde_json::from_str(listing).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "ship the build");
        assert!(!tasks[0].completed);

        // Completing a task that does not exist is an error-shaped
        // result, not a failure.
        events
            .send(ServerEvent::ToolCalls(vec![ToolCall {
                id: "c3".into(),
                name: "mission_log".into(),
                arguments: json!({"op": "complete", "id": Uuid::new_v4().to_string()}),
            }]))
            .await
            .unwrap();
        settle().await;
        let responses = sender.tool_responses();
        assert!(responses[2].1["error"].as_str().unwrap().contains("no task"));
        assert_eq!(r.engine.lifecycle(), Lifecycle::Open);
    }

    #[tokio::test]
    async fn server_close_returns_the_engine_to_idle() {
        let r = rig();
        r.engine.start(SessionConfig::default()).await.unwrap();
        let (_sender, events) = r.transport.link();

        events.send(ServerEvent::Closed).await.unwrap();
        settle().await;
        assert_eq!(r.engine.lifecycle(), Lifecycle::Idle);
    }
}
