use serde_json::Value;
use uuid::Uuid;
use voxlink_core::{ChartKind, ChartPayload, ChartPoint, VoxlinkError, VoxlinkResult};

/// Start/stop switch for the ambient focus-noise loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientAction {
    /// Begin the looping noise source.
    Start,
    /// End it.
    Stop,
}

/// A mission-log mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionOp {
    /// Append a new task.
    Add { description: String },
    /// Mark a task done.
    Complete { id: Uuid },
    /// Delete a task.
    Remove { id: Uuid },
    /// Read the current log.
    List,
}

/// Validated tool arguments, one variant per tool name.
///
/// The remote service sends loosely typed argument maps; parsing them
/// here keeps untyped JSON out of the rest of the call chain. Variants
/// handled inside the session engine (emotion, biometric, ambient,
/// memory, mission log) share this type so there is exactly one
/// validation point.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    /// Show an emotion label alongside a spoken response.
    DisplayEmotion { emotion: String, response: String },
    /// Flip the session security gate based on a biometric match.
    ConfirmBiometricIdentity { matched: bool },
    /// Inject a chart turn into the transcript.
    GenerateChart { chart: ChartPayload },
    /// Start or stop the ambient focus noise.
    PlayAmbientAudio { action: AmbientAction },
    /// Save a user preference into semantic memory.
    UpdateSemanticMemory { preference: String },
    /// Mutate the session mission log.
    MissionLog { op: MissionOp },
    /// General web search.
    SearchWeb { query: String },
    /// Technical analysis for a cryptocurrency symbol.
    CryptoTechnicalAnalysis { symbol: String },
    /// Semantic query against the loaded document.
    QueryDocument { query: String },
    /// List a directory within the mounted project.
    ListDirectory { sub_path: Option<String> },
    /// Read a file within the mounted project.
    ReadProjectFile { path: String },
    /// Stock lookup by SKU.
    CheckInventory { sku: String },
    /// Raise an operator alert.
    GenerateAlert { summary: String, level: String },
    /// Schedule a meeting via the backend.
    ScheduleMeeting { title: String, time: String },
    /// Capture the screen to a file via the client hook.
    CaptureScreen { filename: String },
    /// Write text to the clipboard via the client hook.
    CopyToClipboard { text: String },
    /// Scan visible QR/barcodes via the client hook.
    ScanVisualCodes,
    /// Deliver a coaching tip via the client hook.
    OfferCoachingTip { tip: String },
    /// Ask the client to refresh its wallet view.
    RefreshWallet,
}

fn req_str(args: &Value, key: &str) -> VoxlinkResult<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| VoxlinkError::Tool(format!("missing or non-string argument '{key}'")))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn req_bool(args: &Value, key: &str) -> VoxlinkResult<bool> {
    args.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| VoxlinkError::Tool(format!("missing or non-boolean argument '{key}'")))
}

fn req_uuid(args: &Value, key: &str) -> VoxlinkResult<Uuid> {
    let raw = req_str(args, key)?;
    Uuid::parse_str(&raw).map_err(|e| VoxlinkError::Tool(format!("invalid id '{raw}': {e}")))
}

fn parse_chart(args: &Value) -> VoxlinkResult<ChartPayload> {
    let title = req_str(args, "title")?;
    let kind = match req_str(args, "type")?.as_str() {
        "bar" => ChartKind::Bar,
        "line" => ChartKind::Line,
        "pie" => ChartKind::Pie,
        other => {
            return Err(VoxlinkError::Tool(format!("unknown chart type '{other}'")));
        }
    };
    let raw_points = args
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| VoxlinkError::Tool("missing chart data array".to_string()))?;
    let mut points = Vec::with_capacity(raw_points.len());
    for p in raw_points {
        let label = req_str(p, "label")?;
        let value = p
            .get("value")
            .and_then(Value::as_f64)
            .ok_or_else(|| VoxlinkError::Tool("chart point missing numeric 'value'".to_string()))?;
        points.push(ChartPoint { label, value });
    }
    Ok(ChartPayload {
        title,
        kind,
        points,
    })
}

impl ToolArgs {
    /// Validates a raw argument map against the named tool's shape.
    pub fn parse(name: &str, args: &Value) -> VoxlinkResult<Self> {
        match name {
            "display_emotion" => Ok(Self::DisplayEmotion {
                emotion: req_str(args, "emotion")?,
                response: req_str(args, "response")?,
            }),
            "confirm_biometric_identity" => Ok(Self::ConfirmBiometricIdentity {
                matched: req_bool(args, "match")?,
            }),
            "generate_chart" => Ok(Self::GenerateChart {
                chart: parse_chart(args)?,
            }),
            "play_ambient_audio" => {
                let action = match req_str(args, "action")?.as_str() {
                    "start" => AmbientAction::Start,
                    "stop" => AmbientAction::Stop,
                    other => {
                        return Err(VoxlinkError::Tool(format!(
                            "ambient action must be start/stop, got '{other}'"
                        )));
                    }
                };
                Ok(Self::PlayAmbientAudio { action })
            }
            "update_semantic_memory" => Ok(Self::UpdateSemanticMemory {
                preference: req_str(args, "new_preference")?,
            }),
            "mission_log" => {
                let op = match req_str(args, "op")?.as_str() {
                    "add" => MissionOp::Add {
                        description: req_str(args, "description")?,
                    },
                    "complete" => MissionOp::Complete {
                        id: req_uuid(args, "id")?,
                    },
                    "remove" => MissionOp::Remove {
                        id: req_uuid(args, "id")?,
                    },
                    "list" => MissionOp::List,
                    other => {
                        return Err(VoxlinkError::Tool(format!(
                            "unknown mission-log op '{other}'"
                        )));
                    }
                };
                Ok(Self::MissionLog { op })
            }
            "search_web" => Ok(Self::SearchWeb {
                query: req_str(args, "query")?,
            }),
            "crypto_technical_analysis" => Ok(Self::CryptoTechnicalAnalysis {
                symbol: req_str(args, "cryptocurrency")?,
            }),
            "query_document" => Ok(Self::QueryDocument {
                query: req_str(args, "query")?,
            }),
            "list_directory" => Ok(Self::ListDirectory {
                sub_path: opt_str(args, "sub_path"),
            }),
            "read_project_file" => Ok(Self::ReadProjectFile {
                path: req_str(args, "file_path")?,
            }),
            "check_inventory" => Ok(Self::CheckInventory {
                sku: req_str(args, "sku")?,
            }),
            "generate_alert" => Ok(Self::GenerateAlert {
                summary: req_str(args, "alert_summary")?,
                level: req_str(args, "alert_level")?,
            }),
            "schedule_meeting" => Ok(Self::ScheduleMeeting {
                title: req_str(args, "title")?,
                time: req_str(args, "time")?,
            }),
            "capture_screen" => Ok(Self::CaptureScreen {
                filename: req_str(args, "filename")?,
            }),
            "copy_to_clipboard" => Ok(Self::CopyToClipboard {
                text: req_str(args, "text")?,
            }),
            "scan_visual_codes" => Ok(Self::ScanVisualCodes),
            "offer_coaching_tip" => Ok(Self::OfferCoachingTip {
                tip: req_str(args, "tip")?,
            }),
            "refresh_wallet" => Ok(Self::RefreshWallet),
            other => Err(VoxlinkError::Tool(format!("unknown tool '{other}'"))),
        }
    }
}
