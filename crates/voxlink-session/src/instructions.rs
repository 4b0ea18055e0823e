//! Assembles the system instruction sent in the session-open payload.

use crate::config::SessionConfig;
use std::fmt::Write as _;
use voxlink_core::TranscriptTurn;

const CORE_IDENTITY: &str = "You are Vox, a real-time voice assistant and cognitive partner. \
You listen continuously, respond with synthesized speech, and take actions through tools \
when they serve the user better than words alone.\n---\n";

/// Serializes resumed turns into the context block format the model
/// reads back.
pub fn serialize_resumed_turns(turns: &[TranscriptTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nAssistant: {}", t.user, t.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the full system instruction for one session from the start
/// configuration. Recomputed once per `start()`.
pub fn build_system_instruction(config: &SessionConfig) -> String {
    let mut out = String::from(CORE_IDENTITY);

    if let Some(reference) = &config.face_reference {
        let _ = write!(
            out,
            "\n**SECURITY PROTOCOL ACTIVE:**\n\
             This device is locked to its authorized user. Their visual description:\n\
             \"{reference}\"\n\
             At the start of the session, or whenever asked to unlock, visually verify the \
             camera feed. If the person matches, call `confirm_biometric_identity` with \
             `match: true`; once confirmed you are unlocked. If they do not match, call it \
             with `match: false`, refuse access to personal data and privileged tools, and \
             behave as a restricted guest. Until identity is confirmed via the tool, remain \
             restricted.\n---\n"
        );
    }

    if config.project_dir.is_some() {
        out.push_str(
            "\n**PROJECT ENVIRONMENT LOADED:**\n\
             A local project directory is mounted with read access. Use `list_directory` to \
             see the structure and `read_project_file` to examine files. Act as a senior \
             engineer when asked about the codebase.\n---\n",
        );
    }

    if !config.resumed_turns.is_empty() {
        let _ = write!(
            out,
            "\n**Resumed Conversation Context:**\n\
             The previous conversation was interrupted unexpectedly. Here is its transcript; \
             continue from where it left off.\n---\n{}\n---\n",
            serialize_resumed_turns(&config.resumed_turns)
        );
    }

    if let Some(memory) = &config.semantic_memory {
        let has_content = !memory.summary.is_empty()
            || !memory.key_entities.is_empty()
            || !memory.user_preferences.is_empty();
        if has_content {
            let entities = if memory.key_entities.is_empty() {
                "None.".to_string()
            } else {
                memory
                    .key_entities
                    .iter()
                    .map(|(name, kind)| format!("{name} ({kind})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let preferences = if memory.user_preferences.is_empty() {
                "None yet.".to_string()
            } else {
                memory.user_preferences.join(", ")
            };
            let summary = if memory.summary.is_empty() {
                "Not available."
            } else {
                memory.summary.as_str()
            };
            let _ = write!(
                out,
                "\n**User Profile (learned from past conversations):**\n\
                 - Last session summary: {summary}\n\
                 - Key entities: {entities}\n\
                 - Known preferences: {preferences}\n"
            );
        }
    }

    let _ = write!(
        out,
        "\n**Core Capabilities & Instructions:**\n\
         1. The user speaks {source}. When {source} differs from {target}, translate what \
         they say into {target} and respond in {target}; when they already speak {target}, \
         converse naturally; when a request needs a tool, use it.\n\
         2. When you learn a durable preference or personal detail, save it with \
         `update_semantic_memory`.\n\
         3. For technical analysis of a cryptocurrency, use `crypto_technical_analysis`.\n\
         4. To schedule a meeting, use `schedule_meeting`.\n\
         5. If the user asks for focus or seems distracted, use `play_ambient_audio` to \
         play masking noise.\n",
        source = config.source_language,
        target = config.target_language
    );

    if config.vision_enabled {
        out.push_str(
            "6. You can see the user's environment. Use `display_emotion` for an empathetic \
             response when you detect a significant change in their emotional state; do not \
             overuse it or repeat the same observation.\n",
        );
    }

    out
}
