use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CaptureConfig;
use crate::operation::{Operation, SubOp};

/// One textual append, as observed on the wire.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    pub path: String,
    pub value: String,
}

/// Effect of applying one [`Operation`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Applied {
    /// Characters appended to the primary content slot (may be zero when
    /// only other slots were touched).
    Appended { chars: usize },
    SnapshotReplaced { chars: usize },
    /// Snapshot was not strictly longer than the accumulated text.
    SnapshotKept,
}

/// Mutable state of one reconstruction run.
///
/// The accumulated text only grows: appends extend it, and a snapshot
/// replaces it only when strictly longer (in characters).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructionState {
    conversation_id: Option<String>,
    message_id: Option<String>,
    accumulated_text: String,
    text_chars: usize,
    using_append_mode: bool,
    raw_operation_log: Vec<RawOperation>,
}

impl ReconstructionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the conversation id from the originating request.
    pub fn with_conversation_id(conversation_id: Option<String>) -> Self {
        let mut state = Self::default();
        state.observe_conversation_id(conversation_id);
        state
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn using_append_mode(&self) -> bool {
        self.using_append_mode
    }

    pub fn raw_operation_log(&self) -> &[RawOperation] {
        &self.raw_operation_log
    }

    pub fn into_raw_operation_log(self) -> Vec<RawOperation> {
        self.raw_operation_log
    }

    /// First writer wins.
    pub fn observe_conversation_id(&mut self, conversation_id: Option<String>) {
        if self.conversation_id.is_none() {
            self.conversation_id = conversation_id.filter(|id| !id.is_empty());
        }
    }

    /// First writer wins.
    pub fn observe_message_id(&mut self, message_id: Option<String>) {
        if self.message_id.is_none() {
            self.message_id = message_id.filter(|id| !id.is_empty());
        }
    }

    pub fn apply(&mut self, operation: Operation, config: &CaptureConfig) -> Applied {
        match operation {
            Operation::PatchBatch(ops) | Operation::BareOpArray(ops) => {
                let chars: usize = ops
                    .into_iter()
                    .map(|op| self.apply_sub_op(op, config))
                    .sum();
                Applied::Appended { chars }
            }
            Operation::DirectAppend { path, value } => {
                let chars = self.append(path, value, config);
                Applied::Appended { chars }
            }
            Operation::RawValue(value) => {
                let chars = self.append(config.content_path.clone(), value, config);
                Applied::Appended { chars }
            }
            Operation::LegacySnapshot { parts, message_id } => {
                self.apply_snapshot(parts.concat(), message_id)
            }
        }
    }

    fn apply_sub_op(&mut self, op: SubOp, config: &CaptureConfig) -> usize {
        if op.op_kind.as_deref() != Some(config.append_op.as_str()) {
            return 0;
        }
        let (Some(path), Value::String(value)) = (op.path, op.value) else {
            return 0;
        };
        self.append(path, value, config)
    }

    /// Logs every non-empty textual append; only the primary content slot
    /// feeds the accumulated text.
    fn append(&mut self, path: String, value: String, config: &CaptureConfig) -> usize {
        if value.is_empty() {
            return 0;
        }
        let mut chars = 0;
        if path == config.content_path {
            chars = value.chars().count();
            self.accumulated_text.push_str(&value);
            self.text_chars += chars;
            self.using_append_mode = true;
        }
        self.raw_operation_log.push(RawOperation { path, value });
        chars
    }

    fn apply_snapshot(&mut self, candidate: String, message_id: Option<String>) -> Applied {
        let candidate_chars = candidate.chars().count();
        if candidate_chars > self.text_chars {
            debug!(
                previous_chars = self.text_chars,
                candidate_chars,
                append_mode = self.using_append_mode,
                "snapshot replaces accumulated text"
            );
            self.accumulated_text = candidate;
            self.text_chars = candidate_chars;
            self.observe_message_id(message_id);
            return Applied::SnapshotReplaced {
                chars: candidate_chars,
            };
        }
        if !self.using_append_mode {
            // Snapshot stream: the snapshot still names the message.
            self.observe_message_id(message_id);
        }
        Applied::SnapshotKept
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const CONTENT: &str = "/message/content/parts/0";

    fn append(text: &str) -> Operation {
        Operation::DirectAppend {
            path: CONTENT.to_string(),
            value: text.to_string(),
        }
    }

    fn snapshot(text: &str, id: Option<&str>) -> Operation {
        Operation::LegacySnapshot {
            parts: vec![text.to_string()],
            message_id: id.map(str::to_string),
        }
    }

    #[test]
    fn appends_accumulate_and_are_logged() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();

        assert_eq!(
            state.apply(append("Hello"), &config),
            Applied::Appended { chars: 5 }
        );
        state.apply(Operation::RawValue(" world".to_string()), &config);

        assert_eq!(state.accumulated_text(), "Hello world");
        assert!(state.using_append_mode());
        assert_eq!(
            state.raw_operation_log(),
            &[
                RawOperation {
                    path: CONTENT.to_string(),
                    value: "Hello".to_string()
                },
                RawOperation {
                    path: CONTENT.to_string(),
                    value: " world".to_string()
                },
            ]
        );
    }

    #[test]
    fn batch_applies_only_content_appends() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        let ops = vec![
            SubOp {
                path: Some(CONTENT.to_string()),
                op_kind: Some("append".to_string()),
                value: json!("ab"),
            },
            SubOp {
                path: Some("/message/status".to_string()),
                op_kind: Some("replace".to_string()),
                value: json!("finished_successfully"),
            },
            SubOp {
                path: Some("/message/metadata/title".to_string()),
                op_kind: Some("append".to_string()),
                value: json!("side"),
            },
            SubOp {
                path: Some(CONTENT.to_string()),
                op_kind: Some("append".to_string()),
                value: json!(7),
            },
        ];

        assert_eq!(
            state.apply(Operation::PatchBatch(ops), &config),
            Applied::Appended { chars: 2 }
        );
        assert_eq!(state.accumulated_text(), "ab");
        assert_eq!(state.raw_operation_log().len(), 2);
        assert_eq!(state.raw_operation_log()[1].path, "/message/metadata/title");
    }

    #[test]
    fn longer_snapshot_replaces_and_sets_message_id() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        state.apply(Operation::RawValue("Hi".to_string()), &config);

        assert_eq!(
            state.apply(snapshot("Hi there", Some("m1")), &config),
            Applied::SnapshotReplaced { chars: 8 }
        );
        assert_eq!(state.accumulated_text(), "Hi there");
        assert_eq!(state.message_id(), Some("m1"));
    }

    #[test]
    fn shorter_or_equal_snapshot_never_truncates() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        state.apply(append("Hello world"), &config);

        assert_eq!(
            state.apply(snapshot("Hello", Some("m1")), &config),
            Applied::SnapshotKept
        );
        assert_eq!(
            state.apply(snapshot("Hello_world", Some("m1")), &config),
            Applied::SnapshotKept
        );
        assert_eq!(state.accumulated_text(), "Hello world");
        assert_eq!(state.message_id(), None);
    }

    #[test]
    fn snapshot_only_stream_adopts_message_id_without_replacing() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        state.apply(snapshot("", Some("m7")), &config);
        assert_eq!(state.message_id(), Some("m7"));
        assert_eq!(state.accumulated_text(), "");
    }

    #[test]
    fn length_is_measured_in_characters() {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        state.apply(append("\u{e9}\u{e9}\u{e9}"), &config);
        // Four ASCII bytes beat three two-byte characters.
        state.apply(snapshot("abcd", None), &config);
        assert_eq!(state.accumulated_text(), "abcd");
    }

    #[test]
    fn identifiers_are_first_writer_wins() {
        let mut state = ReconstructionState::with_conversation_id(Some("from-request".into()));
        state.observe_conversation_id(Some("from-stream".into()));
        assert_eq!(state.conversation_id(), Some("from-request"));

        let mut state = ReconstructionState::with_conversation_id(None);
        state.observe_conversation_id(Some(String::new()));
        state.observe_conversation_id(Some("c1".into()));
        state.observe_conversation_id(Some("c2".into()));
        assert_eq!(state.conversation_id(), Some("c1"));

        state.observe_message_id(Some("m1".into()));
        state.observe_message_id(Some("m2".into()));
        assert_eq!(state.message_id(), Some("m1"));
    }
}
