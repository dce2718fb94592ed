use serde::Deserialize;

use crate::error::{CaptureError, DiagnosticSink};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCapture {
    #[default]
    RedactedSummaryOnly,
    FullDetails,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptureLimits {
    pub max_line_bytes: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}

/// Which outbound requests have their responses reconstructed.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterceptTarget {
    pub endpoints: Vec<String>,
    pub method: String,
}

impl Default for InterceptTarget {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "/backend-api/conversation".to_string(),
                "/backend-anon/f/conversation".to_string(),
            ],
            method: "POST".to_string(),
        }
    }
}

impl InterceptTarget {
    pub fn matches(&self, url: &str, method: &str) -> bool {
        method.eq_ignore_ascii_case(&self.method)
            && self
                .endpoints
                .iter()
                .any(|endpoint| url.contains(endpoint.as_str()))
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub limits: CaptureLimits,
    pub data_prefix: String,
    pub comment_prefix: String,
    pub done_sentinel: String,
    pub content_path: String,
    pub append_op: String,
    pub patch_op: String,
    pub diagnostic_capture: DiagnosticCapture,
    pub target: InterceptTarget,
    #[serde(skip)]
    pub diagnostic_sink: Option<Box<dyn DiagnosticSink>>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            limits: CaptureLimits::default(),
            data_prefix: "data: ".to_string(),
            comment_prefix: ":".to_string(),
            done_sentinel: "[DONE]".to_string(),
            content_path: "/message/content/parts/0".to_string(),
            append_op: "append".to_string(),
            patch_op: "patch".to_string(),
            diagnostic_capture: DiagnosticCapture::RedactedSummaryOnly,
            target: InterceptTarget::default(),
            diagnostic_sink: None,
        }
    }
}

impl std::fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("limits", &self.limits)
            .field("data_prefix", &self.data_prefix)
            .field("comment_prefix", &self.comment_prefix)
            .field("done_sentinel", &self.done_sentinel)
            .field("content_path", &self.content_path)
            .field("append_op", &self.append_op)
            .field("patch_op", &self.patch_op)
            .field("diagnostic_capture", &self.diagnostic_capture)
            .field("target", &self.target)
            .field("diagnostic_sink", &self.diagnostic_sink.is_some())
            .finish()
    }
}

impl CaptureConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, CaptureError> {
        toml::from_str(input).map_err(|source| CaptureError::ConfigParse { source })
    }

    pub fn with_diagnostic_sink(mut self, sink: impl DiagnosticSink) -> Self {
        self.diagnostic_sink = Some(Box::new(sink));
        self
    }
}
