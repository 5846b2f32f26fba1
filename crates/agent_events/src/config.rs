pub const DEFAULT_TRANSCRIPT_ATTACHMENT: &str = "Complete Agent Event Log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Emit chain start/end records (other than `should_continue`).
    pub verbose: bool,
    /// Emit a record per streamed model token chunk.
    pub stream_tokens: bool,
    /// Attachment name for the composite transcript written by `flush`.
    pub transcript_attachment: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            stream_tokens: false,
            transcript_attachment: DEFAULT_TRANSCRIPT_ATTACHMENT.to_string(),
        }
    }
}
