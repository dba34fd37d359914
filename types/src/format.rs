/// Outcome of running the compiler's formatter over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatResult {
    /// Reformatted source text, exactly as the formatter printed it.
    Success(String),
    /// The formatter ran and reported a failure; carries its raw output.
    Failed(String),
    /// The formatter produced nothing readable (missing tool, timeout).
    Error(String),
}

impl FormatResult {
    /// Marker the compiler prints when it cannot parse the input.
    pub const FAILURE_MARKER: &'static str = "err: failed";

    /// Classify formatter output. `None` means no output could be read.
    #[must_use]
    pub fn classify(output: Option<String>) -> Self {
        match output {
            None => Self::Error("Unknown error".to_string()),
            Some(out) if out.contains(Self::FAILURE_MARKER) => Self::Failed(out),
            Some(out) => Self::Success(out),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
