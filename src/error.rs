use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Sidekick`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains. Per the recovery design, almost
/// every variant is handled locally — the main loop only ever exits on a
/// user-initiated shutdown.
#[derive(Debug, Error)]
pub enum SidekickError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Reasoning service ───────────────────────────────────────────────
    #[error("reasoning: {0}")]
    Reasoning(#[from] ReasoningError),

    // ── Frame capture ───────────────────────────────────────────────────
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),

    // ── Speech (listen / synthesize / play) ─────────────────────────────
    #[error("speech: {0}")]
    Speech(#[from] SpeechError),

    // ── Gold dataset sink ───────────────────────────────────────────────
    #[error("dataset: {0}")]
    Dataset(#[from] DatasetError),

    // ── Personal memory ─────────────────────────────────────────────────
    #[error("memory: {0}")]
    Memory(#[from] MemoryError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Reasoning service errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("backend {backend} request failed: {message}")]
    Request { backend: String, message: String },

    #[error("backend {backend} timed out after {timeout_secs}s")]
    Timeout { backend: String, timeout_secs: u64 },

    #[error("backend {backend} returned status {status}")]
    Status { backend: String, status: u16 },

    #[error("empty completion from backend {backend}")]
    EmptyCompletion { backend: String },
}

// ─── Frame capture errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture command failed: {0}")]
    Command(String),

    #[error("capture produced no frame: {0}")]
    NoFrame(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Speech errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("recorder failed: {0}")]
    Recorder(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

// ─── Dataset errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("artifact write failed: {0}")]
    Artifact(String),

    #[error("record append failed: {0}")]
    Append(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Personal memory errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to parse memory file: {0}")]
    Parse(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SidekickError>;
