use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use strum::{Display, EnumString};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub engagement: EngagementConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub persona: PersonaConfig,
}

// ── Reasoning service ─────────────────────────────────────────────

/// Which reasoning backend to talk to. Selected once at configuration
/// time; call sites never branch on provider-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasonerKind {
    /// Local Ollama `/api/generate` with an images array.
    Ollama,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoner_kind")]
    pub backend: ReasonerKind,

    /// Base URL of the reasoning endpoint.
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    /// API key for hosted OpenAI-compatible backends. Ignored by Ollama.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Vision+language model that produces the reply.
    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Optional lightweight vision model for the describe pre-pass.
    /// When set, the pipeline first asks this model for a terse scene
    /// description and feeds that text to the reasoning model.
    #[serde(default)]
    pub vision_model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Hard cap on generated tokens; replies are meant to be short.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout. The loop must never hang on a slow model.
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_reasoner_kind() -> ReasonerKind {
    ReasonerKind::Ollama
}

fn default_reasoning_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_reasoning_model() -> String {
    "llava:latest".to_string()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    60
}

fn default_reasoning_timeout_secs() -> u64 {
    15
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            backend: default_reasoner_kind(),
            base_url: default_reasoning_base_url(),
            api_key: None,
            model: default_reasoning_model(),
            vision_model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_reasoning_timeout_secs(),
        }
    }
}

// ── Frame capture ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// External screenshot command. `{path}` is replaced with the
    /// output file. The command must write a JPEG/PNG to that path.
    #[serde(default = "default_capture_command")]
    pub command: String,

    /// Per-capture deadline before the placeholder frame is used.
    #[serde(default = "default_capture_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_capture_command() -> String {
    "gnome-screenshot -f {path}".to_string()
}

fn default_capture_timeout_secs() -> u64 {
    5
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: default_capture_command(),
            timeout_secs: default_capture_timeout_secs(),
        }
    }
}

// ── Speech listener ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Disable to run proactive-only (the agent talks, can't hear).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Speech-to-text endpoint (whisper-server style: WAV in, text out).
    #[serde(default = "default_stt_url")]
    pub stt_url: String,

    /// Language hint forwarded to the recognizer.
    #[serde(default = "default_language")]
    pub language: String,

    /// External recorder command. `{path}` is replaced with the output
    /// WAV file; the command records one fixed-length segment and exits.
    #[serde(default = "default_record_command")]
    pub record_command: String,

    /// Length of each recorded segment.
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_stt_url() -> String {
    "http://localhost:8080/inference".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_record_command() -> String {
    "arecord -q -f S16_LE -r 16000 -d {secs} {path}".to_string()
}

fn default_segment_secs() -> u64 {
    4
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_url: default_stt_url(),
            language: default_language(),
            record_command: default_record_command(),
            segment_secs: default_segment_secs(),
        }
    }
}

// ── Speech synthesis & playback ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Text-to-speech endpoint (text + voice in, audio bytes out).
    #[serde(default = "default_tts_url")]
    pub tts_url: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking-rate adjustment passed through to the service.
    #[serde(default = "default_rate")]
    pub rate: String,

    /// Player command for the synthesized audio file. `{path}` is
    /// replaced with the audio file.
    #[serde(default = "default_player_command")]
    pub player_command: String,
}

fn default_tts_url() -> String {
    "http://localhost:5002/api/tts".to_string()
}

fn default_voice() -> String {
    "en-US-AriaNeural".to_string()
}

fn default_rate() -> String {
    "+10%".to_string()
}

fn default_player_command() -> String {
    "mpg123 -q {path}".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts_url: default_tts_url(),
            voice: default_voice(),
            rate: default_rate(),
            player_command: default_player_command(),
        }
    }
}

// ── Engagement scheduler ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// Proactive cadence floor; engagement never tightens below this.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Proactive cadence ceiling; neglect never loosens beyond this.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// User speech within this window after a proactive remark counts
    /// as engagement.
    #[serde(default = "default_engagement_window_secs")]
    pub engagement_window_secs: u64,

    /// Silence past this window after a proactive remark counts as
    /// being ignored.
    #[serde(default = "default_ignore_window_secs")]
    pub ignore_window_secs: u64,

    /// Base proactive cadence at startup.
    #[serde(default = "default_start_interval_secs")]
    pub start_interval_secs: u64,
}

fn default_min_interval_secs() -> u64 {
    10
}

fn default_max_interval_secs() -> u64 {
    90
}

fn default_engagement_window_secs() -> u64 {
    25
}

fn default_ignore_window_secs() -> u64 {
    60
}

fn default_start_interval_secs() -> u64 {
    20
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            engagement_window_secs: default_engagement_window_secs(),
            ignore_window_secs: default_ignore_window_secs(),
            start_interval_secs: default_start_interval_secs(),
        }
    }
}

impl EngagementConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_interval_secs == 0 {
            anyhow::bail!("engagement.min_interval_secs must be non-zero");
        }
        if self.min_interval_secs > self.max_interval_secs {
            anyhow::bail!(
                "engagement.min_interval_secs ({}) exceeds max_interval_secs ({})",
                self.min_interval_secs,
                self.max_interval_secs
            );
        }
        if self.start_interval_secs < self.min_interval_secs
            || self.start_interval_secs > self.max_interval_secs
        {
            anyhow::bail!(
                "engagement.start_interval_secs ({}) outside [{}, {}]",
                self.start_interval_secs,
                self.min_interval_secs,
                self.max_interval_secs
            );
        }
        if self.engagement_window_secs >= self.ignore_window_secs {
            anyhow::bail!(
                "engagement.engagement_window_secs ({}) must be shorter than ignore_window_secs ({})",
                self.engagement_window_secs,
                self.ignore_window_secs
            );
        }
        Ok(())
    }
}

// ── Gold dataset ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Override for the dataset directory. Defaults to
    /// `<workspace>/gold_dataset`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl DatasetConfig {
    #[must_use]
    pub fn resolve_dir(&self, workspace_dir: &std::path::Path) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| workspace_dir.join("gold_dataset"))
    }
}

// ── Personal memory ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Override for the memory file. Defaults to `<workspace>/memory.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl MemoryConfig {
    #[must_use]
    pub fn resolve_path(&self, workspace_dir: &std::path::Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| workspace_dir.join("memory.json"))
    }
}

// ── Persona ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name the agent uses for itself.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Extra persona instructions appended to the system prompt.
    #[serde(default)]
    pub extra_instructions: Option<String>,
}

fn default_agent_name() -> String {
    "Sidekick".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            extra_instructions: None,
        }
    }
}

// ── Load / save ───────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let sidekick_dir = home.join(".sidekick");

        Self {
            workspace_dir: sidekick_dir.join("workspace"),
            config_path: sidekick_dir.join("config.toml"),
            reasoning: ReasoningConfig::default(),
            capture: CaptureConfig::default(),
            listener: ListenerConfig::default(),
            speech: SpeechConfig::default(),
            engagement: EngagementConfig::default(),
            dataset: DatasetConfig::default(),
            memory: MemoryConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.engagement.validate()?;
        if !(0.0..=2.0).contains(&self.reasoning.temperature) {
            anyhow::bail!(
                "reasoning.temperature ({}) outside [0.0, 2.0]",
                self.reasoning.temperature
            );
        }
        if self.reasoning.timeout_secs == 0 {
            anyhow::bail!("reasoning.timeout_secs must be non-zero");
        }
        Ok(())
    }

    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let sidekick_dir = home.join(".sidekick");
        let config_path = sidekick_dir.join("config.toml");

        if !sidekick_dir.exists() {
            fs::create_dir_all(&sidekick_dir).context("Failed to create .sidekick directory")?;
            fs::create_dir_all(sidekick_dir.join("workspace"))
                .context("Failed to create workspace directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path.clone_from(&config_path);
            config.workspace_dir = sidekick_dir.join("workspace");
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.clone(),
                workspace_dir: sidekick_dir.join("workspace"),
                ..Self::default()
            };
            config.validate()?;
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
