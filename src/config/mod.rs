pub mod schema;

pub use schema::{
    CaptureConfig, Config, DatasetConfig, EngagementConfig, ListenerConfig, MemoryConfig,
    PersonaConfig, ReasonerKind, ReasoningConfig, SpeechConfig,
};
