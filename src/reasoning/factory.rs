use crate::config::{ReasonerKind, ReasoningConfig};
use crate::reasoning::ollama::OllamaReasoner;
use crate::reasoning::openai::OpenAiCompatibleReasoner;
use crate::reasoning::traits::Reasoner;

/// Build the configured reasoning backend. The kind is a tagged enum
/// resolved when the config loads; nothing downstream matches on
/// provider-name strings.
#[must_use]
pub fn create_reasoner(config: &ReasoningConfig) -> Box<dyn Reasoner> {
    match config.backend {
        ReasonerKind::Ollama => Box::new(OllamaReasoner::new(config)),
        ReasonerKind::OpenAi => Box::new(OpenAiCompatibleReasoner::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_ollama_by_default() {
        let r = create_reasoner(&ReasoningConfig::default());
        assert_eq!(r.name(), "ollama");
    }

    #[test]
    fn creates_openai_when_configured() {
        let config = ReasoningConfig {
            backend: ReasonerKind::OpenAi,
            ..ReasoningConfig::default()
        };
        let r = create_reasoner(&config);
        assert_eq!(r.name(), "openai");
    }
}
