pub mod factory;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use factory::create_reasoner;
pub use traits::{Reasoner, ReasoningRequest};
