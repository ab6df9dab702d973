pub mod generator;
pub mod generator_factory;
pub mod ollama_llm;
pub mod openai_compatible_llm;

pub use generator::*;
pub use generator_factory::*;
pub use ollama_llm::*;
pub use openai_compatible_llm::*;
