//! AI adapters - implementations of the CompletionProvider port.
//!
//! - `MockCompletionProvider` - scripted responses for tests
//! - `OpenAICompletionProvider` - OpenAI chat completions

mod mock_completion;
mod openai_completion;

pub use mock_completion::{MockCompletionProvider, EMPTY_HINT};
pub use openai_completion::{OpenAICompletionProvider, OpenAIConfig};
