pub mod pipeline;
pub mod prompts;

pub use pipeline::{AiPipeline, ChatReply, DocumentReply, ProviderEntry, RetryPolicy, SummaryReply};
