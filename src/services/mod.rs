//! Services layer: AI gateway and the brain orchestration built on it

pub mod brain;
pub mod llm;

pub use brain::{AskResult, BrainService, CaptureRequest, PublicAnswer, PublicSource};
pub use llm::{AiGateway, CitedItem, CompletionTransport, ProviderKind, QueryAnswer, RetryPolicy};
