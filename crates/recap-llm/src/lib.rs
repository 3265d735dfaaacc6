pub mod types;
pub mod traits;
pub mod cascade;
pub mod openai;

pub use traits::{
    ChatClient,
    StructuredClient,
    ChatRequest, ChatResponse, ChatOptions,
    StructuredRequest, StructuredResponse,
    ResponseFormat, JsonSchemaFormat,
    TokenUsage,
};

pub use cascade::CascadeClient;
pub use openai::{OpenAIClient, OPENAI_API_BASE, OPENROUTER_API_BASE};
pub use types::{Message, Role};
