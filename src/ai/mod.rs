mod provider;
pub mod anthropic;
pub mod openai;

pub use provider::{
    select_provider, ChatExchange, ChatMessage, ChatProvider, ProviderKind, GENERATE_PROMPT,
    REFINE_PROMPT,
};

#[cfg(test)]
pub use provider::MockChatProvider;
