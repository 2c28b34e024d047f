//! Core data types

pub mod chat;
pub mod records;
pub mod review;

pub use chat::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, JsonSchemaFormat, MessageRole,
    ResponseFormat, ResponseMessage, Usage,
};
pub use records::{Batch, Item, ItemId, MergedRecord, Product};
pub use review::{EnrichmentResponse, ItemReview};
