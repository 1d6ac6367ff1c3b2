//! LLM provider implementations.

pub mod openai;
pub mod shared;

pub use shared::{
    ProviderError, ProviderErrorKind, ProviderResult, TextStream, resolve_api_key,
    resolve_base_url,
};
