//! Generative backend integration
//!
//! Defines the narrow [`GenerativeBackend`] trait the step executor depends
//! on, the model tier ladder, and an OpenRouter HTTP implementation with
//! streaming accumulation and cooperative cancellation.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::{HttpBackend, HttpBackendBuilder};
pub use types::{Message, ModelTier, QueryRequest, QueryResponse};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Text-completion backend the executor runs steps against.
///
/// Implementations must observe the cancellation token at every suspension
/// point: an in-flight query aborts with [`crate::Error::Cancelled`] as soon
/// as the token is triggered. A successful-but-empty response is `Ok` with
/// empty text, never an error.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Run a single prompt to completion, accumulating streamed output.
    async fn run_query(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse>;
}
