//! Chat completion provider trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::types::Message;

/// Lazy sequence of answer fragments.
///
/// Dropping the stream abandons the underlying provider call, so a consumer
/// that stops reading also cancels the network request.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streams answer tokens for a prompt plus conversation history.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Start a streamed completion.
    ///
    /// `system` carries the fixed instruction with the assembled context
    /// already injected; `history` holds the committed turns of the
    /// conversation; `user_message` is the new question. Errors during
    /// iteration surface as `Err` items on the stream.
    async fn stream_chat(
        &self,
        system: &str,
        history: &[Message],
        user_message: &str,
    ) -> Result<TokenStream>;
}
