use crate::context::DispatchContext;
use crate::message::Dispatchable;
use crate::result::DispatchResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The seam between the transport edge and the dispatch pipeline.
///
/// Transport routers forward every inbound message through this trait
/// without knowing anything about middleware chains, inbox deduplication, or
/// handler registries: all of that lives behind the implementation supplied
/// by the embedding application (typically the `Dispatcher` of the `shunt`
/// entrypoint crate).
#[async_trait]
pub trait InboundDispatcher: Send + Sync {
    /// Drives the given message through the pipeline to its handler,
    /// returning the uniform dispatch outcome.
    async fn dispatch(
        &self,
        message: Arc<dyn Dispatchable>,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult;
}
