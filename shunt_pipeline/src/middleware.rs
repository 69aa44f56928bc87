use crate::cursor::ChainCursor;
use async_trait::async_trait;
use shunt_core::{DispatchContext, DispatchResult, Dispatchable, MessageKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The stage of the dispatch at which a middleware prefers to run.
///
/// Stages are advisory ordering hints consumed by profile assembly; the
/// chain itself executes whatever order it was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MiddlewareStage {
    /// Before anything else touches the message.
    PreProcessing,
    /// Structural and semantic validation.
    Validation,
    /// The main body of work around the handler.
    Processing,
    /// After the handler has produced its result.
    PostProcessing,
    /// Last-word concerns such as auditing.
    End,
    /// No stated preference.
    #[default]
    Unspecified,
}

/// A single middleware in the dispatch pipeline.
///
/// A middleware receives the message, the mutable per-dispatch context, and
/// a [`Next`] continuation. Awaiting [`Next::run`] passes control onward;
/// returning without calling it short-circuits the rest of the chain
/// (including the final handler), and the middleware's own result becomes
/// the dispatch result. The executor never calls `next` on a middleware's
/// behalf.
///
/// A middleware that panics takes the dispatch down with it: the pipeline
/// adds no retry, no logging wrapper, and no result substitution.
///
/// ## Example
///
/// ```
/// use async_trait::async_trait;
/// use shunt_core::{DispatchContext, DispatchResult, Dispatchable};
/// use shunt_pipeline::{Middleware, Next};
/// use tokio_util::sync::CancellationToken;
///
/// struct StampTenant;
///
/// #[async_trait]
/// impl Middleware for StampTenant {
///     async fn invoke(
///         &self,
///         message: &dyn Dispatchable,
///         context: &mut DispatchContext,
///         next: Next<'_>,
///         token: &CancellationToken,
///     ) -> DispatchResult {
///         context.properties_mut().set("tenant", "default");
///
///         next.run(message, context, token).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Reports the stage this middleware prefers to run at.
    fn stage(&self) -> MiddlewareStage {
        MiddlewareStage::Unspecified
    }

    /// Reports the message kinds this middleware applies to. Registration
    /// constraints, when present, override this mask.
    fn applicable_kinds(&self) -> MessageKind {
        MessageKind::ALL
    }

    /// Handles one dispatch, either passing control onward via `next` or
    /// short-circuiting by returning without calling it.
    async fn invoke(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        next: Next<'_>,
        token: &CancellationToken,
    ) -> DispatchResult;
}

/// The terminal callable of a chain: the message handler the pipeline
/// ultimately delivers to.
#[async_trait]
pub trait FinalHandler: Send + Sync {
    /// Handles the message and produces the dispatch result.
    async fn handle(
        &self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult;
}

/// The continuation handed to each middleware.
///
/// `Next` is a [`ChainCursor`] over the interned middleware array plus a
/// reference to the final handler — nothing is allocated per middleware.
/// [`run`](Next::run) consumes the handle, which is what makes calling the
/// continuation twice impossible by construction.
pub struct Next<'a> {
    cursor: ChainCursor<'a>,
    terminal: &'a dyn FinalHandler,
}

impl<'a> Next<'a> {
    /// Creates the entry continuation for the given chain slice and final
    /// handler.
    pub(crate) fn entry(
        middlewares: &'a [Arc<dyn Middleware>],
        terminal: &'a dyn FinalHandler,
    ) -> Self {
        Self {
            cursor: ChainCursor::new(middlewares),
            terminal,
        }
    }

    /// Passes control to the next middleware in the chain, or to the final
    /// handler once the chain is exhausted.
    pub async fn run(
        mut self,
        message: &dyn Dispatchable,
        context: &mut DispatchContext,
        token: &CancellationToken,
    ) -> DispatchResult {
        match self.cursor.move_next() {
            Some(middleware) => {
                let continuation = Next {
                    cursor: self.cursor,
                    terminal: self.terminal,
                };

                middleware
                    .invoke(message, context, continuation, token)
                    .await
            }
            None => self.terminal.handle(message, context, token).await,
        }
    }
}
