//! Interaction plumbing: the handler trait, the component id codec, component registration,
//! response tracking and the dispatcher that ties them together.
//!
//! `handler.rs` hands every inbound interaction to [`dispatch::Dispatcher`], which derives a
//! lookup key and invokes the matching route or component handler.

pub mod components;
pub mod dispatch;
pub mod ids;
pub mod responder;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

pub use components::{ComponentDef, ComponentFamily, ComponentKind, ComponentRegistry};
pub use dispatch::{DispatchOutcome, Dispatcher, InteractionRoute, Invocation};
pub use ids::{ComponentCodec, Decoded, PayloadState};
pub use responder::{InteractionResponder, Reply, Responder};

/// Code that runs for a command route or a registered component.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()>;

    /// Called for autocomplete requests on the route. Most handlers have none.
    async fn autocomplete(&self, _inv: Invocation) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Adapts an async closure into an [`InteractionHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> InteractionHandler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        (self.0)(inv).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn InteractionHandler>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
