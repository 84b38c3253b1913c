//! Chat delivery
//!
//! - `Notifier`: the "send one text message" capability
//! - `RetryingNotifier`: bounded retry around any notifier
//! - `TelegramClient`: Telegram Bot API transport

pub mod retry;
pub mod telegram;

pub use retry::{with_retry, RetryPolicy, Retryable};
pub use telegram::TelegramClient;

use crate::utils::DeliveryError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Delivers a text message to the configured chat.
///
/// Implementations must be safe to call from several tasks at once; each call is an
/// independent request.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        (**self).send(text).await
    }
}

/// Wraps a notifier with a bounded retry policy
pub struct RetryingNotifier<N> {
    inner: N,
    policy: RetryPolicy,
}

impl<N: Notifier> RetryingNotifier<N> {
    pub fn new(inner: N, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryingNotifier<N> {
    #[instrument(skip_all, fields(len = text.len()))]
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        with_retry(&self.policy, || self.inner.send(text)).await?;
        debug!("Message delivered");
        Ok(())
    }
}
