//! Pending response handlers.
//!
//! A handler is registered with the transport when its request is written and
//! stays pending until the frames it waits for have arrived. Frames are
//! matched by frame type first and then by [`PendingHandler::is_candidate`],
//! since many statements share one response frame type.

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use parking_lot::Mutex;

use super::error::{ClientError, ClientResult};
use super::promise::Promise;
use crate::bee::Message;

/// A consumer of inbound frames waiting on the transport.
pub trait PendingHandler: Send + Sync {
    /// Frame type this handler consumes.
    fn frame_type(&self) -> u8;

    /// Cheap check whether `payload` belongs to this handler.
    fn is_candidate(&self, payload: &Bytes) -> bool;

    /// Consume a matched payload.
    ///
    /// The read task awaits this future, so a handler may pause inbound
    /// processing until it can accept more data.
    fn decode(&self, payload: Bytes) -> BoxFuture<'_, ()>;

    /// Called after each successful [`decode`](Self::decode).
    fn on_complete(&self) {}

    /// Whether this handler expects more than one frame.
    fn is_multi_frame(&self) -> bool {
        false
    }

    /// Whether this handler has seen its last frame.
    fn is_terminal(&self) -> bool {
        true
    }

    /// Fail the handler without a response, e.g. when the connection drops.
    fn abandon(&self, error: ClientError);
}

// ============================================================================
// PromiseHandler
// ============================================================================

/// Single-frame handler that completes a [`Promise`] with the decoded message.
pub struct PromiseHandler<R>
where
    R: Message + Clone + Send + Sync + 'static,
{
    promise: Promise<R>,
    decoded: Mutex<Option<ClientResult<R>>>,
}

impl<R> PromiseHandler<R>
where
    R: Message + Clone + Send + Sync + 'static,
{
    /// Create a handler completing `promise`.
    pub fn new(promise: Promise<R>) -> Self {
        Self {
            promise,
            decoded: Mutex::new(None),
        }
    }
}

impl<R> PendingHandler for PromiseHandler<R>
where
    R: Message + Clone + Send + Sync + 'static,
{
    fn frame_type(&self) -> u8 {
        R::FRAME_TYPE
    }

    fn is_candidate(&self, _payload: &Bytes) -> bool {
        true
    }

    fn decode(&self, payload: Bytes) -> BoxFuture<'_, ()> {
        let outcome = R::decode(payload).map_err(|e| ClientError::decode(e.to_string()));
        *self.decoded.lock() = Some(outcome);
        Box::pin(future::ready(()))
    }

    fn on_complete(&self) {
        if let Some(outcome) = self.decoded.lock().take() {
            match outcome {
                Ok(message) => self.promise.resolve(message),
                Err(err) => self.promise.reject(err),
            };
        }
    }

    fn abandon(&self, error: ClientError) {
        self.promise.reject(error);
    }
}

impl<R> Drop for PromiseHandler<R>
where
    R: Message + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        // No-op once the promise is complete.
        self.promise.reject(ClientError::ConnectionClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::{ConnectResponse, ServerError};
    use bytes::BytesMut;

    fn encode(message: &ConnectResponse) -> Bytes {
        let mut buf = BytesMut::new();
        message.encode(&mut buf).unwrap();
        buf.freeze()
    }

    #[tokio::test]
    async fn test_promise_handler_resolves() {
        let promise = Promise::new();
        let handler = PromiseHandler::<ConnectResponse>::new(promise.clone());
        assert_eq!(handler.frame_type(), 0x01);
        assert!(!handler.is_multi_frame());

        handler.decode(encode(&ConnectResponse::Ok)).await;
        assert!(!promise.is_complete());
        handler.on_complete();
        assert_eq!(promise.wait().await, Ok(ConnectResponse::Ok));
        assert!(handler.is_terminal());
    }

    #[tokio::test]
    async fn test_promise_handler_decode_failure() {
        let promise = Promise::new();
        let handler = PromiseHandler::<ConnectResponse>::new(promise.clone());

        handler.decode(Bytes::from_static(b"\x01\0")).await;
        handler.on_complete();
        assert!(matches!(promise.wait().await, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_promise_handler_abandon_and_drop() {
        let promise = Promise::<ConnectResponse>::new();
        let handler = PromiseHandler::new(promise.clone());
        handler.abandon(ClientError::ConnectionClosed);
        assert_eq!(promise.wait().await, Err(ClientError::ConnectionClosed));

        let promise = Promise::<ConnectResponse>::new();
        drop(PromiseHandler::new(promise.clone()));
        assert_eq!(promise.wait().await, Err(ClientError::ConnectionClosed));

        let promise = Promise::new();
        let handler = PromiseHandler::new(promise.clone());
        let rejected = ConnectResponse::Error(ServerError::new(5, "no"));
        handler.decode(encode(&rejected)).await;
        handler.on_complete();
        drop(handler);
        assert_eq!(promise.wait().await, Ok(rejected));
    }
}
