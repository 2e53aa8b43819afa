//! Streaming statement responses.
//!
//! A statement answers with one column header, any number of rows and one
//! terminal frame (abort or error), all tagged with the statement id. The
//! read task feeds those frames to a [`StatementHandler`]; the caller pulls
//! rows out of the paired [`StreamingResponse`].
//!
//! # States
//!
//! ```text
//! AwaitingHeader --Columns--> ReceivingRows --Abort/Error--> Done
//!        \_____________________Abort/Error____________________/
//! ```
//!
//! Rows are buffered up to a fixed capacity. When the buffer is full the
//! handler stops the read task until the caller takes a row, so rows are
//! never dropped for lack of space.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::error::{ClientError, ClientResult};
use super::handler::PendingHandler;
use super::record::ResultRow;
use crate::bee::message::frame_type;
use crate::bee::{ColumnInfo, Message, StatementEvent, StatementResponse};

/// Statement response phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No column header yet
    AwaitingHeader,
    /// Header received, rows may follow
    ReceivingRows,
    /// Abort, error or connection loss seen
    Done,
}

struct StreamState {
    phase: Phase,
    columns: Option<Arc<[ColumnInfo]>>,
    rows: VecDeque<ResultRow>,
    failure: Option<ClientError>,
}

struct Shared {
    id: u32,
    state: Mutex<StreamState>,
    notify: Notify,
    /// Free row buffer slots
    slots: Semaphore,
}

impl Shared {
    fn finish(&self, failure: Option<ClientError>) {
        {
            let mut state = self.state.lock();
            if state.phase == Phase::Done {
                return;
            }
            if state.failure.is_none() {
                state.failure = failure;
            }
            state.phase = Phase::Done;
        }
        self.notify.notify_waiters();
    }
}

/// Create the producer and consumer halves of one statement response.
pub fn statement_channel(
    id: u32,
    row_capacity: usize,
    timeout: Duration,
) -> (StatementHandler, StreamingResponse) {
    let shared = Arc::new(Shared {
        id,
        state: Mutex::new(StreamState {
            phase: Phase::AwaitingHeader,
            columns: None,
            rows: VecDeque::new(),
            failure: None,
        }),
        notify: Notify::new(),
        slots: Semaphore::new(row_capacity.clamp(1, Semaphore::MAX_PERMITS)),
    });

    (
        StatementHandler {
            shared: Arc::clone(&shared),
        },
        StreamingResponse { shared, timeout },
    )
}

// ============================================================================
// StatementHandler
// ============================================================================

/// Producer half: consumes the statement's frames on the read task.
pub struct StatementHandler {
    shared: Arc<Shared>,
}

impl StatementHandler {
    /// Statement id this handler matches.
    pub fn id(&self) -> u32 {
        self.shared.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    async fn apply(&self, event: StatementEvent) {
        let shared = &self.shared;
        match event {
            StatementEvent::Columns(columns) => {
                {
                    let mut state = shared.state.lock();
                    if state.phase != Phase::AwaitingHeader {
                        debug!(id = shared.id, "ignoring repeated column header");
                        return;
                    }
                    state.columns = Some(columns.into());
                    state.phase = Phase::ReceivingRows;
                }
                shared.notify.notify_waiters();
            }
            StatementEvent::Row(values) => {
                let columns = {
                    let state = shared.state.lock();
                    if state.phase == Phase::Done {
                        debug!(id = shared.id, "dropping row after end of statement");
                        return;
                    }
                    state.columns.clone()
                };
                let columns = match columns {
                    Some(columns) if columns.len() == values.len() => columns,
                    Some(columns) => {
                        warn!(
                            id = shared.id,
                            expected = columns.len(),
                            actual = values.len(),
                            "dropping row with wrong arity"
                        );
                        return;
                    }
                    None => {
                        warn!(id = shared.id, "dropping row received before column header");
                        return;
                    }
                };

                // Closed when the consumer is gone.
                match shared.slots.acquire().await {
                    Ok(permit) => permit.forget(),
                    Err(_) => {
                        trace!(id = shared.id, "response dropped, discarding row");
                        return;
                    }
                }

                shared
                    .state
                    .lock()
                    .rows
                    .push_back(ResultRow::new(columns, values));
                shared.notify.notify_waiters();
            }
            StatementEvent::Abort => shared.finish(None),
            StatementEvent::Error(err) => shared.finish(Some(err.into())),
        }
    }
}

impl PendingHandler for StatementHandler {
    fn frame_type(&self) -> u8 {
        frame_type::STATEMENT_RESPONSE
    }

    fn is_candidate(&self, payload: &Bytes) -> bool {
        StatementResponse::peek_id(payload) == Some(self.shared.id)
    }

    fn decode(&self, payload: Bytes) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match StatementResponse::decode(payload) {
                Ok(response) => {
                    trace!(id = self.shared.id, event = response.event.name(), "statement frame");
                    self.apply(response.event).await;
                }
                Err(err) => self.shared.finish(Some(ClientError::decode(err.to_string()))),
            }
        })
    }

    fn is_multi_frame(&self) -> bool {
        true
    }

    fn is_terminal(&self) -> bool {
        self.phase() == Phase::Done
    }

    fn abandon(&self, error: ClientError) {
        self.shared.finish(Some(error));
    }
}

impl Drop for StatementHandler {
    fn drop(&mut self) {
        // No-op once the statement is done.
        self.shared.finish(Some(ClientError::ConnectionClosed));
    }
}

// ============================================================================
// StreamingResponse
// ============================================================================

/// Consumer half: pulls columns and rows of one statement.
///
/// A response has a single consumer; row access takes `&mut self`.
pub struct StreamingResponse {
    shared: Arc<Shared>,
    /// Default bound for waits
    timeout: Duration,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("StreamingResponse")
            .field("id", &self.shared.id)
            .field("phase", &state.phase)
            .field("buffered", &state.rows.len())
            .finish()
    }
}

impl StreamingResponse {
    /// Statement id.
    pub fn id(&self) -> u32 {
        self.shared.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Number of rows buffered and not yet taken.
    pub fn buffered(&self) -> usize {
        self.shared.state.lock().rows.len()
    }

    /// Wait until `check` yields a value, or fail after `timeout`.
    ///
    /// A timeout too large to form a deadline waits without one.
    async fn wait_for<T>(
        &self,
        timeout: Duration,
        what: &str,
        mut check: impl FnMut(&StreamState) -> Option<ClientResult<T>>,
    ) -> ClientResult<T> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let ready = {
                let state = self.shared.state.lock();
                check(&state)
            };
            if let Some(result) = ready {
                return result;
            }

            let woken = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, notified).await.is_ok(),
                None => {
                    notified.await;
                    true
                }
            };
            if !woken {
                return Err(ClientError::timeout(format!(
                    "statement {}: no {} within {:?}",
                    self.shared.id, what, timeout
                )));
            }
        }
    }

    /// Column header, waiting up to the statement timeout for it.
    pub async fn columns(&self) -> ClientResult<Arc<[ColumnInfo]>> {
        self.columns_timeout(self.timeout).await
    }

    /// Column header, waiting up to `timeout` for it.
    pub async fn columns_timeout(&self, timeout: Duration) -> ClientResult<Arc<[ColumnInfo]>> {
        self.wait_for(timeout, "column header", |state| {
            if let Some(failure) = &state.failure {
                return Some(Err(failure.clone()));
            }
            if let Some(columns) = &state.columns {
                return Some(Ok(Arc::clone(columns)));
            }
            if state.phase == Phase::Done {
                return Some(Err(ClientError::decode(
                    "statement ended without a column header",
                )));
            }
            None
        })
        .await
    }

    /// Whether another row is available, waiting up to the statement timeout.
    pub async fn has_next(&mut self) -> ClientResult<bool> {
        self.has_next_timeout(self.timeout).await
    }

    /// Whether another row is available, waiting up to `timeout`.
    ///
    /// Returns `false` only once the statement is done and every buffered row
    /// has been taken.
    pub async fn has_next_timeout(&mut self, timeout: Duration) -> ClientResult<bool> {
        self.wait_for(timeout, "row", |state| {
            if let Some(failure) = &state.failure {
                return Some(Err(failure.clone()));
            }
            if !state.rows.is_empty() {
                return Some(Ok(true));
            }
            if state.phase == Phase::Done {
                return Some(Ok(false));
            }
            None
        })
        .await
    }

    /// Take the next buffered row without waiting.
    ///
    /// Fails with [`ClientError::EmptyResult`] when no row is buffered; call
    /// [`has_next`](Self::has_next) first to wait for one.
    pub fn next(&mut self) -> ClientResult<ResultRow> {
        let row = {
            let mut state = self.shared.state.lock();
            if let Some(failure) = &state.failure {
                return Err(failure.clone());
            }
            state.rows.pop_front().ok_or(ClientError::EmptyResult)?
        };
        self.shared.slots.add_permits(1);
        Ok(row)
    }

    /// Wait for and take the next row; `None` at the end of the results.
    pub async fn next_row(&mut self) -> ClientResult<Option<ResultRow>> {
        if self.has_next().await? {
            self.next().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Turn the response into a stream of rows.
    ///
    /// The stream ends after the last row, or after yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = ClientResult<ResultRow>> {
        stream::unfold(Some(self), |response| async move {
            let mut response = response?;
            match response.next_row().await {
                Ok(Some(row)) => Some((Ok(row), Some(response))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    /// Take every remaining row.
    pub async fn collect_rows(mut self) -> ClientResult<Vec<ResultRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl Drop for StreamingResponse {
    fn drop(&mut self) {
        // Releases a read task blocked on a full buffer.
        self.shared.slots.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::{DataType, ServerError, Value};
    use bytes::BytesMut;
    use futures::StreamExt;

    fn frame(id: u32, event: StatementEvent) -> Bytes {
        let mut buf = BytesMut::new();
        StatementResponse::new(id, event).encode(&mut buf).unwrap();
        buf.freeze()
    }

    fn header() -> StatementEvent {
        StatementEvent::Columns(vec![
            ColumnInfo::new("a", DataType::Integer),
            ColumnInfo::new("b", DataType::String),
        ])
    }

    fn row(n: i64, s: &str) -> StatementEvent {
        StatementEvent::Row(vec![Value::Integer(n), Value::from(s)])
    }

    async fn feed(handler: &StatementHandler, id: u32, event: StatementEvent) {
        handler.decode(frame(id, event)).await;
        handler.on_complete();
    }

    #[tokio::test]
    async fn test_header_rows_abort() {
        let (handler, mut response) = statement_channel(7, 16, Duration::from_secs(1));
        feed(&handler, 7, header()).await;
        feed(&handler, 7, row(1, "x")).await;
        feed(&handler, 7, row(2, "y")).await;
        assert!(!handler.is_terminal());
        feed(&handler, 7, StatementEvent::Abort).await;
        assert!(handler.is_terminal());

        let columns = response.columns().await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(response.has_next().await.unwrap());
        let first = response.next().unwrap();
        assert_eq!(first.get_int("a").unwrap(), 1);
        assert!(response.has_next().await.unwrap());
        assert_eq!(response.next().unwrap().get_string("b").unwrap(), "y");
        assert!(!response.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_candidate_by_id() {
        let (handler, _response) = statement_channel(7, 16, Duration::from_secs(1));
        assert!(handler.is_candidate(&frame(7, StatementEvent::Abort)));
        assert!(!handler.is_candidate(&frame(9, StatementEvent::Abort)));
        assert!(!handler.is_candidate(&Bytes::from_static(b"\0")));
        assert!(handler.is_multi_frame());
    }

    #[tokio::test]
    async fn test_row_before_header_dropped() {
        let (handler, mut response) = statement_channel(1, 16, Duration::from_secs(1));
        feed(&handler, 1, row(0, "early")).await;
        feed(&handler, 1, header()).await;
        feed(&handler, 1, StatementEvent::Row(vec![Value::Nil])).await;
        feed(&handler, 1, row(1, "x")).await;
        feed(&handler, 1, StatementEvent::Abort).await;

        let rows = {
            let mut rows = Vec::new();
            while response.has_next().await.unwrap() {
                rows.push(response.next().unwrap());
            }
            rows
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_string("b").unwrap(), "x");
    }

    #[tokio::test]
    async fn test_terminal_idempotence() {
        let (handler, mut response) = statement_channel(1, 16, Duration::from_secs(60));
        feed(&handler, 1, header()).await;
        feed(&handler, 1, StatementEvent::Abort).await;

        for _ in 0..5 {
            let started = std::time::Instant::now();
            assert!(!response.has_next().await.unwrap());
            assert_eq!(response.next(), Err(ClientError::EmptyResult));
            assert!(started.elapsed() < Duration::from_secs(1));
        }

        // Frames after the end change nothing.
        feed(&handler, 1, row(5, "late")).await;
        assert!(!response.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn test_error_surfaces_everywhere() {
        let (handler, mut response) = statement_channel(1, 16, Duration::from_secs(1));
        feed(
            &handler,
            1,
            StatementEvent::Error(ServerError::new(60937, "auth failed")),
        )
        .await;
        assert!(handler.is_terminal());

        let err = response.columns().await.unwrap_err();
        assert_eq!(err.code(), Some(60937));
        let err = response.has_next().await.unwrap_err();
        assert_eq!(err, ClientError::application(60937, "auth failed"));
        assert_eq!(response.next().unwrap_err().code(), Some(60937));
    }

    #[tokio::test]
    async fn test_columns_wait_wakes() {
        let (handler, response) = statement_channel(3, 16, Duration::from_secs(5));
        let waiter = tokio::spawn(async move { response.columns().await.map(|c| c.len()) });
        tokio::task::yield_now().await;
        feed(&handler, 3, header()).await;
        assert_eq!(waiter.await.unwrap(), Ok(2));
    }

    #[tokio::test]
    async fn test_has_next_timeout() {
        let (_handler, mut response) = statement_channel(3, 16, Duration::from_secs(60));
        let started = std::time::Instant::now();
        let result = response.has_next_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ClientError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unbounded_waits() {
        let (handler, mut response) = statement_channel(3, usize::MAX, Duration::from_secs(1));
        feed(&handler, 3, header()).await;
        let columns = response.columns_timeout(Duration::MAX).await.unwrap();
        assert_eq!(columns.len(), 2);

        let waiter = tokio::spawn(async move { response.has_next_timeout(Duration::MAX).await });
        tokio::task::yield_now().await;
        feed(&handler, 3, StatementEvent::Abort).await;
        assert_eq!(waiter.await.unwrap(), Ok(false));
    }

    #[tokio::test]
    async fn test_done_without_header() {
        let (handler, response) = statement_channel(3, 16, Duration::from_secs(1));
        feed(&handler, 3, StatementEvent::Abort).await;
        assert!(matches!(response.columns().await, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_statement() {
        let (handler, mut response) = statement_channel(3, 16, Duration::from_secs(1));
        handler.decode(Bytes::from_static(b"\0\0\0\x03\x09")).await;
        assert!(handler.is_terminal());
        assert!(matches!(response.has_next().await, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_backpressure_pauses_producer() {
        let (handler, mut response) = statement_channel(1, 2, Duration::from_secs(1));
        let handler = Arc::new(handler);
        feed(&handler, 1, header()).await;
        feed(&handler, 1, row(1, "a")).await;
        feed(&handler, 1, row(2, "b")).await;

        let producer = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                feed(&handler, 1, row(3, "c")).await;
                feed(&handler, 1, StatementEvent::Abort).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());
        assert_eq!(response.buffered(), 2);

        assert_eq!(response.next().unwrap().get_int("a").unwrap(), 1);
        producer.await.unwrap();

        let rest = response.collect_rows().await.unwrap();
        let ids: Vec<i64> = rest.iter().map(|r| r.get_int("a").unwrap()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_dropped_response_releases_producer() {
        let (handler, response) = statement_channel(1, 1, Duration::from_secs(1));
        feed(&handler, 1, header()).await;
        feed(&handler, 1, row(1, "a")).await;
        drop(response);

        tokio::time::timeout(Duration::from_secs(1), feed(&handler, 1, row(2, "b")))
            .await
            .expect("producer blocked on a dropped response");
    }

    #[tokio::test]
    async fn test_abandon_and_drop() {
        let (handler, mut response) = statement_channel(1, 4, Duration::from_secs(60));
        handler.abandon(ClientError::ConnectionClosed);
        assert_eq!(response.has_next().await, Err(ClientError::ConnectionClosed));

        let (handler, mut response) = statement_channel(2, 4, Duration::from_secs(60));
        drop(handler);
        assert_eq!(response.has_next().await, Err(ClientError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (handler, response) = statement_channel(4, 8, Duration::from_secs(1));
        feed(&handler, 4, header()).await;
        feed(&handler, 4, row(1, "x")).await;
        feed(&handler, 4, row(2, "y")).await;
        feed(&handler, 4, StatementEvent::Abort).await;

        let rows: Vec<ResultRow> = response
            .into_stream()
            .map(|row| row.unwrap())
            .collect()
            .await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_string("b").unwrap(), "y");
    }
}
