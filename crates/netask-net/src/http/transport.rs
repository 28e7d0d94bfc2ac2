//! Attempt loop that carries one logical request over the wire.
//!
//! Every attempt sends the request, reads the whole response and applies
//! the baseline status check. A failed attempt (connectivity error or
//! non-2xx status) is handed to the [`Retrier`], which decides whether
//! another attempt follows.
//!
//! Each attempt counts its bytes on a fresh counter whose fraction is
//! forwarded to the transfer progress. The transfer progress only moves
//! forward and reaches 1.0 once, when the loop ends, whatever the outcome.

use std::future::Future;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};
use netask_core::Progress;
use netask_core::logging::targets;
use tokio::io::AsyncWriteExt;

use super::client::HttpClient;
use super::response::{ReceivedResponse, ResponseHead};
use crate::error::TransportError;
use crate::retry::Retrier;

/// Size of the chunks an upload body is streamed in.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Units the transfer progress is divided into.
const TRANSFER_UNITS: i64 = 10_000;

/// Which side of the exchange drives transfer progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Progress follows the response body as it is received.
    Receive,
    /// Progress follows the request body as it is sent.
    Send,
}

/// One logical request: a client, a retry policy and the progress to drive.
pub(crate) struct Transport<'a> {
    client: &'a HttpClient,
    retrier: &'a dyn Retrier,
    progress: &'a Progress,
}

impl<'a> Transport<'a> {
    pub(crate) fn new(client: &'a HttpClient, retrier: &'a dyn Retrier, progress: &'a Progress) -> Self {
        Self {
            client,
            retrier,
            progress,
        }
    }

    /// Send the request built by `build` and read the response into memory.
    ///
    /// `build` runs once per attempt, so streamed bodies are recreated for
    /// every retry.
    pub(crate) async fn fetch<B>(&self, build: B, direction: Direction) -> Result<ReceivedResponse, TransportError>
    where
        B: Fn(&HttpClient, &Progress) -> Result<reqwest::RequestBuilder, TransportError>,
    {
        let build = &build;
        let client = self.client;

        self.with_retry(move |progress| async move {
            let response = build(client, &progress)?.send().await?;
            let head = ResponseHead::from_reqwest(&response);
            let body = match direction {
                Direction::Receive => read_tracked(response, &progress).await?,
                Direction::Send => response.bytes().await?,
            };
            tracing::trace!(target: targets::TRANSPORT, status = head.status(), bytes = body.len(), "response received");

            head.error_for_status(&body)?;
            Ok(ReceivedResponse { head, body })
        })
        .await
    }

    /// Send the request built by `build` and stream a 2xx body into `target`.
    ///
    /// `target` is truncated on every attempt.
    pub(crate) async fn download<B>(&self, build: B, target: &Path) -> Result<ResponseHead, TransportError>
    where
        B: Fn(&HttpClient, &Progress) -> Result<reqwest::RequestBuilder, TransportError>,
    {
        let build = &build;
        let client = self.client;

        self.with_retry(move |progress| async move {
            let response = build(client, &progress)?.send().await?;
            let head = ResponseHead::from_reqwest(&response);

            if !head.is_success() {
                let body = response.bytes().await?;
                return Err(head.status_error(&body));
            }

            let written = write_tracked(response, target, &progress).await?;
            tracing::trace!(target: targets::TRANSPORT, status = head.status(), bytes = written, path = %target.display(), "download written");
            Ok(head)
        })
        .await
    }

    async fn with_retry<T, F, Fut>(&self, mut attempt: F) -> Result<T, TransportError>
    where
        F: FnMut(Progress) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        self.progress.set_total_unit_count(TRANSFER_UNITS);

        let mut attempts_so_far = 0u32;
        let result = loop {
            tracing::trace!(target: targets::TRANSPORT, attempt = attempts_so_far + 1, "starting attempt");

            let error = match attempt(self.attempt_counter()).await {
                Ok(value) => break Ok(value),
                Err(error) => error,
            };

            let decision = self.retrier.should_retry(attempts_so_far, &error);
            if !decision.retry {
                tracing::debug!(
                    target: targets::TRANSPORT,
                    attempts = attempts_so_far + 1,
                    %error,
                    "transfer failed"
                );
                break Err(error);
            }

            attempts_so_far += 1;
            tracing::warn!(
                target: targets::TRANSPORT,
                retry = attempts_so_far,
                delay_ms = decision.delay.as_millis() as u64,
                %error,
                "attempt failed, retrying"
            );
            if !decision.delay.is_zero() {
                tokio::time::sleep(decision.delay).await;
            }
        };

        self.progress.finish();
        result
    }

    /// A byte counter for one attempt.
    ///
    /// Its fraction raises the transfer progress, stopping one unit short of
    /// done so that only the end of the loop completes it.
    fn attempt_counter(&self) -> Progress {
        let counter = Progress::new(0);
        let transfer = self.progress.clone();
        counter.on_changed().connect(move |&fraction| {
            let reached = (fraction * TRANSFER_UNITS as f64) as i64;
            transfer.advance_completed_unit_count(reached.min(TRANSFER_UNITS - 1));
        });
        counter
    }
}

/// Wrap `data` in a streamed body that advances `progress` as it is sent.
pub(crate) fn tracked_body(data: Bytes, progress: &Progress) -> reqwest::Body {
    progress.set_total_unit_count(units(data.len() as u64));
    reqwest::Body::wrap_stream(tracked_chunks(data, progress.clone()))
}

fn tracked_chunks(
    data: Bytes,
    progress: Progress,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len())))
        .collect();

    let mut sent = 0u64;
    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        progress.set_completed_unit_count(units(sent));
        Ok(chunk)
    })
}

async fn read_tracked(mut response: reqwest::Response, progress: &Progress) -> Result<Bytes, TransportError> {
    let expected = response.content_length();
    progress.set_total_unit_count(expected.map_or(0, units));

    let mut buffer = BytesMut::with_capacity(expected.unwrap_or(0).min(1 << 20) as usize);
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        progress.set_completed_unit_count(units(buffer.len() as u64));
    }
    Ok(buffer.freeze())
}

async fn write_tracked(
    mut response: reqwest::Response,
    target: &Path,
    progress: &Progress,
) -> Result<u64, TransportError> {
    progress.set_total_unit_count(response.content_length().map_or(0, units));

    let mut file = tokio::fs::File::create(target).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        progress.set_completed_unit_count(units(written));
    }
    file.flush().await?;
    Ok(written)
}

fn units(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::retry::RetryPolicy;

    fn record(progress: &Progress) -> Arc<Mutex<Vec<f64>>> {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let emitted_clone = emitted.clone();
        progress.on_changed().connect(move |&fraction| emitted_clone.lock().push(fraction));
        emitted
    }

    #[tokio::test]
    async fn test_retries_only_move_progress_forward() {
        let client = HttpClient::new();
        let policy = RetryPolicy::new(2);
        let transfer = Progress::new(0);
        let emitted = record(&transfer);

        let mut attempts = 0;
        let result: Result<(), _> = Transport::new(&client, &policy, &transfer)
            .with_retry(|counter| {
                attempts += 1;
                let share = attempts;
                async move {
                    counter.set_total_unit_count(4);
                    counter.set_completed_unit_count(share);
                    Err(TransportError::Connection("refused".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3);
        let emitted = emitted.lock();
        assert!(emitted.windows(2).all(|pair| pair[0] <= pair[1]), "{emitted:?}");
        assert_eq!(emitted.iter().filter(|&&fraction| fraction == 1.0).count(), 1);
        assert_eq!(transfer.fraction_completed(), 1.0);
    }

    #[tokio::test]
    async fn test_attempt_counter_stops_short_of_done() {
        let client = HttpClient::new();
        let policy = RetryPolicy::never();
        let transfer = Progress::new(TRANSFER_UNITS);
        let transport = Transport::new(&client, &policy, &transfer);

        let counter = transport.attempt_counter();
        counter.set_total_unit_count(2);
        counter.set_completed_unit_count(1);
        assert_eq!(transfer.completed_unit_count(), TRANSFER_UNITS / 2);

        counter.finish();
        assert!(!transfer.is_finished());
        assert!(transfer.fraction_completed() < 1.0);
    }

    #[tokio::test]
    async fn test_tracked_chunks_advance_progress() {
        let data = Bytes::from(vec![7u8; UPLOAD_CHUNK_SIZE * 2 + 10]);
        let progress = Progress::new(units(data.len() as u64));

        let chunks: Vec<_> = tracked_chunks(data.clone(), progress.clone()).collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].as_ref().unwrap().len(), 10);
        assert_eq!(progress.completed_unit_count(), data.len() as i64);
        assert_eq!(progress.fraction_completed(), 1.0);
    }

    #[tokio::test]
    async fn test_empty_body_has_no_chunks() {
        let progress = Progress::new(0);
        let chunks: Vec<_> = tracked_chunks(Bytes::new(), progress.clone()).collect().await;
        assert!(chunks.is_empty());
        assert_eq!(progress.completed_unit_count(), 0);
    }
}
