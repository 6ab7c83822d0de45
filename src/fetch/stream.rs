//! Bounded streaming transfer.
//!
//! The body is consumed chunk by chunk and every byte is counted against
//! `max_bytes` before it is kept. The transfer is abandoned the moment the
//! running total passes the ceiling, whatever the headers claimed. On any
//! failure the partial buffer is dropped; callers only ever see a complete
//! body or an error.

use super::error::{TransferError, TransferPhase, error_chain};
use super::retry::with_retry;
use super::{TransferLimits, is_image_content_type};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, StatusCode};
use std::io::ErrorKind;

/// Fetch one candidate, retrying transient failures per `limits.retry`.
pub async fn fetch_bounded(
    client: &Client,
    locator: &str,
    limits: &TransferLimits,
) -> Result<Vec<u8>, TransferError> {
    with_retry(&limits.retry, locator, |attempt| {
        tracing::debug!(locator, attempt, "starting transfer");
        fetch_once(client, locator, limits)
    })
    .await
}

async fn fetch_once(
    client: &Client,
    locator: &str,
    limits: &TransferLimits,
) -> Result<Vec<u8>, TransferError> {
    let budget = limits.header_budget();
    let response = tokio::time::timeout(budget, client.get(locator).send())
        .await
        .map_err(|_| TransferError::Timeout {
            phase: TransferPhase::Headers,
            after: budget,
        })?
        .map_err(|e| classify(e, budget))?;

    check_status(response.status())?;
    check_headers(response.headers(), limits.max_bytes)?;
    read_bounded(response.bytes_stream(), limits).await
}

fn check_status(status: StatusCode) -> Result<(), TransferError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransferError::Status(status.as_u16()))
    }
}

/// Reject on response headers before touching the body.
fn check_headers(headers: &HeaderMap, max_bytes: u64) -> Result<(), TransferError> {
    if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        if !content_type.trim().is_empty() && !is_image_content_type(content_type) {
            return Err(TransferError::NotAnImage(content_type.trim().to_string()));
        }
    }
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    match declared {
        Some(declared) if declared > max_bytes => Err(TransferError::DeclaredTooLarge {
            declared,
            max: max_bytes,
        }),
        _ => Ok(()),
    }
}

/// Drain `body` into memory, never holding more than `limits.max_bytes`.
///
/// Network chunks are split into `chunk_size` pieces and each piece is
/// accounted before it is copied. The buffer is not preallocated from any
/// declared length, and its capacity never grows past `limits.max_bytes`.
pub(crate) async fn read_bounded<S, E>(
    body: S,
    limits: &TransferLimits,
) -> Result<Vec<u8>, TransferError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error,
{
    let mut body = std::pin::pin!(body);
    let chunk_size = limits.chunk_size.max(1);
    let ceiling = usize::try_from(limits.max_bytes).unwrap_or(usize::MAX);
    let mut buf = Vec::new();
    let mut total: u64 = 0;

    loop {
        let next = tokio::time::timeout(limits.read_timeout, body.next())
            .await
            .map_err(|_| TransferError::Timeout {
                phase: TransferPhase::Read,
                after: limits.read_timeout,
            })?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| TransferError::Connection(error_chain(&e)))?;
        for piece in chunk.chunks(chunk_size) {
            total += piece.len() as u64;
            if total > limits.max_bytes {
                return Err(TransferError::TooLarge {
                    read: total,
                    max: limits.max_bytes,
                });
            }
            reserve_within(&mut buf, piece.len(), ceiling)?;
            buf.extend_from_slice(piece);
        }
    }
    Ok(buf)
}

/// Make room for `additional` bytes, doubling as `Vec` would but never
/// reserving past `ceiling`. The caller has already checked that the bytes
/// themselves fit.
fn reserve_within(buf: &mut Vec<u8>, additional: usize, ceiling: usize) -> Result<(), TransferError> {
    let needed = buf.len().saturating_add(additional);
    if needed <= buf.capacity() {
        return Ok(());
    }
    let target = buf.capacity().saturating_mul(2).max(needed).min(ceiling.max(needed));
    buf.try_reserve_exact(target - buf.len())
        .map_err(|e| TransferError::Allocation(e.to_string()))
}

fn classify(err: reqwest::Error, budget: std::time::Duration) -> TransferError {
    if err.is_timeout() {
        TransferError::Timeout {
            phase: TransferPhase::Headers,
            after: budget,
        }
    } else if err.is_builder() {
        TransferError::Unsupported(error_chain(&err))
    } else if err.is_redirect() {
        TransferError::Redirect(error_chain(&err))
    } else if is_retryable_network_error(&err) {
        TransferError::Connection(error_chain(&err))
    } else {
        TransferError::Unreachable(error_chain(&err))
    }
}

/// Look for the I/O error underneath a transport failure and decide from its
/// kind. Refused, reset and dropped connections are worth another try;
/// resolver failures and TLS rejections (`InvalidData`, `Other`, ...) are not.
/// With no I/O error in the chain (the peer closed mid-exchange) retry.
fn is_retryable_network_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::UnexpectedEof
            );
        }
        source = cause.source();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RetryPolicy;
    use futures_util::stream;
    use reqwest::header::HeaderValue;
    use std::io;
    use std::time::Duration;

    fn limits(max_bytes: u64, chunk_size: usize) -> TransferLimits {
        TransferLimits {
            max_bytes,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(200),
            chunk_size,
            retry: RetryPolicy::none(),
        }
    }

    fn body(chunks: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    #[tokio::test]
    async fn reads_whole_body_within_limit() {
        let out = read_bounded(body(vec![b"abc", b"defg"]), &limits(7, 2))
            .await
            .unwrap();
        assert_eq!(out, b"abcdefg");
    }

    #[tokio::test]
    async fn aborts_once_ceiling_passed() {
        let err = read_bounded(body(vec![b"abcd", b"efgh"]), &limits(5, 2))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::TooLarge { read: 6, max: 5 });
    }

    #[tokio::test]
    async fn buffer_capacity_stays_within_ceiling() {
        let chunks = stream::iter(
            [40_000, 40_000, 20_000].map(|n| Ok::<_, io::Error>(Bytes::from(vec![1u8; n]))),
        );
        let out = read_bounded(chunks, &limits(100_000, 40_000)).await.unwrap();
        assert_eq!(out.len(), 100_000);
        assert!(out.capacity() <= 100_000, "capacity {}", out.capacity());
    }

    #[test]
    fn reserve_doubles_until_ceiling() {
        let mut buf = Vec::new();
        reserve_within(&mut buf, 10, 100).unwrap();
        assert_eq!(buf.capacity(), 10);
        buf.extend_from_slice(&[0; 10]);
        reserve_within(&mut buf, 5, 100).unwrap();
        assert_eq!(buf.capacity(), 20);
        buf.extend_from_slice(&[0; 15]);
        reserve_within(&mut buf, 70, 100).unwrap();
        assert_eq!(buf.capacity(), 95);
    }

    #[test]
    fn network_errors_retry_by_io_kind() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let tls = io::Error::new(io::ErrorKind::InvalidData, "received corrupt message");
        let dns = io::Error::other("failed to lookup address information");
        assert!(is_retryable_network_error(&refused));
        assert!(is_retryable_network_error(&reset));
        assert!(!is_retryable_network_error(&tls));
        assert!(!is_retryable_network_error(&dns));
    }

    #[test]
    fn network_error_kind_found_through_wrappers() {
        #[derive(Debug, thiserror::Error)]
        #[error("tcp connect error")]
        struct Wrapper(#[source] io::Error);

        let wrapped = Wrapper(io::Error::new(io::ErrorKind::InvalidData, "bad certificate"));
        assert!(!is_retryable_network_error(&wrapped));
        let wrapped = Wrapper(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(is_retryable_network_error(&wrapped));
    }

    #[tokio::test]
    async fn endless_body_is_cut_off() {
        let endless = stream::repeat_with(|| Ok::<_, io::Error>(Bytes::from_static(&[0u8; 1024])));
        let err = read_bounded(endless, &limits(10_000, 512)).await.unwrap_err();
        assert!(matches!(err, TransferError::TooLarge { max: 10_000, .. }));
    }

    #[tokio::test]
    async fn mid_body_error_discards_data() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
        ]);
        let err = read_bounded(chunks, &limits(1024, 64)).await.unwrap_err();
        assert!(matches!(err, TransferError::Connection(ref m) if m.contains("reset by peer")));
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let stalled = stream::pending::<Result<Bytes, io::Error>>();
        let err = read_bounded(stalled, &limits(1024, 64)).await.unwrap_err();
        assert_eq!(
            err,
            TransferError::Timeout {
                phase: TransferPhase::Read,
                after: Duration::from_millis(200)
            }
        );
    }

    #[test]
    fn status_check() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert_eq!(
            check_status(StatusCode::NOT_FOUND),
            Err(TransferError::Status(404))
        );
    }

    #[test]
    fn header_checks() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/gif"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(check_headers(&headers, 10).is_ok());
        assert_eq!(
            check_headers(&headers, 9),
            Err(TransferError::DeclaredTooLarge {
                declared: 10,
                max: 9
            })
        );

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(
            check_headers(&headers, 10),
            Err(TransferError::NotAnImage("application/json".into()))
        );
    }

    #[test]
    fn missing_headers_pass() {
        assert!(check_headers(&HeaderMap::new(), 1).is_ok());
    }
}
