//! Request body reader
//!
//! Accumulates an inbound body into a record bounded by the configured cap.
//! The content-type line is always kept whole; only payload bytes beyond the
//! cap are dropped. The rest of the stream is still drained so the
//! connection stays usable, and the client is never told about the cut.
//! A body that ends in a transport error yields nothing: an aborted upload
//! must not reach the store.

use hyper::body::{Body, Bytes};
use http_body_util::BodyExt;
use std::fmt::Display;

use crate::logger;
use crate::store::Record;

/// Content type assumed when the request declares none
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Pick the content type to store: the declared one, unless absent or empty
pub fn effective_content_type(declared: Option<&[u8]>) -> String {
    match declared {
        Some(raw) if !raw.is_empty() => String::from_utf8_lossy(raw).into_owned(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// Read `body` into a record whose serialized form fits in `cap` bytes.
///
/// Returns `None` if the stream fails before it completes.
pub async fn read_capped_body<B>(body: B, content_type: String, cap: usize) -> Option<Record>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let room = cap.saturating_sub(content_type.len() + 1);
    let mut payload = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                let Ok(data) = frame.into_data() else {
                    continue;
                };
                let take = room.saturating_sub(payload.len()).min(data.len());
                payload.extend_from_slice(&data[..take]);
            }
            Err(e) => {
                logger::log_warning(&format!(
                    "Request body aborted after {} bytes: {e}",
                    payload.len()
                ));
                return None;
            }
        }
    }

    Some(Record::new(content_type, payload))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hyper::body::Frame;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Body yielding a fixed list of chunks, optionally ending in an error
    pub struct ChunkedBody {
        chunks: VecDeque<Bytes>,
        fail_at_end: bool,
    }

    impl ChunkedBody {
        pub fn new<I, C>(chunks: I) -> Self
        where
            I: IntoIterator<Item = C>,
            C: Into<Bytes>,
        {
            Self {
                chunks: chunks.into_iter().map(Into::into).collect(),
                fail_at_end: false,
            }
        }

        pub const fn failing(mut self) -> Self {
            self.fail_at_end = true;
            self
        }
    }

    impl Body for ChunkedBody {
        type Data = Bytes;
        type Error = String;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, String>>> {
            match self.chunks.pop_front() {
                Some(chunk) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
                None if self.fail_at_end => {
                    self.fail_at_end = false;
                    Poll::Ready(Some(Err("connection reset".to_string())))
                }
                None => Poll::Ready(None),
            }
        }
    }

    #[test]
    fn test_effective_content_type() {
        assert_eq!(effective_content_type(None), "text/plain");
        assert_eq!(effective_content_type(Some(b"")), "text/plain");
        assert_eq!(effective_content_type(Some(b"image/png")), "image/png");
    }

    #[tokio::test]
    async fn test_small_body_kept_whole() {
        let body = ChunkedBody::new(["ab", "c"]);
        let record = read_capped_body(body, "text/plain".into(), 65_536).await;
        assert_eq!(record, Some(Record::new("text/plain", "abc")));
    }

    #[tokio::test]
    async fn test_oversized_body_truncated_to_cap() {
        let chunk = vec![b'x'; 10_000];
        let body = ChunkedBody::new(vec![chunk; 10]);
        let record = read_capped_body(body, "text/plain".into(), 65_536)
            .await
            .unwrap();

        assert_eq!(record.encoded_len(), 65_536);
        assert_eq!(record.payload.len(), 65_536 - "text/plain\n".len());
        assert_eq!(record.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_exact_fit_not_truncated() {
        let payload = vec![b'y'; 65_536 - "text/plain\n".len()];
        let body = ChunkedBody::new([payload.clone()]);
        let record = read_capped_body(body, "text/plain".into(), 65_536)
            .await
            .unwrap();
        assert_eq!(record.payload.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_content_type_line_never_cut() {
        let content_type = "application/x-".to_string() + &"a".repeat(20);
        let body = ChunkedBody::new(["payload"]);
        let record = read_capped_body(body, content_type.clone(), 16).await.unwrap();

        assert_eq!(record.content_type, content_type);
        assert!(record.payload.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_discards_body() {
        let body = ChunkedBody::new(["hel", "lo"]).failing();
        let record = read_capped_body(body, "text/plain".into(), 65_536).await;
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_stream_error_after_cap_still_discards() {
        let body = ChunkedBody::new([vec![b'z'; 64], vec![b'z'; 64]]).failing();
        let record = read_capped_body(body, "text/plain".into(), 32).await;
        assert!(record.is_none());
    }
}
