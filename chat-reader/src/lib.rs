//! Asynchronous line-oriented record reading.
//!
//! A connection speaks a newline-terminated protocol: `\n` is the only framing the wire format
//! has. [`LineReader`] sits between a raw [`AsyncRead`] and the protocol engine and turns a stream
//! of bytes, arbitrarily chopped up by the kernel, into a stream of complete records.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum number of bytes buffered for a single record before it is considered abusive and the
/// connection is dropped.
///
/// Chat lines are short; this is generous headroom rather than a protocol limit.
pub const MAX_RECORD_LENGTH: usize = 8192;

/// Reads newline-terminated records from an [`AsyncRead`], buffering across `poll_read`
/// boundaries.
///
/// A single underlying read can yield a partial record, exactly one record, or several records
/// back to back; `next_record` hides all three cases behind one call that returns one record at a
/// time, including its trailing `\n`.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// Offset in `buf` up to which we have already scanned for `\n`.
    scanned: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: Vec::new(), scanned: 0 }
    }

    /// Reads the next complete record, including its trailing `\n`.
    ///
    /// Returns `Ok(None)` on a clean EOF with no partial record pending. A partial record still
    /// buffered when EOF is reached is reported as `Err` of kind [`io::ErrorKind::UnexpectedEof`].
    pub async fn next_record(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = memchr::memchr(b'\n', &self.buf[self.scanned..]) {
                let split_at = self.scanned + pos + 1;
                let record = self.buf.drain(..split_at).collect();
                self.scanned = 0;
                return Ok(Some(record));
            }
            self.scanned = self.buf.len();

            if self.buf.len() > MAX_RECORD_LENGTH {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "record too long"));
            }

            let mut chunk = [0u8; 1024];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "partial record at eof"))
                };
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::future::FutureExt;

    /// An `AsyncRead` that yields a fixed sequence of chunks, one per call, regardless of the
    /// buffer size the caller provides. Used to simulate a record split across several recvs.
    struct Chunks {
        remaining: std::collections::VecDeque<&'static [u8]>,
    }

    impl AsyncRead for Chunks {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            if let Some(chunk) = self.remaining.pop_front() {
                buf.put_slice(chunk);
            }
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn chunks(parts: &[&'static [u8]]) -> Chunks {
        Chunks { remaining: parts.iter().copied().collect() }
    }

    #[tokio::test]
    async fn record_split_across_reads() {
        let mut r = LineReader::new(chunks(&[b"hel", b"lo\n"]));
        let rec = r.next_record().await.unwrap().unwrap();
        assert_eq!(rec, b"hello\n");
    }

    #[tokio::test]
    async fn two_records_in_one_read() {
        let mut r = LineReader::new(chunks(&[b"one\ntwo\n"]));
        assert_eq!(r.next_record().await.unwrap().unwrap(), b"one\n");
        assert_eq!(r.next_record().await.unwrap().unwrap(), b"two\n");
    }

    #[tokio::test]
    async fn empty_record_is_valid() {
        let mut r = LineReader::new(chunks(&[b"\n"]));
        assert_eq!(r.next_record().await.unwrap().unwrap(), b"\n");
    }

    #[tokio::test]
    async fn clean_eof_with_no_partial_record() {
        let mut r = LineReader::new(chunks(&[]));
        assert!(r.next_record().now_or_never().unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_record_at_eof_is_an_error() {
        let mut r = LineReader::new(chunks(&[b"partial"]));
        let err = r.next_record().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
