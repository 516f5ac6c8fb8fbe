//! Line Framing
//!
//! Delimiter-based line codec shared by the chat and button bridges.
//! Lines longer than the limit are skipped and decoding carries on with the
//! next line, so one bad line never ends the stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

/// Line codec that drops oversized lines instead of failing
#[derive(Debug, Clone)]
pub struct LineCodec {
    inner: AnyDelimiterCodec,
    max_length: usize,
}

impl LineCodec {
    /// Split on any byte of `seek`, append `write` after every sent line
    pub fn new(seek: &[u8], write: &[u8], max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                seek.to_vec(),
                write.to_vec(),
                max_length,
            ),
            max_length,
        }
    }
}

impl Decoder for LineCodec {
    type Item = Bytes;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        loop {
            match self.inner.decode(buf) {
                // The inner codec is now discarding up to the next delimiter
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    tracing::debug!(max_length = self.max_length, "Skipping oversized line");
                }
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        loop {
            match self.inner.decode_eof(buf) {
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    tracing::debug!(max_length = self.max_length, "Skipping oversized line");
                }
                other => return other,
            }
        }
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = AnyDelimiterCodecError;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(line, buf)
    }
}
