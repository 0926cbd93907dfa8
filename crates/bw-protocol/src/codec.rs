//! Tokio codec for the relay's status stream

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::ProtocolError;
use crate::status::StatusLine;

/// Longest status line accepted from the relay.
///
/// Status lines are short `Key value` pairs; anything near this size is
/// garbage and is rejected rather than buffered without bound.
pub const MAX_STATUS_LINE_LENGTH: usize = 8 * 1024;

/// Decodes newline-delimited relay output into [`StatusLine`]s
///
/// Lines are split on raw bytes and decoded lossily, so output that is
/// not UTF-8 never stops the stream. Such lines simply carry a key no
/// one recognizes.
#[derive(Debug, Default)]
pub struct StatusCodec {
    /// Bytes already scanned for a newline
    next_index: usize,
}

impl StatusCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self::default()
    }

    fn split_line(&mut self, src: &mut BytesMut, end: usize) -> StatusLine {
        let frame = src.split_to(end);
        src.advance(1);
        self.next_index = 0;
        to_status_line(&frame)
    }
}

fn to_status_line(frame: &[u8]) -> StatusLine {
    let frame = frame.strip_suffix(b"\r").unwrap_or(frame);
    StatusLine::parse(&String::from_utf8_lossy(frame))
}

impl Decoder for StatusCodec {
    type Item = StatusLine;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let scan_end = src.len().min(MAX_STATUS_LINE_LENGTH + 1);
        match src[self.next_index..scan_end].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset;
                Ok(Some(self.split_line(src, end)))
            }
            None if src.len() > MAX_STATUS_LINE_LENGTH => Err(ProtocolError::LineTooLong {
                max: MAX_STATUS_LINE_LENGTH,
            }),
            None => {
                self.next_index = scan_end;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // A final line without a trailing newline still counts
        let frame = src.split();
        self.next_index = 0;
        Ok(Some(to_status_line(&frame)))
    }
}
