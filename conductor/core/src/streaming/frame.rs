//! Frame Decoder
//!
//! Turns an arbitrarily chunked byte stream into complete `data:` frames.
//!
//! # Frame Format
//!
//! ```text
//! data: {"type":"token","content":"Hi"}\n
//! \n
//! data: {"type":"done"}\n
//! ```
//!
//! Each frame is one line starting with `data:` (one optional space after the
//! colon is dropped) and ending in `\n` or `\r\n`. Blank lines, SSE comments
//! (`:`) and other fields (`event:`, `id:`) are skipped.
//!
//! Bytes are buffered, not text: the network may split a chunk inside a
//! multi-byte character, and a line is only decoded once its terminator has
//! arrived. Output is identical however the input was split.

/// Line prefix that introduces a frame
pub const DATA_PREFIX: &[u8] = b"data:";

/// Longest line the decoder will buffer (16 MB)
///
/// Longer lines are dropped whole rather than growing the buffer forever.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// One complete frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Text after the `data:` prefix
    pub payload: String,
}

impl Frame {
    /// Create a frame
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Encode a payload as one frame, followed by the blank separator line
#[must_use]
pub fn encode(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Decoder state machine for streaming frame parsing
///
/// Buffers incoming bytes and yields complete frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    /// Dropping the remainder of an oversized line
    discarding: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            discarding: false,
        }
    }

    /// Append a chunk to the buffer
    pub fn push(&mut self, chunk: &[u8]) {
        if self.read_pos == self.buffer.len() {
            self.buffer.clear();
            self.read_pos = 0;
        } else if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Try to decode the next frame
    ///
    /// Returns `None` when no complete frame is buffered.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let rest = &self.buffer[self.read_pos..];
            let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
                if rest.len() > MAX_LINE_BYTES {
                    tracing::warn!(bytes = rest.len(), "Dropping oversized stream line");
                    self.buffer.clear();
                    self.read_pos = 0;
                    self.discarding = true;
                }
                return None;
            };

            let line_start = self.read_pos;
            self.read_pos += newline + 1;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let mut line = &self.buffer[line_start..line_start + newline];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }

            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                let payload = payload.strip_prefix(b" ").unwrap_or(payload);
                return Some(Frame::new(String::from_utf8_lossy(payload)));
            }
        }
    }

    /// Push a chunk and drain every frame it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.push(chunk);
        std::iter::from_fn(|| self.next_frame()).collect()
    }

    /// End of stream: discard any unterminated trailing line
    ///
    /// Returns the number of bytes dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending();
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "Discarding unterminated trailing data");
        }
        self.clear();
        dropped
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.discarding = false;
    }

    /// Decode a complete input in one shot
    #[must_use]
    pub fn decode_all(input: &[u8]) -> Vec<Frame> {
        let mut decoder = Self::new();
        let frames = decoder.feed(input);
        decoder.finish();
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STREAM: &str = concat!(
        "data: {\"type\":\"node_start\",\"node\":\"agent\"}\n\n",
        ": keep-alive\n",
        "event: message\n",
        "data: {\"type\":\"token\",\"content\":\"It's 72\u{b0}F \u{2600}\u{fe0f}\"}\r\n\r\n",
        "data:{\"type\":\"done\"}\n\n",
    );

    fn payloads(frames: &[Frame]) -> Vec<&str> {
        frames.iter().map(|f| f.payload.as_str()).collect()
    }

    #[test]
    fn test_decode_one_shot() {
        let frames = FrameDecoder::decode_all(STREAM.as_bytes());
        assert_eq!(
            payloads(&frames),
            vec![
                "{\"type\":\"node_start\",\"node\":\"agent\"}",
                "{\"type\":\"token\",\"content\":\"It's 72\u{b0}F \u{2600}\u{fe0f}\"}",
                "{\"type\":\"done\"}",
            ]
        );
    }

    #[test]
    fn test_every_split_point_matches_one_shot() {
        let bytes = STREAM.as_bytes();
        let expected = FrameDecoder::decode_all(bytes);

        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut frames = decoder.feed(&bytes[..split]);
            frames.extend(decoder.feed(&bytes[split..]));
            assert_eq!(frames, expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_one_shot() {
        let bytes = STREAM.as_bytes();
        let mut decoder = FrameDecoder::new();
        let frames: Vec<Frame> = bytes.iter().flat_map(|b| decoder.feed(&[*b])).collect();
        assert_eq!(frames, FrameDecoder::decode_all(bytes));
    }

    #[test]
    fn test_encode_decodes_back() {
        let wire = format!("{}{}", encode("{\"type\":\"done\"}"), encode("second"));
        let frames = FrameDecoder::decode_all(wire.as_bytes());
        assert_eq!(payloads(&frames), vec!["{\"type\":\"done\"}", "second"]);
    }

    #[test]
    fn test_frame_not_emitted_before_terminator() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"done\"}").is_empty());
        assert_eq!(decoder.feed(b"\n").len(), 1);
    }

    #[test]
    fn test_finish_discards_partial_line() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: one\ndata: tw");
        assert_eq!(payloads(&frames), vec!["one"]);
        assert_eq!(decoder.finish(), "data: tw".len());
        assert_eq!(decoder.pending(), 0);
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn test_compaction_keeps_partial_line() {
        let mut decoder = FrameDecoder::new();
        let filler = format!("data: {}\n", "x".repeat(MIN_BUFFER_CAPACITY));
        let first = format!("{filler}data: ta");
        assert_eq!(decoder.feed(first.as_bytes()).len(), 1);
        assert_eq!(decoder.pending(), "data: ta".len());

        // The consumed filler is compacted away before the append
        let frames = decoder.feed(b"il\n");
        assert_eq!(payloads(&frames), vec!["tail"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_oversized_line_is_dropped_whole() {
        let mut decoder = FrameDecoder::new();
        let huge = vec![b'x'; MAX_LINE_BYTES + 1];
        assert!(decoder.feed(b"data: ").is_empty());
        assert!(decoder.feed(&huge).is_empty());
        let frames = decoder.feed(b"tail of the big line\ndata: next\n");
        assert_eq!(payloads(&frames), vec!["next"]);
    }
}
