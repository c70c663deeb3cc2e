use crate::api::logging::emit_frame_parse_error;
use crate::types::StreamFrame;
use bytes::BytesMut;

const FRAME_PREFIX: &str = "data: ";

/// Splits the chat-stream response body into decoded frames.
///
/// Chunk boundaries are arbitrary: one frame may span several chunks and one
/// chunk may carry several frames. The buffer is cut at byte-level newlines,
/// so re-chunking the same bytes anywhere (including inside a multi-byte
/// character) yields the same frame sequence. Bytes after the last newline
/// stay buffered until the line they belong to is terminated.
#[derive(Default)]
pub struct StreamParser {
    buffer: BytesMut,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one transport chunk and return every frame it completed.
    ///
    /// Blank lines are permitted between events and skipped. Lines without
    /// the `data: ` prefix are not frames and are ignored. A line whose JSON
    /// payload fails to decode is logged and skipped; the stream continues.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            let line = String::from_utf8_lossy(&line[..newline]);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix(FRAME_PREFIX) else {
                continue;
            };

            match serde_json::from_str::<StreamFrame>(payload) {
                Ok(frame) => frames.push(frame),
                Err(error) => emit_frame_parse_error(payload, &error),
            }
        }

        frames
    }

    /// Bytes of the carried-over partial line. An unterminated tail at
    /// end-of-stream is never a complete frame.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_chunk_many_frames() {
        let mut parser = StreamParser::new();
        let frames = parser.feed(
            b"data: {\"type\":\"status\",\"message\":\"thinking\"}\n\
              data: {\"type\":\"answer\",\"content\":\"Hi\"}\n",
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(parser.pending_bytes(), 0);
    }

    #[test]
    fn test_frame_split_mid_line_carries_over() {
        let mut parser = StreamParser::new();
        let first = parser.feed(b"data: {\"typ");
        assert!(first.is_empty());
        assert!(parser.pending_bytes() > 0);

        let second = parser.feed(b"e\":\"answer\",\"content\":\"X\"}\n");
        assert_eq!(
            second,
            vec![StreamFrame::Answer {
                content: "X".to_string()
            }]
        );
        assert_eq!(parser.pending_bytes(), 0);
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let line = "data: {\"type\":\"answer\",\"content\":\"héllo\"}\n".as_bytes();
        // Split on every byte boundary; é spans two bytes, so some splits
        // land inside it.
        for cut in 0..line.len() {
            let mut parser = StreamParser::new();
            let mut frames = parser.feed(&line[..cut]);
            frames.extend(parser.feed(&line[cut..]));
            assert_eq!(
                frames,
                vec![StreamFrame::Answer {
                    content: "héllo".to_string()
                }],
                "split at byte {cut}"
            );
        }
    }

    #[test]
    fn test_blank_lines_and_foreign_lines_are_skipped() {
        let mut parser = StreamParser::new();
        let frames = parser.feed(
            b"\n\
              : keep-alive\n\
              \n\
              data: {\"type\":\"answer\",\"content\":\"ok\"}\n",
        );
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_malformed_json_is_skipped_not_fatal() {
        let mut parser = StreamParser::new();
        let frames = parser.feed(
            b"data: {not json\n\
              data: {\"type\":\"answer\",\"content\":\"ok\"}\n",
        );
        assert_eq!(
            frames,
            vec![StreamFrame::Answer {
                content: "ok".to_string()
            }]
        );
    }

    #[test]
    fn test_unterminated_tail_is_not_a_frame() {
        let mut parser = StreamParser::new();
        let frames = parser.feed(b"data: {\"type\":\"answer\",\"content\":\"ok\"}");
        assert!(frames.is_empty());
        assert!(parser.pending_bytes() > 0);
    }

    #[test]
    fn test_crlf_line_endings_are_tolerated() {
        let mut parser = StreamParser::new();
        let frames = parser.feed(b"data: {\"type\":\"complete\",\"thread_id\":\"t1\"}\r\n");
        assert_eq!(
            frames,
            vec![StreamFrame::Complete {
                thread_id: Some("t1".to_string())
            }]
        );
    }
}
