//! Incremental decoding of `text/event-stream` bodies.
//!
//! Network chunks can split lines (and UTF-8 sequences) anywhere, so bytes
//! are buffered until a full line is available. Only `data:` payloads are
//! surfaced; event names, ids and comments are dropped because every
//! provider repeats the event type inside the JSON payload.

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body and collect the `data:` payloads it completes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(data) = parse_data_line(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        parse_data_line(&line)
    }
}

fn parse_data_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);

    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(out, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert_eq!(decoder.push(b"xt\":\"hi\"}\n"), vec!["{\"text\":\"hi\"}"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let line = "data: café\n".as_bytes();
        let split = line.len() - 2; // inside the two-byte 'é'
        assert!(decoder.push(&line[..split]).is_empty());
        assert_eq!(decoder.push(&line[split..]), vec!["café"]);
    }

    #[test]
    fn test_skips_comments_and_event_lines() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(
            b": keep-alive\r\nevent: content_block_delta\r\ndata:{\"x\":2}\r\n\r\n",
        );
        assert_eq!(out, vec!["{\"x\":2}"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert!(decoder.finish().is_none());
    }
}
