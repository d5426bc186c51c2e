use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SseError {
    #[error("event stream payload is not valid utf-8")]
    InvalidPayload,
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes are pushed as they arrive from the network; each call returns the
/// `data` payloads of every event completed so far. Partial events, including
/// multi-byte characters split across chunks, stay buffered until the rest
/// arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, SseError> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, separator_len)) = find_event_end(&self.buf) {
            let raw: Vec<u8> = self.buf.drain(..end + separator_len).collect();
            let text = std::str::from_utf8(&raw[..end]).map_err(|_| SseError::InvalidPayload)?;
            if let Some(data) = parse_event(text) {
                events.push(data);
            }
        }
        Ok(events)
    }
}

// Events end with a blank line; both LF and CRLF line endings are accepted.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|idx| (idx, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|idx| (idx, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_event(text: &str) -> Option<String> {
    let mut data = Vec::new();
    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // Only `data` carries payload for chat completions; `event`, `id` and `retry` are ignored.
        if field == "data" {
            data.push(value);
        }
    }

    if data.is_empty() {
        None
    } else {
        Some(data.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_events() {
        let mut sse = SseDecoder::new();
        let events = sse.push(b"data: hello\n\ndata: bye\n\n").unwrap();
        assert_eq!(events, vec!["hello", "bye"]);
        assert!(sse.push(b"\n").unwrap().is_empty());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut sse = SseDecoder::new();
        assert!(sse.push(b"data:").unwrap().is_empty());
        assert!(sse.push(b" hello\n").unwrap().is_empty());
        assert_eq!(sse.push(b"\n").unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_multibyte_character_split() {
        let bytes = "data: héllo\n\n".as_bytes();
        let mut sse = SseDecoder::new();
        assert!(sse.push(&bytes[..8]).unwrap().is_empty());
        assert_eq!(sse.push(&bytes[8..]).unwrap(), vec!["héllo"]);
    }

    #[test]
    fn test_crlf_comments_and_multiline_data() {
        let mut sse = SseDecoder::new();
        let events = sse
            .push(b": keep-alive\r\n\r\nevent: message\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\n")
            .unwrap();
        assert_eq!(events, vec!["{\"a\":\n1}"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut sse = SseDecoder::new();
        assert_eq!(
            sse.push(b"data: \xff\xfe\n\n").unwrap_err(),
            SseError::InvalidPayload
        );
    }
}
