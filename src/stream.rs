// src/stream.rs
//! Assembly of newline-delimited JSON generation streams.
//!
//! The inference server answers with one JSON object per line, each carrying
//! the next piece of text in `response`. Lines can be split across transport
//! chunks, and a chunk can carry several lines. A line that does not parse is
//! logged and skipped; it never ends the stream.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::pin;

/// One parsed line of a generation stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamFragment {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

/// Longest line kept before the rest of it is thrown away.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reassembles lines from arbitrarily split byte chunks.
///
/// Each byte is scanned for a newline once. A line growing past the limit is
/// dropped as a whole, up to and including its terminating newline.
#[derive(Debug)]
pub struct LineSplitter {
    buf: Vec<u8>,
    scanned: usize,
    max_line: usize,
    discarding: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    pub fn with_max_line(max_line: usize) -> Self {
        Self { buf: Vec::new(), scanned: 0, max_line, discarding: false }
    }

    /// Feed a chunk and take every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut line_start = 0;

        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if self.discarding {
                self.discarding = false;
            } else {
                lines.push(String::from_utf8_lossy(&self.buf[line_start..end]).into_owned());
            }
            line_start = end + 1;
            self.scanned = line_start;
        }

        self.buf.drain(..line_start);
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line {
            log::warn!("Dropping stream line longer than {} bytes", self.max_line);
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
        }

        lines
    }

    /// Take the trailing line that was never terminated, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || self.buf.is_empty() {
            self.buf.clear();
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Parse a single line. Blank and malformed lines yield `None`.
pub fn parse_fragment(line: &str) -> Option<StreamFragment> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<StreamFragment>(line) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            log::warn!("Skipping malformed stream fragment ({}): {}", e, truncate(line, 120));
            None
        }
    }
}

struct FragmentState<S> {
    chunks: Option<S>,
    lines: LineSplitter,
    ready: VecDeque<String>,
}

/// Lazily turn a byte-chunk stream into parsed fragments.
///
/// Ends when the underlying stream ends. A transport error is passed through
/// once and ends the stream.
pub fn fragments<S, B, E>(chunks: S) -> impl Stream<Item = Result<StreamFragment, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = FragmentState { chunks: Some(chunks), lines: LineSplitter::default(), ready: VecDeque::new() };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                if let Some(fragment) = parse_fragment(&line) {
                    return Some((Ok(fragment), state));
                }
                continue;
            }

            let Some(chunks) = state.chunks.as_mut() else {
                return None;
            };
            match chunks.next().await {
                Some(Ok(bytes)) => {
                    let completed = state.lines.push(bytes.as_ref());
                    state.ready.extend(completed);
                }
                Some(Err(e)) => {
                    state.chunks = None;
                    return Some((Err(e), state));
                }
                None => {
                    state.chunks = None;
                    let tail = state.lines.finish();
                    state.ready.extend(tail);
                }
            }
        }
    })
}

/// Consume the whole stream and return the concatenated, trimmed text.
pub async fn assemble<S, B, E>(chunks: S) -> Result<String, E>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut fragments = pin!(fragments(chunks));
    let mut text = String::new();
    let mut count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        count += 1;
        if let Some(delta) = fragment.response {
            text.push_str(&delta);
        }
        if fragment.done {
            log::debug!("Stream reported done after {} fragments", count);
        }
    }

    log::debug!("Assembled {} fragments into {} bytes", count, text.len());
    Ok(text.trim().to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn chunked(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Unpin {
        let owned: Vec<Result<Vec<u8>, Infallible>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn test_splitter_handles_split_and_joined_lines() {
        let mut splitter = LineSplitter::default();

        assert!(splitter.push(b"{\"respo").is_empty());
        assert_eq!(splitter.push(b"nse\":\"a\"}\n{\"response\":\"b\"}\n{\"x"), vec![
            "{\"response\":\"a\"}".to_string(),
            "{\"response\":\"b\"}".to_string(),
        ]);
        assert_eq!(splitter.finish(), Some("{\"x".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_long_line_in_small_chunks() {
        let line = format!("{{\"response\":\"{}\"}}\n", "x".repeat(10_000));
        let mut splitter = LineSplitter::default();
        let mut lines = Vec::new();

        for piece in line.as_bytes().chunks(7) {
            lines.extend(splitter.push(piece));
        }

        assert_eq!(lines.len(), 1);
        assert_eq!(parse_fragment(&lines[0]).unwrap().response.unwrap().len(), 10_000);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_drops_oversized_lines() {
        let mut splitter = LineSplitter::with_max_line(16);

        assert!(splitter.push(b"{\"response\":\"way too").is_empty());
        assert_eq!(splitter.push(b" long\"}\n{\"response\":\"ok\"}\n"), vec!["{\"response\":\"ok\"}".to_string()]);

        assert!(splitter.push(b"0123456789abcdefXYZ").is_empty());
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_parse_fragment() {
        assert_eq!(
            parse_fragment(r#"{"model":"llama3","response":"Hi","done":false}"#),
            Some(StreamFragment { response: Some("Hi".to_string()), done: false })
        );
        assert_eq!(
            parse_fragment(r#"{"done":true,"eval_count":12}"#),
            Some(StreamFragment { response: None, done: true })
        );
        assert_eq!(parse_fragment("   "), None);
        assert_eq!(parse_fragment("{not json"), None);
    }

    #[tokio::test]
    async fn test_assemble_skips_malformed_lines() {
        let body = chunked(&[
            "{\"response\":\"Division \"}\n",
            "garbage that is not json\n",
            "{\"response\":\"by \"}\n{\"response\":\"zero.\"}\n",
        ]);

        let text = assemble(body).await.unwrap();
        assert_eq!(text, "Division by zero.");
    }

    #[tokio::test]
    async fn test_assemble_keeps_arrival_order_and_duplicates() {
        let body = chunked(&["{\"response\":\" a\"}\n{\"response\":\"a\"}\n", "{\"response\":\"b \"}"]);

        let text = assemble(body).await.unwrap();
        assert_eq!(text, "aab");
    }

    #[tokio::test]
    async fn test_assemble_reads_past_done() {
        let body = chunked(&["{\"response\":\"one\",\"done\":true}\n{\"response\":\" two\"}\n"]);

        assert_eq!(assemble(body).await.unwrap(), "one two");
    }

    #[tokio::test]
    async fn test_assemble_empty_stream() {
        assert_eq!(assemble(chunked(&[])).await.unwrap(), "");
        assert_eq!(assemble(chunked(&["\n\n{\"done\":true}\n"])).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let body = stream::iter(vec![Ok(b"{\"response\":\"partial\"}\n".to_vec()), Err("connection reset")]);

        assert_eq!(assemble(body).await, Err("connection reset"));
    }

    #[tokio::test]
    async fn test_fragments_is_lazy_and_finite() {
        let mut frags = pin!(fragments(chunked(&["{\"response\":\"x\"}\n{\"response\":\"y\"}\n"])));

        assert_eq!(frags.next().await.unwrap().unwrap().response.as_deref(), Some("x"));
        assert_eq!(frags.next().await.unwrap().unwrap().response.as_deref(), Some("y"));
        assert!(frags.next().await.is_none());
    }
}
