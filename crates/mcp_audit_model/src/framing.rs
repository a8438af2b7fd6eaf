//! Splits a raw stdio byte stream into newline-delimited JSON-RPC
//! messages for capture, independently of the byte-exact forwarding
//! path. `spec.md` §4.1: a parse failure loses a record, never the pipe.

/// Default bound on a single accumulated line before it is discarded.
/// Matches the guard used by the corpus's own stdio JSON-RPC frontend
/// (`turbomcp-proxy`'s `MAX_LINE_SIZE`) so a child that never emits a
/// newline cannot grow the capture buffer without bound.
pub const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// One line produced by [`LineAccumulator::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccumulatedLine {
    /// A complete line, trailing `\n` (and `\r`, if present) stripped.
    Line(Vec<u8>),
    /// A line exceeded `max_line_bytes` before a newline arrived; the
    /// bytes already seen were discarded rather than buffered forever.
    Oversized { discarded_bytes: usize },
}

/// Incrementally groups bytes fed from a stdio pump into complete lines.
/// Owns no I/O itself — callers feed it a copy of whatever bytes they
/// already forwarded verbatim, so a capture-side failure here can never
/// affect the forwarding path.
pub struct LineAccumulator {
    buf: Vec<u8>,
    max_line_bytes: usize,
    discarding: bool,
}

impl LineAccumulator {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Feeds a chunk of bytes, returning every line completed by this
    /// call. Bytes that do not complete a line are retained internally.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<AccumulatedLine> {
        let mut out = Vec::new();
        for &byte in bytes {
            if self.discarding {
                if byte == b'\n' {
                    self.discarding = false;
                    out.push(AccumulatedLine::Oversized {
                        discarded_bytes: self.buf.len(),
                    });
                    self.buf.clear();
                }
                continue;
            }
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.buf);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                out.push(AccumulatedLine::Line(line));
            } else {
                self.buf.push(byte);
                if self.buf.len() > self.max_line_bytes {
                    self.discarding = true;
                }
            }
        }
        out
    }
}

impl Default for LineAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

/// Parses one captured line as a JSON-RPC 2.0 object. Returns `None`
/// (never an error) when the line fails to parse as JSON, or parses but
/// lacks `"jsonrpc":"2.0"` plus at least one of `method`/`result`/
/// `error` — per `spec.md` §4.1 this is a silent capture-drop, not a
/// forwarding failure.
pub fn parse_jsonrpc_line(line: &[u8]) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_slice(line).ok()?;
    let is_v2 = value.get("jsonrpc").and_then(|v| v.as_str()) == Some("2.0");
    let has_marker =
        value.get("method").is_some() || value.get("result").is_some() || value.get("error").is_some();
    if is_v2 && has_marker {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_lines_in_one_chunk() {
        let mut acc = LineAccumulator::default();
        let lines = acc.feed(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(
            lines,
            vec![
                AccumulatedLine::Line(b"{\"a\":1}".to_vec()),
                AccumulatedLine::Line(b"{\"b\":2}".to_vec()),
            ]
        );
    }

    #[test]
    fn holds_a_partial_line_across_feeds() {
        let mut acc = LineAccumulator::default();
        assert!(acc.feed(b"{\"a\":").is_empty());
        let lines = acc.feed(b"1}\n");
        assert_eq!(lines, vec![AccumulatedLine::Line(b"{\"a\":1}".to_vec())]);
    }

    #[test]
    fn strips_trailing_carriage_return() {
        let mut acc = LineAccumulator::default();
        let lines = acc.feed(b"hello\r\n");
        assert_eq!(lines, vec![AccumulatedLine::Line(b"hello".to_vec())]);
    }

    #[test]
    fn discards_oversized_line_and_keeps_scanning() {
        let mut acc = LineAccumulator::new(4);
        let lines = acc.feed(b"toolong\nok\n");
        assert_eq!(
            lines,
            vec![
                AccumulatedLine::Oversized { discarded_bytes: 4 },
                AccumulatedLine::Line(b"ok".to_vec()),
            ]
        );
    }

    #[test]
    fn accepts_well_formed_jsonrpc_request_and_response() {
        let req = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let resp = br#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        assert!(parse_jsonrpc_line(req).is_some());
        assert!(parse_jsonrpc_line(resp).is_some());
    }

    #[test]
    fn rejects_non_jsonrpc_and_malformed_lines() {
        assert!(parse_jsonrpc_line(b"not json").is_none());
        assert!(parse_jsonrpc_line(br#"{"jsonrpc":"2.0"}"#).is_none());
        assert!(parse_jsonrpc_line(br#"{"method":"x"}"#).is_none());
    }
}
