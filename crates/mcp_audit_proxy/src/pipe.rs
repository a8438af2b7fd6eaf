//! Bidirectional stdio byte pump (`spec.md` §4.2). Forwarding is
//! byte-exact and streaming: bytes are written downstream as soon as
//! they are read, and a copy of each observed line is teed to the
//! capture queue independently of the write side.

use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use mcp_audit_model::{AccumulatedLine, Direction, LineAccumulator, DEFAULT_MAX_LINE_BYTES};

use crate::capture::{CaptureQueue, PendingCapture};
use crate::error::ProxyError;

const CHUNK_SIZE: usize = 8192;

/// Copies bytes from `reader` to `writer` verbatim, flushing after each
/// newline so downstream consumers that read line-by-line never stall
/// waiting on an internal buffer. Every complete line observed is also
/// pushed onto `capture` tagged with `direction`; capture never affects
/// the write side — a full capture queue still completes instantly (see
/// [`CaptureQueue::push`]).
///
/// Returns once `reader` reaches EOF.
pub async fn forward<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    capture: CaptureQueue,
) -> Result<(), ProxyError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut accumulator = LineAccumulator::new(DEFAULT_MAX_LINE_BYTES);

    loop {
        let n = reader.read(&mut buf).await.map_err(ProxyError::Forwarding)?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(ProxyError::Forwarding)?;

        let saw_newline = buf[..n].contains(&b'\n');
        for line in accumulator.feed(&buf[..n]) {
            if let AccumulatedLine::Line(raw) = line {
                capture.push(PendingCapture {
                    direction,
                    observed_at: OffsetDateTime::now_utc(),
                    raw,
                });
            }
        }
        if saw_newline {
            writer.flush().await.map_err(ProxyError::Forwarding)?;
        }
    }

    writer.flush().await.map_err(ProxyError::Forwarding)?;
    Ok(())
}

/// Mirrors the child's stderr to the proxy's own stderr line by line,
/// additionally capturing any line that happens to parse as a
/// well-formed JSON-RPC object as a `server_to_host` record — covers
/// servers that mis-route diagnostics onto stderr (`spec.md` §4.2).
pub async fn mirror_stderr<R>(
    mut reader: R,
    capture: CaptureQueue,
) -> Result<(), ProxyError>
where
    R: AsyncRead + Unpin,
{
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut lines = BufReader::new(&mut reader).lines();
    loop {
        let line = lines.next_line().await.map_err(ProxyError::Forwarding)?;
        let Some(line) = line else { break };
        eprintln!("{line}");
        if mcp_audit_model::parse_jsonrpc_line(line.as_bytes()).is_some() {
            capture.push(PendingCapture {
                direction: Direction::ServerToHost,
                observed_at: OffsetDateTime::now_utc(),
                raw: line.into_bytes(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn forwards_bytes_verbatim_and_captures_complete_lines() {
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"x\"}\npartial".to_vec();
        let reader = Cursor::new(input.clone());
        let mut output = Vec::new();
        let capture = CaptureQueue::new(16);

        forward(reader, &mut output, Direction::HostToServer, capture.clone())
            .await
            .unwrap();

        assert_eq!(output, input);
        assert_eq!(capture.len(), 1);
    }
}
