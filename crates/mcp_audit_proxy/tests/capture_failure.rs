//! `spec.md` §8 scenario S6: set the store path to a read-only
//! directory, run S1 (a `tools/list` then a `tools/call` request, each
//! observed as both a host-to-server and server-to-host record), and
//! expect the proxy to still exit cleanly with forwarding intact while
//! every capture attempt is counted as dropped.
//!
//! Drives the real supervisor (`run_with_host_io`, the same code path
//! `run` uses in production) against a real spawned child, so this
//! exercises the actual capture-writer failure path rather than a
//! reconstructor-level stand-in.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

use mcp_audit_proxy::{run_with_host_io, SupervisorConfig, DEFAULT_SOFT_CAP};

/// An owned, `'static`, `Send` in-memory sink — unlike `&mut Vec<u8>`,
/// this survives being moved into the `tokio::spawn`ed forwarder task
/// and still lets the test read back what was written afterwards.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl AsyncWrite for SharedBuf {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.get_mut().0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn s6_capture_disk_error_does_not_break_forwarding() {
    if nix::unistd::Uid::effective().is_root() {
        eprintln!("skipping: root bypasses directory permission bits, so read-only simulation has no effect");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    std::fs::create_dir(&store_dir).unwrap();
    let store_path = store_dir.join("mcp_audit_messages.jsonl");
    std::fs::set_permissions(&store_dir, std::fs::Permissions::from_mode(0o555)).unwrap();

    let config = SupervisorConfig {
        command: "cat".to_string(),
        args: Vec::new(),
        env: Vec::new(),
        host: "vscode".to_string(),
        server: "serverA".to_string(),
        store_path,
        capture_soft_cap: DEFAULT_SOFT_CAP,
    };

    // `cat` mirrors each request line straight back, standing in for a
    // server that answers every call: two requests in, two lines back
    // out, four records total observed across both directions.
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"getWeather\",\"arguments\":{\"city\":\"London\"}}}\n",
    );
    let host_stdin = io::Cursor::new(input.as_bytes().to_vec());
    let host_stdout = SharedBuf::default();

    let outcome = run_with_host_io(config, host_stdin, host_stdout.clone())
        .await
        .expect("supervisor run should not error even though capture failed");

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.captures_dropped, 4);
    assert_eq!(
        host_stdout.0.lock().unwrap().as_slice(),
        input.as_bytes(),
        "forwarding must still succeed while capture fails"
    );
}
