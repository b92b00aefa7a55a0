//! Forwarding backend output into the log and the event bus.

use crate::events::{EventBus, HostEvent, OutputStream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const ERROR_MARKERS: [&str; 4] = ["Traceback", "ERROR", "Exception", "CRITICAL"];

/// Whether a backend line reports a problem.
///
/// Uvicorn writes its regular access and startup logs to stderr, so the stream
/// alone does not say anything.
pub fn looks_like_error(line: &str) -> bool {
    ERROR_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Read `reader` line by line until EOF, logging and publishing each line.
///
/// Lines are decoded lossily; a backend writing in a legacy code page must not
/// stop the forwarding.
pub fn forward_lines<R>(reader: R, stream: OutputStream, events: EventBus) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if looks_like_error(&line) {
                        warn!(target: "backend", stream = stream.as_str(), "{}", line);
                    } else {
                        info!(target: "backend", stream = stream.as_str(), "{}", line);
                    }
                    events.publish(HostEvent::BackendOutput { stream, line });
                }
                Err(e) => {
                    debug!("Stopped reading backend {}: {}", stream.as_str(), e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_error() {
        assert!(looks_like_error("Traceback (most recent call last):"));
        assert!(looks_like_error("ERROR:    [Errno 98] address already in use"));
        assert!(!looks_like_error("INFO:     Application startup complete."));
    }

    #[tokio::test]
    async fn test_forward_lines_publishes_each_line() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let input: &[u8] = b"INFO: started\nERROR: boom\n";

        forward_lines(input, OutputStream::Stderr, events).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::BackendOutput {
                stream: OutputStream::Stderr,
                line: "INFO: started".into()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::BackendOutput {
                stream: OutputStream::Stderr,
                line: "ERROR: boom".into()
            }
        );
    }

    #[tokio::test]
    async fn test_forward_lines_survives_invalid_utf8() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let input: &[u8] = b"first\n\xff\xfe Patient: Ren\xe9\r\nafter";

        forward_lines(input, OutputStream::Stdout, events).await.unwrap();

        let mut lines = Vec::new();
        while let Ok(HostEvent::BackendOutput { line, .. }) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "first");
        assert!(lines[1].starts_with('\u{FFFD}'));
        assert!(lines[1].ends_with("Patient: Ren\u{FFFD}"));
        assert_eq!(lines[2], "after");
    }
}
