//! Deadline behavior of prompt-framed reads, driven over an in-memory
//! duplex pipe with paused time.

use std::time::Duration;

use tokio::io::AsyncWriteExt;

use netxact::channel::CompiledPrompt;
use netxact::error::ChannelError;
use netxact::{CliSession, StreamSession};

fn prompt() -> CompiledPrompt {
    CompiledPrompt::new(r"(?m)router#\s?$").unwrap()
}

#[tokio::test(start_paused = true)]
async fn prompt_arriving_inside_deadline_succeeds() {
    let (client, mut server) = tokio::io::duplex(1024);
    let mut session = StreamSession::new(client, "\n", 256);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(900)).await;
        server.write_all(b"uptime is 3 weeks\nrouter# ").await.unwrap();
        // Keep the pipe open past the read.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(server);
    });

    let out = session
        .read_until(&prompt(), Duration::from_secs(1))
        .await
        .unwrap();

    assert!(out.contains("uptime is 3 weeks"));
    assert!(out.ends_with("router# "));
}

#[tokio::test(start_paused = true)]
async fn timeout_retains_partial_output_for_next_read() {
    let (client, mut server) = tokio::io::duplex(1024);
    let mut session = StreamSession::new(client, "\n", 256);

    server.write_all(b"slow command output").await.unwrap();

    let err = session
        .read_until(&prompt(), Duration::from_millis(500))
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::PatternTimeout(_)));
    assert_eq!(session.buffered(), b"slow command output".len());

    // The prompt finally lands; the next read must surface everything,
    // including the bytes that arrived before the timeout.
    server.write_all(b"\nrouter# ").await.unwrap();
    let out = session
        .read_until(&prompt(), Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(out, "slow command output\nrouter# ");
    assert_eq!(session.buffered(), 0);
}

#[tokio::test(start_paused = true)]
async fn bytes_after_the_prompt_stay_buffered() {
    let (client, mut server) = tokio::io::duplex(1024);
    let mut session = StreamSession::new(client, "\n", 256);

    server
        .write_all(b"out\nrouter# \nunsolicited log line")
        .await
        .unwrap();

    let out = session
        .read_until(&prompt(), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(out, "out\nrouter# ");
    // The trailing line is attributed to the next exchange, not lost.
    assert!(session.buffered() > 0);
}

#[tokio::test(start_paused = true)]
async fn drain_discards_residual_bytes() {
    let (client, mut server) = tokio::io::duplex(1024);
    let mut session = StreamSession::new(client, "\n", 256);

    server.write_all(b"login banner noise\n").await.unwrap();
    tokio::spawn(async move {
        // Hold the far end open while the drain window runs out.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(server);
    });

    session.drain(Duration::from_millis(200)).await.unwrap();
    assert_eq!(session.buffered(), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_pipe_is_reported_and_session_marked_closed() {
    let (client, server) = tokio::io::duplex(1024);
    let mut session = StreamSession::new(client, "\n", 256);
    drop(server);

    let err = session
        .read_until(&prompt(), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ChannelError::Closed));
    assert!(!session.is_open());

    // Writes after close fail fast instead of hanging.
    let err = session.write_line("show version").await.unwrap_err();
    assert!(matches!(err, ChannelError::Closed));
}
