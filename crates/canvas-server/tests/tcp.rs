// crates/canvas-server/tests/tcp.rs
mod common;

use std::sync::Arc;

use bytes::Bytes;
use canvas_core::ServerMessage;
use canvas_protocol::decode_server;
use canvas_server::server::{serve_listener, SharedSessions};
use canvas_server::session::OpenSessions;
use canvas_server::transport::{tcp_transport, FrameReader, FrameSink, FrameSource};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use common::{harness, settings, WAIT};

async fn next(frames: &mut FrameReader<OwnedReadHalf>) -> Option<Bytes> {
    timeout(WAIT, frames.next_frame())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
}

#[tokio::test]
async fn paint_over_tcp_end_to_end() {
    let h = harness(2, 2, settings());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let sessions: SharedSessions = Arc::new(OpenSessions);
    let server = tokio::spawn(serve_listener(
        listener,
        h.engine.clone(),
        sessions,
        h.shutdown.subscribe(),
    ));

    let (mut frames, mut sink) = tcp_transport(TcpStream::connect(addr).await.unwrap());
    sink.send_frame(Bytes::from_static(b"alice")).await.unwrap();

    let greeting: Vec<ServerMessage> = [
        next(&mut frames).await.unwrap(),
        next(&mut frames).await.unwrap(),
        next(&mut frames).await.unwrap(),
    ]
    .iter()
    .map(|frame| decode_server(frame).unwrap())
    .collect();
    assert!(matches!(greeting[0], ServerMessage::State(_)));
    assert_eq!(greeting[1], ServerMessage::PlayerState { cooldown_secs: 0 });
    assert_eq!(greeting[2], ServerMessage::PlayerCounter(1));

    sink.send_frame(Bytes::from_static(&[1, 0, 0, 1])).await.unwrap();
    assert_eq!(next(&mut frames).await.unwrap(), &[2, 5][..]);

    assert_eq!(h.scheduler.main_tick().await.unwrap(), 1);
    assert_eq!(next(&mut frames).await.unwrap(), &[1, 0, 0, 1][..]);

    // Shutdown closes the connection and stops the listener.
    h.shutdown.send(true).unwrap();
    assert_eq!(next(&mut frames).await, None);
    timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(h.engine.registry().len().await, 0);
}

#[tokio::test]
async fn invalid_session_token_is_disconnected() {
    let h = harness(2, 2, settings());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let sessions: SharedSessions = Arc::new(OpenSessions);
    let server = tokio::spawn(serve_listener(
        listener,
        h.engine.clone(),
        sessions,
        h.shutdown.subscribe(),
    ));

    let (mut frames, mut sink) = tcp_transport(TcpStream::connect(addr).await.unwrap());
    sink.send_frame(Bytes::from_static(b"bad\ntoken")).await.unwrap();

    assert_eq!(next(&mut frames).await, None);
    assert_eq!(h.engine.registry().len().await, 0);

    h.shutdown.send(true).unwrap();
    timeout(WAIT, server).await.unwrap().unwrap();
}
