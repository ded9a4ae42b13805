//! Frame transports.
//!
//! The engine only sees whole frames. Two implementations are provided:
//!
//! - length-prefixed streams (`[u32 BE length][payload]`), used for TCP
//! - an in-memory pipe built from bounded channels
//!
//! Zero-length frames on a stream are skipped; frames larger than
//! [`MAX_FRAME_LEN`] are a protocol violation and end the stream.

use std::future::Future;
use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

pub trait FrameSource: Send {
    /// Next frame, or `None` once the peer has closed the stream.
    fn next_frame(&mut self) -> impl Future<Output = io::Result<Option<Bytes>>> + Send;
}

pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

// ============================================================================
// Length-prefixed streams
// ============================================================================

pub struct FrameReader<R> {
    inner: R,
}

impl<R> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        FrameReader { inner }
    }
}

impl<R: AsyncRead + Unpin + Send> FrameSource for FrameReader<R> {
    fn next_frame(&mut self) -> impl Future<Output = io::Result<Option<Bytes>>> + Send {
        async move {
            loop {
                let mut len_buf = [0u8; 4];
                match self.inner.read_exact(&mut len_buf).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                    Err(e) => return Err(e),
                }

                let frame_len = u32::from_be_bytes(len_buf) as usize;
                if frame_len == 0 {
                    continue;
                }
                if frame_len > MAX_FRAME_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("frame of {} bytes exceeds limit", frame_len),
                    ));
                }

                let mut frame = vec![0u8; frame_len];
                self.inner.read_exact(&mut frame).await?;
                return Ok(Some(Bytes::from(frame)));
            }
        }
    }
}

pub struct FrameWriter<W> {
    inner: W,
}

impl<W> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        FrameWriter { inner }
    }
}

impl<W: AsyncWrite + Unpin + Send> FrameSink for FrameWriter<W> {
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let len = u32::try_from(frame.len())
                .ok()
                .filter(|&len| len as usize <= MAX_FRAME_LEN)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;

            self.inner.write_all(&len.to_be_bytes()).await?;
            self.inner.write_all(&frame).await?;
            self.inner.flush().await
        }
    }

    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        async move { self.inner.shutdown().await }
    }
}

/// Split a TCP stream into framed halves.
pub fn tcp_transport(
    stream: TcpStream,
) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
    let (read_half, write_half) = stream.into_split();
    (FrameReader::new(read_half), FrameWriter::new(write_half))
}

// ============================================================================
// In-memory
// ============================================================================

pub struct MemorySource {
    rx: mpsc::Receiver<Bytes>,
}

impl MemorySource {
    /// Next frame if one is already queued.
    pub fn try_next_frame(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> impl Future<Output = io::Result<Option<Bytes>>> + Send {
        async move { Ok(self.rx.recv().await) }
    }
}

pub struct MemorySink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl FrameSink for MemorySink {
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
            tx.send(frame)
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            self.tx = None;
            Ok(())
        }
    }
}

/// One side of an in-memory connection.
pub struct MemoryPipe {
    pub source: MemorySource,
    pub sink: MemorySink,
}

/// Two connected pipe ends; what one end's sink sends, the other's source
/// yields. Each direction buffers up to `capacity` frames.
pub fn memory_transport(capacity: usize) -> (MemoryPipe, MemoryPipe) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);

    let a = MemoryPipe {
        source: MemorySource { rx: b_rx },
        sink: MemorySink { tx: Some(a_tx) },
    };
    let b = MemoryPipe {
        source: MemorySource { rx: a_rx },
        sink: MemorySink { tx: Some(b_tx) },
    };
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn length_prefixed_frames_round_trip() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.send_frame(Bytes::from_static(&[1, 0, 0, 1])).await.unwrap();
        writer.send_frame(Bytes::from_static(b"tok")).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(reader.next_frame().await.unwrap().unwrap(), &[1, 0, 0, 1][..]);
        assert_eq!(reader.next_frame().await.unwrap().unwrap(), &b"tok"[..]);
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_length_frames_are_skipped() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        client.write_all(&[0, 0, 0, 0, 0, 0, 0, 1, 7]).await.unwrap();
        drop(client);

        assert_eq!(reader.next_frame().await.unwrap().unwrap(), &[7][..]);
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_frame_is_an_error() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        client.write_all(&len).await.unwrap();

        let err = reader.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        client.write_all(&[0, 0, 0, 4, 1, 0]).await.unwrap();
        drop(client);

        assert!(reader.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn memory_pipes_are_cross_connected() {
        let (mut a, mut b) = memory_transport(4);

        a.sink.send_frame(Bytes::from_static(b"ping")).await.unwrap();
        b.sink.send_frame(Bytes::from_static(b"pong")).await.unwrap();

        assert_eq!(b.source.next_frame().await.unwrap().unwrap(), &b"ping"[..]);
        assert_eq!(a.source.try_next_frame().unwrap(), &b"pong"[..]);

        a.sink.close().await.unwrap();
        assert_eq!(b.source.next_frame().await.unwrap(), None);
        assert!(a.sink.send_frame(Bytes::new()).await.is_err());
    }
}
