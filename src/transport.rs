//! The I/O seam between the TLS engine and the caller's socket.
//!
//! Callers implement [`Transport`] (or use [`StreamTransport`] /
//! [`CallbackTransport`]); the engine only ever talks to it through a
//! [`TransportAdapter`], which turns short reads into "not enough data yet",
//! loops over short writes and keeps whatever could not be written for the
//! next attempt.
//!
//! TLS 引擎与调用方套接字之间的 I/O 接缝。
//!
//! 调用方实现 [`Transport`]（或使用 [`StreamTransport`] / [`CallbackTransport`]）；
//! 引擎只通过 [`TransportAdapter`] 与其交互。适配器把短读转换为“数据尚不足”，
//! 对短写进行循环，并保留无法写出的数据留待下次尝试。

use std::io::{self, Read, Write};

use tracing::trace;

use crate::error::TransportError;

/// Result of a single transport call.
#[derive(Debug)]
pub enum TransportStatus {
    /// `n` bytes were transferred. For reads, `0` means the peer closed.
    Ready(usize),
    /// No data or capacity right now; the engine will retry later.
    WouldBlock,
    /// The transport failed for good.
    Failed(io::Error),
}

/// Caller-supplied byte stream.
///
/// Implementations may transfer fewer bytes than asked for; both short reads
/// and short writes are handled by the engine.
///
/// 调用方提供的字节流。实现可以传输少于请求的字节数；短读和短写都由引擎处理。
pub trait Transport {
    fn write(&mut self, buf: &[u8]) -> TransportStatus;

    fn read(&mut self, buf: &mut [u8]) -> TransportStatus;
}

/// A [`Transport`] over any blocking or non-blocking `Read + Write` stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn io_status(result: io::Result<usize>) -> TransportStatus {
    match result {
        Ok(n) => TransportStatus::Ready(n),
        Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            TransportStatus::WouldBlock
        }
        Err(err) => TransportStatus::Failed(err),
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write(&mut self, buf: &[u8]) -> TransportStatus {
        io_status(self.stream.write(buf))
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportStatus {
        io_status(self.stream.read(buf))
    }
}

/// A [`Transport`] built from two callbacks using the sentinel convention:
/// a non-negative return is a byte count, a negative return means
/// "would block, try again".
///
/// Any context the callbacks need (a socket handle, a host object) is simply
/// captured by the closures.
///
/// 由两个回调构建的 [`Transport`]，采用哨兵约定：非负返回值为字节数，
/// 负返回值表示“将阻塞，请重试”。回调所需的任何上下文都由闭包捕获。
pub struct CallbackTransport<W, R> {
    write: W,
    read: R,
}

impl<W, R> CallbackTransport<W, R>
where
    W: FnMut(&[u8]) -> isize,
    R: FnMut(&mut [u8]) -> isize,
{
    pub fn new(write: W, read: R) -> Self {
        Self { write, read }
    }
}

impl<W, R> Transport for CallbackTransport<W, R>
where
    W: FnMut(&[u8]) -> isize,
    R: FnMut(&mut [u8]) -> isize,
{
    fn write(&mut self, buf: &[u8]) -> TransportStatus {
        match (self.write)(buf) {
            n if n < 0 => TransportStatus::WouldBlock,
            n => TransportStatus::Ready((n as usize).min(buf.len())),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportStatus {
        match (self.read)(buf) {
            n if n < 0 => TransportStatus::WouldBlock,
            n => TransportStatus::Ready((n as usize).min(buf.len())),
        }
    }
}

/// Engine-side wrapper around a caller's [`Transport`].
///
/// 调用方 [`Transport`] 的引擎侧包装。
pub struct TransportAdapter {
    inner: Box<dyn Transport + Send>,
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    would_block_limit: Option<u32>,
    consecutive_would_block: u32,
}

impl TransportAdapter {
    /// Wraps a transport with empty buffers and no would-block limit.
    ///
    /// 用空缓冲区包装传输，不设“将阻塞”上限。
    pub fn new<T: Transport + Send + 'static>(transport: T) -> Self {
        Self {
            inner: Box::new(transport),
            inbound: Vec::new(),
            outbound: Vec::new(),
            would_block_limit: None,
            consecutive_would_block: 0,
        }
    }

    /// Fail with [`TransportError::TimedOut`] after `limit` consecutive
    /// would-block signals. Unbounded by default.
    ///
    /// 在连续 `limit` 次“将阻塞”之后以 [`TransportError::TimedOut`] 失败。默认无上限。
    pub fn with_would_block_limit(mut self, limit: Option<u32>) -> Self {
        self.would_block_limit = limit;
        self
    }

    pub(crate) fn set_would_block_limit(&mut self, limit: Option<u32>) {
        self.would_block_limit = limit;
    }

    fn note_would_block(&mut self) -> Result<(), TransportError> {
        self.consecutive_would_block = self.consecutive_would_block.saturating_add(1);
        match self.would_block_limit {
            Some(limit) if self.consecutive_would_block > limit => {
                Err(TransportError::TimedOut { limit })
            }
            _ => Ok(()),
        }
    }

    /// Reads until at least `want` bytes are buffered.
    ///
    /// Returns `Ok(false)` when the transport runs dry first; whatever was
    /// delivered stays buffered for the next call.
    ///
    /// 读取直到缓冲区中至少有 `want` 个字节。若传输先耗尽则返回 `Ok(false)`；
    /// 已送达的数据保留在缓冲区中供下次调用使用。
    pub fn fill(&mut self, want: usize) -> Result<bool, TransportError> {
        let mut chunk = Vec::new();
        while self.inbound.len() < want {
            chunk.resize(want - self.inbound.len(), 0);
            match self.inner.read(&mut chunk) {
                TransportStatus::Ready(0) => return Err(TransportError::Closed),
                TransportStatus::Ready(n) => {
                    let n = n.min(chunk.len());
                    trace!(target: "tls_session_driver::transport", requested = chunk.len(), delivered = n, "read");
                    self.inbound.extend_from_slice(&chunk[..n]);
                    self.consecutive_would_block = 0;
                }
                TransportStatus::WouldBlock => {
                    self.note_would_block()?;
                    return Ok(false);
                }
                TransportStatus::Failed(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }

    /// Bytes received and not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.inbound
    }

    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.inbound.len());
        self.inbound.drain(..n);
    }

    /// Removes and returns the first `n` buffered bytes.
    pub fn take(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.inbound.len());
        self.inbound.drain(..n).collect()
    }

    /// Appends bytes to the outbound queue; they are sent by [`Self::flush`].
    ///
    /// 将字节追加到发送队列；由 [`Self::flush`] 发送。
    pub fn queue(&mut self, data: &[u8]) {
        self.outbound.extend_from_slice(data);
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Writes queued bytes until the queue is empty or the transport blocks.
    ///
    /// Returns `Ok(true)` once everything was written.
    ///
    /// 写出队列中的字节，直到队列为空或传输阻塞。全部写出后返回 `Ok(true)`。
    pub fn flush(&mut self) -> Result<bool, TransportError> {
        while !self.outbound.is_empty() {
            match self.inner.write(&self.outbound) {
                TransportStatus::Ready(0) | TransportStatus::WouldBlock => {
                    self.note_would_block()?;
                    return Ok(false);
                }
                TransportStatus::Ready(n) => {
                    let n = n.min(self.outbound.len());
                    trace!(target: "tls_session_driver::transport", written = n, pending = self.outbound.len() - n, "write");
                    self.outbound.drain(..n);
                    self.consecutive_would_block = 0;
                }
                TransportStatus::Failed(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("inbound", &self.inbound.len())
            .field("outbound", &self.outbound.len())
            .field("would_block_limit", &self.would_block_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Delivers at most `chunk` bytes per read, blocking every other call.
    struct Trickle {
        data: VecDeque<u8>,
        chunk: usize,
        block_next: bool,
    }

    impl Transport for Trickle {
        fn write(&mut self, buf: &[u8]) -> TransportStatus {
            TransportStatus::Ready(buf.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> TransportStatus {
            if self.block_next {
                self.block_next = false;
                return TransportStatus::WouldBlock;
            }
            self.block_next = true;
            let n = buf.len().min(self.chunk).min(self.data.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.data.pop_front().unwrap();
            }
            TransportStatus::Ready(n)
        }
    }

    #[test]
    fn short_reads_accumulate_until_filled() {
        let mut adapter = TransportAdapter::new(Trickle {
            data: (0u8..10).collect(),
            chunk: 3,
            block_next: false,
        });
        let mut attempts = 0;
        while !adapter.fill(8).unwrap() {
            attempts += 1;
        }
        assert_eq!(attempts, 2);
        assert!(adapter.buffered().len() >= 8);
        assert_eq!(adapter.take(8), (0u8..8).collect::<Vec<_>>());
    }

    #[test]
    fn eof_is_reported_as_closed() {
        let mut adapter = TransportAdapter::new(Trickle {
            data: VecDeque::new(),
            chunk: 4,
            block_next: false,
        });
        assert!(matches!(adapter.fill(1), Err(TransportError::Closed)));
    }

    #[test]
    fn partial_writes_keep_the_remainder() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = sent.clone();
        let mut calls = 0;
        let transport = CallbackTransport::new(
            move |buf: &[u8]| {
                calls += 1;
                if calls % 2 == 0 {
                    return -1;
                }
                let n = buf.len().min(2);
                sink.lock().unwrap().extend_from_slice(&buf[..n]);
                n as isize
            },
            |_buf: &mut [u8]| -1,
        );
        let mut adapter = TransportAdapter::new(transport);
        adapter.queue(b"hello");

        let mut flushes = 1;
        while !adapter.flush().unwrap() {
            flushes += 1;
        }
        assert_eq!(flushes, 3);
        assert!(!adapter.has_pending_output());
        assert_eq!(sent.lock().unwrap().as_slice(), b"hello");
    }

    #[test]
    fn would_block_limit_times_out() {
        let mut adapter = TransportAdapter::new(CallbackTransport::new(|_: &[u8]| -1, |_: &mut [u8]| -1))
            .with_would_block_limit(Some(2));
        assert!(!adapter.fill(1).unwrap());
        assert!(!adapter.fill(1).unwrap());
        assert!(matches!(
            adapter.fill(1),
            Err(TransportError::TimedOut { limit: 2 })
        ));
    }

    #[test]
    fn stream_transport_maps_would_block() {
        struct Blocked;
        impl Read for Blocked {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::WouldBlock.into())
            }
        }
        impl Write for Blocked {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut transport = StreamTransport::new(Blocked);
        assert!(matches!(transport.read(&mut [0; 4]), TransportStatus::WouldBlock));
        assert!(matches!(transport.write(b"x"), TransportStatus::Failed(_)));
    }
}
