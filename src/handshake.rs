//! The client handshake engine and the capability it drives.
//!
//! A [`client::Session`] owns the state machine; the actual TLS record and
//! handshake processing is done by a [`TlsBackend`] the session calls one
//! substep at a time. The backend only sees the session through an
//! [`EngineContext`]: the frozen negotiation parameters, the bound
//! credentials, the transport adapter and the diagnostics emitter.
//!
//! 客户端握手引擎及其所驱动的能力接口。
//!
//! [`client::Session`] 持有状态机；实际的 TLS 记录与握手处理由会话逐个子步骤调用的
//! [`TlsBackend`] 完成。后端只能通过 [`EngineContext`] 访问会话：
//! 固化的协商参数、已绑定的凭据、传输适配器以及诊断输出。

use std::fmt;

use crate::config::{HandshakeParams, SessionConfig};
use crate::credentials::CredentialStore;
use crate::diagnostics::DebugLevel;
use crate::error::HandshakeError;
use crate::protocol::state::Progress;
use crate::protocol::suite::{CipherSuite, ProtocolVersion};
use crate::transport::TransportAdapter;

pub mod client;
mod peer;

pub use client::{Session, SessionBuilder};
pub use peer::PeerChain;

/// Emits a backend debug event through anything with an `emit` method
/// taking `(level, file, line, args)`, recording the call site.
///
/// ```ignore
/// tls_debug!(ctx, DebugLevel::StateChange, "=> write client hello ({} suites)", n);
/// ```
#[macro_export]
macro_rules! tls_debug {
    ($target:expr, $level:expr, $($arg:tt)+) => {
        $target.emit($level, file!(), line!(), format_args!($($arg)+))
    };
}

/// What a backend reports after one handshake substep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStep {
    /// A protocol substep finished; more remain.
    Continue,
    /// Nothing could be done until more bytes arrive.
    WantRead,
    /// Nothing could be done until queued bytes are written.
    WantWrite,
    /// The handshake finished with these parameters.
    Complete(Negotiated),
}

/// Parameters the backend agreed on with the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub version: ProtocolVersion,
    pub suite: CipherSuite,
    /// Peer certificates as received, in wire order.
    pub peer_chain: Vec<Vec<u8>>,
}

/// The TLS library capability a session drives.
///
/// Each call must do at most one protocol substep and must never block:
/// when the transport has no data it returns [`BackendStep::WantRead`] (or
/// [`Progress::WouldBlock`]) and is called again later with the same
/// buffered input.
///
/// 会话所驱动的 TLS 库能力接口。
///
/// 每次调用最多执行一个协议子步骤且绝不阻塞：传输无数据时返回
/// [`BackendStep::WantRead`]（或 [`Progress::WouldBlock`]），
/// 之后会在保留已缓冲输入的情况下再次被调用。
pub trait TlsBackend {
    fn handshake_step(&mut self, ctx: &mut EngineContext<'_>) -> Result<BackendStep, HandshakeError>;

    fn write_application(
        &mut self,
        ctx: &mut EngineContext<'_>,
        data: &[u8],
    ) -> Result<Progress<usize>, HandshakeError>;

    /// `Ready(0)` means the peer closed the connection cleanly.
    fn read_application(
        &mut self,
        ctx: &mut EngineContext<'_>,
        buf: &mut [u8],
    ) -> Result<Progress<usize>, HandshakeError>;

    fn close_notify(&mut self, ctx: &mut EngineContext<'_>) -> Result<(), HandshakeError>;
}

/// The session as seen from inside a backend call.
pub struct EngineContext<'a> {
    transport: &'a mut TransportAdapter,
    params: &'a HandshakeParams,
    config: &'a SessionConfig,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(
        transport: &'a mut TransportAdapter,
        params: &'a HandshakeParams,
        config: &'a SessionConfig,
    ) -> Self {
        Self {
            transport,
            params,
            config,
        }
    }

    pub fn transport(&mut self) -> &mut TransportAdapter {
        self.transport
    }

    pub fn params(&self) -> &HandshakeParams {
        self.params
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.config.credentials
    }

    /// Forwards a debug event to the session's diagnostics sink, if the
    /// event passes the configured threshold. Prefer [`tls_debug!`].
    pub fn emit(&self, level: DebugLevel, file: &str, line: u32, args: fmt::Arguments<'_>) {
        self.config.debug.emit(level, file, line, args);
    }
}

impl fmt::Debug for EngineContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("transport", &self.transport)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
