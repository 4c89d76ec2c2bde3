//! Implements the client-side session state machine.
//! 实现客户端会话状态机。

use tracing::{info, warn};

use super::{PeerChain, TlsBackend};
use crate::config::{HandshakeParams, SessionConfig};
use crate::diagnostics::DebugLevel;
use crate::error::{ConfigError, HandshakeError};
use crate::protocol::state::SessionState;
use crate::protocol::suite::{CipherSuite, ProtocolVersion};
use crate::transport::TransportAdapter;

mod builder;
mod state_configure;
mod state_established;
mod state_handshaking;

pub use builder::SessionBuilder;

/// One client TLS connection.
///
/// The session owns its configuration, credentials, transport and backend;
/// nothing is shared with other sessions, so independent sessions can be
/// driven from different threads. All calls take `&mut self` and are
/// therefore serialized.
///
/// 一个客户端 TLS 连接。
///
/// 会话拥有其配置、凭据、传输和后端，不与其他会话共享任何内容，
/// 因此独立的会话可以在不同线程上驱动。所有调用都接收 `&mut self`，因而是串行的。
#[derive(Debug)]
pub struct Session<B: TlsBackend> {
    /// Where the session is in its lifecycle.
    ///
    /// 会话所处的生命周期阶段。
    state: SessionState,
    /// Caller configuration; frozen once the handshake starts.
    ///
    /// 调用方配置；握手开始后冻结。
    config: SessionConfig,
    /// The configuration as frozen by the first `step`.
    ///
    /// 第一次 `step` 固化后的配置。
    params: Option<HandshakeParams>,
    transport: Option<TransportAdapter>,
    backend: B,
    /// Set once the handshake completes.
    ///
    /// 握手完成后设置。
    negotiated: Option<(ProtocolVersion, CipherSuite)>,
    peer_chain: PeerChain,
    /// A finished substep whose output has not left the transport yet; it
    /// only counts once the output is flushed.
    ///
    /// 已完成但输出尚未离开传输的子步骤；输出刷新后才计入。
    unflushed_substep: bool,
}

impl<B: TlsBackend> Session<B> {
    /// Creates an unconfigured session around a backend.
    ///
    /// 基于后端创建一个未配置的会话。
    pub fn new(backend: B) -> Self {
        Self {
            state: SessionState::Uninitialized,
            config: SessionConfig::default(),
            params: None,
            transport: None,
            backend,
            negotiated: None,
            peer_chain: PeerChain::default(),
            unflushed_substep: false,
        }
    }

    /// Returns a builder that configures the session in one go.
    ///
    /// 返回一次性配置会话的构建器。
    pub fn builder(backend: B) -> SessionBuilder<B> {
        SessionBuilder::new(backend)
    }

    /// 会话当前的生命周期状态。
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The protocol version agreed with the server, once established.
    /// 建立连接后与服务器协商的协议版本。
    pub fn negotiated_version(&self) -> Option<ProtocolVersion> {
        self.negotiated.map(|(version, _)| version)
    }

    /// The cipher suite agreed with the server, once established.
    /// 建立连接后与服务器协商的密码套件。
    pub fn negotiated_cipher_suite(&self) -> Option<CipherSuite> {
        self.negotiated.map(|(_, suite)| suite)
    }

    /// Certificates presented by the server. Empty until established.
    ///
    /// 服务器提供的证书。建立连接前为空。
    pub fn peer_certificates(&self) -> &PeerChain {
        &self.peer_chain
    }

    /// Rejects any call once the session failed or was closed.
    fn ensure_usable(&self) -> Result<(), ConfigError> {
        if self.state.is_terminal() {
            return Err(ConfigError::InvalidSessionState);
        }
        Ok(())
    }

    /// Rejects configuration changes once the handshake started.
    fn ensure_configurable(&self) -> Result<(), ConfigError> {
        self.ensure_usable()?;
        if self.state.is_started() {
            return Err(ConfigError::SessionAlreadyStarted);
        }
        Ok(())
    }

    /// Moves to the terminal `Failed` state.
    fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        warn!(
            target: "tls_session_driver::handshake",
            from = self.state.name(),
            code = err.code(),
            error = %err,
            "session failed"
        );
        crate::tls_debug!(self.config.debug, DebugLevel::Error, "session failed: {err} ({})", err.code());
        self.state = SessionState::Failed(err.clone());
        err
    }

    /// Drops everything the session holds except the backend.
    fn release(&mut self) {
        self.transport = None;
        self.params = None;
        self.peer_chain.clear();
        self.unflushed_substep = false;
        self.config.credentials.clear();
        info!(target: "tls_session_driver::handshake", "session resources released");
    }
}
