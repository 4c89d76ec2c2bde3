use tracing::{debug, info};

use super::{PeerChain, Session, TlsBackend};
use crate::config::{HandshakeParams, SessionConfig};
use crate::diagnostics::DebugLevel;
use crate::error::{ConfigError, HandshakeError};
use crate::handshake::{BackendStep, EngineContext, Negotiated};
use crate::protocol::state::{SessionState, StepResult};
use crate::transport::TransportAdapter;

impl<B: TlsBackend> Session<B> {
    /// Advances the handshake by one backend substep.
    ///
    /// The first call freezes the configuration. Queued output is flushed
    /// before the backend runs; if the transport would block, the call
    /// returns [`StepResult::InProgress`] without advancing. A substep whose
    /// output is still queued only counts once that output is written. Once
    /// the session is established every further call returns
    /// [`StepResult::Complete`].
    ///
    /// Protocol failures are reported as [`StepResult::Failed`] and leave the
    /// session in the terminal `Failed` state; misuse of the API is reported
    /// as a [`ConfigError`] and changes nothing.
    ///
    /// 将握手推进一个后端子步骤。
    ///
    /// 第一次调用会冻结配置。后端运行前会先刷新排队的输出；如果传输将阻塞，
    /// 调用返回 [`StepResult::InProgress`] 且不推进。输出仍在队列中的子步骤，
    /// 要等输出写出后才计入。会话建立后，
    /// 之后的每次调用都返回 [`StepResult::Complete`]。
    ///
    /// 协议失败以 [`StepResult::Failed`] 报告，并使会话进入终结的 `Failed` 状态；
    /// API 误用以 [`ConfigError`] 报告，且不改变任何状态。
    pub fn step(&mut self) -> Result<StepResult, ConfigError> {
        match self.state {
            SessionState::Uninitialized => return Err(ConfigError::NotConfigured),
            SessionState::Failed(_) | SessionState::Closed => {
                return Err(ConfigError::InvalidSessionState);
            }
            SessionState::Established => return Ok(StepResult::Complete),
            SessionState::Configured | SessionState::Handshaking { .. } => {}
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(ConfigError::TransportNotBound);
        };

        if self.params.is_none() {
            let params = self.config.handshake_params()?;
            if let Some(limit) = self.config.would_block_limit {
                transport.set_would_block_limit(Some(limit));
            }
            info!(
                target: "tls_session_driver::handshake",
                suites = params.cipher_suites.len(),
                min = %params.min_version,
                max = %params.max_version,
                client_certificate = self.config.credentials.own_identity().is_some(),
                "handshake started"
            );
            self.state = SessionState::Handshaking { substep: 0 };
            self.params = Some(params);
        }
        let Some(params) = self.params.as_ref() else {
            return Err(ConfigError::InvalidSessionState);
        };

        if self.unflushed_substep {
            return match transport.flush() {
                Ok(false) => Ok(StepResult::InProgress),
                Ok(true) => {
                    self.unflushed_substep = false;
                    self.advance_substep();
                    Ok(StepResult::InProgress)
                }
                Err(err) => Ok(StepResult::Failed(self.fail(err.into()))),
            };
        }

        match drive(&mut self.backend, transport, params, &self.config) {
            Ok(None) | Ok(Some((BackendStep::WantRead | BackendStep::WantWrite, _))) => {
                Ok(StepResult::InProgress)
            }
            Ok(Some((BackendStep::Continue, true))) => {
                self.advance_substep();
                Ok(StepResult::InProgress)
            }
            Ok(Some((BackendStep::Continue, false))) => {
                debug!(target: "tls_session_driver::handshake", "substep output still queued");
                self.unflushed_substep = true;
                Ok(StepResult::InProgress)
            }
            Ok(Some((BackendStep::Complete(negotiated), _))) => match self.establish(negotiated) {
                Ok(()) => Ok(StepResult::Complete),
                Err(err) => Ok(StepResult::Failed(self.fail(err))),
            },
            Err(err) => Ok(StepResult::Failed(self.fail(err))),
        }
    }

    fn advance_substep(&mut self) {
        let substep = match self.state {
            SessionState::Handshaking { substep } => substep + 1,
            _ => 1,
        };
        self.state = SessionState::Handshaking { substep };
        debug!(target: "tls_session_driver::handshake", substep, "handshake substep done");
        crate::tls_debug!(self.config.debug, DebugLevel::StateChange, "client state: {substep}");
    }

    /// Checks what the backend negotiated against the frozen parameters and
    /// moves to `Established`.
    fn establish(&mut self, negotiated: Negotiated) -> Result<(), HandshakeError> {
        let Some(params) = self.params.as_ref() else {
            return Err(HandshakeError::UnexpectedMessage);
        };
        if !params.allows_version(negotiated.version) {
            return Err(HandshakeError::VersionMismatch);
        }
        if !params.allows_suite(negotiated.suite) {
            return Err(HandshakeError::CipherMismatch);
        }
        let peer_chain = PeerChain::from_der_list(&negotiated.peer_chain)
            .map_err(|err| HandshakeError::CertificateRejected(err.to_string()))?;

        info!(
            target: "tls_session_driver::handshake",
            version = %negotiated.version,
            suite = %negotiated.suite,
            peer_certificates = peer_chain.len(),
            "handshake complete"
        );
        crate::tls_debug!(
            self.config.debug,
            DebugLevel::StateChange,
            "handshake over: {} {}",
            negotiated.version,
            negotiated.suite
        );
        self.negotiated = Some((negotiated.version, negotiated.suite));
        self.peer_chain = peer_chain;
        self.state = SessionState::Established;
        Ok(())
    }
}

/// Runs one backend substep, with queued output flushed on both sides of it.
///
/// `Ok(None)` means the pending output could not be written yet, so the
/// backend was not called. Otherwise the flag tells whether everything the
/// backend queued has been written.
fn drive<B: TlsBackend>(
    backend: &mut B,
    transport: &mut TransportAdapter,
    params: &HandshakeParams,
    config: &SessionConfig,
) -> Result<Option<(BackendStep, bool)>, HandshakeError> {
    if !transport.flush()? {
        return Ok(None);
    }
    let step = backend.handshake_step(&mut EngineContext::new(transport, params, config))?;
    let flushed = transport.flush()?;
    Ok(Some((step, flushed)))
}
