use tracing::{debug, info, warn};

use super::{Session, TlsBackend};
use crate::error::{ConfigError, HandshakeError, Result};
use crate::handshake::EngineContext;
use crate::protocol::state::{Progress, SessionState};

impl<B: TlsBackend> Session<B> {
    /// Drops the first entry of the peer chain so it starts at the
    /// certificate after it.
    ///
    /// Some TLS libraries place a duplicate of the server leaf in front of
    /// the received chain; this undoes that. It may be called at most once,
    /// and only after the handshake completed.
    ///
    /// 丢弃对端证书链的第一项，使链从其后的证书开始。
    ///
    /// 某些 TLS 库会在接收到的链前放置服务器叶证书的副本，此方法用于撤销这一点。
    /// 最多只能调用一次，且只能在握手完成后调用。
    pub fn fix_peer_certificate_link(&mut self) -> Result<()> {
        if self.state != SessionState::Established {
            return Err(ConfigError::InvalidSessionState.into());
        }
        self.peer_chain.advance()?;
        debug!(
            target: "tls_session_driver::handshake",
            remaining = self.peer_chain.len(),
            "peer chain advanced"
        );
        Ok(())
    }

    /// Sends application data. Returns how many bytes of `data` were taken.
    ///
    /// 发送应用数据，返回 `data` 中被接收的字节数。
    pub fn write(&mut self, data: &[u8]) -> Result<Progress<usize>> {
        self.ensure_established()?;
        let outcome = match (self.transport.as_mut(), self.params.as_ref()) {
            (Some(transport), Some(params)) => {
                let mut ctx = EngineContext::new(transport, params, &self.config);
                flush_then(&mut ctx, |ctx| self.backend.write_application(ctx, data))
            }
            _ => return Err(ConfigError::InvalidSessionState.into()),
        };
        self.settle(outcome)
    }

    /// Receives application data into `buf`.
    ///
    /// `Ready(0)` means the server closed the connection.
    ///
    /// 将应用数据接收到 `buf` 中。`Ready(0)` 表示服务器关闭了连接。
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Progress<usize>> {
        self.ensure_established()?;
        let outcome = match (self.transport.as_mut(), self.params.as_ref()) {
            (Some(transport), Some(params)) => {
                let mut ctx = EngineContext::new(transport, params, &self.config);
                flush_then(&mut ctx, |ctx| self.backend.read_application(ctx, buf))
            }
            _ => return Err(ConfigError::InvalidSessionState.into()),
        };
        self.settle(outcome)
    }

    /// Tears the session down.
    ///
    /// An established session first sends a close notification. Transport,
    /// credentials and the peer chain are then released whatever happened,
    /// and every later call fails with `InvalidSessionState`.
    ///
    /// 拆除会话。已建立的会话会先发送关闭通知。之后无论结果如何都会释放传输、凭据和对端证书链，
    /// 此后的每次调用都会以 `InvalidSessionState` 失败。
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(ConfigError::InvalidSessionState.into());
        }
        let notified = match (&self.state, self.transport.as_mut(), self.params.as_ref()) {
            (SessionState::Established, Some(transport), Some(params)) => {
                let mut ctx = EngineContext::new(transport, params, &self.config);
                self.backend
                    .close_notify(&mut ctx)
                    .and_then(|()| ctx.transport().flush().map(|_| ()).map_err(HandshakeError::from))
            }
            _ => Ok(()),
        };
        if let Err(err) = &notified {
            warn!(target: "tls_session_driver::handshake", error = %err, "close notification failed");
        }

        self.release();
        self.state = SessionState::Closed;
        info!(target: "tls_session_driver::handshake", "session closed");
        notified.map_err(Into::into)
    }

    fn ensure_established(&self) -> std::result::Result<(), ConfigError> {
        match self.state {
            SessionState::Established => Ok(()),
            _ => Err(ConfigError::InvalidSessionState),
        }
    }

    /// A failed transfer makes the session terminal, like a failed step.
    fn settle(
        &mut self,
        outcome: std::result::Result<Progress<usize>, HandshakeError>,
    ) -> Result<Progress<usize>> {
        outcome.map_err(|err| self.fail(err).into())
    }
}

/// Flushes output queued earlier, then runs `op` if nothing is left pending.
fn flush_then<F>(
    ctx: &mut EngineContext<'_>,
    op: F,
) -> std::result::Result<Progress<usize>, HandshakeError>
where
    F: FnOnce(&mut EngineContext<'_>) -> std::result::Result<Progress<usize>, HandshakeError>,
{
    if !ctx.transport().flush()? {
        return Ok(Progress::WouldBlock);
    }
    let progress = op(ctx)?;
    ctx.transport().flush()?;
    Ok(progress)
}
