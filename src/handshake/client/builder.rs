use std::sync::Arc;

use super::{Session, TlsBackend};
use crate::config::SessionSettings;
use crate::diagnostics::{DebugLevel, DiagnosticsSink};
use crate::error::Result;
use crate::protocol::suite::ProtocolVersion;
use crate::transport::TransportAdapter;

/// A builder for creating a configured `Session`.
///
/// Everything set here goes through the same checks as the individual
/// setters; `build` fails on the first invalid value and the partially
/// configured session is discarded.
///
/// 用于创建已配置 `Session` 的构建器。
///
/// 此处设置的所有内容都会经过与单独设置方法相同的检查；`build` 在遇到第一个无效值时失败，
/// 部分配置的会话会被丢弃。
pub struct SessionBuilder<B: TlsBackend> {
    backend: B,
    settings: Option<SessionSettings>,
    cipher_suites: Option<Vec<u16>>,
    min_version: Option<ProtocolVersion>,
    max_version: Option<ProtocolVersion>,
    debug: Option<(DebugLevel, Option<Arc<dyn DiagnosticsSink>>)>,
    client_certificate: Option<(Vec<u8>, Vec<u8>)>,
    trusted_chain: Option<Vec<u8>>,
    transport: Option<TransportAdapter>,
}

impl<B: TlsBackend> SessionBuilder<B> {
    /// Creates a new `SessionBuilder`.
    ///
    /// 创建一个新的 `SessionBuilder`。
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            settings: None,
            cipher_suites: None,
            min_version: None,
            max_version: None,
            debug: None,
            client_certificate: None,
            trusted_chain: None,
            transport: None,
        }
    }

    /// Starts from file-based settings; the other builder calls override them.
    ///
    /// 以来自文件的设置为起点；构建器的其他调用会覆盖它们。
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the offered cipher suites, optionally terminated by `0`.
    ///
    /// 设置提供的密码套件，可以 `0` 结尾。
    pub fn cipher_suites(mut self, suites: &[u16]) -> Self {
        self.cipher_suites = Some(suites.to_vec());
        self
    }

    /// Sets the lowest accepted protocol version.
    ///
    /// 设置接受的最低协议版本。
    pub fn min_version(mut self, version: ProtocolVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Sets the highest offered protocol version.
    ///
    /// 设置提供的最高协议版本。
    pub fn max_version(mut self, version: ProtocolVersion) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Sets the diagnostics sink and its threshold.
    ///
    /// 设置诊断接收器及其阈值。
    pub fn debug(mut self, level: DebugLevel, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.debug = Some((level, Some(sink)));
        self
    }

    /// Client certificate chain and private key, PEM or DER.
    ///
    /// 客户端证书链和私钥，PEM 或 DER 格式。
    pub fn client_certificate(mut self, cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        self.client_certificate = Some((cert.into(), key.into()));
        self
    }

    /// CA chain for checking the server, PEM or DER.
    ///
    /// 用于校验服务器的 CA 证书链，PEM 或 DER 格式。
    pub fn trusted_chain(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.trusted_chain = Some(cert.into());
        self
    }

    /// Sets the transport the session runs over.
    ///
    /// 设置会话所使用的传输。
    pub fn transport(mut self, adapter: TransportAdapter) -> Self {
        self.transport = Some(adapter);
        self
    }

    /// Builds the `Session` in the `Configured` state.
    ///
    /// 构建处于 `Configured` 状态的 `Session`。
    pub fn build(self) -> Result<Session<B>> {
        let mut session = Session::new(self.backend);
        if let Some(settings) = &self.settings {
            session.apply_settings(settings)?;
        }
        if let Some(suites) = &self.cipher_suites {
            session.set_cipher_suites(suites)?;
        }
        if let Some(version) = self.min_version {
            session.set_min_version(version)?;
        }
        if let Some(version) = self.max_version {
            session.set_max_version(version)?;
        }
        if let Some((level, sink)) = self.debug {
            session.set_debug(level, sink)?;
        }
        if let Some((cert, key)) = &self.client_certificate {
            session.configure_client_certificate(cert, key)?;
        }
        if let Some(cert) = &self.trusted_chain {
            session.configure_trusted_chain(cert)?;
        }
        if let Some(adapter) = self.transport {
            session.bind_transport(adapter)?;
        }
        session.configure_defaults()?;
        Ok(session)
    }
}
