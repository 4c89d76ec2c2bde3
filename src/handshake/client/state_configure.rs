use std::sync::Arc;

use tracing::debug;

use super::{Session, TlsBackend};
use crate::config::SessionSettings;
use crate::credentials::{CredentialStore, IssuerId};
use crate::diagnostics::{DebugConfig, DebugLevel, DiagnosticsSink};
use crate::error::Result;
use crate::protocol::state::SessionState;
use crate::protocol::suite::{CipherSuiteList, ProtocolVersion};
use crate::transport::{CallbackTransport, Transport, TransportAdapter};

impl<B: TlsBackend> Session<B> {
    /// Applies library defaults and marks the session configured.
    ///
    /// Unset version bounds become TLS1.2 ..= TLS1.3. May be repeated until
    /// the handshake starts.
    ///
    /// 应用库默认值并将会话标记为已配置。未设置的版本边界变为 TLS1.2 ..= TLS1.3。
    /// 在握手开始前可以重复调用。
    pub fn configure_defaults(&mut self) -> Result<()> {
        self.ensure_configurable()?;
        self.config.apply_defaults();
        self.state = SessionState::Configured;
        debug!(
            target: "tls_session_driver::handshake",
            min = ?self.config.min_version(),
            max = ?self.config.max_version(),
            "session configured"
        );
        Ok(())
    }

    /// Sets the offered cipher suites from a list terminated by `0`.
    ///
    /// The list is copied; the caller's buffer is not referenced afterwards.
    ///
    /// 从以 `0` 结尾的列表设置提供的密码套件。列表会被复制，之后不再引用调用方的缓冲区。
    pub fn set_cipher_suites(&mut self, suites: &[u16]) -> Result<()> {
        self.ensure_configurable()?;
        self.config.cipher_suites = Some(CipherSuiteList::from_sentinel_terminated(suites)?);
        Ok(())
    }

    /// Sets the offered cipher suites from an already validated list.
    ///
    /// 使用已校验的列表设置提供的密码套件。
    pub fn set_cipher_suite_list(&mut self, suites: CipherSuiteList) -> Result<()> {
        self.ensure_configurable()?;
        self.config.cipher_suites = Some(suites);
        Ok(())
    }

    /// Sets the lowest protocol version the client accepts.
    ///
    /// 设置客户端接受的最低协议版本。
    pub fn set_min_version(&mut self, version: ProtocolVersion) -> Result<()> {
        self.ensure_configurable()?;
        self.config.min_version = Some(version);
        Ok(())
    }

    /// Sets the highest protocol version the client offers.
    ///
    /// 设置客户端提供的最高协议版本。
    pub fn set_max_version(&mut self, version: ProtocolVersion) -> Result<()> {
        self.ensure_configurable()?;
        self.config.max_version = Some(version);
        Ok(())
    }

    /// Installs the diagnostics sink and its verbosity threshold.
    ///
    /// 安装诊断接收器及其详细级别阈值。
    pub fn set_debug(&mut self, level: DebugLevel, sink: Option<Arc<dyn DiagnosticsSink>>) -> Result<()> {
        self.ensure_configurable()?;
        self.config.debug = DebugConfig::new(level, sink);
        Ok(())
    }

    /// Changes the verbosity threshold. Allowed at any point while the
    /// session is usable.
    ///
    /// 修改详细级别阈值。会话可用期间的任何时刻都可以调用。
    pub fn enable_debug(&mut self, level: DebugLevel) -> Result<()> {
        self.ensure_usable()?;
        self.config.debug.set_level(level);
        Ok(())
    }

    /// Binds a transport built from two sentinel-style callbacks.
    ///
    /// A non-negative return is a byte count, a negative one means
    /// "would block". Whatever context the callbacks need is captured by
    /// the closures themselves.
    ///
    /// 绑定由两个哨兵式回调构建的传输。非负返回值为字节数，负值表示“将阻塞”。
    pub fn register_callbacks<W, R>(&mut self, write: W, read: R) -> Result<()>
    where
        W: FnMut(&[u8]) -> isize + Send + 'static,
        R: FnMut(&mut [u8]) -> isize + Send + 'static,
    {
        self.bind_transport(TransportAdapter::new(CallbackTransport::new(write, read)))
    }

    /// Binds any [`Transport`] implementation.
    ///
    /// 绑定任意 [`Transport`] 实现。
    pub fn bind<T: Transport + Send + 'static>(&mut self, transport: T) -> Result<()> {
        self.bind_transport(TransportAdapter::new(transport))
    }

    /// Binds a prepared adapter, keeping its would-block limit unless the
    /// settings set one.
    ///
    /// 绑定已准备好的适配器；除非设置中另有指定，否则保留其“将阻塞”上限。
    pub fn bind_transport(&mut self, adapter: TransportAdapter) -> Result<()> {
        self.ensure_configurable()?;
        self.transport = Some(adapter);
        Ok(())
    }

    /// Replaces the whole credential store.
    ///
    /// 替换整个凭据存储。
    pub fn bind_credentials(&mut self, store: CredentialStore) -> Result<()> {
        self.ensure_configurable()?;
        self.config.credentials = store;
        Ok(())
    }

    /// Parses and binds the client certificate chain and its private key.
    ///
    /// On failure the previously bound pair, if any, stays bound.
    ///
    /// 解析并绑定客户端证书链及其私钥。失败时保留之前绑定的证书和私钥（如果有）。
    pub fn configure_client_certificate(&mut self, cert: &[u8], key: &[u8]) -> Result<()> {
        self.ensure_configurable()?;
        self.config.credentials.parse_own_certificate_and_key(cert, key)?;
        Ok(())
    }

    /// Parses and binds the CA chain the server certificate is checked against.
    ///
    /// 解析并绑定用于校验服务器证书的 CA 证书链。
    pub fn configure_trusted_chain(&mut self, cert: &[u8]) -> Result<()> {
        self.ensure_configurable()?;
        self.config.credentials.parse_trusted_chain(cert)?;
        Ok(())
    }

    /// Returns the issuer Common Name of a certificate without binding it.
    ///
    /// Usable at any point while the session is usable; the certificate only
    /// lands in the scratch chain.
    ///
    /// 返回证书颁发者的通用名称而不绑定该证书。会话可用期间均可调用；证书只会进入临时链。
    pub fn inspect_issuer(&mut self, cert: &[u8]) -> Result<IssuerId> {
        self.ensure_usable()?;
        Ok(self.config.credentials.inspect_issuer(cert)?)
    }

    /// Applies file-based settings. Nothing changes unless all of them are
    /// valid.
    ///
    /// 应用来自文件的设置。只有全部有效时才会生效。
    pub fn apply_settings(&mut self, settings: &SessionSettings) -> Result<()> {
        self.ensure_configurable()?;
        settings.apply_to(&mut self.config)?;
        Ok(())
    }
}
