use crate::credentials::{AttributeType, KeyType};
use crate::protocol::suite::ProtocolVersion;
use std::io;
use thiserror::Error;

/// An error raised while parsing certificate or private key bytes.
///
/// Parse errors are recoverable: the credential store is left exactly as it
/// was before the failing call, so the caller may retry with corrected input.
///
/// 解析证书或私钥字节时产生的错误。
///
/// 解析错误是可恢复的：凭据存储保持调用前的状态，调用方可以使用修正后的输入重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input did not contain a single certificate.
    ///
    /// 输入中不包含任何证书。
    #[error("no certificate found in input")]
    NoCertificate,

    /// A certificate in the input could not be decoded.
    ///
    /// 输入中的某个证书无法解码。
    #[error("malformed certificate at position {index}: {reason}")]
    Certificate { index: usize, reason: String },

    /// The PEM armour around the input could not be read.
    ///
    /// 无法读取输入的 PEM 封装。
    #[error("PEM decoding failed: {0}")]
    Pem(String),

    /// The private key could not be decoded.
    ///
    /// 私钥无法解码。
    #[error("malformed private key: {0}")]
    PrivateKey(String),

    /// The private key does not belong to the certificate's key algorithm.
    ///
    /// 私钥与证书的密钥算法不匹配。
    #[error("private key type {key} does not match certificate key type {certificate}")]
    KeyMismatch { certificate: KeyType, key: KeyType },

    /// The private key is on a different elliptic curve than the certificate.
    ///
    /// 私钥所在的椭圆曲线与证书不同。
    #[error("private key curve {key} does not match certificate curve {certificate}")]
    CurveMismatch { certificate: String, key: String },

    /// The public key embedded in the private key differs from the
    /// certificate's public key.
    ///
    /// 私钥中内嵌的公钥与证书的公钥不同。
    #[error("private key does not belong to the certificate's public key")]
    PublicKeyMismatch,

    /// The requested distinguished-name attribute is not present.
    ///
    /// 所请求的可分辨名称属性不存在。
    #[error("attribute {0} not present in distinguished name")]
    AttributeNotFound(AttributeType),
}

impl ParseError {
    /// Numeric code of the underlying parser failure, for diagnostics.
    ///
    /// Values follow the mbedTLS X.509 / PK error space so that hosts which
    /// already map those codes keep working.
    ///
    /// 底层解析失败的数字代码，用于诊断。取值沿用 mbedTLS X.509 / PK 错误码空间。
    pub fn code(&self) -> i32 {
        match self {
            ParseError::NoCertificate => -0x2780,
            ParseError::Certificate { .. } => -0x2180,
            ParseError::Pem(_) => -0x1080,
            ParseError::PrivateKey(_) => -0x3D00,
            ParseError::KeyMismatch { .. } | ParseError::CurveMismatch { .. } => -0x3F00,
            ParseError::PublicKeyMismatch => -0x3E80,
            ParseError::AttributeNotFound(_) => -0x2380,
        }
    }
}

/// An error caused by calling the session API out of order.
///
/// These are programmer errors; they are reported immediately and retrying
/// the same call will not help.
///
/// 因 API 调用顺序错误而产生的错误。
///
/// 这些属于编程错误，会被立即报告，重试同一调用无济于事。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setter was called after the first `step`.
    ///
    /// 在第一次 `step` 之后调用了设置方法。
    #[error("configuration cannot change once the handshake has started")]
    SessionAlreadyStarted,

    /// The session failed or was closed.
    ///
    /// 会话已失败或已关闭。
    #[error("session is failed or torn down and can no longer be used")]
    InvalidSessionState,

    /// `configure_defaults` has not been called yet.
    ///
    /// 尚未调用 `configure_defaults`。
    #[error("session has not been configured; call configure_defaults first")]
    NotConfigured,

    /// 尚未绑定传输。
    #[error("no transport has been bound to the session")]
    TransportNotBound,

    /// The list held nothing before its `0` terminator.
    ///
    /// 列表在 `0` 结束符之前没有任何内容。
    #[error("cipher suite list is empty")]
    EmptyCipherSuiteList,

    /// 最低协议版本高于最高协议版本。
    #[error("minimum protocol version {min} is above maximum {max}")]
    InvalidVersionRange {
        min: ProtocolVersion,
        max: ProtocolVersion,
    },

    /// The peer chain link fix is one-shot.
    ///
    /// 对端证书链修正只能执行一次。
    #[error("peer certificate chain has already been advanced")]
    PeerChainAlreadyAdvanced,

    /// 对端证书链少于两个条目。
    #[error("peer certificate chain has fewer than two entries")]
    PeerChainTooShort,
}

/// A failure raised by the transport adapter.
///
/// 传输适配器产生的故障。
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the stream.
    ///
    /// 对端关闭了流。
    #[error("transport closed by peer")]
    Closed,

    /// The transport kept signalling would-block past the configured limit.
    ///
    /// 传输持续报告将阻塞，超过了配置的上限。
    #[error("transport would-block limit of {limit} retries exceeded")]
    TimedOut { limit: u32 },

    /// 传输 I/O 失败。
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A protocol-level handshake failure.
///
/// Handshake errors are terminal for the session: it moves to the `Failed`
/// state and a new session must be constructed to try again.
///
/// 协议层面的握手失败。
///
/// 握手错误对会话而言是终结性的：会话进入 `Failed` 状态，
/// 必须构造新的会话才能重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// 没有双方都可接受的协议版本。
    #[error("no mutually acceptable protocol version")]
    VersionMismatch,

    /// 没有双方都可接受的密码套件。
    #[error("no mutually acceptable cipher suite")]
    CipherMismatch,

    /// The server's certificate chain was refused.
    ///
    /// 服务器证书链被拒绝。
    #[error("peer certificate rejected: {0}")]
    CertificateRejected(String),

    /// 对端发送了致命告警。
    #[error("peer sent fatal alert {0}")]
    PeerAlert(u8),

    /// 收到了与当前状态不符或无效的消息。
    #[error("received an unexpected or invalid message for the current state")]
    UnexpectedMessage,

    /// The transport failed mid-handshake, including EOF and the
    /// would-block limit.
    ///
    /// 握手过程中传输失败，包括 EOF 和超过将阻塞上限。
    #[error("transport failure ({kind:?}): {message}")]
    Transport { kind: io::ErrorKind, message: String },

    /// 一个 TLS 后端特有的错误码。
    #[error("TLS backend reported error code {0}")]
    Backend(i32),
}

impl HandshakeError {
    /// Numeric code for diagnostics, in the mbedTLS SSL error space.
    ///
    /// 用于诊断的数字代码，取值位于 mbedTLS SSL 错误码空间。
    pub fn code(&self) -> i32 {
        match self {
            HandshakeError::VersionMismatch => -0x6E80,
            HandshakeError::CipherMismatch => -0x7380,
            HandshakeError::CertificateRejected(_) => -0x7A00,
            HandshakeError::PeerAlert(_) => -0x7780,
            HandshakeError::UnexpectedMessage => -0x7700,
            HandshakeError::Transport { kind, .. } => match kind {
                io::ErrorKind::TimedOut => -0x6800,
                io::ErrorKind::UnexpectedEof => -0x7280,
                _ => -0x004C,
            },
            HandshakeError::Backend(code) => *code,
        }
    }
}

impl From<TransportError> for HandshakeError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Closed => io::ErrorKind::UnexpectedEof,
            TransportError::TimedOut { .. } => io::ErrorKind::TimedOut,
            TransportError::Io(io) => io.kind(),
        };
        HandshakeError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

/// Any error the session API can return.
///
/// 会话 API 可能返回的任意错误。
#[derive(Debug, Error)]
pub enum Error {
    #[error("credential parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid session usage: {0}")]
    Config(#[from] ConfigError),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

pub type Result<T> = std::result::Result<T, Error>;
