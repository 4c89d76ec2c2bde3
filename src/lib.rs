//! A client-side TLS session driver.
//!
//! A [`Session`] runs the client handshake one step at a time on top of a
//! pluggable [`TlsBackend`], over whatever byte stream the caller binds as a
//! [`Transport`]. Certificates and keys are parsed and checked before they
//! are bound, configuration is frozen once the handshake starts, and every
//! failure comes back as a typed error instead of a numeric status.
//!
//! 客户端 TLS 会话驱动。
//!
//! [`Session`] 基于可插拔的 [`TlsBackend`]，在调用方绑定为 [`Transport`] 的任意字节流上
//! 逐步执行客户端握手。证书和密钥在绑定前会被解析和检查，握手开始后配置即被冻结，
//! 所有失败都以类型化错误而非数字状态返回。

pub mod config;
pub mod credentials;
pub mod diagnostics;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod transport;

pub use config::{SessionConfig, SessionSettings};
pub use credentials::{CertificateChain, CredentialStore, IssuerId};
pub use diagnostics::{DebugLevel, DiagnosticsSink, TracingSink};
pub use error::{ConfigError, Error, HandshakeError, ParseError, Result};
pub use handshake::{BackendStep, EngineContext, Negotiated, PeerChain, Session, SessionBuilder, TlsBackend};
pub use protocol::state::{Progress, SessionState, StepResult};
pub use protocol::suite::{CipherSuite, CipherSuiteList, ProtocolVersion};
pub use transport::{CallbackTransport, StreamTransport, Transport, TransportAdapter, TransportStatus};
