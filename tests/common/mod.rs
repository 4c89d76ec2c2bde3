//! Shared fixtures for the integration tests.
//!
//! `SimulatedBackend` speaks a tiny record protocol (`[type][len u16][body]`)
//! that mirrors the shape of a TLS client handshake, and `LoopbackServer` is
//! the in-memory server on the other end of it, bound to the session as its
//! transport.
//!
//! 集成测试共享的测试夹具。
//! `SimulatedBackend` 使用一个模仿 TLS 客户端握手结构的微型记录协议，
//! `LoopbackServer` 是其另一端的内存服务器，作为传输绑定到会话。
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa};
use tls_session_driver::diagnostics::{DebugLevel, DebugRecord, DiagnosticsSink};
use tls_session_driver::error::HandshakeError;
use tls_session_driver::handshake::{BackendStep, EngineContext, Negotiated, TlsBackend};
use tls_session_driver::protocol::state::Progress;
use tls_session_driver::protocol::suite::{CipherSuite, ProtocolVersion};
use tls_session_driver::credentials::CertificateEntry;
use tls_session_driver::tls_debug;
use tls_session_driver::transport::{Transport, TransportStatus};

pub const CLIENT_HELLO: u8 = 1;
pub const SERVER_HELLO: u8 = 2;
pub const CERTIFICATE: u8 = 11;
pub const FINISHED: u8 = 20;
pub const ALERT: u8 = 21;
pub const APPLICATION_DATA: u8 = 23;

pub const ALERT_CLOSE_NOTIFY: u8 = 0;
pub const ALERT_HANDSHAKE_FAILURE: u8 = 40;
pub const ALERT_BAD_CERTIFICATE: u8 = 42;
pub const ALERT_PROTOCOL_VERSION: u8 = 70;

const HEADER_LEN: usize = 3;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn encode_record(kind: u8, body: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(HEADER_LEN + body.len());
    record.push(kind);
    record.extend_from_slice(&(body.len() as u16).to_be_bytes());
    record.extend_from_slice(body);
    record
}

/// Splits the first complete record off `buf`, if there is one.
fn split_record(buf: &mut Vec<u8>) -> Option<(u8, Vec<u8>)> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
    if buf.len() < HEADER_LEN + len {
        return None;
    }
    let record: Vec<u8> = buf.drain(..HEADER_LEN + len).collect();
    Some((record[0], record[HEADER_LEN..].to_vec()))
}

fn alert_error(description: u8) -> HandshakeError {
    match description {
        ALERT_PROTOCOL_VERSION => HandshakeError::VersionMismatch,
        ALERT_HANDSHAKE_FAILURE => HandshakeError::CipherMismatch,
        ALERT_BAD_CERTIFICATE => HandshakeError::CertificateRejected("bad certificate alert".into()),
        other => HandshakeError::PeerAlert(other),
    }
}

// --- Client backend ---

/// Client half of the record protocol.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    stage: u8,
    server_hello: Option<(ProtocolVersion, CipherSuite)>,
    peer_chain: Vec<Vec<u8>>,
    pending: VecDeque<u8>,
    /// Overrides what the backend reports as negotiated, to exercise the
    /// session's own checks.
    pub report_version: Option<ProtocolVersion>,
}

impl SimulatedBackend {
    /// A backend that claims `version` was negotiated whatever the server said.
    pub fn reporting_version(version: ProtocolVersion) -> Self {
        Self {
            report_version: Some(version),
            ..Self::default()
        }
    }

    fn read_record(ctx: &mut EngineContext<'_>) -> Result<Option<(u8, Vec<u8>)>, HandshakeError> {
        let transport = ctx.transport();
        if !transport.fill(HEADER_LEN)? {
            return Ok(None);
        }
        let header = transport.buffered();
        let len = u16::from_be_bytes([header[1], header[2]]) as usize;
        if !transport.fill(HEADER_LEN + len)? {
            return Ok(None);
        }
        let record = transport.take(HEADER_LEN + len);
        Ok(Some((record[0], record[HEADER_LEN..].to_vec())))
    }

    fn check_trust(ctx: &EngineContext<'_>, chain: &[Vec<u8>]) -> Result<(), HandshakeError> {
        let Some(trusted) = ctx.credentials().trusted_chain() else {
            return Ok(());
        };
        let leaf = chain
            .first()
            .ok_or_else(|| HandshakeError::CertificateRejected("empty chain".into()))?;
        let leaf = CertificateEntry::from_der(leaf)
            .map_err(|err| HandshakeError::CertificateRejected(err.to_string()))?;
        let issuer = leaf.issuer().common_name().map(|cn| cn.value.clone());
        let known = trusted
            .iter()
            .any(|root| root.subject().common_name().map(|cn| cn.value.clone()) == issuer);
        if known {
            Ok(())
        } else {
            Err(HandshakeError::CertificateRejected("issuer not trusted".into()))
        }
    }
}

impl TlsBackend for SimulatedBackend {
    fn handshake_step(&mut self, ctx: &mut EngineContext<'_>) -> Result<BackendStep, HandshakeError> {
        match self.stage {
            0 => {
                let params = ctx.params();
                let mut body = vec![
                    params.min_version.minor(),
                    params.max_version.minor(),
                    params.cipher_suites.len() as u8,
                ];
                for suite in params.cipher_suites.as_slice() {
                    body.extend_from_slice(&suite.0.to_be_bytes());
                }
                body.push(ctx.credentials().own_identity().is_some() as u8);
                tls_debug!(ctx, DebugLevel::StateChange, "=> write client hello");
                ctx.transport().queue(&encode_record(CLIENT_HELLO, &body));
                self.stage = 1;
                Ok(BackendStep::Continue)
            }
            1 => {
                let Some((kind, body)) = Self::read_record(ctx)? else {
                    return Ok(BackendStep::WantRead);
                };
                match kind {
                    ALERT => Err(alert_error(body.first().copied().unwrap_or_default())),
                    SERVER_HELLO if body.len() == 3 => {
                        let version = ProtocolVersion::from_minor(body[0])
                            .ok_or(HandshakeError::UnexpectedMessage)?;
                        let suite = CipherSuite(u16::from_be_bytes([body[1], body[2]]));
                        tls_debug!(ctx, DebugLevel::Info, "server hello: {version} {suite}");
                        self.server_hello = Some((version, suite));
                        self.stage = 2;
                        Ok(BackendStep::Continue)
                    }
                    _ => Err(HandshakeError::UnexpectedMessage),
                }
            }
            2 => {
                let Some((kind, body)) = Self::read_record(ctx)? else {
                    return Ok(BackendStep::WantRead);
                };
                if kind != CERTIFICATE || body.is_empty() {
                    return Err(HandshakeError::UnexpectedMessage);
                }
                let count = body[0] as usize;
                let mut rest = &body[1..];
                let mut chain = Vec::with_capacity(count);
                for index in 0..count {
                    if rest.len() < 2 {
                        return Err(HandshakeError::UnexpectedMessage);
                    }
                    let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
                    let der = rest
                        .get(2..2 + len)
                        .ok_or(HandshakeError::UnexpectedMessage)?;
                    tls_debug!(ctx, DebugLevel::Verbose, "peer certificate {index}: {len} bytes");
                    chain.push(der.to_vec());
                    rest = &rest[2 + len..];
                }
                Self::check_trust(ctx, &chain)?;
                self.peer_chain = chain;
                self.stage = 3;
                Ok(BackendStep::Continue)
            }
            3 => {
                let (version, suite) = self.server_hello.ok_or(HandshakeError::UnexpectedMessage)?;
                ctx.transport().queue(&encode_record(FINISHED, &[]));
                tls_debug!(ctx, DebugLevel::StateChange, "=> write finished");
                self.stage = 4;
                Ok(BackendStep::Complete(Negotiated {
                    version: self.report_version.unwrap_or(version),
                    suite,
                    peer_chain: std::mem::take(&mut self.peer_chain),
                }))
            }
            _ => Err(HandshakeError::UnexpectedMessage),
        }
    }

    fn write_application(
        &mut self,
        ctx: &mut EngineContext<'_>,
        data: &[u8],
    ) -> Result<Progress<usize>, HandshakeError> {
        let n = data.len().min(u16::MAX as usize);
        ctx.transport().queue(&encode_record(APPLICATION_DATA, &data[..n]));
        Ok(Progress::Ready(n))
    }

    fn read_application(
        &mut self,
        ctx: &mut EngineContext<'_>,
        buf: &mut [u8],
    ) -> Result<Progress<usize>, HandshakeError> {
        if self.pending.is_empty() {
            let Some((kind, body)) = Self::read_record(ctx)? else {
                return Ok(Progress::WouldBlock);
            };
            match kind {
                APPLICATION_DATA => self.pending.extend(body),
                ALERT if body.first() == Some(&ALERT_CLOSE_NOTIFY) => return Ok(Progress::Ready(0)),
                ALERT => return Err(alert_error(body.first().copied().unwrap_or_default())),
                _ => return Err(HandshakeError::UnexpectedMessage),
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(Progress::Ready(n))
    }

    fn close_notify(&mut self, ctx: &mut EngineContext<'_>) -> Result<(), HandshakeError> {
        ctx.transport().queue(&encode_record(ALERT, &[ALERT_CLOSE_NOTIFY]));
        Ok(())
    }
}

// --- In-memory server ---

/// How the loopback transport simulates a congested socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    Never,
    /// Every other transport call would block.
    Alternate,
    Always,
}

#[derive(Debug)]
pub struct ServerState {
    pub versions: Vec<ProtocolVersion>,
    pub suites: Vec<CipherSuite>,
    pub chain: Vec<Vec<u8>>,
    pub chunk: usize,
    pub blocking: Blocking,
    pub hang_up_after_hello: bool,

    inbound: Vec<u8>,
    outbound: VecDeque<u8>,
    toggle: bool,
    hung_up: bool,

    pub client_hello: Option<ClientHelloSeen>,
    pub selected: Option<(ProtocolVersion, CipherSuite)>,
    pub finished: bool,
    pub close_notified: bool,
    pub received: Vec<u8>,
    pub read_calls: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloSeen {
    pub min: u8,
    pub max: u8,
    pub suites: Vec<CipherSuite>,
    pub has_client_certificate: bool,
}

impl ServerState {
    fn should_block(&mut self) -> bool {
        match self.blocking {
            Blocking::Never => false,
            Blocking::Always => true,
            Blocking::Alternate => {
                self.toggle = !self.toggle;
                self.toggle
            }
        }
    }

    fn send(&mut self, kind: u8, body: &[u8]) {
        self.outbound.extend(encode_record(kind, body));
    }

    fn process(&mut self) {
        while let Some((kind, body)) = split_record(&mut self.inbound) {
            match kind {
                CLIENT_HELLO => self.on_client_hello(&body),
                FINISHED => self.finished = true,
                APPLICATION_DATA => {
                    self.received.extend_from_slice(&body);
                    self.send(APPLICATION_DATA, &body);
                }
                ALERT => self.close_notified = body.first() == Some(&ALERT_CLOSE_NOTIFY),
                _ => self.send(ALERT, &[10]),
            }
        }
    }

    fn on_client_hello(&mut self, body: &[u8]) {
        let (min, max, count) = (body[0], body[1], body[2] as usize);
        let suites: Vec<CipherSuite> = body[3..3 + 2 * count]
            .chunks(2)
            .map(|pair| CipherSuite(u16::from_be_bytes([pair[0], pair[1]])))
            .collect();
        self.client_hello = Some(ClientHelloSeen {
            min,
            max,
            suites: suites.clone(),
            has_client_certificate: body[3 + 2 * count] == 1,
        });
        if self.hang_up_after_hello {
            self.hung_up = true;
            return;
        }

        let version = self
            .versions
            .iter()
            .copied()
            .filter(|v| (min..=max).contains(&v.minor()))
            .max();
        let Some(version) = version else {
            self.send(ALERT, &[ALERT_PROTOCOL_VERSION]);
            return;
        };
        let Some(suite) = suites.iter().copied().find(|s| self.suites.contains(s)) else {
            self.send(ALERT, &[ALERT_HANDSHAKE_FAILURE]);
            return;
        };
        self.selected = Some((version, suite));

        let mut hello = vec![version.minor()];
        hello.extend_from_slice(&suite.0.to_be_bytes());
        self.send(SERVER_HELLO, &hello);

        let mut certificate = vec![self.chain.len() as u8];
        for der in &self.chain {
            certificate.extend_from_slice(&(der.len() as u16).to_be_bytes());
            certificate.extend_from_slice(der);
        }
        self.send(CERTIFICATE, &certificate);
    }
}

/// Server end of an in-memory connection; clones share the same state.
#[derive(Debug, Clone)]
pub struct LoopbackServer {
    state: Arc<Mutex<ServerState>>,
}

impl LoopbackServer {
    pub fn new(chain: Vec<Vec<u8>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                versions: vec![ProtocolVersion::Tls1_2, ProtocolVersion::Tls1_3],
                suites: vec![
                    CipherSuite::TLS13_AES_128_GCM_SHA256,
                    CipherSuite::TLS13_AES_256_GCM_SHA384,
                    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                ],
                chain,
                chunk: usize::MAX,
                blocking: Blocking::Never,
                hang_up_after_hello: false,
                inbound: Vec::new(),
                outbound: VecDeque::new(),
                toggle: false,
                hung_up: false,
                client_hello: None,
                selected: None,
                finished: false,
                close_notified: false,
                received: Vec::new(),
                read_calls: 0,
            })),
        }
    }

    /// Runs `f` against the shared server state.
    pub fn with<T>(&self, f: impl FnOnce(&mut ServerState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn versions(self, versions: &[ProtocolVersion]) -> Self {
        self.with(|s| s.versions = versions.to_vec());
        self
    }

    pub fn suites(self, suites: &[u16]) -> Self {
        self.with(|s| s.suites = suites.iter().copied().map(CipherSuite).collect());
        self
    }

    /// Caps every read and write at `chunk` bytes.
    pub fn chunk(self, chunk: usize) -> Self {
        self.with(|s| s.chunk = chunk);
        self
    }

    pub fn blocking(self, blocking: Blocking) -> Self {
        self.with(|s| s.blocking = blocking);
        self
    }

    pub fn hang_up_after_hello(self) -> Self {
        self.with(|s| s.hang_up_after_hello = true);
        self
    }
}

impl Transport for LoopbackServer {
    fn write(&mut self, buf: &[u8]) -> TransportStatus {
        let mut state = self.state.lock().unwrap();
        if state.should_block() {
            return TransportStatus::WouldBlock;
        }
        let n = buf.len().min(state.chunk);
        state.inbound.extend_from_slice(&buf[..n]);
        state.process();
        TransportStatus::Ready(n)
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportStatus {
        let mut state = self.state.lock().unwrap();
        state.read_calls += 1;
        if state.should_block() {
            return TransportStatus::WouldBlock;
        }
        if state.outbound.is_empty() {
            return if state.hung_up {
                TransportStatus::Ready(0)
            } else {
                TransportStatus::WouldBlock
            };
        }
        let n = buf.len().min(state.chunk).min(state.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.outbound.drain(..n)) {
            *slot = byte;
        }
        TransportStatus::Ready(n)
    }
}

// --- Certificates ---

/// A CA with one server and one client certificate under it.
pub struct Pki {
    pub ca_der: Vec<u8>,
    pub ca_pem: String,
    pub server_der: Vec<u8>,
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

impl Pki {
    pub fn generate() -> Self {
        let mut ca_params = CertificateParams::new(Vec::new());
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let mut dn = rcgen::DistinguishedName::new();
        dn.push(DnType::CountryName, "US");
        dn.push(DnType::OrganizationName, "Driver Test");
        dn.push(DnType::CommonName, "Driver Test Root CA");
        ca_params.distinguished_name = dn;
        let ca = Certificate::from_params(ca_params).unwrap();

        let server =
            Certificate::from_params(CertificateParams::new(vec!["server.test".into()])).unwrap();
        let client =
            Certificate::from_params(CertificateParams::new(vec!["client.test".into()])).unwrap();

        Self {
            ca_der: ca.serialize_der().unwrap(),
            ca_pem: ca.serialize_pem().unwrap(),
            server_der: server.serialize_der_with_signer(&ca).unwrap(),
            client_cert_pem: client.serialize_pem_with_signer(&ca).unwrap(),
            client_key_pem: client.serialize_private_key_pem(),
        }
    }

    /// What the server sends: the leaf twice, as some libraries report it,
    /// then the CA.
    pub fn server_chain(&self) -> Vec<Vec<u8>> {
        vec![
            self.server_der.clone(),
            self.server_der.clone(),
            self.ca_der.clone(),
        ]
    }
}

// --- Diagnostics ---

/// Records every debug event it receives.
#[derive(Debug, Default)]
pub struct Collector {
    pub events: Mutex<Vec<(DebugLevel, String, u32, String)>>,
}

impl DiagnosticsSink for Collector {
    fn emit(&self, record: &DebugRecord<'_>) {
        self.events.lock().unwrap().push((
            record.level,
            record.file.to_owned(),
            record.line,
            record.message.to_string(),
        ));
    }
}
