//! Negotiable protocol parameters: cipher suite identifiers and protocol versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

/// A TLS cipher suite identifier, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    pub const TLS13_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0x1301);
    pub const TLS13_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0x1302);
    pub const TLS13_CHACHA20_POLY1305_SHA256: CipherSuite = CipherSuite(0x1303);
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0xC02B);
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: CipherSuite = CipherSuite(0xC02F);
    pub const TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0xC02C);
    pub const TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: CipherSuite = CipherSuite(0xC030);

    /// The value that terminates a caller-supplied suite list.
    pub const SENTINEL: u16 = 0;

    /// IANA name of well-known suites.
    pub fn name(&self) -> Option<&'static str> {
        Some(match self.0 {
            0x1301 => "TLS_AES_128_GCM_SHA256",
            0x1302 => "TLS_AES_256_GCM_SHA384",
            0x1303 => "TLS_CHACHA20_POLY1305_SHA256",
            0xC02B => "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
            0xC02F => "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            0xC02C => "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
            0xC030 => "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
            _ => return None,
        })
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:04x})", self.0),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// An ordered, immutable list of offered cipher suites.
///
/// The list is shared (`Arc`) so that it stays valid for the whole lifetime of
/// every session it was handed to, independently of the caller's own buffer.
///
/// 有序且不可变的密码套件列表。
///
/// 列表以 `Arc` 共享，因此在其所属会话的整个生命周期内都保持有效，
/// 与调用方自己的缓冲区无关。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSuiteList {
    suites: Arc<[CipherSuite]>,
}

impl CipherSuiteList {
    /// Builds a list from raw identifiers terminated by [`CipherSuite::SENTINEL`].
    ///
    /// Everything after the first sentinel is ignored. A list without a
    /// sentinel is taken whole.
    ///
    /// 从以 [`CipherSuite::SENTINEL`] 结尾的原始标识符构建列表。
    ///
    /// 第一个哨兵之后的内容会被忽略；没有哨兵的列表将被整体采用。
    pub fn from_sentinel_terminated(raw: &[u16]) -> Result<Self, ConfigError> {
        let end = raw
            .iter()
            .position(|&id| id == CipherSuite::SENTINEL)
            .unwrap_or(raw.len());
        Self::new(raw[..end].iter().copied().map(CipherSuite))
    }

    pub fn new<I: IntoIterator<Item = CipherSuite>>(suites: I) -> Result<Self, ConfigError> {
        let suites: Arc<[CipherSuite]> = suites.into_iter().collect();
        if suites.is_empty() {
            return Err(ConfigError::EmptyCipherSuiteList);
        }
        Ok(Self { suites })
    }

    /// The suites offered when the caller never chose any: the TLS1.3 AEAD
    /// suites followed by the TLS1.2 ECDHE-GCM suites.
    pub fn default_offer() -> Self {
        Self {
            suites: Arc::new([
                CipherSuite::TLS13_AES_128_GCM_SHA256,
                CipherSuite::TLS13_AES_256_GCM_SHA384,
                CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
                CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
                CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            ]),
        }
    }

    pub fn as_slice(&self) -> &[CipherSuite] {
        &self.suites
    }

    pub fn contains(&self, suite: CipherSuite) -> bool {
        self.suites.contains(&suite)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// The identifiers followed by the terminating sentinel, as a backend
    /// expecting the C-style layout consumes them.
    pub fn to_sentinel_terminated(&self) -> Vec<u16> {
        self.suites
            .iter()
            .map(|suite| suite.0)
            .chain(std::iter::once(CipherSuite::SENTINEL))
            .collect()
    }
}

/// TLS protocol versions a client may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "TLS1.0")]
    Tls1_0,
    #[serde(rename = "TLS1.1")]
    Tls1_1,
    #[serde(rename = "TLS1.2")]
    Tls1_2,
    #[serde(rename = "TLS1.3")]
    Tls1_3,
}

impl ProtocolVersion {
    /// Every TLS version shares major number 3.
    pub const MAJOR: u8 = 3;

    /// Minor version number (TLS1.0 = 1 .. TLS1.3 = 4).
    pub fn minor(self) -> u8 {
        match self {
            ProtocolVersion::Tls1_0 => 1,
            ProtocolVersion::Tls1_1 => 2,
            ProtocolVersion::Tls1_2 => 3,
            ProtocolVersion::Tls1_3 => 4,
        }
    }

    pub fn from_minor(minor: u8) -> Option<Self> {
        match minor {
            1 => Some(ProtocolVersion::Tls1_0),
            2 => Some(ProtocolVersion::Tls1_1),
            3 => Some(ProtocolVersion::Tls1_2),
            4 => Some(ProtocolVersion::Tls1_3),
            _ => None,
        }
    }

    /// Two-byte wire encoding, e.g. `0x0304` for TLS1.3.
    pub fn wire(self) -> u16 {
        u16::from_be_bytes([Self::MAJOR, self.minor()])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::Tls1_0 => "TLS1.0",
            ProtocolVersion::Tls1_1 => "TLS1.1",
            ProtocolVersion::Tls1_2 => "TLS1.2",
            ProtocolVersion::Tls1_3 => "TLS1.3",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
