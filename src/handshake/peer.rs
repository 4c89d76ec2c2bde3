//! The certificate chain received from the server.

use std::collections::VecDeque;

use crate::credentials::CertificateEntry;
use crate::error::{ConfigError, ParseError};

/// Peer certificates in the order the server sent them.
///
/// Some TLS libraries insert a duplicate of the leaf in front of the chain;
/// [`PeerChain::advance`] drops that first entry, once.
///
/// 服务器发送的对端证书，保持发送顺序。
///
/// 部分 TLS 库会在链首插入叶证书的副本；[`PeerChain::advance`] 会丢弃该首项，且只能执行一次。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerChain {
    certs: VecDeque<CertificateEntry>,
    advanced: bool,
}

impl PeerChain {
    /// Parses every certificate; one malformed entry rejects the whole chain.
    pub fn from_der_list<T: AsRef<[u8]>>(ders: &[T]) -> Result<Self, ParseError> {
        let certs = ders
            .iter()
            .map(|der| CertificateEntry::from_der(der.as_ref()))
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(Self {
            certs,
            advanced: false,
        })
    }

    pub fn head(&self) -> Option<&CertificateEntry> {
        self.certs.front()
    }

    pub fn get(&self, index: usize) -> Option<&CertificateEntry> {
        self.certs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CertificateEntry> {
        self.certs.iter()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    /// Drops the first certificate so the chain starts at its successor.
    ///
    /// Allowed once. A chain with fewer than two entries is left as is.
    ///
    /// 丢弃第一个证书，使链从其后继开始。只允许执行一次；少于两项的链保持不变。
    pub fn advance(&mut self) -> Result<(), ConfigError> {
        if self.advanced {
            return Err(ConfigError::PeerChainAlreadyAdvanced);
        }
        if self.certs.len() < 2 {
            return Err(ConfigError::PeerChainTooShort);
        }
        self.certs.pop_front();
        self.advanced = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.certs.clear();
    }
}
