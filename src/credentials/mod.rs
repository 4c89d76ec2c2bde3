//! Certificate and private key material owned by a session.
//!
//! The store keeps three independent chains: the client's own identity, the
//! trusted CA set, and a scratch chain used only for inspecting certificates.
//! Every parse operation builds its result on the side and swaps it in only
//! when everything succeeded, so a failed call never leaves a half-updated
//! store behind.
//!
//! 会话所拥有的证书和私钥材料。
//!
//! 存储中维护三条相互独立的证书链：客户端自身身份、受信任的 CA 集合，
//! 以及仅用于检查证书的临时链。每次解析都会先在旁边构建结果，
//! 只有全部成功才替换进来，因此失败的调用不会留下半更新的存储。

mod certificate;
mod key;
mod name;

pub use certificate::{CertificateChain, CertificateEntry};
pub use key::{KeyEncoding, KeyPair, KeyType};
pub use name::{AttributeType, DistinguishedName, DnEntry, ISSUER_ID_LEN, IssuerId};

use tracing::debug;

use crate::error::ParseError;

/// The client certificate chain together with its private key.
#[derive(Debug)]
pub struct OwnIdentity {
    chain: CertificateChain,
    key: KeyPair,
}

impl OwnIdentity {
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }
}

/// Holds the parsed chains and the private key for one session.
///
/// 保存单个会话已解析的证书链和私钥。
#[derive(Debug, Default)]
pub struct CredentialStore {
    own: Option<OwnIdentity>,
    trusted: Option<CertificateChain>,
    scratch: CertificateChain,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the client certificate chain and its private key, binding them
    /// as a pair.
    ///
    /// Both inputs must parse and the key must belong to the leaf
    /// certificate: same algorithm, same curve, and the same public key when
    /// the key encoding carries one. On any failure the previously bound
    /// identity, if any, stays in place.
    ///
    /// 解析客户端证书链及其私钥，并将二者作为一对绑定。
    ///
    /// 两个输入都必须解析成功，且私钥必须属于叶证书：算法和曲线一致，
    /// 若私钥编码携带公钥则公钥也须一致。
    /// 任何失败都会保留之前绑定的身份（如果有）。
    pub fn parse_own_certificate_and_key(
        &mut self,
        cert_bytes: &[u8],
        key_bytes: &[u8],
    ) -> Result<(), ParseError> {
        let chain = CertificateChain::parse(cert_bytes)?;
        let key = KeyPair::parse(key_bytes)?;

        let leaf = chain.leaf().ok_or(ParseError::NoCertificate)?;
        if leaf.public_key_type() != key.key_type() {
            return Err(ParseError::KeyMismatch {
                certificate: leaf.public_key_type().clone(),
                key: key.key_type().clone(),
            });
        }
        if let (Some(certificate), Some(key)) = (leaf.public_key_curve(), key.curve()) {
            if certificate != key {
                return Err(ParseError::CurveMismatch {
                    certificate: certificate.to_owned(),
                    key: key.to_owned(),
                });
            }
        }
        if key.public_key().is_some_and(|public| public != leaf.public_key_bits()) {
            return Err(ParseError::PublicKeyMismatch);
        }

        debug!(
            target: "tls_session_driver::credentials",
            subject = %leaf.subject(),
            fingerprint = %leaf.fingerprint_hex(),
            chain_len = chain.len(),
            "bound client identity"
        );
        self.own = Some(OwnIdentity { chain, key });
        Ok(())
    }

    /// Parses the trusted CA chain and binds it.
    ///
    /// 解析受信任的 CA 证书链并绑定。
    pub fn parse_trusted_chain(&mut self, cert_bytes: &[u8]) -> Result<(), ParseError> {
        let chain = CertificateChain::parse(cert_bytes)?;
        debug!(
            target: "tls_session_driver::credentials",
            roots = chain.len(),
            "bound trusted chain"
        );
        self.trusted = Some(chain);
        Ok(())
    }

    /// Parses a certificate into the scratch chain and returns the Common
    /// Name of its issuer as a fixed-width identifier.
    ///
    /// The Common Name is located by its attribute type, so the order of the
    /// issuer's DN attributes does not matter.
    ///
    /// 将证书解析到临时链中，并以定长标识符形式返回其颁发者的通用名称。
    ///
    /// 通用名称按属性类型查找，因此颁发者 DN 属性的顺序无关紧要。
    pub fn inspect_issuer(&mut self, cert_bytes: &[u8]) -> Result<IssuerId, ParseError> {
        let chain = CertificateChain::parse(cert_bytes)?;
        self.scratch = chain;

        let leaf = self.scratch.leaf().ok_or(ParseError::NoCertificate)?;
        let common_name = leaf
            .issuer()
            .common_name()
            .ok_or(ParseError::AttributeNotFound(AttributeType::CommonName))?;
        Ok(IssuerId::from_value(&common_name.value))
    }

    pub fn own_identity(&self) -> Option<&OwnIdentity> {
        self.own.as_ref()
    }

    pub fn trusted_chain(&self) -> Option<&CertificateChain> {
        self.trusted.as_ref()
    }

    pub fn scratch_chain(&self) -> &CertificateChain {
        &self.scratch
    }

    pub fn clear_scratch(&mut self) {
        self.scratch.clear();
    }

    /// Releases every chain and the private key.
    pub fn clear(&mut self) {
        self.own = None;
        self.trusted = None;
        self.scratch.clear();
    }
}

pub(crate) fn looks_like_pem(bytes: &[u8]) -> bool {
    const MARKER: &[u8] = b"-----BEGIN";
    bytes.windows(MARKER.len()).any(|window| window == MARKER)
}
