//! Parsed X.509 certificates and ordered certificate chains.

use std::borrow::Cow;

use sha2::{Digest, Sha256};
use x509_parser::der_parser::{ber::Tag, Oid};
use x509_parser::parse_x509_certificate;

use super::key::KeyType;
use super::name::DistinguishedName;
use crate::error::ParseError;

/// One parsed certificate.
///
/// The DER encoding is retained so the TLS backend can hand it to the peer
/// or to its own verifier; everything else is decoded once at parse time.
///
/// 一个已解析的证书。保留原始 DER，以便 TLS 后端将其发送给对端或交给验证器；
/// 其余字段在解析时一次性解码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    der: Vec<u8>,
    serial: Vec<u8>,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    not_before: i64,
    not_after: i64,
    public_key_type: KeyType,
    public_key_der: Vec<u8>,
    public_key_curve: Option<String>,
    public_key_bits: Vec<u8>,
}

impl CertificateEntry {
    /// Decodes exactly one DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let (rest, entry) = parse_one(der, 0)?;
        if !rest.is_empty() {
            return Err(ParseError::Certificate {
                index: 0,
                reason: format!("{} trailing bytes after certificate", rest.len()),
            });
        }
        Ok(entry)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// Start of the validity period, in UNIX seconds.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity period, in UNIX seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    pub fn is_valid_at(&self, unix_seconds: i64) -> bool {
        self.not_before <= unix_seconds && unix_seconds <= self.not_after
    }

    pub fn public_key_type(&self) -> &KeyType {
        &self.public_key_type
    }

    /// DER `SubjectPublicKeyInfo`.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Dotted OID of the named curve for EC keys.
    ///
    /// EC 密钥所用命名曲线的点分 OID。
    pub fn public_key_curve(&self) -> Option<&str> {
        self.public_key_curve.as_deref()
    }

    /// The raw `subjectPublicKey` bits, e.g. the encoded EC point.
    pub fn public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }

    /// SHA-256 over the certificate DER.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.der).into()
    }

    /// Lower-case hex rendering of [`Self::fingerprint`], for logs.
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

fn parse_one(input: &[u8], index: usize) -> Result<(&[u8], CertificateEntry), ParseError> {
    let (rest, cert) = parse_x509_certificate(input).map_err(|err| ParseError::Certificate {
        index,
        reason: err.to_string(),
    })?;
    let consumed = input.len() - rest.len();
    let spki = cert.public_key();
    let entry = CertificateEntry {
        der: input[..consumed].to_vec(),
        serial: cert.raw_serial().to_vec(),
        subject: DistinguishedName::from_x509(cert.subject()),
        issuer: DistinguishedName::from_x509(cert.issuer()),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
        public_key_type: KeyType::from_algorithm_oid(&spki.algorithm.algorithm.to_id_string()),
        public_key_der: spki.raw.to_vec(),
        public_key_curve: spki
            .algorithm
            .parameters
            .as_ref()
            .filter(|params| params.header.tag() == Tag::Oid)
            .map(|params| Oid::new(Cow::Borrowed(params.data)).to_id_string()),
        public_key_bits: spki.subject_public_key.data.to_vec(),
    };
    Ok((rest, entry))
}

/// An ordered chain of certificates, leaf first.
///
/// 有序的证书链，叶证书在前。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    entries: Vec<CertificateEntry>,
}

impl CertificateChain {
    pub fn new(entries: Vec<CertificateEntry>) -> Self {
        Self { entries }
    }

    /// Parses one or more certificates.
    ///
    /// Accepts PEM containing any number of `CERTIFICATE` blocks, or one or
    /// more DER certificates laid back to back. Either every certificate
    /// parses or an error is returned; there is no partial result.
    ///
    /// 解析一个或多个证书。接受包含任意数量 `CERTIFICATE` 块的 PEM，
    /// 或首尾相接的一个或多个 DER 证书。要么全部解析成功，要么返回错误，
    /// 不存在部分结果。
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::NoCertificate);
        }
        let entries = if super::looks_like_pem(bytes) {
            parse_pem(bytes)?
        } else {
            parse_concatenated_der(bytes)?
        };
        if entries.is_empty() {
            return Err(ParseError::NoCertificate);
        }
        Ok(Self { entries })
    }

    pub fn leaf(&self) -> Option<&CertificateEntry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[CertificateEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CertificateEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a CertificateEntry;
    type IntoIter = std::slice::Iter<'a, CertificateEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn parse_pem(bytes: &[u8]) -> Result<Vec<CertificateEntry>, ParseError> {
    let mut reader = bytes;
    let ders = rustls_pemfile::certs(&mut reader).map_err(|err| ParseError::Pem(err.to_string()))?;
    ders.iter()
        .enumerate()
        .map(|(index, der)| {
            let (rest, entry) = parse_one(der, index)?;
            if rest.is_empty() {
                Ok(entry)
            } else {
                Err(ParseError::Certificate {
                    index,
                    reason: "trailing bytes inside PEM block".into(),
                })
            }
        })
        .collect()
}

fn parse_concatenated_der(bytes: &[u8]) -> Result<Vec<CertificateEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut input = bytes;
    while !input.is_empty() {
        let (rest, entry) = parse_one(input, entries.len())?;
        entries.push(entry);
        input = rest;
    }
    Ok(entries)
}
