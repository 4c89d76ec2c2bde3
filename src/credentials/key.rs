//! Private key decoding.
//!
//! Keys arrive as opaque PEM or DER buffers. The key material itself is kept
//! as DER for the TLS backend; this module only identifies the encoding and
//! the key algorithm so a mismatch with the certificate can be caught before
//! anything is bound.
//!
//! 私钥解码。
//!
//! 密钥以不透明的 PEM 或 DER 缓冲区形式传入。密钥材料本身以 DER 形式保留给
//! TLS 后端；本模块只识别编码和密钥算法，以便在绑定之前发现与证书不匹配的情况。

use std::fmt;
use x509_parser::der_parser::{
    ber::{BerObject, Class, Tag},
    parse_der,
};
use zeroize::Zeroizing;

use crate::error::ParseError;

const OID_RSA: &str = "1.2.840.113549.1.1.1";
const OID_EC: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_ED448: &str = "1.3.101.113";

/// The algorithm family of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    Ec,
    Ed25519,
    Ed448,
    Other(String),
}

impl KeyType {
    pub fn from_algorithm_oid(oid: &str) -> Self {
        match oid {
            OID_RSA => KeyType::Rsa,
            OID_EC => KeyType::Ec,
            OID_ED25519 => KeyType::Ed25519,
            OID_ED448 => KeyType::Ed448,
            other => KeyType::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Rsa => f.write_str("RSA"),
            KeyType::Ec => f.write_str("EC"),
            KeyType::Ed25519 => f.write_str("Ed25519"),
            KeyType::Ed448 => f.write_str("Ed448"),
            KeyType::Other(oid) => write!(f, "OID {oid}"),
        }
    }
}

/// The container format the DER key material is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Pkcs8,
    /// PKCS#1 `RSAPrivateKey`.
    Pkcs1,
    /// SEC1 `ECPrivateKey`.
    Sec1,
}

/// The private key bound to the client certificate.
///
/// Key bytes are wiped from memory when the pair is dropped.
///
/// 与客户端证书绑定的私钥。密钥字节在释放时会从内存中清除。
pub struct KeyPair {
    der: Zeroizing<Vec<u8>>,
    key_type: KeyType,
    encoding: KeyEncoding,
    curve: Option<String>,
    public_key: Option<Vec<u8>>,
}

/// What the key structure reveals besides the secret itself.
struct KeyInfo {
    key_type: KeyType,
    encoding: KeyEncoding,
    curve: Option<String>,
    public_key: Option<Vec<u8>>,
}

impl KeyPair {
    /// Parses a private key from PEM or DER bytes.
    ///
    /// Encrypted keys are not supported.
    ///
    /// 从 PEM 或 DER 字节解析私钥。不支持加密私钥。
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::PrivateKey("empty input".into()));
        }
        if super::looks_like_pem(bytes) {
            let (der, hint) = read_pem_key(bytes)?;
            return Self::from_der(der, hint);
        }
        Self::from_der(Zeroizing::new(bytes.to_vec()), None)
    }

    fn from_der(der: Zeroizing<Vec<u8>>, hint: Option<KeyEncoding>) -> Result<Self, ParseError> {
        let info = identify(&der, hint)?;
        Ok(Self {
            der,
            key_type: info.key_type,
            encoding: info.encoding,
            curve: info.curve,
            public_key: info.public_key,
        })
    }

    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Dotted OID of the named curve, for EC keys that state it.
    ///
    /// EC 密钥声明的命名曲线的点分 OID。
    pub fn curve(&self) -> Option<&str> {
        self.curve.as_deref()
    }

    /// The public key carried alongside the secret, when the encoding has one.
    ///
    /// 当编码中包含公钥时，返回与私钥一起携带的公钥。
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// The raw DER key material, for the TLS backend.
    pub fn secret_der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_type", &self.key_type)
            .field("encoding", &self.encoding)
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

fn read_pem_key(bytes: &[u8]) -> Result<(Zeroizing<Vec<u8>>, Option<KeyEncoding>), ParseError> {
    let mut reader = bytes;
    loop {
        let item = rustls_pemfile::read_one(&mut reader)
            .map_err(|err| ParseError::Pem(err.to_string()))?;
        match item {
            Some(rustls_pemfile::Item::PKCS8Key(der)) => {
                return Ok((Zeroizing::new(der), Some(KeyEncoding::Pkcs8)));
            }
            Some(rustls_pemfile::Item::RSAKey(der)) => {
                return Ok((Zeroizing::new(der), Some(KeyEncoding::Pkcs1)));
            }
            Some(rustls_pemfile::Item::ECKey(der)) => {
                return Ok((Zeroizing::new(der), Some(KeyEncoding::Sec1)));
            }
            // Certificates or CRLs bundled alongside the key are skipped.
            Some(_) => continue,
            None => return Err(ParseError::PrivateKey("no private key in PEM input".into())),
        }
    }
}

/// Works out the encoding and algorithm of a DER private key.
fn identify(der: &[u8], hint: Option<KeyEncoding>) -> Result<KeyInfo, ParseError> {
    let (rest, object) = parse_der(der).map_err(|err| ParseError::PrivateKey(err.to_string()))?;
    if !rest.is_empty() {
        return Err(ParseError::PrivateKey(format!(
            "{} trailing bytes after key structure",
            rest.len()
        )));
    }
    let fields = object
        .as_sequence()
        .map_err(|_| ParseError::PrivateKey("key is not a DER sequence".into()))?;

    let detected = detect_encoding(fields)
        .ok_or_else(|| ParseError::PrivateKey("unrecognised private key structure".into()))?;
    if let Some(hint) = hint {
        if hint != detected {
            return Err(ParseError::PrivateKey(format!(
                "PEM label says {hint:?} but contents are {detected:?}"
            )));
        }
    }

    let info = match detected {
        KeyEncoding::Pkcs1 => KeyInfo {
            key_type: KeyType::Rsa,
            encoding: detected,
            curve: None,
            public_key: None,
        },
        KeyEncoding::Sec1 => {
            let (curve, public_key) = sec1_details(fields);
            KeyInfo {
                key_type: KeyType::Ec,
                encoding: detected,
                curve,
                public_key,
            }
        }
        KeyEncoding::Pkcs8 => pkcs8_details(fields)?,
    };
    Ok(info)
}

fn pkcs8_details(fields: &[BerObject<'_>]) -> Result<KeyInfo, ParseError> {
    let algorithm = fields[1]
        .as_sequence()
        .map_err(|_| ParseError::PrivateKey("missing PKCS#8 algorithm".into()))?;
    let oid = algorithm
        .first()
        .and_then(|oid| oid.as_oid().ok())
        .ok_or_else(|| ParseError::PrivateKey("missing PKCS#8 algorithm".into()))?;
    let key_type = KeyType::from_algorithm_oid(&oid.to_id_string());
    let mut curve = algorithm
        .get(1)
        .and_then(|params| params.as_oid().ok())
        .map(|oid| oid.to_id_string());

    // The private key OCTET STRING wraps an ECPrivateKey for EC keys.
    let mut public_key = None;
    if key_type == KeyType::Ec {
        let inner = fields[2]
            .as_slice()
            .ok()
            .and_then(|bytes| parse_der(bytes).ok())
            .map(|(_, inner)| inner);
        if let Some(inner) = inner.as_ref().and_then(|inner| inner.as_sequence().ok()) {
            let (inner_curve, inner_public) = sec1_details(inner);
            curve = curve.or(inner_curve);
            public_key = inner_public;
        }
    }
    // PKCS#8 v2 public key: `[1] IMPLICIT BIT STRING`, though some encoders
    // wrap a full BIT STRING instead.
    if public_key.is_none() {
        public_key = context_field(&fields[3..], 1).and_then(|field| {
            let content = field.as_slice().ok()?;
            if field.header.is_constructed() {
                let (_, inner) = parse_der(content).ok()?;
                Some(inner.as_bitstring().ok()?.data.to_vec())
            } else {
                // Byte 0 is the unused-bit count.
                content.get(1..).map(<[u8]>::to_vec)
            }
        });
    }

    Ok(KeyInfo {
        key_type,
        encoding: KeyEncoding::Pkcs8,
        curve,
        public_key,
    })
}

/// Reads the optional `[0]` curve and `[1]` public key of an ECPrivateKey.
fn sec1_details(fields: &[BerObject<'_>]) -> (Option<String>, Option<Vec<u8>>) {
    let explicit = |tag| {
        context_field(fields.get(2..).unwrap_or_default(), tag)
            .and_then(|field| field.as_slice().ok())
            .and_then(|content| parse_der(content).ok())
            .map(|(_, inner)| inner)
    };
    let curve = explicit(0).and_then(|inner| inner.as_oid().ok().map(|oid| oid.to_id_string()));
    let public_key = explicit(1).and_then(|inner| inner.as_bitstring().ok().map(|bits| bits.data.to_vec()));
    (curve, public_key)
}

fn context_field<'a, 'b>(fields: &'b [BerObject<'a>], tag: u32) -> Option<&'b BerObject<'a>> {
    fields
        .iter()
        .find(|field| field.class() == Class::ContextSpecific && field.header.tag() == Tag(tag))
}

fn detect_encoding(fields: &[BerObject<'_>]) -> Option<KeyEncoding> {
    let version = fields.first()?.as_u32().ok()?;
    let second = fields.get(1)?;
    // PKCS#8 v1/v2: version, AlgorithmIdentifier, OCTET STRING key.
    if version <= 1 && fields.len() >= 3 && second.as_sequence().is_ok() {
        return Some(KeyEncoding::Pkcs8);
    }
    // SEC1: version 1, OCTET STRING private key, optional [0] params, [1] public key.
    if version == 1 && second.header.tag() == Tag::OctetString {
        return Some(KeyEncoding::Sec1);
    }
    // PKCS#1: version then eight INTEGERs.
    if version <= 1 && fields.len() >= 9 && fields.iter().all(|f| f.header.tag() == Tag::Integer) {
        return Some(KeyEncoding::Pkcs1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_key_pem() -> String {
        rcgen::Certificate::from_params(rcgen::CertificateParams::new(vec!["key.test".into()]))
            .unwrap()
            .serialize_private_key_pem()
    }

    #[test]
    fn parses_pkcs8_pem_ec_key() {
        let key = KeyPair::parse(ec_key_pem().as_bytes()).unwrap();
        assert_eq!(key.key_type(), &KeyType::Ec);
        assert_eq!(key.encoding(), KeyEncoding::Pkcs8);
        assert!(!key.secret_der().is_empty());
    }

    #[test]
    fn parses_pkcs8_der_ed25519_key() {
        let mut params = rcgen::CertificateParams::new(vec!["ed.test".into()]);
        params.alg = &rcgen::PKCS_ED25519;
        let cert = rcgen::Certificate::from_params(params).unwrap();
        let key = KeyPair::parse(&cert.serialize_private_key_der()).unwrap();
        assert_eq!(key.key_type(), &KeyType::Ed25519);
    }

    #[test]
    fn reads_curve_and_public_key() {
        let mut params = rcgen::CertificateParams::new(vec!["p384.test".into()]);
        params.alg = &rcgen::PKCS_ECDSA_P384_SHA384;
        let cert = rcgen::Certificate::from_params(params).unwrap();
        let key = KeyPair::parse(cert.serialize_private_key_pem().as_bytes()).unwrap();
        assert_eq!(key.curve(), Some("1.3.132.0.34"));
        // Uncompressed P-384 point.
        let public = key.public_key().unwrap();
        assert_eq!(public.len(), 97);
        assert_eq!(public[0], 0x04);
        assert_eq!(public, cert.get_key_pair().public_key_raw());
    }

    #[test]
    fn reads_ed25519_public_key() {
        let mut params = rcgen::CertificateParams::new(vec!["ed.test".into()]);
        params.alg = &rcgen::PKCS_ED25519;
        let cert = rcgen::Certificate::from_params(params).unwrap();
        let key = KeyPair::parse(&cert.serialize_private_key_der()).unwrap();
        assert_eq!(key.curve(), None);
        assert_eq!(key.public_key(), Some(cert.get_key_pair().public_key_raw()));
    }

    #[test]
    fn rejects_truncated_key() {
        let mut params = rcgen::CertificateParams::new(vec!["cut.test".into()]);
        params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
        let der = rcgen::Certificate::from_params(params)
            .unwrap()
            .serialize_private_key_der();
        let err = KeyPair::parse(&der[..der.len() / 2]).unwrap_err();
        assert!(matches!(err, ParseError::PrivateKey(_)));
    }

    #[test]
    fn rejects_pem_without_key() {
        let err = KeyPair::parse(b"-----BEGIN NOTHING-----\n-----END NOTHING-----\n").unwrap_err();
        assert!(matches!(err, ParseError::PrivateKey(_) | ParseError::Pem(_)));
    }

    #[test]
    fn debug_output_hides_key_material() {
        let key = KeyPair::parse(ec_key_pem().as_bytes()).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("Ec"));
        assert!(!rendered.contains("der"));
    }
}
