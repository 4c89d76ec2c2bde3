//! Distinguished names as ordered attribute entries, searched by attribute tag.
//!
//! 以有序属性条目表示的可分辨名称，按属性标签进行查找。

use std::fmt;
use x509_parser::x509::X509Name;

/// The attribute types a distinguished name entry can carry.
///
/// Well-known types are named; anything else keeps its dotted OID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Country,
    StateOrProvince,
    Locality,
    Organization,
    OrganizationalUnit,
    CommonName,
    SerialNumber,
    Other(String),
}

impl AttributeType {
    pub fn from_oid(oid: &str) -> Self {
        match oid {
            "2.5.4.6" => AttributeType::Country,
            "2.5.4.8" => AttributeType::StateOrProvince,
            "2.5.4.7" => AttributeType::Locality,
            "2.5.4.10" => AttributeType::Organization,
            "2.5.4.11" => AttributeType::OrganizationalUnit,
            "2.5.4.3" => AttributeType::CommonName,
            "2.5.4.5" => AttributeType::SerialNumber,
            other => AttributeType::Other(other.to_owned()),
        }
    }

    pub fn oid(&self) -> &str {
        match self {
            AttributeType::Country => "2.5.4.6",
            AttributeType::StateOrProvince => "2.5.4.8",
            AttributeType::Locality => "2.5.4.7",
            AttributeType::Organization => "2.5.4.10",
            AttributeType::OrganizationalUnit => "2.5.4.11",
            AttributeType::CommonName => "2.5.4.3",
            AttributeType::SerialNumber => "2.5.4.5",
            AttributeType::Other(oid) => oid,
        }
    }

    fn short_name(&self) -> Option<&'static str> {
        Some(match self {
            AttributeType::Country => "C",
            AttributeType::StateOrProvince => "ST",
            AttributeType::Locality => "L",
            AttributeType::Organization => "O",
            AttributeType::OrganizationalUnit => "OU",
            AttributeType::CommonName => "CN",
            AttributeType::SerialNumber => "serialNumber",
            AttributeType::Other(_) => return None,
        })
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.short_name() {
            Some(name) => f.write_str(name),
            None => f.write_str(self.oid()),
        }
    }
}

/// One attribute of a distinguished name, with its raw encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnEntry {
    pub attribute: AttributeType,
    pub value: Vec<u8>,
}

/// An ordered sequence of distinguished-name entries, as they appear in the
/// certificate.
///
/// 按证书中出现顺序排列的可分辨名称条目序列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    entries: Vec<DnEntry>,
}

impl DistinguishedName {
    pub fn new(entries: Vec<DnEntry>) -> Self {
        Self { entries }
    }

    pub(crate) fn from_x509(name: &X509Name<'_>) -> Self {
        let entries = name
            .iter_attributes()
            .map(|attr| DnEntry {
                attribute: AttributeType::from_oid(&attr.attr_type().to_id_string()),
                value: attr.as_slice().to_vec(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[DnEntry] {
        &self.entries
    }

    /// Finds the first entry of the given attribute type, wherever it sits in
    /// the sequence.
    ///
    /// 查找给定属性类型的第一个条目，无论其在序列中的位置。
    pub fn find(&self, attribute: &AttributeType) -> Option<&DnEntry> {
        self.entries.iter().find(|entry| &entry.attribute == attribute)
    }

    pub fn common_name(&self) -> Option<&DnEntry> {
        self.find(&AttributeType::CommonName)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", entry.attribute, String::from_utf8_lossy(&entry.value))?;
        }
        Ok(())
    }
}

/// Width of an issuer identifier in bytes.
pub const ISSUER_ID_LEN: usize = 20;

/// A fixed-width identifier taken from an issuer's Common Name.
///
/// Values longer than [`ISSUER_ID_LEN`] are truncated; shorter values are
/// zero-padded in the fixed form but [`IssuerId::value`] returns only the
/// bytes that were present.
///
/// 取自颁发者通用名称的定长标识符。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssuerId {
    bytes: [u8; ISSUER_ID_LEN],
    len: usize,
}

impl IssuerId {
    pub fn from_value(value: &[u8]) -> Self {
        let len = value.len().min(ISSUER_ID_LEN);
        let mut bytes = [0u8; ISSUER_ID_LEN];
        bytes[..len].copy_from_slice(&value[..len]);
        Self { bytes, len }
    }

    pub fn value(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn to_fixed(&self) -> [u8; ISSUER_ID_LEN] {
        self.bytes
    }
}

impl fmt::Debug for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerId({:?})", String::from_utf8_lossy(self.value()))
    }
}
