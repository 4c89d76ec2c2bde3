//! Per-session configuration.
//!
//! A [`SessionConfig`] is owned by exactly one session and may only change
//! until that session's handshake starts. At that point it is frozen into a
//! [`HandshakeParams`] value that the backend reads for the rest of the
//! session.
//!
//! 单个会话的配置。
//!
//! [`SessionConfig`] 只属于一个会话，且只能在该会话握手开始之前修改。
//! 握手开始时配置会被固化为 [`HandshakeParams`]，后端在会话剩余时间内读取它。

use serde::Deserialize;

use crate::credentials::CredentialStore;
use crate::diagnostics::{DebugConfig, DebugLevel};
use crate::error::ConfigError;
use crate::protocol::suite::{CipherSuite, CipherSuiteList, ProtocolVersion};

/// Lowest version offered when the caller does not choose one.
/// 调用方未指定时提供的最低版本。
pub const DEFAULT_MIN_VERSION: ProtocolVersion = ProtocolVersion::Tls1_2;
/// Highest version offered when the caller does not choose one.
/// 调用方未指定时提供的最高版本。
pub const DEFAULT_MAX_VERSION: ProtocolVersion = ProtocolVersion::Tls1_3;

/// Mutable configuration of a session that has not started yet.
///
/// 尚未开始握手的会话的可变配置。
#[derive(Debug, Default)]
pub struct SessionConfig {
    pub(crate) cipher_suites: Option<CipherSuiteList>,
    pub(crate) min_version: Option<ProtocolVersion>,
    pub(crate) max_version: Option<ProtocolVersion>,
    pub(crate) debug: DebugConfig,
    pub(crate) credentials: CredentialStore,
    pub(crate) would_block_limit: Option<u32>,
}

impl SessionConfig {
    /// Fills every version bound the caller left unset.
    ///
    /// 填充调用方未设置的版本边界。
    pub fn apply_defaults(&mut self) {
        self.min_version.get_or_insert(DEFAULT_MIN_VERSION);
        self.max_version.get_or_insert(DEFAULT_MAX_VERSION);
    }

    /// The suites the caller chose; `None` means the default offer.
    ///
    /// 调用方选择的密码套件；`None` 表示使用默认列表。
    pub fn cipher_suites(&self) -> Option<&CipherSuiteList> {
        self.cipher_suites.as_ref()
    }

    pub fn min_version(&self) -> Option<ProtocolVersion> {
        self.min_version
    }

    pub fn max_version(&self) -> Option<ProtocolVersion> {
        self.max_version
    }

    pub fn debug(&self) -> &DebugConfig {
        &self.debug
    }

    /// 会话持有的凭据。
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Consecutive would-block results tolerated before the handshake times
    /// out. `None` waits forever.
    ///
    /// 握手超时前允许的连续“将阻塞”次数。`None` 表示无限等待。
    pub fn would_block_limit(&self) -> Option<u32> {
        self.would_block_limit
    }

    /// Freezes the configuration for a handshake.
    ///
    /// Fails when the minimum version is above the maximum.
    ///
    /// 为握手固化配置。最小版本高于最大版本时失败。
    pub fn handshake_params(&self) -> Result<HandshakeParams, ConfigError> {
        let min_version = self.min_version.unwrap_or(DEFAULT_MIN_VERSION);
        let max_version = self.max_version.unwrap_or(DEFAULT_MAX_VERSION);
        if min_version > max_version {
            return Err(ConfigError::InvalidVersionRange {
                min: min_version,
                max: max_version,
            });
        }
        Ok(HandshakeParams {
            cipher_suites: self
                .cipher_suites
                .clone()
                .unwrap_or_else(CipherSuiteList::default_offer),
            min_version,
            max_version,
        })
    }
}

/// The negotiation parameters a handshake runs with.
///
/// 握手所使用的协商参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeParams {
    pub cipher_suites: CipherSuiteList,
    pub min_version: ProtocolVersion,
    pub max_version: ProtocolVersion,
}

impl HandshakeParams {
    /// Whether `version` lies inside the configured bounds.
    ///
    /// `version` 是否位于配置的边界之内。
    pub fn allows_version(&self, version: ProtocolVersion) -> bool {
        self.min_version <= version && version <= self.max_version
    }

    /// Whether `suite` was offered.
    ///
    /// `suite` 是否在提供的列表中。
    pub fn allows_suite(&self, suite: CipherSuite) -> bool {
        self.cipher_suites.contains(suite)
    }
}

/// Session settings as they appear in a host's configuration file.
///
/// Every field is optional; absent fields leave the session's current value
/// alone.
///
/// ```json
/// {
///   "cipher_suites": [4865, 4866, 0],
///   "min_version": "TLS1.3",
///   "max_version": "TLS1.3",
///   "debug_level": 2,
///   "would_block_limit": 1000
/// }
/// ```
///
/// 主机配置文件中的会话设置。所有字段均为可选；缺失的字段不会改变会话的当前值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    /// Raw suite identifiers, optionally sentinel-terminated.
    pub cipher_suites: Option<Vec<u16>>,
    pub min_version: Option<ProtocolVersion>,
    pub max_version: Option<ProtocolVersion>,
    pub debug_level: Option<DebugLevel>,
    pub would_block_limit: Option<u32>,
}

impl SessionSettings {
    /// Applies the settings to `config`; nothing is changed if any of them is
    /// invalid.
    pub(crate) fn apply_to(&self, config: &mut SessionConfig) -> Result<(), ConfigError> {
        let suites = self
            .cipher_suites
            .as_deref()
            .map(CipherSuiteList::from_sentinel_terminated)
            .transpose()?;

        if let Some(suites) = suites {
            config.cipher_suites = Some(suites);
        }
        if let Some(min) = self.min_version {
            config.min_version = Some(min);
        }
        if let Some(max) = self.max_version {
            config.max_version = Some(max);
        }
        if let Some(level) = self.debug_level {
            config.debug.set_level(level);
        }
        if let Some(limit) = self.would_block_limit {
            config.would_block_limit = Some(limit);
        }
        Ok(())
    }
}
