//! Defines the states of the client session state machine and the values
//! reported by each call that advances it.
//!
//! 定义客户端会话状态机的各个状态，以及推进状态机的每次调用所报告的结果。

use crate::error::HandshakeError;

/// Lifecycle state of a [`Session`](crate::handshake::client::Session).
///
/// Transitions only move forward:
/// `Uninitialized → Configured → Handshaking → Established`, with `Failed`
/// reachable from `Handshaking`, and `Closed` reachable from anywhere.
///
/// 会话的生命周期状态。状态只会向前转换。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Created, defaults not yet applied.
    ///
    /// 已创建，尚未应用默认配置。
    Uninitialized,

    /// Defaults applied; configuration may still change.
    ///
    /// 已应用默认配置；配置仍可修改。
    Configured,

    /// The handshake has started. `substep` counts the backend protocol
    /// substeps completed so far.
    ///
    /// 握手已开始。`substep` 记录后端已完成的协议子步骤数量。
    Handshaking { substep: u32 },

    /// The handshake completed; application data may flow.
    ///
    /// 握手完成；可以传输应用数据。
    Established,

    /// The handshake failed. Terminal.
    ///
    /// 握手失败。终结状态。
    Failed(HandshakeError),

    /// The session was torn down. Terminal.
    ///
    /// 会话已被拆除。终结状态。
    Closed,
}

impl SessionState {
    /// Whether the handshake has begun (or is over), locking the configuration.
    ///
    /// 握手是否已开始（或已结束），此时配置被锁定。
    pub fn is_started(&self) -> bool {
        !matches!(self, SessionState::Uninitialized | SessionState::Configured)
    }

    /// Whether the session can no longer be used at all.
    ///
    /// 会话是否已完全不可用。
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed(_) | SessionState::Closed)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Configured => "configured",
            SessionState::Handshaking { .. } => "handshaking",
            SessionState::Established => "established",
            SessionState::Failed(_) => "failed",
            SessionState::Closed => "closed",
        }
    }
}

/// Outcome of a single handshake step.
///
/// 单个握手步骤的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// More steps are needed, or the transport would block. Call again.
    ///
    /// 需要更多步骤，或传输将阻塞。请再次调用。
    InProgress,
    /// The handshake finished; negotiated parameters are available.
    ///
    /// 握手完成；可以获取协商参数。
    Complete,
    /// The handshake failed; the session is now terminal.
    ///
    /// 握手失败；会话现已处于终结状态。
    Failed(HandshakeError),
}

/// Outcome of a non-blocking application data transfer.
///
/// 非阻塞应用数据传输的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    Ready(T),
    /// The transport has no data or capacity right now; try again later.
    ///
    /// 传输当前没有数据或容量；请稍后重试。
    WouldBlock,
}

impl<T> Progress<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Progress::Ready(value) => Some(value),
            Progress::WouldBlock => None,
        }
    }
}
