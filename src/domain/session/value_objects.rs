//! Session Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::machine::UnknownName;

/// 场次代码字母表（去掉容易混淆的 0/O/1/I/L）
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// 生成的场次代码长度
const CODE_LENGTH: usize = 6;

/// 场次唯一标识 - 可口头分享的短代码
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// 生成新的场次代码
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let code = bytes
            .iter()
            .take(CODE_LENGTH)
            .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// 解析用户输入的场次代码（不区分大小写）
    pub fn parse(code: &str) -> Result<Self, &'static str> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() < 4 || code.len() > 12 {
            return Err("场次代码长度必须在 4 到 12 之间");
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("场次代码只能包含字母和数字");
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 场次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// 接受点歌
    Active,
    /// DJ 暂停
    Paused,
    /// 宽限期内，即将结束
    Ending,
    /// 已结束（终态）
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Ending => "ending",
            SessionStatus::Ended => "ended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended)
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "ending" => Ok(SessionStatus::Ending),
            "ended" => Ok(SessionStatus::Ended),
            _ => Err(UnknownName::new("session status", s)),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单曲估算时长（秒），用于等待时间估算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDuration(u32);

impl SongDuration {
    pub const DEFAULT_SECS: u32 = 270;

    pub fn new(seconds: u32) -> Result<Self, &'static str> {
        if seconds == 0 {
            return Err("单曲时长必须大于 0");
        }
        if seconds > 3600 {
            return Err("单曲时长不能超过 3600 秒");
        }
        Ok(Self(seconds))
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl Default for SongDuration {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

/// 打赏账号（三个均可选）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipHandles {
    pub venmo: Option<String>,
    pub cashapp: Option<String>,
    pub paypal: Option<String>,
}

impl TipHandles {
    /// 规范化输入：去除首尾空白，空串视为未设置
    pub fn new(
        venmo: Option<String>,
        cashapp: Option<String>,
        paypal: Option<String>,
    ) -> Result<Self, &'static str> {
        Ok(Self {
            venmo: normalize_handle(venmo)?,
            cashapp: normalize_handle(cashapp)?,
            paypal: normalize_handle(paypal)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.venmo.is_none() && self.cashapp.is_none() && self.paypal.is_none()
    }
}

fn normalize_handle(handle: Option<String>) -> Result<Option<String>, &'static str> {
    match handle.map(|h| h.trim().to_string()) {
        Some(h) if h.is_empty() => Ok(None),
        Some(h) if h.len() > 64 => Err("打赏账号长度不能超过64字符"),
        other => Ok(other),
    }
}
