//! Song Context - Value Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::machine::UnknownName;

/// 点歌请求唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongId(Uuid);

impl SongId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SongId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 点歌状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    /// 排队中
    Waiting,
    /// 歌手主动延后
    Delayed,
    /// 正在演唱
    Playing,
    /// 已唱完（终态）
    Done,
    /// 已跳过（终态）
    Skipped,
}

impl SongStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Waiting => "waiting",
            SongStatus::Delayed => "delayed",
            SongStatus::Playing => "playing",
            SongStatus::Done => "done",
            SongStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SongStatus::Done | SongStatus::Skipped)
    }
}

impl std::str::FromStr for SongStatus {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(SongStatus::Waiting),
            "delayed" => Ok(SongStatus::Delayed),
            "playing" => Ok(SongStatus::Playing),
            "done" => Ok(SongStatus::Done),
            "skipped" => Ok(SongStatus::Skipped),
            _ => Err(UnknownName::new("song status", s)),
        }
    }
}

impl Default for SongStatus {
    fn default() -> Self {
        SongStatus::Waiting
    }
}

impl std::fmt::Display for SongStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 延后分钟数 (1 - 30)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayMinutes(u8);

impl DelayMinutes {
    pub const MAX: u32 = 30;
    pub const DEFAULT: u32 = 5;

    pub fn new(minutes: u32) -> Result<Self, &'static str> {
        if !(1..=Self::MAX).contains(&minutes) {
            return Err("延后时间必须在 1 到 30 分钟之间");
        }
        Ok(Self(minutes as u8))
    }

    pub fn minutes(&self) -> u32 {
        self.0 as u32
    }

    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.0 as i64)
    }
}

impl Default for DelayMinutes {
    fn default() -> Self {
        Self(Self::DEFAULT as u8)
    }
}

/// 生效中的延后窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    pub until: DateTime<Utc>,
    pub minutes: DelayMinutes,
}

impl DelayWindow {
    pub fn starting_at(now: DateTime<Utc>, minutes: DelayMinutes) -> Self {
        Self {
            until: now + minutes.as_duration(),
            minutes,
        }
    }

    /// 距到期的剩余时间，已过期时为 0
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.until - now).to_std().unwrap_or_default()
    }
}

/// 歌曲详情（歌手可在排队期间修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDetails {
    singer_name: String,
    artist: String,
    title: String,
}

impl SongDetails {
    pub fn new(
        singer_name: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, &'static str> {
        Ok(Self {
            singer_name: normalize_field(singer_name.into(), "歌手名不能为空", "歌手名长度不能超过100字符")?,
            artist: normalize_field(artist.into(), "原唱不能为空", "原唱长度不能超过100字符")?,
            title: normalize_field(title.into(), "歌名不能为空", "歌名长度不能超过100字符")?,
        })
    }

    pub fn singer_name(&self) -> &str {
        &self.singer_name
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

fn normalize_field(
    value: String,
    empty_err: &'static str,
    long_err: &'static str,
) -> Result<String, &'static str> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(empty_err);
    }
    if value.chars().count() > 100 {
        return Err(long_err);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_minutes_bounds() {
        assert!(DelayMinutes::new(0).is_err());
        assert!(DelayMinutes::new(31).is_err());
        assert_eq!(DelayMinutes::new(30).unwrap().minutes(), 30);
    }

    #[test]
    fn test_delay_window_remaining_is_clamped() {
        let now = Utc::now();
        let window = DelayWindow::starting_at(now, DelayMinutes::new(5).unwrap());
        assert_eq!(window.remaining(now).as_secs(), 300);
        let later = now + chrono::Duration::minutes(10);
        assert_eq!(window.remaining(later), std::time::Duration::ZERO);
    }

    #[test]
    fn test_song_details_trimmed() {
        let details = SongDetails::new(" Ana ", "Queen", "Bohemian Rhapsody").unwrap();
        assert_eq!(details.singer_name(), "Ana");
        assert!(SongDetails::new("  ", "Queen", "x").is_err());
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            SongStatus::Waiting,
            SongStatus::Delayed,
            SongStatus::Playing,
            SongStatus::Done,
            SongStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<SongStatus>(), Ok(status));
        }
        let err = "finished".parse::<SongStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown song status: finished");
        assert!(SongStatus::Done.is_terminal());
        assert!(!SongStatus::Delayed.is_terminal());
    }
}
