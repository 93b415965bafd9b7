//! # 주간 요약 모델
//!
//! 집계 쿼리 결과와 집계 구간(window)을 표현합니다.

use chrono::{DateTime, Duration, Utc};

/// (user_id, project, language) 그룹 하나의 합계
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UsageGroup {
    pub user_id: String,
    pub project: String,
    pub language: String,
    /// 그룹에 속한 하트비트 duration의 합 (초)
    pub total_duration: f64,
}

impl UsageGroup {
    pub fn hours(&self) -> f64 {
        self.total_duration / 3600.0
    }
}

/// 반열린 구간 `[start, end)` (epoch 초)
///
/// `start`와 정확히 같은 타임스탬프는 포함되고, `end`와 같으면 제외됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryWindow {
    pub start: i64,
    pub end: i64,
}

impl SummaryWindow {
    /// `[now - period, now)` 구간을 만듭니다.
    ///
    /// 하트비트 타임스탬프는 정수 초이므로 양 끝을 올림합니다.
    /// `now`에 소수 초가 있으면 그 초 자체는 `now`보다 앞이므로 포함됩니다.
    pub fn trailing(now: DateTime<Utc>, period: Duration) -> Self {
        Self {
            start: ceil_seconds(now - period),
            end: ceil_seconds(now),
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

fn ceil_seconds(at: DateTime<Utc>) -> i64 {
    at.timestamp() + i64::from(at.timestamp_subsec_nanos() > 0)
}
