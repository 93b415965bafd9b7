//! # 주간 트리거 계산
//!
//! 요약 패스는 고정 간격 타이머가 아니라 벽시계 경계(기본값: 매주 일요일 00:00)에 맞춰 돕니다.
//! "다음 경계가 언제인가"만 계산하는 순수 함수로 분리해 두었기 때문에
//! 실제로 시간이 흐르기를 기다리지 않고 테스트할 수 있습니다.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc, Weekday};

/// 경계를 어느 시간대의 자정으로 볼 것인가
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// 서버 프로세스의 로컬 시간대
    Local,
    Utc,
}

/// 매주 특정 요일 00:00에 발화하는 트리거
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTrigger {
    pub weekday: Weekday,
    pub anchor: Anchor,
}

impl WeeklyTrigger {
    pub fn sunday_midnight(anchor: Anchor) -> Self {
        Self {
            weekday: Weekday::Sun,
            anchor,
        }
    }

    /// `now`보다 엄격하게 뒤에 오는 다음 경계 시각
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.anchor {
            Anchor::Local => {
                next_weekly_boundary(&now.with_timezone(&Local), self.weekday).with_timezone(&Utc)
            }
            Anchor::Utc => next_weekly_boundary(&now, self.weekday),
        }
    }
}

/// `now` 이후 처음 오는 `weekday` 00:00 (해당 시간대 기준)
///
/// `now`가 정확히 경계 위에 있으면 일주일 뒤 경계를 돌려줍니다.
pub fn next_weekly_boundary<Tz: TimeZone>(now: &DateTime<Tz>, weekday: Weekday) -> DateTime<Tz> {
    let today = now.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    // 오늘이 목표 요일이어도 오늘 00:00은 이미 지났거나 지금이므로 7일 뒤로 갑니다.
    let days_ahead = match (target - today).rem_euclid(7) {
        0 => 7,
        n => n,
    };

    let midnight = (now.date_naive() + Duration::days(days_ahead))
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();

    resolve_local(&now.timezone(), midnight)
}

/// 로컬 자정이 서머타임 전환으로 존재하지 않을 수 있어서, 그 경우 한 시간씩 밀어서 찾습니다.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    for offset_hours in 0..3 {
        match tz.from_local_datetime(&(naive + Duration::hours(offset_hours))) {
            LocalResult::Single(time) => return time,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => continue,
        }
    }
    tz.from_utc_datetime(&naive)
}
