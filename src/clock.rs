//! # 시계 추상화

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// 코얼레서와 요약 스케줄러가 쓰는 벽시계
///
/// 두 컴포넌트 모두 "지금 몇 시인가"와 "이 시각에 깨워 달라"만 필요하므로,
/// 테스트에서는 [`ManualClock`]으로 바꿔 끼워서 실제 시간을 기다리지 않습니다.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        // 남은 시간이 음수면 이미 지난 시각입니다.
        if let Ok(remaining) = (deadline - Utc::now()).to_std() {
            tokio::time::sleep(remaining).await;
        }
    }
}

/// 시키는 대로만 움직이는 시계. `sleep_until`은 곧바로 마감 시각으로 건너뜁니다.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn at_epoch(seconds: i64) -> Self {
        Self::new(Utc.timestamp_opt(seconds, 0).single().unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if deadline > *now {
            *now = deadline;
        }
    }
}

/// 소수점 이하까지 포함한 epoch 초 (클라이언트 쪽에서 쓰는 단위)
pub fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_jumps_to_deadline() {
        let clock = ManualClock::at_epoch(1_700_000_000);
        let deadline = clock.now() + Duration::hours(3);

        clock.sleep_until(deadline).await;
        assert_eq!(clock.now(), deadline);

        // 지난 시각까지 잠들면 시계는 그대로입니다.
        clock.sleep_until(deadline - Duration::hours(1)).await;
        assert_eq!(clock.now(), deadline);
    }

    #[test]
    fn epoch_seconds_keeps_fraction() {
        let time = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        assert_eq!(epoch_seconds(time), 1_700_000_000.25);
    }
}
