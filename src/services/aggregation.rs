//! # 주간 요약 집계
//!
//! 서버 프로세스 안에서 하나의 백그라운드 태스크로 영원히 돕니다.
//!
//! ## 한 번의 패스
//! 1. 깨어난 시각 `now`를 기준으로 `[now - 7일, now)` 구간의 하트비트를 집계
//! 2. (user_id, project, language)별 합계를 사용자 단위로 묶음
//! 3. 사용자 이메일이 없거나 비어 있으면 조용히 건너뜀
//! 4. 사용자마다 메일 한 통. 한 사용자의 전송 실패는 로그만 남기고 다음 사용자로 진행
//!
//! 집계 쿼리 자체가 실패하면 패스 전체를 포기하고 다음 주기를 기다립니다.
//! 패스가 끝나면 패스를 *시작한* 시각을 기준으로 다음 경계를 다시 계산합니다.
//!
//! 집계는 읽기만 하므로 수집 핸들러와 상호 배제가 필요 없습니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use super::{Email, Mailer, WeeklyTrigger};
use crate::{
    clock::Clock,
    db,
    error::AppError,
    models::{SummaryWindow, UsageGroup},
};

pub const SUMMARY_SUBJECT: &str = "Eztracker Weekly Summary";

/// 패스 한 번의 결과. 로그와 테스트에서 사용합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// 집계 쿼리가 돌려준 그룹 수
    pub groups: usize,
    /// 메일을 보낸 사용자 수
    pub mailed: usize,
    /// 이메일이 없어서 건너뛴 사용자 수
    pub skipped: usize,
    /// 이메일 조회나 전송에 실패한 사용자 수
    pub failed: usize,
}

pub struct Aggregator {
    pool: SqlitePool,
    mailer: Arc<dyn Mailer>,
    period: Duration,
}

impl Aggregator {
    pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            mailer,
            period: Duration::days(7),
        }
    }

    /// `now`로 끝나는 구간 하나를 집계하고 메일을 보냅니다.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassReport, AppError> {
        let window = SummaryWindow::trailing(now, self.period);
        let groups = db::summarize_window(&self.pool, window).await?;

        let mut report = PassReport {
            groups: groups.len(),
            ..PassReport::default()
        };

        for (user_id, lines) in group_by_user(groups) {
            let email = match db::find_email(&self.pool, &user_id).await {
                Ok(Some(email)) => email,
                Ok(None) => {
                    tracing::debug!(user_id = %user_id, "Skipping summary for user without email");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, "Failed to look up email: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.mailer.send(compose_summary(&email, &lines)).await {
                Ok(()) => report.mailed += 1,
                Err(e) => {
                    tracing::error!(user_id = %user_id, to = %email, "Failed to send summary: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// 다음 경계까지 잠든 뒤 패스를 한 번 돌리고, 다음 계산의 기준 시각을 돌려줍니다.
    pub async fn tick(
        &self,
        trigger: &WeeklyTrigger,
        clock: &dyn Clock,
        basis: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let next = trigger.next_after(basis);
        tracing::info!(%next, "Next summary pass scheduled");
        clock.sleep_until(next).await;

        let started = clock.now();
        match self.run_pass(started).await {
            Ok(report) => tracing::info!(
                groups = report.groups,
                mailed = report.mailed,
                skipped = report.skipped,
                failed = report.failed,
                "Summary pass finished"
            ),
            Err(e) => tracing::error!("Summary pass aborted: {}", e),
        }

        // sleep이 경계보다 일찍 끝난 경우 같은 경계를 두 번 도는 일이 없게 합니다.
        started.max(next)
    }

    /// 프로세스가 끝날 때까지 주간 패스를 반복합니다.
    pub async fn run(self, trigger: WeeklyTrigger, clock: Arc<dyn Clock>) {
        let mut basis = clock.now();
        loop {
            basis = self.tick(&trigger, clock.as_ref(), basis).await;
        }
    }
}

/// 쿼리 결과를 사용자별로 묶습니다. 사용자 안의 순서는 쿼리가 돌려준 순서를 유지합니다.
fn group_by_user(groups: Vec<UsageGroup>) -> BTreeMap<String, Vec<UsageGroup>> {
    let mut by_user: BTreeMap<String, Vec<UsageGroup>> = BTreeMap::new();
    for group in groups {
        by_user.entry(group.user_id.clone()).or_default().push(group);
    }
    by_user
}

pub fn summary_line(group: &UsageGroup) -> String {
    format!(
        "Project: {}, Language: {}, Time: {:.2} hours",
        group.project,
        group.language,
        group.hours()
    )
}

pub fn compose_summary(to: &str, groups: &[UsageGroup]) -> Email {
    let lines: Vec<String> = groups.iter().map(summary_line).collect();
    Email {
        to: to.to_string(),
        subject: SUMMARY_SUBJECT.to_string(),
        body: format!("Your coding activity:\n{}\n", lines.join("\n")),
    }
}
