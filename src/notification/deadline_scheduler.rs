use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::DashSet;
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    deadline::{classify, days_left, format_message, should_send, DeadlineTier},
    notification_models::NewNotification,
    notifier::Notifier,
};
use crate::{error::Result, state::AppState};

/// An in-progress case with an assignee and at least one dated phase.
#[derive(Debug, Clone, FromRow)]
pub struct CaseDeadline {
    pub case_id: Uuid,
    pub case_name: String,
    pub user_id: Uuid,
    pub latest_end_date: DateTime<Utc>,
}

#[async_trait]
pub trait DeadlineSource: Send + Sync {
    async fn find_active_deadlines(&self) -> Result<Vec<CaseDeadline>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scanned: usize,
    pub sent: usize,
    pub skipped: usize,
    pub out_of_range: usize,
    pub failed: usize,
}

impl std::fmt::Display for ScanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} cases, {} sent, {} skipped, {} out of range, {} failed",
            self.scanned, self.sent, self.skipped, self.out_of_range, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseOutcome {
    Sent,
    Throttled,
    InFlight,
    MissingRecipient,
    OutOfRange,
}

pub struct DeadlineScanJob {
    source: Arc<dyn DeadlineSource>,
    notifier: Notifier,
    offset: FixedOffset,
    in_flight: DashSet<(Uuid, Uuid)>,
}

/// Releases a (case, user) claim when dropped.
struct Claim<'a> {
    in_flight: &'a DashSet<(Uuid, Uuid)>,
    key: (Uuid, Uuid),
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

impl DeadlineScanJob {
    pub fn new(source: Arc<dyn DeadlineSource>, notifier: Notifier, offset: FixedOffset) -> Self {
        Self {
            source,
            notifier,
            offset,
            in_flight: DashSet::new(),
        }
    }

    /// One pass over every active case. A failure on one case is logged and
    /// counted, the rest of the pass continues.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        info!("Starting deadline scan");

        let deadlines = self.source.find_active_deadlines().await?;
        let mut report = ScanReport {
            scanned: deadlines.len(),
            ..Default::default()
        };

        for deadline in &deadlines {
            match self.process(deadline, now).await {
                Ok(CaseOutcome::Sent) => report.sent += 1,
                Ok(CaseOutcome::OutOfRange) => report.out_of_range += 1,
                Ok(CaseOutcome::Throttled | CaseOutcome::InFlight | CaseOutcome::MissingRecipient) => {
                    report.skipped += 1
                }
                Err(e) => {
                    error!("Deadline check failed for case {}: {:?}", deadline.case_id, e);
                    report.failed += 1;
                }
            }
        }

        info!("Deadline scan done: {}", report);
        Ok(report)
    }

    async fn process(&self, deadline: &CaseDeadline, now: DateTime<Utc>) -> Result<CaseOutcome> {
        let days = days_left(deadline.latest_end_date, now);
        let tier = classify(days);
        if tier == DeadlineTier::None {
            return Ok(CaseOutcome::OutOfRange);
        }

        let Some(_claim) = self.claim(deadline.case_id, deadline.user_id) else {
            debug!("Case {} already being notified", deadline.case_id);
            return Ok(CaseOutcome::InFlight);
        };

        let last_sent_at = self
            .notifier
            .last_sent_at(deadline.case_id, deadline.user_id)
            .await?;
        if !should_send(tier, last_sent_at, now) {
            return Ok(CaseOutcome::Throttled);
        }

        let Some(message) = format_message(
            &deadline.case_name,
            days,
            deadline.latest_end_date,
            self.offset,
        ) else {
            return Ok(CaseOutcome::OutOfRange);
        };

        let sent = self
            .notifier
            .notify(NewNotification {
                user_id: deadline.user_id,
                case_id: Some(deadline.case_id),
                notification_type: message.notification_type,
                title: message.title,
                body: message.body,
            })
            .await?;

        match sent {
            Some(_) => {
                info!(
                    "Sent {:?} deadline notification for case {} ({} days left)",
                    tier, deadline.case_id, days
                );
                Ok(CaseOutcome::Sent)
            }
            None => Ok(CaseOutcome::MissingRecipient),
        }
    }

    fn claim(&self, case_id: Uuid, user_id: Uuid) -> Option<Claim<'_>> {
        let key = (case_id, user_id);
        if !self.in_flight.insert(key) {
            return None;
        }

        Some(Claim {
            in_flight: &self.in_flight,
            key,
        })
    }
}

pub async fn start_deadline_scheduler(state: AppState) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let deadline_job = state.deadline_job.clone();
    let job = Job::new_async(state.config.deadline_cron.as_str(), move |_uuid, _l| {
        let deadline_job = deadline_job.clone();

        Box::pin(async move {
            if let Err(e) = deadline_job.run(Utc::now()).await {
                error!("Error running deadline scan: {:?}", e);
            }
        })
    })?;
    scheduler.add(job).await?;

    // Hourly cleanup of expired refresh tokens
    let auth_service = state.auth_service.clone();
    let purge = Job::new_async("0 0 * * * *", move |_uuid, _l| {
        let auth_service = auth_service.clone();

        Box::pin(async move {
            match auth_service.purge_expired_tokens().await {
                Ok(removed) if removed > 0 => info!("Purged {} expired refresh tokens", removed),
                Ok(_) => {}
                Err(e) => error!("Error purging refresh tokens: {:?}", e),
            }
        })
    })?;
    scheduler.add(purge).await?;

    scheduler.start().await?;

    info!("Deadline scheduler started ({})", state.config.deadline_cron);
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        notification::{
            notifier::fakes::{InMemoryStore, InMemoryUsers, NoopPush},
            push::{PushError, PushMessage, PushOutcome, PushRecipient, PushSender},
        },
    };
    use chrono::{Duration, TimeZone};
    use tokio::sync::broadcast;

    struct FixedDeadlines(Vec<CaseDeadline>);

    #[async_trait]
    impl DeadlineSource for FixedDeadlines {
        async fn find_active_deadlines(&self) -> Result<Vec<CaseDeadline>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl DeadlineSource for BrokenSource {
        async fn find_active_deadlines(&self) -> Result<Vec<CaseDeadline>> {
            Err(AppError::InternalError)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap()
    }

    fn deadline(user_id: Uuid, days: i64) -> CaseDeadline {
        CaseDeadline {
            case_id: Uuid::new_v4(),
            case_name: format!("Case {}", days),
            user_id,
            latest_end_date: now() + Duration::days(days),
        }
    }

    fn job(
        deadlines: Vec<CaseDeadline>,
        known: Vec<Uuid>,
    ) -> (DeadlineScanJob, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        let (tx, _rx) = broadcast::channel(16);
        let notifier = Notifier::new(
            store.clone(),
            Arc::new(InMemoryUsers { known }),
            Arc::new(NoopPush),
            tx,
        );
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        (
            DeadlineScanJob::new(Arc::new(FixedDeadlines(deadlines)), notifier, offset),
            store,
        )
    }

    #[tokio::test]
    async fn test_no_active_cases() {
        let (job, store) = job(vec![], vec![]);
        let report = job.run(now()).await.unwrap();
        assert_eq!(report, ScanReport::default());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_second_run_is_throttled() {
        let user = Uuid::new_v4();
        let (job, store) = job(
            vec![deadline(user, -5), deadline(user, 2), deadline(user, 10), deadline(user, 45)],
            vec![user],
        );

        let first = job.run(now()).await.unwrap();
        assert_eq!(first.sent, 4);
        assert_eq!(store.count(), 4);

        let second = job.run(now()).await.unwrap();
        assert_eq!(second.sent, 0);
        assert_eq!(second.skipped, 4);
        assert_eq!(store.count(), 4);
    }

    #[tokio::test]
    async fn test_beyond_horizon_is_not_notified() {
        let user = Uuid::new_v4();
        let (job, store) = job(vec![deadline(user, 120)], vec![user]);

        let report = job.run(now()).await.unwrap();
        assert_eq!(report.out_of_range, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(store.count(), 0);
        assert_eq!(
            report.to_string(),
            "1 cases, 0 sent, 0 skipped, 1 out of range, 0 failed"
        );
    }

    #[tokio::test]
    async fn test_missing_assignee_is_skipped() {
        let (job, store) = job(vec![deadline(Uuid::new_v4(), 1)], vec![]);

        let report = job.run(now()).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_throttle_respects_prior_notification() {
        let user = Uuid::new_v4();
        let monthly = deadline(user, 45);
        let urgent = deadline(user, 2);
        let (job, store) = job(vec![monthly.clone(), urgent.clone()], vec![user]);

        store.seed(monthly.case_id, user, now() - Duration::days(10));
        store.seed(urgent.case_id, user, now() - Duration::hours(25));

        let report = job.run(now()).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.count(), 3);
    }

    #[tokio::test]
    async fn test_overdue_message_type() {
        let user = Uuid::new_v4();
        let (job, store) = job(vec![deadline(user, -5)], vec![user]);

        job.run(now()).await.unwrap();
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows[0].notification_type, "CASE_OVERDUE");
        assert!(rows[0].body.contains("5 ngày"));
    }

    #[tokio::test]
    async fn test_claimed_pair_is_skipped() {
        let user = Uuid::new_v4();
        let pending = deadline(user, 1);
        let (job, store) = job(vec![pending.clone()], vec![user]);

        let held = job.claim(pending.case_id, user);
        assert!(held.is_some());
        let report = job.run(now()).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(store.count(), 0);

        drop(held);
        let report = job.run(now()).await.unwrap();
        assert_eq!(report.sent, 1);
    }

    struct FailingPush(tokio::sync::mpsc::UnboundedSender<Uuid>);

    #[async_trait]
    impl PushSender for FailingPush {
        fn channel(&self) -> &'static str {
            "failing"
        }

        async fn send(
            &self,
            recipient: &PushRecipient,
            _: &PushMessage,
        ) -> std::result::Result<PushOutcome, PushError> {
            let _ = self.0.send(recipient.user_id);
            Err(PushError::Rejected("DeviceNotRegistered".to_string()))
        }
    }

    #[tokio::test]
    async fn test_push_failure_keeps_notification_and_continues() {
        let user = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::default());
        let (tx, _rx) = broadcast::channel(16);
        let (attempts_tx, mut attempts_rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = Notifier::new(
            store.clone(),
            Arc::new(InMemoryUsers { known: vec![user] }),
            Arc::new(FailingPush(attempts_tx)),
            tx,
        );
        let job = DeadlineScanJob::new(
            Arc::new(FixedDeadlines(vec![deadline(user, 1), deadline(user, 30)])),
            notifier,
            FixedOffset::east_opt(7 * 3600).unwrap(),
        );

        let report = job.run(now()).await.unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count(), 2);

        // Both deliveries were attempted and rejected
        assert_eq!(attempts_rx.recv().await, Some(user));
        assert_eq!(attempts_rx.recv().await, Some(user));
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_run() {
        let (tx, _rx) = broadcast::channel(1);
        let notifier = Notifier::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(InMemoryUsers::default()),
            Arc::new(NoopPush),
            tx,
        );
        let job = DeadlineScanJob::new(Arc::new(BrokenSource), notifier, FixedOffset::east_opt(0).unwrap());
        assert!(job.run(now()).await.is_err());
    }
}
