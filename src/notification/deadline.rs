//! Deadline urgency tiers and the per-tier resend cadence.
//!
//! Everything here is pure: the scan job feeds in the case deadline, the
//! current time and the time of the last notification for the same
//! (case, assignee) pair.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::notification_models::NotificationType;

/// Cases further out than this are not notified at all.
pub const NOTIFY_HORIZON_DAYS: i64 = 90;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadlineTier {
    None,
    Monthly,
    Weekly,
    Urgent,
    Overdue,
}

impl DeadlineTier {
    /// Minimum time between two notifications of this tier.
    pub fn throttle_window(&self) -> Option<Duration> {
        match self {
            DeadlineTier::Overdue | DeadlineTier::Urgent => Some(Duration::days(1)),
            DeadlineTier::Weekly => Some(Duration::days(7)),
            DeadlineTier::Monthly => Some(Duration::days(30)),
            DeadlineTier::None => None,
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        match self {
            DeadlineTier::Overdue => NotificationType::CaseOverdue,
            _ => NotificationType::CaseDeadlineSoon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineMessage {
    pub tier: DeadlineTier,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
}

/// Whole days until `deadline`, rounded up. Negative once overdue.
pub fn days_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    -((-millis).div_euclid(MILLIS_PER_DAY))
}

/// Day 0 ("due today") is grouped with the 1-3 day bucket.
pub fn classify(days_left: i64) -> DeadlineTier {
    match days_left {
        d if d < 0 => DeadlineTier::Overdue,
        0..=3 => DeadlineTier::Urgent,
        4..=21 => DeadlineTier::Weekly,
        22..=NOTIFY_HORIZON_DAYS => DeadlineTier::Monthly,
        _ => DeadlineTier::None,
    }
}

pub fn should_send(
    tier: DeadlineTier,
    last_sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let Some(window) = tier.throttle_window() else {
        return false;
    };

    match last_sent_at {
        None => true,
        Some(last) => now - last >= window,
    }
}

pub fn format_deadline_date(deadline: DateTime<Utc>, offset: FixedOffset) -> String {
    deadline.with_timezone(&offset).format("%d/%m/%Y").to_string()
}

/// Builds the title and body for a case notification, or `None` when the
/// deadline is beyond the notification horizon.
pub fn format_message(
    case_name: &str,
    days_left: i64,
    deadline: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<DeadlineMessage> {
    let tier = classify(days_left);
    let name = if case_name.trim().is_empty() {
        "Vụ án"
    } else {
        case_name.trim()
    };
    let date = format_deadline_date(deadline, offset);

    let (title, body) = match tier {
        DeadlineTier::Overdue => (
            "🚨 Vụ án đã quá hạn".to_string(),
            format!(
                "Vụ án \"{}\" đã quá hạn {} ngày (hạn: {}). Vui lòng xử lý ngay!",
                name,
                days_left.abs(),
                date
            ),
        ),
        DeadlineTier::Urgent if days_left == 0 => (
            "⏰ Vụ án hết hạn hôm nay".to_string(),
            format!(
                "Vụ án \"{}\" hết hạn trong hôm nay ({}). Vui lòng xử lý ngay!",
                name, date
            ),
        ),
        DeadlineTier::Urgent => (
            "⏰ Vụ án sắp hết hạn".to_string(),
            format!(
                "Vụ án \"{}\" sẽ hết hạn trong {} ngày ({}). Vui lòng xử lý sớm!",
                name, days_left, date
            ),
        ),
        DeadlineTier::Weekly => (
            "📅 Nhắc nhở vụ án".to_string(),
            format!(
                "Vụ án \"{}\" sẽ hết hạn trong {} tuần ({}). Vui lòng theo dõi tiến độ.",
                name,
                ceil_div(days_left, 7),
                date
            ),
        ),
        DeadlineTier::Monthly => (
            "📌 Nhắc nhở vụ án".to_string(),
            format!(
                "Vụ án \"{}\" sẽ hết hạn trong khoảng {} tháng ({}). Vui lòng lên kế hoạch xử lý.",
                name,
                ceil_div(days_left, 30),
                date
            ),
        ),
        DeadlineTier::None => return None,
    };

    Some(DeadlineMessage {
        tier,
        notification_type: tier.notification_type(),
        title,
        body,
    })
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    -((-value).div_euclid(divisor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vn() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(-30), DeadlineTier::Overdue);
        assert_eq!(classify(-1), DeadlineTier::Overdue);
        assert_eq!(classify(0), DeadlineTier::Urgent);
        assert_eq!(classify(1), DeadlineTier::Urgent);
        assert_eq!(classify(3), DeadlineTier::Urgent);
        assert_eq!(classify(4), DeadlineTier::Weekly);
        assert_eq!(classify(21), DeadlineTier::Weekly);
        assert_eq!(classify(22), DeadlineTier::Monthly);
        assert_eq!(classify(90), DeadlineTier::Monthly);
        assert_eq!(classify(91), DeadlineTier::None);
        assert_eq!(classify(10_000), DeadlineTier::None);
    }

    #[test]
    fn test_days_left_rounds_up() {
        let now = now();
        assert_eq!(days_left(now, now), 0);
        assert_eq!(days_left(now + Duration::hours(1), now), 1);
        assert_eq!(days_left(now + Duration::days(2), now), 2);
        assert_eq!(days_left(now + Duration::days(2) + Duration::minutes(1), now), 3);
        assert_eq!(days_left(now - Duration::hours(12), now), 0);
        assert_eq!(days_left(now - Duration::hours(36), now), -1);
        assert_eq!(days_left(now - Duration::days(5), now), -5);
    }

    #[test]
    fn test_beyond_horizon_never_sends() {
        let now = now();
        for days in [91, 120, 365] {
            let tier = classify(days);
            assert_eq!(tier, DeadlineTier::None);
            assert!(!should_send(tier, None, now));
            assert!(!should_send(tier, Some(now - Duration::days(400)), now));
            assert!(format_message("A", days, now, vn()).is_none());
        }
    }

    #[test]
    fn test_overdue_reports_absolute_days() {
        for days in [-1i64, -5, -42] {
            let msg = format_message("Trộm cắp", days, now(), vn()).unwrap();
            assert_eq!(msg.tier, DeadlineTier::Overdue);
            assert_eq!(msg.notification_type, NotificationType::CaseOverdue);
            assert!(msg.body.contains(&format!("quá hạn {} ngày", days.abs())));
        }
    }

    #[test]
    fn test_monthly_window_not_elapsed() {
        // 45 days out, last sent 10 days ago.
        let now = now();
        let tier = classify(45);
        assert_eq!(tier, DeadlineTier::Monthly);
        assert!(!should_send(tier, Some(now - Duration::days(10)), now));
        assert!(should_send(tier, Some(now - Duration::days(30)), now));
    }

    #[test]
    fn test_urgent_after_25_hours() {
        let now = now();
        let tier = classify(2);
        assert_eq!(tier, DeadlineTier::Urgent);
        assert!(should_send(tier, Some(now - Duration::hours(25)), now));
        assert!(!should_send(tier, Some(now - Duration::hours(23)), now));

        let msg = format_message("Lừa đảo", 2, now + Duration::days(2), vn()).unwrap();
        assert!(msg.body.contains('2'));
        assert!(msg.body.contains("ngày"));
        assert_eq!(msg.notification_type, NotificationType::CaseDeadlineSoon);
    }

    #[test]
    fn test_first_overdue_notification() {
        let tier = classify(-5);
        assert!(should_send(tier, None, now()));
    }

    #[test]
    fn test_weekly_and_monthly_units() {
        let deadline = now();
        let weekly = format_message("A", 8, deadline, vn()).unwrap();
        assert!(weekly.body.contains("2 tuần"));
        let weekly = format_message("A", 21, deadline, vn()).unwrap();
        assert!(weekly.body.contains("3 tuần"));
        let monthly = format_message("A", 31, deadline, vn()).unwrap();
        assert!(monthly.body.contains("2 tháng"));
        let monthly = format_message("A", 90, deadline, vn()).unwrap();
        assert!(monthly.body.contains("3 tháng"));
    }

    #[test]
    fn test_due_today_and_blank_name() {
        let msg = format_message("  ", 0, now(), vn()).unwrap();
        assert_eq!(msg.tier, DeadlineTier::Urgent);
        assert!(msg.body.contains("hôm nay"));
        assert!(msg.body.starts_with("Vụ án \"Vụ án\""));
    }

    #[test]
    fn test_deadline_date_uses_local_offset() {
        // 20:00 UTC is already the next day in UTC+7.
        let deadline = Utc.with_ymd_and_hms(2025, 3, 31, 20, 0, 0).unwrap();
        assert_eq!(format_deadline_date(deadline, vn()), "01/04/2025");
    }

    #[test]
    fn test_cadence_never_slows_down_as_deadline_nears() {
        let mut previous: Option<Duration> = None;
        for days in (-10..=90).rev() {
            let window = classify(days).throttle_window().unwrap();
            if let Some(prev) = previous {
                assert!(window <= prev, "cadence slowed at {} days", days);
            }
            previous = Some(window);
        }
    }
}
