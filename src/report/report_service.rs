use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use std::borrow::Cow;
use uuid::Uuid;

use super::{
    docx::{render_docx, report_file_name, BUNDLED_TEMPLATE},
    report_dto::{CaseDocumentData, CaseReportFile, CaseStatistics, CaseStatisticsParams},
};
use crate::{
    case::{
        case_models::{CaseDetail, CasePlan, CaseStatus},
        case_repository::{CaseRepository, StatusCount},
        case_service::CaseService,
    },
    error::{AppError, Result},
    middleware::AuthUser,
    notification::deadline::format_deadline_date,
};

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    offset
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Last millisecond of `date` in `offset`.
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    start_of_day(date, offset) + Duration::days(1) - Duration::milliseconds(1)
}

pub fn tally(counts: &[StatusCount]) -> CaseStatistics {
    let mut stats = CaseStatistics::default();
    for row in counts {
        let slot = match row.status.parse::<CaseStatus>() {
            Ok(CaseStatus::Pending) => &mut stats.pending,
            Ok(CaseStatus::InProgress) => &mut stats.in_progress,
            Ok(CaseStatus::Completed) => &mut stats.completed,
            Ok(CaseStatus::OnHold) => &mut stats.on_hold,
            Ok(CaseStatus::Cancelled) => &mut stats.cancelled,
            Err(_) => {
                tracing::warn!("Ignoring unknown case status {:?} in statistics", row.status);
                continue;
            }
        };
        *slot += row.count;
        stats.total += row.count;
    }
    stats
}

pub fn build_document_data(
    detail: &CaseDetail,
    plan: Option<&CasePlan>,
    offset: FixedOffset,
) -> CaseDocumentData {
    let format = |date: Option<DateTime<Utc>>| {
        date.map(|d| format_deadline_date(d, offset))
            .unwrap_or_default()
    };

    let mut by_start: Vec<_> = detail.phases.iter().collect();
    by_start.sort_by_key(|p| p.start_date);
    let start_date = by_start.first().map(|p| p.start_date);
    let end_date = by_start.last().and_then(|p| p.effective_end());

    let case = &detail.case;
    CaseDocumentData {
        name: case.name.clone(),
        description: case.description.clone().unwrap_or_default(),
        status: case.status.clone(),
        crime_type: case.crime_type.clone().unwrap_or_default(),
        applicable_law: case.applicable_law.clone().unwrap_or_default(),
        number_of_defendants: case
            .number_of_defendants
            .clone()
            .unwrap_or_else(|| "0".to_string()),
        start_date: format(start_date),
        end_date: format(end_date),
        full_name: detail
            .assignee
            .as_ref()
            .and_then(|a| a.full_name.clone())
            .unwrap_or_default(),
        phone: detail
            .assignee
            .as_ref()
            .map(|a| a.phone.clone())
            .unwrap_or_default(),
        tasks: detail
            .phases
            .iter()
            .flat_map(|p| p.tasks.0.iter().cloned())
            .collect(),
        investigation_result: plan
            .and_then(|p| p.investigation_result.clone())
            .unwrap_or_default(),
        exhibits: plan.map(|p| p.exhibits.0.clone()).unwrap_or_default(),
        next_investigation_purpose: plan
            .and_then(|p| p.next_investigation_purpose.clone())
            .unwrap_or_default(),
        next_investigation_content: plan
            .map(|p| p.next_investigation_content.0.clone())
            .unwrap_or_default(),
        participating_forces: plan
            .map(|p| p.participating_forces.0.clone())
            .unwrap_or_default(),
    }
}

#[derive(Clone)]
pub struct ReportService {
    case_repo: CaseRepository,
    case_service: CaseService,
    offset: FixedOffset,
    /// Overrides the bundled report template when set.
    template_path: Option<String>,
}

impl ReportService {
    pub fn new(
        case_repo: CaseRepository,
        case_service: CaseService,
        offset: FixedOffset,
        template_path: Option<String>,
    ) -> Self {
        Self {
            case_repo,
            case_service,
            offset,
            template_path,
        }
    }

    pub async fn case_statistics(
        &self,
        auth_user: &AuthUser,
        params: CaseStatisticsParams,
    ) -> Result<CaseStatistics> {
        if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
            if start > end {
                return Err(AppError::BadRequest(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        let user_id: Option<Uuid> = if auth_user.is_admin() {
            params.user_id
        } else {
            Some(auth_user.id)
        };
        let from = params.start_date.map(|d| start_of_day(d, self.offset));
        let to = params.end_date.map(|d| end_of_day(d, self.offset));

        let counts = self.case_repo.count_by_status(user_id, from, to).await?;
        Ok(tally(&counts))
    }

    pub async fn case_document_data(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<CaseDocumentData> {
        let detail = self.case_service.get_case(auth_user, case_id).await?;
        let plan = self.case_repo.find_plan(case_id).await?;

        Ok(build_document_data(&detail, plan.as_ref(), self.offset))
    }

    async fn load_template(&self) -> Result<Cow<'static, [u8]>> {
        match &self.template_path {
            Some(path) => tokio::fs::read(path).await.map(Cow::Owned).map_err(|e| {
                tracing::error!("Failed to read report template {}: {}", path, e);
                AppError::InternalError
            }),
            None => Ok(Cow::Borrowed(BUNDLED_TEMPLATE)),
        }
    }

    pub async fn case_report_docx(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<CaseReportFile> {
        let data = self.case_document_data(auth_user, case_id).await?;
        let template = self.load_template().await?;

        let bytes = render_docx(&template, &data).map_err(|e| {
            tracing::error!(case_id = %case_id, "Failed to render case report: {}", e);
            AppError::InternalError
        })?;

        tracing::info!(case_id = %case_id, user_id = %auth_user.id, "Case report exported");
        Ok(CaseReportFile {
            file_name: report_file_name(&data.name, Utc::now().with_timezone(&self.offset)),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        case::case_models::{Case, CasePhase},
        user::user_models::UserResponse,
    };
    use sqlx::types::Json;

    fn vn() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn phase(start: DateTime<Utc>, end: Option<DateTime<Utc>>, completed_at: Option<DateTime<Utc>>, tasks: &[&str]) -> CasePhase {
        CasePhase {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            name: "p".to_string(),
            description: None,
            order: 0,
            start_date: start,
            end_date: end,
            is_completed: completed_at.is_some(),
            completed_at,
            tasks: Json(tasks.iter().map(|t| t.to_string()).collect()),
            note: None,
            created_at: start,
            updated_at: start,
        }
    }

    fn detail(phases: Vec<CasePhase>) -> CaseDetail {
        let now = Utc::now();
        CaseDetail {
            case: Case {
                id: Uuid::new_v4(),
                template_id: Uuid::new_v4(),
                name: "Vụ trộm".to_string(),
                description: None,
                status: "IN_PROGRESS".to_string(),
                crime_type: Some("Trộm cắp".to_string()),
                applicable_law: None,
                number_of_defendants: None,
                user_id: None,
                created_at: now,
                updated_at: now,
            },
            template: None,
            assignee: Some(UserResponse {
                id: Uuid::new_v4(),
                full_name: Some("Trần Văn B".to_string()),
                phone: "0900000000".to_string(),
                role: "STAFF".to_string(),
                has_expo_token: false,
                has_fcm_token: false,
                created_at: now,
            }),
            groups: vec![],
            phases,
        }
    }

    #[test]
    fn test_day_bounds_in_offset() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(
            start_of_day(date, vn()),
            Utc.with_ymd_and_hms(2025, 4, 30, 17, 0, 0).unwrap()
        );
        assert_eq!(
            end_of_day(date, vn()),
            Utc.with_ymd_and_hms(2025, 5, 1, 16, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_tally_fills_every_status() {
        let counts = vec![
            StatusCount { status: "PENDING".to_string(), count: 2 },
            StatusCount { status: "IN_PROGRESS".to_string(), count: 5 },
            StatusCount { status: "LEGACY".to_string(), count: 9 },
        ];
        let stats = tally(&counts);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.in_progress, 5);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.total, 7);
    }

    #[test]
    fn test_document_dates_follow_phases_by_start() {
        let d = |day| Utc.with_ymd_and_hms(2025, 1, day, 3, 0, 0).unwrap();
        let phases = vec![
            phase(d(10), Some(d(20)), Some(d(18)), &["Khám nghiệm"]),
            phase(d(2), Some(d(9)), None, &["Lấy lời khai", "Thu giữ"]),
        ];

        let data = build_document_data(&detail(phases), None, vn());

        assert_eq!(data.start_date, "02/01/2025");
        assert_eq!(data.end_date, "18/01/2025");
        assert_eq!(data.tasks, vec!["Khám nghiệm", "Lấy lời khai", "Thu giữ"]);
        assert_eq!(data.full_name, "Trần Văn B");
        assert_eq!(data.number_of_defendants, "0");
    }

    #[test]
    fn test_document_without_phases_or_plan() {
        let data = build_document_data(&detail(vec![]), None, vn());
        assert_eq!(data.start_date, "");
        assert_eq!(data.end_date, "");
        assert!(data.exhibits.is_empty());
        assert_eq!(data.investigation_result, "");
    }

    #[test]
    fn test_document_includes_plan() {
        let now = Utc::now();
        let plan = CasePlan {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            investigation_result: Some("Đã xác định nghi phạm".to_string()),
            exhibits: Json(vec!["Dao".to_string()]),
            next_investigation_purpose: None,
            next_investigation_content: Json(vec![]),
            participating_forces: Json(vec!["PC02".to_string()]),
            created_at: now,
            updated_at: now,
        };
        let data = build_document_data(&detail(vec![]), Some(&plan), vn());
        assert_eq!(data.investigation_result, "Đã xác định nghi phạm");
        assert_eq!(data.exhibits, vec!["Dao"]);
        assert_eq!(data.participating_forces, vec!["PC02"]);
    }
}
