use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CaseStatisticsParams {
    /// Inclusive, widened to the start of the day in the report offset.
    pub start_date: Option<NaiveDate>,
    /// Inclusive, widened to the end of the day in the report offset.
    pub end_date: Option<NaiveDate>,
    /// Admin only; staff always get their own cases.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CaseStatistics {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub on_hold: i64,
    pub cancelled: i64,
    pub total: i64,
}

/// Values substituted into the case report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CaseDocumentData {
    pub name: String,
    pub description: String,
    pub status: String,
    pub crime_type: String,
    pub applicable_law: String,
    pub number_of_defendants: String,
    pub start_date: String,
    pub end_date: String,
    pub full_name: String,
    pub phone: String,
    pub tasks: Vec<String>,
    pub investigation_result: String,
    pub exhibits: Vec<String>,
    pub next_investigation_purpose: String,
    pub next_investigation_content: Vec<String>,
    pub participating_forces: Vec<String>,
}

/// Rendered case report, ready to download.
#[derive(Debug)]
pub struct CaseReportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
