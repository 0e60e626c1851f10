use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{
    case_dto::{
        task_names, CaseFieldInput, CaseListParams, CreateCaseRequest, CreatePhaseRequest,
        UpdateCaseRequest, UpdatePhaseRequest, UpsertPlanRequest,
    },
    case_models::{
        Case, CaseDetail, CaseField, CaseGroupDetail, CaseListItem, CasePhase, CasePlan,
        CaseStatus, NewCaseField,
    },
    case_repository::{CaseFilter, CaseRepository, NewCase, PhaseValues},
};
use crate::{
    db::DbPool,
    dto::{Page, PaginatedResponse},
    error::{AppError, Result},
    middleware::AuthUser,
    template::{template_models::TemplateDetail, template_service::TemplateService},
    user::{user_models::UserResponse, user_repository::UserRepository},
};

/// Resolves field inputs against the template. Inputs naming a field the
/// template does not have are dropped; omitted metadata falls back to the
/// template field. `case_groups` maps template group ids to case group ids.
pub fn build_case_fields(
    template: &TemplateDetail,
    case_groups: &HashMap<Uuid, Uuid>,
    inputs: &[CaseFieldInput],
) -> Vec<NewCaseField> {
    inputs
        .iter()
        .filter_map(|input| {
            let field = template
                .fields()
                .find(|f| f.field_name.as_deref() == Some(input.field_name.as_str()))?;
            let group_id = *case_groups.get(&field.group_id)?;

            Some(NewCaseField {
                group_id,
                field_label: input
                    .field_label
                    .clone()
                    .or_else(|| field.field_label.clone())
                    .unwrap_or_else(|| input.field_name.clone()),
                field_name: input.field_name.clone(),
                field_type: input
                    .field_type
                    .clone()
                    .unwrap_or_else(|| non_empty_or(&field.field_type, "text")),
                field_value: input.field_value.clone(),
                is_required: input.is_required.unwrap_or(field.is_required),
                placeholder: input.placeholder.clone().or_else(|| field.placeholder.clone()),
                options: input
                    .options
                    .clone()
                    .unwrap_or_else(|| field.options.0.clone()),
                default_value: input
                    .default_value
                    .clone()
                    .or_else(|| field.default_value.clone()),
                is_editable: input.is_editable.unwrap_or(field.is_editable),
                index: input.index.unwrap_or(field.index),
                description: input.description.clone().or_else(|| field.description.clone()),
            })
        })
        .collect()
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

pub fn validate_phase_dates(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    match end {
        Some(end) if start > end => Err(AppError::BadRequest(
            "Start date must be before or equal to end date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Completion flag and timestamp after an update. Completing stamps `now`,
/// reopening clears the timestamp, anything else keeps the current state.
pub fn completion_state(
    current: &CasePhase,
    requested: Option<bool>,
    now: DateTime<Utc>,
) -> (bool, Option<DateTime<Utc>>) {
    match requested {
        Some(true) if !current.is_completed => (true, Some(now)),
        Some(true) => (true, current.completed_at.or(Some(now))),
        Some(false) => (false, None),
        None => (current.is_completed, current.completed_at),
    }
}

fn can_access(auth_user: &AuthUser, case: &Case) -> bool {
    auth_user.is_admin() || case.user_id == Some(auth_user.id)
}

#[derive(Clone)]
pub struct CaseService {
    db: DbPool,
    repo: CaseRepository,
    user_repo: UserRepository,
    template_service: TemplateService,
}

impl CaseService {
    pub fn new(
        db: DbPool,
        repo: CaseRepository,
        user_repo: UserRepository,
        template_service: TemplateService,
    ) -> Self {
        Self {
            db,
            repo,
            user_repo,
            template_service,
        }
    }

    fn label(&self) -> &'static str {
        self.repo.kind().label()
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.label()))
    }

    /// Loads a case the caller may act on. Other people's cases read as
    /// missing to non-admins.
    async fn find_accessible(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<Case> {
        let case = self
            .repo
            .find_by_id(case_id)
            .await?
            .ok_or_else(|| self.not_found())?;

        if !can_access(auth_user, &case) {
            return Err(AppError::Forbidden(format!(
                "You do not have access to this {}",
                self.label().to_lowercase()
            )));
        }

        Ok(case)
    }

    pub async fn create_case(&self, auth_user: &AuthUser, payload: CreateCaseRequest) -> Result<CaseDetail> {
        let template = self.template_service.get_template(payload.template_id).await?;

        let assignee = payload.user_id.unwrap_or(auth_user.id);
        if assignee != auth_user.id && !auth_user.is_admin() {
            return Err(AppError::Forbidden(format!(
                "Only admins can assign {}s to other users",
                self.label().to_lowercase()
            )));
        }

        let mut tx = self.db.begin().await?;

        let case = self
            .repo
            .create_with_tx(
                &mut tx,
                &NewCase {
                    template_id: template.id,
                    name: payload.name.trim(),
                    description: payload.description.as_deref(),
                    status: payload.status.unwrap_or(CaseStatus::Pending),
                    crime_type: payload.crime_type.as_deref(),
                    applicable_law: payload.applicable_law.as_deref(),
                    number_of_defendants: payload.number_of_defendants.as_deref(),
                    user_id: Some(assignee),
                },
            )
            .await
            .map_err(|e| e.on_constraint("Assignee does not exist"))?;

        if !payload.fields.is_empty() && !template.groups.is_empty() {
            let mut case_groups = HashMap::with_capacity(template.groups.len());
            for group in &template.groups {
                let created = self
                    .repo
                    .insert_group_with_tx(
                        &mut tx,
                        case.id,
                        group.id,
                        &group.title,
                        group.description.as_deref(),
                        group.index,
                    )
                    .await?;
                case_groups.insert(group.id, created.id);
            }

            for field in build_case_fields(&template, &case_groups, &payload.fields) {
                self.repo.insert_field_with_tx(&mut tx, case.id, &field).await?;
            }
        }

        tx.commit().await?;

        info!(kind = self.label(), case_id = %case.id, user_id = %auth_user.id, "Record created");
        self.get_case(auth_user, case.id).await
    }

    pub async fn list_cases(
        &self,
        auth_user: &AuthUser,
        params: CaseListParams,
    ) -> Result<PaginatedResponse<CaseListItem>> {
        let page = Page::new(params.page, params.limit);
        let filter = CaseFilter {
            user_id: if auth_user.is_admin() {
                params.user_id
            } else {
                Some(auth_user.id)
            },
            status: params.status,
            q: params.q.filter(|q| !q.trim().is_empty()),
            sort_order: params.sort_order.unwrap_or_default(),
        };

        let cases = self
            .repo
            .find_all(&filter, page.limit as i64, page.offset())
            .await?;
        let total = self.repo.count_all(&filter).await?;

        Ok(PaginatedResponse::new(cases, total, page))
    }

    pub async fn get_case(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<CaseDetail> {
        let case = self.find_accessible(auth_user, case_id).await?;

        let template = self.template_service.find_template(case.template_id).await?;
        let assignee = match case.user_id {
            Some(user_id) => self.user_repo.find_by_id(user_id).await?.map(UserResponse::from),
            None => None,
        };
        let groups = self.repo.find_groups(case.id).await?;
        let fields = self.repo.find_fields(case.id).await?;
        let phases = self.repo.find_phases(case.id).await?;

        let mut by_group: HashMap<Uuid, Vec<CaseField>> = HashMap::new();
        for field in fields {
            by_group.entry(field.group_id).or_default().push(field);
        }

        let groups = groups
            .into_iter()
            .map(|group| CaseGroupDetail {
                fields: by_group.remove(&group.id).unwrap_or_default(),
                id: group.id,
                group_id: group.group_id,
                title: group.title,
                description: group.description,
                index: group.index,
            })
            .collect();

        Ok(CaseDetail {
            case,
            template,
            assignee,
            groups,
            phases,
        })
    }

    pub async fn update_case(
        &self,
        auth_user: &AuthUser,
        case_id: Uuid,
        payload: UpdateCaseRequest,
    ) -> Result<CaseDetail> {
        self.find_accessible(auth_user, case_id).await?;

        if payload.user_id.is_some_and(|id| id != auth_user.id) && !auth_user.is_admin() {
            return Err(AppError::Forbidden(format!(
                "Only admins can reassign {}s",
                self.label().to_lowercase()
            )));
        }

        let mut tx = self.db.begin().await?;

        self.repo
            .update_with_tx(
                &mut tx,
                case_id,
                payload.name.as_deref().map(str::trim),
                payload.description.as_deref(),
                payload.status,
                payload.crime_type.as_deref(),
                payload.applicable_law.as_deref(),
                payload.number_of_defendants.as_deref(),
                payload.user_id,
            )
            .await
            .map_err(|e| e.on_constraint("Assignee does not exist"))?
            .ok_or_else(|| self.not_found())?;

        for group in &payload.groups {
            let updated = self
                .repo
                .update_group_with_tx(
                    &mut tx,
                    case_id,
                    group.id,
                    group.title.as_deref(),
                    group.description.as_deref(),
                    group.index,
                )
                .await?;
            if updated == 0 {
                return Err(AppError::BadRequest(format!(
                    "Group {} does not belong to this {}",
                    group.id,
                    self.label().to_lowercase()
                )));
            }

            for field in &group.fields {
                let updated = self
                    .repo
                    .update_field_with_tx(
                        &mut tx,
                        group.id,
                        field.id,
                        field.field_value.as_deref(),
                        field.field_label.as_deref(),
                        field.index,
                    )
                    .await?;
                if updated == 0 {
                    return Err(AppError::BadRequest(format!(
                        "Field {} does not belong to group {}",
                        field.id, group.id
                    )));
                }
            }
        }

        tx.commit().await?;

        info!(kind = self.label(), case_id = %case_id, "Record updated");
        self.get_case(auth_user, case_id).await
    }

    pub async fn delete_case(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<()> {
        self.find_accessible(auth_user, case_id).await?;

        let rows_affected = self.repo.delete(case_id).await?;
        if rows_affected == 0 {
            return Err(self.not_found());
        }

        info!(kind = self.label(), case_id = %case_id, user_id = %auth_user.id, "Record deleted");
        Ok(())
    }

    // Phases

    pub async fn add_phase(
        &self,
        auth_user: &AuthUser,
        case_id: Uuid,
        payload: CreatePhaseRequest,
    ) -> Result<CasePhase> {
        self.find_accessible(auth_user, case_id).await?;
        validate_phase_dates(payload.start_date, payload.end_date)?;

        let order = match payload.order {
            Some(order) => order,
            None => self.repo.next_phase_order(case_id).await?,
        };

        let phase = self
            .repo
            .insert_phase(
                case_id,
                &PhaseValues {
                    name: payload.name.trim().to_string(),
                    description: payload.description,
                    order,
                    start_date: payload.start_date,
                    end_date: payload.end_date,
                    is_completed: false,
                    completed_at: None,
                    tasks: task_names(&payload.tasks),
                    note: payload.note,
                },
            )
            .await?;

        info!(kind = self.label(), case_id = %case_id, phase_id = %phase.id, "Phase added");
        Ok(phase)
    }

    pub async fn list_phases(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<Vec<CasePhase>> {
        self.find_accessible(auth_user, case_id).await?;
        self.repo.find_phases(case_id).await
    }

    pub async fn update_phase(
        &self,
        auth_user: &AuthUser,
        case_id: Uuid,
        phase_id: Uuid,
        payload: UpdatePhaseRequest,
    ) -> Result<CasePhase> {
        self.find_accessible(auth_user, case_id).await?;
        let current = self
            .repo
            .find_phase(case_id, phase_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Phase not found".to_string()))?;

        let start_date = payload.start_date.unwrap_or(current.start_date);
        let end_date = payload.end_date.or(current.end_date);
        validate_phase_dates(start_date, end_date)?;

        let (is_completed, completed_at) = completion_state(&current, payload.is_completed, Utc::now());

        let values = PhaseValues {
            name: payload
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or(current.name),
            description: payload.description.or(current.description),
            order: payload.order.unwrap_or(current.order),
            start_date,
            end_date,
            is_completed,
            completed_at,
            tasks: payload
                .tasks
                .as_deref()
                .map(task_names)
                .unwrap_or(current.tasks.0),
            note: payload.note.or(current.note),
        };

        self.repo
            .update_phase(phase_id, &values)
            .await?
            .ok_or_else(|| AppError::NotFound("Phase not found".to_string()))
    }

    pub async fn delete_phase(&self, auth_user: &AuthUser, case_id: Uuid, phase_id: Uuid) -> Result<()> {
        self.find_accessible(auth_user, case_id).await?;

        let rows_affected = self.repo.delete_phase(case_id, phase_id).await?;
        if rows_affected == 0 {
            return Err(AppError::NotFound("Phase not found".to_string()));
        }

        Ok(())
    }

    // Plan

    pub async fn upsert_plan(
        &self,
        auth_user: &AuthUser,
        case_id: Uuid,
        payload: UpsertPlanRequest,
    ) -> Result<CasePlan> {
        self.find_accessible(auth_user, case_id).await?;

        self.repo
            .upsert_plan(
                case_id,
                payload.investigation_result.as_deref(),
                payload.exhibits.as_deref(),
                payload.next_investigation_purpose.as_deref(),
                payload.next_investigation_content.as_deref(),
                payload.participating_forces.as_deref(),
            )
            .await
    }

    pub async fn get_plan(&self, auth_user: &AuthUser, case_id: Uuid) -> Result<CasePlan> {
        self.find_accessible(auth_user, case_id).await?;

        self.repo
            .find_plan(case_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        template::template_models::fixtures,
        user::user_models::Role,
    };
    use chrono::Duration;
    use sqlx::types::Json;

    fn template_with_fields() -> (TemplateDetail, HashMap<Uuid, Uuid>) {
        let template = fixtures::template();
        let group = fixtures::group(template.id, "Thông tin", 0);
        let mut blank_type = fixtures::field(group.id, "victim", 1);
        blank_type.field_type = String::new();
        blank_type.field_label = None;
        let fields = vec![fixtures::field(group.id, "suspect", 0), blank_type];

        let case_groups = HashMap::from([(group.id, Uuid::new_v4())]);
        (TemplateDetail::assemble(template, vec![group], fields), case_groups)
    }

    fn input(name: &str, value: &str) -> CaseFieldInput {
        CaseFieldInput {
            field_name: name.to_string(),
            field_value: Some(value.to_string()),
            ..Default::default()
        }
    }

    fn phase(is_completed: bool, completed_at: Option<DateTime<Utc>>) -> CasePhase {
        let now = Utc::now();
        CasePhase {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            name: "Khởi tố".to_string(),
            description: None,
            order: 1,
            start_date: now,
            end_date: None,
            is_completed,
            completed_at,
            tasks: Json(vec![]),
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_case_fields_copies_template_metadata() {
        let (template, case_groups) = template_with_fields();
        let case_group = *case_groups.values().next().unwrap();

        let fields = build_case_fields(&template, &case_groups, &[input("suspect", "Nguyễn Văn A")]);

        assert_eq!(fields.len(), 1);
        let field = &fields[0];
        assert_eq!(field.group_id, case_group);
        assert_eq!(field.field_value.as_deref(), Some("Nguyễn Văn A"));
        assert_eq!(field.field_label, "Label suspect");
        assert_eq!(field.field_type, "select");
        assert!(field.is_required);
        assert!(!field.is_editable);
        assert_eq!(field.options, vec!["a", "b"]);
        assert_eq!(field.default_value.as_deref(), Some("a"));
    }

    #[test]
    fn test_build_case_fields_drops_unknown_names() {
        let (template, case_groups) = template_with_fields();
        let fields = build_case_fields(
            &template,
            &case_groups,
            &[input("unknown", "x"), input("suspect", "y")],
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_name, "suspect");
    }

    #[test]
    fn test_build_case_fields_fallbacks_and_overrides() {
        let (template, case_groups) = template_with_fields();
        let mut overridden = input("suspect", "z");
        overridden.field_label = Some("Bị can".to_string());
        overridden.index = Some(9);

        let fields = build_case_fields(
            &template,
            &case_groups,
            &[input("victim", "v"), overridden],
        );

        assert_eq!(fields[0].field_type, "text");
        assert_eq!(fields[0].field_label, "victim");
        assert_eq!(fields[1].field_label, "Bị can");
        assert_eq!(fields[1].index, 9);
    }

    #[test]
    fn test_validate_phase_dates() {
        let start = Utc::now();
        assert!(validate_phase_dates(start, None).is_ok());
        assert!(validate_phase_dates(start, Some(start)).is_ok());
        assert!(validate_phase_dates(start, Some(start + Duration::days(1))).is_ok());
        assert!(matches!(
            validate_phase_dates(start, Some(start - Duration::seconds(1))),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_completion_state_transitions() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);

        assert_eq!(completion_state(&phase(false, None), Some(true), now), (true, Some(now)));
        assert_eq!(
            completion_state(&phase(true, Some(earlier)), Some(true), now),
            (true, Some(earlier))
        );
        assert_eq!(completion_state(&phase(true, Some(earlier)), Some(false), now), (false, None));
        assert_eq!(
            completion_state(&phase(true, Some(earlier)), None, now),
            (true, Some(earlier))
        );
    }

    #[tokio::test]
    async fn test_messages_name_the_record_kind() {
        use super::super::case_models::RecordKind;
        use crate::template::template_repository::TemplateRepository;
        use sqlx::postgres::PgPoolOptions;

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/case_tracker_test")
            .unwrap();
        let service = |kind| {
            CaseService::new(
                pool.clone(),
                CaseRepository::new(pool.clone(), kind),
                UserRepository::new(pool.clone()),
                TemplateService::new(pool.clone(), TemplateRepository::new(pool.clone())),
            )
        };

        assert_eq!(
            service(RecordKind::Case).not_found().to_string(),
            "Not found: Case not found"
        );
        assert_eq!(
            service(RecordKind::Source).not_found().to_string(),
            "Not found: Source not found"
        );
    }

    #[test]
    fn test_access_owner_or_admin() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let case = Case {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            name: "A".to_string(),
            description: None,
            status: "PENDING".to_string(),
            crime_type: None,
            applicable_law: None,
            number_of_defendants: None,
            user_id: Some(owner),
            created_at: now,
            updated_at: now,
        };

        assert!(can_access(&AuthUser { id: owner, role: Role::Staff }, &case));
        assert!(can_access(&AuthUser { id: Uuid::new_v4(), role: Role::Admin }, &case));
        assert!(!can_access(&AuthUser { id: Uuid::new_v4(), role: Role::Staff }, &case));
    }
}
