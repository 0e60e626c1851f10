use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::case_models::{
    Case, CaseField, CaseGroup, CaseListItem, CasePhase, CasePlan, CaseStatus, NewCaseField,
    RecordKind,
};
use crate::{
    dto::{like_pattern, SortOrder},
    error::Result,
    notification::deadline_scheduler::{CaseDeadline, DeadlineSource},
};

#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Restricts to one assignee.
    pub user_id: Option<Uuid>,
    pub status: Option<CaseStatus>,
    pub q: Option<String>,
    pub sort_order: SortOrder,
}

pub struct NewCase<'a> {
    pub template_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status: CaseStatus,
    pub crime_type: Option<&'a str>,
    pub applicable_law: Option<&'a str>,
    pub number_of_defendants: Option<&'a str>,
    pub user_id: Option<Uuid>,
}

/// Phase columns after the service has merged an update.
pub struct PhaseValues {
    pub name: String,
    pub description: Option<String>,
    pub order: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub tasks: Vec<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct CaseRepository {
    pool: PgPool,
    kind: RecordKind,
}

impl CaseRepository {
    pub fn new(pool: PgPool, kind: RecordKind) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: &NewCase<'_>,
    ) -> Result<Case> {
        let sql = format!(
            "INSERT INTO {}
                (template_id, name, description, status, crime_type, applicable_law,
                 number_of_defendants, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
            self.kind.table()
        );
        let case = sqlx::query_as::<_, Case>(&sql)
            .bind(new.template_id)
            .bind(new.name)
            .bind(new.description)
            .bind(new.status.as_str())
            .bind(new.crime_type)
            .bind(new.applicable_law)
            .bind(new.number_of_defendants)
            .bind(new.user_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(case)
    }

    pub async fn insert_group_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        case_id: Uuid,
        template_group_id: Uuid,
        title: &str,
        description: Option<&str>,
        index: i32,
    ) -> Result<CaseGroup> {
        let sql = format!(
            "INSERT INTO {} ({}, group_id, title, description, index)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            self.kind.groups_table(),
            self.kind.owner_column(),
            self.kind.group_columns()
        );
        let group = sqlx::query_as::<_, CaseGroup>(&sql)
            .bind(case_id)
            .bind(template_group_id)
            .bind(title)
            .bind(description)
            .bind(index)
            .fetch_one(&mut **tx)
            .await?;

        Ok(group)
    }

    pub async fn insert_field_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        case_id: Uuid,
        field: &NewCaseField,
    ) -> Result<CaseField> {
        let sql = format!(
            "INSERT INTO {}
                ({}, group_id, field_label, field_name, field_type, field_value, is_required,
                 placeholder, options, default_value, is_editable, index, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {}",
            self.kind.fields_table(),
            self.kind.owner_column(),
            self.kind.field_columns()
        );
        let field = sqlx::query_as::<_, CaseField>(&sql)
            .bind(case_id)
            .bind(field.group_id)
            .bind(&field.field_label)
            .bind(&field.field_name)
            .bind(&field.field_type)
            .bind(&field.field_value)
            .bind(field.is_required)
            .bind(&field.placeholder)
            .bind(Json(&field.options))
            .bind(&field.default_value)
            .bind(field.is_editable)
            .bind(field.index)
            .bind(&field.description)
            .fetch_one(&mut **tx)
            .await?;

        Ok(field)
    }

    pub async fn find_all(&self, filter: &CaseFilter, limit: i64, offset: i64) -> Result<Vec<CaseListItem>> {
        let sql = format!(
            "SELECT c.id, c.template_id, t.title AS template_title, c.name, c.description, c.status,
                    c.crime_type, c.applicable_law, c.number_of_defendants, c.user_id,
                    u.full_name AS assignee_name,
                    (SELECT MIN(p.start_date) FROM {phases} p WHERE p.{owner} = c.id) AS start_date,
                    (SELECT MAX(COALESCE(p.completed_at, p.end_date)) FROM {phases} p
                      WHERE p.{owner} = c.id) AS end_date,
                    c.created_at, c.updated_at
             FROM {table} c
             LEFT JOIN templates t ON t.id = c.template_id
             LEFT JOIN users u ON u.id = c.user_id
             WHERE ($1::uuid IS NULL OR c.user_id = $1)
               AND ($2::text IS NULL OR c.status = $2)
               AND ($3::text IS NULL OR c.name ILIKE $3 OR c.description ILIKE $3
                    OR c.crime_type ILIKE $3 OR c.applicable_law ILIKE $3)
             ORDER BY c.created_at {order}
             LIMIT $4 OFFSET $5",
            phases = self.kind.phases_table(),
            owner = self.kind.owner_column(),
            table = self.kind.table(),
            order = filter.sort_order.as_sql()
        );

        let cases = sqlx::query_as::<_, CaseListItem>(&sql)
            .bind(filter.user_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.q.as_deref().map(like_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(cases)
    }

    pub async fn count_all(&self, filter: &CaseFilter) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} c
             WHERE ($1::uuid IS NULL OR c.user_id = $1)
               AND ($2::text IS NULL OR c.status = $2)
               AND ($3::text IS NULL OR c.name ILIKE $3 OR c.description ILIKE $3
                    OR c.crime_type ILIKE $3 OR c.applicable_law ILIKE $3)",
            self.kind.table()
        );
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(filter.user_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.q.as_deref().map(like_pattern))
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Case>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", self.kind.table());
        let case = sqlx::query_as::<_, Case>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(case)
    }

    pub async fn find_groups(&self, case_id: Uuid) -> Result<Vec<CaseGroup>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY index ASC",
            self.kind.group_columns(),
            self.kind.groups_table(),
            self.kind.owner_column()
        );
        let groups = sqlx::query_as::<_, CaseGroup>(&sql)
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }

    pub async fn find_fields(&self, case_id: Uuid) -> Result<Vec<CaseField>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY index ASC",
            self.kind.field_columns(),
            self.kind.fields_table(),
            self.kind.owner_column()
        );
        let fields = sqlx::query_as::<_, CaseField>(&sql)
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(fields)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        status: Option<CaseStatus>,
        crime_type: Option<&str>,
        applicable_law: Option<&str>,
        number_of_defendants: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Option<Case>> {
        let sql = format!(
            "UPDATE {} SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                crime_type = COALESCE($5, crime_type),
                applicable_law = COALESCE($6, applicable_law),
                number_of_defendants = COALESCE($7, number_of_defendants),
                user_id = COALESCE($8, user_id),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
            self.kind.table()
        );
        let case = sqlx::query_as::<_, Case>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(status.map(|s| s.as_str()))
            .bind(crime_type)
            .bind(applicable_law)
            .bind(number_of_defendants)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(case)
    }

    pub async fn update_group_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        case_id: Uuid,
        group_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        index: Option<i32>,
    ) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                index = COALESCE($5, index)
             WHERE id = $1 AND {} = $2",
            self.kind.groups_table(),
            self.kind.owner_column()
        );
        let result = sqlx::query(&sql)
            .bind(group_id)
            .bind(case_id)
            .bind(title)
            .bind(description)
            .bind(index)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_field_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        field_id: Uuid,
        field_value: Option<&str>,
        field_label: Option<&str>,
        index: Option<i32>,
    ) -> Result<u64> {
        let sql = format!(
            "UPDATE {} SET
                field_value = COALESCE($3, field_value),
                field_label = COALESCE($4, field_label),
                index = COALESCE($5, index)
             WHERE id = $1 AND group_id = $2",
            self.kind.fields_table()
        );
        let result = sqlx::query(&sql)
            .bind(field_id)
            .bind(group_id)
            .bind(field_value)
            .bind(field_label)
            .bind(index)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.kind.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // Phases

    pub async fn next_phase_order(&self, case_id: Uuid) -> Result<i32> {
        let sql = format!(
            "SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM {} WHERE {} = $1",
            self.kind.phases_table(),
            self.kind.owner_column()
        );
        let next: i32 = sqlx::query_scalar(&sql)
            .bind(case_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(next)
    }

    pub async fn insert_phase(&self, case_id: Uuid, values: &PhaseValues) -> Result<CasePhase> {
        let sql = format!(
            "INSERT INTO {}
                ({}, name, description, \"order\", start_date, end_date, is_completed,
                 completed_at, tasks, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            self.kind.phases_table(),
            self.kind.owner_column(),
            self.kind.phase_columns()
        );
        let phase = sqlx::query_as::<_, CasePhase>(&sql)
            .bind(case_id)
            .bind(&values.name)
            .bind(&values.description)
            .bind(values.order)
            .bind(values.start_date)
            .bind(values.end_date)
            .bind(values.is_completed)
            .bind(values.completed_at)
            .bind(Json(&values.tasks))
            .bind(&values.note)
            .fetch_one(&self.pool)
            .await?;

        Ok(phase)
    }

    pub async fn find_phases(&self, case_id: Uuid) -> Result<Vec<CasePhase>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY \"order\" ASC, start_date ASC",
            self.kind.phase_columns(),
            self.kind.phases_table(),
            self.kind.owner_column()
        );
        let phases = sqlx::query_as::<_, CasePhase>(&sql)
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(phases)
    }

    pub async fn find_phase(&self, case_id: Uuid, phase_id: Uuid) -> Result<Option<CasePhase>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND {} = $2",
            self.kind.phase_columns(),
            self.kind.phases_table(),
            self.kind.owner_column()
        );
        let phase = sqlx::query_as::<_, CasePhase>(&sql)
            .bind(phase_id)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(phase)
    }

    pub async fn update_phase(&self, phase_id: Uuid, values: &PhaseValues) -> Result<Option<CasePhase>> {
        let sql = format!(
            "UPDATE {} SET
                name = $2,
                description = $3,
                \"order\" = $4,
                start_date = $5,
                end_date = $6,
                is_completed = $7,
                completed_at = $8,
                tasks = $9,
                note = $10,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            self.kind.phases_table(),
            self.kind.phase_columns()
        );
        let phase = sqlx::query_as::<_, CasePhase>(&sql)
            .bind(phase_id)
            .bind(&values.name)
            .bind(&values.description)
            .bind(values.order)
            .bind(values.start_date)
            .bind(values.end_date)
            .bind(values.is_completed)
            .bind(values.completed_at)
            .bind(Json(&values.tasks))
            .bind(&values.note)
            .fetch_optional(&self.pool)
            .await?;

        Ok(phase)
    }

    pub async fn delete_phase(&self, case_id: Uuid, phase_id: Uuid) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND {} = $2",
            self.kind.phases_table(),
            self.kind.owner_column()
        );
        let result = sqlx::query(&sql)
            .bind(phase_id)
            .bind(case_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // Plan

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_plan(
        &self,
        case_id: Uuid,
        investigation_result: Option<&str>,
        exhibits: Option<&[String]>,
        next_investigation_purpose: Option<&str>,
        next_investigation_content: Option<&[String]>,
        participating_forces: Option<&[String]>,
    ) -> Result<CasePlan> {
        let sql = format!(
            "INSERT INTO {plans}
                ({owner}, investigation_result, exhibits, next_investigation_purpose,
                 next_investigation_content, participating_forces)
             VALUES ($1, $2, COALESCE($3, '[]'::jsonb), $4, COALESCE($5, '[]'::jsonb),
                     COALESCE($6, '[]'::jsonb))
             ON CONFLICT ({owner}) DO UPDATE SET
                investigation_result = COALESCE($2, {plans}.investigation_result),
                exhibits = COALESCE($3, {plans}.exhibits),
                next_investigation_purpose = COALESCE($4, {plans}.next_investigation_purpose),
                next_investigation_content = COALESCE($5, {plans}.next_investigation_content),
                participating_forces = COALESCE($6, {plans}.participating_forces),
                updated_at = NOW()
             RETURNING {columns}",
            plans = self.kind.plans_table(),
            owner = self.kind.owner_column(),
            columns = self.kind.plan_columns()
        );
        let plan = sqlx::query_as::<_, CasePlan>(&sql)
            .bind(case_id)
            .bind(investigation_result)
            .bind(exhibits.map(Json))
            .bind(next_investigation_purpose)
            .bind(next_investigation_content.map(Json))
            .bind(participating_forces.map(Json))
            .fetch_one(&self.pool)
            .await?;

        Ok(plan)
    }

    pub async fn find_plan(&self, case_id: Uuid) -> Result<Option<CasePlan>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.kind.plan_columns(),
            self.kind.plans_table(),
            self.kind.owner_column()
        );
        let plan = sqlx::query_as::<_, CasePlan>(&sql)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(plan)
    }

    // Reporting

    /// Record counts per status, created within `[from, to]`.
    pub async fn count_by_status(
        &self,
        user_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<StatusCount>> {
        let sql = format!(
            "SELECT status, COUNT(*) AS count FROM {}
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::timestamptz IS NULL OR created_at >= $2)
               AND ($3::timestamptz IS NULL OR created_at <= $3)
             GROUP BY status",
            self.kind.table()
        );
        let counts = sqlx::query_as::<_, StatusCount>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(counts)
    }
}

/// Deadline notifications reference `cases`, so the scan only reads cases.
#[async_trait]
impl DeadlineSource for CaseRepository {
    async fn find_active_deadlines(&self) -> Result<Vec<CaseDeadline>> {
        let deadlines = sqlx::query_as::<_, CaseDeadline>(
            "SELECT c.id AS case_id, c.name AS case_name, c.user_id AS user_id,
                    MAX(COALESCE(p.completed_at, p.end_date)) AS latest_end_date
             FROM cases c
             JOIN case_phases p ON p.case_id = c.id
             WHERE c.status = $1 AND c.user_id IS NOT NULL
             GROUP BY c.id, c.name, c.user_id
             HAVING bool_or(p.end_date IS NOT NULL)"
        )
        .bind(CaseStatus::InProgress.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(deadlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations};
    use chrono::Duration;

    use crate::notification::deadline::days_left;

    async fn test_pool() -> Option<PgPool> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                println!("Skipping database test: DATABASE_URL not set");
                return None;
            }
        };
        let pool = create_pool(&url, 2).await.unwrap();
        run_migrations(&pool).await.unwrap();
        Some(pool)
    }

    struct Owners {
        user_id: Uuid,
        template_id: Uuid,
    }

    async fn insert_owners(pool: &PgPool) -> Owners {
        let tag = Uuid::new_v4().simple().to_string();
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (phone, full_name, password_hash) VALUES ($1, 'Repo Test', 'x')
             RETURNING id",
        )
        .bind(format!("t{}", &tag[..20]))
        .fetch_one(pool)
        .await
        .unwrap();
        let template_id: Uuid =
            sqlx::query_scalar("INSERT INTO templates (title) VALUES ($1) RETURNING id")
                .bind(format!("repo-test-{}", &tag[..20]))
                .fetch_one(pool)
                .await
                .unwrap();

        Owners { user_id, template_id }
    }

    async fn cleanup(pool: &PgPool, owners: &Owners) {
        for table in ["cases", "sources"] {
            sqlx::query(&format!("DELETE FROM {} WHERE template_id = $1", table))
                .bind(owners.template_id)
                .execute(pool)
                .await
                .unwrap();
        }
        sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(owners.template_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(owners.user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn insert_case(
        repo: &CaseRepository,
        owners: &Owners,
        name: &str,
        status: CaseStatus,
        user_id: Option<Uuid>,
    ) -> Uuid {
        let mut tx = repo.pool.begin().await.unwrap();
        let case = repo
            .create_with_tx(
                &mut tx,
                &NewCase {
                    template_id: owners.template_id,
                    name,
                    description: None,
                    status,
                    crime_type: None,
                    applicable_law: None,
                    number_of_defendants: None,
                    user_id,
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        case.id
    }

    fn phase_values(
        order: i32,
        end_date: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> PhaseValues {
        PhaseValues {
            name: format!("Giai đoạn {}", order),
            description: None,
            order,
            start_date: Utc::now() - Duration::days(60),
            end_date,
            is_completed: completed_at.is_some(),
            completed_at,
            tasks: vec!["Lấy lời khai".to_string()],
            note: None,
        }
    }

    #[tokio::test]
    async fn test_find_active_deadlines_filters_and_aggregates() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = CaseRepository::new(pool.clone(), RecordKind::Case);
        let owners = insert_owners(&pool).await;
        let now = Utc::now();
        let future = Some(now + Duration::days(10));

        // Latest date comes from the completed phase even though its own end date is unset.
        let mixed = insert_case(&repo, &owners, "Mixed", CaseStatus::InProgress, Some(owners.user_id)).await;
        repo.insert_phase(mixed, &phase_values(1, Some(now - Duration::days(30)), None))
            .await
            .unwrap();
        repo.insert_phase(mixed, &phase_values(2, None, Some(now + Duration::days(5))))
            .await
            .unwrap();

        let pending = insert_case(&repo, &owners, "Pending", CaseStatus::Pending, Some(owners.user_id)).await;
        repo.insert_phase(pending, &phase_values(1, future, None)).await.unwrap();

        let completed =
            insert_case(&repo, &owners, "Completed", CaseStatus::Completed, Some(owners.user_id)).await;
        repo.insert_phase(completed, &phase_values(1, future, None)).await.unwrap();

        let unassigned = insert_case(&repo, &owners, "Unassigned", CaseStatus::InProgress, None).await;
        repo.insert_phase(unassigned, &phase_values(1, future, None)).await.unwrap();

        let undated = insert_case(&repo, &owners, "Undated", CaseStatus::InProgress, Some(owners.user_id)).await;
        repo.insert_phase(undated, &phase_values(1, None, None)).await.unwrap();

        let ours = [mixed, pending, completed, unassigned, undated];
        let deadlines: Vec<CaseDeadline> = repo
            .find_active_deadlines()
            .await
            .unwrap()
            .into_iter()
            .filter(|d| ours.contains(&d.case_id))
            .collect();

        cleanup(&pool, &owners).await;

        assert_eq!(deadlines.len(), 1, "{:?}", deadlines);
        let deadline = &deadlines[0];
        assert_eq!(deadline.case_id, mixed);
        assert_eq!(deadline.case_name, "Mixed");
        assert_eq!(deadline.user_id, owners.user_id);
        assert_eq!(days_left(deadline.latest_end_date, Utc::now()), 5);
    }

    #[tokio::test]
    async fn test_source_phases_and_plan_use_source_tables() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repo = CaseRepository::new(pool.clone(), RecordKind::Source);
        let owners = insert_owners(&pool).await;

        let source = insert_case(&repo, &owners, "Tin báo", CaseStatus::Pending, Some(owners.user_id)).await;
        assert!(repo.find_by_id(source).await.unwrap().is_some());
        assert_eq!(repo.next_phase_order(source).await.unwrap(), 1);

        let phase = repo
            .insert_phase(source, &phase_values(1, Some(Utc::now()), None))
            .await
            .unwrap();
        assert_eq!(phase.case_id, source);
        assert_eq!(repo.next_phase_order(source).await.unwrap(), 2);
        assert_eq!(repo.find_phases(source).await.unwrap().len(), 1);

        let forces = vec!["Công an xã".to_string()];
        let plan = repo
            .upsert_plan(source, Some("Đang xác minh"), None, None, None, Some(forces.as_slice()))
            .await
            .unwrap();
        assert_eq!(plan.case_id, source);
        let plan = repo
            .upsert_plan(source, None, None, Some("Làm rõ"), None, None)
            .await
            .unwrap();
        assert_eq!(plan.investigation_result.as_deref(), Some("Đang xác minh"));
        assert_eq!(plan.next_investigation_purpose.as_deref(), Some("Làm rõ"));
        assert_eq!(plan.participating_forces.0, forces);

        // The same id is not visible through the case tables.
        let cases = CaseRepository::new(pool.clone(), RecordKind::Case);
        assert!(cases.find_by_id(source).await.unwrap().is_none());

        assert_eq!(repo.delete(source).await.unwrap(), 1);
        assert!(repo.find_plan(source).await.unwrap().is_none());

        cleanup(&pool, &owners).await;
    }
}
