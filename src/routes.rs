use crate::{
    admin::admin_authorization,
    auth::{
        auth_dto::{AuthResponse, LoginRequest, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest},
        auth_handlers,
    },
    case::{
        case_dto::{
            CaseFieldInput, CreateCaseRequest, CreatePhaseRequest, PhaseTaskInput,
            UpdateCaseFieldInput, UpdateCaseGroupInput, UpdateCaseRequest, UpdatePhaseRequest,
            UpsertPlanRequest,
        },
        case_handlers,
        case_models::{
            Case, CaseDetail, CaseField, CaseGroupDetail, CaseListItem, CasePhase, CasePlan,
            CaseStatus,
        },
    },
    dto::SortOrder,
    middleware::auth_middleware,
    notification::{
        deadline::DeadlineTier,
        deadline_scheduler::ScanReport,
        notification_dto::{
            BroadcastRequest, BroadcastResponse, CreateNotificationRequest, MarkAllReadResponse,
            UnreadCountResponse,
        },
        notification_handlers,
        notification_models::{Notification, NotificationType},
    },
    report::{
        report_dto::{CaseDocumentData, CaseStatistics},
        report_handlers,
    },
    source::source_handlers,
    state::AppState,
    template::{
        template_dto::{CreateTemplateRequest, TemplateFieldInput, TemplateGroupInput, UpdateTemplateRequest},
        template_handlers,
        template_models::{Template, TemplateDetail, TemplateField, TemplateGroupDetail},
    },
    user::{
        user_dto::{
            AdminUpdateUserRequest, CreateUserRequest, UpdateProfileRequest, UpdatePushTokensRequest,
        },
        user_handlers,
        user_models::{Role, UserOption, UserResponse},
    },
};
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth_handlers::register,
        auth_handlers::login,
        auth_handlers::refresh_token,
        auth_handlers::logout,
        user_handlers::get_current_user,
        user_handlers::update_current_user,
        user_handlers::update_push_tokens,
        user_handlers::select_users,
        user_handlers::create_user,
        user_handlers::get_all_users,
        user_handlers::get_user_by_id,
        user_handlers::admin_update_user,
        user_handlers::delete_user,
        template_handlers::list_templates,
        template_handlers::get_template,
        template_handlers::create_template,
        template_handlers::update_template,
        template_handlers::delete_template,
        case_handlers::create_case,
        case_handlers::list_cases,
        case_handlers::get_case,
        case_handlers::update_case,
        case_handlers::delete_case,
        case_handlers::add_phase,
        case_handlers::list_phases,
        case_handlers::update_phase,
        case_handlers::delete_phase,
        case_handlers::upsert_plan,
        case_handlers::get_plan,
        source_handlers::create_source,
        source_handlers::list_sources,
        source_handlers::get_source,
        source_handlers::update_source,
        source_handlers::delete_source,
        source_handlers::add_source_phase,
        source_handlers::list_source_phases,
        source_handlers::update_source_phase,
        source_handlers::delete_source_phase,
        source_handlers::upsert_source_plan,
        source_handlers::get_source_plan,
        notification_handlers::get_notifications,
        notification_handlers::get_unread_count,
        notification_handlers::notification_stream,
        notification_handlers::mark_notification_read,
        notification_handlers::mark_all_notifications_read,
        notification_handlers::delete_notification,
        notification_handlers::create_notification,
        notification_handlers::broadcast_notification,
        notification_handlers::run_deadline_check,
        report_handlers::case_statistics,
        report_handlers::case_document_data,
        report_handlers::export_case_report,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            RefreshTokenRequest,
            RefreshTokenResponse,
            Role,
            UserResponse,
            UserOption,
            CreateUserRequest,
            UpdateProfileRequest,
            UpdatePushTokensRequest,
            AdminUpdateUserRequest,
            Template,
            TemplateDetail,
            TemplateGroupDetail,
            TemplateField,
            CreateTemplateRequest,
            UpdateTemplateRequest,
            TemplateGroupInput,
            TemplateFieldInput,
            Case,
            CaseStatus,
            CaseListItem,
            CaseDetail,
            CaseGroupDetail,
            CaseField,
            CasePhase,
            CasePlan,
            CreateCaseRequest,
            CaseFieldInput,
            UpdateCaseRequest,
            UpdateCaseGroupInput,
            UpdateCaseFieldInput,
            CreatePhaseRequest,
            UpdatePhaseRequest,
            PhaseTaskInput,
            UpsertPlanRequest,
            Notification,
            NotificationType,
            DeadlineTier,
            ScanReport,
            UnreadCountResponse,
            MarkAllReadResponse,
            CreateNotificationRequest,
            BroadcastRequest,
            BroadcastResponse,
            CaseStatistics,
            CaseDocumentData,
            SortOrder,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "Current user endpoints"),
        (name = "templates", description = "Case form templates"),
        (name = "cases", description = "Cases, phases and plans"),
        (name = "sources", description = "Sources under verification, with phases and plans"),
        (name = "notifications", description = "Notification endpoints"),
        (name = "reports", description = "Reporting endpoints"),
        (name = "admin", description = "Admin-only endpoints")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login))
        .route("/refresh", post(auth_handlers::refresh_token))
        .route("/logout", post(auth_handlers::logout));

    // Protected routes (auth required)
    let user_routes = Router::new()
        .route(
            "/me",
            get(user_handlers::get_current_user).put(user_handlers::update_current_user),
        )
        .route("/me/push-tokens", put(user_handlers::update_push_tokens))
        .route("/all/select", get(user_handlers::select_users));

    let template_routes = Router::new()
        .route("/", get(template_handlers::list_templates))
        .route("/:id", get(template_handlers::get_template));

    let case_routes = Router::new()
        .route("/", get(case_handlers::list_cases).post(case_handlers::create_case))
        .route(
            "/:id",
            get(case_handlers::get_case)
                .put(case_handlers::update_case)
                .delete(case_handlers::delete_case),
        )
        .route(
            "/:id/phases",
            get(case_handlers::list_phases).post(case_handlers::add_phase),
        )
        .route(
            "/:id/phases/:phase_id",
            put(case_handlers::update_phase).delete(case_handlers::delete_phase),
        )
        .route(
            "/:id/plan",
            get(case_handlers::get_plan).put(case_handlers::upsert_plan),
        );

    let source_routes = Router::new()
        .route("/", get(source_handlers::list_sources).post(source_handlers::create_source))
        .route(
            "/:id",
            get(source_handlers::get_source)
                .put(source_handlers::update_source)
                .delete(source_handlers::delete_source),
        )
        .route(
            "/:id/phases",
            get(source_handlers::list_source_phases).post(source_handlers::add_source_phase),
        )
        .route(
            "/:id/phases/:phase_id",
            put(source_handlers::update_source_phase).delete(source_handlers::delete_source_phase),
        )
        .route(
            "/:id/plan",
            get(source_handlers::get_source_plan).put(source_handlers::upsert_source_plan),
        );

    let notification_routes = Router::new()
        .route("/", get(notification_handlers::get_notifications))
        .route("/unread-count", get(notification_handlers::get_unread_count))
        .route("/stream", get(notification_handlers::notification_stream))
        .route("/read-all", patch(notification_handlers::mark_all_notifications_read))
        .route("/:id/read", patch(notification_handlers::mark_notification_read))
        .route("/:id", axum::routing::delete(notification_handlers::delete_notification));

    let report_routes = Router::new()
        .route("/case-statistics", get(report_handlers::case_statistics))
        .route(
            "/cases/:id/document-data",
            get(report_handlers::case_document_data),
        )
        .route("/cases/:id/export", get(report_handlers::export_case_report));

    // Admin routes; admin check runs after the token check
    let admin_routes = Router::new()
        .route(
            "/users",
            get(user_handlers::get_all_users).post(user_handlers::create_user),
        )
        .route(
            "/users/:user_id",
            get(user_handlers::get_user_by_id)
                .put(user_handlers::admin_update_user)
                .delete(user_handlers::delete_user),
        )
        .route("/templates", post(template_handlers::create_template))
        .route(
            "/templates/:id",
            put(template_handlers::update_template).delete(template_handlers::delete_template),
        )
        .route("/notifications", post(notification_handlers::create_notification))
        .route(
            "/notifications/broadcast",
            post(notification_handlers::broadcast_notification),
        )
        .route(
            "/notifications/deadline-check",
            post(notification_handlers::run_deadline_check),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_authorization,
        ));

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/templates", template_routes)
        .nest("/cases", case_routes)
        .nest("/sources", source_routes)
        .nest("/notifications", notification_routes)
        .nest("/reports", report_routes)
        .nest("/admin", admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::create_access_token,
        state::test_config,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let (tx, _rx) = broadcast::channel(8);
        create_router(AppState::new(pool, Arc::new(config), tx))
    }

    async fn send(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in [
            "/api/cases",
            "/api/sources",
            "/api/sources/00000000-0000-0000-0000-000000000000/phases",
            "/api/users/all/select?q=an",
            "/api/notifications",
            "/api/notifications/unread-count",
            "/api/reports/case-statistics",
            "/api/reports/cases/00000000-0000-0000-0000-000000000000/export",
            "/api/users/me",
        ] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            assert_eq!(send(request).await, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let request = Request::builder()
            .uri("/api/cases")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_staff_cannot_reach_admin_routes() {
        let config = test_config();
        let token = create_access_token(Uuid::new_v4(), "0900000000", "STAFF", &config.jwt_secret, 15)
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/admin/notifications/deadline-check")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_staff_cannot_create_users() {
        let config = test_config();
        let token = create_access_token(Uuid::new_v4(), "0900000000", "STAFF", &config.jwt_secret, 15)
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/admin/users")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"full_name":"Lê Văn C","phone":"0987654321","password":"secret1"}"#,
            ))
            .unwrap();
        assert_eq!(send(request).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let request = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await, StatusCode::OK);
    }
}
