use crate::{
    auth::auth_repository::RefreshTokenRepository,
    auth::auth_service::AuthService,
    case::{case_models::RecordKind, case_repository::CaseRepository, case_service::CaseService},
    db::DbPool,
    notification::{
        deadline_scheduler::DeadlineScanJob,
        notification_models::Notification,
        notification_repository::NotificationRepository,
        notification_service::NotificationService,
        notifier::Notifier,
        push::{ExpoPushSender, FcmPushSender, MultiChannelPush, PushSender},
    },
    report::report_service::ReportService,
    template::{template_repository::TemplateRepository, template_service::TemplateService},
    user::{user_repository::UserRepository, user_service::UserService},
};
use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use std::{str::FromStr, sync::Arc};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub notification_tx: broadcast::Sender<Notification>,
    pub user_repository: UserRepository,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub template_service: TemplateService,
    pub case_service: CaseService,
    pub source_service: CaseService,
    pub notification_service: NotificationService,
    pub report_service: ReportService,
    pub deadline_job: Arc<DeadlineScanJob>,
}

impl AppState {
    /// Wires repositories, services and push channels around one pool.
    pub fn new(
        db: DbPool,
        config: Arc<Config>,
        notification_tx: broadcast::Sender<Notification>,
    ) -> Self {
        let user_repository = UserRepository::new(db.clone());
        let refresh_token_repository = RefreshTokenRepository::new(db.clone());
        let template_repository = TemplateRepository::new(db.clone());
        let case_repository = CaseRepository::new(db.clone(), RecordKind::Case);
        let source_repository = CaseRepository::new(db.clone(), RecordKind::Source);
        let notification_repository = NotificationRepository::new(db.clone());

        let http = reqwest::Client::new();
        let expo = ExpoPushSender::new(http.clone(), config.expo_push_url.clone());
        let mut channels: Vec<Arc<dyn PushSender>> = vec![Arc::new(expo.clone())];
        match &config.fcm_server_key {
            Some(key) => {
                let url = config
                    .fcm_send_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FCM_SEND_URL.to_string());
                channels.push(Arc::new(FcmPushSender::new(http, url, key.clone())));
            }
            None => tracing::info!("FCM_SERVER_KEY not set, push goes through Expo only"),
        }

        let notifier = Notifier::new(
            Arc::new(notification_repository.clone()),
            Arc::new(user_repository.clone()),
            Arc::new(MultiChannelPush::new(channels)),
            notification_tx.clone(),
        );
        let deadline_job = Arc::new(DeadlineScanJob::new(
            Arc::new(case_repository.clone()),
            notifier.clone(),
            config.local_offset(),
        ));

        let auth_service = AuthService::new(
            db.clone(),
            user_repository.clone(),
            refresh_token_repository,
            config.clone(),
        );
        let user_service = UserService::new(user_repository.clone());
        let template_service = TemplateService::new(db.clone(), template_repository);
        let case_service = CaseService::new(
            db.clone(),
            case_repository.clone(),
            user_repository.clone(),
            template_service.clone(),
        );
        let source_service = CaseService::new(
            db,
            source_repository,
            user_repository.clone(),
            template_service.clone(),
        );
        let notification_service = NotificationService::new(
            notification_repository,
            user_repository.clone(),
            notifier,
            expo,
            deadline_job.clone(),
        );
        let report_service = ReportService::new(
            case_repository,
            case_service.clone(),
            config.local_offset(),
            config.report_template_path.clone(),
        );

        Self {
            config,
            notification_tx,
            user_repository,
            auth_service,
            user_service,
            template_service,
            case_service,
            source_service,
            notification_service,
            report_service,
            deadline_job,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub host: String,
    pub port: u16,
    pub deadline_cron: String,
    pub report_utc_offset_hours: i32,
    pub expo_push_url: String,
    pub fcm_send_url: Option<String>,
    pub fcm_server_key: Option<String>,
    pub registration_code: Option<String>,
    pub report_template_path: Option<String>,
}

pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
pub const DEFAULT_FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";
pub const DEFAULT_DEADLINE_CRON: &str = "0 0 9 * * *";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_minutes: parse_or("JWT_EXPIRATION_MINUTES", 15)?,
            refresh_token_days: parse_or("REFRESH_TOKEN_DAYS", 7)?,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 3000)?,
            deadline_cron: std::env::var("DEADLINE_CRON")
                .unwrap_or_else(|_| DEFAULT_DEADLINE_CRON.to_string()),
            report_utc_offset_hours: parse_or("REPORT_UTC_OFFSET_HOURS", 7)?,
            expo_push_url: std::env::var("EXPO_PUSH_URL")
                .unwrap_or_else(|_| DEFAULT_EXPO_PUSH_URL.to_string()),
            fcm_send_url: optional("FCM_SEND_URL"),
            fcm_server_key: optional("FCM_SERVER_KEY"),
            registration_code: optional("REGISTRATION_CODE"),
            report_template_path: optional("REPORT_TEMPLATE_PATH"),
        })
    }

    /// Offset used to render dates in notification bodies and reports.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.report_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a valid value: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/case_tracker_test".to_string(),
        db_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        access_token_minutes: 15,
        refresh_token_days: 7,
        host: "127.0.0.1".to_string(),
        port: 3000,
        deadline_cron: DEFAULT_DEADLINE_CRON.to_string(),
        report_utc_offset_hours: 7,
        expo_push_url: DEFAULT_EXPO_PUSH_URL.to_string(),
        fcm_send_url: None,
        fcm_server_key: None,
        registration_code: None,
        report_template_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_offset_and_bind_addr() {
        let config = test_config();
        assert_eq!(config.local_offset().local_minus_utc(), 7 * 3600);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let mut config = test_config();
        config.report_utc_offset_hours = 30;
        assert_eq!(config.local_offset().local_minus_utc(), 0);
    }
}
