use std::sync::Arc;

use chrono::Utc;
use lib_email_clients::sendpulse::{Email, Recipient, Sender};
use lib_utils::b64::b64_encode;
use sea_orm::DatabaseConnection;

use crate::{
    cron_time_utils::parse_timezone,
    db_core::{self, queries::ReportQueryCtrl},
    email_client::SendPulseClient,
    error::AppResult,
    server_config::ServerConfig,
    HttpClient,
};

use super::{
    bundle::ReportBundle,
    email_template::{plain_text_fallback, ReportTemplate},
};

/// Runs the report pipeline: query, shape, authenticate, render, send.
pub struct DailyReportMailer {
    cfg: Arc<ServerConfig>,
    email_client: SendPulseClient,
    template: ReportTemplate,
}

impl DailyReportMailer {
    pub fn new(cfg: Arc<ServerConfig>, http_client: HttpClient) -> AppResult<Self> {
        let template = ReportTemplate::load(cfg.report.template_path.as_deref())?;
        let email_client = SendPulseClient::new(http_client, &cfg);

        Ok(Self {
            cfg,
            email_client,
            template,
        })
    }

    pub async fn send_report(&self) -> AppResult<()> {
        let bundle = self.collect().await?;
        self.deliver(&bundle).await
    }

    /// Opens a fresh connection, runs the queries and closes it again.
    pub async fn collect(&self) -> AppResult<ReportBundle> {
        let conn = db_core::connect(&self.cfg).await?;
        let result = self.collect_from(&conn).await;

        if let Err(e) = conn.close().await {
            tracing::warn!("Could not close database connection: {:?}", e);
        }

        result
    }

    pub async fn collect_from(&self, conn: &DatabaseConnection) -> AppResult<ReportBundle> {
        let bundle =
            ReportQueryCtrl::collect_bundle(conn, self.cfg.report.day_offset_days).await?;

        let missing = bundle
            .missing_slots()
            .iter()
            .map(|query| query.slot_name())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            tracing::warn!("Report has no data for {}", missing.join(", "));
        }
        tracing::debug!("Report bundle: {:?}", bundle);

        Ok(bundle)
    }

    /// Fetches a token, renders the bundle and posts the email. A failed
    /// token request ends the run before anything is sent.
    pub async fn deliver(&self, bundle: &ReportBundle) -> AppResult<()> {
        let token = self.email_client.fetch_access_token().await?;
        let html = self.template.render(bundle, &self.generated_at())?;
        let email = self.construct_email(&html);

        tracing::info!(
            "Sending report to {}",
            self.cfg.report.recipients.join(", ")
        );
        self.email_client.send_email(&token, email).await
    }

    fn construct_email(&self, html: &str) -> Email {
        let report = &self.cfg.report;
        let text = match &report.text {
            Some(text) => text.clone(),
            None => plain_text_fallback(html),
        };

        Email {
            html: b64_encode(html),
            text,
            subject: report.subject.clone(),
            from: Sender {
                name: report.sender_name.clone(),
                email: self.cfg.from_email.clone(),
            },
            to: report
                .recipients
                .iter()
                .map(|email| Recipient {
                    email: email.clone(),
                })
                .collect(),
        }
    }

    fn generated_at(&self) -> String {
        let now = Utc::now();
        match parse_timezone(&self.cfg.report.timezone) {
            Ok(tz) => now.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string(),
            Err(_) => now.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}
