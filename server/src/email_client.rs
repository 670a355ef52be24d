use lib_email_clients::sendpulse::{
    endpoint, AccessTokenRequest, AccessTokenResponse, Email, SendEmailRequest,
    SendEmailResponse, ACCESS_TOKEN_PATH, SMTP_EMAILS_PATH,
};
use reqwest::StatusCode;

use crate::{
    error::{AppResult, ReportError},
    server_config::ServerConfig,
    HttpClient,
};

/// Bearer token for one run. Never logged, never kept past the run.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

pub struct SendPulseClient {
    http_client: HttpClient,
    api_url: String,
    grant_type: String,
    client_id: String,
    client_secret: String,
}

impl SendPulseClient {
    pub fn new(http_client: HttpClient, cfg: &ServerConfig) -> SendPulseClient {
        SendPulseClient {
            http_client,
            api_url: cfg.sendpulse_api_url.clone(),
            grant_type: cfg.sendpulse_grant_type.clone(),
            client_id: cfg.sendpulse_client_id.clone(),
            client_secret: cfg.sendpulse_client_secret.clone(),
        }
    }

    pub async fn fetch_access_token(&self) -> AppResult<AccessToken> {
        let resp = self
            .http_client
            .post(endpoint(&self.api_url, ACCESS_TOKEN_PATH))
            .form(&AccessTokenRequest {
                grant_type: &self.grant_type,
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Error receiving token: {} {}", status, body);
            return Err(ReportError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token = resp.json::<AccessTokenResponse>().await?;
        tracing::info!(
            "Access token received, expires in {}s",
            token
                .expires_in
                .map_or_else(|| "?".to_string(), |s| s.to_string())
        );

        Ok(AccessToken(token.access_token))
    }

    /// Posts one email. A non-200 answer is returned as a delivery error and
    /// is not retried.
    pub async fn send_email(&self, token: &AccessToken, email: Email) -> AppResult<()> {
        let recipients = email.to.len();
        let resp = self
            .http_client
            .post(endpoint(&self.api_url, SMTP_EMAILS_PATH))
            .bearer_auth(token.secret())
            .json(&SendEmailRequest { email })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            tracing::error!("Error sending email: {} {}", status, body);
            return Err(ReportError::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<SendEmailResponse>(&body) {
            Ok(SendEmailResponse { result: false, .. }) => {
                tracing::warn!("Email accepted without a positive result: {}", body)
            }
            Ok(SendEmailResponse { id: Some(id), .. }) => {
                tracing::info!("Email {} sent to {} recipients", id, recipients)
            }
            _ => tracing::info!("Email sent to {} recipients", recipients),
        }

        Ok(())
    }
}
