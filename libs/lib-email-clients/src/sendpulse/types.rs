use serde::{Deserialize, Serialize};

/// Form body of `POST /oauth/access_token`.
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenRequest<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
}

/// `html` must already be base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub html: String,
    pub text: String,
    pub subject: String,
    pub from: Sender,
    pub to: Vec<Recipient>,
}

/// JSON body of `POST /smtp/emails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub email: Email,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_email_request_has_wire_shape() {
        let req = SendEmailRequest {
            email: Email {
                html: "PGI+aGk8L2I+".to_string(),
                text: "hi".to_string(),
                subject: "Report".to_string(),
                from: Sender {
                    name: "Vintex".to_string(),
                    email: "noreply@example.com".to_string(),
                },
                to: vec![Recipient {
                    email: "ops@example.com".to_string(),
                }],
            },
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "email": {
                    "html": "PGI+aGk8L2I+",
                    "text": "hi",
                    "subject": "Report",
                    "from": {"name": "Vintex", "email": "noreply@example.com"},
                    "to": [{"email": "ops@example.com"}]
                }
            })
        );
    }

    #[test]
    fn send_email_response_defaults_to_unconfirmed() {
        let resp: SendEmailResponse =
            serde_json::from_str(r#"{"result": true, "id": "msg-1"}"#).unwrap();
        assert!(resp.result);
        assert_eq!(resp.id.as_deref(), Some("msg-1"));

        let resp: SendEmailResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.result);
        assert!(resp.id.is_none());
    }

    #[test]
    fn token_response_tolerates_missing_optional_fields() {
        let resp: AccessTokenResponse =
            serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(resp.access_token, "abc");
        assert!(resp.expires_in.is_none());

        let resp: AccessTokenResponse = serde_json::from_str(
            r#"{"access_token": "abc", "token_type": "Bearer", "expires_in": 3600}"#,
        )
        .unwrap();
        assert_eq!(resp.token_type.as_deref(), Some("Bearer"));
        assert_eq!(resp.expires_in, Some(3600));
    }
}
