pub const ACCESS_TOKEN_PATH: &str = "/oauth/access_token";
pub const SMTP_EMAILS_PATH: &str = "/smtp/emails";

pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

/// Joins an API base such as `https://api.sendpulse.com/` with one of the
/// endpoint paths above without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
