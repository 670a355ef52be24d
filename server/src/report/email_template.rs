use std::borrow::Cow;

use anyhow::Context;
use minijinja::{context, Environment};

use crate::error::AppResult;

use super::bundle::ReportBundle;

pub const REPORT_EMAIL_TEMPLATE: &str = include_str!("../../templates/report_template.html");

// The .html suffix turns on HTML auto-escaping.
const REPORT_TEMPLATE_NAME: &str = "report_template.html";

const TEXT_WIDTH: usize = 80;

pub struct ReportTemplate {
    source: Cow<'static, str>,
}

impl ReportTemplate {
    pub fn builtin() -> Self {
        Self {
            source: Cow::Borrowed(REPORT_EMAIL_TEMPLATE),
        }
    }

    /// Reads and syntax-checks a template override.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read report template {path}"))?;
        Environment::new().template_from_str(&source)?;

        Ok(Self {
            source: Cow::Owned(source),
        })
    }

    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(path) => {
                tracing::info!("Using report template {}", path);
                Self::from_file(path)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn render(&self, bundle: &ReportBundle, generated_at: &str) -> AppResult<String> {
        let mut env = Environment::new();
        env.add_template(REPORT_TEMPLATE_NAME, &self.source)?;
        let template = env.get_template(REPORT_TEMPLATE_NAME)?;

        let html = template.render(context! {
            yesterday_payments => bundle.yesterday_payments,
            last_month_payments => bundle.last_month_payments,
            yesterday_users => bundle.yesterday_users,
            total_users => bundle.total_users,
            yesterday_reports => bundle.yesterday_reports,
            total_reports => bundle.total_reports,
            generated_at,
        })?;

        Ok(html)
    }
}

pub fn plain_text_fallback(html: &str) -> String {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
}
