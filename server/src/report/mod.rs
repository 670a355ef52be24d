mod bundle;
mod email_template;
mod mailer;
mod shaper;
mod tasks;

pub(crate) use bundle::*;
pub(crate) use mailer::*;
pub(crate) use shaper::*;
pub(crate) use tasks::*;
