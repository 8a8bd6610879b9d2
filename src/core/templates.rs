//! Email template rendering

use crate::infrastructure::entities::EmailTemplate;
use minijinja::Environment;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Fills the `{{ placeholder }}` tokens of subject and body. Unknown
/// placeholders render empty.
pub fn render<S: Serialize>(
    template: &EmailTemplate,
    context: S,
) -> Result<RenderedEmail, minijinja::Error> {
    let env = Environment::new();
    let context = minijinja::Value::from_serialize(&context);

    Ok(RenderedEmail {
        subject: env.render_str(&template.subject, &context)?,
        body: env.render_str(&template.body, &context)?,
    })
}

pub fn check_syntax(source: &str) -> Result<(), minijinja::Error> {
    Environment::new().template_from_str(source).map(|_| ())
}
