//! `{{variable}}`-style template rendering, grounded in the teacher's
//! `TemplateRenderer`.

use std::collections::HashMap;

use crate::error::{NotificationError, Result};
use crate::types::RenderedContent;

#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub subject: Option<String>,
    pub body: String,
    pub html_body: Option<String>,
}

pub struct TemplateRenderer {
    templates: HashMap<String, Template>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// A renderer pre-loaded with the single built-in template this
    /// workspace ships (spec §4.4.1).
    pub fn with_builtin_templates() -> Self {
        let mut renderer = Self::new();
        renderer.register(opening_notification_template());
        renderer
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn render(
        &self,
        template_id: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<RenderedContent> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| NotificationError::TemplateNotFound(template_id.to_string()))?;

        Ok(RenderedContent {
            subject: template.subject.as_ref().map(|s| render_string(s, data)),
            body: render_string(&template.body, data),
            html_body: template.html_body.as_ref().map(|s| render_string(s, data)),
        })
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_string(template: &str, data: &HashMap<String, serde_json::Value>) -> String {
    let mut result = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{{{key}}}}}");
        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        result = result.replace(&placeholder, &replacement);
    }
    result
}

/// The "your event is now open" notification, parameterized by
/// `{numero, name, venue, start_date, end_date, url}` per spec §4.4.1.
fn opening_notification_template() -> Template {
    Template {
        id: "opening_notification".to_string(),
        subject: Some("{{name}} est ouvert aux engagements".to_string()),
        body: "{{name}} ({{venue}}) est maintenant ouvert aux engagements, du {{start_date}} \
               au {{end_date}}. Inscrivez-vous : {{url}}"
            .to_string(),
        html_body: Some(
            "<p><strong>{{name}}</strong> ({{venue}}) est maintenant ouvert aux engagements, \
             du {{start_date}} au {{end_date}}.</p><p><a href=\"{{url}}\">S'inscrire</a></p>"
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_opening_notification_with_substitutions() {
        let renderer = TemplateRenderer::with_builtin_templates();
        let mut data = HashMap::new();
        data.insert("name".to_string(), serde_json::json!("Grand Prix de Paris"));
        data.insert("venue".to_string(), serde_json::json!("75001 Paris"));
        data.insert("start_date".to_string(), serde_json::json!("2026-06-05"));
        data.insert("end_date".to_string(), serde_json::json!("2026-06-07"));
        data.insert(
            "url".to_string(),
            serde_json::json!("https://www.ffe.com/concours/123456"),
        );

        let rendered = renderer.render("opening_notification", &data).unwrap();
        assert!(rendered.body.contains("Grand Prix de Paris"));
        assert!(rendered.html_body.unwrap().contains("S'inscrire"));
    }

    #[test]
    fn unknown_template_is_rejected() {
        let renderer = TemplateRenderer::new();
        let err = renderer.render("nope", &HashMap::new()).unwrap_err();
        assert!(matches!(err, NotificationError::TemplateNotFound(_)));
    }
}
