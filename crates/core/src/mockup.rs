//! Screen mockup pipeline.
//!
//! Phase one asks the model for the list of screens an app needs; phase two
//! asks for one standalone HTML+CSS mockup per screen. Mockups are
//! best-effort: a screen whose generation fails is logged and left out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::ModelError;
use crate::model::{call_model, strip_code_fences, Instructions, ModelClient, ModelReply};
use crate::sanitize::slugify;

/// Characters of each specification document included in a prompt.
pub const MAX_SPEC_CHARS: usize = 6_000;

/// Errors from the mockup pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MockupError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("screen analysis returned no usable screen list: {0}")]
    InvalidScreens(String),

    #[error("mockup reply for screen '{0}' contained no HTML")]
    NoHtml(String),
}

/// Specification documents a mockup is drawn from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupContext {
    pub overview: Value,
    pub design: Value,
    #[serde(default)]
    pub technical: Option<Value>,
    #[serde(default)]
    pub use_mock_data: bool,
}

impl MockupContext {
    /// Names of required documents that are missing or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.overview) {
            missing.push("overview");
        }
        if is_blank(&self.design) {
            missing.push("design");
        }
        missing
    }

    fn spec_block(&self) -> String {
        let mut block = format!(
            "Product overview:\n{}\n\nDesign specification:\n{}\n",
            excerpt(&self.overview),
            excerpt(&self.design)
        );
        if let Some(technical) = self.technical.as_ref().filter(|t| !is_blank(t)) {
            block.push_str(&format!(
                "\nTechnical specification:\n{}\n",
                excerpt(technical)
            ));
        }
        block
    }
}

/// One screen identified by the analysis phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,
    pub name: String,
    pub description: String,
    pub device_type: String,
    pub order: u64,
}

/// A generated mockup: the screen plus its HTML document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mockup {
    #[serde(flatten)]
    pub screen: Screen,
    pub html: String,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct MockupBatch {
    /// Successful mockups ordered by `screen.order`.
    pub mockups: Vec<Mockup>,
    /// Ids of screens whose generation failed.
    pub failed: Vec<String>,
}

/// Instructions for the screen analysis phase.
pub fn analysis_instructions(context: &MockupContext) -> Instructions {
    let system = "You are a senior product designer. You break an application down into the \
                  screens a user interface needs.";
    let developer = "Respond with a single JSON object of the form {\"screens\": [{\"id\": \
                     \"kebab-case-id\", \"name\": \"Screen name\", \"description\": \"What the \
                     screen shows and does\", \"deviceType\": \"web\" | \"mobile\", \"order\": \
                     1}]}. List between 5 and 8 screens, ordered the way a user meets them. \
                     No Markdown, no commentary.";
    let user = format!(
        "Identify the key screens for this application.\n\n{}",
        context.spec_block()
    );
    Instructions::new(system, developer, user)
}

/// Instructions for one screen's HTML mockup.
pub fn mockup_instructions(context: &MockupContext, screen: &Screen) -> Instructions {
    let system = "You are a senior UI engineer. You produce polished, self-contained HTML \
                  mockups that follow a given design system exactly.";
    let developer = "Respond with a single JSON object of the form {\"html\": \"<!DOCTYPE \
                     html>...\"}. The HTML must be a complete standalone document with all CSS \
                     inline in a <style> element, no external scripts, fonts or images.";
    let data_rule = if context.use_mock_data {
        "Populate the screen with realistic mock data (names, numbers, dates) so it looks like a \
         live product."
    } else {
        "Use neutral placeholder content rather than realistic data."
    };
    let user = format!(
        "Create the mockup for this screen.\n\nScreen: {} ({})\nDevice: {}\nPurpose: {}\n\n{}\n\n{}",
        screen.name,
        screen.id,
        screen.device_type,
        screen.description,
        data_rule,
        context.spec_block()
    );
    Instructions::new(system, developer, user)
}

/// Turn the analysis reply into normalized screens.
///
/// The only structural requirement is that `screens` is an array; entries
/// without a name or id are skipped.
pub fn parse_screens(reply: ModelReply) -> Result<Vec<Screen>, MockupError> {
    let doc = match reply {
        ModelReply::Json(doc) => doc,
        ModelReply::Unparseable(_) => {
            return Err(MockupError::InvalidScreens("reply was not JSON".into()))
        }
    };
    let entries = doc
        .get("screens")
        .and_then(Value::as_array)
        .ok_or_else(|| MockupError::InvalidScreens("'screens' is not an array".into()))?;

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| normalize_screen(i, entry))
        .collect())
}

/// Normalize one screen entry; `index` is its position in the list.
///
/// The id is slugified (falling back to `screen-N`), `deviceType` defaults
/// to `web` and `order` to the 1-based position.
pub fn normalize_screen(index: usize, entry: &Value) -> Option<Screen> {
    let obj = entry.as_object()?;
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let name = text("name").or_else(|| text("id"))?.to_string();
    let id = Some(slugify(text("id").unwrap_or(&name)))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("screen-{}", index + 1));
    Some(Screen {
        id,
        name,
        description: text("description").unwrap_or_default().to_string(),
        device_type: text("deviceType").unwrap_or("web").to_string(),
        order: obj
            .get("order")
            .and_then(Value::as_u64)
            .unwrap_or(index as u64 + 1),
    })
}

/// Pull an HTML document out of a mockup reply.
pub fn extract_html(reply: &ModelReply) -> Option<String> {
    let raw = match reply {
        ModelReply::Json(Value::Object(obj)) => obj.get("html").and_then(Value::as_str)?,
        ModelReply::Json(Value::String(s)) => s.as_str(),
        ModelReply::Json(_) => return None,
        ModelReply::Unparseable(text) => text.as_str(),
    };
    let html = strip_code_fences(raw).trim();
    if html.contains('<') {
        Some(html.to_string())
    } else {
        None
    }
}

/// Phase one: ask for the screen list.
pub async fn analyze_screens(
    client: &dyn ModelClient,
    context: &MockupContext,
) -> Result<Vec<Screen>, MockupError> {
    let reply = call_model(client, &analysis_instructions(context)).await?;
    let screens = parse_screens(reply)?;
    info!(screens = screens.len(), "screen analysis complete");
    Ok(screens)
}

/// Phase two for a single screen. One model call, no repair.
pub async fn generate_mockup(
    client: &dyn ModelClient,
    context: &MockupContext,
    screen: Screen,
) -> Result<Mockup, MockupError> {
    let reply = call_model(client, &mockup_instructions(context, &screen)).await?;
    match extract_html(&reply) {
        Some(html) => Ok(Mockup { screen, html }),
        None => Err(MockupError::NoHtml(screen.id)),
    }
}

/// Phase two for every screen, at most `concurrency` calls in flight.
pub async fn generate_mockups(
    client: Arc<dyn ModelClient>,
    context: Arc<MockupContext>,
    screens: Vec<Screen>,
    concurrency: usize,
) -> MockupBatch {
    let limit = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for screen in screens {
        let client = Arc::clone(&client);
        let context = Arc::clone(&context);
        let limit = Arc::clone(&limit);
        tasks.spawn(async move {
            let _permit = limit.acquire_owned().await.ok();
            let id = screen.id.clone();
            (id, generate_mockup(client.as_ref(), &context, screen).await)
        });
    }

    let mut batch = MockupBatch::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(mockup))) => batch.mockups.push(mockup),
            Ok((id, Err(err))) => {
                warn!(screen = %id, error = %err, "mockup generation failed, skipping screen");
                batch.failed.push(id);
            }
            Err(err) => warn!(error = %err, "mockup task panicked"),
        }
    }

    batch.mockups.sort_by_key(|m| m.screen.order);
    batch
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

fn excerpt(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(MAX_SPEC_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(use_mock_data: bool) -> MockupContext {
        MockupContext {
            overview: json!({"ideaSummary": "Recipe sharing app"}),
            design: json!({"visualStyleGuide": {"primary": "#ff6600"}}),
            technical: None,
            use_mock_data,
        }
    }

    fn screen(id: &str, order: u64) -> Screen {
        Screen {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            device_type: "web".into(),
            order,
        }
    }

    #[test]
    fn missing_documents_are_reported() {
        let ctx: MockupContext =
            serde_json::from_value(json!({"overview": {}, "design": null})).unwrap();
        assert_eq!(ctx.missing_fields(), vec!["overview", "design"]);
        assert!(context(false).missing_fields().is_empty());
    }

    #[test]
    fn analysis_prompt_includes_specs() {
        let instructions = analysis_instructions(&context(false));
        assert!(instructions.user.contains("Recipe sharing app"));
        assert!(instructions.user.contains("#ff6600"));
        assert!(!instructions.user.contains("Technical specification"));
        assert!(instructions.developer.contains("between 5 and 8 screens"));
    }

    #[test]
    fn mock_data_flag_changes_prompt() {
        let s = screen("home", 1);
        assert!(mockup_instructions(&context(true), &s)
            .user
            .contains("realistic mock data"));
        assert!(mockup_instructions(&context(false), &s)
            .user
            .contains("placeholder content"));
    }

    #[test]
    fn screens_are_normalized() {
        let reply = ModelReply::Json(json!({"screens": [
            {"id": "Home Feed", "name": "Home", "description": "Latest recipes", "deviceType": "mobile", "order": 2},
            {"name": "Recipe Detail"},
            {"description": "no name or id"},
            "Settings",
        ]}));
        let screens = parse_screens(reply).unwrap();
        assert_eq!(screens.len(), 2);
        assert_eq!(screens[0].id, "home-feed");
        assert_eq!(screens[0].device_type, "mobile");
        assert_eq!(screens[0].order, 2);
        assert_eq!(screens[1].id, "recipe-detail");
        assert_eq!(screens[1].device_type, "web");
        assert_eq!(screens[1].order, 2);
    }

    #[test]
    fn screens_must_be_an_array() {
        assert!(matches!(
            parse_screens(ModelReply::Json(json!({"screens": "home"}))),
            Err(MockupError::InvalidScreens(_))
        ));
        assert!(matches!(
            parse_screens(ModelReply::Unparseable("sorry".into())),
            Err(MockupError::InvalidScreens(_))
        ));
    }

    #[test]
    fn html_extraction_variants() {
        let doc = "<!DOCTYPE html><html><body>Hi</body></html>";
        assert_eq!(
            extract_html(&ModelReply::Json(json!({"html": doc}))).as_deref(),
            Some(doc)
        );
        let fenced = format!("```html\n{}\n```", doc);
        assert_eq!(
            extract_html(&ModelReply::Unparseable(fenced)).as_deref(),
            Some(doc)
        );
        assert_eq!(extract_html(&ModelReply::Json(json!({"html": "plain"}))), None);
        assert_eq!(extract_html(&ModelReply::Json(json!([doc]))), None);
    }

    #[test]
    fn mockup_serializes_flat() {
        let mockup = Mockup {
            screen: screen("home", 1),
            html: "<html></html>".into(),
        };
        let json = serde_json::to_value(&mockup).unwrap();
        assert_eq!(json["id"], "home");
        assert_eq!(json["deviceType"], "web");
        assert_eq!(json["html"], "<html></html>");
    }
}
