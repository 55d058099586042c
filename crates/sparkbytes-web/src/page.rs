//! Pieces shared by every rendered page: layout, flash transport and form
//! field access.

use axum::response::Redirect;
use serde::Deserialize;
use sparkbytes_core::model::DIETARY_OPTIONS;
use sparkbytes_core::mutation::{Flash, FlashKind};

use crate::AppState;

pub struct Layout {
    pub signed_in: bool,
    pub flash: Option<Flash>,
    pub flash_ms: u64,
}

impl Layout {
    pub fn new(state: &AppState, signed_in: bool, flash: Option<Flash>) -> Self {
        Self {
            signed_in,
            flash,
            flash_ms: state.config.ui.flash_ms,
        }
    }
}

/// `?flash=...&flash_kind=success|error` carried across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub flash: Option<String>,
    pub flash_kind: Option<String>,
}

impl FlashQuery {
    pub fn into_flash(self) -> Option<Flash> {
        let message = self.flash.filter(|m| !m.trim().is_empty())?;
        let kind = self
            .flash_kind
            .as_deref()
            .and_then(|k| k.parse().ok())
            .unwrap_or(FlashKind::Success);
        Some(Flash { message, kind })
    }
}

/// Redirect to `path` with a flash attached.
pub fn redirect_with(path: &str, flash: &Flash) -> Redirect {
    let query = serde_urlencoded::to_string([
        ("flash", flash.message.as_str()),
        ("flash_kind", flash.kind.as_str()),
    ])
    .unwrap_or_default();
    Redirect::to(&format!("{path}?{query}"))
}

/// Submitted form fields in order, keeping repeated keys (checkbox groups).
pub struct FormFields(pub Vec<(String, String)>);

impl FormFields {
    pub fn get(&self, name: &str) -> String {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    pub fn all(&self, name: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// One checkbox in a dietary group.
pub struct DietOption {
    pub name: &'static str,
    pub checked: bool,
}

pub fn diet_options(selected: &[String]) -> Vec<DietOption> {
    DIETARY_OPTIONS
        .iter()
        .map(|&name| DietOption {
            name,
            checked: selected.iter().any(|s| s == name),
        })
        .collect()
}

/// A fetched list ready for a template: items, or the error with a Retry link.
pub struct ListView<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
    pub empty_message: &'static str,
    pub retry_url: &'static str,
}

impl<T> ListView<T> {
    pub fn new(
        state: sparkbytes_core::fetch::ListState<T>,
        kind: sparkbytes_core::fetch::ListKind,
        retry_url: &'static str,
    ) -> Self {
        let error = state.error().map(str::to_string);
        Self {
            items: state.into_items(),
            error,
            empty_message: kind.empty_message(),
            retry_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;
    use axum::response::IntoResponse;

    #[test]
    fn test_flash_query_parsing() {
        let q = FlashQuery {
            flash: Some("Saved".into()),
            flash_kind: Some("error".into()),
        };
        assert_eq!(q.into_flash(), Some(Flash::error("Saved")));

        let q = FlashQuery {
            flash: Some("Saved".into()),
            flash_kind: Some("bogus".into()),
        };
        assert_eq!(q.into_flash(), Some(Flash::success("Saved")));

        assert_eq!(FlashQuery::default().into_flash(), None);
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        let resp = redirect_with("/create-event", &Flash::success("Event \"Pizza & Co\" created successfully!"))
            .into_response();
        let location = resp.headers()[LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("/create-event?flash="));
        assert!(location.contains("%26"));
        assert!(location.ends_with("flash_kind=success"));
    }

    #[test]
    fn test_form_fields_repeated_keys() {
        let fields = FormFields(vec![
            ("title".into(), "Pizza".into()),
            ("dietary_needs".into(), "Vegan".into()),
            ("dietary_needs".into(), "Halal".into()),
        ]);
        assert_eq!(fields.get("title"), "Pizza");
        assert_eq!(fields.get("missing"), "");
        assert_eq!(fields.all("dietary_needs"), vec!["Vegan", "Halal"]);
    }

    #[test]
    fn test_diet_options_checked() {
        let options = diet_options(&["Kosher".to_string()]);
        assert_eq!(options.len(), 10);
        assert!(options.iter().find(|o| o.name == "Kosher").unwrap().checked);
        assert!(!options.iter().find(|o| o.name == "Vegan").unwrap().checked);
    }
}
