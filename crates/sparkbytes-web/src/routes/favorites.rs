use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use sparkbytes_core::fetch::{ListKind, ListResource};
use sparkbytes_core::model::Requirement;

use super::events::EventListTemplate;
use crate::error::AppError;
use crate::gate::{self, Visitor};
use crate::page::{FlashQuery, Layout, ListView};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/favorites", get(list_favorites))
}

async fn list_favorites(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let mut resource = ListResource::new(ListKind::Favorites, || state.api.favorites(&visitor.ctx));
    resource.load().await;
    let tmpl = EventListTemplate {
        layout: Layout::new(&state, true, flash.into_flash()),
        heading: "Your Favorite Events",
        list: ListView::new(resource.into_state(), ListKind::Favorites, "/favorites"),
        actions: false,
    };
    Ok(Html(tmpl.render()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sparkbytes_core::testing::{MockBackend, MockReply};

    #[tokio::test]
    async fn test_favorites_requires_profile() {
        let mock = MockBackend::start().await;
        session(&mock, true, false);
        let resp = get_page(test_router(&mock), "/favorites").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/createprofile");
        assert_eq!(mock.hits("GET", "/favorites"), 0);
    }

    #[tokio::test]
    async fn test_favorites_listed() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "GET",
            "/favorites",
            MockReply::json(
                200,
                json!([{"event_id": 7, "title": "Taco Tuesday", "date": "2099-05-05",
                        "food_types": "Vegan, Halal"}]),
            ),
        );
        let resp = get_page(test_router(&mock), "/favorites").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("Your Favorite Events"));
        assert!(html.contains("Taco Tuesday"));
        assert!(html.contains("Vegan, Halal"));
        assert!(!html.contains("/events/7/favorite"));
    }

    #[tokio::test]
    async fn test_favorites_empty() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply("GET", "/favorites", MockReply::json(200, json!({"success": true, "events": []})));
        let html = body_text(get_page(test_router(&mock), "/favorites").await.into_body()).await;
        assert!(html.contains("No favorite events found."));
    }

    #[tokio::test]
    async fn test_favorites_failure_fallback_message() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply("GET", "/favorites", MockReply::text(500, "boom"));
        let html = body_text(get_page(test_router(&mock), "/favorites").await.into_body()).await;
        assert!(html.contains("Failed to fetch favorite events"));
        assert!(html.contains("href=\"/favorites\""));
    }
}
