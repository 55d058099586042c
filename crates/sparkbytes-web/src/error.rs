use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

/// Handler error: either the session gate sent the visitor elsewhere, or
/// something failed and renders as an HTML error page.
pub enum AppError {
    Redirect(String),
    Internal(anyhow::Error),
}

impl AppError {
    pub fn redirect(path: impl Into<String>) -> Self {
        Self::Redirect(path.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Redirect(path) => return Redirect::to(&path).into_response(),
            Self::Internal(err) => err,
        };

        tracing::error!("web error: {:#}", err);

        let body = format!(
            r#"<!doctype html>
<html><head><title>Error · SparkBytes</title>
<style>body{{font-family:system-ui;background:#fafafa;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}}
.err{{background:#fff;padding:2rem;border-radius:8px;border-left:4px solid #c0392b;max-width:600px;box-shadow:0 2px 8px rgba(0,0,0,.08)}}
h1{{color:#c0392b;margin-top:0}}pre{{white-space:pre-wrap;color:#555}}</style>
</head><body><div class="err"><h1>Something went wrong</h1><pre>{}</pre>
<p><a href="/" style="color:#2980b9">Back to home</a></p></div></body></html>"#,
            html_escape(&format!("{:#}", err))
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn test_redirect_variant() {
        let resp = AppError::redirect("/login").into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[LOCATION], "/login");
    }

    #[test]
    fn test_internal_variant_is_500() {
        let resp = AppError::from(anyhow::anyhow!("template <broken>")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
