//! Landing page

use askama::Template;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;

use crate::core::constants::APP_NAME;

#[derive(Template, Clone)]
#[template(
    ext = "html",
    source = r#"<html>
<head><title>{{ name }}</title></head>
<body>
<h1>{{ name }}</h1>
<p>Scrape <code>{{ metrics_path }}&lt;namespace&gt;/&lt;metric name&gt;</code>, e.g. <a href="{{ metrics_path }}AWS/EC2/CPUUtilization">{{ metrics_path }}AWS/EC2/CPUUtilization</a></p>
</body>
</html>
"#
)]
struct LandingTemplate {
    name: &'static str,
    metrics_path: String,
}

/// Render an askama template as an HTML response
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(rendered) => Html(rendered).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Template render failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn routes(metrics_path: &str) -> Router {
    let template = LandingTemplate {
        name: APP_NAME,
        metrics_path: metrics_path.to_string(),
    };
    Router::new().route("/", get(landing)).with_state(template)
}

async fn landing(State(template): State<LandingTemplate>) -> impl IntoResponse {
    HtmlTemplate(template)
}
