use axum::{response::Html, routing::get, Router};

const BLOCKED_PAGE: &str = "<!DOCTYPE html>\n\
<html>\n\
<head><meta charset=\"utf-8\"><title>Access blocked</title></head>\n\
<body>\n\
<h1>Access blocked</h1>\n\
<p>Your account has been blocked. Please contact the administrators for more information.</p>\n\
</body>\n\
</html>\n";

async fn blocked_notice() -> Html<&'static str> {
    Html(BLOCKED_PAGE)
}

/// Serves the notice blocked users are redirected to.
pub fn router(blocked_path: &str) -> Router {
    Router::new().route(blocked_path, get(blocked_notice))
}
