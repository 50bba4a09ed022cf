//! HTTP transport: serves the functions with `axum`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::context::ServiceContext;
use crate::error::BannerError;
use crate::handlers::{self, Function, FunctionResponse};

/// Routes for both functions, at the root and under the Netlify prefix.
pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/generate", get(generate))
        .route("/merge", get(merge))
        .route("/.netlify/functions/:name", get(by_name))
        .with_state(ctx)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(ctx: Arc<ServiceContext>, bind: &str) -> Result<(), BannerError> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");
    axum::serve(listener, router(ctx)).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn generate(
    State(ctx): State<Arc<ServiceContext>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    into_http_response(handlers::handle(Function::Generate, &query, &ctx).await)
}

async fn merge(
    State(ctx): State<Arc<ServiceContext>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    into_http_response(handlers::handle(Function::Merge, &query, &ctx).await)
}

async fn by_name(
    State(ctx): State<Arc<ServiceContext>>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match name.parse::<Function>() {
        Ok(function) => into_http_response(handlers::handle(function, &query, &ctx).await),
        Err(message) => (StatusCode::NOT_FOUND, message).into_response(),
    }
}

/// Unwrap a function response into a real HTTP response, decoding a base64
/// body back to binary.
#[must_use]
pub fn into_http_response(response: FunctionResponse) -> Response {
    let body = match response.body_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = BannerError::Internal(format!("response body is not base64: {e}"));
            tracing::error!(error = %err, "malformed function response");
            return into_http_response(FunctionResponse::error(&err));
        }
    };

    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (status, body).into_response();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) =
            (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value))
        {
            http.headers_mut().insert(name, value);
        }
    }
    http
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn decodes_base64_bodies() {
        let response = FunctionResponse {
            status_code: 200,
            headers: BTreeMap::from([("Content-Type".into(), "image/png".into())]),
            body: "AQID".into(),
            is_base64_encoded: true,
        };
        let http = into_http_response(response);
        assert_eq!(http.status(), StatusCode::OK);
        assert_eq!(http.headers()["content-type"], "image/png");
    }

    #[test]
    fn keeps_error_status_and_json_type() {
        let response = FunctionResponse::error(&BannerError::Validation("missing".into()));
        let http = into_http_response(response);
        assert_eq!(http.status(), StatusCode::BAD_REQUEST);
        assert_eq!(http.headers()["content-type"], "application/json");
    }

    #[test]
    fn malformed_base64_becomes_500() {
        let response = FunctionResponse {
            status_code: 200,
            headers: BTreeMap::new(),
            body: "%%%".into(),
            is_base64_encoded: true,
        };
        assert_eq!(into_http_response(response).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
