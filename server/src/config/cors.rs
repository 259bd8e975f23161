use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// `origins` is the comma separated `CORS_ALLOWED_ORIGINS` value.
pub fn create_cors_layer(origins: &str) -> CorsLayer {
    let allowed_origins = allowed_origins(origins);

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins(origins: &str) -> AllowOrigin {
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                None
            } else {
                match trimmed.parse::<HeaderValue>() {
                    Ok(value) => {
                        tracing::debug!(origin = %trimmed, "CORS: allowing origin");
                        Some(value)
                    }
                    Err(e) => {
                        tracing::warn!(origin = %trimmed, error = %e, "CORS: invalid origin");
                        None
                    }
                }
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: no valid origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        tracing::info!(count = origins.len(), "CORS: configured allowed origins");
        AllowOrigin::list(origins)
    }
}
