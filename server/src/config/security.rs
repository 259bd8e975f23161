use axum::http::{HeaderName, HeaderValue, Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
const X_FRAME_OPTIONS: &str = "x-frame-options";
const X_XSS_PROTECTION: &str = "x-xss-protection";
const STRICT_TRANSPORT_SECURITY: &str = "strict-transport-security";
const CONTENT_SECURITY_POLICY: &str = "content-security-policy";
const REFERRER_POLICY: &str = "referrer-policy";
const PERMISSIONS_POLICY: &str = "permissions-policy";

const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const XSS_BLOCK: &str = "1; mode=block";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

/// Headers every response carries; HSTS is added on top in production.
const BASE_HEADERS: [(&str, &str); 6] = [
    (X_CONTENT_TYPE_OPTIONS, NOSNIFF),
    (X_FRAME_OPTIONS, DENY),
    (X_XSS_PROTECTION, XSS_BLOCK),
    (CONTENT_SECURITY_POLICY, CSP_API_VALUE),
    (REFERRER_POLICY, REFERRER_POLICY_VALUE),
    (PERMISSIONS_POLICY, PERMISSIONS_POLICY_VALUE),
];

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    include_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        Self { include_hsts }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            include_hsts: self.include_hsts,
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    include_hsts: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            include_hsts: self.include_hsts,
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    include_hsts: bool,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.future.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                let headers = response.headers_mut();

                for (name, value) in BASE_HEADERS {
                    headers.insert(
                        HeaderName::from_static(name),
                        HeaderValue::from_static(value),
                    );
                }
                if *this.include_hsts {
                    headers.insert(
                        HeaderName::from_static(STRICT_TRANSPORT_SECURITY),
                        HeaderValue::from_static(HSTS_VALUE),
                    );
                }

                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn create_security_headers_layer(production: bool) -> SecurityHeadersLayer {
    if production {
        tracing::info!("Security: HSTS header enabled (production mode)");
    } else {
        tracing::info!("Security: HSTS header disabled (development mode)");
    }
    SecurityHeadersLayer::new(production)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    async fn headers_for(include_hsts: bool) -> axum::http::HeaderMap {
        let service = SecurityHeadersLayer::new(include_hsts).layer(tower::service_fn(
            |_req: Request<()>| async { Ok::<_, Infallible>(Response::new(())) },
        ));
        service
            .oneshot(Request::new(()))
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_base_headers_without_hsts() {
        let headers = headers_for(false).await;
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), DENY);
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), NOSNIFF);
        assert!(headers.get(STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[tokio::test]
    async fn test_hsts_in_production() {
        let headers = headers_for(true).await;
        assert_eq!(headers.get(STRICT_TRANSPORT_SECURITY).unwrap(), HSTS_VALUE);
    }
}
