//! Security headers for every storefront response.
//!
//! Start locked down and loosen only where the shop needs it: product images
//! may be data URIs, and passkeys need `publickey-credentials-*`.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::CspNonce;

const PERMISSIONS_POLICY: &str = "accelerometer=(), autoplay=(), camera=(), display-capture=(), \
     geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=(), \
     publickey-credentials-create=(self), publickey-credentials-get=(self)";

/// Build the `Content-Security-Policy` value, allowing inline scripts that
/// carry `nonce`.
#[must_use]
pub fn content_security_policy(nonce: Option<&str>) -> String {
    let script_src = match nonce {
        Some(nonce) if !nonce.is_empty() => format!("script-src 'self' 'nonce-{nonce}'"),
        _ => "script-src 'self'".to_owned(),
    };
    format!(
        "default-src 'none'; {script_src}; style-src 'self'; font-src 'self'; \
         img-src 'self' data:; connect-src 'self'; frame-src 'none'; object-src 'none'; \
         base-uri 'self'; form-action 'self'; frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Handlers that set their own `Cache-Control` (static files, media) keep
/// it; everything else defaults to `no-store`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let csp = content_security_policy(request.extensions().get::<CspNonce>().map(CspNonce::value));

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );

    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_with_nonce() {
        let csp = content_security_policy(Some("abc123=="));
        assert!(csp.contains("script-src 'self' 'nonce-abc123=='"));
        assert!(csp.contains("img-src 'self' data:"));
        assert!(csp.starts_with("default-src 'none'"));
    }

    #[test]
    fn test_csp_without_nonce() {
        assert!(content_security_policy(None).contains("script-src 'self';"));
        assert!(content_security_policy(Some("")).contains("script-src 'self';"));
    }

    #[test]
    fn test_permissions_policy_allows_passkeys() {
        assert!(PERMISSIONS_POLICY.contains("publickey-credentials-get=(self)"));
        assert!(PERMISSIONS_POLICY.contains("publickey-credentials-create=(self)"));
    }
}
