use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::Config;

/// Outside production every origin is accepted. In production an origin passes when it contains
/// the host part of one of the configured origins.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let allowed = config.allowed_origins.clone();
    let production = config.is_production();

    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        match origin.to_str() {
            Ok(o) => origin_allowed(o, &allowed, production),
            Err(_) => false,
        }
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
        .allow_origin(cors_origin)
}

pub fn origin_allowed(origin: &str, allowed: &[String], production: bool) -> bool {
    if !production {
        return true;
    }
    allowed.iter().any(|entry| {
        let domain = entry
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        !domain.is_empty() && origin.contains(domain)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![
            "http://localhost:5173".into(),
            "https://lms-frontend.example.net".into(),
        ]
    }

    #[test]
    fn any_origin_outside_production() {
        assert!(origin_allowed("https://evil.test", &allowed(), false));
    }

    #[test]
    fn production_matches_on_host_part() {
        assert!(origin_allowed("https://lms-frontend.example.net", &allowed(), true));
        assert!(origin_allowed("http://localhost:5173", &allowed(), true));
        assert!(!origin_allowed("https://evil.test", &allowed(), true));
    }

    #[test]
    fn blank_entries_never_match() {
        assert!(!origin_allowed("https://evil.test", &["https://".into()], true));
    }
}
