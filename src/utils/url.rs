//! URL utilities for consistent URL handling
//!
//! This module provides utilities for normalizing URLs to prevent issues
//! with trailing slashes when constructing API endpoints.

/// Default API base; override with `TELNYX_BASE_URL` for test servers or
/// proxies.
pub const DEFAULT_BASE_URL: &str = "https://api.telnyx.com/v2";

/// Path of the streaming generation endpoint under the base URL.
pub const GENERATE_STREAM_ENDPOINT: &str = "ai/generate_stream";

/// Normalize a base URL by removing trailing slashes
///
/// This ensures consistent URL construction when appending endpoints,
/// preventing double slashes in the final URLs.
///
/// # Examples
///
/// ```
/// use parley::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.telnyx.com/v2"), "https://api.telnyx.com/v2");
/// assert_eq!(normalize_base_url("https://api.telnyx.com/v2/"), "https://api.telnyx.com/v2");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// This function normalizes the base URL and safely appends the endpoint,
/// ensuring there are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use parley::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.telnyx.com/v2", "ai/generate_stream"),
///     "https://api.telnyx.com/v2/ai/generate_stream"
/// );
/// assert_eq!(
///     construct_api_url("https://api.telnyx.com/v2/", "/ai/generate_stream"),
///     "https://api.telnyx.com/v2/ai/generate_stream"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// The generate-stream URL, honoring the `TELNYX_BASE_URL` override.
pub fn generate_stream_url() -> String {
    let base = std::env::var("TELNYX_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    construct_api_url(&base, GENERATE_STREAM_ENDPOINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.telnyx.com/v2"),
            "https://api.telnyx.com/v2"
        );
        assert_eq!(
            normalize_base_url("https://api.telnyx.com/v2/"),
            "https://api.telnyx.com/v2"
        );
        assert_eq!(
            normalize_base_url("https://api.telnyx.com/v2///"),
            "https://api.telnyx.com/v2"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("https://api.telnyx.com/v2", "ai/generate_stream"),
            "https://api.telnyx.com/v2/ai/generate_stream"
        );
        assert_eq!(
            construct_api_url("https://api.telnyx.com/v2/", "ai/generate_stream"),
            "https://api.telnyx.com/v2/ai/generate_stream"
        );
        assert_eq!(
            construct_api_url("https://api.telnyx.com/v2", "/ai/generate_stream"),
            "https://api.telnyx.com/v2/ai/generate_stream"
        );
        assert_eq!(
            construct_api_url("http://localhost:8080///", "ai/generate_stream"),
            "http://localhost:8080/ai/generate_stream"
        );
    }
}
