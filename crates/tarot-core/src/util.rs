//! Small helpers shared by the config, auth and remote modules.

/// Trim optional text, treating blank values as absent.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Resolve a Supabase service base URL (`/auth/v1`, `/rest/v1`) from a
/// project URL. An URL that already ends with the service path is kept.
pub fn supabase_service_url(project_url: &str, service_path: &str) -> Result<String, &'static str> {
    let trimmed = project_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("Supabase URL must not be empty");
    }
    if !is_http_url(trimmed) {
        return Err("Supabase URL must include http:// or https://");
    }
    if trimmed.ends_with(service_path) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}{service_path}"))
    }
}

/// Shorten a response body for inclusion in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    chrono::Utc::now().timestamp()
}
