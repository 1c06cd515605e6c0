use crate::config::AppConfig;
use validator::ValidationErrors;

/// Resolves optional `page`/`limit` query parameters against the
/// configured default and cap. Page numbers start at 1; a limit of 0
/// or above the cap is pulled back into range.
pub fn resolve_paging(page: Option<u64>, limit: Option<u64>, config: &AppConfig) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(u64::from(config.api_default_page_size))
        .clamp(1, u64::from(config.api_max_page_size));
    (page, limit)
}

/// Flattens validator's nested error map into "field: message" strings
/// for the response envelope.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| match &error.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: invalid value ({})", field, error.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        )
    }

    #[test]
    fn missing_params_fall_back_to_configured_defaults() {
        let cfg = config();
        let (page, limit) = resolve_paging(None, None, &cfg);
        assert_eq!(page, 1);
        assert_eq!(limit, u64::from(cfg.api_default_page_size));
    }

    #[test]
    fn limit_is_capped_and_page_zero_becomes_one() {
        let cfg = config();
        let (page, limit) = resolve_paging(Some(0), Some(1_000_000), &cfg);
        assert_eq!(page, 1);
        assert_eq!(limit, u64::from(cfg.api_max_page_size));
    }

    #[test]
    fn explicit_params_within_range_pass_through() {
        let cfg = config();
        let (page, limit) = resolve_paging(Some(3), Some(5), &cfg);
        assert_eq!(page, 3);
        assert_eq!(limit, 5);
    }
}
