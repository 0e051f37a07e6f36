const MAX_DOCUMENT_CONCURRENCY: usize = 32;
const CONCURRENCY_ENV: &str = "DACDOC_CONCURRENCY";

/// Number of documents read, parsed or rewritten at once.
///
/// An explicit configuration value wins over `DACDOC_CONCURRENCY`, which wins over the
/// available parallelism.
pub(crate) fn document_concurrency(configured: Option<usize>) -> usize {
    let from_env = std::env::var(CONCURRENCY_ENV).ok();
    resolve_concurrency(configured, from_env.as_deref())
}

fn resolve_concurrency(configured: Option<usize>, from_env: Option<&str>) -> usize {
    configured
        .or_else(|| from_env.and_then(|raw| raw.trim().parse().ok()))
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
        .clamp(1, MAX_DOCUMENT_CONCURRENCY)
}

pub(crate) const fn max_document_concurrency() -> usize {
    MAX_DOCUMENT_CONCURRENCY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_value_is_trimmed_and_clamped() {
        let fallback = resolve_concurrency(None, None);
        assert!((1..=MAX_DOCUMENT_CONCURRENCY).contains(&fallback));

        let cases = [
            (" 5 ", 5),
            ("0", 1),
            ("999", MAX_DOCUMENT_CONCURRENCY),
            ("", fallback),
            ("four", fallback),
        ];
        for (raw, expected) in cases {
            assert_eq!(resolve_concurrency(None, Some(raw)), expected, "{raw:?}");
        }
    }

    #[test]
    fn configured_value_wins() {
        assert_eq!(resolve_concurrency(Some(3), Some("7")), 3);
        assert_eq!(document_concurrency(Some(0)), 1);
        assert_eq!(document_concurrency(Some(1_000)), MAX_DOCUMENT_CONCURRENCY);
    }
}
