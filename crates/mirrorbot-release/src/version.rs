//! Release version token extraction from free-form chat text.

/// Returns the first whitespace-delimited token that starts with `prefix` and
/// contains exactly one `.`.
///
/// The token is returned verbatim: no trimming of punctuation and no numeric
/// validation, so `4.x` or `4.20?` are accepted when they carry the prefix.
pub fn extract_version_token<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.split_whitespace()
        .find(|token| token.matches('.').count() == 1 && token.starts_with(prefix))
}
