//! Final URL assembly.

use crate::util::is_absolute_url;

/// Combine `base_url`, `url`, the path-param fragment and an already
/// stringified query into one URL.
///
/// - An absolute `url` discards `base_url`.
/// - Segments are joined with exactly one `/`.
/// - `params` is appended only while the URL has no `?` yet.
/// - `query` is appended with `?` or `&` as appropriate.
/// - Any `#fragment` is stripped last.
pub fn build_full_path(url: &str, base_url: &str, params: &str, query: &str) -> String {
    let base_url = if is_absolute_url(url) { "" } else { base_url };

    let mut full = if base_url.is_empty() {
        url.to_string()
    } else {
        join(base_url, url)
    };
    if !params.is_empty() && !full.contains('?') {
        full = join(&full, params);
    }
    if !query.is_empty() {
        let separator = if full.contains('?') { '&' } else { '?' };
        full = format!("{}{separator}{query}", full.trim_end_matches('/'));
    }
    if let Some(hash) = full.find('#') {
        full.truncate(hash);
    }
    full
}

fn join(left: &str, right: &str) -> String {
    format!("{}/{}", left.trim_end_matches('/'), right.trim_start_matches('/'))
}
