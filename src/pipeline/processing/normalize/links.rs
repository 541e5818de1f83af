use std::collections::HashSet;

use url::Url;

/// Parse and canonicalize an http(s) URL; anything else is dropped
pub fn validate_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    Some(url.to_string())
}

/// Validate every link and drop repeats, keeping first-occurrence order
pub fn clean_links<'a, I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    merge_links(links.into_iter().filter_map(validate_url))
}

/// Order-preserving de-duplication of already valid links
pub fn merge_links<I, S>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for link in links {
        let link = link.into();
        if seen.insert(link.clone()) {
            merged.push(link);
        }
    }
    merged
}
