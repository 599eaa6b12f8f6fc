use std::fmt;

use crate::modules::request::domain::entities::ApiRequest;

/// Deterministic cache key for one logical request.
///
/// Rendered as `METHOD:url:k1=v1&k2=v2` with parameters sorted by name and
/// percent-encoded, so equal requests always collide and different ones never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &ApiRequest) -> Self {
        let method = request.method.as_str();
        let query = request
            .params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let mut key = String::with_capacity(method.len() + request.url.len() + query.len() + 2);
        key.push_str(method);
        key.push(':');
        key.push_str(&request.url);
        key.push(':');
        key.push_str(&query);

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
