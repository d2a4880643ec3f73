//! Composes base URL, endpoint and query into one absolute URL.

use url::Url;

use crate::error::FetchError;
use crate::types::Query;

/// Resolves `endpoint` against `base_url` and applies `query` on top of any
/// parameters the endpoint already carries.
///
/// An absolute `endpoint` is used as-is and `base_url` is never parsed.
/// Each query key replaces the first same-named parameter in place and drops
/// later duplicates; unknown keys are appended in query order.
pub fn build_url(base_url: &str, endpoint: &str, query: &Query) -> Result<String, FetchError> {
    let mut url = match Url::parse(endpoint) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url)?.join(endpoint)?,
        Err(err) => return Err(err.into()),
    };

    if !query.is_empty() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        for (key, value) in query.iter() {
            set_param(&mut pairs, key, value);
        }
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(url.into())
}

fn set_param(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value.to_string();
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = index <= first || k != key;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value.to_string())),
    }
}
