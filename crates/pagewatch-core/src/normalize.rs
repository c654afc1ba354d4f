//! URL canonicalization. The normalized form is the identity of a monitored
//! resource, so two spellings of the same page must normalize identically.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL must not be empty")]
    Empty,

    #[error("invalid URL \"{url}\": {reason}")]
    Invalid { url: String, reason: String },

    #[error("unsupported URL scheme \"{scheme}\"; only http and https are allowed")]
    UnsupportedScheme { scheme: String },

    #[error("URL \"{url}\" has no host")]
    MissingHost { url: String },
}

/// Query parameters that only carry attribution data.
const TRACKING_PARAMS: &[&str] = &[
    "gclid",
    "gclsrc",
    "dclid",
    "gbraid",
    "wbraid",
    "fbclid",
    "msclkid",
    "yclid",
    "twclid",
    "ttclid",
    "li_fat_id",
    "igshid",
    "_ga",
    "_gl",
    "ref",
    "ref_src",
    "source",
    "campaign",
    "mc_cid",
    "mc_eid",
    "_hsenc",
    "_hsmi",
    "mkt_tok",
    "oly_anon_id",
    "oly_enc_id",
    "vero_id",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonicalize a user-supplied URL.
///
/// - scheme forced to `https` (input must be `http` or `https`; a missing
///   scheme is treated as `https`)
/// - leading `www.` removed from the host
/// - fragment removed
/// - trailing slashes removed from the path, except for the root path
/// - tracking parameters removed, remaining parameters sorted by key then value
///
/// # Errors
///
/// Returns [`UrlError`] when the input is empty, unparsable, uses another
/// scheme, or has no host.
pub fn normalize_url(raw: &str) -> Result<String, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{trimmed}"))
            .map_err(|e| UrlError::Invalid {
                url: trimmed.to_owned(),
                reason: e.to_string(),
            })?,
        Err(e) => {
            return Err(UrlError::Invalid {
                url: trimmed.to_owned(),
                reason: e.to_string(),
            })
        }
    };

    let scheme = url.scheme().to_owned();
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::UnsupportedScheme { scheme });
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingHost {
            url: trimmed.to_owned(),
        })?
        .to_owned();

    if scheme == "http" {
        if url.port() == Some(80) {
            let _ = url.set_port(None);
        }
        url.set_scheme("https").map_err(|()| UrlError::Invalid {
            url: trimmed.to_owned(),
            reason: "cannot upgrade scheme to https".to_owned(),
        })?;
    }

    if let Some(bare) = host.strip_prefix("www.") {
        if !bare.is_empty() {
            url.set_host(Some(bare)).map_err(|e| UrlError::Invalid {
                url: trimmed.to_owned(),
                reason: e.to_string(),
            })?;
        }
    }

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if params.is_empty() {
        url.set_query(None);
    } else {
        params.sort();
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = url.path().to_owned();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        url.set_path(if stripped.is_empty() { "/" } else { stripped });
    }

    Ok(url.to_string())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
