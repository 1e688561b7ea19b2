//! Shared Key authorization for the Azure File service.
//!
//! The signature is a base64-encoded HMAC-SHA256 over a canonical description of the request,
//! keyed with the decoded storage account key:
//!
//! ```text
//! VERB\n
//! Content-Encoding\n
//! Content-Language\n
//! Content-Length\n      (empty when zero)
//! Content-MD5\n
//! Content-Type\n
//! Date\n
//! If-Modified-Since\n
//! If-Match\n
//! If-None-Match\n
//! If-Unmodified-Since\n
//! Range\n
//! CanonicalizedHeaders  (x-ms-* headers, lowercase, sorted, one "name:value\n" each)
//! CanonicalizedResource (/account/path, then "\nname:value" per sorted query parameter)
//! ```
//!
//! See <https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key>.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Build the string to sign for a request that only carries `x-ms-*` headers besides
/// `Content-Length` (the only standard header this client sends).
pub fn string_to_sign(account: &str, method: &str, url: &Url, content_length: u64, ms_headers: &[(&str, String)]) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    format!(
        "{method}\n\n\n{content_length}\n\n\n\n\n\n\n\n\n{}{}",
        canonicalized_headers(ms_headers),
        canonicalized_resource(account, url)
    )
}

/// Compute the `Authorization` header value for an already-built string to sign.
pub fn authorization(account: &str, key: &[u8], string_to_sign: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());
    format!("SharedKey {account}:{signature}")
}

fn canonicalized_headers(ms_headers: &[(&str, String)]) -> String {
    let sorted: BTreeMap<String, &str> = ms_headers
        .iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim()))
        .filter(|(name, _)| name.starts_with("x-ms-"))
        .collect();

    sorted.iter().map(|(name, value)| format!("{name}:{value}\n")).collect()
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params.entry(name.to_lowercase()).or_default().push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    resource
}
