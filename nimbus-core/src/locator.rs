//! Derive a blob-storage locator ({container, key}) from an object URL.
//!
//! Two historically distinct URL shapes are in circulation:
//!
//! - virtual-hosted: `https://<container>.s3[.<region>].amazonaws.com/<key>`
//! - path style: `https://s3[.<region>].amazonaws.com/<container>/<key>`
//!
//! Parsing degrades to `None` on anything else; garbage input never panics.

use url::Url;

/// Transient storage locator, consumed immediately by the image-labelling
/// request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLocator {
    pub container: String,
    pub key: String,
}

pub fn parse(raw: &str) -> Option<UploadLocator> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    // Virtual-hosted: first label is the container, second is the storage
    // subdomain, the whole decoded path is the key.
    if labels.len() >= 4 && is_storage_label(labels[1]) {
        let container = labels[0];
        if container.is_empty() {
            return None;
        }
        let key = decode_nonempty(url.path().trim_start_matches('/'))?;
        return Some(UploadLocator {
            container: container.to_string(),
            key,
        });
    }

    // Path style: bare storage host, first path segment is the container.
    if labels.len() >= 3 && is_storage_label(labels[0]) {
        let mut segments = url.path_segments()?;
        let container = decode_nonempty(segments.next()?)?;
        let rest = segments.collect::<Vec<_>>().join("/");
        let key = decode_nonempty(&rest)?;
        return Some(UploadLocator { container, key });
    }

    None
}

fn is_storage_label(label: &str) -> bool {
    // "s3" plain or with a legacy region suffix ("s3-us-west-2").
    label == "s3" || label.starts_with("s3-")
}

fn decode_nonempty(encoded: &str) -> Option<String> {
    if encoded.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(encoded).ok()?.into_owned();
    if decoded.is_empty() { None } else { Some(decoded) }
}
