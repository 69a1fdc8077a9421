//! CMS-side media library entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Where an entry's bytes live.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Uploaded into CMS-local storage.
    Native,
    /// Points at bytes hosted by the CDN.
    CdnReference,
}

/// One rendition listed under an entry's `formats`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MediaFormat {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// A media library record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MediaEntry {
    /// CMS-assigned id, never rewritten by this tool.
    pub id: i64,

    /// File name including extension (`agricola_001.jpg`).
    pub name: String,

    /// Containing folder; `None` for the library root.
    pub folder_id: Option<i64>,

    pub url: String,

    /// Renditions keyed by size class name.
    pub formats: BTreeMap<String, MediaFormat>,

    pub provider: Provider,

    /// Opaque provider data; only ever replaced wholesale.
    pub provider_metadata: Value,
}

impl MediaEntry {
    /// Name with its extension removed, the key used for matching.
    pub fn basename(&self) -> &str {
        strip_extension(&self.name)
    }

    /// Every URL the entry exposes: `url` first, then each format's.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.formats.values().map(|f| f.url.as_str()))
    }
}

/// Strip one trailing `.ext` from a file name, leaving dotfiles intact.
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_the_last_extension() {
        assert_eq!(strip_extension("agricola_001.jpg"), "agricola_001");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn urls_include_every_format() {
        let mut formats = BTreeMap::new();
        formats.insert(
            "thumbnail".to_string(),
            MediaFormat {
                url: "https://cdn/t.jpg".into(),
                width: 1,
                height: 1,
                size_bytes: 1,
            },
        );
        let entry = MediaEntry {
            id: 1,
            name: "a.jpg".into(),
            folder_id: None,
            url: "https://cdn/a.jpg".into(),
            formats,
            provider: Provider::CdnReference,
            provider_metadata: Value::Null,
        };
        let urls: Vec<_> = entry.urls().collect();
        assert_eq!(urls, vec!["https://cdn/a.jpg", "https://cdn/t.jpg"]);
        assert_eq!(entry.basename(), "a");
    }
}
