//! CDN-side asset records and their grouping into logical images.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size class of a stored rendition.
///
/// Variants of one logical image share a basename; every variant other than
/// `Original` carries a `<variant>_` prefix on that basename.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Original,
    Thumbnail,
    Small,
    Medium,
    Large,
}

impl Variant {
    /// All non-original size classes, smallest first.
    pub const SIZE_CLASSES: [Variant; 4] = [
        Variant::Thumbnail,
        Variant::Small,
        Variant::Medium,
        Variant::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Thumbnail => "thumbnail",
            Variant::Small => "small",
            Variant::Medium => "medium",
            Variant::Large => "large",
        }
    }

    /// Bounding box `(width, height)` the CDN resizes into for this class.
    pub fn bounds(self) -> Option<(u32, u32)> {
        match self {
            Variant::Original => None,
            Variant::Thumbnail => Some((245, 156)),
            Variant::Small => Some((500, 500)),
            Variant::Medium => Some((750, 750)),
            Variant::Large => Some((1000, 1000)),
        }
    }

    /// Split a file basename into its variant and the logical basename.
    ///
    /// `thumbnail_agricola_001` -> `(Thumbnail, "agricola_001")`;
    /// names without a known prefix are originals.
    pub fn split_basename(name: &str) -> (Variant, &str) {
        for variant in Self::SIZE_CLASSES {
            if let Some(rest) = name
                .strip_prefix(variant.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return (variant, rest);
            }
        }
        (Variant::Original, name)
    }
}

/// A single stored rendition on the CDN, normalized from the provider listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssetRecord {
    /// Provider id: folder path plus file basename, without extension.
    pub public_id: String,

    /// Folder relative to the configured root (`""` for the root itself).
    pub folder: String,

    /// Logical basename with any variant prefix removed.
    pub basename: String,

    pub variant: Variant,

    /// File extension reported by the CDN (`jpg`, `png`, ...).
    pub format: String,

    /// Delivery URL of this rendition.
    pub url: String,

    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub version: String,
}

impl AssetRecord {
    /// File name a CMS entry for this logical image carries (`agricola_001.jpg`).
    pub fn file_name(&self) -> String {
        if self.format.is_empty() {
            self.basename.clone()
        } else {
            format!("{}.{}", self.basename, self.format)
        }
    }
}

/// All renditions of one logical image within one folder.
#[derive(Clone, Debug, Default)]
pub struct LogicalImage {
    pub folder: String,
    pub basename: String,
    pub original: Option<AssetRecord>,
    pub variants: BTreeMap<Variant, AssetRecord>,
}

impl LogicalImage {
    /// An image is complete only once its original rendition exists.
    pub fn is_complete(&self) -> bool {
        self.original.is_some()
    }

    /// Identifier used in logs and reports (`agricola/agricola_001`).
    pub fn label(&self) -> String {
        if self.folder.is_empty() {
            self.basename.clone()
        } else {
            format!("{}/{}", self.folder, self.basename)
        }
    }
}

/// Group renditions by folder and logical basename.
pub fn group_images(assets: &[AssetRecord]) -> BTreeMap<(String, String), LogicalImage> {
    let mut groups: BTreeMap<(String, String), LogicalImage> = BTreeMap::new();
    for asset in assets {
        let image = groups
            .entry((asset.folder.clone(), asset.basename.clone()))
            .or_insert_with(|| LogicalImage {
                folder: asset.folder.clone(),
                basename: asset.basename.clone(),
                ..Default::default()
            });
        match asset.variant {
            Variant::Original => image.original = Some(asset.clone()),
            other => {
                image.variants.insert(other, asset.clone());
            }
        }
    }
    groups
}

#[cfg(test)]
pub(crate) fn sample_asset(folder: &str, name: &str, variant: Variant) -> AssetRecord {
    let public_id = if folder.is_empty() {
        format!("beckwithbarrow/{}", name)
    } else {
        format!("beckwithbarrow/{}/{}", folder, name)
    };
    let (_, basename) = Variant::split_basename(name);
    AssetRecord {
        url: format!(
            "https://res.cloudinary.com/demo/image/upload/v1700000000/{}.jpg",
            public_id
        ),
        public_id,
        folder: folder.to_string(),
        basename: basename.to_string(),
        variant,
        format: "jpg".into(),
        width: 2400,
        height: 1600,
        size_bytes: 512_000,
        version: "1700000000".into(),
    }
}
