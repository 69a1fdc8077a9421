//! Deciding which CMS entries are leftovers of an earlier native-upload
//! migration.
//!
//! The cleanup path only ever sees the [`Classification`]; swapping the
//! strategy does not touch the executor.

use crate::models::media::{MediaEntry, Provider};
use serde::Serialize;
use std::collections::BTreeSet;

/// Facts about the CDN side a classifier may consult.
pub struct ClassifyContext<'a> {
    /// Logical basenames of every CDN image group under the root, orphan
    /// variant groups included: a native entry sharing its name with an
    /// orphan is kept.
    pub cdn_basenames: &'a BTreeSet<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "classification", content = "reason", rename_all = "camelCase")]
pub enum Classification {
    Keep,
    Leftover,
    /// The signals disagree; reported, never deleted.
    Ambiguous(String),
}

pub trait LeftoverClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn classify(&self, entry: &MediaEntry, ctx: &ClassifyContext<'_>) -> Classification;
}

/// Native uploads with no CDN image of the same basename are leftovers.
/// CDN references whose image has vanished are flagged for a human.
pub struct StructuralClassifier;

impl LeftoverClassifier for StructuralClassifier {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn classify(&self, entry: &MediaEntry, ctx: &ClassifyContext<'_>) -> Classification {
        if ctx.cdn_basenames.contains(entry.basename()) {
            return Classification::Keep;
        }
        match entry.provider {
            Provider::Native => Classification::Leftover,
            Provider::CdnReference => Classification::Ambiguous(
                "CDN reference whose image no longer exists on the CDN".into(),
            ),
        }
    }
}

/// Structural rule confirmed by a project-name prefix.
///
/// Name matching is a heuristic: an entry is only deleted when both the
/// structural signal and a configured prefix agree.
pub struct NamePrefixClassifier {
    prefixes: Vec<String>,
}

impl NamePrefixClassifier {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl LeftoverClassifier for NamePrefixClassifier {
    fn name(&self) -> &'static str {
        "name-prefix"
    }

    fn classify(&self, entry: &MediaEntry, ctx: &ClassifyContext<'_>) -> Classification {
        if ctx.cdn_basenames.contains(entry.basename()) {
            return Classification::Keep;
        }
        match (entry.provider, self.matches(&entry.name)) {
            (Provider::Native, true) => Classification::Leftover,
            (Provider::Native, false) => Classification::Ambiguous(
                "native upload without CDN image, but no configured prefix matches".into(),
            ),
            (Provider::CdnReference, true) => Classification::Ambiguous(
                "name matches a leftover prefix but the entry is a CDN reference".into(),
            ),
            (Provider::CdnReference, false) => Classification::Keep,
        }
    }
}

/// Pick the strategy for a run: structural unless prefixes were configured.
pub fn classifier_for(prefixes: &[String]) -> Box<dyn LeftoverClassifier> {
    if prefixes.iter().any(|p| !p.trim().is_empty()) {
        Box::new(NamePrefixClassifier::new(prefixes.iter().cloned()))
    } else {
        Box::new(StructuralClassifier)
    }
}
