//! Source descriptors and URL resolution
//!
//! Quality selection belongs to an external selector; the engine only
//! carries the descriptor and asks a [`SourceResolver`] for a URL when it
//! creates a surface.

use serde::{Deserialize, Serialize};
use storysync_common::manifest::ManifestItem;
use storysync_common::ViewportClass;

/// Opaque reference to a track's media and its quality variants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub file: Option<String>,
    pub low: Option<String>,
    pub medium: Option<String>,
    pub high: Option<String>,
}

impl SourceDescriptor {
    pub fn from_item(item: &ManifestItem) -> Self {
        Self {
            file: item.file.clone(),
            low: item.low.clone(),
            medium: item.medium.clone(),
            high: item.high.clone(),
        }
    }

    /// Short name for logs
    pub fn label(&self) -> &str {
        self.file
            .as_deref()
            .or(self.high.as_deref())
            .or(self.medium.as_deref())
            .or(self.low.as_deref())
            .unwrap_or("<none>")
    }
}

/// Resolves a descriptor to a playable URL
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, descriptor: &SourceDescriptor, viewport: ViewportClass) -> Option<String>;
}

/// Uses the default file, then the best available variant
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSourceResolver;

impl SourceResolver for DirectSourceResolver {
    fn resolve(&self, descriptor: &SourceDescriptor, _viewport: ViewportClass) -> Option<String> {
        descriptor
            .file
            .clone()
            .or_else(|| descriptor.high.clone())
            .or_else(|| descriptor.medium.clone())
            .or_else(|| descriptor.low.clone())
    }
}
