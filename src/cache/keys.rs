//! Logical cache keys and invalidation tags.
//!
//! The orchestrator manages six named derived views; each one maps to a
//! single store entry identified by a [`CacheKey`]. Tags group entries for
//! bulk invalidation from write paths without enumerating keys.

use std::collections::HashSet;
use std::fmt;

/// Identifies one of the six logical caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full page list, drafts included per settings.
    Pages,
    /// Flat folder records as listed by the data layer.
    FolderList,
    /// Folder hierarchy built from the flat records.
    FolderTree,
    /// Folder hierarchy with page leaves attached.
    PageFolderTree,
    /// Site-wide configuration singleton.
    SiteConfig,
    /// Per-plugin initialisation data.
    PluginData,
}

/// Invalidation label shared by zero or more cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// Page content changed: page list and both trees are affected.
    Content,
    /// Folder structure changed: folder list and both trees are affected.
    Folders,
    /// Site configuration changed.
    Site,
    /// Plugin set or plugin data changed.
    Plugins,
}

impl CacheKey {
    /// Every logical cache, in refill order.
    pub const ALL: [CacheKey; 6] = [
        CacheKey::Pages,
        CacheKey::FolderList,
        CacheKey::FolderTree,
        CacheKey::PageFolderTree,
        CacheKey::SiteConfig,
        CacheKey::PluginData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::Pages => "pages",
            CacheKey::FolderList => "folder_list",
            CacheKey::FolderTree => "folder_tree",
            CacheKey::PageFolderTree => "page_folder_tree",
            CacheKey::SiteConfig => "site_config",
            CacheKey::PluginData => "plugin_data",
        }
    }

    /// Parse a logical cache name as used by the admin invalidation surface.
    pub fn parse(name: &str) -> Option<CacheKey> {
        CacheKey::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// Tags attached to this cache's store entry.
    pub fn tags(self) -> &'static [CacheTag] {
        match self {
            CacheKey::Pages => &[CacheTag::Content],
            CacheKey::FolderList => &[CacheTag::Folders],
            CacheKey::FolderTree => &[CacheTag::Content, CacheTag::Folders],
            CacheKey::PageFolderTree => &[CacheTag::Content, CacheTag::Folders],
            CacheKey::SiteConfig => &[CacheTag::Site],
            CacheKey::PluginData => &[CacheTag::Plugins],
        }
    }

    pub fn tag_set(self) -> HashSet<CacheTag> {
        self.tags().iter().copied().collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
