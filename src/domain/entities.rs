//! Domain entities mirrored from persistent storage.

use std::collections::HashMap;

use chrono_tz::Tz;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    /// Folder the page lives in; `None` places it at the hierarchy root.
    pub folder_id: Option<Uuid>,
    pub draft: bool,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Flat relational row of the folder hierarchy.
///
/// `parent_id == None` marks a root; the tree-shaped counterpart is
/// [`FolderNode`](crate::domain::hierarchy::FolderNode).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderRecord {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfigRecord {
    pub site_title: String,
    pub base_url: String,
    pub meta_description: String,
    pub timezone: Tz,
    pub homepage_size: i32,
    pub updated_at: OffsetDateTime,
}

/// Initialisation data keyed by plugin name, opaque to this subsystem.
pub type PluginData = HashMap<String, serde_json::Value>;
