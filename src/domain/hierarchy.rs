//! Folder-hierarchy engine.
//!
//! Pure algorithms turning the flat parent-pointer [`FolderRecord`] rows
//! into a forest of [`FolderNode`]s, plus id/path lookup and mutation
//! helpers. No I/O; the orchestrator feeds it freshly fetched records on
//! every build.
//!
//! Construction policy: records are never dropped. A record whose
//! `parent_id` resolves to nothing becomes an additional root, cycle
//! members are promoted to roots, and duplicate ids keep the first record
//! in place while later ones are appended as extra roots. Sibling order
//! always follows input order; nothing is sorted.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{FolderRecord, PageRecord};

/// Tree-shaped counterpart of [`FolderRecord`]; also carries page leaves in
/// the page-folder tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderNode {
    pub id: Uuid,
    pub name: String,
    pub children: Vec<FolderNode>,
    pub is_page: bool,
    pub page: Option<PageRecord>,
}

impl FolderNode {
    pub fn folder(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            children: Vec::new(),
            is_page: false,
            page: None,
        }
    }

    pub fn page_leaf(page: PageRecord) -> Self {
        Self {
            id: page.id,
            name: page.title.clone(),
            children: Vec::new(),
            is_page: true,
            page: Some(page),
        }
    }
}

/// Matched prefix of a path walk.
///
/// `complete` is true when every input segment matched; a truncated walk
/// returns the matched prefix with `complete == false` instead of silently
/// looking like a full match.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch<T> {
    pub items: Vec<T>,
    pub complete: bool,
}

/// Build a forest from flat records in two passes.
///
/// Pass 1 indexes one node per record by id, so the result is independent
/// of record order. Pass 2 attaches each node to its parent via the index;
/// roots are records with no parent, an unresolved parent, a self-pointing
/// parent, or an ancestry that cycles. Traversal is bounded by the input
/// size: every node is attached exactly once.
pub fn build_folder_tree(records: Vec<FolderRecord>) -> Vec<FolderNode> {
    let mut nodes: HashMap<Uuid, FolderNode> = HashMap::with_capacity(records.len());
    let mut parents: HashMap<Uuid, Option<Uuid>> = HashMap::with_capacity(records.len());
    let mut order: Vec<Uuid> = Vec::with_capacity(records.len());
    let mut duplicates: Vec<FolderNode> = Vec::new();

    for record in records {
        if nodes.contains_key(&record.id) {
            duplicates.push(FolderNode::folder(record));
            continue;
        }
        order.push(record.id);
        parents.insert(record.id, record.parent_id);
        nodes.insert(record.id, FolderNode::folder(record));
    }

    // Adjacency and root list, both in input order.
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut roots: Vec<Uuid> = Vec::new();
    for &id in &order {
        match parents.get(&id).copied().flatten() {
            Some(parent) if parent != id && nodes.contains_key(&parent) => {
                children.entry(parent).or_default().push(id);
            }
            _ => roots.push(id),
        }
    }

    let mut forest = Vec::new();
    for id in roots {
        if let Some(node) = assemble(id, &mut nodes, &children) {
            forest.push(node);
        }
    }

    // Whatever never reached a root sits on a cycle; promote the first
    // member encountered in input order, which drains the rest.
    for &id in &order {
        if nodes.contains_key(&id) {
            if let Some(node) = assemble(id, &mut nodes, &children) {
                forest.push(node);
            }
        }
    }

    forest.extend(duplicates);
    forest
}

fn assemble(
    id: Uuid,
    nodes: &mut HashMap<Uuid, FolderNode>,
    children: &HashMap<Uuid, Vec<Uuid>>,
) -> Option<FolderNode> {
    // Removal guarantees each node is attached once and bounds recursion.
    let mut node = nodes.remove(&id)?;
    if let Some(child_ids) = children.get(&id) {
        for &child_id in child_ids {
            if let Some(child) = assemble(child_id, nodes, children) {
                node.children.push(child);
            }
        }
    }
    Some(node)
}

/// Depth-first search over the whole forest, first match wins.
pub fn find_node_by_id(forest: &[FolderNode], id: Uuid) -> Option<&FolderNode> {
    for node in forest {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_by_id(&node.children, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_node_by_id_mut(forest: &mut [FolderNode], id: Uuid) -> Option<&mut FolderNode> {
    for node in forest {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_by_id_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Consume one name segment per level with exact sibling matching.
///
/// Returns `None` on the first unmatched segment and on empty input.
pub fn find_node_by_path<'a>(
    forest: &'a [FolderNode],
    segments: &[&str],
) -> Option<&'a FolderNode> {
    let (first, rest) = segments.split_first()?;
    let node = forest.iter().find(|node| node.name == *first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        find_node_by_path(&node.children, rest)
    }
}

/// Root-to-node path for `id` via pre-order depth-first descent.
///
/// Each visited node is pushed onto an explicit stack, popped again on
/// backtrack; on a match the stack is the answer. Empty when absent.
pub fn find_nodes_along_path_to_id(forest: &[FolderNode], id: Uuid) -> Vec<&FolderNode> {
    let mut stack = Vec::new();
    if descend_to_id(forest, id, &mut stack) {
        stack
    } else {
        Vec::new()
    }
}

fn descend_to_id<'a>(nodes: &'a [FolderNode], id: Uuid, stack: &mut Vec<&'a FolderNode>) -> bool {
    for node in nodes {
        stack.push(node);
        if node.id == id || descend_to_id(&node.children, id, stack) {
            return true;
        }
        stack.pop();
    }
    false
}

/// Nodes along the matched prefix of `segments`.
///
/// Walking stops at the first unmatched segment; the prefix walked so far
/// is returned with `complete == false`.
pub fn find_nodes_along_path<'a>(
    forest: &'a [FolderNode],
    segments: &[&str],
) -> PathMatch<&'a FolderNode> {
    let mut items = Vec::new();
    let mut level = forest;
    for segment in segments {
        match level.iter().find(|node| node.name == *segment) {
            Some(node) => {
                items.push(node);
                level = &node.children;
            }
            None => {
                return PathMatch {
                    items,
                    complete: false,
                };
            }
        }
    }
    PathMatch {
        items,
        complete: true,
    }
}

/// Names along the matched prefix of `segments`; same walk as
/// [`find_nodes_along_path`].
pub fn full_path(forest: &[FolderNode], segments: &[&str]) -> PathMatch<String> {
    let walk = find_nodes_along_path(forest, segments);
    PathMatch {
        items: walk.items.iter().map(|node| node.name.clone()).collect(),
        complete: walk.complete,
    }
}

/// Append `page` to the children of `folder_id`, or to the root list when
/// the folder cannot be found (fallback, not an error). Mutates in place.
pub fn add_page_to_folder_tree(forest: &mut Vec<FolderNode>, folder_id: Uuid, page: FolderNode) {
    if let Err(page) = try_attach(forest, folder_id, page) {
        forest.push(page);
    }
}

fn try_attach(
    nodes: &mut [FolderNode],
    folder_id: Uuid,
    page: FolderNode,
) -> Result<(), FolderNode> {
    let mut page = page;
    for node in nodes.iter_mut() {
        if node.id == folder_id {
            node.children.push(page);
            return Ok(());
        }
        match try_attach(&mut node.children, folder_id, page) {
            Ok(()) => return Ok(()),
            Err(returned) => page = returned,
        }
    }
    Err(page)
}

/// Attach page leaves to their folders, in input order.
///
/// Pages without a folder, or whose folder is missing from the forest, land
/// at the root list.
pub fn attach_pages(forest: &mut Vec<FolderNode>, pages: Vec<PageRecord>) {
    for page in pages {
        let folder_id = page.folder_id;
        let leaf = FolderNode::page_leaf(page);
        match folder_id {
            Some(folder_id) => add_page_to_folder_tree(forest, folder_id, leaf),
            None => forest.push(leaf),
        }
    }
}
