//! Namespace tree mapping paths to typed nodes

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{FsError, FsResult};
use crate::{ContentId, FileType, NodeId};

/// Permission bits kept on a node
const MODE_MASK: u32 = 0o7777;

/// Filesystem node types
#[derive(Clone, Debug)]
enum NodeKind {
    File { content_id: ContentId },
    /// Children in creation order, indexed by name
    Directory { children: IndexMap<String, NodeId> },
}

/// Filesystem node
#[derive(Clone, Debug)]
struct Node {
    name: String,
    kind: NodeKind,
    mode: u32,
}

impl Node {
    fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::File { .. } => FileType::File,
            NodeKind::Directory { .. } => FileType::Directory,
        }
    }
}

/// Read-only view of a node returned by lookups
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Directory {
        id: NodeId,
        name: &'a str,
        mode: u32,
    },
    File {
        id: NodeId,
        name: &'a str,
        mode: u32,
        content_id: ContentId,
    },
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match *self {
            NodeRef::Directory { id, .. } | NodeRef::File { id, .. } => id,
        }
    }

    /// Own path segment; empty for the root
    pub fn name(&self) -> &'a str {
        match *self {
            NodeRef::Directory { name, .. } | NodeRef::File { name, .. } => name,
        }
    }

    pub fn mode(&self) -> u32 {
        match *self {
            NodeRef::Directory { mode, .. } | NodeRef::File { mode, .. } => mode,
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            NodeRef::Directory { .. } => FileType::Directory,
            NodeRef::File { .. } => FileType::File,
        }
    }

    pub fn content_id(&self) -> Option<ContentId> {
        match *self {
            NodeRef::File { content_id, .. } => Some(content_id),
            NodeRef::Directory { .. } => None,
        }
    }
}

/// Outcome of inserting a file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileInsert {
    pub node: NodeId,
    /// Content that a same-named file owned before; the caller releases it
    pub replaced: Option<ContentId>,
}

/// Hierarchical namespace rooted at `/`.
///
/// Nodes live in an id-keyed arena; each directory maps child names to
/// ids, so resolution walks one segment at a time.
#[derive(Debug)]
pub struct NamespaceTree {
    nodes: HashMap<NodeId, Node>,
    next_node_id: u64,
    max_name_len: usize,
}

impl NamespaceTree {
    pub fn new(root_mode: u32, max_name_len: usize) -> Self {
        let root = Node {
            name: String::new(),
            kind: NodeKind::Directory {
                children: IndexMap::new(),
            },
            mode: root_mode & MODE_MASK,
        };

        let mut nodes = HashMap::new();
        nodes.insert(NodeId::ROOT, root);

        Self {
            nodes,
            next_node_id: NodeId::ROOT.get() + 1,
            max_name_len,
        }
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Split an absolute path into validated segments.
    ///
    /// `.` and `..` are rejected at any position, never collapsed.
    fn components<'p>(&self, path: &'p Path) -> FsResult<Vec<&'p str>> {
        let path = path.to_str().ok_or(FsError::InvalidName)?;
        let rest = path.strip_prefix('/').ok_or(FsError::InvalidArgument)?;

        let mut segments = Vec::new();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.len() > self.max_name_len {
                return Err(FsError::InvalidName);
            }
            segments.push(segment);
        }
        Ok(segments)
    }

    fn dir_children(&self, id: NodeId) -> FsResult<&IndexMap<String, NodeId>> {
        match &self.nodes.get(&id).ok_or(FsError::NotFound)?.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::NotADirectory),
        }
    }

    fn dir_children_mut(&mut self, id: NodeId) -> FsResult<&mut IndexMap<String, NodeId>> {
        match &mut self.nodes.get_mut(&id).ok_or(FsError::NotFound)?.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::NotADirectory),
        }
    }

    /// Walk `segments` from the root
    fn resolve(&self, segments: &[&str]) -> FsResult<NodeId> {
        let mut current = NodeId::ROOT;
        for segment in segments {
            current = *self
                .dir_children(current)?
                .get(*segment)
                .ok_or(FsError::NotFound)?;
        }
        Ok(current)
    }

    /// Resolve the directory that would contain `path` and the final segment
    fn resolve_parent<'p>(&self, path: &'p Path) -> FsResult<(NodeId, &'p str)> {
        let mut segments = self.components(path)?;
        // The root is never a child of anything
        let name = segments.pop().ok_or(FsError::AlreadyExists)?;
        let parent = self.resolve(&segments)?;
        self.dir_children(parent)?;
        Ok((parent, name))
    }

    fn node_ref(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let node = self.nodes.get(&id)?;
        Some(match node.kind {
            NodeKind::Directory { .. } => NodeRef::Directory {
                id,
                name: &node.name,
                mode: node.mode,
            },
            NodeKind::File { content_id } => NodeRef::File {
                id,
                name: &node.name,
                mode: node.mode,
                content_id,
            },
        })
    }

    fn attach(&mut self, parent: NodeId, name: &str, kind: NodeKind, mode: u32) -> FsResult<NodeId> {
        let id = self.allocate_node_id();
        self.dir_children_mut(parent)?.insert(name.to_string(), id);
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                kind,
                mode: mode & MODE_MASK,
            },
        );
        Ok(id)
    }

    /// Insert an empty directory; fails if anything of that name exists
    pub fn insert_directory(&mut self, path: &Path, mode: u32) -> FsResult<NodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        if self.dir_children(parent)?.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }

        let kind = NodeKind::Directory {
            children: IndexMap::new(),
        };
        self.attach(parent, name, kind, mode)
    }

    /// Insert a file owning `content_id`.
    ///
    /// An existing file of the same name keeps its node and listing
    /// position but has its content swapped for `content_id`.
    pub fn insert_file(&mut self, path: &Path, mode: u32, content_id: ContentId) -> FsResult<FileInsert> {
        let (parent, name) = self.resolve_parent(path)?;

        let existing = self.dir_children(parent)?.get(name).copied();
        if let Some(existing) = existing {
            let node = self.nodes.get_mut(&existing).ok_or(FsError::NotFound)?;
            return match &mut node.kind {
                NodeKind::File { content_id: current } => {
                    let replaced = std::mem::replace(current, content_id);
                    Ok(FileInsert {
                        node: existing,
                        replaced: Some(replaced),
                    })
                }
                NodeKind::Directory { .. } => Err(FsError::AlreadyExists),
            };
        }

        let node = self.attach(parent, name, NodeKind::File { content_id }, mode)?;
        Ok(FileInsert {
            node,
            replaced: None,
        })
    }

    pub fn lookup(&self, path: &Path) -> Option<NodeRef<'_>> {
        let segments = self.components(path).ok()?;
        let id = self.resolve(&segments).ok()?;
        self.node_ref(id)
    }

    pub fn is_directory(&self, path: &Path) -> bool {
        matches!(self.lookup(path), Some(NodeRef::Directory { .. }))
    }

    pub fn is_file(&self, path: &Path) -> bool {
        matches!(self.lookup(path), Some(NodeRef::File { .. }))
    }

    /// Directories first, then files, each group in creation order
    fn ordered<'a>(
        &'a self,
        children: &'a IndexMap<String, NodeId>,
    ) -> impl Iterator<Item = (&'a str, FileType)> + 'a {
        let of_type = move |wanted: FileType| {
            children.iter().filter_map(move |(name, id)| {
                let file_type = self.nodes.get(id)?.file_type();
                (file_type == wanted).then_some((name.as_str(), file_type))
            })
        };
        of_type(FileType::Directory).chain(of_type(FileType::File))
    }

    /// Lazily list the children of the directory at `path`
    pub fn list_children(&self, path: &Path) -> FsResult<impl Iterator<Item = (&str, FileType)> + '_> {
        let segments = self.components(path)?;
        let id = self.resolve(&segments)?;
        let children = self.dir_children(id)?;
        Ok(self.ordered(children))
    }

    pub fn list_root_children(&self) -> impl Iterator<Item = (&str, FileType)> + '_ {
        self.dir_children(NodeId::ROOT)
            .into_iter()
            .flat_map(move |children| self.ordered(children))
    }

    /// Number of directories (root excluded) and files
    pub fn counts(&self) -> (usize, usize) {
        self.nodes
            .iter()
            .filter(|(id, _)| **id != NodeId::ROOT)
            .fold((0, 0), |(dirs, files), (_, node)| match node.file_type() {
                FileType::Directory => (dirs + 1, files),
                FileType::File => (dirs, files + 1),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NamespaceTree {
        NamespaceTree::new(0o755, 255)
    }

    fn p(path: &str) -> &Path {
        Path::new(path)
    }

    #[test]
    fn test_root_always_present() {
        let tree = tree();
        assert!(tree.is_directory(p("/")));
        assert!(!tree.is_file(p("/")));

        let root = tree.lookup(p("/")).unwrap();
        assert_eq!(root.id(), NodeId::ROOT);
        assert_eq!(root.name(), "");
        assert_eq!(root.mode(), 0o755);
        assert_eq!(tree.list_root_children().count(), 0);
    }

    #[test]
    fn test_directory_and_file_kinds() {
        let mut tree = tree();
        tree.insert_directory(p("/docs"), 0o750).unwrap();
        tree.insert_file(p("/a.txt"), 0o644, ContentId::new(1)).unwrap();

        assert!(tree.is_directory(p("/docs")));
        assert!(!tree.is_file(p("/docs")));
        assert!(tree.is_file(p("/a.txt")));
        assert!(!tree.is_directory(p("/a.txt")));

        let file = tree.lookup(p("/a.txt")).unwrap();
        assert_eq!(file.file_type(), FileType::File);
        assert_eq!(file.content_id(), Some(ContentId::new(1)));
        assert_eq!(tree.lookup(p("/docs")).unwrap().mode(), 0o750);
    }

    #[test]
    fn test_duplicate_directory_rejected() {
        let mut tree = tree();
        tree.insert_directory(p("/docs"), 0o755).unwrap();
        assert_eq!(
            tree.insert_directory(p("/docs"), 0o755).unwrap_err(),
            FsError::AlreadyExists
        );
        assert_eq!(tree.counts(), (1, 0));
        assert_eq!(tree.insert_directory(p("/"), 0o755).unwrap_err(), FsError::AlreadyExists);
    }

    #[test]
    fn test_names_unique_across_kinds() {
        let mut tree = tree();
        tree.insert_file(p("/shared"), 0o644, ContentId::new(1)).unwrap();
        assert_eq!(
            tree.insert_directory(p("/shared"), 0o755).unwrap_err(),
            FsError::AlreadyExists
        );

        tree.insert_directory(p("/dir"), 0o755).unwrap();
        assert_eq!(
            tree.insert_file(p("/dir"), 0o644, ContentId::new(2)).unwrap_err(),
            FsError::AlreadyExists
        );
        assert_eq!(tree.counts(), (1, 1));
    }

    #[test]
    fn test_duplicate_file_replaces_content() {
        let mut tree = tree();
        let first = tree.insert_file(p("/a.txt"), 0o644, ContentId::new(1)).unwrap();
        assert_eq!(first.replaced, None);

        let second = tree.insert_file(p("/a.txt"), 0o600, ContentId::new(2)).unwrap();
        assert_eq!(second.node, first.node);
        assert_eq!(second.replaced, Some(ContentId::new(1)));

        let file = tree.lookup(p("/a.txt")).unwrap();
        assert_eq!(file.content_id(), Some(ContentId::new(2)));
        // Mode of the surviving node is kept
        assert_eq!(file.mode(), 0o644);
        assert_eq!(tree.list_root_children().count(), 1);
    }

    #[test]
    fn test_root_listing_order() {
        let mut tree = tree();
        tree.insert_file(p("/z.txt"), 0o644, ContentId::new(1)).unwrap();
        tree.insert_directory(p("/b"), 0o755).unwrap();
        tree.insert_file(p("/a.txt"), 0o644, ContentId::new(2)).unwrap();
        tree.insert_directory(p("/a"), 0o755).unwrap();

        let listed: Vec<_> = tree.list_root_children().collect();
        assert_eq!(
            listed,
            vec![
                ("b", FileType::Directory),
                ("a", FileType::Directory),
                ("z.txt", FileType::File),
                ("a.txt", FileType::File),
            ]
        );
    }

    #[test]
    fn test_path_validation() {
        let mut tree = tree();
        assert_eq!(
            tree.insert_directory(p("relative"), 0o755).unwrap_err(),
            FsError::InvalidArgument
        );
        assert_eq!(tree.insert_directory(p("/.."), 0o755).unwrap_err(), FsError::InvalidName);
        assert_eq!(tree.insert_directory(p("/./d"), 0o755).unwrap_err(), FsError::InvalidName);

        tree.insert_directory(p("/docs"), 0o755).unwrap();
        tree.insert_file(p("/a.txt"), 0o644, ContentId::new(1)).unwrap();
        assert_eq!(
            tree.insert_file(p("/a.txt/."), 0o644, ContentId::new(2)).unwrap_err(),
            FsError::InvalidName
        );
        assert_eq!(
            tree.insert_directory(p("/docs/."), 0o755).unwrap_err(),
            FsError::InvalidName
        );
        assert!(!tree.is_file(p("/a.txt/.")));
        assert!(!tree.is_directory(p("/docs/.")));
        assert!(matches!(tree.list_children(p("/docs/.")), Err(FsError::InvalidName)));
        assert_eq!(
            tree.lookup(p("/a.txt")).unwrap().content_id(),
            Some(ContentId::new(1))
        );

        let long = format!("/{}", "x".repeat(256));
        assert_eq!(
            tree.insert_file(p(&long), 0o644, ContentId::new(1)).unwrap_err(),
            FsError::InvalidName
        );
        assert!(tree.lookup(p("relative")).is_none());
    }

    #[test]
    fn test_redundant_separators_are_ignored() {
        let mut tree = tree();
        tree.insert_directory(p("/docs/"), 0o755).unwrap();
        assert!(tree.is_directory(p("//docs")));
        assert!(tree.is_directory(p("/docs")));
    }

    #[test]
    fn test_nested_resolution() {
        let mut tree = tree();
        tree.insert_directory(p("/docs"), 0o755).unwrap();
        tree.insert_directory(p("/docs/drafts"), 0o755).unwrap();
        tree.insert_file(p("/docs/drafts/note"), 0o644, ContentId::new(7)).unwrap();

        assert!(tree.is_file(p("/docs/drafts/note")));
        let listed: Vec<_> = tree.list_children(p("/docs")).unwrap().collect();
        assert_eq!(listed, vec![("drafts", FileType::Directory)]);
        // Only direct children of the root
        assert_eq!(tree.list_root_children().count(), 1);
    }

    #[test]
    fn test_missing_parent_and_file_parent() {
        let mut tree = tree();
        assert_eq!(
            tree.insert_directory(p("/missing/child"), 0o755).unwrap_err(),
            FsError::NotFound
        );

        tree.insert_file(p("/file"), 0o644, ContentId::new(1)).unwrap();
        assert_eq!(
            tree.insert_file(p("/file/child"), 0o644, ContentId::new(2)).unwrap_err(),
            FsError::NotADirectory
        );
        assert!(matches!(
            tree.list_children(p("/file")),
            Err(FsError::NotADirectory)
        ));
        assert!(matches!(tree.list_children(p("/nope")), Err(FsError::NotFound)));
        assert!(tree.lookup(p("/file/child")).is_none());
    }
}
