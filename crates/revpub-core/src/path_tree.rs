//! Folder hierarchy of a publish batch.
//!
//! Each node corresponds to one destination folder touched by the batch
//! and holds the items destined directly for it. The walk order matches
//! the commit protocol's nesting: a folder is entered before its children
//! and left after its children and its own items.

use std::collections::BTreeMap;

use revpub_types::error::Result;
use revpub_types::path;

#[derive(Debug)]
pub struct PathNode<T> {
    path: String,
    children: BTreeMap<String, PathNode<T>>,
    uploads: Vec<T>,
}

impl<T> PathNode<T> {
    fn new(path: String) -> Self {
        Self {
            path,
            children: BTreeMap::new(),
            uploads: Vec::new(),
        }
    }

    /// Full folder path from the tree root (`""` for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn uploads(&self) -> &[T] {
        &self.uploads
    }

    pub fn children(&self) -> impl Iterator<Item = &PathNode<T>> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&PathNode<T>> {
        self.children.get(name)
    }

    fn walk<V: TreeVisitor<T>>(&self, visitor: &mut V) -> Result<()> {
        if !self.is_root() {
            visitor.enter_folder(self)?;
        }
        for child in self.children.values() {
            child.walk(visitor)?;
        }
        visitor.visit_uploads(self)?;
        if !self.is_root() {
            visitor.leave_folder(self)?;
        }
        Ok(())
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a T>) {
        for child in self.children.values() {
            child.collect(out);
        }
        out.extend(self.uploads.iter());
    }
}

/// Callbacks for [`PathTree::walk`]. The root is never entered or left,
/// but its items are visited.
pub trait TreeVisitor<T> {
    fn enter_folder(&mut self, node: &PathNode<T>) -> Result<()>;
    fn visit_uploads(&mut self, node: &PathNode<T>) -> Result<()>;
    fn leave_folder(&mut self, node: &PathNode<T>) -> Result<()>;
}

#[derive(Debug)]
pub struct PathTree<T> {
    root: PathNode<T>,
    len: usize,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        Self {
            root: PathNode::new(String::new()),
            len: 0,
        }
    }

    /// Append `item` to the node for `folder`, creating missing nodes on
    /// the way. `folder` must be normalized.
    pub fn insert(&mut self, folder: &str, item: T) {
        let mut node = &mut self.root;
        for seg in path::segments(folder) {
            let child_path = path::join(&node.path, seg);
            node = node
                .children
                .entry(seg.to_string())
                .or_insert_with(|| PathNode::new(child_path));
        }
        node.uploads.push(item);
        self.len += 1;
    }

    pub fn root(&self) -> &PathNode<T> {
        &self.root
    }

    /// Node for `folder`, if any item was scheduled at or below it.
    pub fn node(&self, folder: &str) -> Option<&PathNode<T>> {
        let mut node = &self.root;
        for seg in path::segments(folder) {
            node = node.children.get(seg)?;
        }
        Some(node)
    }

    /// Number of items inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn walk<V: TreeVisitor<T>>(&self, visitor: &mut V) -> Result<()> {
        self.root.walk(visitor)
    }

    /// Every item in walk order.
    pub fn uploads(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out
    }
}
