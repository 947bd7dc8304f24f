use crate::path_utils::PailPath;
use crate::Snapshot;
use std::collections::BTreeMap;
use std::fmt;

type DirNode = BTreeMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File,
    Dir(DirNode),
}

/// Nested rendering of a collection's path set.
///
/// Display-only: reconciliation never consults it. Two collections hold
/// the same paths exactly when their tree views are equal, which is what
/// the tests lean on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeView {
    root: DirNode,
}

impl TreeView {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut root = DirNode::new();
        for path in paths {
            let normalized = PailPath::normalize(path.as_ref());
            let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
            let Some((leaf, dirs)) = parts.split_last() else {
                continue;
            };

            let mut cur = &mut root;
            for part in dirs {
                let node = cur
                    .entry((*part).to_string())
                    .or_insert_with(|| Node::Dir(DirNode::new()));
                // A name used as both file and directory collapses to the
                // directory.
                if matches!(node, Node::File) {
                    *node = Node::Dir(DirNode::new());
                }
                let Node::Dir(children) = node else {
                    unreachable!()
                };
                cur = children;
            }
            cur.entry((*leaf).to_string()).or_insert(Node::File);
        }
        Self { root }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::from_paths(snapshot.keys())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        render_dir(&self.root, 0, &mut out);
        out
    }
}

impl fmt::Display for TreeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_dir(node: &DirNode, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    for (name, child) in node {
        match child {
            Node::File => {
                out.push_str(&indent);
                out.push_str("- ");
                out.push_str(name);
                out.push('\n');
            }
            Node::Dir(children) => {
                out.push_str(&indent);
                out.push_str(name);
                out.push_str(":\n");
                render_dir(children, depth + 1, out);
            }
        }
    }
}
