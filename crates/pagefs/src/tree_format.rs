// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Box-drawing rendering of the namespace.
//!
//! ```text
//! /
//! ├── docs/
//! │   └── notes.txt
//! └── readme
//! ```

use crate::node::Node;
use crate::path::ROOT;
use crate::tree::Namespace;

/// Renders the whole namespace, children sorted by name and directories
/// suffixed with `/`.
pub fn format_namespace(tree: &Namespace) -> String {
    let mut output = String::new();
    let Some(root) = tree.root() else {
        return output;
    };
    output.push_str(ROOT);
    output.push('\n');
    format_children(tree, root, "", &mut output);
    output
}

fn label(node: &Node) -> String {
    if node.is_dir() {
        format!("{}/", node.name())
    } else {
        node.name().to_string()
    }
}

fn format_children(tree: &Namespace, node: &Node, prefix: &str, output: &mut String) {
    let children: Vec<&Node> = node.children().filter_map(|id| tree.get(id)).collect();
    let count = children.len();

    for (i, child) in children.into_iter().enumerate() {
        let is_last = i + 1 == count;
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
        output.push_str(&label(child));
        output.push('\n');

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        format_children(tree, child, &child_prefix, output);
    }
}
