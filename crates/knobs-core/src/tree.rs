#![forbid(unsafe_code)]

//! Recursive construction of a control tree from a nested literal.

use crate::classify::{Classified, classify};
use crate::error::{KnobError, Result};
use crate::logging::trace;
use crate::node::{Folder, Node, is_meta_key};
use crate::path::NodePath;
use crate::value::{Map, Value};

/// Build the control tree for `input`.
///
/// The root is always a folder: `$`-prefixed keys of `input` become root
/// metadata, every other key is classified and folders are filled
/// recursively.
///
/// # Errors
///
/// [`KnobError::InvalidInput`] if `input` is not an object or if any nested
/// value has no control kind. The error path points at the offending key.
pub fn build(input: &Value) -> Result<Node> {
    let Value::Object(entries) = input else {
        return Err(KnobError::InvalidInput {
            path: NodePath::root(),
            found: input.type_name(),
        });
    };
    let mut path = NodePath::root();
    build_folder(entries, &mut path).map(Node::Folder)
}

fn build_folder(entries: &Map<Value>, path: &mut NodePath) -> Result<Folder> {
    let mut folder = Folder {
        children: Map::with_capacity(entries.len()),
        meta: Map::new(),
    };

    for (key, value) in entries.iter() {
        if is_meta_key(key) {
            folder.meta.insert(key, value.clone());
            continue;
        }

        path.push(key);
        let child = match classify(value).map_err(|err| err.within(path))? {
            Classified::Node(node) => node,
            Classified::Folder(inner) => Node::Folder(build_folder(inner, path)?),
        };
        trace!(path = %path, kind = %child.kind(), "classified");
        path.pop();

        folder.children.insert(key, child);
    }

    Ok(folder)
}
