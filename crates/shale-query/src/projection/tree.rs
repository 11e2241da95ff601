use std::collections::HashMap;

use bson::{Bson, Document};

use crate::config::QueryConfig;
use crate::error::CommandError;

use super::positional;

/// A pre-built tree of included projection paths.
///
/// Given `["foo.bar.baz", "foo.bar.bux", "name", "tags.$"]`, builds:
/// ```text
/// { "foo": Branch({ "bar": Branch({ "baz": Leaf, "bux": Leaf }) }),
///   "name": Leaf,
///   "tags": Positional("tags.$") }
/// ```
///
/// Built once per projection and walked against each document in source
/// field order, so the result keeps the source's key order at every level.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldTree {
    /// Take the entire field value.
    Leaf,
    /// Keep the first array element matching the filter. Carries the full
    /// projection key (`"tags.$"`).
    Positional(String),
    /// Recurse into sub-fields.
    Branch(HashMap<String, FieldTree>),
}

impl FieldTree {
    /// Build a tree from dotted projection keys.
    pub(crate) fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> HashMap<String, FieldTree> {
        let mut root = HashMap::new();
        for path in paths {
            insert_path(&mut root, path, path);
        }
        root
    }
}

fn insert_path(map: &mut HashMap<String, FieldTree>, full_path: &str, remaining: &str) {
    match remaining.split_once('.') {
        None => {
            // "foo" wins over "foo.bar" regardless of order
            map.insert(remaining.to_string(), FieldTree::Leaf);
        }
        Some((top, "$")) => {
            map.insert(top.to_string(), FieldTree::Positional(full_path.to_string()));
        }
        Some((top, rest)) => {
            let entry = map
                .entry(top.to_string())
                .or_insert_with(|| FieldTree::Branch(HashMap::new()));
            if let FieldTree::Branch(children) = entry {
                insert_path(children, full_path, rest);
            }
        }
    }
}

/// Copy the fields named by `tree` from `src`, skipping `_id`.
///
/// Branches descend into documents and into the document elements of
/// arrays; scalar and nested-array elements are dropped. A branch over a
/// scalar yields nothing.
pub(crate) fn include(
    src: &Document,
    tree: &HashMap<String, FieldTree>,
    filter: &Document,
    config: &QueryConfig,
) -> Result<Document, CommandError> {
    let mut out = Document::new();
    for (key, value) in src {
        if key == "_id" {
            continue;
        }
        let Some(node) = tree.get(key) else { continue };

        match node {
            FieldTree::Leaf => {
                out.insert(key.clone(), value.clone());
            }
            FieldTree::Positional(full_key) => {
                let projected = match value {
                    Bson::Array(arr) => positional::first_match(arr, filter, full_key, config)?,
                    other => other.clone(),
                };
                out.insert(key.clone(), projected);
            }
            FieldTree::Branch(children) => match value {
                Bson::Document(sub) => {
                    out.insert(key.clone(), include(sub, children, filter, config)?);
                }
                Bson::Array(arr) => {
                    let mut elems = Vec::with_capacity(arr.len());
                    for elem in arr {
                        if let Bson::Document(sub) = elem {
                            elems.push(Bson::Document(include(sub, children, filter, config)?));
                        }
                    }
                    out.insert(key.clone(), elems);
                }
                _ => {}
            },
        }
    }
    Ok(out)
}

/// Remove `segments` from `doc`. Arrays on the path have the remaining
/// path removed from each of their document elements.
pub(crate) fn exclude(doc: &mut Document, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else { return };
    if rest.is_empty() {
        doc.remove(first);
        return;
    }
    if let Some(value) = doc.get_mut(first) {
        exclude_value(value, rest);
    }
}

fn exclude_value(value: &mut Bson, segments: &[String]) {
    match value {
        Bson::Document(doc) => exclude(doc, segments),
        Bson::Array(arr) => {
            for elem in arr {
                if let Bson::Document(doc) = elem {
                    exclude(doc, segments);
                }
            }
        }
        _ => {}
    }
}
