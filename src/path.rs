/// A node of a key-value tree that paths can be resolved against.
pub trait PathNode: Sized {
    fn child(&self, key: &str) -> Option<&Self>;
    fn child_mut(&mut self, key: &str) -> Option<&mut Self>;
    fn insert_child(&mut self, key: &str, value: Self);
    fn is_mapping(&self) -> bool;
    fn empty_mapping() -> Self;
    fn from_text(value: &str) -> Self;
    /// Textual form of a scalar node, `None` for mappings, sequences and nulls.
    fn scalar_text(&self) -> Option<String>;
}

/// Every way of splitting `path` into a leading key and the remainder, longest key first.
fn splits(path: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    let whole = std::iter::once((path, None));
    let partial = path
        .rmatch_indices('.')
        .map(move |(index, _)| (&path[..index], Some(&path[index + 1..])));
    whole.chain(partial)
}

/// Finds the node addressed by a dotted `path` such as `deep.sub.version`.
///
/// Keys that contain dots are honoured: at every level the longest literal key matching the
/// remaining path is tried before splitting further, so `path.version` resolves to a key literally
/// named `path.version` when one exists.
pub fn lookup<'a, T: PathNode>(node: &'a T, path: &str) -> Option<&'a T> {
    for (key, rest) in splits(path) {
        let Some(child) = node.child(key) else {
            continue;
        };
        match rest {
            None => return Some(child),
            Some(rest) => {
                if let Some(found) = lookup(child, rest) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Reads the scalar addressed by `path` as text.
pub fn lookup_text<T: PathNode>(node: &T, path: &str) -> Option<String> {
    lookup(node, path).and_then(PathNode::scalar_text)
}

/// Stores `value` at `path`, creating intermediate mappings as needed.
///
/// An existing key is reused when one matches, literal keys first. Otherwise the path is split
/// on its first dot and missing or non-mapping intermediates are replaced by empty mappings.
pub fn assign<T: PathNode>(node: &mut T, path: &str, value: T) {
    if !node.is_mapping() {
        *node = T::empty_mapping();
    }

    for (key, rest) in splits(path) {
        match rest {
            None => {
                if node.child(key).is_some() {
                    node.insert_child(key, value);
                    return;
                }
            }
            Some(rest) => {
                if let Some(child) = node.child_mut(key) {
                    if child.is_mapping() {
                        assign(child, rest, value);
                        return;
                    }
                }
            }
        }
    }

    match path.split_once('.') {
        None => node.insert_child(path, value),
        Some((head, rest)) => {
            if !node.child(head).is_some_and(PathNode::is_mapping) {
                node.insert_child(head, T::empty_mapping());
            }
            if let Some(child) = node.child_mut(head) {
                assign(child, rest, value);
            }
        }
    }
}

impl PathNode for serde_json::Value {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_object()?.get(key)
    }

    fn child_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.as_object_mut()?.get_mut(key)
    }

    fn insert_child(&mut self, key: &str, value: Self) {
        if let Some(map) = self.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    fn is_mapping(&self) -> bool {
        self.is_object()
    }

    fn empty_mapping() -> Self {
        serde_json::Value::Object(serde_json::Map::new())
    }

    fn from_text(value: &str) -> Self {
        serde_json::Value::String(value.to_string())
    }

    fn scalar_text(&self) -> Option<String> {
        match self {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl PathNode for serde_yaml::Value {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_mapping()?.get(key)
    }

    fn child_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.as_mapping_mut()?.get_mut(key)
    }

    fn insert_child(&mut self, key: &str, value: Self) {
        if let Some(mapping) = self.as_mapping_mut() {
            mapping.insert(serde_yaml::Value::String(key.to_string()), value);
        }
    }

    fn is_mapping(&self) -> bool {
        matches!(self, serde_yaml::Value::Mapping(_))
    }

    fn empty_mapping() -> Self {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    }

    fn from_text(value: &str) -> Self {
        serde_yaml::Value::String(value.to_string())
    }

    fn scalar_text(&self) -> Option<String> {
        match self {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            serde_yaml::Value::Tagged(tagged) => tagged.value.scalar_text(),
            _ => None,
        }
    }
}
