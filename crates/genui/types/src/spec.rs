use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Node identifier inside a [`Spec`].
pub type NodeId = String;

/// Hex-encoded blake3 digest of a spec's canonical JSON form.
pub type SpecHash = String;

/// One addressable element of the UI graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "empty_props")]
    pub props: Value,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<Value>,
}

fn empty_props() -> Value {
    Value::Object(Map::new())
}

impl Node {
    /// Leaf node with no props.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            props: empty_props(),
            children: Vec::new(),
            visible: None,
            repeat: None,
            on: None,
            watch: None,
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        if !self.props.is_object() {
            self.props = empty_props();
        }
        if let Value::Object(map) = &mut self.props {
            map.insert(key.into(), value);
        }
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visible(mut self, visible: Value) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_repeat(mut self, repeat: Value) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn with_on(mut self, on: Value) -> Self {
        self.on = Some(on);
        self
    }

    /// Props as an object map, if they are one.
    pub fn props_map(&self) -> Option<&Map<String, Value>> {
        self.props.as_object()
    }
}

/// Flat UI graph: root id plus id-keyed elements.
///
/// `elements` is ordered so the serialized form (and therefore the content
/// hash) does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub root: NodeId,
    #[serde(default)]
    pub elements: BTreeMap<NodeId, Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,
}

impl Default for Spec {
    fn default() -> Self {
        Self::empty()
    }
}

impl Spec {
    /// The spec every thread starts with.
    pub fn empty() -> Self {
        Self {
            root: String::new(),
            elements: BTreeMap::new(),
            state: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.elements.is_empty()
    }

    pub fn with_root(root: impl Into<NodeId>) -> Self {
        Self {
            root: root.into(),
            ..Self::empty()
        }
    }

    pub fn insert(&mut self, id: impl Into<NodeId>, node: Node) -> Option<Node> {
        self.elements.insert(id.into(), node)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.elements.get(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// State object as a JSON value (`null` when absent).
    pub fn state_value(&self) -> Value {
        self.state
            .as_ref()
            .map(|state| Value::Object(state.clone()))
            .unwrap_or(Value::Null)
    }

    /// Canonical JSON bytes. Object keys are sorted by serde_json's default map.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// blake3 hex digest of the canonical form.
    pub fn content_hash(&self) -> Result<SpecHash, serde_json::Error> {
        let bytes = self.to_canonical_bytes()?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    /// Ids reachable from the root in depth-first pre-order, each once.
    /// Dangling child references are skipped.
    pub fn reachable_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.root.as_str()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.elements.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            order.push(id.to_string());
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
        order
    }

    /// Distinct node types reachable from the root, in first-seen order.
    pub fn reachable_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for id in self.reachable_ids() {
            if let Some(node) = self.elements.get(&id) {
                if !types.contains(&node.node_type) {
                    types.push(node.node_type.clone());
                }
            }
        }
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card() -> Spec {
        let mut spec = Spec::with_root("card");
        spec.insert("card", Node::new("Card").with_children(["title"]));
        spec.insert(
            "title",
            Node::new("CardTitle").with_prop("text", json!("Pro plan")),
        );
        spec
    }

    #[test]
    fn hash_is_stable_across_insertion_order() {
        let a = card();
        let mut b = Spec::with_root("card");
        b.insert(
            "title",
            Node::new("CardTitle").with_prop("text", json!("Pro plan")),
        );
        b.insert("card", Node::new("Card").with_children(["title"]));

        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn node_deserializes_with_defaults() {
        let node: Node = serde_json::from_value(json!({"type": "Divider"})).unwrap();
        assert_eq!(node.node_type, "Divider");
        assert_eq!(node.props, json!({}));
        assert!(node.children.is_empty());
        assert!(node.visible.is_none());
    }

    #[test]
    fn optional_metadata_is_not_serialized_when_absent() {
        let value = serde_json::to_value(Node::new("Text")).unwrap();
        assert_eq!(value, json!({"type": "Text", "props": {}, "children": []}));
    }

    #[test]
    fn reachable_types_skip_orphans() {
        let mut spec = card();
        spec.insert("orphan", Node::new("Badge"));
        assert_eq!(spec.reachable_types(), vec!["Card", "CardTitle"]);
    }

    #[test]
    fn empty_spec_round_trips() {
        let spec = Spec::empty();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value, json!({"root": "", "elements": {}}));
        assert!(serde_json::from_value::<Spec>(value).unwrap().is_empty());
    }
}
