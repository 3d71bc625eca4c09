use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Child mapping of a category, in document order.
pub type Children = IndexMap<String, ConceptNode>;

/// A node in the concept map.
///
/// On disk a node is a JSON object with optional `title` and `description`
/// plus either `children` (a category) or `message` (a leaf). When both are
/// present `children` wins; when neither is, the node is [`NodeKind::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConceptNode {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    Category { children: Children },
    Leaf { message: String },
    #[default]
    Empty,
}

impl ConceptNode {
    pub fn leaf(message: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Leaf {
                message: message.into(),
            },
            ..Default::default()
        }
    }

    pub fn category<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConceptNode)>,
    {
        Self {
            kind: NodeKind::Category {
                children: children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            },
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The relay payload, for leaves only.
    pub fn message(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { message } => Some(message),
            _ => None,
        }
    }

    /// Build a node from an arbitrary JSON value. Never fails: anything that
    /// is not an object becomes an empty node.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_object(map),
            _ => Self::empty(),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let text = |field: &str| map.get(field).and_then(Value::as_str).map(str::to_string);

        let kind = match (map.get("children"), map.get("message")) {
            (Some(Value::Object(children)), _) => NodeKind::Category {
                children: children
                    .iter()
                    .map(|(key, child)| (key.clone(), Self::from_json(child)))
                    .collect(),
            },
            // `children` of the wrong shape still marks a category, just an empty one.
            (Some(_), _) => NodeKind::Category {
                children: Children::new(),
            },
            (None, Some(Value::String(message))) => NodeKind::Leaf {
                message: message.clone(),
            },
            (None, Some(Value::Null)) => NodeKind::Leaf {
                message: String::new(),
            },
            (None, Some(other)) => NodeKind::Leaf {
                message: other.to_string(),
            },
            (None, None) => NodeKind::Empty,
        };

        Self {
            title: text("title"),
            description: text("description"),
            kind,
        }
    }
}

impl<'de> Deserialize<'de> for ConceptNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Object(map) => Ok(Self::from_object(map)),
            other => Err(de::Error::custom(format!(
                "concept map root must be a JSON object, found {}",
                json_type_name(other)
            ))),
        }
    }
}

impl Serialize for ConceptNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        match &self.kind {
            NodeKind::Category { children } => map.serialize_entry("children", children)?,
            NodeKind::Leaf { message } => map.serialize_entry("message", message)?,
            NodeKind::Empty => {}
        }
        map.end()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
