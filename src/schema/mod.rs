// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint schema: the ordered body-part list and its skeleton edges.
//!
//! A body part's position in [`KeypointSchema::bodyparts`] is its identifier
//! everywhere else in the crate (`bodypart_idx`). Editing the schema never
//! touches annotations that were already stored; indices that fall out of
//! range after an edit are reported by [`KeypointSchema::validate`] and
//! otherwise ignored by every consumer.

/// Built-in schemas.
pub mod preset;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};
use crate::store::AnnotationStore;

/// An undirected skeleton edge between two body-part indices.
///
/// Serialized as a two-element list (`[a, b]`) in YAML and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Connection {
    /// First endpoint.
    pub a: usize,
    /// Second endpoint.
    pub b: usize,
}

impl Connection {
    /// Create a connection between `a` and `b`.
    #[must_use]
    pub const fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// The same edge with endpoints in ascending order.
    #[must_use]
    pub const fn normalized(self) -> Self {
        if self.a <= self.b {
            self
        } else {
            Self::new(self.b, self.a)
        }
    }

    /// Whether two connections describe the same undirected edge.
    #[must_use]
    pub fn same_edge(self, other: Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Whether both endpoints are the same index.
    #[must_use]
    pub const fn is_self_loop(self) -> bool {
        self.a == self.b
    }

    /// Whether both endpoints are below `len`.
    #[must_use]
    pub const fn in_range(self, len: usize) -> bool {
        self.a < len && self.b < len
    }
}

impl From<[usize; 2]> for Connection {
    fn from(pair: [usize; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<Connection> for [usize; 2] {
    fn from(conn: Connection) -> Self {
        [conn.a, conn.b]
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.a, self.b)
    }
}

/// A problem found by [`KeypointSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// The schema has no body parts.
    EmptyBodyparts,
    /// A body-part name occurs more than once.
    DuplicateBodypart(String),
    /// A connection references an index outside the body-part list.
    ConnectionOutOfRange(Connection),
    /// A connection joins a body part to itself.
    SelfConnection(Connection),
    /// A connection repeats an earlier edge, in either orientation.
    DuplicateConnection(Connection),
    /// A stored annotation uses an index the schema no longer has.
    StaleAnnotation {
        /// Image filename holding the stale point.
        image: String,
        /// The out-of-range body-part index.
        bodypart_idx: usize,
    },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBodyparts => write!(f, "Bodyparts list cannot be empty"),
            Self::DuplicateBodypart(name) => write!(f, "Duplicate bodypart '{name}'"),
            Self::ConnectionOutOfRange(c) => write!(f, "Connection {c} has invalid indices"),
            Self::SelfConnection(c) => write!(f, "Connection {c} connects a point to itself"),
            Self::DuplicateConnection(c) => write!(f, "Connection {c} already exists"),
            Self::StaleAnnotation {
                image,
                bodypart_idx,
            } => write!(
                f,
                "{image}: annotation index {bodypart_idx} is outside the current schema"
            ),
        }
    }
}

/// Ordered body parts plus skeleton connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeypointSchema {
    /// Configuration name (may be empty for an unnamed schema).
    #[serde(default)]
    pub name: String,
    /// Body-part names; the position is the keypoint identifier.
    #[serde(default)]
    pub bodyparts: Vec<String>,
    /// Undirected skeleton edges.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl KeypointSchema {
    /// Create a schema from names and connections.
    pub fn new(
        name: impl Into<String>,
        bodyparts: impl IntoIterator<Item = impl Into<String>>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Self {
        Self {
            name: name.into(),
            bodyparts: bodyparts.into_iter().map(Into::into).collect(),
            connections: connections.into_iter().collect(),
        }
    }

    /// Number of body parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodyparts.len()
    }

    /// Whether the schema has no body parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodyparts.is_empty()
    }

    /// Name of the body part at `idx`, if it exists.
    #[must_use]
    pub fn bodypart(&self, idx: usize) -> Option<&str> {
        self.bodyparts.get(idx).map(String::as_str)
    }

    /// Index of the body part called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bodyparts.iter().position(|b| b == name)
    }

    /// Check the schema and, optionally, a store against it.
    ///
    /// An empty result means the schema is valid. Stale annotation indices are
    /// reported but never repaired.
    #[must_use]
    pub fn validate(&self, store: Option<&AnnotationStore>) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if self.bodyparts.is_empty() {
            violations.push(SchemaViolation::EmptyBodyparts);
        }

        let mut names = HashSet::new();
        for name in &self.bodyparts {
            if !names.insert(name.as_str()) {
                violations.push(SchemaViolation::DuplicateBodypart(name.clone()));
            }
        }

        let mut edges = HashSet::new();
        for &conn in &self.connections {
            if !conn.in_range(self.len()) {
                violations.push(SchemaViolation::ConnectionOutOfRange(conn));
            } else if conn.is_self_loop() {
                violations.push(SchemaViolation::SelfConnection(conn));
            } else if !edges.insert(conn.normalized()) {
                violations.push(SchemaViolation::DuplicateConnection(conn));
            }
        }

        if let Some(store) = store {
            for (image, annotation) in store.iter() {
                for idx in annotation.indices().filter(|&i| i >= self.len()) {
                    violations.push(SchemaViolation::StaleAnnotation {
                        image: image.to_string(),
                        bodypart_idx: idx,
                    });
                }
            }
        }

        violations
    }

    /// Append a body part.
    ///
    /// # Errors
    ///
    /// Rejects empty (after trimming) and duplicate names.
    pub fn add_bodypart(&mut self, name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AnnotatorError::ValidationError(
                "Bodypart name cannot be empty".to_string(),
            ));
        }
        if self.index_of(name).is_some() {
            return Err(AnnotatorError::ValidationError(format!(
                "Bodypart '{name}' already exists"
            )));
        }
        self.bodyparts.push(name.to_string());
        Ok(self.bodyparts.len() - 1)
    }

    /// Rename the body part at `idx`.
    ///
    /// # Errors
    ///
    /// Rejects out-of-range indices and empty or duplicate names.
    pub fn rename_bodypart(&mut self, idx: usize, name: &str) -> Result<()> {
        let name = name.trim();
        self.check_index(idx)?;
        if name.is_empty() {
            return Err(AnnotatorError::ValidationError(
                "Bodypart name cannot be empty".to_string(),
            ));
        }
        if self.index_of(name).is_some_and(|existing| existing != idx) {
            return Err(AnnotatorError::ValidationError(format!(
                "Bodypart '{name}' already exists"
            )));
        }
        self.bodyparts[idx] = name.to_string();
        Ok(())
    }

    /// Remove the body part at `idx`, returning its name.
    ///
    /// Connections touching `idx` are dropped and higher indices shift down
    /// by one. Stored annotations are not migrated.
    ///
    /// # Errors
    ///
    /// Rejects out-of-range indices.
    pub fn remove_bodypart(&mut self, idx: usize) -> Result<String> {
        self.check_index(idx)?;
        let removed = self.bodyparts.remove(idx);
        let shift = |i: usize| if i > idx { i - 1 } else { i };
        self.connections = self
            .connections
            .iter()
            .filter(|c| c.a != idx && c.b != idx)
            .map(|c| Connection::new(shift(c.a), shift(c.b)))
            .collect();
        Ok(removed)
    }

    /// Move the body part at `from` to position `to`.
    ///
    /// Connections are re-derived so they keep joining the same named parts.
    ///
    /// # Errors
    ///
    /// Rejects out-of-range indices.
    pub fn move_bodypart(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        let moved = order.remove(from);
        order.insert(to, moved);

        let mut new_index = vec![0; self.len()];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = new;
        }

        self.bodyparts = order.iter().map(|&old| self.bodyparts[old].clone()).collect();
        for conn in &mut self.connections {
            if conn.in_range(new_index.len()) {
                *conn = Connection::new(new_index[conn.a], new_index[conn.b]);
            }
        }
        Ok(())
    }

    /// Add a skeleton edge.
    ///
    /// # Errors
    ///
    /// Rejects self-loops, out-of-range endpoints and edges that already exist
    /// in either orientation. The schema is unchanged on error.
    pub fn add_connection(&mut self, a: usize, b: usize) -> Result<Connection> {
        let conn = Connection::new(a, b);
        if conn.is_self_loop() {
            return Err(AnnotatorError::ValidationError(
                "Cannot connect a point to itself".to_string(),
            ));
        }
        if !conn.in_range(self.len()) {
            return Err(AnnotatorError::ValidationError(format!(
                "Connection {conn} has invalid indices for {} bodyparts",
                self.len()
            )));
        }
        if self.connections.iter().any(|c| c.same_edge(conn)) {
            return Err(AnnotatorError::ValidationError(
                "This connection already exists".to_string(),
            ));
        }
        self.connections.push(conn);
        Ok(conn)
    }

    /// Remove a skeleton edge in either orientation. Returns whether it existed.
    pub fn remove_connection(&mut self, conn: Connection) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| !c.same_edge(conn));
        self.connections.len() != before
    }

    /// Human-readable label for a connection, e.g. `nose ↔ left_eye`.
    #[must_use]
    pub fn connection_label(&self, conn: Connection) -> String {
        let name = |i: usize| self.bodypart(i).unwrap_or("?");
        format!("{} ↔ {}", name(conn.a), name(conn.b))
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx < self.len() {
            Ok(())
        } else {
            Err(AnnotatorError::ValidationError(format!(
                "Bodypart index {idx} out of range (0..{})",
                self.len()
            )))
        }
    }
}
