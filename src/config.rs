// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YAML configuration files.
//!
//! Two files live under an explicit configuration root:
//!
//! - `keypoints_cfg.yaml`: a library of named keypoint schemas, shared across
//!   projects ([`SchemaLibrary`]).
//! - `train_cfg.yaml`: the project configuration ([`ProjectConfig`]). Only the
//!   `keypoints` section and `model.n_keypoints` matter here; every other key
//!   is preserved untouched on save.
//!
//! The root is passed in by the caller; nothing here searches parent
//! directories or depends on the location of the executable.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{AnnotatorError, Result};
use crate::schema::{Connection, KeypointSchema};
use crate::settings::{KEYPOINTS_CONFIG, TRAIN_CONFIG};
use crate::{verbose, warn};

/// Names starting with this prefix are reserved for UI placeholders.
pub const RESERVED_PREFIX: &str = "--";

/// Locations of the configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    root: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ConfigPaths {
    /// Resolve configuration files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Configuration root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `train_cfg.yaml`.
    #[must_use]
    pub fn project_config(&self) -> PathBuf {
        self.root.join(TRAIN_CONFIG)
    }

    /// Path of `keypoints_cfg.yaml`.
    #[must_use]
    pub fn schema_library(&self) -> PathBuf {
        self.root.join(KEYPOINTS_CONFIG)
    }
}

/// Check a library entry name.
///
/// # Errors
///
/// Rejects empty names and names with the reserved `--` prefix.
pub fn validate_config_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AnnotatorError::ValidationError(
            "Configuration name cannot be empty".to_string(),
        ));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(AnnotatorError::ValidationError(format!(
            "Invalid configuration name: '{name}'"
        )));
    }
    Ok(name)
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| AnnotatorError::file(path, e))?;
    serde_yaml::from_str(&content)
        .map_err(|e| AnnotatorError::ConfigError(format!("{}: {e}", path.display())))
}

fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value)?;
    std::fs::write(path, content).map_err(|e| AnnotatorError::file(path, e))
}

/// Parse one `[a, b]` connection, skipping anything else.
fn connection_from_value(value: &Value) -> Option<Connection> {
    let seq = value.as_sequence()?;
    match seq.as_slice() {
        [a, b] => {
            let a = usize::try_from(a.as_u64()?).ok()?;
            let b = usize::try_from(b.as_u64()?).ok()?;
            Some(Connection::new(a, b))
        }
        _ => None,
    }
}

/// Lenient schema extraction: malformed body parts and connections are dropped.
fn schema_from_value(name: &str, value: &Value) -> KeypointSchema {
    let bodyparts: Vec<String> = value
        .get("bodyparts")
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut connections = Vec::new();
    if let Some(seq) = value.get("connections").and_then(Value::as_sequence) {
        for (i, conn) in seq.iter().enumerate() {
            match connection_from_value(conn) {
                Some(c) => connections.push(c),
                None => warn!("Skipping malformed connection {i} in '{name}'"),
            }
        }
    }

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();

    KeypointSchema {
        name,
        bodyparts,
        connections,
    }
}

fn schema_to_value(schema: &KeypointSchema) -> Result<Value> {
    Ok(serde_yaml::to_value(schema)?)
}

/// Library of named keypoint schemas (`keypoints_cfg.yaml`).
#[derive(Debug, Clone, Default)]
pub struct SchemaLibrary {
    path: PathBuf,
    entries: BTreeMap<String, KeypointSchema>,
}

impl SchemaLibrary {
    /// Load the library at `path`.
    ///
    /// A missing or unparsable file yields an empty library; entries that are
    /// not mappings are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = BTreeMap::new();

        if path.is_file() {
            match read_yaml(&path) {
                Ok(Value::Mapping(map)) => {
                    for (key, value) in &map {
                        let Some(name) = key.as_str() else {
                            warn!("Skipping non-string configuration key in {}", path.display());
                            continue;
                        };
                        if !value.is_mapping() {
                            warn!("Skipping malformed configuration '{name}'");
                            continue;
                        }
                        entries.insert(name.to_string(), schema_from_value(name, value));
                    }
                }
                Ok(Value::Null) => {}
                Ok(_) => warn!("{} is not a mapping, ignoring it", path.display()),
                Err(e) => warn!("Error loading keypoints config: {e}"),
            }
        } else {
            verbose!("No schema library at {}", path.display());
        }

        Self { path, entries }
    }

    /// File backing this library.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Schema stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&KeypointSchema> {
        self.entries.get(name)
    }

    /// Number of stored configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `schema` under `name` (overwriting) and write the file.
    ///
    /// Nothing changes, in memory or on disk, if validation or the write fails.
    ///
    /// # Errors
    ///
    /// Rejects invalid names and schemas with violations; returns a
    /// [`AnnotatorError::FileError`] if the file cannot be written.
    pub fn save_as(&mut self, name: &str, schema: &KeypointSchema) -> Result<()> {
        let name = validate_config_name(name)?;
        if let Some(violation) = schema.validate(None).into_iter().next() {
            return Err(AnnotatorError::ValidationError(violation.to_string()));
        }

        let mut stored = schema.clone();
        stored.name = name.to_string();
        let previous = self.entries.insert(name.to_string(), stored);

        if let Err(e) = self.write() {
            match previous {
                Some(old) => self.entries.insert(name.to_string(), old),
                None => self.entries.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove `name` after `confirm` approves it.
    ///
    /// Returns `Ok(false)` when the confirmation is declined.
    ///
    /// # Errors
    ///
    /// Rejects reserved or unknown names; returns a
    /// [`AnnotatorError::FileError`] if the file cannot be written, in which
    /// case the entry is kept.
    pub fn delete<F>(&mut self, name: &str, confirm: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        let name = validate_config_name(name)?;
        if !self.entries.contains_key(name) {
            return Err(AnnotatorError::ValidationError(format!(
                "Unknown configuration '{name}'"
            )));
        }
        if !confirm(name) {
            return Ok(false);
        }

        let removed = self.entries.remove(name);
        if let Err(e) = self.write() {
            if let Some(schema) = removed {
                self.entries.insert(name.to_string(), schema);
            }
            return Err(e);
        }
        Ok(true)
    }

    fn write(&self) -> Result<()> {
        let mut map = Mapping::new();
        for (name, schema) in &self.entries {
            map.insert(Value::String(name.clone()), schema_to_value(schema)?);
        }
        write_yaml(&self.path, &Value::Mapping(map))
    }
}

/// Counts describing a project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    /// `keypoints.name`, or `Unnamed`.
    pub config_name: String,
    /// Number of body parts.
    pub total_bodyparts: usize,
    /// Number of connections.
    pub total_connections: usize,
    /// `model.n_keypoints`, if present.
    pub model_keypoints: Option<u64>,
    /// Whether a `model` section exists.
    pub has_model_config: bool,
    /// Whether a `training` section exists.
    pub has_training_config: bool,
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} keypoints, {} connections",
            self.config_name, self.total_bodyparts, self.total_connections
        )?;
        if let Some(n) = self.model_keypoints {
            write!(f, ", model.n_keypoints={n}")?;
        }
        Ok(())
    }
}

/// Project configuration document (`train_cfg.yaml`).
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    path: PathBuf,
    doc: Value,
}

impl ProjectConfig {
    /// An empty document that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: Value::Mapping(Mapping::new()),
        }
    }

    /// Load the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or not a mapping.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match read_yaml(&path)? {
            Value::Null => Value::Mapping(Mapping::new()),
            doc @ Value::Mapping(_) => doc,
            _ => {
                return Err(AnnotatorError::ConfigError(format!(
                    "{}: config must be a mapping",
                    path.display()
                )));
            }
        };
        Ok(Self { path, doc })
    }

    /// File backing this document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw YAML document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.doc
    }

    /// The active keypoint schema from the `keypoints` section.
    #[must_use]
    pub fn keypoints(&self) -> KeypointSchema {
        self.doc
            .get("keypoints")
            .map(|section| schema_from_value("", section))
            .unwrap_or_default()
    }

    /// `model.n_keypoints`, if present and numeric.
    #[must_use]
    pub fn model_keypoints(&self) -> Option<u64> {
        self.doc.get("model")?.get("n_keypoints")?.as_u64()
    }

    /// Replace the `keypoints` section.
    ///
    /// `keypoints.name` is updated when `name` is given. `model.n_keypoints`
    /// is kept equal to the body-part count whenever a `model` section exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be represented as YAML.
    pub fn set_keypoints(&mut self, name: Option<&str>, schema: &KeypointSchema) -> Result<()> {
        let n_keypoints = serde_yaml::to_value(schema.len())?;
        let bodyparts = serde_yaml::to_value(&schema.bodyparts)?;
        let connections = serde_yaml::to_value(&schema.connections)?;

        let root = root_mapping(&mut self.doc);
        let keypoints = child_mapping(root, "keypoints");
        if let Some(name) = name {
            keypoints.insert(key("name"), Value::String(name.to_string()));
        }
        keypoints.insert(key("bodyparts"), bodyparts);
        keypoints.insert(key("connections"), connections);

        if let Some(Value::Mapping(model)) = root.get_mut("model") {
            model.insert(key("n_keypoints"), n_keypoints);
        }
        Ok(())
    }

    /// Problems with the document; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(section) = self.doc.get("keypoints") {
            match section.get("bodyparts") {
                Some(Value::Sequence(seq)) if seq.is_empty() => {
                    errors.push("Bodyparts list cannot be empty".to_string());
                }
                Some(Value::Sequence(_)) | None => {}
                Some(_) => errors.push("Bodyparts must be a list".to_string()),
            }

            let n_bodyparts = self.keypoints().len();
            match section.get("connections") {
                Some(Value::Sequence(seq)) => {
                    for (i, conn) in seq.iter().enumerate() {
                        match connection_from_value(conn) {
                            None => errors.push(format!("Connection {i} must be a list of 2 indices")),
                            Some(c) if !c.in_range(n_bodyparts) => {
                                errors.push(format!("Connection {i} has invalid indices"));
                            }
                            Some(_) => {}
                        }
                    }
                }
                Some(_) => errors.push("Connections must be a list".to_string()),
                None => {}
            }
        }

        if let Some(n) = self.model_keypoints() {
            let expected = self.keypoints().len();
            if usize::try_from(n).ok() != Some(expected) {
                errors.push(format!(
                    "Model n_keypoints ({n}) doesn't match bodyparts count ({expected})"
                ));
            }
        }

        errors
    }

    /// Summary counts for display.
    #[must_use]
    pub fn summary(&self) -> ConfigSummary {
        let schema = self.keypoints();
        ConfigSummary {
            config_name: self
                .doc
                .get("keypoints")
                .and_then(|k| k.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("Unnamed")
                .to_string(),
            total_bodyparts: schema.len(),
            total_connections: schema.connections.len(),
            model_keypoints: self.model_keypoints(),
            has_model_config: self.doc.get("model").is_some(),
            has_training_config: self.doc.get("training").is_some(),
        }
    }

    /// Write the document back to its file.
    ///
    /// # Errors
    ///
    /// Returns a [`AnnotatorError::FileError`] if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        write_yaml(&self.path, &self.doc)
    }
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn root_mapping(doc: &mut Value) -> &mut Mapping {
    if !doc.is_mapping() {
        *doc = Value::Mapping(Mapping::new());
    }
    match doc {
        Value::Mapping(map) => map,
        _ => unreachable!("document was just replaced with a mapping"),
    }
}

fn child_mapping<'a>(parent: &'a mut Mapping, name: &str) -> &'a mut Mapping {
    let entry = parent
        .entry(key(name))
        .or_insert(Value::Mapping(Mapping::new()));
    root_mapping(entry)
}
