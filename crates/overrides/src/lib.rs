//! Persisted user binding overrides.
//!
//! The on-disk form is a flat map from command name to a list of
//! `(keysym, modifier_mask, modifiers, click_count)` tuples, stored as RON or
//! JSON. Loading is tolerant per command: an entry that is not a list of specs
//! is reported as [`Error::Malformed`] and left out of the map, so that
//! command keeps its layout default while every other entry still applies.

use std::{collections::BTreeMap, ffi::OsStr, fs, path::Path, result::Result as StdResult};

use tracing::{debug, warn};

mod error;
pub use error::{Error, Result, excerpt_at};

mod spec;
pub use spec::{BindingSpec, OverrideMap, SpecTuple};

/// Highest click count a binding may use.
pub const MAX_CLICK_COUNT: u32 = 3;

/// Result of loading an override document.
#[derive(Debug, Default)]
pub struct Loaded {
    /// Well-formed entries.
    pub map: OverrideMap,
    /// One error per skipped command entry.
    pub malformed: Vec<Error>,
}

/// Load overrides from a `.ron` or `.json` file.
pub fn load_from_path(path: &Path) -> Result<Loaded> {
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    let res = match path.extension().and_then(OsStr::to_str) {
        Some("ron") => parse_ron_str(&source),
        Some("json") => parse_json_str(&source),
        _ => {
            return Err(Error::Read {
                path: Some(path.to_path_buf()),
                message: "Unsupported override format (expected a .ron or .json file)".to_string(),
            });
        }
    };
    let loaded = res.map_err(|e| attach_path(e, path))?;
    debug!(
        path = %path.display(),
        commands = loaded.map.len(),
        malformed = loaded.malformed.len(),
        "overrides_loaded"
    );
    Ok(loaded)
}

/// Parse a RON override document.
pub fn parse_ron_str(source: &str) -> Result<Loaded> {
    let raw: BTreeMap<String, ron::Value> = ron::from_str(source).map_err(|e| {
        let (line, col, message) = error::split_location(&e.to_string());
        Error::Parse {
            path: None,
            line,
            col,
            excerpt: excerpt_at(source, line, col),
            message,
        }
    })?;
    Ok(collect(raw, |v| v.into_rust::<Vec<SpecTuple>>().map_err(|e| e.to_string())))
}

/// Parse a JSON override document.
pub fn parse_json_str(source: &str) -> Result<Loaded> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(source).map_err(|e| {
        let (line, col) = (e.line().max(1), e.column().max(1));
        Error::Parse {
            path: None,
            line,
            col,
            excerpt: excerpt_at(source, line, col),
            message: e.to_string(),
        }
    })?;
    Ok(collect(raw, |v| {
        serde_json::from_value::<Vec<SpecTuple>>(v).map_err(|e| e.to_string())
    }))
}

/// Convert raw per-command values, keeping well-formed entries.
fn collect<V, F>(raw: BTreeMap<String, V>, mut convert: F) -> Loaded
where
    F: FnMut(V) -> StdResult<Vec<SpecTuple>, String>,
{
    let mut loaded = Loaded::default();
    for (command, value) in raw {
        match convert(value).and_then(validate) {
            Ok(specs) => loaded.map.insert(command, specs),
            Err(message) => {
                warn!(command = %command, error = %message, "override_malformed");
                loaded.malformed.push(Error::Malformed { command, message });
            }
        }
    }
    loaded
}

/// Reject specs whose click count is out of range.
fn validate(tuples: Vec<SpecTuple>) -> StdResult<Vec<BindingSpec>, String> {
    tuples
        .into_iter()
        .map(BindingSpec::from)
        .map(|s| {
            if !s.is_unbind() && !(1..=MAX_CLICK_COUNT).contains(&s.click_count) {
                Err(format!("click count {} out of range", s.click_count))
            } else {
                Ok(s)
            }
        })
        .collect()
}

/// Record the source path on document-level errors.
fn attach_path(e: Error, p: &Path) -> Error {
    match e {
        Error::Read { message, .. } => Error::Read {
            path: Some(p.to_path_buf()),
            message,
        },
        Error::Parse {
            line,
            col,
            message,
            excerpt,
            ..
        } => Error::Parse {
            path: Some(p.to_path_buf()),
            line,
            col,
            message,
            excerpt,
        },
        other => other,
    }
}

impl OverrideMap {
    /// Render as a pretty RON document suitable for [`parse_ron_str`].
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            Error::Serialize {
                message: e.to_string(),
            }
        })
    }

    /// Render as a pretty JSON document suitable for [`parse_json_str`].
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialize {
            message: e.to_string(),
        })
    }
}
