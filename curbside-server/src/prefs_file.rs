//! Preferences kept in a shared JSON file.
//!
//! The file is a flat object of settings, so companion tools can read and write the same
//! keys. Non-string values written by other tools are read back in their JSON text form.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use curbside_core::ports::{PortError, PreferencesStore};
use serde_json::Value;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct FilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl FilePreferences {
    /// Open the store; a missing file starts out empty.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("reading preferences from {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file yet");
                BTreeMap::new()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("opening {}", path.display()));
            }
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<(), String> {
        let text = serde_json::to_string_pretty(values).map_err(|err| err.to_string())?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        fs::write(&self.path, text).map_err(|err| err.to_string())
    }
}

impl PreferencesStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        match values.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), PortError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), Value::String(value));
        self.persist(&values).map_err(|reason| PortError::InvalidPreference {
            key: key.to_owned(),
            reason,
        })
    }
}
