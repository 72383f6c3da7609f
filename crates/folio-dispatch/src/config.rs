//! Configuration store.
//!
//! [`Config`] holds site settings as JSON values keyed by name. It is mutable
//! while bootstrap callbacks run and becomes read-only once the core locks it
//! at the start of [`Core::dispatch`](crate::Core::dispatch).
//!
//! # Defaults
//!
//! | Key | Default |
//! |-----|---------|
//! | `charset` | `"UTF-8"` |
//! | `not_found_page` | `"404"` |
//! | `base_url` | `""` |
//! | `site_title` | `"Folio"` |
//! | `default_template` | `"index"` |
//! | `content_extension` | `".md"` |
//! | `template_vars` | `{}` |
//!
//! # Example
//!
//! ```rust
//! use folio_dispatch::{Config, ConfigError};
//!
//! let mut config = Config::from_yaml_str("site_title: My Notes\n")?;
//! config.set("base_url", "https://notes.example")?;
//! config.lock();
//!
//! assert!(matches!(config.set("charset", "latin1"), Err(ConfigError::Locked { .. })));
//! assert_eq!(config.get_str("site_title"), Some("My Notes"));
//! # Ok::<(), ConfigError>(())
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use crate::vars::TemplateVars;

/// Response character encoding.
pub const CHARSET: &str = "charset";
/// Identifier of the page served when a lookup misses.
pub const NOT_FOUND_PAGE: &str = "not_found_page";
/// Public URL of the site root.
pub const BASE_URL: &str = "base_url";
/// Site name exposed to templates.
pub const SITE_TITLE: &str = "site_title";
/// Template used for pages without a `template` meta entry.
pub const DEFAULT_TEMPLATE: &str = "default_template";
/// File extension of content files.
pub const CONTENT_EXTENSION: &str = "content_extension";
/// Extra variables merged into every template render.
pub const TEMPLATE_VARS: &str = "template_vars";

const DEFAULT_CHARSET: &str = "UTF-8";
const DEFAULT_NOT_FOUND_PAGE: &str = "404";
const DEFAULT_TEMPLATE_NAME: &str = "index";

/// Errors raised by the configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mutation was attempted after [`Config::lock`].
    #[error("configuration is locked; cannot set \"{key}\"")]
    Locked {
        /// The key that was being written.
        key: String,
    },

    /// YAML source could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// YAML source parsed to something other than a mapping.
    #[error("configuration must be a mapping, found {found}")]
    NotAMapping {
        /// Kind of value found at the top level.
        found: &'static str,
    },
}

/// Site configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    values: Map<String, Value>,
    locked: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a configuration populated with the defaults.
    pub fn new() -> Self {
        let mut values = Map::new();
        values.insert(CHARSET.into(), Value::from(DEFAULT_CHARSET));
        values.insert(NOT_FOUND_PAGE.into(), Value::from(DEFAULT_NOT_FOUND_PAGE));
        values.insert(BASE_URL.into(), Value::from(""));
        values.insert(SITE_TITLE.into(), Value::from("Folio"));
        values.insert(DEFAULT_TEMPLATE.into(), Value::from(DEFAULT_TEMPLATE_NAME));
        values.insert(CONTENT_EXTENSION.into(), Value::from(".md"));
        values.insert(TEMPLATE_VARS.into(), Value::Object(Map::new()));
        Self {
            values,
            locked: false,
        }
    }

    /// Creates a configuration from a YAML mapping layered over the defaults.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.merge_yaml(source)?;
        Ok(config)
    }

    /// Overrides settings with the entries of a YAML mapping.
    ///
    /// An empty document is accepted and changes nothing.
    pub fn merge_yaml(&mut self, source: &str) -> Result<(), ConfigError> {
        if source.trim().is_empty() {
            return Ok(());
        }
        match serde_yaml::from_str::<Value>(source)? {
            Value::Object(map) => {
                for (key, value) in map {
                    self.set(key, value)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            other => Err(ConfigError::NotAMapping {
                found: value_kind(&other),
            }),
        }
    }

    /// Returns a setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a setting if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Response character encoding.
    pub fn charset(&self) -> &str {
        self.get_str(CHARSET).unwrap_or(DEFAULT_CHARSET)
    }

    /// Identifier of the page served when a lookup misses.
    pub fn not_found_page(&self) -> &str {
        self.get_str(NOT_FOUND_PAGE).unwrap_or(DEFAULT_NOT_FOUND_PAGE)
    }

    /// Public URL of the site root, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.get_str(BASE_URL).unwrap_or_default().trim_end_matches('/')
    }

    /// Template used for pages that do not name one.
    pub fn default_template(&self) -> &str {
        self.get_str(DEFAULT_TEMPLATE).unwrap_or(DEFAULT_TEMPLATE_NAME)
    }

    /// Writes a setting, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Locked`] once the configuration is locked.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, ConfigError> {
        let key = key.into();
        if self.locked {
            return Err(ConfigError::Locked { key });
        }
        Ok(self.values.insert(key, value.into()))
    }

    /// Writes a setting only if it is not present yet.
    ///
    /// Plugins register their defaults with this so that their bootstrap code
    /// can run again after the configuration has been locked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Locked`] if the key is absent and the
    /// configuration is locked.
    pub fn set_default(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ConfigError> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Ok(());
        }
        self.set(key, value).map(|_| ())
    }

    /// Template variables derived from the configuration.
    ///
    /// Contains `base_url`, `site_title`, `charset`, the whole configuration
    /// under `config`, and every entry of the `template_vars` setting.
    pub fn template_vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.insert(BASE_URL, self.base_url());
        vars.insert(
            SITE_TITLE,
            self.get_str(SITE_TITLE).unwrap_or_default(),
        );
        vars.insert(CHARSET, self.charset());
        vars.insert("config", Value::Object(self.values.clone()));
        if let Some(Value::Object(extra)) = self.values.get(TEMPLATE_VARS) {
            for (key, value) in extra {
                vars.insert(key.clone(), value.clone());
            }
        }
        vars
    }

    /// Makes the configuration read-only. Locking twice is a no-op.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns `true` once [`lock`](Self::lock) has been called.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Iterates over all settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
