//! Declarative property descriptors.
//!
//! A `Property` describes one configuration value of a context or service:
//! its default, whether it is required, whether it is shown to operators,
//! and an optional validator that normalizes the raw input.

pub mod validators;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::PropertyError;

/// Validator: returns the normalized value or a human readable reason.
pub type Validator = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Default applied when no raw value is supplied.
#[derive(Clone)]
pub enum DefaultValue {
    Fixed(String),
    /// Produced on demand, e.g. generated identifiers.
    Generated(Arc<dyn Fn() -> String + Send + Sync>),
}

impl DefaultValue {
    fn produce(&self) -> String {
        match self {
            DefaultValue::Fixed(value) => value.clone(),
            DefaultValue::Generated(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            DefaultValue::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Property {
    name: String,
    description: String,
    default: Option<DefaultValue>,
    required: bool,
    hidden: bool,
    validator: Option<Validator>,
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("hidden", &self.hidden)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            default: None,
            required: false,
            hidden: false,
            validator: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Fixed(value.into()));
        self
    }

    /// Default computed each time it is needed.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generated(Arc::new(producer)));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Resolve a raw value into its normalized form.
    ///
    /// Absent or blank input falls back to the default. A required property
    /// that is still absent fails; an optional one resolves to `None`.
    pub fn resolve(&self, raw: Option<&str>) -> Result<Option<String>, PropertyError> {
        let supplied = raw.filter(|v| !v.trim().is_empty()).map(str::to_string);
        let value = match supplied {
            Some(value) => Some(value),
            None => self
                .default
                .as_ref()
                .map(DefaultValue::produce)
                .filter(|v| !v.trim().is_empty()),
        };

        let Some(value) = value else {
            if self.required {
                return Err(PropertyError::MissingRequired {
                    name: self.name.clone(),
                });
            }
            return Ok(None);
        };

        match &self.validator {
            Some(validator) => validator(&value)
                .map(Some)
                .map_err(|reason| PropertyError::Invalid {
                    name: self.name.clone(),
                    reason,
                }),
            None => Ok(Some(value)),
        }
    }
}

/// Outcome of resolving a whole property set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedProperties {
    pub values: BTreeMap<String, String>,
    /// Names whose value came from a default rather than the input.
    pub defaulted: Vec<String>,
}

/// Resolve every definition against `raw`.
///
/// Values in `raw` without a matching definition are kept untouched so
/// hand-edited records survive a round trip.
pub fn resolve_properties(
    definitions: &[Property],
    raw: &BTreeMap<String, String>,
) -> Result<ResolvedProperties, PropertyError> {
    let mut resolved = ResolvedProperties {
        values: raw.clone(),
        defaulted: Vec::new(),
    };

    for property in definitions {
        let input = raw.get(property.name()).map(String::as_str);
        let was_supplied = input.is_some_and(|v| !v.trim().is_empty());
        match property.resolve(input)? {
            Some(value) => {
                if !was_supplied {
                    resolved.defaulted.push(property.name().to_string());
                }
                resolved.values.insert(property.name().to_string(), value);
            }
            None => {
                resolved.values.remove(property.name());
            }
        }
    }

    Ok(resolved)
}
