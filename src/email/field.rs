//! Header fields and the version-tolerant way of reading their raw values.
//!
//! The message format changed how a field exposes its unparsed value twice:
//! newer formats have a public accessor, `2.7.0` keeps it in an internal
//! `@unparsed_value` attribute and anything older stores it under `@value`.
//! Callers only ever see [`Field::raw_value`].

use semver::Version;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const CURRENT_FORMAT_VERSION: Version = Version::new(2, 8, 1);

const ACCESSOR_PIVOT: Version = Version::new(2, 7, 0);
const UNPARSED_VALUE_ATTRIBUTE: &str = "@unparsed_value";
const VALUE_ATTRIBUTE: &str = "@value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessor {
    /// Public accessor, formats newer than 2.7.0.
    UnparsedValue,
    /// Internal `@unparsed_value` attribute, format 2.7.0 only.
    UnparsedValueAttribute,
    /// Internal `@value` attribute, formats older than 2.7.0.
    ValueAttribute,
}

impl FieldAccessor {
    pub fn for_version(version: &Version) -> Self {
        match version.cmp_precedence(&ACCESSOR_PIVOT) {
            Ordering::Greater => FieldAccessor::UnparsedValue,
            Ordering::Equal => FieldAccessor::UnparsedValueAttribute,
            Ordering::Less => FieldAccessor::ValueAttribute,
        }
    }

    pub fn read<'a>(&self, field: &'a Field) -> Option<&'a Value> {
        match self {
            FieldAccessor::UnparsedValue => field.unparsed_value(),
            FieldAccessor::UnparsedValueAttribute => field.attribute(UNPARSED_VALUE_ATTRIBUTE),
            FieldAccessor::ValueAttribute => field.attribute(VALUE_ATTRIBUTE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    version: Version,
    unparsed_value: Option<Value>,
    attributes: BTreeMap<&'static str, Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_version(name, value, CURRENT_FORMAT_VERSION)
    }

    /// Builds a field laid out the way the given format version stores it.
    pub fn with_version(name: impl Into<String>, value: impl Into<Value>, version: Version) -> Self {
        let value = value.into();
        let mut attributes = BTreeMap::new();
        let mut unparsed_value = None;

        match FieldAccessor::for_version(&version) {
            FieldAccessor::UnparsedValue => {
                attributes.insert(UNPARSED_VALUE_ATTRIBUTE, value.clone());
                unparsed_value = Some(value);
            }
            FieldAccessor::UnparsedValueAttribute => {
                attributes.insert(UNPARSED_VALUE_ATTRIBUTE, value);
            }
            FieldAccessor::ValueAttribute => {
                attributes.insert(VALUE_ATTRIBUTE, value);
            }
        }

        Self {
            name: name.into(),
            version,
            unparsed_value,
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Public accessor. Only fields from formats newer than 2.7.0 have it.
    pub fn unparsed_value(&self) -> Option<&Value> {
        self.unparsed_value.as_ref()
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The stored value through the accessor for this field's version. A
    /// `null` value reads as absent.
    pub fn raw_value(&self) -> Option<&Value> {
        FieldAccessor::for_version(&self.version)
            .read(self)
            .filter(|value| !value.is_null())
    }

    /// Header line text: strings verbatim, anything else as compact JSON.
    pub fn display_value(&self) -> String {
        match self.raw_value() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}
