//! Property: per-attribute validation, coercion and index flag.

use std::fmt;

use crate::element::Value;
use crate::{Error, Result};
use super::ScalarType;

/// How one application attribute maps onto one store field.
///
/// ```rust
/// use graph_ogm::schema::{Property, ScalarType};
///
/// let name = Property::new("name", ScalarType::string(127))
///     .nullable(false)
///     .indexed(true);
/// assert_eq!(name.store_name(), "name");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name_py: String,
    name_db: String,
    scalar: ScalarType,
    /// `None` means unspecified; only an explicit `false` rejects nulls.
    nullable: Option<bool>,
    unique_graph: bool,
    unique_node: bool,
    indexed: bool,
    primary_key: bool,
    prefix: bool,
    model: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        let name_py = name.into();
        let unique_node = scalar.is_multi_valued();
        Self {
            name_db: name_py.clone(),
            name_py,
            scalar,
            nullable: None,
            unique_graph: false,
            unique_node,
            indexed: false,
            primary_key: false,
            prefix: false,
            model: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Unique across the whole graph.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique_graph = unique;
        self
    }

    /// Indexed properties drive store lookups when filtering.
    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Prefix the store name with the model name on registration.
    pub fn prefixed(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn name_db(mut self, name_db: impl Into<String>) -> Self {
        self.name_db = name_db.into();
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name_py(&self) -> &str { &self.name_py }
    pub fn store_name(&self) -> &str { &self.name_db }
    pub fn scalar(&self) -> &ScalarType { &self.scalar }
    pub fn is_nullable(&self) -> Option<bool> { self.nullable }
    pub fn is_unique_graph(&self) -> bool { self.unique_graph }
    pub fn is_unique_node(&self) -> bool { self.unique_node }
    pub fn is_indexed(&self) -> bool { self.indexed }
    pub fn is_primary_key(&self) -> bool { self.primary_key }
    pub fn is_prefixed(&self) -> bool { self.prefix }
    pub fn model_name(&self) -> Option<&str> { self.model.as_deref() }

    /// Called once by the owning model on registration.
    pub(crate) fn attach(&mut self, model_name: &str) {
        if self.prefix {
            self.name_db = format!("{model_name}_{}", self.name_db);
        }
        self.model = Some(model_name.to_string());
    }

    // ========================================================================
    // Validation / coercion
    // ========================================================================

    /// Returns the list of problems when the value does not fit.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), Vec<String>> {
        if self.nullable == Some(false) && value.is_null() {
            return Err(vec!["Property is not nullable.".to_string()]);
        }
        self.scalar.validate(value)
    }

    pub fn to_db(&self, value: &Value) -> Result<Value> {
        self.scalar.to_db(value).map_err(|e| self.validation_error(vec![e]))
    }

    pub fn to_py(&self, value: &Value) -> Result<Value> {
        self.scalar.to_py(value).map_err(|e| self.validation_error(vec![e]))
    }

    pub(crate) fn validation_error(&self, errors: Vec<String>) -> Error {
        Error::Validation {
            model: self.model.clone().unwrap_or_default(),
            property: self.name_py.clone(),
            errors,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}.{}({})>",
            self.model.as_deref().unwrap_or("?"),
            self.name_py,
            self.scalar,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_nullable_rejects_null() {
        let prop = Property::new("title", ScalarType::string(127)).nullable(false);
        let errors = prop.validate(&Value::Null).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_nullable_delegates_to_scalar() {
        let prop = Property::new("title", ScalarType::string(127)).nullable(true);
        assert!(prop.validate(&Value::Null).is_ok());
        // Unspecified nullability behaves the same way.
        let prop = Property::new("title", ScalarType::string(127));
        assert!(prop.validate(&Value::Null).is_ok());
        assert!(prop.validate(&Value::Int(3)).is_err());
    }

    #[test]
    fn test_prefix_applied_on_attach() {
        let mut prop = Property::new("name", ScalarType::string(10)).prefixed(true);
        prop.attach("Website");
        assert_eq!(prop.store_name(), "Website_name");
        assert_eq!(prop.name_py(), "name");
        assert_eq!(prop.to_string(), "<Website.name(String(10))>");
    }

    #[test]
    fn test_multi_valued_unique_per_node() {
        assert!(Property::new("tags", ScalarType::List).is_unique_node());
        assert!(!Property::new("tag", ScalarType::string(5)).is_unique_node());
    }

    #[test]
    fn test_to_db_failure_is_validation_error() {
        let mut prop = Property::new("since", ScalarType::DateTime);
        prop.attach("hosts");
        let err = prop.to_db(&Value::from("yesterday")).unwrap_err();
        assert!(matches!(err, Error::Validation { ref property, .. } if property == "since"));
    }
}
