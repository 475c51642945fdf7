//! Fact records produced by the pattern extractors.

use serde::{Deserialize, Serialize};

/// An HTTP route declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Uppercase verb, or `ANY` when the declaration does not constrain it.
    pub method: String,
    pub path: String,
    pub handler: Option<String>,
    pub file: String,
}

impl Route {
    pub fn new(method: &str, path: impl Into<String>, handler: Option<String>, file: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.into(),
            handler,
            file: file.to_string(),
        }
    }
}

/// A single `name: type` pair of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A data model, schema or struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub fields: Vec<Field>,
    pub file: String,
}

impl Model {
    pub fn new(name: impl Into<String>, fields: Vec<Field>, file: &str) -> Self {
        Self {
            name: name.into(),
            fields,
            file: file.to_string(),
        }
    }

    /// `Some(self)` when at least one field was found.
    pub fn non_empty(self) -> Option<Self> {
        if self.fields.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// A request-handling controller and its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub name: String,
    pub actions: Vec<String>,
    pub file: String,
}

impl Controller {
    /// Build a controller, or `None` when no action survived filtering.
    pub fn with_actions(name: impl Into<String>, actions: Vec<String>, file: &str) -> Option<Self> {
        if actions.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            actions,
            file: file.to_string(),
        })
    }
}

/// A UI component and its declared props.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub props: Vec<String>,
    pub file: String,
}

impl Component {
    pub fn new(name: impl Into<String>, props: Vec<String>, file: &str) -> Self {
        Self {
            name: name.into(),
            props,
            file: file.to_string(),
        }
    }
}

/// A service or business-logic unit and its functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub functions: Vec<String>,
    pub file: String,
}

impl Service {
    /// Build a service, or `None` when it has no functions.
    pub fn with_functions(
        name: impl Into<String>,
        functions: Vec<String>,
        file: &str,
    ) -> Option<Self> {
        if functions.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            functions,
            file: file.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_method_uppercased() {
        let route = Route::new("get", "/users", None, "router.ex");
        assert_eq!(route.method, "GET");
    }

    #[test]
    fn test_field_serializes_type_key() {
        let json = serde_json::to_string(&Field::new("email", "string")).unwrap();
        assert_eq!(json, r#"{"name":"email","type":"string"}"#);
    }

    #[test]
    fn test_empty_service_discarded() {
        assert!(Service::with_functions("Billing", vec![], "billing.py").is_none());
        assert!(Controller::with_actions("Users", vec![], "users.rb").is_none());
        assert!(Model::new("Empty", vec![], "m.go").non_empty().is_none());
    }
}
