//! Model and action definitions consumed by the resource factory.
//!
//! A [`ModelDefinition`] starts out with the standard LoopBack CRUD surface
//! (see [`ModelDefinition::new`]); models that extend `User` additionally get
//! `login`, `logout` and `getCurrent`. Any action can be overridden or added
//! with [`ModelDefinition::action`].

use std::collections::BTreeMap;

use http::Method;

use crate::error::DefinitionError;

/// Name of the base model that marks the authentication model.
pub const USER_BASE: &str = "User";

/// Shape of an action's successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    One,
    Many,
}

impl Returns {
    fn describe(self) -> &'static str {
        match self {
            Returns::One => "a single entity",
            Returns::Many => "a collection",
        }
    }
}

/// One callable action of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub method: Method,
    /// Path template relative to the API root, e.g. `/MyModels/:id`.
    pub path: String,
    pub returns: Returns,
    /// The `:id` placeholder is filled from the active session; without one the
    /// call fails locally with a stub 401.
    pub requires_session: bool,
}

impl ActionDefinition {
    pub fn new(method: Method, path: impl Into<String>, returns: Returns) -> Self {
        Self {
            method,
            path: path.into(),
            returns,
            requires_session: false,
        }
    }

    pub fn one(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, Returns::One)
    }

    pub fn many(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, Returns::Many)
    }

    pub fn with_session(mut self) -> Self {
        self.requires_session = true;
        self
    }

    pub fn returns_collection(&self) -> bool {
        self.returns == Returns::Many
    }
}

/// Built-in actions whose result shape cannot be changed by an override.
const FIXED_SHAPES: &[(&str, Returns)] = &[
    ("query", Returns::Many),
    ("find", Returns::Many),
    ("get", Returns::One),
    ("create", Returns::One),
    ("updateAttributes", Returns::One),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    name: String,
    plural: String,
    base: Option<String>,
    actions: BTreeMap<String, ActionDefinition>,
}

impl ModelDefinition {
    /// Creates a definition with the built-in CRUD actions mounted under
    /// `/{name}s`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let plural = format!("{name}s");
        let mut definition = Self {
            name,
            plural,
            base: None,
            actions: BTreeMap::new(),
        };
        definition.mount_builtins();
        definition
    }

    /// Changes the REST path segment and remounts the built-in actions.
    ///
    /// Custom actions keep their paths; call this before adding them.
    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self.mount_builtins();
        self
    }

    /// Sets the base model. A base of [`USER_BASE`] adds the auth actions.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self.mount_builtins();
        self
    }

    /// Adds or overrides an action.
    pub fn action(mut self, name: impl Into<String>, action: ActionDefinition) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name under which the model is registered and exposed.
    pub fn exposed_name(&self) -> String {
        normalize_model_name(&self.name)
    }

    pub fn plural_name(&self) -> &str {
        &self.plural
    }

    pub fn base_name(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn is_user_model(&self) -> bool {
        self.base.as_deref() == Some(USER_BASE)
    }

    pub fn actions(&self) -> &BTreeMap<String, ActionDefinition> {
        &self.actions
    }

    pub fn get_action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.get(name)
    }

    /// Checks names, path templates and the shapes of the fixed built-ins.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.is_empty()
            || self.name.contains('/')
            || self.name.chars().any(char::is_whitespace)
        {
            return Err(DefinitionError::InvalidModelName(self.name.clone()));
        }
        for (action_name, action) in &self.actions {
            if action_name.is_empty() || action_name.chars().any(char::is_whitespace) {
                return Err(DefinitionError::InvalidActionName {
                    model: self.name.clone(),
                    action: action_name.clone(),
                });
            }
            if !action.path.starts_with('/') || action.path.contains("//") {
                return Err(DefinitionError::InvalidPath {
                    model: self.name.clone(),
                    action: action_name.clone(),
                    path: action.path.clone(),
                });
            }
        }
        for (action_name, expected) in FIXED_SHAPES {
            match self.actions.get(*action_name) {
                Some(action) if action.returns == *expected => {}
                _ => {
                    return Err(DefinitionError::BuiltinShape {
                        model: self.name.clone(),
                        action: action_name.to_string(),
                        expected: expected.describe(),
                    })
                }
            }
        }
        Ok(())
    }

    fn mount_builtins(&mut self) {
        let root = format!("/{}", self.plural);
        let by_id = format!("{root}/:id");
        let builtins = [
            ("create", ActionDefinition::one(Method::POST, root.clone())),
            ("upsert", ActionDefinition::one(Method::PUT, root.clone())),
            ("exists", ActionDefinition::one(Method::GET, format!("{by_id}/exists"))),
            ("get", ActionDefinition::one(Method::GET, by_id.clone())),
            ("findById", ActionDefinition::one(Method::GET, by_id.clone())),
            ("query", ActionDefinition::many(Method::GET, root.clone())),
            ("find", ActionDefinition::many(Method::GET, root.clone())),
            ("findOne", ActionDefinition::one(Method::GET, format!("{root}/findOne"))),
            ("updateAll", ActionDefinition::one(Method::POST, format!("{root}/update"))),
            ("deleteById", ActionDefinition::one(Method::DELETE, by_id.clone())),
            ("count", ActionDefinition::one(Method::GET, format!("{root}/count"))),
            ("updateAttributes", ActionDefinition::one(Method::PUT, by_id.clone())),
        ];
        self.actions.extend(
            builtins
                .into_iter()
                .map(|(name, action)| (name.to_string(), action)),
        );

        if self.is_user_model() {
            let auth = [
                ("login", ActionDefinition::one(Method::POST, format!("{root}/login"))),
                ("logout", ActionDefinition::one(Method::POST, format!("{root}/logout"))),
                (
                    "getCurrent",
                    ActionDefinition::one(Method::GET, by_id).with_session(),
                ),
            ];
            self.actions.extend(
                auth.into_iter()
                    .map(|(name, action)| (name.to_string(), action)),
            );
        }
    }
}

/// Upper-cases the first character and keeps the rest verbatim.
///
/// `lower-case-not-an-identifier` becomes `Lower-case-not-an-identifier`.
pub fn normalize_model_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
