use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Arbitrary string-keyed attributes attached to a context or a user.
pub type CustomAttributes = BTreeMap<String, serde_json::Value>;

/// Attributes describing the subject and situation for which toggles are evaluated.
///
/// Only `targeting_key` is required. The server defines evaluation semantics, so unknown
/// top-level fields are accepted and forwarded through `extra`.
///
/// # Examples
/// ```
/// # use hyphen_toggle::EvaluationContext;
/// let context = EvaluationContext::new("user-123")
///     .application("app1")
///     .environment("prod")
///     .custom_attribute("plan", "premium");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    /// Identity of the subject being evaluated.
    pub targeting_key: String,
    /// IP address of the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Application name or id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// Project environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[allow(missing_docs)]
    pub custom_attributes: CustomAttributes,
    /// The user, if the subject is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Additional fields sent verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The user the context is evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_attributes: CustomAttributes,
}

#[allow(missing_docs)]
impl EvaluationContext {
    /// Create a context with the given targeting key and nothing else.
    pub fn new(targeting_key: impl Into<String>) -> Self {
        EvaluationContext {
            targeting_key: targeting_key.into(),
            ..Default::default()
        }
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn custom_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.custom_attributes.insert(key.into(), value.into());
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

#[allow(missing_docs)]
impl User {
    pub fn new(id: impl Into<String>) -> Self {
        User {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn custom_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.custom_attributes.insert(key.into(), value.into());
        self
    }
}
