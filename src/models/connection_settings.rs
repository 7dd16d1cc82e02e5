use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a client or admin handle authenticates against the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationMethod {
    NoAuth,
    Token,
    Basic,
}

impl AuthenticationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationMethod::NoAuth => "NO_AUTH",
            AuthenticationMethod::Token => "TOKEN",
            AuthenticationMethod::Basic => "BASIC",
        }
    }

    pub fn requires_details(&self) -> bool {
        !matches!(self, AuthenticationMethod::NoAuth)
    }
}

impl fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthenticationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_AUTH" => Ok(AuthenticationMethod::NoAuth),
            "TOKEN" => Ok(AuthenticationMethod::Token),
            "BASIC" => Ok(AuthenticationMethod::Basic),
            other => Err(format!("unknown authentication method '{}'", other)),
        }
    }
}

/// URL and credentials needed to reach either the client or the admin endpoint
/// of a cluster. `id` is `None` until the store assigns one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub id: Option<i64>,
    pub service_url: String,
    pub authentication_method: AuthenticationMethod,
    #[serde(default)]
    pub authentication_details: Option<String>,
}

impl ConnectionSettings {
    pub fn new(service_url: impl Into<String>, authentication_method: AuthenticationMethod) -> Self {
        Self {
            id: None,
            service_url: service_url.into(),
            authentication_method,
            authentication_details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.authentication_details = Some(details.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

// Authentication details never end up in logs.
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("id", &self.id)
            .field("service_url", &self.service_url)
            .field("authentication_method", &self.authentication_method)
            .finish_non_exhaustive()
    }
}
