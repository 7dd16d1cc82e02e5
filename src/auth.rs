use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const ADMIN_ROLE: &str = "admin";

/// The authenticated caller, as handed over by the web/security layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            username: username.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, &[ADMIN_ROLE])
    }

    /// Role names compare case-insensitively; a `ROLE_` prefix is ignored.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|granted| {
            let granted = granted.strip_prefix("ROLE_").unwrap_or(granted);
            granted.eq_ignore_ascii_case(role)
        })
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

pub fn require_admin(principal: &Principal) -> Result<()> {
    if !principal.is_admin() {
        warn!(
            "Access denied: user '{}' is not admin. Available roles: {:?}",
            principal.username, principal.roles
        );
        return Err(Error::Forbidden {
            user: principal.username.clone(),
        });
    }

    debug!("Admin access granted for user: {}", principal.username);
    Ok(())
}
