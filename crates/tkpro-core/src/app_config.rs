use std::fmt;
use std::str::FromStr;

use crate::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Session role. Admins generate with the system credential; users bring
/// their own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Picks the credential this role generates with.
    ///
    /// Admins use the system key when one is configured and otherwise fall
    /// back to the stored key, like users. Blank keys count as absent.
    #[must_use]
    pub fn resolve_api_key(
        self,
        system_key: Option<&str>,
        stored_key: Option<&str>,
    ) -> Option<String> {
        fn non_blank(k: Option<&str>) -> Option<&str> {
            k.map(str::trim).filter(|k| !k.is_empty())
        }

        let key = match self {
            Role::Admin => non_blank(system_key).or_else(|| non_blank(stored_key)),
            Role::User => non_blank(stored_key),
        };
        key.map(str::to_owned)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            // Older sessions stored "guest" for the non-admin role.
            "user" | "guest" => Ok(Role::User),
            other => Err(CoreError::InvalidRole(other.to_owned())),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub database_url: String,
    pub system_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub connect_timeout_secs: u64,
    pub min_sales: f64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url)
            .field(
                "system_api_key",
                &self.system_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("min_sales", &self.min_sales)
            .finish()
    }
}
