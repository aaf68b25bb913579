//! Session values: role, API key and avatar.

use tkpro_core::Role;

use crate::kv::{delete_value, get_value, set_value, API_KEY_KEY, AVATAR_KEY, ROLE_KEY};
use crate::{LocalStore, StoreError};

/// Everything `session show` reports. The key itself is never included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub role: Role,
    pub has_stored_key: bool,
    pub avatar: Option<String>,
}

impl LocalStore {
    /// The persisted role. Absent or unrecognised values read as
    /// [`Role::User`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the read fails.
    pub async fn role(&self) -> Result<Role, StoreError> {
        let Some(raw) = get_value(self.pool(), ROLE_KEY).await? else {
            return Ok(Role::default());
        };
        Ok(raw.parse().unwrap_or_else(|e| {
            tracing::warn!(value = %raw, error = %e, "ignoring unrecognised stored role");
            Role::default()
        }))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the write fails.
    pub async fn set_role(&self, role: Role) -> Result<(), StoreError> {
        set_value(self.pool(), ROLE_KEY, role.as_str()).await
    }

    /// The stored API key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the read fails.
    pub async fn api_key(&self) -> Result<Option<String>, StoreError> {
        get_value(self.pool(), API_KEY_KEY).await
    }

    /// Stores `key` trimmed. A blank key removes the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the write fails.
    pub async fn set_api_key(&self, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        if key.is_empty() {
            delete_value(self.pool(), API_KEY_KEY).await
        } else {
            set_value(self.pool(), API_KEY_KEY, key).await
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the read fails.
    pub async fn avatar(&self) -> Result<Option<String>, StoreError> {
        get_value(self.pool(), AVATAR_KEY).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the write fails.
    pub async fn set_avatar(&self, data: &str) -> Result<(), StoreError> {
        set_value(self.pool(), AVATAR_KEY, data).await
    }

    /// Clears the persisted role and API key. The avatar and batch results
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if a delete fails.
    pub async fn logout(&self) -> Result<(), StoreError> {
        delete_value(self.pool(), ROLE_KEY).await?;
        delete_value(self.pool(), API_KEY_KEY).await?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// The key the current role generates with; see [`Role::resolve_api_key`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if a read fails.
    pub async fn resolve_api_key(
        &self,
        system_key: Option<&str>,
    ) -> Result<Option<String>, StoreError> {
        let role = self.role().await?;
        let stored = self.api_key().await?;
        Ok(role.resolve_api_key(system_key, stored.as_deref()))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if a read fails.
    pub async fn session(&self) -> Result<SessionState, StoreError> {
        Ok(SessionState {
            role: self.role().await?,
            has_stored_key: self.api_key().await?.is_some(),
            avatar: self.avatar().await?,
        })
    }
}
