//! Device and user identity.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::store::{current_timestamp_ms, ClientStore, DEVICE_ID_KEY, USER_KEY};
use crate::ClientResult;

/// A user attached to this device through `identify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Host-defined user id.
    pub user_id: String,
    /// Free-form user traits.
    #[serde(default)]
    pub traits: Map<String, Value>,
    /// When the user was identified (ms since epoch).
    pub identified_at: u64,
}

/// Body of the identify request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    /// Device the user is attached to.
    pub device_id: Uuid,
    /// Host-defined user id.
    pub user_id: String,
    /// Free-form user traits.
    pub traits: Map<String, Value>,
}

/// Persistent device id plus the optional identified user.
#[derive(Debug)]
pub struct Identity {
    store: ClientStore,
    device_id: Uuid,
    user: RwLock<Option<UserIdentity>>,
}

impl Identity {
    /// Load the identity, creating and persisting a device id on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn load(store: ClientStore) -> ClientResult<Self> {
        let device_id = match store.get::<Uuid>(DEVICE_ID_KEY)? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                store.put(DEVICE_ID_KEY, &id)?;
                tracing::info!("Created device id {id}");
                id
            }
        };
        let user = store.get::<UserIdentity>(USER_KEY)?;
        Ok(Self {
            store,
            device_id,
            user: RwLock::new(user),
        })
    }

    /// Stable device identifier.
    #[must_use]
    pub const fn device_id(&self) -> Uuid {
        self.device_id
    }

    /// The identified user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserIdentity> {
        self.user
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The identified user's id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.user().map(|u| u.user_id)
    }

    /// Attach a user to this device and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be persisted.
    pub fn identify(&self, user_id: &str, traits: Map<String, Value>) -> ClientResult<IdentifyRequest> {
        let user = UserIdentity {
            user_id: user_id.to_string(),
            traits,
            identified_at: current_timestamp_ms(),
        };
        self.store.put(USER_KEY, &user)?;
        let request = IdentifyRequest {
            device_id: self.device_id,
            user_id: user.user_id.clone(),
            traits: user.traits.clone(),
        };
        *self
            .user
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(user);
        Ok(request)
    }

    /// Forget the identified user. The device id is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted user cannot be removed.
    pub fn clear_user(&self) -> ClientResult<()> {
        self.store.remove(USER_KEY)?;
        *self
            .user
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}
