//! # Profile Store
//!
//! The in-memory collection of merchant profiles plus the active pointer.
//! The store is small (a handful of profiles); lookups are linear scans.
//!
//! Two invariants hold across every mutation:
//! - the store never becomes empty (deleting the last profile is rejected)
//! - `active_id` always resolves to an existing profile

use crate::error::{DeskError, DeskResult};
use crate::profile::Profile;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Partial update applied to an existing profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub access_token: Option<String>,
    pub application_id: Option<String>,
    pub location_id: Option<String>,
    pub max_amount: Option<i64>,
}

/// All merchant profiles plus the active pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileStore {
    /// ID of the profile charges run against
    pub active_id: String,

    /// Profiles, unordered
    pub profiles: Vec<Profile>,
}

impl ProfileStore {
    /// Create a store seeded with its first profile (which becomes active)
    pub fn new(first: Profile) -> Self {
        Self {
            active_id: first.id.clone(),
            profiles: vec![first],
        }
    }

    /// Add a profile. Returns its ID.
    pub fn add(&mut self, profile: Profile) -> String {
        let id = profile.id.clone();
        self.profiles.push(profile);
        id
    }

    /// Look up a profile by ID
    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// The currently active profile.
    ///
    /// Falls back to the first profile if `active_id` dangles (possible only
    /// on a hand-edited persisted payload; mutations keep it valid).
    pub fn active(&self) -> &Profile {
        self.get(&self.active_id)
            .unwrap_or_else(|| &self.profiles[0])
    }

    /// Switch the active profile
    pub fn activate(&mut self, id: &str) -> DeskResult<()> {
        if self.get(id).is_none() {
            return Err(DeskError::ProfileNotFound {
                profile_id: id.to_string(),
            });
        }
        self.active_id = id.to_string();
        Ok(())
    }

    /// Apply a partial update to a profile
    pub fn update(&mut self, id: &str, update: ProfileUpdate) -> DeskResult<&Profile> {
        let profile = self.get_mut(id).ok_or_else(|| DeskError::ProfileNotFound {
            profile_id: id.to_string(),
        })?;

        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(token) = update.access_token {
            profile.access_token = token;
        }
        if let Some(app_id) = update.application_id {
            profile.application_id = app_id;
        }
        if let Some(location_id) = update.location_id {
            profile.location_id = location_id;
        }
        if let Some(max_amount) = update.max_amount {
            profile.max_amount = Some(max_amount);
        }

        Ok(&*profile)
    }

    /// Remove a profile.
    ///
    /// Rejected when it is the last one. Removing the active profile
    /// re-points `active_id` at the first survivor.
    pub fn remove(&mut self, id: &str) -> DeskResult<Profile> {
        if self.profiles.len() == 1 {
            return Err(DeskError::LastProfile);
        }

        let index = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DeskError::ProfileNotFound {
                profile_id: id.to_string(),
            })?;

        let removed = self.profiles.remove(index);

        if self.active_id == id {
            self.active_id = self.profiles[0].id.clone();
        }

        Ok(removed)
    }

    /// Append a transaction to a profile's log (bounded, most-recent-first)
    pub fn record_transaction(&mut self, profile_id: &str, tx: Transaction) -> DeskResult<()> {
        let profile = self
            .get_mut(profile_id)
            .ok_or_else(|| DeskError::ProfileNotFound {
                profile_id: profile_id.to_string(),
            })?;
        profile.record(tx);
        Ok(())
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// A store is never empty by construction, but serde can bypass `new`
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over all profiles
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    /// Serialize the whole store for the persistence side-channel
    pub fn to_json(&self) -> DeskResult<String> {
        serde_json::to_string(self).map_err(|e| DeskError::Serialization(e.to_string()))
    }

    /// Rebuild a store from a persisted payload, repairing a dangling
    /// `active_id` and rejecting an empty profile list
    pub fn from_json(payload: &str) -> DeskResult<Self> {
        let mut store: ProfileStore = serde_json::from_str(payload)
            .map_err(|e| DeskError::Serialization(format!("Invalid store payload: {}", e)))?;

        if store.profiles.is_empty() {
            return Err(DeskError::Serialization(
                "Persisted store has no profiles".to_string(),
            ));
        }
        if store.get(&store.active_id).is_none() {
            store.active_id = store.profiles[0].id.clone();
        }

        Ok(store)
    }
}
