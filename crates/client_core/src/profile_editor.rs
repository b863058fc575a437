//! Working copy of the profile while the settings dialog is open.

use shared::{
    domain::{
        AttemptId, AvatarImage, DiscoveryMode, EngineKind, ExternalStore, Profile, SecretToken,
    },
    protocol::SavePhase,
};
use tracing::debug;

use crate::{
    attempt::{AttemptOutcome, AttemptSequence, AttemptTicket, AttemptTracker},
    error::ClientError,
};

/// One edit to the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileField {
    DisplayName(String),
    Bio(String),
    ToggleInterest(String),
    DiscoveryMode(DiscoveryMode),
    Radius(u32),
    StoreAddress(String),
    StoreToken(SecretToken),
    StoreEngine(EngineKind),
    StoreDatabaseName(String),
    ClearAvatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTestOutcome {
    /// No address entered; nothing was started.
    SkippedNoAddress,
    Verified,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub draft: Profile,
    pub save_phase: SavePhase,
    pub connection_testing: bool,
}

#[derive(Debug)]
pub struct ProfileEditor {
    draft: Profile,
    save_phase: SavePhase,
    connection_test: AttemptTracker,
    save: AttemptTracker,
}

impl ProfileEditor {
    /// Working copy of `committed`, with a default store descriptor seeded
    /// when the profile has none.
    pub fn open(committed: &Profile, sequence: AttemptSequence) -> Self {
        let mut draft = committed.clone();
        draft
            .external_store
            .get_or_insert_with(ExternalStore::seeded);
        Self {
            draft,
            save_phase: SavePhase::Editing,
            connection_test: AttemptTracker::new(sequence.clone()),
            save: AttemptTracker::new(sequence),
        }
    }

    pub fn draft(&self) -> &Profile {
        &self.draft
    }

    pub fn save_phase(&self) -> SavePhase {
        self.save_phase
    }

    pub fn is_testing_connection(&self) -> bool {
        self.connection_test.is_pending()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            draft: self.draft.clone(),
            save_phase: self.save_phase,
            connection_testing: self.is_testing_connection(),
        }
    }

    fn store_mut(&mut self) -> &mut ExternalStore {
        self.draft
            .external_store
            .get_or_insert_with(ExternalStore::seeded)
    }

    /// Applies one edit. Rejected once a save has started: the committed
    /// profile is the working copy as it stood when save was clicked.
    pub fn update_field(&mut self, field: ProfileField) -> Result<(), ClientError> {
        self.ensure_editable()?;
        let descriptor_changed = match field {
            ProfileField::DisplayName(name) => {
                self.draft.display_name = name;
                false
            }
            ProfileField::Bio(bio) => {
                self.draft.bio = bio;
                false
            }
            ProfileField::ToggleInterest(interest) => {
                self.draft.toggle_interest(&interest);
                false
            }
            ProfileField::DiscoveryMode(mode) => {
                self.draft.discovery_mode = mode;
                false
            }
            ProfileField::Radius(radius) => {
                self.draft.radius = radius;
                false
            }
            ProfileField::StoreAddress(address) => self.store_mut().set_address(address),
            ProfileField::StoreToken(token) => self.store_mut().set_token(token),
            ProfileField::StoreEngine(engine) => self.store_mut().set_engine(engine),
            ProfileField::StoreDatabaseName(name) => self.store_mut().set_database_name(name),
            ProfileField::ClearAvatar => {
                self.draft.avatar = None;
                false
            }
        };

        // A handshake started against the old parameters must not mark the
        // new ones verified.
        if descriptor_changed {
            if let Some(id) = self.connection_test.cancel() {
                debug!(attempt = id.0, "connection test superseded by descriptor edit");
            }
        }
        Ok(())
    }

    pub fn set_avatar(&mut self, avatar: AvatarImage) -> Result<(), ClientError> {
        self.ensure_editable()?;
        self.draft.avatar = Some(avatar);
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), ClientError> {
        if self.save_phase == SavePhase::Editing {
            Ok(())
        } else {
            Err(ClientError::OperationPending {
                operation: "profile save",
            })
        }
    }

    /// `Ok(None)` when there is no address to test.
    pub fn begin_connection_test(&mut self) -> Result<Option<AttemptTicket>, ClientError> {
        let has_address = self
            .draft
            .external_store
            .as_ref()
            .is_some_and(ExternalStore::has_address);
        if !has_address {
            return Ok(None);
        }
        if self.connection_test.is_pending() {
            return Err(ClientError::OperationPending {
                operation: "connection test",
            });
        }
        Ok(Some(self.connection_test.begin()))
    }

    pub fn complete_connection_test(&mut self, id: AttemptId) -> AttemptOutcome<()> {
        if !self.connection_test.finish(id) {
            return AttemptOutcome::Superseded;
        }
        self.store_mut().verified = true;
        AttemptOutcome::Completed(())
    }

    pub fn begin_save(&mut self) -> Result<AttemptTicket, ClientError> {
        if self.save_phase != SavePhase::Editing {
            return Err(ClientError::OperationPending {
                operation: "profile save",
            });
        }
        let ticket = self.save.begin();
        self.save_phase = SavePhase::Saving;
        Ok(ticket)
    }

    /// Returns the working copy to commit. The save attempt stays live until
    /// [`ProfileEditor::finish_save`] so the saved banner can be dismissed.
    pub fn complete_save(&mut self, id: AttemptId) -> AttemptOutcome<Profile> {
        if !self.save.is_current(id) || self.save_phase != SavePhase::Saving {
            return AttemptOutcome::Superseded;
        }
        self.save_phase = SavePhase::Saved;
        AttemptOutcome::Completed(self.draft.clone())
    }

    pub fn finish_save(&mut self, id: AttemptId) -> bool {
        if self.save_phase != SavePhase::Saved || !self.save.finish(id) {
            return false;
        }
        self.save_phase = SavePhase::Editing;
        true
    }

    /// Abandons pending tests and saves; the working copy is about to be dropped.
    pub fn cancel_pending(&mut self) {
        self.connection_test.cancel();
        self.save.cancel();
    }
}

#[cfg(test)]
#[path = "tests/profile_editor_tests.rs"]
mod tests;
