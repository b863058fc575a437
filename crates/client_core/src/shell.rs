//! The page shell: committed session and profile plus the two modals.
//!
//! State sits behind one async mutex that is never held across a timer, so
//! closing a modal can interleave with its pending operation. Every timer is
//! guarded by its attempt ticket and re-checked under the lock on wake.

use std::sync::Arc;

use oauth_integration::{
    AccountChoice, ConsentLauncher, ConsentWindowOptions, Viewport, FEDERATED_ACCOUNT_EMAIL,
};
use shared::{
    domain::{AttemptId, AuthProvider, AvatarImage, Profile, SessionIdentity},
    error::ApiError,
    protocol::{LoginPhase, SavePhase, ShellEvent},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    attempt::{AttemptOutcome, AttemptSequence},
    avatar,
    config::Settings,
    error::ClientError,
    profile_editor::{ConnectionTestOutcome, EditorSnapshot, ProfileEditor, ProfileField},
    session::{LoginModal, LoginSnapshot},
};

const EVENT_CAPACITY: usize = 256;

struct ShellState {
    session: Option<SessionIdentity>,
    profile: Profile,
    login: LoginModal,
    editor: Option<ProfileEditor>,
}

pub struct AppShell {
    settings: Settings,
    consent: Arc<dyn ConsentLauncher>,
    viewport: Viewport,
    sequence: AttemptSequence,
    inner: Mutex<ShellState>,
    events: broadcast::Sender<ShellEvent>,
}

impl AppShell {
    pub fn new(settings: Settings, consent: Arc<dyn ConsentLauncher>) -> Self {
        Self::with_profile(settings, consent, Profile::default())
    }

    pub fn with_profile(
        settings: Settings,
        consent: Arc<dyn ConsentLauncher>,
        profile: Profile,
    ) -> Self {
        let sequence = AttemptSequence::default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            consent,
            viewport: Viewport::default(),
            inner: Mutex::new(ShellState {
                session: None,
                profile,
                login: LoginModal::new(sequence.clone()),
                editor: None,
            }),
            sequence,
            events,
        }
    }

    /// Parent window geometry used to center the consent popup.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ShellEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ShellEvent) {
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: &ClientError) {
        self.emit(ShellEvent::Error(ApiError::from(err)));
    }

    pub async fn session(&self) -> Option<SessionIdentity> {
        self.inner.lock().await.session.clone()
    }

    pub async fn profile(&self) -> Profile {
        self.inner.lock().await.profile.clone()
    }

    pub async fn login_snapshot(&self) -> LoginSnapshot {
        self.inner.lock().await.login.snapshot()
    }

    pub async fn editor_snapshot(&self) -> Option<EditorSnapshot> {
        self.inner
            .lock()
            .await
            .editor
            .as_ref()
            .map(ProfileEditor::snapshot)
    }

    // ---- session -------------------------------------------------------

    pub async fn open_login(&self) {
        let opened = self.inner.lock().await.login.open();
        if opened {
            self.emit(ShellEvent::LoginModalChanged { visible: true });
            self.emit(ShellEvent::LoginPhaseChanged {
                attempt: None,
                phase: LoginPhase::Idle,
            });
        }
    }

    pub async fn close_login(&self) {
        let (was_visible, cancelled) = {
            let mut state = self.inner.lock().await;
            let was_visible = state.login.is_visible();
            (was_visible, state.login.close())
        };
        if let Some(id) = cancelled {
            info!(attempt = id.0, "sign-in dialog dismissed mid-attempt");
        }
        if was_visible {
            self.emit(ShellEvent::LoginModalChanged { visible: false });
        }
    }

    /// Credential sign-in. Always succeeds after the login delay unless the
    /// dialog is dismissed first. The identifier is expected to be non-empty;
    /// an empty one falls back to the demo identity.
    pub async fn submit_credentials(
        &self,
        identifier: &str,
        secret: impl Into<String>,
    ) -> Result<AttemptOutcome<SessionIdentity>, ClientError> {
        // Nothing verifies the secret yet; hold it only long enough to wipe it.
        let _secret = Zeroizing::new(secret.into());
        let identifier = identifier.to_string();

        let begun = self.inner.lock().await.login.begin_credentials();
        let mut ticket = begun.inspect_err(|err| self.emit_error(err))?;
        let attempt = ticket.id();
        info!(attempt = attempt.0, "credential sign-in submitted");
        self.emit(ShellEvent::LoginPhaseChanged {
            attempt: Some(attempt),
            phase: LoginPhase::Submitting,
        });

        if ticket
            .guard(tokio::time::sleep(self.settings.login_delay()))
            .await
            .is_none()
        {
            debug!(attempt = attempt.0, "credential sign-in cancelled while pending");
            return Ok(AttemptOutcome::Superseded);
        }

        Ok(self
            .finish_login(attempt, &identifier, AuthProvider::Credentials)
            .await)
    }

    /// Federated sign-in through the consent popup. Completion is the popup
    /// closing, with or without a picked account; a blocked popup falls back
    /// to a flat delay. Only an explicit provider refusal fails the attempt.
    pub async fn submit_federated_login(
        &self,
    ) -> Result<AttemptOutcome<SessionIdentity>, ClientError> {
        let begun = self.inner.lock().await.login.begin_federated();
        let mut ticket = begun.inspect_err(|err| self.emit_error(err))?;
        let attempt = ticket.id();
        info!(attempt = attempt.0, "federated sign-in started");
        self.emit(ShellEvent::LoginPhaseChanged {
            attempt: Some(attempt),
            phase: LoginPhase::AwaitingFederatedConsent,
        });

        let options = ConsentWindowOptions::centered(self.viewport, &self.settings.client_name);
        let window = match self.consent.open(options).await {
            Ok(window) => window,
            Err(err) => {
                let err = ClientError::Internal(err.context("failed to open consent window"));
                self.fail_login(attempt, &err).await;
                return Err(err);
            }
        };

        let identifier = match window {
            Some(window) => {
                let poll = self.settings.consent_poll_interval();
                if ticket.guard(window.wait_closed(poll)).await.is_none() {
                    debug!(attempt = attempt.0, "consent wait cancelled");
                    return Ok(AttemptOutcome::Superseded);
                }

                if window.denied() {
                    let err = ClientError::ProviderDenied;
                    return if self.fail_login(attempt, &err).await {
                        Err(err)
                    } else {
                        Ok(AttemptOutcome::Superseded)
                    };
                }
                let account = window.chosen_account().unwrap_or_else(|| {
                    debug!(attempt = attempt.0, "consent closed without a pick");
                    AccountChoice::federated_default()
                });

                let settling = self.inner.lock().await.login.enter_settling(attempt);
                if !settling {
                    return Ok(AttemptOutcome::Superseded);
                }
                self.emit(ShellEvent::LoginPhaseChanged {
                    attempt: Some(attempt),
                    phase: LoginPhase::Settling,
                });

                if ticket
                    .guard(tokio::time::sleep(self.settings.federated_settle_delay()))
                    .await
                    .is_none()
                {
                    return Ok(AttemptOutcome::Superseded);
                }
                account.email
            }
            None => {
                warn!(attempt = attempt.0, "consent popup blocked; completing without it");
                if ticket
                    .guard(tokio::time::sleep(self.settings.popup_blocked_delay()))
                    .await
                    .is_none()
                {
                    return Ok(AttemptOutcome::Superseded);
                }
                FEDERATED_ACCOUNT_EMAIL.to_string()
            }
        };

        Ok(self
            .finish_login(attempt, &identifier, AuthProvider::Federated)
            .await)
    }

    async fn finish_login(
        &self,
        attempt: AttemptId,
        identifier: &str,
        provider: AuthProvider,
    ) -> AttemptOutcome<SessionIdentity> {
        let mut state = self.inner.lock().await;
        let identity = match state.login.complete(attempt, identifier, provider) {
            AttemptOutcome::Completed(identity) => identity,
            AttemptOutcome::Superseded => {
                debug!(attempt = attempt.0, "late sign-in completion ignored");
                return AttemptOutcome::Superseded;
            }
        };

        state.session = Some(identity.clone());
        state.profile.display_name = identity.display_name.clone();
        drop(state);

        info!(
            attempt = attempt.0,
            session_id = %identity.session_id,
            provider = ?identity.provider,
            "signed in"
        );
        self.emit(ShellEvent::LoginPhaseChanged {
            attempt: Some(attempt),
            phase: LoginPhase::Authenticated,
        });
        self.emit(ShellEvent::LoginModalChanged { visible: false });
        self.emit(ShellEvent::SessionChanged {
            identity: Some(identity.clone()),
        });
        AttemptOutcome::Completed(identity)
    }

    /// Records a failed attempt; false when the attempt was already superseded.
    async fn fail_login(&self, attempt: AttemptId, err: &ClientError) -> bool {
        let code = err.code();
        let failed = self.inner.lock().await.login.fail(attempt, code);
        if failed {
            warn!(attempt = attempt.0, ?code, "sign-in failed: {err}");
            self.emit(ShellEvent::LoginPhaseChanged {
                attempt: Some(attempt),
                phase: LoginPhase::Failed(code),
            });
            self.emit_error(err);
        }
        failed
    }

    pub async fn logout(&self) {
        let (was_visible, previous) = {
            let mut state = self.inner.lock().await;
            let was_visible = state.login.is_visible();
            state.login.reset();
            (was_visible, state.session.take())
        };
        if let Some(identity) = previous {
            info!(session_id = %identity.session_id, "signed out");
        }
        if was_visible {
            self.emit(ShellEvent::LoginModalChanged { visible: false });
        }
        self.emit(ShellEvent::SessionChanged { identity: None });
    }

    // ---- profile editor ------------------------------------------------

    /// Opens the settings dialog on a fresh working copy of the committed
    /// profile. Re-opening an open dialog keeps its working copy.
    pub async fn open_editor(&self) -> Profile {
        let mut state = self.inner.lock().await;
        if let Some(editor) = &state.editor {
            return editor.draft().clone();
        }
        let editor = ProfileEditor::open(&state.profile, self.sequence.clone());
        let draft = editor.draft().clone();
        state.editor = Some(editor);
        drop(state);

        debug!("profile editor opened");
        self.emit(ShellEvent::EditorOpened {
            draft: draft.clone(),
        });
        draft
    }

    /// Discards the working copy. Pending tests and saves become no-ops.
    pub async fn close_editor(&self) -> bool {
        let Some(mut editor) = self.inner.lock().await.editor.take() else {
            return false;
        };
        let saved = editor.save_phase() == SavePhase::Saved;
        editor.cancel_pending();
        debug!(saved, "profile editor closed");
        self.emit(ShellEvent::EditorClosed { saved });
        true
    }

    pub async fn update_field(&self, field: ProfileField) -> Result<(), ClientError> {
        let mut state = self.inner.lock().await;
        let Some(editor) = state.editor.as_mut() else {
            return Err(ClientError::validation("the profile dialog is not open"));
        };
        let updated = editor.update_field(field);
        drop(state);
        updated.inspect_err(|err| self.emit_error(err))
    }

    pub async fn upload_avatar(&self, bytes: &[u8]) -> Result<AvatarImage, ClientError> {
        if self.inner.lock().await.editor.is_none() {
            return Err(ClientError::validation("the profile dialog is not open"));
        }

        let avatar = avatar::ingest(bytes, self.settings.avatar_max_bytes)
            .inspect_err(|err| self.emit_error(err))?;

        {
            let mut state = self.inner.lock().await;
            let Some(editor) = state.editor.as_mut() else {
                return Err(ClientError::validation("the profile dialog is not open"));
            };
            editor
                .set_avatar(avatar.clone())
                .inspect_err(|err| self.emit_error(err))?;
        }
        debug!(
            width = avatar.width,
            height = avatar.height,
            bytes = avatar.byte_len,
            "avatar staged"
        );
        self.emit(ShellEvent::AvatarUpdated {
            avatar: Some(avatar.clone()),
        });
        Ok(avatar)
    }

    pub async fn test_external_connection(&self) -> Result<ConnectionTestOutcome, ClientError> {
        let begun = {
            let mut state = self.inner.lock().await;
            let Some(editor) = state.editor.as_mut() else {
                return Err(ClientError::validation("the profile dialog is not open"));
            };
            editor.begin_connection_test()
        };
        let Some(mut ticket) = begun.inspect_err(|err| self.emit_error(err))? else {
            debug!("connection test skipped: no address");
            return Ok(ConnectionTestOutcome::SkippedNoAddress);
        };
        let attempt = ticket.id();
        info!(attempt = attempt.0, "testing external store connection");
        self.emit(ShellEvent::ConnectionTestChanged {
            attempt,
            pending: true,
            verified: false,
        });

        if ticket
            .guard(tokio::time::sleep(self.settings.connection_test_delay()))
            .await
            .is_none()
        {
            return Ok(ConnectionTestOutcome::Superseded);
        }

        let completed = {
            let mut state = self.inner.lock().await;
            state
                .editor
                .as_mut()
                .map(|editor| editor.complete_connection_test(attempt).is_completed())
                .unwrap_or(false)
        };
        if !completed {
            debug!(attempt = attempt.0, "late connection test result ignored");
            return Ok(ConnectionTestOutcome::Superseded);
        }

        info!(attempt = attempt.0, "external store verified");
        self.emit(ShellEvent::ConnectionTestChanged {
            attempt,
            pending: false,
            verified: true,
        });
        Ok(ConnectionTestOutcome::Verified)
    }

    /// Commits the working copy after the save delay, then closes the dialog
    /// once the saved banner has shown.
    pub async fn save(&self) -> Result<AttemptOutcome<Profile>, ClientError> {
        let begun = {
            let mut state = self.inner.lock().await;
            let Some(editor) = state.editor.as_mut() else {
                return Err(ClientError::validation("the profile dialog is not open"));
            };
            editor.begin_save()
        };
        let mut ticket = begun.inspect_err(|err| self.emit_error(err))?;
        let attempt = ticket.id();
        info!(attempt = attempt.0, "saving profile");
        self.emit(ShellEvent::SavePhaseChanged {
            attempt,
            phase: SavePhase::Saving,
        });

        if ticket
            .guard(tokio::time::sleep(self.settings.save_delay()))
            .await
            .is_none()
        {
            debug!(attempt = attempt.0, "save abandoned before commit");
            return Ok(AttemptOutcome::Superseded);
        }

        let committed = {
            let mut state = self.inner.lock().await;
            let outcome = match state.editor.as_mut() {
                Some(editor) => editor.complete_save(attempt),
                None => AttemptOutcome::Superseded,
            };
            if let AttemptOutcome::Completed(profile) = &outcome {
                state.profile = profile.clone();
            }
            outcome
        };
        let AttemptOutcome::Completed(profile) = committed else {
            return Ok(AttemptOutcome::Superseded);
        };

        info!(attempt = attempt.0, "profile committed");
        self.emit(ShellEvent::ProfileCommitted {
            profile: profile.clone(),
        });
        self.emit(ShellEvent::SavePhaseChanged {
            attempt,
            phase: SavePhase::Saved,
        });

        // The commit stands even if the dialog is closed during the banner.
        if ticket
            .guard(tokio::time::sleep(self.settings.saved_banner_delay()))
            .await
            .is_some()
        {
            let closed = {
                let mut state = self.inner.lock().await;
                let finished = state
                    .editor
                    .as_mut()
                    .is_some_and(|editor| editor.finish_save(attempt));
                if finished {
                    state.editor = None;
                }
                finished
            };
            if closed {
                self.emit(ShellEvent::SavePhaseChanged {
                    attempt,
                    phase: SavePhase::Editing,
                });
                self.emit(ShellEvent::EditorClosed { saved: true });
            }
        }

        Ok(AttemptOutcome::Completed(profile))
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
