use serde::{Deserialize, Serialize};

use crate::{
    domain::{AttemptId, AvatarImage, Profile, SessionIdentity},
    error::{ApiError, ErrorCode},
};

/// Per-attempt login phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "code", rename_all = "snake_case")]
pub enum LoginPhase {
    #[default]
    Idle,
    Submitting,
    AwaitingFederatedConsent,
    Settling,
    Authenticated,
    Failed(ErrorCode),
}

impl LoginPhase {
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            LoginPhase::Submitting | LoginPhase::AwaitingFederatedConsent | LoginPhase::Settling
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePhase {
    #[default]
    Editing,
    Saving,
    Saved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ShellEvent {
    LoginModalChanged {
        visible: bool,
    },
    LoginPhaseChanged {
        attempt: Option<AttemptId>,
        phase: LoginPhase,
    },
    SessionChanged {
        identity: Option<SessionIdentity>,
    },
    EditorOpened {
        draft: Profile,
    },
    AvatarUpdated {
        avatar: Option<AvatarImage>,
    },
    ConnectionTestChanged {
        attempt: AttemptId,
        pending: bool,
        verified: bool,
    },
    SavePhaseChanged {
        attempt: AttemptId,
        phase: SavePhase,
    },
    ProfileCommitted {
        profile: Profile,
    },
    EditorClosed {
        saved: bool,
    },
    Error(ApiError),
}
