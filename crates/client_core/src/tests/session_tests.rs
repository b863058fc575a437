use super::*;

fn modal() -> LoginModal {
    LoginModal::new(AttemptSequence::default())
}

#[test]
fn open_is_idempotent() {
    let mut modal = modal();
    assert!(modal.open());
    assert!(!modal.open());
    assert!(modal.is_visible());
    assert_eq!(modal.phase(), LoginPhase::Idle);
}

#[test]
fn identifiers_resolve_with_fallback() {
    assert_eq!(resolve_identifier("demo@test.io"), "demo@test.io");
    assert_eq!(resolve_identifier(""), FALLBACK_IDENTIFIER);
    assert_eq!(resolve_identifier("   "), "   ");
    assert_eq!(resolve_identifier(" demo@test.io "), " demo@test.io ");
}

#[test]
fn credential_attempt_completes_and_closes() {
    let mut modal = modal();
    modal.open();
    let ticket = modal.begin_credentials().expect("begin");
    assert_eq!(modal.phase(), LoginPhase::Submitting);
    assert_eq!(modal.snapshot().attempt, Some(ticket.id()));

    let identity = modal
        .complete(ticket.id(), "alex@vibe.app", AuthProvider::Credentials)
        .completed()
        .expect("live attempt");
    assert_eq!(identity.display_name, "alex");
    assert!(!modal.is_visible());
    assert_eq!(modal.phase(), LoginPhase::Authenticated);
    assert_eq!(modal.snapshot().attempt, None);
}

#[test]
fn completion_after_close_is_superseded() {
    let mut modal = modal();
    modal.open();
    let ticket = modal.begin_credentials().expect("begin");

    assert_eq!(modal.close(), Some(ticket.id()));
    assert!(ticket.is_cancelled());
    assert_eq!(
        modal.complete(ticket.id(), "late@vibe.app", AuthProvider::Credentials),
        AttemptOutcome::Superseded
    );
    assert_eq!(modal.phase(), LoginPhase::Idle);
}

#[test]
fn old_attempt_cannot_complete_after_reopen() {
    let mut modal = modal();
    modal.open();
    let stale = modal.begin_credentials().expect("begin");
    modal.close();
    modal.open();
    let fresh = modal.begin_credentials().expect("begin again");

    assert_ne!(stale.id(), fresh.id());
    assert!(!modal
        .complete(stale.id(), "stale@vibe.app", AuthProvider::Credentials)
        .is_completed());
    assert_eq!(modal.phase(), LoginPhase::Submitting);
    assert!(modal
        .complete(fresh.id(), "fresh@vibe.app", AuthProvider::Credentials)
        .is_completed());
}

#[test]
fn federated_path_walks_consent_then_settling() {
    let mut modal = modal();
    modal.open();
    let ticket = modal.begin_federated().expect("begin");
    assert_eq!(modal.phase(), LoginPhase::AwaitingFederatedConsent);
    assert!(matches!(
        modal.begin_credentials(),
        Err(ClientError::OperationPending { .. })
    ));

    assert!(modal.enter_settling(ticket.id()));
    assert!(!modal.enter_settling(ticket.id()), "only from consent phase");
    assert_eq!(modal.phase(), LoginPhase::Settling);

    let identity = modal
        .complete(ticket.id(), "google.user@gmail.com", AuthProvider::Federated)
        .completed()
        .expect("completed");
    assert_eq!(identity.provider, AuthProvider::Federated);
}

#[test]
fn failure_keeps_dialog_open_for_retry() {
    let mut modal = modal();
    modal.open();
    let ticket = modal.begin_federated().expect("begin");
    assert!(modal.fail(ticket.id(), ErrorCode::ProviderDenied));
    assert!(!modal.fail(ticket.id(), ErrorCode::ProviderDenied));

    assert!(modal.is_visible());
    assert_eq!(modal.phase(), LoginPhase::Failed(ErrorCode::ProviderDenied));
    assert!(modal.begin_credentials().is_ok());
}

#[test]
fn reset_returns_to_hidden_idle() {
    let mut modal = modal();
    modal.open();
    let _ticket = modal.begin_credentials().expect("begin");
    modal.reset();

    let snapshot = modal.snapshot();
    assert!(!snapshot.visible);
    assert_eq!(snapshot.phase, LoginPhase::Idle);
    assert_eq!(snapshot.attempt, None);
}
