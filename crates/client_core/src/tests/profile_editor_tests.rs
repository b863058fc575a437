use super::*;

use shared::domain::{AvatarFormat, DEFAULT_DATABASE_NAME};

fn editor() -> ProfileEditor {
    ProfileEditor::open(&Profile::default(), AttemptSequence::default())
}

fn store(editor: &ProfileEditor) -> &ExternalStore {
    editor.draft().external_store.as_ref().expect("seeded store")
}

#[test]
fn open_seeds_store_but_keeps_existing_one() {
    let editor = editor();
    assert_eq!(store(&editor).engine, EngineKind::MariaDb);
    assert_eq!(store(&editor).database_name, DEFAULT_DATABASE_NAME);
    assert!(!store(&editor).verified);

    let mut committed = Profile::default();
    let mut existing = ExternalStore::seeded();
    existing.set_address("nas.local");
    existing.verified = true;
    committed.external_store = Some(existing.clone());

    let reopened = ProfileEditor::open(&committed, AttemptSequence::default());
    assert_eq!(reopened.draft().external_store, Some(existing));
}

#[test]
fn interest_toggle_is_symmetric_difference() {
    let mut editor = editor();
    let original = editor.draft().interests.clone();

    editor.update_field(ProfileField::ToggleInterest("Music".into())).expect("edit");
    editor.update_field(ProfileField::ToggleInterest("Gaming".into())).expect("edit");
    assert_eq!(editor.draft().interests, vec!["Travel", "Art", "Gaming"]);

    editor.update_field(ProfileField::ToggleInterest("Gaming".into())).expect("edit");
    editor.update_field(ProfileField::ToggleInterest("Music".into())).expect("edit");
    assert_eq!(editor.draft().interests.len(), original.len());
    for interest in &original {
        assert!(editor.draft().has_interest(interest));
    }
}

#[test]
fn toggling_same_interest_twice_restores_exact_list() {
    let mut editor = editor();
    let original = editor.draft().interests.clone();
    editor.update_field(ProfileField::ToggleInterest("Hiking".into())).expect("edit");
    editor.update_field(ProfileField::ToggleInterest("Hiking".into())).expect("edit");
    assert_eq!(editor.draft().interests, original);
}

#[test]
fn plain_fields_update_working_copy() {
    let mut editor = editor();
    editor.update_field(ProfileField::DisplayName("Sam".into())).expect("edit");
    editor.update_field(ProfileField::Bio("Coffee first.".into())).expect("edit");
    editor.update_field(ProfileField::DiscoveryMode(DiscoveryMode::Global)).expect("edit");
    editor.update_field(ProfileField::Radius(120)).expect("edit");

    let draft = editor.draft();
    assert_eq!(draft.display_name, "Sam");
    assert_eq!(draft.bio, "Coffee first.");
    assert_eq!(draft.discovery_mode, DiscoveryMode::Global);
    assert_eq!(draft.radius, 120);
}

#[test]
fn empty_address_skips_connection_test() {
    let mut editor = editor();
    assert!(editor.begin_connection_test().expect("no error").is_none());
    assert!(!editor.is_testing_connection());

    editor.update_field(ProfileField::StoreAddress("   ".into())).expect("edit");
    assert!(editor.begin_connection_test().expect("no error").is_none());
}

#[test]
fn connection_test_marks_verified_until_descriptor_changes() {
    let mut editor = editor();
    editor.update_field(ProfileField::StoreAddress("https://nas.example".into())).expect("edit");

    let ticket = editor
        .begin_connection_test()
        .expect("begin")
        .expect("address present");
    assert!(editor.is_testing_connection());
    assert!(matches!(
        editor.begin_connection_test(),
        Err(ClientError::OperationPending { .. })
    ));

    assert!(editor.complete_connection_test(ticket.id()).is_completed());
    assert!(store(&editor).verified);

    editor.update_field(ProfileField::StoreDatabaseName("vibe_store".into())).expect("edit");
    assert!(!store(&editor).verified);
}

#[test]
fn unrelated_edits_keep_verification() {
    let mut editor = editor();
    editor.update_field(ProfileField::StoreAddress("nas.local".into())).expect("edit");
    let ticket = editor.begin_connection_test().expect("begin").expect("ticket");
    editor.complete_connection_test(ticket.id());

    editor.update_field(ProfileField::Bio("still verified".into())).expect("edit");
    editor.update_field(ProfileField::StoreEngine(EngineKind::MariaDb)).expect("edit");
    assert!(store(&editor).verified);
}

#[test]
fn descriptor_edit_cancels_pending_test() {
    let mut editor = editor();
    editor.update_field(ProfileField::StoreAddress("nas.local".into())).expect("edit");
    let ticket = editor.begin_connection_test().expect("begin").expect("ticket");

    editor.update_field(ProfileField::StoreEngine(EngineKind::Redis)).expect("edit");
    assert!(ticket.is_cancelled());
    assert!(!editor.is_testing_connection());
    assert_eq!(
        editor.complete_connection_test(ticket.id()),
        AttemptOutcome::Superseded
    );
    assert!(!store(&editor).verified);
}

#[test]
fn save_walks_saving_saved_editing() {
    let mut editor = editor();
    editor.update_field(ProfileField::DisplayName("Committed".into())).expect("edit");

    let ticket = editor.begin_save().expect("begin");
    assert_eq!(editor.save_phase(), SavePhase::Saving);
    assert!(editor.begin_save().is_err());

    let profile = editor
        .complete_save(ticket.id())
        .completed()
        .expect("commit");
    assert_eq!(profile.display_name, "Committed");
    assert_eq!(editor.save_phase(), SavePhase::Saved);
    assert!(!editor.complete_save(ticket.id()).is_completed());

    assert!(editor.finish_save(ticket.id()));
    assert_eq!(editor.save_phase(), SavePhase::Editing);
}

#[test]
fn cancelled_save_cannot_commit() {
    let mut editor = editor();
    let ticket = editor.begin_save().expect("begin");
    editor.cancel_pending();

    assert!(ticket.is_cancelled());
    assert_eq!(editor.complete_save(ticket.id()), AttemptOutcome::Superseded);
}

#[test]
fn avatar_can_be_set_and_cleared() {
    let mut editor = editor();
    editor.set_avatar(AvatarImage {
        format: AvatarFormat::Png,
        width: 1,
        height: 1,
        byte_len: 4,
        data_url: "data:image/png;base64,AAAA".into(),
    })
    .expect("editable");
    assert!(editor.draft().avatar.is_some());

    editor.update_field(ProfileField::ClearAvatar).expect("edit");
    assert!(editor.draft().avatar.is_none());
}

#[test]
fn edits_are_rejected_once_save_starts() {
    let mut editor = editor();
    editor
        .update_field(ProfileField::DisplayName("At Click".into()))
        .expect("edit");
    let ticket = editor.begin_save().expect("begin");

    let err = editor
        .update_field(ProfileField::DisplayName("Typed While Saving".into()))
        .expect_err("saving");
    assert!(matches!(err, ClientError::OperationPending { .. }));

    let committed = editor
        .complete_save(ticket.id())
        .completed()
        .expect("commit");
    assert_eq!(committed.display_name, "At Click");

    assert!(editor
        .update_field(ProfileField::Bio("during banner".into()))
        .is_err());
    assert!(editor.finish_save(ticket.id()));
    assert!(editor
        .update_field(ProfileField::Bio("after banner".into()))
        .is_ok());
}
