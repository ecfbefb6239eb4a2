mod common;

use common::{harness, local, local_at, manifest, remote};
use mod_steward_lib::core::validator::{can_fix, error_level};
use mod_steward_lib::models::mod_dto::{
    ErrorLevel, ErrorType, FailedMod, ModError, UnsafeLocalMod,
};

#[test]
fn test_invalid_record_has_single_error_and_err_level() {
    let broken = UnsafeLocalMod::Invalid(FailedMod {
        mod_path: "/mods/Broken".into(),
        display_path: "Broken".into(),
        error: ModError::invalid_manifest("expected value at line 1"),
    });
    let h = harness(vec![broken, local("A", true, &[])], vec![]);

    let report = h.library.validate();
    let entry = &report["/mods/Broken"];
    assert_eq!(entry.errors.len(), 1);
    assert_eq!(entry.errors[0].error_type, ErrorType::InvalidManifest);
    assert_eq!(entry.level, Some(ErrorLevel::Err));
    assert_eq!(report["A"].level, None);
}

#[test]
fn test_disabled_dep_warns_only_when_enabled() {
    let h = harness(
        vec![
            local("X", true, &["Y"]),
            local("Idle", false, &["Y"]),
            local("Y", false, &[]),
        ],
        vec![],
    );

    let report = h.library.validate();
    assert_eq!(
        report["X"].errors,
        vec![ModError::new(ErrorType::DisabledDep, "Y")]
    );
    assert_eq!(report["X"].level, Some(ErrorLevel::Warn));

    // Inert mods still carry the error but are not flagged
    assert_eq!(report["Idle"].errors.len(), 1);
    assert_eq!(report["Idle"].level, None);
}

#[test]
fn test_missing_dep_and_declaration_order() {
    let h = harness(vec![local("X", true, &["Gone", "Y", "Gone2"]), local("Y", false, &[])], vec![]);

    let kinds: Vec<(ErrorType, Option<String>)> = h
        .errors("X")
        .into_iter()
        .map(|e| (e.error_type, e.payload))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ErrorType::MissingDep, Some("Gone".into())),
            (ErrorType::DisabledDep, Some("Y".into())),
            (ErrorType::MissingDep, Some("Gone2".into())),
        ]
    );
}

#[test]
fn test_self_and_repeated_dependencies_are_ignored() {
    let h = harness(vec![local("X", true, &["X", "Y", "Y"]), local("Y", false, &[])], vec![]);

    assert_eq!(h.errors("X"), vec![ModError::new(ErrorType::DisabledDep, "Y")]);
}

#[test]
fn test_outdated_requires_remote_record() {
    let h = harness(
        vec![local("Old", true, &[]), local("Unlisted", true, &[])],
        vec![remote("Old", "1.2.0")],
    );

    assert_eq!(h.errors("Old"), vec![ModError::new(ErrorType::Outdated, "1.2.0")]);
    assert!(h.errors("Unlisted").is_empty());
    assert_eq!(h.library.validate()["Old"].level, Some(ErrorLevel::Warn));
}

#[test]
fn test_remote_refresh_invalidates_cached_report() {
    let h = harness(vec![local("A", true, &[])], vec![]);
    let before = h.library.validate();
    assert!(before["A"].errors.is_empty());

    // Same revisions hand back the same report
    assert!(std::sync::Arc::ptr_eq(&before, &h.library.validate()));

    h.catalog.mods.lock().insert("A".into(), remote("A", "2.0.0"));
    h.library.refresh_remote().unwrap();

    let after = h.library.validate();
    assert!(!std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(after["A"].errors[0].error_type, ErrorType::Outdated);
}

#[test]
fn test_duplicate_unique_name_flags_every_copy() {
    let h = harness(
        vec![
            local_at("/mods/z-one", manifest("Z", "1.0.0", &[]), false),
            local_at("/mods/z-two", manifest("Z", "1.0.0", &[]), false),
        ],
        vec![],
    );

    let report = h.library.validate();
    assert_eq!(report.len(), 2);
    for entry in report.values() {
        assert_eq!(entry.errors[0].error_type, ErrorType::DuplicateMod);
        assert_eq!(entry.level, Some(ErrorLevel::Err));
    }
    // Each copy points at the other one
    assert_eq!(report["Z"].errors[0].payload.as_deref(), Some("/mods/z-two"));
    assert_eq!(report["/mods/z-two"].errors[0].payload.as_deref(), Some("/mods/z-one"));
}

#[test]
fn test_conflicts_reported_between_enabled_mods() {
    let mut a = manifest("A", "1.0.0", &[]);
    a.conflicts = vec!["B".into(), "C".into()];
    let h = harness(
        vec![
            local_at("/mods/A", a, true),
            local("B", true, &[]),
            local("C", false, &[]),
        ],
        vec![],
    );

    assert_eq!(h.errors("A"), vec![ModError::new(ErrorType::ConflictingMod, "B")]);
    assert!(!can_fix(h.library.snapshot().get("A").unwrap()));
}

#[test]
fn test_can_fix_gate() {
    let h = harness(
        vec![
            local("X", true, &["Y"]),
            local("Off", false, &["Y"]),
            local("Y", false, &[]),
        ],
        vec![],
    );
    let snapshot = h.library.snapshot();

    assert!(can_fix(snapshot.get("X").unwrap()));
    // Disabled mods are not fixable even with fixable errors
    assert!(!can_fix(snapshot.get("Off").unwrap()));
    // No errors, nothing to fix
    assert!(!can_fix(snapshot.get("Y").unwrap()));
    assert_eq!(error_level(snapshot.get("Y").unwrap()), None);
}
