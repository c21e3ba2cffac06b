// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_user() -> UserProfile {
    UserProfile {
        id: "u-17".to_owned(),
        email: "t.okafor@school.example".to_owned(),
        role: "teacher".to_owned(),
        school_id: Some("sch-3".to_owned()),
        display_name: Some("T. Okafor".to_owned()),
    }
}

#[test]
fn save_load_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("profile.json");

    let mirror = MirroredProfile::new(sample_user());
    save(&path, &mirror)?;

    let loaded = load(&path)?;
    assert_eq!(loaded.user, sample_user());
    assert!(loaded.saved_at > 0);
    Ok(())
}

#[test]
fn save_creates_parent_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/state/profile.json");

    save(&path, &MirroredProfile::new(sample_user()))?;
    assert!(path.exists());
    Ok(())
}

#[test]
fn clear_removes_file_and_tolerates_missing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("profile.json");

    save(&path, &MirroredProfile::new(sample_user()))?;
    clear(&path);
    assert!(!path.exists());

    // Second clear must be a no-op, not an error.
    clear(&path);
    Ok(())
}

#[test]
fn load_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(&dir.path().join("absent.json")).is_err());
}

#[test]
fn mirror_never_contains_a_token_field() -> anyhow::Result<()> {
    let json = serde_json::to_value(MirroredProfile::new(sample_user()))?;
    let keys: Vec<&String> = json.as_object().into_iter().flatten().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), 2);
    assert!(json.get("access_token").is_none());
    assert!(json.get("token").is_none());
    Ok(())
}
