use std::fs;
use std::path::{Path, PathBuf};

use linguacat_catalog::{Catalog, MessageStatus, Translation};
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Written output reloads to the same messages, in the same order.
#[test]
fn serialized_catalog_reloads_identically() {
    let temp = tempdir().expect("tempdir");
    for name in ["app_da.ts", "app_cs.ts"] {
        let original = Catalog::load([fixture(name)]).expect("load");
        let written = temp.path().join(name);
        fs::write(&written, original.to_ts_string().expect("serialize")).expect("write");

        let reloaded = Catalog::load([&written]).expect("reload");
        assert_eq!(reloaded.document(), original.document(), "{name}");
    }
}

#[test]
fn non_obsolete_messages_survive_round_trip() {
    let original = Catalog::load([fixture("app_da.ts")]).expect("load");
    let xml = original.to_ts_string().expect("serialize");
    let reloaded = Catalog::from_ts_str(&xml).expect("reparse");

    for (context, message) in original.messages() {
        if message.status.is_obsolete() {
            continue;
        }
        let again = reloaded
            .find(context, &message.source, message.disambiguation.as_deref())
            .expect("message present after round trip");
        assert_eq!(again.status, message.status);
        assert_eq!(again.translation, message.translation);
    }
}

#[test]
fn merged_output_keeps_first_seen_order() {
    let merged =
        Catalog::load([fixture("app_da.ts"), fixture("app_da_override.ts")]).expect("load");
    let xml = merged.to_ts_string().expect("serialize");
    let reloaded = Catalog::from_ts_str(&xml).expect("reparse");

    let contexts: Vec<&str> = reloaded
        .contexts()
        .iter()
        .map(|context| context.name.as_str())
        .collect();
    assert_eq!(contexts, ["QMessageBox", "Designer", "Preferences"]);
    assert_eq!(reloaded.lookup("QMessageBox", "Cancel", None, None), "Fortryd");

    let unfinished = reloaded
        .find("Designer", "Type", Some("verb"))
        .expect("unfinished message");
    assert_eq!(unfinished.status, MessageStatus::Unfinished);
    assert!(matches!(unfinished.translation, Translation::Single(_)));
}
