//! Roundtrip serialisation tests for `stencil-core` manifest types.
//!
//! Each `#[case]` is isolated; no shared state.

use std::collections::BTreeMap;

use rstest::rstest;
use stencil_core::{ItemKind, Manifest, TemplateSettings, TrackedItem, VcsSettings};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn minimal_manifest() -> Manifest {
    Manifest::new()
}

fn full_manifest() -> Manifest {
    let mut artifact = TrackedItem::new("templates/Customer.ts", ItemKind::Artifact);
    artifact.attributes = BTreeMap::from([(
        "mapped_source".to_string(),
        "src/Models/Customer.cs".to_string(),
    )]);
    let mut template = TrackedItem::template(
        "templates/models.tera",
        TemplateSettings {
            output_extension: Some("ts".to_string()),
            output_filename: Some("{{ stem }}.model".to_string()),
            include: vec!["src/Models".to_string()],
            pattern: "**/*.cs".to_string(),
        },
    );
    template.children.push(artifact);

    Manifest {
        vcs: Some(VcsSettings {
            checkout: vec!["p4".to_string(), "edit".to_string()],
            status: Some(vec!["p4".to_string(), "fstat".to_string()]),
        }),
        items: vec![template, TrackedItem::new("README.md", ItemKind::File)],
        ..Manifest::new()
    }
}

fn unicode_manifest() -> Manifest {
    let mut template = TrackedItem::template("テンプレート/модели.tera", TemplateSettings::default());
    let mut artifact = TrackedItem::new("テンプレート/顧客.ts", ItemKind::Artifact);
    artifact
        .attributes
        .insert("mapped_source".to_string(), "源/顧客.cs".to_string());
    template.children.push(artifact);
    Manifest {
        items: vec![template],
        ..Manifest::new()
    }
}

// ---------------------------------------------------------------------------
// Roundtrip
// ---------------------------------------------------------------------------

#[rstest]
#[case::minimal(minimal_manifest())]
#[case::full(full_manifest())]
#[case::unicode(unicode_manifest())]
fn manifest_yaml_roundtrip(#[case] manifest: Manifest) {
    let yaml = serde_yaml::to_string(&manifest).expect("serialize");
    let back: Manifest = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(manifest, back);
}

#[test]
fn empty_collections_are_omitted() {
    let yaml = serde_yaml::to_string(&minimal_manifest()).expect("serialize");
    assert!(!yaml.contains("vcs"), "absent vcs must not serialize: {yaml}");
    assert!(yaml.contains("mapped_source"), "default slot must serialize: {yaml}");
}
