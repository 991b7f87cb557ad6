use crate::config::ArtifactSpec;
use crate::error::SyncError;
use crate::platform::{render_template, set_property, ArtifactStamper, PlatformVersionSetter};
use crate::version::VersionAssignment;
use crate::workspace::WorkspaceScanner;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn create_distinguished_package() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let core = root.join("packages/core");

    fs::create_dir_all(core.join("android")).unwrap();
    fs::create_dir_all(core.join("template")).unwrap();
    fs::create_dir_all(core.join("ios")).unwrap();
    fs::create_dir_all(root.join("scripts")).unwrap();

    fs::write(
        core.join("package.json"),
        r#"{
  "name": "core",
  "version": "0.1.0",
  "dependencies": {
    "tool-a": "0.1.0"
  }
}
"#,
    )
    .unwrap();
    fs::write(
        core.join("android/gradle.properties"),
        "VERSION_NAME=0.1.0\nGROUP=com.example\n",
    )
    .unwrap();
    fs::write(
        core.join("template/package.json"),
        r#"{
  "name": "HelloWorld",
  "version": "0.0.1",
  "private": true,
  "dependencies": {
    "core": "0.1.0",
    "react": "18.2.0"
  },
  "devDependencies": {
    "tool-a": "0.1.0"
  }
}
"#,
    )
    .unwrap();
    fs::write(
        root.join("scripts/Version.h.template"),
        "#define CORE_VERSION_MAJOR ${major}\n#define CORE_VERSION_MINOR ${minor}\n#define CORE_VERSION_PATCH ${patch}\n#define CORE_VERSION_PRERELEASE ${prerelease}\n",
    )
    .unwrap();

    temp_dir
}

fn artifacts() -> Vec<ArtifactSpec> {
    vec![
        ArtifactSpec::Properties {
            path: PathBuf::from("android/gradle.properties"),
            key: "VERSION_NAME".to_string(),
        },
        ArtifactSpec::Manifest {
            path: PathBuf::from("template/package.json"),
        },
        ArtifactSpec::Template {
            path: PathBuf::from("ios/Version.h"),
            template: PathBuf::from("scripts/Version.h.template"),
        },
    ]
}

#[test]
fn test_set_property_replaces_existing_key() {
    let updated = set_property("VERSION_NAME=0.1.0\nGROUP=com.example\n", "VERSION_NAME", "0.2.0");
    assert_eq!(updated, "VERSION_NAME=0.2.0\nGROUP=com.example\n");
}

#[test]
fn test_set_property_ignores_longer_keys() {
    let updated = set_property("VERSION_NAME_SUFFIX=x\n", "VERSION_NAME", "0.2.0");
    assert_eq!(updated, "VERSION_NAME_SUFFIX=x\nVERSION_NAME=0.2.0\n");
}

#[test]
fn test_set_property_with_spaces() {
    let updated = set_property("VERSION_NAME = 0.1.0", "VERSION_NAME", "0.2.0");
    assert_eq!(updated, "VERSION_NAME=0.2.0");
}

#[test]
fn test_render_template() {
    let rendered = render_template("${major}.${minor}.${patch} ${prerelease} (${version})", "0.74.0-rc.2").unwrap();
    assert_eq!(rendered, "0.74.0 \"rc.2\" (0.74.0-rc.2)");
}

#[test]
fn test_render_template_release() {
    let rendered = render_template("${prerelease}", "1000.0.0").unwrap();
    assert_eq!(rendered, "null");
}

#[test]
fn test_render_template_rejects_non_semver() {
    let err = render_template("${major}", "nightly").unwrap_err();
    assert!(matches!(err, SyncError::InvalidVersion { .. }));
}

#[tokio::test]
async fn test_stamps_manifest_and_artifacts() {
    let workspace = create_distinguished_package();
    let root = workspace.path();
    let core = root.join("packages/core");

    let stamper = ArtifactStamper::new(root, &core, artifacts());
    let mapping: VersionAssignment = [("core", "0.2.0-rc.1"), ("tool-a", "0.2.0-rc.1")]
        .into_iter()
        .collect();

    stamper
        .set_distinguished_version("0.2.0-rc.1", &mapping)
        .await
        .unwrap();

    let manifest = fs::read_to_string(core.join("package.json")).unwrap();
    assert!(manifest.contains("\"version\": \"0.2.0-rc.1\""));
    assert!(manifest.contains("\"tool-a\": \"0.2.0-rc.1\""));

    let properties = fs::read_to_string(core.join("android/gradle.properties")).unwrap();
    assert_eq!(properties, "VERSION_NAME=0.2.0-rc.1\nGROUP=com.example\n");

    let template = fs::read_to_string(core.join("template/package.json")).unwrap();
    assert!(template.contains("\"version\": \"0.0.1\""));
    assert!(template.contains("\"core\": \"0.2.0-rc.1\""));
    assert!(template.contains("\"react\": \"18.2.0\""));
    assert!(template.contains("\"tool-a\": \"0.2.0-rc.1\""));

    let header = fs::read_to_string(core.join("ios/Version.h")).unwrap();
    assert!(header.contains("#define CORE_VERSION_MINOR 2\n"));
    assert!(header.contains("#define CORE_VERSION_PRERELEASE \"rc.1\"\n"));
}

#[tokio::test]
async fn test_missing_artifact_fails() {
    let workspace = create_distinguished_package();
    let root = workspace.path();
    let core = root.join("packages/core");
    fs::remove_file(core.join("android/gradle.properties")).unwrap();

    let stamper = ArtifactStamper::new(root, &core, artifacts());
    let mapping: VersionAssignment = [("core", "0.2.0")].into_iter().collect();

    let err = stamper
        .set_distinguished_version("0.2.0", &mapping)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Io { action: "read", .. }));
}

#[tokio::test]
async fn test_locate_in_snapshot() {
    let workspace = create_distinguished_package();
    let root = workspace.path();
    let snapshot = WorkspaceScanner::new(root)
        .with_distinguished("core")
        .snapshot()
        .await
        .unwrap();

    let stamper = ArtifactStamper::locate(snapshot.all(), root, "core", Vec::new()).unwrap();
    assert_eq!(stamper.package_dir(), root.join("packages/core"));

    let err = ArtifactStamper::locate(snapshot.all(), root, "missing", Vec::new()).unwrap_err();
    assert!(err.to_string().contains("`missing` not found"));
}
