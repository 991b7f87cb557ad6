use crate::error::SyncError;
use crate::workspace::{PackageQuery, PackageRegistry, WorkspaceScanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_package(root: &Path, dir: &str, manifest: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("package.json"), manifest).unwrap();
}

fn create_test_workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::write(
        root.join("package.json"),
        r#"{"name": "monorepo", "private": true}"#,
    )
    .unwrap();
    write_package(
        root,
        "packages/core",
        r#"{"name": "core", "version": "0.1.0", "devDependencies": {"tool-a": "0.1.0"}}"#,
    );
    write_package(root, "packages/tool-a", r#"{"name": "tool-a", "version": "0.1.0"}"#);
    write_package(
        root,
        "packages/tester",
        r#"{"name": "tester", "version": "0.0.0", "private": true}"#,
    );
    write_package(
        root,
        "packages/core/node_modules/left-pad",
        r#"{"name": "left-pad", "version": "1.3.0"}"#,
    );

    temp_dir
}

fn names(set: &crate::workspace::PackageSet) -> Vec<&str> {
    set.keys().map(String::as_str).collect()
}

#[tokio::test]
async fn test_public_packages() {
    let workspace = create_test_workspace();
    let scanner = WorkspaceScanner::new(workspace.path()).with_distinguished("core");

    let packages = scanner
        .packages(PackageQuery {
            include_private: false,
            include_distinguished: true,
        })
        .await
        .unwrap();

    assert_eq!(names(&packages), ["core", "tool-a"]);
    assert_eq!(packages["core"].dir, workspace.path().join("packages/core"));
}

#[tokio::test]
async fn test_query_filters() {
    let workspace = create_test_workspace();
    let scanner = WorkspaceScanner::new(workspace.path()).with_distinguished("core");

    let without_distinguished = scanner.packages(PackageQuery::default()).await.unwrap();
    assert_eq!(names(&without_distinguished), ["tool-a"]);

    let everything = scanner
        .packages(PackageQuery {
            include_private: true,
            include_distinguished: true,
        })
        .await
        .unwrap();
    assert_eq!(names(&everything), ["core", "tester", "tool-a"]);
}

#[tokio::test]
async fn test_workspaces_field_limits_discovery() {
    let workspace = create_test_workspace();
    let root = workspace.path();
    fs::write(
        root.join("package.json"),
        r#"{"name": "monorepo", "private": true, "workspaces": ["packages/tool-*"]}"#,
    )
    .unwrap();

    let scanner = WorkspaceScanner::new(root);
    let packages = scanner
        .packages(PackageQuery {
            include_private: true,
            include_distinguished: true,
        })
        .await
        .unwrap();

    assert_eq!(names(&packages), ["tool-a"]);
}

#[tokio::test]
async fn test_yarn_workspaces_object() {
    let workspace = create_test_workspace();
    let root = workspace.path();
    fs::write(
        root.join("package.json"),
        r#"{"name": "monorepo", "workspaces": {"packages": ["packages/*"], "nohoist": []}}"#,
    )
    .unwrap();

    let packages = WorkspaceScanner::new(root)
        .packages(PackageQuery::default())
        .await
        .unwrap();

    assert_eq!(names(&packages), ["core", "tool-a"]);
}

#[tokio::test]
async fn test_excludes() {
    let workspace = create_test_workspace();
    let scanner = WorkspaceScanner::new(workspace.path()).with_excludes(["packages/tool-*"])
        .unwrap();

    let packages = scanner.packages(PackageQuery::default()).await.unwrap();
    assert_eq!(names(&packages), ["core"]);
}

#[test]
fn test_invalid_exclude_is_rejected() {
    let workspace = create_test_workspace();

    let err = WorkspaceScanner::new(workspace.path())
        .with_excludes(["packages/tool-*", "fixtures/[*"])
        .unwrap_err();

    assert!(matches!(err, SyncError::Pattern { ref pattern, .. } if pattern == "fixtures/[*"));
}

#[tokio::test]
async fn test_root_named_like_a_skipped_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("build");
    write_package(&root, "packages/tool-a", r#"{"name": "tool-a", "version": "0.1.0"}"#);
    write_package(&root, "packages/tool-a/build", r#"{"name": "bundle", "version": "0.1.0"}"#);

    let packages = WorkspaceScanner::new(&root)
        .packages(PackageQuery::default())
        .await
        .unwrap();

    assert_eq!(names(&packages), ["tool-a"]);
}

#[tokio::test]
async fn test_snapshot_answers_queries() {
    let workspace = create_test_workspace();
    let snapshot = WorkspaceScanner::new(workspace.path())
        .with_distinguished("core")
        .snapshot()
        .await
        .unwrap();

    assert_eq!(names(snapshot.all()), ["core", "tester", "tool-a"]);

    let public = snapshot
        .packages(PackageQuery {
            include_private: false,
            include_distinguished: true,
        })
        .await
        .unwrap();
    assert_eq!(names(&public), ["core", "tool-a"]);

    let dependents = snapshot.packages(PackageQuery::default()).await.unwrap();
    assert_eq!(names(&dependents), ["tool-a"]);
}

#[tokio::test]
async fn test_skips_manifest_without_name() {
    let workspace = create_test_workspace();
    write_package(workspace.path(), "fixtures/unnamed", r#"{"version": "1.0.0"}"#);

    let packages = WorkspaceScanner::new(workspace.path())
        .packages(PackageQuery::default())
        .await
        .unwrap();

    assert_eq!(names(&packages), ["core", "tool-a"]);
}

#[tokio::test]
async fn test_invalid_manifest_is_an_error() {
    let workspace = create_test_workspace();
    write_package(workspace.path(), "packages/broken", "{ \"name\": ");

    let err = WorkspaceScanner::new(workspace.path())
        .packages(PackageQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MalformedManifest { .. }));
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let workspace = create_test_workspace();
    write_package(
        workspace.path(),
        "legacy/tool-a",
        r#"{"name": "tool-a", "version": "0.0.1"}"#,
    );

    let err = WorkspaceScanner::new(workspace.path())
        .packages(PackageQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::DuplicatePackage { ref name, .. } if name == "tool-a"));
}
