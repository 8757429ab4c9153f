mod support;

use std::path::Path;

use nexstage_core::manifest::{Manifest, StagingConfig};
use nexstage_core::parameters::Parameters;
use nexstage_core::reactor::ModuleOutcome;
use nexstage_ops::ops_deploy::run_reactor;
use nexstage_ops::ops_deploy_staged::staged_strategy;
use nexstage_ops::strategy::{DeployContext, DeployStrategy};
use support::{params, record_count, write_file, Call, Fate, FakeService, RecordingUploader};
use tempfile::TempDir;

/// A two-module project: `core` and `api`, both in `com.alpha`.
fn project(root: &Path, version: &str) -> Manifest {
    write_file(root, "core/build/core.jar", "core");
    write_file(root, "core/pom.xml", "<project/>");
    write_file(root, "api/build/api.jar", "api");
    Manifest::parse_toml(&format!(
        r#"
[[module]]
name = "core"
group = "com.alpha"
artifact = "core"
version = "{version}"
files = [{{ path = "core/build/core.jar" }}, {{ path = "core/pom.xml", extension = "pom" }}]

[[module]]
name = "api"
group = "com.alpha"
artifact = "api"
version = "{version}"
files = [{{ path = "api/build/api.jar" }}]
"#
    ))
    .unwrap()
}

fn staging_params(root: &Path) -> Parameters {
    params(root, StagingConfig::default())
}

#[test]
fn test_release_build_stages_through_one_repository() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    let p = staging_params(tmp.path());
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
    let ctx = DeployContext::new(&p).with_service(&fake);

    let report = run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, false).unwrap();

    assert_eq!(report.strategy, "staging");
    assert_eq!(
        report.outcomes,
        vec![
            ("core".to_string(), ModuleOutcome::Success),
            ("api".to_string(), ModuleOutcome::Success),
        ]
    );
    // Profile matched once per group, one repository for both modules.
    let matches = fake
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::MatchProfile(_)))
        .count();
    assert_eq!(matches, 1);
    assert_eq!(fake.started(), 1);
    let id = fake.repository_ids()[0].clone();
    assert_eq!(fake.fate(&id), Some(Fate::Closed));
    let paths = fake.deployed_paths(&id);
    assert!(paths.contains(&"com/alpha/core/1.0.0/core-1.0.0.jar".to_string()));
    assert!(paths.contains(&"com/alpha/core/1.0.0/core-1.0.0.jar.sha1".to_string()));
    assert!(paths.contains(&"com/alpha/api/1.0.0/api-1.0.0.jar.md5".to_string()));
    assert!(paths.contains(&"com/alpha/core/1.0.0/core-1.0.0.pom".to_string()));
    assert_eq!(record_count(&p), 1);
    assert!(report.finalized.unwrap().closed);
}

#[test]
fn test_snapshot_build_goes_to_snapshot_url_without_staging() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.1.0-SNAPSHOT");
    let p = params(
        tmp.path(),
        StagingConfig {
            snapshot_url: Some("https://nexus.test/content/repositories/snapshots".into()),
            ..Default::default()
        },
    );
    let strategy = DeployStrategy::for_deploy(&p, &manifest.modules[0].version).unwrap();
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
    let uploader = RecordingUploader::default();
    let ctx = DeployContext::new(&p)
        .with_service(&fake)
        .with_uploader(&uploader);

    run_reactor(tmp.path(), &manifest, &strategy, &ctx, false).unwrap();

    assert!(fake.calls().is_empty(), "{:?}", fake.calls());
    assert!(uploader.urls().contains(
        &"https://nexus.test/content/repositories/snapshots/com/alpha/core/1.1.0-SNAPSHOT/core-1.1.0-SNAPSHOT.jar"
            .to_string()
    ));
    assert_eq!(record_count(&p), 0);
}

#[test]
fn test_direct_uploads_each_module_with_checksums() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    let p = staging_params(tmp.path());
    let uploader = RecordingUploader::default();
    let ctx = DeployContext::new(&p).with_uploader(&uploader);
    let strategy = DeployStrategy::Direct {
        url: "https://nexus.test/releases".into(),
    };

    let report = run_reactor(tmp.path(), &manifest, &strategy, &ctx, false).unwrap();
    assert!(report.finalized.unwrap().repositories.is_empty());
    let paths: Vec<String> = uploader.uploads().into_iter().map(|(_, p)| p).collect();
    assert_eq!(paths.len(), 9);
    assert!(paths.contains(&"com/alpha/api/1.0.0/api-1.0.0.jar.sha1".to_string()));
    assert!(!p.staging_dir.exists());
}

#[test]
fn test_module_failure_blocks_remote_staging() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    std::fs::remove_file(tmp.path().join("core/build/core.jar")).unwrap();
    let p = staging_params(tmp.path());
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
    let ctx = DeployContext::new(&p).with_service(&fake);

    let err = run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, false).unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");
    assert_eq!(fake.started(), 0);
    // `api` still staged locally.
    assert!(p.staging_root().join("alpha").is_dir());
}

#[test]
fn test_disabled_failure_detection_still_stages_the_rest() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    std::fs::remove_file(tmp.path().join("core/build/core.jar")).unwrap();
    let p = params(
        tmp.path(),
        StagingConfig {
            detect_build_failures: Some(false),
            ..Default::default()
        },
    );
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
    let ctx = DeployContext::new(&p).with_service(&fake);

    // The build still fails, but what was staged went out.
    run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, false).unwrap_err();
    assert_eq!(fake.started(), 1);
    let id = fake.repository_ids()[0].clone();
    assert!(fake
        .deployed_paths(&id)
        .iter()
        .all(|path| path.starts_with("com/alpha/api/")));
}

fn project_with_trailing_module(root: &Path) -> Manifest {
    write_file(root, "core/build/core.jar", "core");
    Manifest::parse_toml(
        r#"
[[module]]
name = "core"
group = "com.alpha"
artifact = "core"
version = "1.0.0"
files = [{ path = "core/build/core.jar" }]

[[module]]
name = "docs"
group = "com.alpha"
artifact = "docs"
version = "1.0.0"
deploy = false
files = [{ path = "docs/build/docs.zip" }]
"#,
    )
    .unwrap()
}

#[test]
fn test_last_deploying_module_finalizes_before_trailing_skipped_module() {
    for parallel in [false, true] {
        let tmp = TempDir::new().unwrap();
        let manifest = project_with_trailing_module(tmp.path());
        let p = staging_params(tmp.path());
        let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
        let ctx = DeployContext::new(&p).with_service(&fake);

        let report =
            run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, parallel).unwrap();

        assert_eq!(
            report.outcomes,
            vec![
                ("core".to_string(), ModuleOutcome::Success),
                ("docs".to_string(), ModuleOutcome::Success),
            ]
        );
        assert!(report.finalized.unwrap().closed);
        assert_eq!(fake.started(), 1);
        let id = fake.repository_ids()[0].clone();
        assert!(fake
            .deployed_paths(&id)
            .iter()
            .all(|path| path.starts_with("com/alpha/core/")));
    }
}

#[test]
fn test_parallel_reactor_finalizes_once() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    let p = staging_params(tmp.path());
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");
    let ctx = DeployContext::new(&p).with_service(&fake);

    let report = run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, true).unwrap();
    assert_eq!(fake.started(), 1);
    let closes = fake
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Close(_)))
        .count();
    assert_eq!(closes, 1);
    assert_eq!(report.finalized.unwrap().uploaded, 9);
}

#[test]
fn test_two_profiles_with_rule_failure_leave_nothing_behind() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "a.jar", "a");
    write_file(tmp.path(), "b.jar", "b");
    let manifest = Manifest::parse_toml(
        r#"
[[module]]
name = "first"
group = "com.alpha"
artifact = "first"
version = "2.0"
files = [{ path = "a.jar" }]

[[module]]
name = "second"
group = "com.beta"
artifact = "second"
version = "2.0"
files = [{ path = "b.jar" }]
"#,
    )
    .unwrap();
    let p = staging_params(tmp.path());
    let fake = FakeService::new()
        .with_profile("com.alpha", "alpha", "Alpha")
        .with_profile("com.beta", "beta", "Beta")
        .failing_rules_for("beta");
    let ctx = DeployContext::new(&p).with_service(&fake);

    let err = run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, false).unwrap_err();
    assert!(err.is_rule_failure());
    assert_eq!(fake.repository_ids().len(), 2);
    for id in fake.repository_ids() {
        assert_eq!(fake.fate(&id), Some(Fate::Dropped));
    }
    assert_eq!(record_count(&p), 0);
}

#[test]
fn test_skip_remote_then_deploy_staged() {
    let tmp = TempDir::new().unwrap();
    let manifest = project(tmp.path(), "1.0.0");
    let mut p = params(
        tmp.path(),
        StagingConfig {
            profile_id: Some("alpha".into()),
            skip_remote: Some(true),
            ..Default::default()
        },
    );
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");

    {
        let ctx = DeployContext::new(&p);
        let report =
            run_reactor(tmp.path(), &manifest, &DeployStrategy::Staging, &ctx, false).unwrap();
        assert!(report.finalized.is_none());
    }
    assert!(p.staging_root().join("alpha").is_dir());

    p.skip_remote = false;
    let strategy = staged_strategy(&p).unwrap();
    assert_eq!(strategy, DeployStrategy::Staging);
    let report = strategy
        .finalize_deploy(&DeployContext::new(&p).with_service(&fake))
        .unwrap();
    assert!(report.closed);
    assert_eq!(fake.calls()[0], Call::SelectProfile("alpha".into()));
    assert_eq!(record_count(&p), 1);
}

#[test]
fn test_deploy_staged_without_anything_staged_fails() {
    let tmp = TempDir::new().unwrap();
    let p = staging_params(tmp.path());
    assert!(staged_strategy(&p).is_err());
}

#[test]
fn test_image_matches_profile_from_layout() {
    let tmp = TempDir::new().unwrap();
    let image = tmp.path().join("image");
    write_file(&image, "com/alpha/core/3.0/core-3.0.pom", "<project/>");
    write_file(&image, "com/alpha/core/3.0/core-3.0.pom.sha1", "abc");
    let p = staging_params(tmp.path());
    let fake = FakeService::new().with_profile("com.alpha", "alpha", "Alpha");

    let report = DeployStrategy::Image {
        directory: image.clone(),
    }
    .finalize_deploy(&DeployContext::new(&p).with_service(&fake))
    .unwrap();

    assert_eq!(fake.calls()[0], Call::MatchProfile("com.alpha:core:3.0".into()));
    assert_eq!(report.uploaded, 2);
    assert!(report.closed);
}
