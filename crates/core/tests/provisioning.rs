mod common;

use common::{FixtureExtractor, Harness, RecordingStore, make_executable, test_config};
use manscope_core::cache::ArtifactStore;
use manscope_core::model::ProvisionStatus;
use manscope_core::registry::ALL_COMMANDS_URI;
use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::TempDir;

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `[<tmp>/usr/bin]` holding `grep` and `cat`, with an empty store.
fn usr_bin_setup(extractor: FixtureExtractor) -> (TempDir, Harness) {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("usr/bin");
    make_executable(&bin, "grep");
    make_executable(&bin, "cat");
    let harness = Harness::new(
        test_config(&temp.path().join("manpages"), vec![bin]),
        extractor,
    );
    (temp, harness)
}

#[tokio::test]
async fn test_provision_all_fresh_cache() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new()
            .page("grep", "GREP(1) print lines that match patterns")
            .page("cat", "CAT(1) concatenate files"),
    );

    let index = harness.ctx().refresh_index().await.unwrap();
    let summary = harness
        .orchestrator
        .provision_all(index.all_names(), 4)
        .await;

    assert_eq!(summary.provisioned, names(&["cat", "grep"]));
    assert!(summary.already_cached.is_empty());
    assert!(summary.failed.is_empty());
    assert!(summary.cancelled.is_empty());

    assert!(harness.store.exists("grep"));
    assert_eq!(
        harness.ctx().registry().read("doc://grep").unwrap(),
        "GREP(1) print lines that match patterns"
    );
}

#[tokio::test]
async fn test_one_failure_does_not_abort_batch() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new()
            .page("grep", "GREP(1)")
            .failure("cat", "not installed"),
    );

    let summary = harness.orchestrator.provision_all(["grep", "cat"], 2).await;

    assert_eq!(summary.provisioned, names(&["grep"]));
    assert!(summary.already_cached.is_empty());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed.get("cat").unwrap(), "not installed");

    let registry = harness.ctx().registry();
    assert!(registry.read("doc://grep").is_ok());
    assert!(registry.read("doc://cat").unwrap_err().is_not_found());
    // No partial write for the failed command.
    assert!(!harness.store.exists("cat"));
    assert_eq!(harness.store.writes(), vec!["grep".to_string()]);
}

#[tokio::test]
async fn test_cached_artifact_is_never_rewritten() {
    let (_temp, harness) = usr_bin_setup(FixtureExtractor::new().page("cat", "fresh text"));
    harness.store.write("cat", "persisted text").unwrap();
    let writes_before = harness.store.writes().len();

    let summary = harness.orchestrator.provision_all(["cat"], 1).await;

    assert_eq!(summary.already_cached, names(&["cat"]));
    assert!(summary.provisioned.is_empty());
    assert_eq!(harness.store.writes().len(), writes_before);
    assert!(harness.extractor.calls().is_empty());
    assert_eq!(
        harness.ctx().registry().read("doc://cat").unwrap(),
        "persisted text"
    );
}

#[tokio::test]
async fn test_provision_one_is_idempotent() {
    let (_temp, harness) = usr_bin_setup(FixtureExtractor::new().page("grep", "GREP(1)"));

    let first = harness.orchestrator.provision_one("grep").await;
    let content_first = harness.ctx().registry().read("doc://grep").unwrap();
    let second = harness.orchestrator.provision_one("grep").await;
    let content_second = harness.ctx().registry().read("doc://grep").unwrap();

    assert_eq!(first.status, ProvisionStatus::Provisioned);
    assert_eq!(second.status, ProvisionStatus::AlreadyCached);
    assert_eq!(content_first, content_second);
    assert_eq!(harness.extractor.calls(), vec!["grep".to_string()]);
    assert_eq!(harness.store.read("grep").unwrap().content, "GREP(1)");
}

#[tokio::test]
async fn test_registry_matches_outcomes() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new()
            .page("a", "A(1)")
            .page("b", "B(1)")
            .failure("c", "man: no entry"),
    );
    harness.store.write("b", "B(1) cached").unwrap();

    let summary = harness.orchestrator.provision_all(["a", "b", "c"], 3).await;
    let registry = harness.ctx().registry();

    for command in summary.provisioned.iter().chain(&summary.already_cached) {
        assert!(registry.read(&format!("doc://{command}")).is_ok(), "{command}");
    }
    for command in summary.failed.keys() {
        assert!(
            registry
                .read(&format!("doc://{command}"))
                .unwrap_err()
                .is_not_found()
        );
    }
    assert_eq!(summary.provisioned, names(&["a"]));
    assert_eq!(summary.already_cached, names(&["b"]));
    assert_eq!(summary.failed.keys().cloned().collect::<BTreeSet<_>>(), names(&["c"]));
}

#[tokio::test]
async fn test_summary_is_independent_of_completion_order() {
    let extractor = FixtureExtractor::new()
        .page("slow", "SLOW")
        .page("fast", "FAST")
        .page("mid", "MID")
        .delay("slow", Duration::from_millis(150))
        .delay("mid", Duration::from_millis(50));
    let (_temp, harness) = usr_bin_setup(extractor);

    let summary = harness
        .orchestrator
        .provision_all(["slow", "fast", "mid"], 3)
        .await;

    assert_eq!(
        summary.provisioned.iter().cloned().collect::<Vec<_>>(),
        vec!["fast", "mid", "slow"]
    );
}

#[tokio::test]
async fn test_hung_extraction_times_out() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp.path().join("manpages"), vec![]);
    config.extract_timeout_secs = 1;
    let harness = Harness::new(
        config,
        FixtureExtractor::new()
            .page("hang", "never")
            .page("ok", "OK(1)")
            .delay("hang", Duration::from_secs(30)),
    );

    let summary = harness.orchestrator.provision_all(["hang", "ok"], 2).await;

    assert_eq!(summary.provisioned, names(&["ok"]));
    assert!(summary.failed.get("hang").unwrap().contains("timed out"));
    assert!(!harness.store.exists("hang"));
}

#[tokio::test]
async fn test_cancelled_batch_dispatches_nothing() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new().page("grep", "GREP").page("cat", "CAT"),
    );
    harness.orchestrator.cancel_token().cancel();

    let summary = harness.orchestrator.provision_all(["grep", "cat"], 2).await;

    assert_eq!(summary.cancelled, names(&["cat", "grep"]));
    assert!(summary.provisioned.is_empty());
    assert!(harness.extractor.calls().is_empty());
    assert_eq!(summary.total(), 2);
}

#[tokio::test]
async fn test_cancel_during_extraction_fails_in_flight_unit() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new()
            .page("slow", "SLOW")
            .page("quick", "QUICK")
            .delay("slow", Duration::from_secs(3)),
    );
    let orchestrator = harness.orchestrator.clone();
    let batch = tokio::spawn(async move { orchestrator.provision_all(["slow", "quick"], 2).await });

    // Give both units time to start before cancelling.
    tokio::time::sleep(Duration::from_millis(200)).await;
    harness.orchestrator.cancel_token().cancel();
    let summary = tokio::time::timeout(Duration::from_secs(2), batch)
        .await
        .expect("cancellation should stop the batch promptly")
        .unwrap();

    assert_eq!(summary.failed.get("slow").map(String::as_str), Some("cancelled"));
    assert_eq!(summary.provisioned, names(&["quick"]));
    assert!(summary.cancelled.is_empty());
    assert!(!harness.store.exists("slow"));
    assert!(
        harness
            .ctx()
            .registry()
            .read("doc://slow")
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_store_write_error_becomes_failed_outcome() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp.path().join("manpages"), vec![]);
    let store = RecordingStore::new(config.store_dir.clone()).fail_write("a");
    let harness = Harness::with_store(
        config,
        FixtureExtractor::new().page("a", "A(1)").page("b", "B(1)"),
        store,
    );

    let summary = harness.orchestrator.provision_all(["a", "b"], 2).await;

    assert!(summary.failed.get("a").unwrap().contains("injected write failure"));
    assert_eq!(summary.provisioned, names(&["b"]));
    let registry = harness.ctx().registry();
    assert!(registry.read("doc://a").unwrap_err().is_not_found());
    assert_eq!(registry.read("doc://b").unwrap(), "B(1)");
}

#[tokio::test]
async fn test_listing_failure_falls_back_to_exists_probes() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp.path().join("manpages"), vec![]);
    let store = RecordingStore::new(config.store_dir.clone()).fail_listing();
    let harness = Harness::with_store(
        config,
        FixtureExtractor::new().page("grep", "GREP(1)").page("cat", "fresh"),
        store,
    );
    harness.store.write("cat", "CAT(1) stored").unwrap();

    let summary = harness.orchestrator.provision_all(["grep", "cat"], 2).await;

    assert_eq!(summary.provisioned, names(&["grep"]));
    assert_eq!(summary.already_cached, names(&["cat"]));
    assert_eq!(
        harness.store.exists_probes(),
        vec!["cat".to_string(), "grep".to_string()]
    );
    assert_eq!(harness.extractor.calls(), vec!["grep".to_string()]);
    assert_eq!(
        harness.ctx().registry().read("doc://cat").unwrap(),
        "CAT(1) stored"
    );
}

#[tokio::test]
async fn test_concurrent_provisioning_of_one_command_never_fails() {
    let temp = TempDir::new().unwrap();
    let page = "G".repeat(512 * 1024);
    let mut handles = Vec::new();
    for round in 0..20 {
        let store_dir = temp.path().join(format!("round{round}"));
        let harness = Harness::new(
            test_config(&store_dir, vec![]),
            FixtureExtractor::new().page("grep", &page),
        );
        for _ in 0..2 {
            let orchestrator = harness.orchestrator.clone();
            handles.push(tokio::spawn(
                async move { orchestrator.provision_one("grep").await },
            ));
        }
    }

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success(), "{}: {}", outcome.command, outcome.detail);
    }
}

#[tokio::test]
async fn test_concurrency_of_one_still_completes() {
    let commands: Vec<String> = (0..20).map(|i| format!("cmd{i:02}")).collect();
    let extractor = commands
        .iter()
        .fold(FixtureExtractor::new(), |ex, c| ex.page(c, &c.to_uppercase()));
    let (_temp, harness) = usr_bin_setup(extractor);

    let summary = harness.orchestrator.provision_all(commands.clone(), 1).await;

    assert_eq!(summary.provisioned.len(), 20);
    assert_eq!(harness.ctx().registry().len(), 20);
    assert_eq!(
        harness.ctx().registry().read("doc://cmd07").unwrap(),
        "CMD07"
    );
}

#[tokio::test]
async fn test_register_cached_requires_artifact() {
    let (_temp, harness) = usr_bin_setup(FixtureExtractor::new());

    let err = harness.orchestrator.register_cached("grep").await.unwrap_err();
    assert!(err.is_not_found());

    harness.store.write("grep", "GREP(1)").unwrap();
    let info = harness.orchestrator.register_cached("grep").await.unwrap();
    assert_eq!(info.uri, "doc://grep");
    assert_eq!(harness.ctx().registry().read("doc://grep").unwrap(), "GREP(1)");
    assert!(harness.extractor.calls().is_empty());
}

#[tokio::test]
async fn test_provision_path_scans_then_provisions() {
    let (_temp, harness) = usr_bin_setup(
        FixtureExtractor::new().page("grep", "GREP").page("cat", "CAT"),
    );

    let summary = harness.orchestrator.provision_path(0).await.unwrap();

    assert_eq!(summary.provisioned, names(&["cat", "grep"]));
    assert_eq!(
        harness.ctx().registry().read(ALL_COMMANDS_URI).unwrap(),
        "cat\ngrep"
    );
}
