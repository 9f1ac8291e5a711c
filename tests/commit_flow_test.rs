// ==========================================
// 提交流程集成测试
// ==========================================
// 测试目标: 样品表 → 校验 → 提交到跟踪库，容器清空与槽位写入
// ==========================================


use puck_importer::config::{ContainerLists, ListToggles};
use puck_importer::domain::SampleFilter;
use puck_importer::engine::{
    CancelToken, CommitOrchestrator, CommitProgress, CommitSettings, ContainerStore,
    NoOpProgressSink,
};
use puck_importer::importer::{DqValidator, ImportSession};
use puck_importer::{logging, ContainerKind, TrackingClient};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use test_helpers::{create_test_client, write_sample_sheet};

fn settings() -> CommitSettings {
    CommitSettings {
        owner: "staff".to_string(),
        ..Default::default()
    }
}

fn validated(dir: &TempDir, rows: Vec<Vec<&str>>) -> ImportSession {
    let path = write_sample_sheet(dir, "batch.xlsx", rows).unwrap();
    let mut session = ImportSession::open(&path).unwrap();
    let toggles = ListToggles {
        whitelist: false,
        blacklist: false,
        etched: false,
    };
    session.validate(&DqValidator::standard(), &ContainerLists::default(), &toggles);
    session
}

#[tokio::test]
async fn test_commit_batch_into_tracking_db() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let (_db, client) = create_test_client().unwrap();
    let session = validated(
        &dir,
        vec![
            vec!["PuckA", "1", "s1", "", "", "301234"],
            vec!["PuckB", "4", "s2", "", "", "301234"],
            vec!["PuckA", "16", "s3", "", "", "301234"],
        ],
    );
    let rows = session.committable_rows().unwrap();

    let store = Arc::new(ContainerStore::new(client.clone(), "staff"));
    let orchestrator = CommitOrchestrator::new(store.clone(), settings());

    let seen = Mutex::new(Vec::new());
    let sink = |p: &CommitProgress| seen.lock().unwrap().push(p.processed);
    let report = orchestrator.commit(rows, &sink, &CancelToken::new()).await;

    assert!(report.is_complete());
    assert_eq!(report.success_count(), 3);
    assert_eq!(report.emptied_containers, vec!["PuckA", "PuckB"]);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);

    let puck_a = store
        .find_by_name("PuckA", &ContainerKind::Puck)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(puck_a.capacity(), 16);
    assert_eq!(puck_a.occupied(), 2);

    let samples = client.find_samples(&SampleFilter::default()).await.unwrap();
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.proposal_id == Some(301234)));
    assert!(samples.iter().any(|s| s.uid == puck_a.content[15]));
}

#[tokio::test]
async fn test_recommit_replaces_previous_contents() {
    let dir = TempDir::new().unwrap();
    let (_db, client) = create_test_client().unwrap();
    let store = Arc::new(ContainerStore::new(client, "staff"));
    let orchestrator = CommitOrchestrator::new(store.clone(), settings());

    let first = validated(
        &dir,
        vec![
            vec!["PuckA", "1", "s1", "", "", "301234"],
            vec!["PuckA", "2", "s2", "", "", "301234"],
        ],
    );
    orchestrator
        .commit(
            first.committable_rows().unwrap(),
            &NoOpProgressSink,
            &CancelToken::new(),
        )
        .await;

    let second = validated(&dir, vec![vec!["PuckA", "5", "s9", "", "", "301234"]]);
    let report = orchestrator
        .commit(
            second.committable_rows().unwrap(),
            &NoOpProgressSink,
            &CancelToken::new(),
        )
        .await;
    assert!(report.is_complete());

    // 首次触达时清空，旧槽位不保留
    let puck = store
        .find_by_name("PuckA", &ContainerKind::Puck)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(puck.occupied(), 1);
    assert!(!puck.content[4].is_empty());
    assert_eq!(store.all_pucks("staff").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_mid_batch_keeps_written_rows() {
    let dir = TempDir::new().unwrap();
    let (_db, client) = create_test_client().unwrap();
    let store = Arc::new(ContainerStore::new(client, "staff"));
    let orchestrator = CommitOrchestrator::new(store.clone(), settings());
    let session = validated(
        &dir,
        vec![
            vec!["PuckA", "1", "s1", "", "", "301234"],
            vec!["PuckA", "2", "s2", "", "", "301234"],
            vec!["PuckA", "3", "s3", "", "", "301234"],
        ],
    );

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let last = Mutex::new(None);
    let sink = |p: &CommitProgress| {
        if p.processed == 1 {
            trigger.cancel();
        }
        *last.lock().unwrap() = Some(p.clone());
    };
    let report = orchestrator
        .commit(session.committable_rows().unwrap(), &sink, &cancel)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.processed(), 1);
    let last = last.lock().unwrap().clone().unwrap();
    assert!(last.cancelled);
    assert_eq!(last.processed, 1);
    assert_eq!(last.total, 3);

    let puck = store
        .find_by_name("PuckA", &ContainerKind::Puck)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(puck.occupied(), 1);
}
