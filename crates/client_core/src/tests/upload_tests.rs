use super::*;

use std::sync::atomic::AtomicUsize;

use tokio::sync::oneshot;

use crate::fake_api::{Call, FakeApi};

fn project(name: &str) -> ProjectName {
    ProjectName::parse(name).expect("valid project name")
}

fn shots(names: &[&str]) -> Vec<ImageFile> {
    names
        .iter()
        .map(|name| ImageFile::new(*name, "image/png", name.as_bytes().to_vec()))
        .collect()
}

fn counting_refresh(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> {
    let counter = Arc::clone(counter);
    async move {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

fn finished(outcome: UploadOutcome) -> UploadReport {
    match outcome {
        UploadOutcome::Finished(report) => report,
        other => panic!("expected finished batch, got {other:?}"),
    }
}

#[tokio::test]
async fn uploads_every_file_in_order_one_at_a_time() {
    let api = FakeApi::new().with_project("alpha", "", &[]);
    let sequencer = UploadSequencer::new(api.clone());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let report = finished(
        sequencer
            .run(
                &project("alpha"),
                shots(&["c.png", "a.png", "d.png", "b.png"]),
                counting_refresh(&refreshes),
            )
            .await,
    );

    assert!(report.is_complete());
    assert_eq!(api.upload_order(), ["c.png", "a.png", "d.png", "b.png"]);
    assert_eq!(api.max_concurrent_uploads(), 1);
    assert_eq!(
        report
            .uploaded
            .iter()
            .map(|info| info.filename.as_str())
            .collect::<Vec<_>>(),
        ["1.jpg", "2.jpg", "3.jpg", "4.jpg"]
    );
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    // Every start is preceded by the previous file's completion.
    let uploads: Vec<Call> = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::UploadStarted { .. } | Call::UploadFinished { .. }))
        .collect();
    for pair in uploads.chunks(2) {
        assert!(matches!(pair[0], Call::UploadStarted { .. }));
        assert!(matches!(pair[1], Call::UploadFinished { .. }));
    }
}

#[tokio::test]
async fn failure_aborts_rest_of_batch_and_still_refreshes_once() {
    let api = FakeApi::new().with_project("alpha", "", &[]);
    api.fail_upload_of("2.png", ClientError::api(413, "File too large"));
    let sequencer = UploadSequencer::new(api.clone());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let report = finished(
        sequencer
            .run(
                &project("alpha"),
                shots(&["1.png", "2.png", "3.png"]),
                counting_refresh(&refreshes),
            )
            .await,
    );

    assert_eq!(api.upload_order(), ["1.png", "2.png"]);
    assert_eq!(report.uploaded.len(), 1);
    assert_eq!(report.skipped, 1);
    let failure = report.failure.expect("failure recorded");
    assert_eq!(failure.index, 1);
    assert_eq!(failure.file_name, "2.png");
    assert_eq!(failure.error.status(), Some(413));
    assert_eq!(api.stored_images("alpha"), ["1.jpg"]);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert!(!sequencer.is_busy());
}

#[tokio::test]
async fn failure_of_first_upload_attempts_nothing_else() {
    let api = FakeApi::new().with_project("alpha", "", &[]);
    api.fail_upload_of("1.png", ClientError::Transport("connection refused".into()));
    let sequencer = UploadSequencer::new(api.clone());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let report = finished(
        sequencer
            .run(
                &project("alpha"),
                shots(&["1.png", "2.png"]),
                counting_refresh(&refreshes),
            )
            .await,
    );

    assert!(report.uploaded.is_empty());
    assert_eq!(api.upload_order(), ["1.png"]);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_batch_is_ignored_without_refresh() {
    let api = FakeApi::new();
    let sequencer = UploadSequencer::new(api.clone());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let outcome = sequencer
        .run(&project("alpha"), Vec::new(), counting_refresh(&refreshes))
        .await;

    assert!(matches!(outcome, UploadOutcome::Empty));
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn reentrant_batch_is_dropped_while_busy() {
    let api = FakeApi::new().with_project("alpha", "", &[]);
    let sequencer = Arc::new(UploadSequencer::new(api.clone()));
    let (refresh_started_tx, refresh_started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let first = {
        let sequencer = Arc::clone(&sequencer);
        tokio::spawn(async move {
            sequencer
                .run(&project("alpha"), shots(&["first.png"]), async move {
                    let _ = refresh_started_tx.send(());
                    let _ = release_rx.await;
                })
                .await
        })
    };
    refresh_started_rx.await.expect("first batch reached refresh");
    assert!(sequencer.is_busy());

    let refreshes = Arc::new(AtomicUsize::new(0));
    let second = sequencer
        .run(
            &project("alpha"),
            shots(&["second.png"]),
            counting_refresh(&refreshes),
        )
        .await;
    assert!(matches!(second, UploadOutcome::Busy));
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    release_tx.send(()).expect("release first batch");
    let first = finished(first.await.expect("first batch task"));
    assert!(first.is_complete());
    assert!(!sequencer.is_busy());
    assert_eq!(api.upload_order(), ["first.png"]);
}

#[tokio::test]
async fn busy_flag_is_cleared_after_failure_so_next_batch_runs() {
    let api = FakeApi::new().with_project("alpha", "", &[]);
    api.fail_upload_of("bad.png", ClientError::api(400, "File must be an image"));
    let sequencer = UploadSequencer::new(api.clone());
    let refreshes = Arc::new(AtomicUsize::new(0));

    sequencer
        .run(&project("alpha"), shots(&["bad.png"]), counting_refresh(&refreshes))
        .await;
    let report = finished(
        sequencer
            .run(&project("alpha"), shots(&["good.png"]), counting_refresh(&refreshes))
            .await,
    );

    assert!(report.is_complete());
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
}
