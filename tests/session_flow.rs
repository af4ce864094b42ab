//! Session flow tests against an in-process fake engine.
//!
//! The fake counts calls, records the options it was asked to process with,
//! and can hold a call open on a `Notify` so overlap and reset races can be
//! driven deterministically.

use async_trait::async_trait;
use documinter::{
    ArtifactEditor, CandidateFile, Completion, EngineConfig, EngineError, ExportError,
    ExtractionEngine, ExtractionMode, IngestionController, Lifecycle, MemoryClipboard, Operation,
    Options, OptionsPatch, PageBound, ProcessOutput, ProcessingController, RemoteId, SessionError,
    SessionHandle, SessionObserver, Stage, UploadPayload, UploadReceipt,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

// ── Fake engine ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeEngine {
    page_count: u32,
    upload_failure: Option<String>,
    process_failure: Option<String>,
    /// When set, calls announce themselves on `entered` and wait here.
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    upload_calls: AtomicUsize,
    process_calls: AtomicUsize,
    seen_options: Mutex<Vec<Options>>,
}

impl FakeEngine {
    fn with_pages(page_count: u32) -> Self {
        Self {
            page_count,
            ..Default::default()
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    async fn hold(&self) {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    fn runs(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionEngine for FakeEngine {
    async fn upload(&self, payload: UploadPayload<'_>) -> Result<UploadReceipt, EngineError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        if let Some(detail) = &self.upload_failure {
            return Err(EngineError::Status {
                status: 400,
                detail: detail.clone(),
            });
        }
        Ok(UploadReceipt {
            remote_id: RemoteId::new("abc123"),
            filename: payload.file_name.to_string(),
            page_count: self.page_count,
        })
    }

    async fn process(&self, remote_id: &RemoteId, options: &Options) -> Result<ProcessOutput, EngineError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().unwrap().push(*options);
        self.hold().await;
        if let Some(detail) = &self.process_failure {
            return Err(EngineError::Status {
                status: 500,
                detail: detail.clone(),
            });
        }
        let end = options.end_page().as_option().unwrap_or(self.page_count);
        Ok(ProcessOutput {
            markdown: format!(
                "# {remote_id}\n\npages {}-{end} ({})\n",
                options.start_page(),
                options.mode()
            ),
            page_count: Some(end + 1 - options.start_page()),
        })
    }

    async fn health(&self) -> Result<String, EngineError> {
        Ok("fake engine".into())
    }
}

// ── Recording observer ───────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    transitions: Mutex<Vec<(Lifecycle, Lifecycle, Operation)>>,
    errors: Mutex<Vec<(Stage, String)>>,
    stale: Mutex<Vec<Stage>>,
}

impl Recorder {
    fn lifecycles(&self) -> Vec<Lifecycle> {
        self.transitions.lock().unwrap().iter().map(|t| t.1).collect()
    }
}

impl SessionObserver for Recorder {
    fn on_transition(&self, from: Lifecycle, to: Lifecycle, operation: Operation) {
        self.transitions.lock().unwrap().push((from, to, operation));
    }

    fn on_error(&self, stage: Stage, message: &str) {
        self.errors.lock().unwrap().push((stage, message.to_string()));
    }

    fn on_stale_completion(&self, stage: Stage) {
        self.stale.lock().unwrap().push(stage);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    session: SessionHandle,
    engine: Arc<FakeEngine>,
    recorder: Arc<Recorder>,
    ingest: IngestionController,
    process: ProcessingController,
    editor: ArtifactEditor,
}

fn harness(engine: FakeEngine) -> Harness {
    let session = SessionHandle::default();
    let engine = Arc::new(engine);
    let recorder = Arc::new(Recorder::default());
    session.add_observer(recorder.clone());
    let config = EngineConfig::default();
    Harness {
        ingest: IngestionController::new(session.clone(), engine.clone(), &config),
        process: ProcessingController::new(session.clone(), engine.clone()),
        editor: ArtifactEditor::new(session.clone()),
        session,
        engine,
        recorder,
    }
}

fn report_pdf() -> CandidateFile {
    CandidateFile::new(
        "/home/user/report.pdf",
        "report.pdf",
        "application/pdf",
        b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n".to_vec(),
    )
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ten_page_document_full_flow() {
    let h = harness(FakeEngine::with_pages(10));

    let receipt = assert_ok!(h.ingest.submit(&report_pdf()).await);
    let receipt = receipt.applied().expect("upload applied");
    assert_eq!(receipt.remote_id.as_str(), "abc123");
    assert_eq!(receipt.page_count, 10);

    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Ready);
    assert_eq!(snap.page_count(), 10);
    assert_eq!(snap.options().start_page(), 1);
    assert_eq!(snap.options().end_page(), PageBound::Bounded(10));
    assert_eq!(snap.options().mode(), ExtractionMode::Clean);

    let artifact = assert_ok!(h.process.run().await).applied().expect("run applied");
    assert_eq!(artifact.text, "# abc123\n\npages 1-10 (clean)\n");
    assert_eq!(artifact.pages_extracted, Some(10));

    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
    assert_eq!(
        h.recorder.lifecycles(),
        vec![
            Lifecycle::Uploading,
            Lifecycle::Ready,
            Lifecycle::Processing,
            Lifecycle::Completed
        ]
    );
    assert_eq!(h.engine.uploads(), 1);
    assert_eq!(h.engine.runs(), 1);
}

#[tokio::test]
async fn selected_range_is_sent_to_engine() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);

    assert_ok!(h.process.configure(
        OptionsPatch::new()
            .start_page(3)
            .end_page(PageBound::Bounded(5))
            .mode(ExtractionMode::Raw)
    ));
    assert_ok!(h.process.run().await);

    let seen = h.engine.seen_options.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].start_page(), 3);
    assert_eq!(seen[0].end_page(), PageBound::Bounded(5));
    assert_eq!(seen[0].mode(), ExtractionMode::Raw);
    assert_eq!(h.editor.raw_text().unwrap(), "# abc123\n\npages 3-5 (raw)\n");
}

#[tokio::test]
async fn end_page_past_document_is_clamped() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);

    assert_ok!(h
        .process
        .configure(OptionsPatch::new().end_page(PageBound::Bounded(99))));
    let snap = h.session.snapshot();
    assert_eq!(snap.options().end_page(), PageBound::Bounded(10));
}

#[tokio::test]
async fn invalid_range_is_rejected_and_nothing_changes() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);
    let before = h.session.snapshot();

    let err = assert_err!(h.process.configure(
        OptionsPatch::new()
            .start_page(5)
            .end_page(PageBound::Bounded(3))
    ));
    assert!(matches!(err, SessionError::InvalidPageRange { start: 5, end: 3 }));

    let err = assert_err!(h.process.configure(OptionsPatch::new().start_page(0)));
    assert!(matches!(err, SessionError::StartPageTooLow { start: 0 }));

    assert_eq!(h.session.snapshot(), before);
    assert_eq!(h.engine.runs(), 0);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_never_reaches_engine() {
    let h = harness(FakeEngine::with_pages(10));
    let notes = CandidateFile::new("/tmp/notes.txt", "notes.txt", "text/plain", b"hello".to_vec());

    let err = assert_err!(h.ingest.submit(&notes).await);
    assert!(matches!(err, SessionError::NotAPdf { .. }));
    assert!(err.is_validation());

    assert_eq!(h.engine.uploads(), 0);
    assert_eq!(h.session.lifecycle(), Lifecycle::Empty);
    assert!(h.recorder.lifecycles().is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected_locally() {
    let session = SessionHandle::default();
    let engine = Arc::new(FakeEngine::with_pages(1));
    let config = EngineConfig::builder().max_upload_bytes(8).build().unwrap();
    let ingest = IngestionController::new(session.clone(), engine.clone(), &config);

    let err = assert_err!(ingest.submit(&report_pdf()).await);
    assert!(matches!(err, SessionError::FileTooLarge { limit: 8, .. }));
    assert_eq!(engine.uploads(), 0);
    assert_eq!(session.lifecycle(), Lifecycle::Empty);
}

#[tokio::test]
async fn opens_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    std::fs::write(&path, b"%PDF-1.4\n").unwrap();

    let file = CandidateFile::open(&path).await.unwrap();
    assert_eq!(file.declared_name, "scan.pdf");
    assert_eq!(file.media_type, "application/pdf");
    assert!(file.validate(1024).is_ok());

    let missing = CandidateFile::open(dir.path().join("gone.pdf")).await;
    assert!(matches!(missing, Err(SessionError::Unreadable { .. })));
}

// ── Single flight ────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_while_processing_is_rejected() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);

    // Gate only the processing call.
    let gated = FakeEngine::with_pages(10).gated();
    let engine = Arc::new(gated);
    let process = ProcessingController::new(h.session.clone(), engine.clone());

    let first = tokio::spawn({
        let process = process.clone();
        async move { process.run().await }
    });
    engine.entered.notified().await;
    assert_eq!(h.session.lifecycle(), Lifecycle::Processing);

    let err = assert_err!(process.run().await);
    assert!(matches!(err, SessionError::ProcessingInFlight));
    let err = assert_err!(process.configure(OptionsPatch::new().mode(ExtractionMode::Raw)));
    assert!(matches!(err, SessionError::ProcessingInFlight));

    engine.release();
    let outcome = first.await.unwrap();
    assert!(matches!(outcome, Ok(Completion::Applied(_))));
    assert_eq!(engine.runs(), 1);
    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
}

#[tokio::test]
async fn second_submit_while_uploading_is_rejected() {
    let h = harness(FakeEngine::with_pages(4).gated());

    let first = tokio::spawn({
        let ingest = h.ingest.clone();
        async move { ingest.submit(&report_pdf()).await }
    });
    h.engine.entered.notified().await;

    let err = assert_err!(h.ingest.submit(&report_pdf()).await);
    assert!(matches!(err, SessionError::UploadInFlight));
    let err = assert_err!(h.process.run().await);
    assert!(matches!(err, SessionError::UploadInFlight));

    h.engine.release();
    assert!(matches!(first.await.unwrap(), Ok(Completion::Applied(_))));
    assert_eq!(h.engine.uploads(), 1);

    let err = assert_err!(h.ingest.submit(&report_pdf()).await);
    assert!(matches!(err, SessionError::DocumentAlreadyLoaded));
}

#[tokio::test]
async fn run_without_document() {
    let h = harness(FakeEngine::with_pages(1));
    let err = assert_err!(h.process.run().await);
    assert!(matches!(err, SessionError::NoDocument));
    assert_eq!(h.engine.runs(), 0);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_failure_returns_to_empty() {
    let h = harness(FakeEngine {
        upload_failure: Some("Only PDF files are allowed".into()),
        ..FakeEngine::with_pages(3)
    });

    let err = assert_err!(h.ingest.submit(&report_pdf()).await);
    match err {
        SessionError::Ingestion { message } => assert_eq!(message, "Only PDF files are allowed"),
        other => panic!("unexpected error: {other:?}"),
    }

    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Empty);
    assert!(snap.document().is_none());
    assert!(snap.remote_id().is_none());
    let last = snap.last_error().expect("error recorded");
    assert_eq!(last.stage, Stage::Ingestion);
    assert_eq!(h.recorder.errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn processing_failure_keeps_document_and_options() {
    let h = harness(FakeEngine {
        process_failure: Some("Processing failed".into()),
        ..FakeEngine::with_pages(10)
    });
    assert_ok!(h.ingest.submit(&report_pdf()).await);
    assert_ok!(h.process.configure(OptionsPatch::new().start_page(2)));
    let options = *h.session.snapshot().options();

    let err = assert_err!(h.process.run().await);
    assert!(matches!(err, SessionError::Processing { .. }));

    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Ready);
    assert_eq!(*snap.options(), options);
    assert_eq!(snap.remote_id().map(RemoteId::as_str), Some("abc123"));
    assert!(snap.artifact().is_none());
    assert_eq!(snap.last_error().map(|e| e.stage), Some(Stage::Processing));
    assert!(h
        .recorder
        .transitions
        .lock()
        .unwrap()
        .iter()
        .any(|t| t.2 == Operation::FailAt(Stage::Processing)));
}

// ── Reset ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_during_upload_drops_late_answer() {
    let h = harness(FakeEngine::with_pages(10).gated());

    let pending = tokio::spawn({
        let ingest = h.ingest.clone();
        async move { ingest.submit(&report_pdf()).await }
    });
    h.engine.entered.notified().await;
    h.session.reset();
    h.engine.release();

    let outcome = pending.await.unwrap().unwrap();
    assert!(outcome.is_stale());
    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Empty);
    assert!(snap.remote_id().is_none());
    assert_eq!(snap.page_count(), 0);
    assert_eq!(*h.recorder.stale.lock().unwrap(), vec![Stage::Ingestion]);
}

#[tokio::test]
async fn reset_during_processing_drops_late_artifact() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);

    let engine = Arc::new(FakeEngine::with_pages(10).gated());
    let process = ProcessingController::new(h.session.clone(), engine.clone());
    let pending = tokio::spawn({
        let process = process.clone();
        async move { process.run().await }
    });
    engine.entered.notified().await;
    h.session.reset();
    engine.release();

    assert!(pending.await.unwrap().unwrap().is_stale());
    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Empty);
    assert!(snap.artifact().is_none());
    assert!(h.editor.raw_text().is_none());
}

#[tokio::test]
async fn new_upload_after_reset_is_not_clobbered_by_old_one() {
    let h = harness(FakeEngine::with_pages(10).gated());

    let old = tokio::spawn({
        let ingest = h.ingest.clone();
        async move { ingest.submit(&report_pdf()).await }
    });
    h.engine.entered.notified().await;
    h.session.reset();

    // A fresh upload through an ungated engine completes first.
    let fresh_engine = Arc::new(FakeEngine::with_pages(2));
    let fresh = IngestionController::new(h.session.clone(), fresh_engine, &EngineConfig::default());
    assert_ok!(fresh.submit(&report_pdf()).await);
    assert_eq!(h.session.snapshot().page_count(), 2);

    h.engine.release();
    assert!(old.await.unwrap().unwrap().is_stale());
    let snap = h.session.snapshot();
    assert_eq!(snap.lifecycle(), Lifecycle::Ready);
    assert_eq!(snap.page_count(), 2);
}

// ── Options after completion ─────────────────────────────────────────────────

#[tokio::test]
async fn changing_mode_after_completion_returns_to_ready() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);
    assert_ok!(h.process.run().await);
    let text = h.editor.raw_text().unwrap();

    // Same options again: still current.
    assert_ok!(h.process.configure(OptionsPatch::new().mode(ExtractionMode::Clean)));
    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
    assert!(h.editor.rendered().unwrap().is_current);

    assert_ok!(h.process.configure(OptionsPatch::new().mode(ExtractionMode::Raw)));
    assert_eq!(h.session.lifecycle(), Lifecycle::Ready);
    let view = h.editor.rendered().unwrap();
    assert_eq!(view.text, text);
    assert!(!view.is_current);

    assert_ok!(h.process.run().await);
    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
    assert_eq!(h.editor.raw_text().unwrap(), "# abc123\n\npages 1-10 (raw)\n");
    assert_eq!(h.engine.runs(), 2);
}

// ── Artifact editing and export ──────────────────────────────────────────────

#[tokio::test]
async fn edit_then_export() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);
    assert_ok!(h.process.run().await);

    assert_ok!(h.editor.edit("# Edited\n\nby hand\n"));
    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
    assert_eq!(h.editor.rendered().unwrap().text, "# Edited\n\nby hand\n");

    let mut clipboard = MemoryClipboard::default();
    let copied = assert_ok!(h.editor.copy_to_clipboard(&mut clipboard));
    assert_eq!(copied, "# Edited\n\nby hand\n".len());
    assert_eq!(clipboard.contents.as_deref(), Some("# Edited\n\nby hand\n"));

    let dir = tempfile::tempdir().unwrap();
    let path = assert_ok!(h.editor.download_as_file(dir.path()).await);
    assert_eq!(path.file_name().unwrap(), "report.md");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Edited\n\nby hand\n");

    let custom = dir.path().join("nested/out.md");
    let saved = assert_ok!(h.editor.save_as(&custom).await);
    assert_eq!(std::fs::read_to_string(saved).unwrap(), "# Edited\n\nby hand\n");

    // Exports never touch the session.
    assert_eq!(h.session.lifecycle(), Lifecycle::Completed);
}

#[tokio::test]
async fn export_without_artifact_fails() {
    let h = harness(FakeEngine::with_pages(10));
    assert_ok!(h.ingest.submit(&report_pdf()).await);

    let dir = tempfile::tempdir().unwrap();
    let err = assert_err!(h.editor.download_as_file(dir.path()).await);
    assert!(matches!(err, ExportError::NoArtifact));
    assert!(matches!(h.editor.edit("x"), Err(SessionError::NoArtifact)));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}
