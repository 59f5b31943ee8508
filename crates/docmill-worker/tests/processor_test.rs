//! End-to-end processor tests over a real store and filesystem fixtures.

use std::path::{Path, PathBuf};

use docmill_models::{JobDraft, JobMessage, JobStatus, Operation, SplitRange};
use docmill_pdf::{page_count, text_to_pdf};
use docmill_store::{JobStore, SqliteJobStore};
use docmill_worker::process_message;

async fn open_store(dir: &Path) -> SqliteJobStore {
    let url = format!("sqlite:{}", dir.join("jobs.db").display());
    SqliteJobStore::connect(&url).await.unwrap()
}

fn write_text(dir: &Path, name: &str, lines: usize) -> PathBuf {
    let path = dir.join(name);
    let body: String = (0..lines).map(|i| format!("line {i}\n")).collect();
    std::fs::write(&path, body).unwrap();
    path
}

/// Text-backed PDF fixture with exactly `pages` pages.
fn fixture_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let text = write_text(dir, &format!("{name}.txt"), pages * 52);
    let pdf = dir.join(format!("{name}.pdf"));
    text_to_pdf(&text, &pdf).unwrap();
    pdf
}

fn draft(operation: Operation, inputs: &[&Path]) -> JobDraft {
    JobDraft {
        owner_id: "user-1".to_string(),
        operation,
        input_paths: inputs.iter().map(|p| p.display().to_string()).collect(),
        original_file_names: inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect(),
        split_range: None,
    }
}

#[tokio::test]
async fn convert_job_completes_with_derived_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = write_text(dir.path(), "note.txt", 3);

    let job = store
        .create(draft(Operation::Convert, &[&input]))
        .await
        .unwrap();
    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);

    let output = PathBuf::from(&job.output_paths[0]);
    assert_eq!(output, dir.path().join("note.pdf"));
    assert_eq!(page_count(&output).unwrap(), 1);
}

#[tokio::test]
async fn any_failed_input_fails_the_whole_job() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let good = write_text(dir.path(), "good.txt", 3);
    let missing = dir.path().join("gone.docx");

    let job = store
        .create(draft(Operation::Convert, &[&good, &missing]))
        .await
        .unwrap();
    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.output_paths.is_empty());
    assert!(job.error_message.unwrap().contains("gone.docx"));
}

#[tokio::test]
async fn unsupported_input_fails_explicitly() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = dir.path().join("movie.mp4");
    std::fs::write(&input, b"frames").unwrap();

    let job = store
        .create(draft(Operation::Convert, &[&input]))
        .await
        .unwrap();
    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job
        .error_message
        .unwrap()
        .contains("Unsupported input format"));
}

#[tokio::test]
async fn merge_job_produces_one_concatenated_output() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let a = fixture_pdf(dir.path(), "a", 1);
    let b = fixture_pdf(dir.path(), "b", 1);

    let job = store
        .create(draft(Operation::Merge, &[&a, &b]))
        .await
        .unwrap();
    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);

    let output = PathBuf::from(&job.output_paths[0]);
    assert_eq!(
        output.file_name().unwrap().to_string_lossy(),
        format!("merged_{}.pdf", job.id)
    );
    assert_eq!(page_count(&output).unwrap(), 2);
}

#[tokio::test]
async fn split_clamps_the_end_of_the_range() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = fixture_pdf(dir.path(), "ten", 10);

    let mut d = draft(Operation::Split, &[&input]);
    d.split_range = Some(SplitRange::new(3, 100));
    let job = store.create(d).await.unwrap();

    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let output = PathBuf::from(&job.output_paths[0]);
    assert_eq!(page_count(&output).unwrap(), 8);
}

#[tokio::test]
async fn split_start_beyond_document_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = fixture_pdf(dir.path(), "two", 2);

    let mut d = draft(Operation::Split, &[&input]);
    d.split_range = Some(SplitRange::new(5, 9));
    let job = store.create(d).await.unwrap();

    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.output_paths.is_empty());
    assert!(job.error_message.unwrap().contains("start=5"));
}

#[tokio::test]
async fn redelivery_does_not_duplicate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = write_text(dir.path(), "again.txt", 3);

    let job = store
        .create(draft(Operation::Convert, &[&input]))
        .await
        .unwrap();
    let msg = JobMessage::from_job(&job);

    process_message(&store, &msg).await.unwrap();
    let first = store.get(&job.id).await.unwrap();
    let files_after_first = std::fs::read_dir(dir.path()).unwrap().count();

    // Same delivery again, as after a crash between commit and ack.
    process_message(&store, &msg).await.unwrap();
    let second = store.get(&job.id).await.unwrap();
    let files_after_second = std::fs::read_dir(dir.path()).unwrap().count();

    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.output_paths, first.output_paths);
    assert_eq!(files_after_second, files_after_first);
}

#[tokio::test]
async fn processing_job_is_picked_up_again() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;
    let input = write_text(dir.path(), "stuck.txt", 3);

    let job = store
        .create(draft(Operation::Convert, &[&input]))
        .await
        .unwrap();

    // The previous consumer crashed after marking the job processing.
    store
        .update_status(&job.id, JobStatus::Processing, &[], None)
        .await
        .unwrap();

    process_message(&store, &JobMessage::from_job(&job))
        .await
        .unwrap();

    let job = store.get(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);
}

#[tokio::test]
async fn unknown_job_message_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let job = draft(Operation::Convert, &[&dir.path().join("x.txt")]).into_job();
    let msg = JobMessage::from_job(&job);

    // No record was ever created for this id; the delivery is consumed
    // without touching the store.
    process_message(&store, &msg).await.unwrap();
}
