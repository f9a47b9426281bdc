//! Debounced persistence of the settings document.

use outrigger_core_plugins::settings::{SettingsDocument, SettingsStore, SettingsStoreExt};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(200);

fn document_in(dir: &tempfile::TempDir) -> SettingsDocument {
    SettingsDocument::open(dir.path().join("settings.json"))
        .expect("fresh document should open")
        .with_debounce(DEBOUNCE)
}

#[tokio::test(start_paused = true)]
async fn bursts_of_saves_coalesce_into_one_write() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document_in(&dir);

    for i in 0..5 {
        doc.set_typed("outrigger", "counter", &i).unwrap();
        doc.schedule_save();
    }
    assert_eq!(doc.save_count(), 0, "nothing is written before the delay");

    tokio::time::sleep(DEBOUNCE * 2).await;

    assert_eq!(doc.save_count(), 1);
    let reopened = SettingsDocument::open(doc.path().unwrap()).unwrap();
    assert_eq!(reopened.get_or("outrigger", "counter", -1), 4);
}

#[tokio::test(start_paused = true)]
async fn saves_after_the_window_schedule_a_new_write() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document_in(&dir);

    doc.set_typed("outrigger", "step", &1).unwrap();
    doc.schedule_save();
    tokio::time::sleep(DEBOUNCE * 2).await;

    doc.set_typed("outrigger", "step", &2).unwrap();
    doc.schedule_save();
    tokio::time::sleep(DEBOUNCE * 2).await;

    assert_eq!(doc.save_count(), 2);
    let reopened = SettingsDocument::open(doc.path().unwrap()).unwrap();
    assert_eq!(reopened.get_or("outrigger", "step", 0), 2);
}

#[tokio::test]
async fn flush_writes_without_waiting() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document_in(&dir);

    doc.set_typed("outrigger", "names", &["axios", "dayjs"]).unwrap();
    doc.flush().unwrap();

    let reopened = SettingsDocument::open(doc.path().unwrap()).unwrap();
    let names: Vec<String> = reopened.get_or("outrigger", "names", Vec::new());
    assert_eq!(names, vec!["axios", "dayjs"]);
}

#[test]
fn concurrent_flushes_all_succeed_and_keep_the_newest_state() {
    const WRITERS: usize = 8;
    const ROUNDS: u64 = 50;

    let dir = tempfile::tempdir().unwrap();
    let doc = document_in(&dir);

    std::thread::scope(|scope| {
        for writer in 0..WRITERS {
            let doc = doc.clone();
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    doc.set_typed("outrigger", &format!("writer{writer}"), &round)
                        .unwrap();
                    doc.flush().unwrap();
                }
            });
        }
    });

    assert_eq!(doc.save_count(), WRITERS as u64 * ROUNDS);
    let reopened = SettingsDocument::open(doc.path().unwrap()).unwrap();
    for writer in 0..WRITERS {
        let key = format!("writer{writer}");
        assert_eq!(reopened.get_or("outrigger", &key, 0_u64), ROUNDS - 1);
    }
    assert!(!dir.path().join("settings.json.tmp").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn debounced_save_and_flush_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let doc = SettingsDocument::open(dir.path().join("settings.json"))
        .unwrap()
        .with_debounce(Duration::from_millis(1));

    for round in 0..50_u64 {
        doc.set_typed("outrigger", "round", &round).unwrap();
        doc.schedule_save();
        doc.flush().unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    doc.flush().unwrap();
    // Let the last armed save land before the directory goes away.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let reopened = SettingsDocument::open(doc.path().unwrap()).unwrap();
    assert_eq!(reopened.get_or("outrigger", "round", 0_u64), 49);
}
