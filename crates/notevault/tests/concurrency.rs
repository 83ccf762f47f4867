//! Racing writers against one note.

use notevault::store::Store;
use notevault::{ErrorKind, NotePayload, SealedNote, UpsertOutcome};
use notevault_testkit::{NoteKey, Scenario};

fn sealed(tag: u8) -> SealedNote {
    SealedNote::new(vec![tag; 32], vec![tag; 12], vec![tag; 16])
}

async fn race_for_next_version<S: Store>(s: Scenario<S>) {
    let key = NoteKey::generate();
    s.vault
        .upsert("alice", "A", s.alice.create_payload(&key, "v1"))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for writer in 0..8u8 {
        let vault = s.vault.clone();
        tasks.push(tokio::spawn(async move {
            vault
                .upsert("alice", "A", NotePayload::new(sealed(writer), 2))
                .await
        }));
    }

    let mut appended = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(result) => {
                assert_eq!(result.outcome, UpsertOutcome::Appended);
                appended += 1;
            }
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::StaleVersion);
                assert_eq!(err.current_version(), Some(2));
            }
        }
    }
    assert_eq!(appended, 1);

    let history = s.vault.history("alice", "A").await.unwrap();
    assert_eq!(history.len(), 2);
}

async fn race_to_create<S: Store>(s: Scenario<S>) {
    let mut tasks = Vec::new();
    for party in [&s.alice, &s.bob, &s.carol] {
        let vault = s.vault.clone();
        let username = party.username.clone();
        let payload = party.create_payload(&NoteKey::generate(), "first!");
        tasks.push(tokio::spawn(async move {
            vault.upsert(&username, "contested", payload).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(result) => {
                assert_eq!(result.outcome, UpsertOutcome::Created);
                created += 1;
            }
            Err(err) => assert!(matches!(
                err.kind(),
                ErrorKind::PermissionDenied | ErrorKind::AlreadyExists
            )),
        }
    }
    assert_eq!(created, 1);

    let owners: usize = {
        let mut total = 0;
        for name in ["alice", "bob", "carol"] {
            total += s.vault.list_notes_for_user(name).await.unwrap().owner.len();
        }
        total
    };
    assert_eq!(owners, 1);
}

async fn independent_notes<S: Store>(s: Scenario<S>) {
    let mut tasks = Vec::new();
    for i in 0..10 {
        let vault = s.vault.clone();
        let payload = s.alice.create_payload(&NoteKey::generate(), "body");
        tasks.push(tokio::spawn(async move {
            vault.upsert("alice", &format!("note-{i}"), payload).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().outcome, UpsertOutcome::Created);
    }

    let listing = s.vault.list_notes_for_user("alice").await.unwrap();
    assert_eq!(listing.owner.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_for_next_version_memory() {
    race_for_next_version(Scenario::memory().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_for_next_version_sqlite() {
    race_for_next_version(Scenario::sqlite().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_to_create_memory() {
    race_to_create(Scenario::memory().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_to_create_sqlite() {
    race_to_create(Scenario::sqlite().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_notes_memory() {
    independent_notes(Scenario::memory().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_notes_sqlite() {
    independent_notes(Scenario::sqlite().await).await;
}
