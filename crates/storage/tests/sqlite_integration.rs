use diy_core::model::{Theme, TutorialId};
use diy_core::time::fixed_now;
use storage::repository::KeyValueStore;
use storage::sqlite::SqliteRepository;
use storage::{CachedProgress, LocalStore};

#[tokio::test]
async fn sqlite_kv_overwrites_and_removes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are idempotent.
    repo.migrate().await.expect("migrate again");

    repo.set("app_theme", "dark").await.unwrap();
    repo.set("app_theme", "light").await.unwrap();
    assert_eq!(repo.get("app_theme").await.unwrap().as_deref(), Some("light"));

    repo.remove("app_theme").await.unwrap();
    assert_eq!(repo.get("app_theme").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_local_store_persists_progress_and_learning() {
    let store = LocalStore::sqlite("sqlite:file:memdb_local_store?mode=memory&cache=shared")
        .await
        .expect("open store");
    let id = TutorialId::new("65c1");

    let cached = CachedProgress {
        current_step: 4,
        completed_steps: [1, 2, 3].into_iter().collect(),
        version: 2,
        synced: true,
    };
    store
        .save_progress("test@mail.com", &id, &cached)
        .await
        .unwrap();
    assert_eq!(
        store.progress("test@mail.com", &id).await.unwrap(),
        Some(cached)
    );

    store
        .touch_learning("test@mail.com", &id, fixed_now())
        .await
        .unwrap();
    let learning = store.learning("test@mail.com").await.unwrap();
    assert_eq!(learning.len(), 1);
    assert!(!learning[0].completed);

    store.save_theme(Theme::Dark).await.unwrap();
    assert_eq!(store.theme().await.unwrap(), Some(Theme::Dark));
}
