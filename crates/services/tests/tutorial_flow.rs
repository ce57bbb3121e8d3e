mod common;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use common::{tutorial, user, FakeApi, EMAIL};
use diy_core::catalog::{CatalogQuery, SortKey};
use diy_core::forms::LoginDraft;
use diy_core::model::{LearningStatus, ProgressFilter, TutorialId};
use diy_core::progress::ProgressError;
use diy_core::time::fixed_now;
use services::{
    AppServices, CatalogError, Clock, PersistOutcome, ProgressSource, TutorialSessionError,
};
use storage::LocalStore;

fn fixtures() -> Vec<diy_core::model::Tutorial> {
    let mut keran = tutorial("t1", "Cara Memperbaiki Keran Air yang Bocor", 3);
    keran.duration = "15 menit".into();
    let mut cat = tutorial("t2", "Teknik Mengecat Dinding dengan Rapi", 4);
    cat.category = "Pengecatan".into();
    cat.duration = "30 menit".into();
    vec![keran, cat]
}

async fn signed_in() -> (Arc<FakeApi>, LocalStore, AppServices) {
    let api = Arc::new(FakeApi::with_tutorials(fixtures()));
    let store = LocalStore::in_memory();
    let services = AppServices::new(api.clone(), store.clone(), Clock::fixed(fixed_now()));
    services
        .session()
        .login(LoginDraft {
            email: EMAIL.into(),
            password: "rahasia".into(),
        })
        .await
        .unwrap();
    (api, store, services)
}

#[tokio::test]
async fn finished_writes_are_collected_during_the_session() {
    let (_api, _store, services) = signed_in().await;
    let mut session = services.open_tutorial(&TutorialId::new("t2")).await.unwrap();

    for _ in 0..3 {
        session.advance().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // Each advance reaps the writes that already finished.
    assert_eq!(session.pending_writes(), 1);

    let report = session.close().await;
    assert_eq!(report.persists.len(), 3);
}

#[tokio::test]
async fn completing_every_step_fires_once_and_syncs() {
    let (api, store, services) = signed_in().await;
    let id = TutorialId::new("t1");

    let mut session = services.open_tutorial(&id).await.unwrap();
    assert_eq!(session.tracker().current_step(), 1);
    assert_eq!(session.current_step().unwrap().title, "Langkah 1");

    let mut events = 0;
    for step in [3, 1, 2] {
        session.jump(step).await.unwrap();
        if session.mark_complete().await.completed_now {
            events += 1;
        }
    }
    // Marking again after completion changes nothing.
    assert!(!session.mark_complete().await.changed());
    assert_eq!(events, 1);
    assert!(session.tracker().is_completed());
    assert_eq!(session.tracker().percentage(), 100);

    let report = session.close().await;
    assert_eq!(report.persists.len(), 6);
    assert!(report
        .persists
        .iter()
        .all(|o| matches!(o, PersistOutcome::Synced | PersistOutcome::Superseded)));
    assert_eq!(api.progress_calls().len(), 6);

    let entries = store.learning(EMAIL).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status(), LearningStatus::Completed);

    let cached = store.progress(EMAIL, &id).await.unwrap().unwrap();
    assert_eq!(cached.completed_steps, BTreeSet::from([1, 2, 3]));
    assert_eq!(cached.current_step, 2);
}

#[tokio::test]
async fn navigation_is_bounded_and_jump_rejects_out_of_range() {
    let (_api, _store, services) = signed_in().await;
    let mut session = services.open_tutorial(&TutorialId::new("t1")).await.unwrap();

    assert!(!session.retreat().await.changed());
    assert!(session.advance().await.changed());
    assert!(session.advance().await.changed());
    assert!(!session.advance().await.changed());
    assert_eq!(session.tracker().current_step(), 3);

    assert!(matches!(
        session.jump(9).await,
        Err(ProgressError::StepOutOfRange { step: 9, total: 3 })
    ));
    session.close().await;
}

#[tokio::test]
async fn progress_made_offline_resumes_and_reconciles() {
    let (api, store, services) = signed_in().await;
    let id = TutorialId::new("t1");

    let mut session = services.open_tutorial(&id).await.unwrap();
    api.set_offline(true);
    session.mark_complete().await;
    session.advance().await;
    let report = session.close().await;
    assert_eq!(
        report.persists,
        vec![PersistOutcome::LocalOnly, PersistOutcome::LocalOnly]
    );
    assert!(!store.progress(EMAIL, &id).await.unwrap().unwrap().synced);

    api.set_offline(false);
    let session = services.open_tutorial(&id).await.unwrap();
    assert_eq!(session.progress_source(), ProgressSource::LocalCache);
    assert_eq!(session.tracker().current_step(), 2);
    assert!(session.tracker().is_step_completed(1));
    session.close().await;

    assert!(store.progress(EMAIL, &id).await.unwrap().unwrap().synced);
    assert_eq!(
        api.progress_calls(),
        vec![(id.clone(), 1, true), (id.clone(), 2, false)]
    );
}

#[tokio::test]
async fn missing_tutorial_and_signed_out_errors() {
    let (_api, _store, services) = signed_in().await;
    assert!(matches!(
        services.open_tutorial(&TutorialId::new("nope")).await,
        Err(TutorialSessionError::Catalog(CatalogError::NotFound))
    ));

    services.session().logout().await;
    assert!(matches!(
        services.open_tutorial(&TutorialId::new("t1")).await,
        Err(TutorialSessionError::NotSignedIn)
    ));
}

#[tokio::test]
async fn catalog_list_applies_search_sort_and_progress() {
    let (_api, store, services) = signed_in().await;
    let catalog = services.catalog();

    let query = CatalogQuery {
        search: "KERAN".into(),
        ..CatalogQuery::default()
    };
    let found = catalog.list(&query, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "t1");

    let longest_first = CatalogQuery {
        sort: SortKey::DurationLong,
        ..CatalogQuery::default()
    };
    let ids: Vec<_> = catalog
        .list(&longest_first, None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(ids, vec!["t2", "t1"]);

    store
        .mark_learning_completed(EMAIL, &TutorialId::new("t2"), fixed_now())
        .await
        .unwrap();
    let completed = CatalogQuery {
        progress: ProgressFilter::Completed,
        ..CatalogQuery::default()
    };
    let me = user();
    let list = catalog.list(&completed, Some(&me)).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id.as_str(), "t2");

    // Signed out, the progress filter is ignored.
    assert_eq!(catalog.list(&completed, None).await.unwrap().len(), 2);

    let statuses: HashMap<_, _> = catalog.statuses(EMAIL).await;
    assert_eq!(
        statuses.get(&TutorialId::new("t2")),
        Some(&LearningStatus::Completed)
    );
}
