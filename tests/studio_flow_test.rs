//! End-to-end session flows through the Studio service

mod support;

use modelrouter::hardware::FixedProbe;
use modelrouter::providers::ProviderAdapter;
use modelrouter::{
    FavoritesStore, GenerateOptions, Priority, ProviderKind, RouterConfig, RouterError, Studio,
    UseCase,
};
use std::sync::Arc;
use support::mock;
use tempfile::TempDir;

fn studio_with(adapters: Vec<Arc<dyn ProviderAdapter>>, favorites: FavoritesStore) -> Studio {
    Studio::new(
        RouterConfig::default(),
        adapters,
        Arc::new(FixedProbe::with_ram_gb(16)),
        favorites,
    )
}

#[tokio::test]
async fn test_session_flow() {
    let ollama = mock(ProviderKind::Ollama, &["llama3.1:8b"]);
    let groq = mock(ProviderKind::Groq, &["llama-3.3-70b-versatile"]);
    let studio = studio_with(vec![ollama.clone(), groq.clone()], FavoritesStore::in_memory());

    let snapshot = studio.start().await;
    assert_eq!(snapshot.reachable_count(), 2);
    assert_eq!(studio.hardware().unwrap().total_ram_gb(), Some(16.0));

    let set = studio
        .set_preferences(UseCase::Chat, Priority::Balanced)
        .await;
    let top = set.top().unwrap();
    assert!(top.availability.available);
    // 70B local model needs 48 GB and is excluded on a 16 GB host
    assert!(set.items.iter().all(|r| r.model_id != "llama3.1:70b"));

    let response = studio
        .generate("Say hi", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider, ProviderKind::Ollama);

    studio
        .switch_to_model("llama-3.3-70b-versatile")
        .await
        .unwrap();
    let response = studio
        .generate("Say hi", GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider, ProviderKind::Groq);
}

#[tokio::test]
async fn test_recommendations_go_stale_on_outside_discovery() {
    let ollama = mock(ProviderKind::Ollama, &["phi3:mini"]);
    let studio = studio_with(vec![ollama], FavoritesStore::in_memory());
    studio.start().await;
    assert!(studio.recommendations().is_none());

    studio.refresh_recommendations().await;
    assert!(studio.recommendations().is_some());

    // Discovery that bypasses the session leaves the cached set behind
    studio.registry().discover().await;
    assert!(studio.recommendations().is_none());

    // Discovery through the session recomputes it
    studio.refresh_recommendations().await;
    let snapshot = studio.discover_providers().await;
    assert_eq!(
        studio.recommendations().map(|s| s.generation),
        Some(snapshot.generation)
    );
}

#[tokio::test]
async fn test_favorites_survive_restart_but_installed_state_does_not() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("favorites.json");

    {
        let ollama = mock(ProviderKind::Ollama, &["mistral:7b"]);
        let studio = studio_with(vec![ollama], FavoritesStore::load(path.clone()));
        studio.discover_providers().await;
        assert!(studio.toggle_favorite("mistral:7b").await.unwrap());
        let item = studio
            .model_catalog()
            .await
            .into_iter()
            .find(|i| i.entry.id == "mistral:7b")
            .unwrap();
        assert!(item.installed && item.favorite);
    }

    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("mistral:7b"));
    assert!(!saved.contains("installed"));

    // Next session: Ollama is down
    let ollama = mock(ProviderKind::Ollama, &[]);
    ollama.set_online(false);
    let studio = studio_with(vec![ollama], FavoritesStore::load(path));
    studio.discover_providers().await;
    let item = studio
        .model_catalog()
        .await
        .into_iter()
        .find(|i| i.entry.id == "mistral:7b")
        .unwrap();
    assert!(item.favorite);
    assert!(!item.installed);
}

#[tokio::test]
async fn test_pull_of_unknown_or_cloud_model_fails() {
    let ollama = mock(ProviderKind::Ollama, &[]);
    let studio = studio_with(vec![ollama.clone()], FavoritesStore::in_memory());
    studio.start().await;

    let err = studio.pull_model("does-not-exist").await.unwrap_err();
    assert!(matches!(err, RouterError::UnknownModel { .. }));

    let err = studio.pull_model("gpt-4o").await.unwrap_err();
    assert!(matches!(err, RouterError::ModelPullFailed { .. }));
    assert!(ollama.pull_calls().is_empty());
}

#[tokio::test]
async fn test_benchmarks_snapshot_follows_latest_run() {
    let ollama = mock(ProviderKind::Ollama, &["phi3:mini", "llama3.1:8b"]);
    let studio = studio_with(vec![ollama], FavoritesStore::in_memory());
    studio.start().await;

    let first = studio
        .run_benchmarks(&["phi3:mini".to_string(), "llama3.1:8b".to_string()])
        .await;
    assert_eq!(studio.benchmarks().len(), 2);

    let second = studio.run_benchmarks(&["phi3:mini".to_string()]).await;
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(studio.benchmarks(), second.results);
}
