/// Data client initialization from the settings repository.
use fuelops::config::{ConnectionSettings, MemorySettingsStore, SettingsRepository};
use fuelops::services::DataClient;
use std::sync::Arc;

fn repo_with(store: MemorySettingsStore) -> SettingsRepository {
    SettingsRepository::new(Arc::new(store))
}

#[tokio::test]
async fn test_absent_settings_leave_client_uninitialized() {
    let client = DataClient::new();
    let repo = repo_with(MemorySettingsStore::new());

    assert_eq!(client.initialize(&repo).await.unwrap(), false);
    assert!(!client.is_initialized().await);
}

#[tokio::test]
async fn test_malformed_settings_leave_client_uninitialized() {
    let client = DataClient::new();
    let repo = repo_with(MemorySettingsStore::seeded("{\"url\": 42}"));

    assert_eq!(client.initialize(&repo).await.unwrap(), false);
    assert!(!client.is_initialized().await);
}

#[tokio::test]
async fn test_malformed_url_leaves_client_uninitialized() {
    let client = DataClient::new();
    let repo = repo_with(MemorySettingsStore::new());
    repo.save_settings(&ConnectionSettings::new(
        "not a url".to_string(),
        "anon-key".to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(client.initialize(&repo).await.unwrap(), false);
}

#[tokio::test]
async fn test_valid_settings_initialize_the_client() {
    let client = DataClient::new();
    let repo = repo_with(MemorySettingsStore::new());
    repo.save_settings(&ConnectionSettings::new(
        "https://example.supabase.co".to_string(),
        "anon-key".to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(client.initialize(&repo).await.unwrap(), true);
    assert!(client.is_initialized().await);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let client = DataClient::new();
    let repo = repo_with(MemorySettingsStore::new());
    repo.save_settings(&ConnectionSettings::new(
        "https://example.supabase.co".to_string(),
        "anon-key".to_string(),
    ))
    .await
    .unwrap();

    assert!(client.initialize(&repo).await.unwrap());

    // A second call is a no-op even if the persisted payload has since been
    // corrupted.
    let broken = repo_with(MemorySettingsStore::seeded("garbage"));
    assert!(client.initialize(&broken).await.unwrap());
    assert!(client.is_initialized().await);
}

#[tokio::test]
async fn test_settings_survive_a_save_load_cycle() {
    let store = MemorySettingsStore::new();
    let repo = SettingsRepository::new(Arc::new(store));

    let mut settings = ConnectionSettings::new(
        "https://example.supabase.co".to_string(),
        "anon-key".to_string(),
    );
    settings.service_role_key = Some("service-key".to_string());
    settings.retry.max_retries = 7;
    settings.retry.backoff = false;

    repo.save_settings(&settings).await.unwrap();
    assert_eq!(repo.load_settings().await.unwrap(), settings);
}
