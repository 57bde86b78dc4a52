//! Registry orchestration: registration, refresh, deletion and sweeps

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use uuid::Uuid;

use common::{Behavior, FixtureServer, Scripted, ScriptedProber, closed_port_url};
use sitepulse_service::database::{LibsqlStore, MemoryStore};
use sitepulse_service::validation::TargetPolicy;
use sitepulse_service::{
    HttpProber, RegistryError, RegistrySettings, SiteRegistry, SiteStatus, SiteStore, ValidationError,
};

fn registry_with(prober: Arc<ScriptedProber>) -> (SiteRegistry, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = SiteRegistry::new(store.clone(), prober, RegistrySettings::default());
    (registry, store)
}

fn history_values(site: &sitepulse_service::Site) -> Vec<u64> {
    site.history.iter().map(|sample| sample.value).collect()
}

#[tokio::test]
async fn test_register_up_site() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(120)));
    let (registry, store) = registry_with(prober.clone());

    let site = registry.register_site("alice", "https://good.example").await.unwrap();

    assert_eq!(site.status, SiteStatus::Up);
    assert_eq!(site.uptime_percent, 100.0);
    assert_eq!(history_values(&site), vec![120]);
    assert_eq!(site.last_downtime_at, None);
    assert_eq!(site.url, "https://good.example");
    assert_eq!(prober.calls(), 1);
    assert_eq!(store.get(site.id).await.unwrap(), Some(site));
}

#[tokio::test]
async fn test_refresh_down_after_up() {
    let prober = Arc::new(ScriptedProber::new([Scripted::Up(120)], Scripted::Down));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://good.example").await.unwrap();
    let refreshed = registry.refresh_site(site.id, "alice").await.unwrap();

    assert_eq!(refreshed.status, SiteStatus::Down);
    assert_eq!(refreshed.status_code, None);
    assert_eq!(refreshed.uptime_percent, 50.0);
    assert_eq!(history_values(&refreshed), vec![120, 0]);
    assert_eq!(refreshed.last_downtime_at, Some(refreshed.last_checked_at));
    assert!(refreshed.last_checked_at >= site.last_checked_at);
}

#[tokio::test]
async fn test_downtime_survives_recovery() {
    let prober = Arc::new(ScriptedProber::new([Scripted::Up(10), Scripted::Down], Scripted::Up(10)));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://good.example").await.unwrap();
    let down = registry.refresh_site(site.id, "alice").await.unwrap();
    let recovered = registry.refresh_site(site.id, "alice").await.unwrap();

    assert_eq!(recovered.status, SiteStatus::Up);
    assert_eq!(recovered.last_downtime_at, down.last_downtime_at);
    assert!((recovered.uptime_percent - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_history_keeps_last_fifty_checks() {
    let script: Vec<Scripted> = (1..=51).map(Scripted::Up).collect();
    let prober = Arc::new(ScriptedProber::new(script, Scripted::Down));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://good.example").await.unwrap();
    let mut latest = site.clone();
    for _ in 2..=51 {
        latest = registry.refresh_site(site.id, "alice").await.unwrap();
    }

    assert_eq!(latest.history.len(), 50);
    assert_eq!(latest.history.first().map(|s| s.value), Some(2));
    assert_eq!(latest.history.last().map(|s| s.value), Some(51));
    // uptime still counts every check
    assert_eq!(latest.counters.total_checks, 51);
    assert_eq!(latest.uptime_percent, 100.0);
}

#[tokio::test]
async fn test_constant_outcome_gives_same_delta() {
    let prober = Arc::new(ScriptedProber::new([Scripted::Up(10)], Scripted::Down));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://good.example").await.unwrap();
    let first = registry.refresh_site(site.id, "alice").await.unwrap();
    let second = registry.refresh_site(site.id, "alice").await.unwrap();

    assert_eq!(first.counters.total_checks + 1, second.counters.total_checks);
    assert_eq!(first.counters.up_checks, second.counters.up_checks);
    assert_eq!(first.uptime_percent, 50.0);
    assert!((second.uptime_percent - 100.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unreachable_site_still_registers() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Down));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://gone.example").await.unwrap();

    assert_eq!(site.status, SiteStatus::Down);
    assert_eq!(site.uptime_percent, 0.0);
    assert_eq!(site.latest_response_time_ms, 0);
    assert_eq!(site.last_downtime_at, Some(site.last_checked_at));
}

#[tokio::test]
async fn test_http_error_keeps_status_code() {
    let prober = Arc::new(ScriptedProber::always(Scripted::HttpError(503, 40)));
    let (registry, _store) = registry_with(prober);

    let site = registry.register_site("alice", "https://flaky.example").await.unwrap();

    assert_eq!(site.status, SiteStatus::Down);
    assert_eq!(site.status_code, Some(503));
    assert_eq!(history_values(&site), vec![40]);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_probing() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let (registry, store) = registry_with(prober.clone());

    let err = registry.register_site("alice", "not a url").await.unwrap_err();
    assert!(matches!(err, RegistryError::Validation(ValidationError::MissingScheme)));

    let err = registry.register_site("", "https://good.example").await.unwrap_err();
    assert!(matches!(err, RegistryError::Unauthenticated));

    let err = registry.register_site("   ", "https://good.example").await.unwrap_err();
    assert!(matches!(err, RegistryError::Unauthenticated));

    assert_eq!(prober.calls(), 0);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_private_targets_refused_by_policy() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let settings = RegistrySettings {
        policy: TargetPolicy { allow_private_targets: false },
        ..RegistrySettings::default()
    };
    let registry = SiteRegistry::new(Arc::new(MemoryStore::new()), prober.clone(), settings);

    let err = registry.register_site("alice", "http://127.0.0.1:8080").await.unwrap_err();

    assert!(matches!(err, RegistryError::Validation(ValidationError::PrivateTarget(_))));
    assert_eq!(prober.calls(), 0);
}

#[tokio::test]
async fn test_probe_url_stores_nothing() {
    let prober = Arc::new(ScriptedProber::always(Scripted::HttpError(404, 15)));
    let (registry, store) = registry_with(prober.clone());

    let outcome = registry.probe_url(" https://missing.example/page ").await.unwrap();

    assert_eq!(outcome.status, SiteStatus::Down);
    assert_eq!(outcome.http_status_code, Some(404));
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(matches!(
        registry.probe_url("").await,
        Err(RegistryError::Validation(ValidationError::EmptyUrl))
    ));
    assert_eq!(prober.calls(), 1);
}

#[tokio::test]
async fn test_refresh_missing_and_foreign_sites() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let (registry, _store) = registry_with(prober.clone());
    let site = registry.register_site("alice", "https://good.example").await.unwrap();

    let missing = Uuid::new_v4();
    assert!(matches!(
        registry.refresh_site(missing, "alice").await,
        Err(RegistryError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        registry.refresh_site(site.id, "mallory").await,
        Err(RegistryError::Forbidden(id)) if id == site.id
    ));
    assert!(matches!(registry.refresh_site(site.id, "").await, Err(RegistryError::Unauthenticated)));
    assert!(matches!(registry.get_site(site.id, "mallory").await, Err(RegistryError::Forbidden(_))));

    // only the registration probed
    assert_eq!(prober.calls(), 1);
}

#[tokio::test]
async fn test_delete_site() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let (registry, store) = registry_with(prober);
    let site = registry.register_site("alice", "https://good.example").await.unwrap();

    assert!(matches!(registry.delete_site(site.id, "mallory").await, Err(RegistryError::Forbidden(_))));
    assert!(store.get(site.id).await.unwrap().is_some());

    registry.delete_site(site.id, "alice").await.unwrap();

    assert!(store.get(site.id).await.unwrap().is_none());
    assert!(matches!(registry.delete_site(site.id, "alice").await, Err(RegistryError::NotFound(_))));
    assert!(matches!(registry.refresh_site(site.id, "alice").await, Err(RegistryError::NotFound(_))));
}

#[tokio::test]
async fn test_list_sites_is_scoped_to_owner() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let (registry, _store) = registry_with(prober);

    registry.register_site("alice", "https://a.example").await.unwrap();
    registry.register_site("alice", "https://b.example").await.unwrap();
    registry.register_site("bob", "https://c.example").await.unwrap();

    let sites = registry.list_sites("alice").await.unwrap();
    assert_eq!(sites.len(), 2);
    assert!(sites.iter().all(|site| site.owner_id == "alice"));
    assert!(matches!(registry.list_sites("").await, Err(RegistryError::Unauthenticated)));
}

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(7)).with_delay(Duration::from_millis(20)));
    let (registry, _store) = registry_with(prober);
    let registry = Arc::new(registry);
    let site = registry.register_site("alice", "https://good.example").await.unwrap();

    let refreshes: Vec<_> = (0..10)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.refresh_site(site.id, "alice").await })
        })
        .collect();
    for refresh in refreshes {
        refresh.await.unwrap().unwrap();
    }

    let site = registry.get_site(site.id, "alice").await.unwrap();
    assert_eq!(site.counters.total_checks, 11);
    assert_eq!(site.history.len(), 11);
}

#[tokio::test]
async fn test_check_all_summarizes_sweep() {
    let prober = Arc::new(ScriptedProber::new(
        [Scripted::Up(1), Scripted::Up(1), Scripted::Up(1), Scripted::Up(1), Scripted::Down],
        Scripted::Up(1),
    ));
    let (registry, _store) = registry_with(prober.clone());
    for url in ["https://a.example", "https://b.example"] {
        registry.register_site("alice", url).await.unwrap();
    }
    registry.register_site("bob", "https://c.example").await.unwrap();

    let summary = registry.check_all(2).await.unwrap();

    assert_eq!(summary.checked, 3);
    assert_eq!(summary.up, 2);
    assert_eq!(summary.down, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(prober.calls(), 6);
}

#[tokio::test]
async fn test_watch_owner_emits_snapshots() {
    let prober = Arc::new(ScriptedProber::always(Scripted::Up(1)));
    let (registry, _store) = registry_with(prober);

    let mut snapshots = registry.watch_owner("alice").unwrap();
    let initial = snapshots.next().await.unwrap().unwrap();
    assert!(initial.is_empty());

    // another owner's change does not produce a snapshot for alice
    registry.register_site("bob", "https://c.example").await.unwrap();
    let site = registry.register_site("alice", "https://a.example").await.unwrap();

    let after_create = snapshots.next().await.unwrap().unwrap();
    assert_eq!(after_create.len(), 1);
    assert_eq!(after_create[0].id, site.id);

    registry.delete_site(site.id, "alice").await.unwrap();
    let after_delete = tokio::time::timeout(Duration::from_secs(1), snapshots.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(after_delete.is_empty());
}

#[tokio::test]
async fn test_end_to_end_with_http_and_libsql() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sites.db");
    let store = Arc::new(LibsqlStore::open(path.to_str().unwrap(), 2).await.unwrap());
    let prober = Arc::new(HttpProber::new("sitepulse-test", TargetPolicy::default()).unwrap());
    let settings = RegistrySettings { timeout_ms: 2_000, ..RegistrySettings::default() };
    let registry = SiteRegistry::new(store.clone(), prober, settings);

    let server = FixtureServer::spawn(Behavior::Status(200)).await;
    let up = registry.register_site("alice", &server.url()).await.unwrap();
    assert_eq!(up.status, SiteStatus::Up);
    assert_eq!(up.status_code, Some(200));
    assert_eq!(store.get(up.id).await.unwrap().as_ref(), Some(&up));

    let gone = registry.register_site("alice", &closed_port_url().await).await.unwrap();
    assert_eq!(gone.status, SiteStatus::Down);

    let refreshed = registry.refresh_site(up.id, "alice").await.unwrap();
    assert_eq!(refreshed.counters.total_checks, 2);
    assert_eq!(refreshed.history.len(), 2);

    let stored = store.get(up.id).await.unwrap().unwrap();
    assert_eq!(stored.counters, refreshed.counters);
    assert_eq!(registry.list_sites("alice").await.unwrap().len(), 2);
}
