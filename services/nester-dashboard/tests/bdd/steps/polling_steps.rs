//! BDD step definitions for poll cycle synchronization

use std::sync::Arc;

use cucumber::{given, then, when};
use nester_dashboard::snapshot::SiteData;
use nester_dashboard::SiteMode;

use crate::world::DashboardWorld;

#[given(expr = "a single-site probe named {string}")]
fn single_site_probe(world: &mut DashboardWorld, name: String) {
    world.mode = SiteMode::SingleSite;
    let status = serde_json::json!({
        "franchise_id": "SEA",
        "franchise_name": name,
        "version": "1.0.0",
        "status": "running",
    });
    world.http.respond("/api/status", 200, &status.to_string());
}

#[given(expr = "the probe reports {int} hosts up out of {int}")]
fn probe_reports(world: &mut DashboardWorld, hosts_up: u64, total_hosts: u64) {
    let report = serde_json::json!({
        "timestamp": "2025-01-12T09:29:00",
        "scan_duration_seconds": 31.2,
        "wan_latency_ms": 14.0,
        "summary": {"hosts_up": hosts_up, "total_hosts": total_hosts},
        "hosts": [],
    });
    world.http.respond("/api/report", 200, &report.to_string());
}

#[given(expr = "the probe lists {int} hosts")]
fn probe_lists_hosts(world: &mut DashboardWorld, count: u8) {
    let hosts: Vec<serde_json::Value> = (1..=count)
        .map(|i| serde_json::json!({"ip": format!("192.168.1.{}", i), "state": "up"}))
        .collect();
    world
        .http
        .respond("/api/hosts", 200, &serde_json::Value::from(hosts).to_string());
}

#[given("the probe has not scanned yet")]
fn probe_not_scanned(world: &mut DashboardWorld) {
    world
        .http
        .respond("/api/report", 404, r#"{"error": "No report available"}"#);
}

#[given("a poll cycle has published a snapshot")]
async fn cycle_published(world: &mut DashboardWorld) {
    let ctx = world.context().await;
    let outcome = ctx.poller().tick().await;
    assert_eq!(
        serde_json::to_value(outcome).unwrap(),
        serde_json::json!("published")
    );
    world.published = ctx.snapshot().await;
}

#[given("the poller has been stopped")]
async fn poller_stopped(world: &mut DashboardWorld) {
    let ctx = world.context().await;
    ctx.poller().stop().await;
}

#[given(expr = "the {string} endpoint starts failing")]
#[when(expr = "the {string} endpoint starts failing")]
fn endpoint_fails(world: &mut DashboardWorld, path: String) {
    world.http.fail(&path);
}

#[when(expr = "the {string} endpoint recovers")]
fn endpoint_recovers(world: &mut DashboardWorld, path: String) {
    world.http.recover(&path);
}

#[given("a poll cycle runs")]
#[when("a poll cycle runs")]
async fn cycle_runs(world: &mut DashboardWorld) {
    let ctx = world.context().await;
    world.last_outcome = Some(ctx.poller().tick().await);
}

#[then(expr = "the cycle outcome is {string}")]
fn cycle_outcome_is(world: &mut DashboardWorld, expected: String) {
    let outcome = world.last_outcome.expect("no poll cycle has run");
    assert_eq!(
        serde_json::to_value(outcome).unwrap(),
        serde_json::Value::String(expected)
    );
}

#[then(expr = "the snapshot shows {int} of {int} hosts up")]
async fn snapshot_shows_hosts(world: &mut DashboardWorld, hosts_up: u64, total_hosts: u64) {
    let snapshot = world.snapshot().await.expect("no snapshot published");
    assert_eq!(snapshot.host_stats.hosts_up, hosts_up);
    assert_eq!(snapshot.host_stats.total_hosts, total_hosts);
}

#[then("the last update time is set")]
async fn last_update_set(world: &mut DashboardWorld) {
    let status = world.existing_context().sync_status().await;
    assert!(status.last_update.is_some());
}

#[then(expr = "the sync status is {string}")]
async fn sync_status_is(world: &mut DashboardWorld, expected: String) {
    let status = world.existing_context().sync_status().await;
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["phase"], serde_json::Value::String(expected));
}

#[then("the published snapshot is unchanged")]
async fn snapshot_unchanged(world: &mut DashboardWorld) {
    let before = world.published.clone().expect("no snapshot was recorded");
    let now = world.snapshot().await.expect("snapshot disappeared");
    assert!(Arc::ptr_eq(&before, &now));
}

#[then("the snapshot has no report")]
async fn snapshot_without_report(world: &mut DashboardWorld) {
    let snapshot = world.snapshot().await.expect("no snapshot published");
    match &snapshot.data {
        SiteData::SingleSite { report, .. } => assert!(report.is_none()),
        other => panic!("expected single-site data, got {other:?}"),
    }
}

#[then("no snapshot is published")]
async fn no_snapshot(world: &mut DashboardWorld) {
    assert!(world.snapshot().await.is_none());
}
