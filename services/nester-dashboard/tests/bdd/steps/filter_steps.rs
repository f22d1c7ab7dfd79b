//! BDD step definitions for probe filtering

use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use nester_dashboard::filter::FilterMode;
use nester_dashboard::SiteMode;

use crate::world::DashboardWorld;

#[given("the central server lists these probes:")]
fn server_lists_probes(world: &mut DashboardWorld, step: &Step) {
    world.mode = SiteMode::MultiSite;
    let table = step.table.as_ref().expect("probe table missing");

    let probes: Vec<serde_json::Value> = table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            serde_json::json!({
                "franchise_id": row[0],
                "franchise_name": row[1],
                "status": row[2],
            })
        })
        .collect();

    world
        .http
        .respond("/api/probes", 200, &serde_json::Value::from(probes).to_string());
    world.http.respond(
        "/api/statistics",
        200,
        r#"{"total_probes": 3, "connected_probes": 2, "disconnected_probes": 1}"#,
    );
}

async fn apply_filter(world: &mut DashboardWorld, mode: &str, search: &str) {
    let mode: FilterMode = mode.parse().expect("unknown filter mode");
    let ctx = world.context().await;
    ctx.set_filter(mode).await;
    ctx.set_search(search).await;
    world.visible = ctx.visible_probes().await;
}

#[when(expr = "I filter by {string}")]
async fn filter_by(world: &mut DashboardWorld, mode: String) {
    apply_filter(world, &mode, "").await;
}

#[when(expr = "I filter by {string} and search for {string}")]
async fn filter_and_search(world: &mut DashboardWorld, mode: String, search: String) {
    apply_filter(world, &mode, &search).await;
}

#[then(expr = "I see only probe {string}")]
fn see_only(world: &mut DashboardWorld, id: String) {
    let ids: Vec<&str> = world
        .visible
        .iter()
        .map(|p| p.franchise_id.as_str())
        .collect();
    assert_eq!(ids, vec![id.as_str()]);
}

#[then("I see no probes")]
fn see_none(world: &mut DashboardWorld) {
    assert!(world.visible.is_empty(), "visible: {:?}", world.visible);
}

#[then(expr = "I see {int} probes")]
fn see_count(world: &mut DashboardWorld, count: usize) {
    assert_eq!(world.visible.len(), count);
}
