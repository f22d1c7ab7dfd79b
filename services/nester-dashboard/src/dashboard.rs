//! Local web dashboard serving the synchronized data as HTML and JSON

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::context::{DashboardContext, DetailOutcome};
use crate::detail::DetailEntry;
use crate::filter::{self, FilterMode};
use crate::snapshot::Snapshot;
use crate::state::SyncPhase;
use crate::views;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub ctx: Arc<DashboardContext>,
}

/// Build the dashboard axum router
pub fn build_router(ctx: Arc<DashboardContext>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/probes", get(probes_handler))
        .route("/api/hosts", get(hosts_handler))
        .route(
            "/api/probe/{id}/logs",
            get(logs_handler).delete(invalidate_logs_handler),
        )
        .route(
            "/api/probe/{id}/equipment",
            get(equipment_handler).delete(invalidate_equipment_handler),
        )
        .route("/api/view", get(view_handler).put(update_view_handler))
        .route("/api/selection", delete(close_selection_handler))
        .route("/api/selection/{id}", put(select_handler))
        .route("/api/selected/logs", get(selected_logs_handler))
        .route("/api/selected/equipment", get(selected_equipment_handler))
        .route("/api/refresh", post(refresh_handler))
        .route(
            "/api/auto-refresh",
            get(auto_refresh_handler).put(set_auto_refresh_handler),
        )
        .route("/health", get(health_handler))
        .with_state(DashboardState { ctx })
}

fn no_data() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "No data synchronized yet" })),
    )
        .into_response()
}

fn detail_response<T: Serialize>(id: &str, entry: &DetailEntry<T>) -> Response {
    let status = if entry.payload.is_none() && entry.error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    let body = serde_json::json!({
        "id": id,
        "loading": entry.loading,
        "error": entry.error,
        "fetched_at": entry.fetched_at,
        "payload": entry.payload.as_deref(),
    });
    (status, Json(body)).into_response()
}

fn selection_response<T: Serialize>(id: Option<String>, outcome: DetailOutcome<T>) -> Response {
    match outcome {
        DetailOutcome::Ready(entry) => detail_response(id.as_deref().unwrap_or_default(), &entry),
        DetailOutcome::Superseded => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "Selection changed while loading" })),
        )
            .into_response(),
        DetailOutcome::NoSelection => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No probe selected" })),
        )
            .into_response(),
    }
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(dashboard.ctx.sync_status().await)
}

async fn snapshot_handler(State(dashboard): State<DashboardState>) -> Response {
    match dashboard.ctx.snapshot().await {
        Some(snapshot) => Json(&*snapshot).into_response(),
        None => no_data(),
    }
}

#[derive(Debug, Serialize)]
struct StatsBody {
    generation: u64,
    cards: Vec<views::StatCard>,
    breakdown: Vec<views::StatusSlice>,
    top_franchises: Vec<views::FranchiseBar>,
    host_stats: crate::aggregate::HostStats,
    fleet_stats: Option<crate::aggregate::DerivedStats>,
}

fn stats_body(snapshot: &Snapshot) -> StatsBody {
    StatsBody {
        generation: snapshot.generation,
        cards: views::stat_cards(snapshot),
        breakdown: snapshot
            .fleet_stats
            .as_ref()
            .map(views::status_breakdown)
            .unwrap_or_default(),
        top_franchises: views::top_franchises(snapshot.probes(), views::TOP_FRANCHISES),
        host_stats: snapshot.host_stats,
        fleet_stats: snapshot.fleet_stats.clone(),
    }
}

async fn stats_handler(State(dashboard): State<DashboardState>) -> Response {
    match dashboard.ctx.snapshot().await {
        Some(snapshot) => Json(stats_body(&snapshot)).into_response(),
        None => no_data(),
    }
}

#[derive(Debug, Deserialize)]
struct ProbeQuery {
    filter: Option<FilterMode>,
    search: Option<String>,
}

async fn probes_handler(
    State(dashboard): State<DashboardState>,
    Query(query): Query<ProbeQuery>,
) -> Response {
    let Some(snapshot) = dashboard.ctx.snapshot().await else {
        return no_data();
    };
    let mode = query.filter.unwrap_or_default();
    let search = query.search.unwrap_or_default();
    let visible = filter::filter_probes(snapshot.probes(), mode, &search);

    Json(serde_json::json!({
        "filter": mode,
        "search": search,
        "counts": filter::mode_counts(snapshot.probes()),
        "probes": views::probe_rows(&visible, Utc::now()),
    }))
    .into_response()
}

async fn hosts_handler(State(dashboard): State<DashboardState>) -> Response {
    match dashboard.ctx.snapshot().await {
        Some(snapshot) => Json(views::host_rows(snapshot.hosts())).into_response(),
        None => no_data(),
    }
}

async fn logs_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    let entry = dashboard.ctx.logs().get(&id).await;
    detail_response(&id, &entry)
}

async fn invalidate_logs_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> StatusCode {
    dashboard.ctx.logs().invalidate(&id).await;
    StatusCode::NO_CONTENT
}

async fn equipment_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    let entry = dashboard.ctx.equipment().get(&id).await;
    detail_response(&id, &entry)
}

async fn invalidate_equipment_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> StatusCode {
    dashboard.ctx.equipment().invalidate(&id).await;
    StatusCode::NO_CONTENT
}

async fn view_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let view = dashboard.ctx.view().await;
    let visible = dashboard.ctx.visible_probes().await;
    let refs: Vec<_> = visible.iter().collect();
    Json(serde_json::json!({
        "view": view,
        "probes": views::probe_rows(&refs, Utc::now()),
    }))
}

#[derive(Debug, Deserialize)]
struct ViewUpdate {
    filter: Option<FilterMode>,
    search: Option<String>,
}

async fn update_view_handler(
    State(dashboard): State<DashboardState>,
    Json(update): Json<ViewUpdate>,
) -> impl IntoResponse {
    if let Some(mode) = update.filter {
        dashboard.ctx.set_filter(mode).await;
    }
    if let Some(search) = update.search {
        dashboard.ctx.set_search(&search).await;
    }
    Json(dashboard.ctx.view().await)
}

async fn select_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    dashboard.ctx.select_probe(&id).await;
    Json(dashboard.ctx.view().await)
}

async fn close_selection_handler(State(dashboard): State<DashboardState>) -> StatusCode {
    dashboard.ctx.close_detail().await;
    StatusCode::NO_CONTENT
}

async fn selected_logs_handler(State(dashboard): State<DashboardState>) -> Response {
    let selected = dashboard.ctx.view().await.selected;
    selection_response(selected, dashboard.ctx.load_logs().await)
}

async fn selected_equipment_handler(State(dashboard): State<DashboardState>) -> Response {
    let selected = dashboard.ctx.view().await.selected;
    selection_response(selected, dashboard.ctx.load_equipment().await)
}

async fn refresh_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let outcome = dashboard.ctx.refresh_now().await;
    tracing::debug!("Manual refresh requested: {:?}", outcome);
    Json(serde_json::json!({ "outcome": outcome }))
}

#[derive(Debug, Deserialize, Serialize)]
struct AutoRefresh {
    enabled: bool,
}

async fn auto_refresh_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(AutoRefresh {
        enabled: dashboard.ctx.poller().is_auto_refreshing().await,
    })
}

async fn set_auto_refresh_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<AutoRefresh>,
) -> Response {
    let enabled = dashboard.ctx.set_auto_refresh(request.enabled).await;
    if request.enabled && !enabled {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "Poller is not running" })),
        )
            .into_response();
    }
    tracing::debug!("Auto-refresh set to {}", enabled);
    Json(AutoRefresh { enabled }).into_response()
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn sync_label(phase: &SyncPhase) -> String {
    match phase {
        SyncPhase::Loading => "Loading".to_string(),
        SyncPhase::Fresh => "Up to date".to_string(),
        SyncPhase::Stale { since, error } => format!(
            "Stale since {}: {}",
            since.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_html(error)
        ),
        SyncPhase::Failed { error, .. } => format!("Unavailable: {}", escape_html(error)),
    }
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let status = dashboard.ctx.sync_status().await;
    let snapshot = dashboard.ctx.snapshot().await;
    let auto_refresh = dashboard.ctx.poller().is_auto_refreshing().await;
    let now = Utc::now();

    let cards: String = snapshot
        .as_deref()
        .map(views::stat_cards)
        .unwrap_or_default()
        .iter()
        .map(|card| {
            format!(
                r#"<div style="flex: 1; padding: 1rem; border: 1px solid #dee2e6; border-radius: 0.5rem;">
                    <div style="color: #6c757d; font-size: 0.85em;">{}</div>
                    <div style="font-size: 2em; font-weight: 700;">{}</div>
                    <div style="color: #6c757d; font-size: 0.8em;">{}</div>
                </div>"#,
                escape_html(&card.label),
                escape_html(&card.value),
                escape_html(card.subtitle.as_deref().unwrap_or_default()),
            )
        })
        .collect();

    let rows: String = match snapshot.as_deref() {
        Some(snapshot) if !snapshot.probes().is_empty() => {
            let probes: Vec<_> = snapshot.probes().iter().collect();
            views::probe_rows(&probes, now)
                .iter()
                .map(|row| {
                    let (label, color, bg) = if row.connected {
                        ("Online", "#155724", "#d4edda")
                    } else {
                        ("Offline", "#721c24", "#f8d7da")
                    };
                    format!(
                        r#"<tr style="border-bottom: 1px solid #dee2e6;">
                            <td style="padding: 0.5rem;">{}</td>
                            <td style="padding: 0.5rem;">{}</td>
                            <td style="padding: 0.5rem;"><span style="padding: 0.25em 0.6em; border-radius: 0.25rem; color: {}; background-color: {};">{}</span></td>
                            <td style="padding: 0.5rem;">{}</td>
                            <td style="padding: 0.5rem;">{}</td>
                            <td style="padding: 0.5rem;">{}</td>
                        </tr>"#,
                        escape_html(&row.name),
                        escape_html(&row.franchise_id),
                        color,
                        bg,
                        label,
                        row.hosts_up.map_or_else(|| "-".to_string(), |n| n.to_string()),
                        row.latency,
                        row.last_activity,
                    )
                })
                .collect()
        }
        Some(snapshot) => views::host_rows(snapshot.hosts())
            .iter()
            .map(|row| {
                format!(
                    r#"<tr style="border-bottom: 1px solid #dee2e6;">
                        <td style="padding: 0.5rem;">{}</td>
                        <td style="padding: 0.5rem;">{}</td>
                        <td style="padding: 0.5rem;">{}</td>
                        <td style="padding: 0.5rem;">{}</td>
                        <td style="padding: 0.5rem;">{}</td>
                        <td style="padding: 0.5rem;">{}</td>
                    </tr>"#,
                    escape_html(&row.name),
                    escape_html(&row.ip),
                    if row.up { "Up" } else { "Down" },
                    row.open_ports,
                    escape_html(row.os.as_deref().unwrap_or("-")),
                    escape_html(row.vendor.as_deref().unwrap_or("-")),
                )
            })
            .collect(),
        None => String::new(),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Nester Dashboard</title>
    <script>
        function refreshStatus() {{
            fetch('/api/status')
                .then(r => r.json())
                .then(s => {{
                    const label = {{
                        loading: 'Loading',
                        fresh: 'Up to date',
                        stale: 'Stale since ' + s.since + ': ' + s.error,
                        failed: 'Unavailable: ' + s.error,
                    }}[s.phase];
                    document.getElementById('sync').textContent = label;
                }});
        }}
        function toggleAutoRefresh() {{
            const enabled = document.getElementById('auto').dataset.enabled !== 'true';
            fetch('/api/auto-refresh', {{
                method: 'PUT',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ enabled }}),
            }})
                .then(r => r.json())
                .then(s => {{
                    const button = document.getElementById('auto');
                    button.dataset.enabled = s.enabled;
                    button.textContent = 'Auto-refresh ' + (s.enabled ? 'ON' : 'OFF');
                }});
        }}
        function refreshNow() {{
            fetch('/api/refresh', {{ method: 'POST' }}).then(() => setTimeout(refreshStatus, 1000));
        }}
        setInterval(refreshStatus, 5000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 1100px; margin: 0 auto; padding: 1rem;">
    <h1>Nester Dashboard</h1>
    <p>Sync: <span id="sync">{sync}</span> &middot; updated {updated} &middot; generation {generation} &middot; <a href="/">reload</a></p>
    <p>
        <button id="auto" data-enabled="{auto_refresh}" onclick="toggleAutoRefresh()">Auto-refresh {auto_label}</button>
        <button onclick="refreshNow()">Refresh</button>
    </p>
    <section style="display: flex; gap: 1rem;">{cards}</section>
    <section>
        <table style="width: 100%; border-collapse: collapse; margin-top: 1.5rem;">
            <tbody>{rows}</tbody>
        </table>
    </section>
</body>
</html>"#,
        sync = sync_label(&status.phase),
        updated = views::time_ago(status.last_update, now),
        generation = status.generation,
        auto_refresh = auto_refresh,
        auto_label = if auto_refresh { "ON" } else { "OFF" },
        cards = cards,
        rows = rows,
    );

    Html(html)
}
