//! BDD test world for the nester dashboard

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cucumber::World;
use nester_dashboard::context::DashboardContext;
use nester_dashboard::io::{HttpClient, HttpResponse};
use nester_dashboard::model::Probe;
use nester_dashboard::poller::CycleOutcome;
use nester_dashboard::snapshot::Snapshot;
use nester_dashboard::{Config, DashboardError, SiteMode};

/// HTTP client answering from a path table that steps can rewrite
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<String, (u16, String)>>,
    healthy: Mutex<HashMap<String, (u16, String)>>,
}

impl ScriptedHttp {
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Answer `path` with a server error until `recover`
    pub fn fail(&self, path: &str) {
        let failing = (500, r#"{"error": "internal error"}"#.to_string());
        if let Some(previous) = self.routes.lock().unwrap().insert(path.to_string(), failing) {
            self.healthy.lock().unwrap().insert(path.to_string(), previous);
        }
    }

    pub fn recover(&self, path: &str) {
        if let Some(previous) = self.healthy.lock().unwrap().remove(path) {
            self.routes.lock().unwrap().insert(path.to_string(), previous);
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str) -> nester_dashboard::Result<HttpResponse> {
        let routes = self.routes.lock().unwrap();
        routes
            .iter()
            .find(|(path, _)| url.ends_with(path.as_str()))
            .map(|(_, (status, body))| HttpResponse {
                status: *status,
                body: body.clone(),
            })
            .ok_or_else(|| DashboardError::Network(format!("GET {} failed: connection refused", url)))
    }
}

#[derive(Default, World)]
pub struct DashboardWorld {
    pub http: Arc<ScriptedHttp>,
    pub mode: SiteMode,
    pub ctx: Option<Arc<DashboardContext>>,
    pub last_outcome: Option<CycleOutcome>,
    pub published: Option<Arc<Snapshot>>,
    pub visible: Vec<Probe>,
}

impl fmt::Debug for DashboardWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardWorld")
            .field("http", &self.http)
            .field("mode", &self.mode)
            .field("last_outcome", &self.last_outcome)
            .field("visible", &self.visible.len())
            .finish()
    }
}

impl DashboardWorld {
    /// Context for the world's site mode, created and activated on first use
    pub async fn context(&mut self) -> Arc<DashboardContext> {
        if let Some(ctx) = &self.ctx {
            return Arc::clone(ctx);
        }
        let config = Config {
            base_url: "http://probe:5000".to_string(),
            mode: self.mode,
            ..Config::default()
        };
        let ctx = nester_dashboard::build_context(&config, Arc::clone(&self.http) as Arc<dyn HttpClient>);
        ctx.poller().activate().await;
        self.ctx = Some(Arc::clone(&ctx));
        ctx
    }

    pub fn existing_context(&self) -> Arc<DashboardContext> {
        Arc::clone(self.ctx.as_ref().expect("no dashboard context set up"))
    }

    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.existing_context().snapshot().await
    }
}
