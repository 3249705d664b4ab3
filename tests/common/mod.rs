#![allow(dead_code)]

use core::time::Duration;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    extract::{Path, Query, Request},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use pulse::{
    extract::Endpoints,
    scrape::{ScrapeConfig, Scraper},
};
use serde_json::{Value, json};

const CODECHEF_TOTAL: &str = r#"<html><body><section class="rating-data-section problems-solved">
<h3>Contest Problems Solved: 12</h3><h3>Total Problems Solved: 321</h3></section></body></html>"#;

const CODECHEF_LEGACY: &str = r#"<html><body><section class="rating-data-section problems-solved">
<h5>Fully Solved (45)</h5><h5>Partially Solved (3)</h5></section></body></html>"#;

const SKILLRACK_OFFICIAL: &str = r#"<html><body><div class="ui six small statistics">
<div class="statistic"><div class="value">7</div><div class="label">RANK</div></div>
<div class="statistic"><div class="value">150</div><div class="label">PROGRAMS SOLVED</div></div>
</div></body></html>"#;

const SKILLRACK_OFFICIAL_ZERO: &str = r#"<html><body><div class="ui six small statistics">
<div class="statistic"><div class="value">0</div><div class="label">PROGRAMS SOLVED</div></div>
</div></body></html>"#;

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn leetcode_graphql(Json(body): Json<Value>) -> Response {
    let user = body["variables"]["username"].as_str().unwrap_or_default();
    match user {
        "asha" => Json(json!({"data": {"matchedUser": {"submitStats": {"acSubmissionNum": [
            {"difficulty": "All", "count": 212},
            {"difficulty": "Easy", "count": 130},
        ]}}}}))
        .into_response(),
        "ghost" => Json(json!({"data": {"matchedUser": null}})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn leetcode_profile(Path(user): Path<String>) -> Response {
    match user.as_str() {
        "ghost" => Html(r#"<script>{"userProfile":{"totalSolved": 57}}</script>"#).into_response(),
        _ => not_found(),
    }
}

async fn codechef(Path(user): Path<String>) -> Response {
    match user.as_str() {
        "asha" => Html(CODECHEF_TOTAL).into_response(),
        "legacy" => Html(CODECHEF_LEGACY).into_response(),
        _ => not_found(),
    }
}

async fn hackerrank(Path(user): Path<String>, Query(q): Query<HashMap<String, String>>) -> Response {
    if q.get("filter").map(String::as_str) != Some("categories:problem_solving") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match user.as_str() {
        "asha" => Json(json!({"models": [{"solved": 10}, {"solved": 5}, {"name": "no count"}]})).into_response(),
        _ => not_found(),
    }
}

async fn github(Path(user): Path<String>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .is_some_and(|v| v.as_bytes() == b"Bearer secret");
    match user.as_str() {
        "asha" => Json(json!([{"id": 1}, {"id": 2}, {"id": 3}])).into_response(),
        "private" if authorized => Json(json!([{"id": 9}])).into_response(),
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}

async fn skillrack_official(Path(user): Path<String>) -> Response {
    match user.as_str() {
        "asha" => Html(SKILLRACK_OFFICIAL).into_response(),
        "zero" => Html(SKILLRACK_OFFICIAL_ZERO).into_response(),
        "flaky" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => not_found(),
    }
}

async fn skillrack_mirror(Path(user): Path<String>) -> Response {
    match user.as_str() {
        "zero" => Html("<html><body><p>Total Solved: 120</p></body></html>").into_response(),
        "flaky" => Html("<html><body><div><b>Solved</b> 90</div></body></html>").into_response(),
        _ => not_found(),
    }
}

async fn skillrack_api(Query(q): Query<HashMap<String, String>>) -> Response {
    match q.get("url") {
        Some(url) if url.ends_with("/apionly") => Json(json!({"result": {"solved": "133"}})).into_response(),
        _ => not_found(),
    }
}

/// Fake of every upstream the extractors talk to.
pub fn upstream() -> Router {
    Router::new()
        .route("/graphql", post(leetcode_graphql))
        .route("/u/{user}/", get(leetcode_profile))
        .route("/users/{user}", get(codechef))
        .route("/users/{user}/repos", get(github))
        .route("/rest/hackers/{user}/badges", get(hackerrank))
        .route("/profile/{user}", get(skillrack_official))
        .route("/mirror/{user}", get(skillrack_mirror))
        .route("/api", get(skillrack_api))
}

/// Requests seen by [`counted`].
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// `router` with every incoming request counted.
pub fn counted(router: Router) -> (Router, Hits) {
    let hits = Hits::default();
    let counter = hits.clone();
    let router = router.layer(middleware::from_fn(move |req: Request, next: Next| {
        let counter = counter.clone();
        async move {
            counter.0.fetch_add(1, Ordering::SeqCst);
            next.run(req).await
        }
    }));
    (router, hits)
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

pub fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        leetcode: base.to_owned(),
        codechef: base.to_owned(),
        hackerrank: base.to_owned(),
        github_api: base.to_owned(),
        skillrack_mirror: format!("{base}/mirror"),
    }
}

pub fn scraper(base: &str, configure: impl FnOnce(&mut ScrapeConfig)) -> Scraper {
    let mut config = ScrapeConfig {
        timeout: Duration::from_secs(5),
        pause_min: Duration::ZERO,
        pause_max: Duration::ZERO,
        ..ScrapeConfig::default()
    };
    configure(&mut config);
    Scraper::new(config, endpoints(base)).unwrap()
}
