// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: mock API server, scripted prompts, and
//! assertion helpers.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use reqwest::Url;
use tokio::net::TcpListener;

use crate::credential::flow::AuthPrompt;
use crate::error::ApiError;
use crate::prefs::{OAuth2Prefs, Preferences, PrefsStore};

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone)]
struct Route {
    replies: Vec<(u16, String)>,
    content_type: String,
    delay: Option<Duration>,
}

/// Builder for an in-process HTTP server that replays scripted responses
/// per path and records every request it receives.
#[derive(Default)]
pub struct MockApi {
    routes: HashMap<String, Route>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `path` with each `(status, body)` in turn, repeating the last.
    pub fn reply(mut self, path: &str, replies: Vec<(u16, &str)>) -> Self {
        let replies = replies.into_iter().map(|(s, b)| (s, b.to_owned())).collect();
        self.routes.insert(
            path.to_owned(),
            Route { replies, content_type: "application/json".to_owned(), delay: None },
        );
        self
    }

    pub fn content_type(mut self, path: &str, content_type: &str) -> Self {
        if let Some(route) = self.routes.get_mut(path) {
            route.content_type = content_type.to_owned();
        }
        self
    }

    pub fn delay(mut self, path: &str, delay: Duration) -> Self {
        if let Some(route) = self.routes.get_mut(path) {
            route.delay = Some(delay);
        }
        self
    }

    pub async fn serve(self) -> MockServer {
        let log = Arc::new(Mutex::new(Vec::<Recorded>::new()));
        let routes = Arc::new(self.routes);
        let counters: Arc<Mutex<HashMap<String, usize>>> = Arc::default();

        let app_log = Arc::clone(&log);
        let app = Router::new().fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let log = Arc::clone(&app_log);
                let routes = Arc::clone(&routes);
                let counters = Arc::clone(&counters);
                async move {
                    let path = uri.path().to_owned();
                    lock(&log).push(Recorded {
                        method: method.to_string(),
                        path: path.clone(),
                        query: uri.query().map(str::to_owned),
                        authorization: headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_owned),
                        headers,
                        body,
                    });

                    let Some(route) = routes.get(&path).cloned() else {
                        return (
                            StatusCode::NOT_FOUND,
                            [(header::CONTENT_TYPE, "text/plain".to_owned())],
                            format!("no route for {path}"),
                        );
                    };
                    let idx = {
                        let mut counters = lock(&counters);
                        let n = counters.entry(path).or_insert(0);
                        *n += 1;
                        *n - 1
                    };
                    if let Some(delay) = route.delay {
                        tokio::time::sleep(delay).await;
                    }
                    let (status, body) = route
                        .replies
                        .get(idx)
                        .or(route.replies.last())
                        .cloned()
                        .unwrap_or((500, "{}".to_owned()));
                    (
                        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        [(header::CONTENT_TYPE, route.content_type)],
                        body,
                    )
                }
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        MockServer { addr, log }
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Base URL with a trailing slash, ready to be an `api_url`.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self, path: &str) -> usize {
        lock(&self.log).iter().filter(|r| r.path == path).count()
    }

    pub fn requests(&self, path: &str) -> Vec<Recorded> {
        lock(&self.log).iter().filter(|r| r.path == path).cloned().collect()
    }

    pub fn total_hits(&self) -> usize {
        lock(&self.log).len()
    }
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr")
}

/// Preferences with OAuth2 active against `base_url`.
pub fn oauth2_prefs(base_url: &str) -> Preferences {
    let mut prefs = Preferences::new(base_url);
    prefs.auth_type = Some(crate::prefs::AuthType::OAuth2);
    prefs.oauth2 = Some(OAuth2Prefs {
        client_id: "client_id".to_owned(),
        client_secret: "client_secret".to_owned(),
        scopes: vec!["read".to_owned(), "write".to_owned()],
        redirect_uri: "http://localhost:8080/".to_owned(),
        state: None,
        access_token: "stale-token".to_owned(),
        token_path: "token".to_owned(),
        authorize_path: "authorize".to_owned(),
        authorize_params: Vec::new(),
        redirect_timeout: None,
    });
    prefs
}

/// Drop `ESC [ ... m` sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

type Reply = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Stands in for the human at the keyboard.
pub struct ScriptedPrompt {
    reply: Reply,
    browser_works: bool,
    opened: Mutex<Vec<String>>,
    asked: AtomicU32,
}

impl ScriptedPrompt {
    /// Paste back a redirect carrying `code` and whatever state was sent.
    pub fn approving(code: &str) -> Self {
        let code = code.to_owned();
        Self::with(move |auth_url| {
            let state = Url::parse(auth_url)
                .ok()?
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.into_owned())?;
            Some(format!("http://localhost:8080/?code={code}&state={state}"))
        })
    }

    /// Paste back exactly `url`.
    pub fn pasting(url: &str) -> Self {
        let url = url.to_owned();
        Self::with(move |_| Some(url.clone()))
    }

    /// Never answer.
    pub fn silent() -> Self {
        Self::with(|_| None)
    }

    fn with(reply: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            browser_works: true,
            opened: Mutex::new(Vec::new()),
            asked: AtomicU32::new(0),
        }
    }

    /// Browser launch fails, as on a headless box.
    pub fn headless(mut self) -> Self {
        self.browser_works = false;
        self
    }

    pub fn asked(&self) -> u32 {
        self.asked.load(Ordering::Relaxed)
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl AuthPrompt for ScriptedPrompt {
    fn open_browser(&self, url: &str) -> io::Result<()> {
        lock(&self.opened).push(url.to_owned());
        if self.browser_works {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
        }
    }

    fn read_redirect_url<'a>(
        &'a self,
        auth_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>> {
        self.asked.fetch_add(1, Ordering::Relaxed);
        let answer = (self.reply)(auth_url);
        Box::pin(async move {
            match answer {
                Some(url) => Ok(url),
                None => std::future::pending().await,
            }
        })
    }
}

/// Preferences store that keeps every save in memory.
pub struct MemoryStore {
    path: PathBuf,
    initial: Preferences,
    saved: Mutex<Vec<Preferences>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new(initial: Preferences) -> Self {
        Self {
            path: PathBuf::from("memory.yml"),
            initial,
            saved: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Every save fails with a persistence error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn saves(&self) -> Vec<Preferences> {
        lock(&self.saved).clone()
    }
}

impl PrefsStore for MemoryStore {
    fn load(&self) -> Result<Preferences, ApiError> {
        Ok(lock(&self.saved).last().cloned().unwrap_or_else(|| self.initial.clone()))
    }

    fn save(&self, prefs: &Preferences) -> Result<(), ApiError> {
        if self.fail {
            return Err(ApiError::Persistence {
                path: self.path.clone(),
                reason: "disk full".to_owned(),
            });
        }
        lock(&self.saved).push(prefs.clone());
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
