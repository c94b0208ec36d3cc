//! Scripted transport shared by the runtime tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

pub(crate) type Scripted = Result<HttpResponse, TransportError>;

type Hook = Box<dyn Fn(usize) + Send + Sync>;

struct Route {
    url_contains: String,
    script: VecDeque<Scripted>,
    calls: usize,
    hook: Option<Hook>,
}

/// Replays canned replies per URL. The last reply of a route repeats.
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn route(self, url_contains: &str, script: Vec<Scripted>) -> Self {
        self.routes.lock().push(Route {
            url_contains: url_contains.to_string(),
            script: script.into(),
            calls: 0,
            hook: None,
        });
        self
    }

    /// Like [`route`](Self::route), running `hook` with the 1-based call number.
    pub(crate) fn route_with_hook(
        self,
        url_contains: &str,
        script: Vec<Scripted>,
        hook: impl Fn(usize) + Send + Sync + 'static,
    ) -> Self {
        self.routes.lock().push(Route {
            url_contains: url_contains.to_string(),
            script: script.into(),
            calls: 0,
            hook: Some(Box::new(hook)),
        });
        self
    }

    pub(crate) fn calls_to(&self, url_contains: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(url_contains))
            .count()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let Some(route) = routes
            .iter_mut()
            .find(|route| request.url.contains(&route.url_contains))
        else {
            return Err(TransportError::Connect(format!("no route for {}", request.url)));
        };

        route.calls += 1;
        if let Some(hook) = &route.hook {
            hook(route.calls);
        }

        let reply = if route.script.len() > 1 {
            route.script.pop_front()
        } else {
            route.script.front().cloned()
        };
        reply.unwrap_or_else(|| Err(TransportError::Connect("script empty".to_string())))
    }
}

pub(crate) fn ollama_reply(text: &str) -> Scripted {
    Ok(HttpResponse::new(
        200,
        serde_json::json!({ "response": text }).to_string(),
    ))
}

pub(crate) fn chat_reply(text: &str) -> Scripted {
    Ok(HttpResponse::new(
        200,
        serde_json::json!({ "choices": [{ "message": { "content": text } }] }).to_string(),
    ))
}

pub(crate) fn status(code: u16) -> Scripted {
    Ok(HttpResponse::new(code, "upstream unavailable"))
}

pub(crate) fn connect_error() -> Scripted {
    Err(TransportError::Connect("connection refused".to_string()))
}

pub(crate) fn timeout() -> Scripted {
    Err(TransportError::Timeout(Duration::from_secs(30)))
}

/// Records the message of every event emitted on the current thread while
/// the guard from [`install`](Self::install) is alive.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<String>>>);

impl CapturedLogs {
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    pub(crate) fn count(&self, message: &str) -> usize {
        self.0.lock().iter().filter(|m| m.as_str() == message).count()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.0.lock().push(message);
        }
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}
