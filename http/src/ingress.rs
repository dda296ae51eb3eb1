//! HTTP ingress: wires hyper requests into flows.
//!
//! `FlowIngress` is a wiring builder, not a web framework: it binds an
//! address, registers flow endpoints and serves them over hyper 1.x.
//! Partial interactions are detected through the `HX-Request` header and
//! answered with concatenated fragments plus `HX-Retarget` /
//! `HX-Redirect` headers; traditional navigations get full pages.
//! `into_raw_service()` is the escape hatch into an existing tower stack.

use crate::routes::RouteTable;
use crate::session::{SessionBackend, SESSION_COOKIE};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use stepflow_core::render::TemplateContext;
use stepflow_core::{Flow, FlowContext, FlowError, FlowRequest, FlowResponse, Renderer};
use tokio::net::TcpListener;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

/// Flow constructor parameterized by the instance prefix taken from the
/// trailing path segment.
type ScopedFactory = Arc<dyn Fn(&str) -> Result<Flow, FlowError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

enum Endpoint {
    Flow(Arc<Flow>),
    Page(String),
}

/// HTTP ingress builder for flow endpoints.
pub struct FlowIngress {
    addr: Option<String>,
    renderer: Arc<dyn Renderer + Send + Sync>,
    routes: RouteTable,
    endpoints: HashMap<String, Endpoint>,
    scoped: Vec<(String, ScopedFactory)>,
    sessions: SessionBackend,
}

impl FlowIngress {
    pub fn new(renderer: impl Renderer + Send + Sync + 'static) -> Self {
        Self {
            addr: None,
            renderer: Arc::new(renderer),
            routes: RouteTable::new(),
            endpoints: HashMap::new(),
            scoped: Vec::new(),
            sessions: SessionBackend::new(),
        }
    }

    /// Set the bind address for the server.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Resolver for the symbolic redirect targets flows carry.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Register a flow under a fixed path.
    pub fn flow(mut self, path: impl Into<String>, flow: Flow) -> Self {
        self.endpoints
            .insert(path.into(), Endpoint::Flow(Arc::new(flow)));
        self
    }

    /// Register a prefixed flow family: the trailing path segment becomes
    /// the flow's instance prefix (`/renovation/scenario1`,
    /// `/renovation/scenario2`, ...).
    pub fn scoped_flow<F>(mut self, base: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Flow, FlowError> + Send + Sync + 'static,
    {
        self.scoped.push((base.into(), Arc::new(factory)));
        self
    }

    /// Register a plain template view.
    pub fn page(mut self, path: impl Into<String>, template: impl Into<String>) -> Self {
        self.endpoints
            .insert(path.into(), Endpoint::Page(template.into()));
        self
    }

    /// Run the server until the task is aborted.
    pub async fn run(self) -> Result<(), IngressError> {
        let addr: SocketAddr = self.addr.as_deref().unwrap_or("127.0.0.1:3000").parse()?;
        let inner = Arc::new(self.into_inner());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("stepflow HTTP ingress listening on http://{addr}");

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let inner = inner.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let inner = inner.clone();
                    async move { Ok::<_, Infallible>(handle(inner, req).await) }
                });
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("error serving connection: {err:?}");
                }
            });
        }
    }

    /// Convert into a raw tower service for integration with an existing
    /// tower stack.
    pub fn into_raw_service(self) -> RawFlowService {
        RawFlowService {
            inner: Arc::new(self.into_inner()),
        }
    }

    fn into_inner(self) -> Inner {
        Inner {
            renderer: self.renderer,
            routes: self.routes,
            endpoints: self.endpoints,
            scoped: self.scoped,
            sessions: self.sessions,
        }
    }
}

struct Inner {
    renderer: Arc<dyn Renderer + Send + Sync>,
    routes: RouteTable,
    endpoints: HashMap<String, Endpoint>,
    scoped: Vec<(String, ScopedFactory)>,
    sessions: SessionBackend,
}

async fn handle(inner: Arc<Inner>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "HTTPRequest",
        stepflow.http.method = %method,
        stepflow.http.path = %path,
        stepflow.http.request_id = %request_id
    );

    async move {
        let partial = is_partial(req.headers());

        // Resolve the endpoint before touching sessions: misses never
        // issue cookies.
        let flow: Arc<Flow> = match inner.endpoints.get(&path) {
            Some(Endpoint::Flow(flow)) => flow.clone(),
            Some(Endpoint::Page(template)) => {
                return match inner.renderer.render(template, &TemplateContext::new()) {
                    Ok(html) => html_response(html),
                    Err(err) => {
                        tracing::error!(error = %err, "page render failed");
                        server_error()
                    }
                };
            }
            None => {
                let scoped = inner.scoped.iter().find_map(|(base, factory)| {
                    scoped_segment(base, &path).map(|segment| (segment, factory))
                });
                match scoped {
                    Some((segment, factory)) => match factory(segment) {
                        Ok(flow) => Arc::new(flow),
                        Err(err) => {
                            tracing::error!(error = %err, "scoped flow construction failed");
                            return server_error();
                        }
                    },
                    None => return not_found(),
                }
            }
        };

        let known = cookie_value(req.headers(), SESSION_COOKIE)
            .filter(|id| inner.sessions.contains(id));
        let (issued, session_id) = match known {
            Some(id) => (false, id),
            None => (true, inner.sessions.issue()),
        };

        let flow_request = if method == Method::POST {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    tracing::error!(error = %err, "failed to read request body");
                    return server_error();
                }
            };
            FlowRequest::post(form_pairs(&body))
        } else {
            FlowRequest::get()
        };
        let flow_request = if partial {
            flow_request.partial()
        } else {
            flow_request
        };

        let mut store = inner.sessions.handle(&session_id);
        let outcome = {
            let mut ctx = FlowContext::new(flow_request, &mut store, &*inner.renderer);
            flow.dispatch(&mut ctx)
        };

        let mut response = match outcome {
            Ok(FlowResponse::Redirect(name)) => {
                let url = inner.routes.resolve(&name);
                if partial {
                    Response::builder()
                        .status(StatusCode::OK)
                        .header("HX-Redirect", url)
                        .body(Full::new(Bytes::new()))
                        .unwrap()
                } else {
                    Response::builder()
                        .status(StatusCode::SEE_OTHER)
                        .header(LOCATION, url)
                        .body(Full::new(Bytes::new()))
                        .unwrap()
                }
            }
            Ok(FlowResponse::Partial { html, retarget }) => {
                let mut builder = Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "text/html; charset=utf-8");
                if let Some(target) = retarget {
                    builder = builder.header("HX-Retarget", format!("#{target}"));
                }
                builder.body(Full::new(Bytes::from(html))).unwrap()
            }
            Ok(FlowResponse::Page { html }) => html_response(html),
            Err(err) => {
                tracing::error!(flow = %flow.name(), error = %err, "flow dispatch failed");
                server_error()
            }
        };

        if issued {
            let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(SET_COOKIE, value);
            }
        }
        response
    }
    .instrument(span)
    .await
}

fn is_partial(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|value| value.as_bytes() == b"true")
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn form_pairs(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// Trailing path segment under `base`, if `path` is exactly one segment
/// below it.
fn scoped_segment<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?.strip_prefix('/')?;
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

fn html_response(html: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(html)))
        .unwrap()
}

fn not_found() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(Bytes::from("Not Found")))
        .unwrap()
}

fn server_error() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Full::new(Bytes::from("Internal Server Error")))
        .unwrap()
}

/// Raw tower service over the same endpoints, for existing tower stacks.
#[derive(Clone)]
pub struct RawFlowService {
    inner: Arc<Inner>,
}

impl Service<Request<Incoming>> for RawFlowService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(handle(inner, req).await) })
    }
}
