//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! single match over (method, path) after the optional service prefix is
//! stripped; API paths no arm claims fall through to the upstream
//! passthrough.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::engine::Engine;
use crate::routes;
use crate::store::{FileStore, KvStore, MemoryStore, Workspace};
use crate::types::Result;
use crate::upstream::UpstreamClient;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub engine: Arc<Engine>,
    /// Present only when both upstream settings are configured
    pub upstream: Option<Arc<UpstreamClient>>,
}

impl AppState {
    /// Wire the store, engine, and optional upstream client from config
    pub async fn from_args(args: Args) -> Result<Self> {
        let store: Arc<dyn KvStore> = if args.memory_store {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::open(args.workspace_file()).await?)
        };
        let ws = Arc::new(Workspace::new(store));
        let upstream = UpstreamClient::from_args(&args).map(Arc::new);
        let engine = Arc::new(Engine::new(ws, upstream.clone(), &args.account_id));

        Ok(Self {
            args,
            engine,
            upstream,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Understudy listening on {} as node {}",
        state.args.listen, state.args.node_id
    );
    if state.upstream.is_none() {
        info!("No upstream configured; cache misses synthesize and passthrough answers 501");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
pub async fn handle_request<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error>
where
    B: Body<Data = Bytes>,
{
    let method = req.method().clone();
    let raw_path = req.uri().path().to_string();
    let path = strip_service_prefix(&raw_path, &state.args.route_prefix).to_string();

    info!("[{}] {} {}", addr, method, raw_path);

    let engine = &state.engine;
    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Dashboard action channel
        (Method::POST, "/actions") => routes::handle_action_request(engine, req).await,

        // ====================================================================
        // Invitations
        // ====================================================================
        (Method::POST, "/api/v1/users/invite")
        | (Method::POST, "/api/v1/users/invitation")
        | (Method::POST, "/api/v1/users/invitations") => {
            routes::handle_send_invitation(engine, req).await
        }
        (Method::GET, "/api/v1/users/invitations/sent") => {
            routes::handle_sent_invitations(engine).await
        }
        (Method::GET, "/api/v1/users/invitations/received") => {
            routes::handle_received_invitations()
        }

        // ====================================================================
        // Chats and messages
        // ====================================================================
        (Method::POST, "/api/v1/chats") => routes::handle_create_chat(engine, req).await,
        (Method::GET, "/api/v1/chats") => routes::handle_list_chats(engine).await,
        (Method::GET, p) if path_param(p, "/api/v1/chats/", "/messages").is_some() => {
            let chat_id = path_param(p, "/api/v1/chats/", "/messages").unwrap_or("");
            routes::handle_chat_messages(engine, chat_id).await
        }
        (Method::GET, p) if path_param(p, "/api/v1/chats/", "").is_some() => {
            let chat_id = path_param(p, "/api/v1/chats/", "").unwrap_or("");
            routes::handle_get_chat(engine, chat_id).await
        }
        (Method::DELETE, p) if path_param(p, "/api/v1/chats/", "").is_some() => {
            let chat_id = path_param(p, "/api/v1/chats/", "").unwrap_or("");
            routes::handle_delete_chat(engine, chat_id).await
        }
        (Method::POST, "/api/v1/messages") => routes::handle_send_message(engine, req).await,
        (Method::GET, "/api/v1/messages") => {
            routes::handle_recent_messages(engine, state.args.message_page_size).await
        }

        // ====================================================================
        // Posts and engagement
        // ====================================================================
        (Method::POST, "/api/v1/posts") => routes::handle_create_post(engine, req).await,
        (Method::POST, p) if path_param(p, "/api/v1/posts/", "/reaction").is_some() => {
            let post_id = path_param(p, "/api/v1/posts/", "/reaction").unwrap_or("");
            routes::handle_react(engine, post_id, req).await
        }
        (Method::POST, p) if path_param(p, "/api/v1/posts/", "/comment").is_some() => {
            let post_id = path_param(p, "/api/v1/posts/", "/comment").unwrap_or("");
            routes::handle_comment(engine, post_id, req).await
        }
        (Method::GET, p) if path_param(p, "/api/v1/posts/", "").is_some() => {
            let post_id = path_param(p, "/api/v1/posts/", "").unwrap_or("");
            routes::handle_get_post(engine, post_id).await
        }

        // ====================================================================
        // Users and profiles
        // ====================================================================
        (Method::GET, "/api/v1/users/profile") => routes::handle_own_profile(engine),
        (Method::GET, p) if path_param(p, "/api/v1/users/", "/posts").is_some() => {
            let identifier = path_param(p, "/api/v1/users/", "/posts").unwrap_or("");
            routes::handle_user_posts(engine, identifier).await
        }
        (Method::GET, p)
            if path_param(p, "/api/v1/users/", "/profile").is_some()
                || path_param(p, "/api/v1/users/", "").is_some() =>
        {
            let identifier = path_param(p, "/api/v1/users/", "/profile")
                .or_else(|| path_param(p, "/api/v1/users/", ""))
                .unwrap_or("");
            routes::handle_user_profile(engine, identifier).await
        }

        // Accounts the emulation pretends to own
        (Method::GET, "/api/v1/accounts") => routes::handle_accounts(),

        // Everything else under the API surface goes to the upstream
        (_, p) if p.starts_with("/api/") => {
            routes::handle_passthrough(state.upstream.as_deref(), req, p).await
        }

        // Not found
        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Strip the configured service prefix off an inbound path. Both prefixed
/// and bare forms are accepted; a prefix match must end at a segment
/// boundary so "/linkedinfoo" keeps its own routing.
fn strip_service_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() || prefix == "/" {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Single path segment between a fixed prefix and suffix, or None when the
/// remainder is empty or spans segments (those fall through to passthrough)
fn path_param<'a>(path: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    let rest = if suffix.is_empty() {
        rest
    } else {
        rest.strip_suffix(suffix)?
    };
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
