use std::sync::Arc;

use anyhow::{Result, bail};
use percent_encoding::percent_decode_str;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::error;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::db::DatabaseGateway;
use crate::http::Response;
use crate::routing::Dispatcher;
use crate::session::SessionManager;

const MAX_HEAD_BYTES: usize = 8192;

/// Everything shared across connections.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub db: Arc<DatabaseGateway>,
    pub sessions: Arc<SessionManager>,
    pub cookie_name: String,
}

/// Accept loop: one task per connection, one dispatch cycle per request.
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                error!(error = %e, client = %addr, "connection failed");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> Result<()> {
    let head = read_head(&mut stream).await?;
    let request_line = head.lines().next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");

    if !method.eq_ignore_ascii_case("GET") {
        let mut resp = Response::new();
        resp.set_status(405);
        resp.set_header("Allow", "GET");
        resp.write("<h1>405 - Method not allowed</h1>");
        stream.write_all(&resp.to_bytes()).await?;
        stream.shutdown().await?;
        return Ok(());
    }

    let path = logical_path(target);
    let cookie_id = session_id_from_cookies(&head, &state.cookie_name);
    let session = state.sessions.attach(cookie_id);

    let mut ctx = RequestContext::new(Arc::clone(&state.db), session);
    state.dispatcher.dispatch(&path, &mut ctx);

    // The id may have rotated during dispatch; the cookie catches up here
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.cookie_name,
        ctx.session.id()
    );
    ctx.response.set_header("Set-Cookie", cookie);

    stream.write_all(&ctx.response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_head(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > MAX_HEAD_BYTES {
            bail!("request head too large");
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Extract the logical path from the request target: the `url` query
/// parameter when present, otherwise the bare path. Decoded exactly once.
fn logical_path(target: &str) -> String {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    if let Some(query) = query {
        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if name == "url" {
                return percent_decode_str(value).decode_utf8_lossy().into_owned();
            }
        }
    }

    percent_decode_str(path)
        .decode_utf8_lossy()
        .trim_start_matches('/')
        .to_string()
}

fn session_id_from_cookies(head: &str, cookie_name: &str) -> Option<Uuid> {
    for line in head.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("cookie") {
            continue;
        }
        for cookie in value.split(';') {
            if let Some((n, v)) = cookie.trim().split_once('=') {
                if n == cookie_name {
                    if let Ok(id) = Uuid::parse_str(v) {
                        return Some(id);
                    }
                }
            }
        }
    }
    None
}
