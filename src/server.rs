//! Background static file server for the page under test.
//!
//! Binds the port synchronously in the caller so a port-in-use failure is
//! fatal and immediate, then serves requests on a dedicated thread until the
//! handle is dropped. The listener is created with `SO_REUSEADDR` so a prior
//! ungraceful exit cannot block a subsequent run from binding the same port.

use crate::{Error, Result};
use log::debug;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::Cursor;
use std::net::{SocketAddr, TcpListener};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tiny_http::{Header, Response, Server};

/// A static file server running on a background thread.
///
/// Dropping the handle unblocks the accept loop and joins the thread, so
/// shutdown is guaranteed on every exit path.
pub struct StaticServer {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
    port: u16,
}

impl StaticServer {
    /// Bind `port` on all interfaces and start serving files under `root`.
    pub fn bind(port: u16, root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| Error::Server(format!("serve root {:?} is not usable: {}", root, e)))?;

        let listener = reuse_addr_listener(port)
            .map_err(|e| Error::Server(format!("failed to bind port {}: {}", port, e)))?;

        let server = Server::from_listener(listener, None)
            .map_err(|e| Error::Server(format!("failed to start server: {}", e)))?;
        let server = Arc::new(server);

        let accept = Arc::clone(&server);
        let thread = std::thread::spawn(move || {
            for request in accept.incoming_requests() {
                debug!("{} {}", request.method(), request.url());
                let response = respond_to(&root, request.url());
                let _ = request.respond(response);
            }
            debug!("server accept loop exited");
        });

        Ok(Self {
            server,
            thread: Some(thread),
            port,
        })
    }

    /// Root URL of the running server
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Build a listening socket with `SO_REUSEADDR` set before binding.
fn reuse_addr_listener(port: u16) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(socket.into())
}

/// Map a request URL to a response: `/` serves `index.html`, everything else
/// is resolved relative to the serve root. Missing files and any path that
/// tries to escape the root yield 404.
fn respond_to(root: &Path, url: &str) -> Response<Cursor<Vec<u8>>> {
    let path = url.split('?').next().unwrap_or(url);
    let rel = match sanitize(path) {
        Some(rel) => rel,
        None => return not_found(),
    };

    let file = root.join(&rel);
    match std::fs::read(&file) {
        Ok(bytes) => {
            let mut response = Response::from_data(bytes);
            if let Some(header) = content_type_header(&rel) {
                response = response.with_header(header);
            }
            response
        }
        Err(_) => not_found(),
    }
}

/// Turn a URL path into a relative filesystem path, rejecting anything that
/// could climb out of the serve root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let rel = if trimmed.is_empty() {
        PathBuf::from("index.html")
    } else {
        PathBuf::from(trimmed)
    };

    for component in rel.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(rel)
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(404)
}

fn content_type_header(path: &Path) -> Option<Header> {
    let mime = content_type_for(path);
    Header::from_bytes(&b"Content-Type"[..], mime.as_bytes()).ok()
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
