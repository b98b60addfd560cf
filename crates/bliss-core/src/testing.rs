//! In-process HTTP stub used by the fetcher, cache and resolver tests.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

#[derive(Clone)]
pub(crate) struct Route {
    path: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl Route {
    pub(crate) fn new(path: &str, status: u16, body: &str) -> Self {
        Self {
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub(crate) fn ok(path: &str, body: &str) -> Self {
        Self::new(path, 200, body)
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct Shared {
    routes: HashMap<String, Route>,
    user_agents: Vec<String>,
    hits: Vec<String>,
}

pub(crate) struct StubServer {
    addr: SocketAddr,
    shared: Arc<Mutex<Shared>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub(crate) async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Mutex::new(Shared::default()));
        for route in routes {
            shared
                .lock()
                .unwrap()
                .routes
                .insert(route.path.clone(), route);
        }
        let accept_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = Arc::clone(&accept_shared);
                tokio::spawn(serve_one(stream, shared));
            }
        });
        Self { addr, shared, task }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub(crate) fn set_route(&self, route: Route) {
        self.shared
            .lock()
            .unwrap()
            .routes
            .insert(route.path.clone(), route);
    }

    pub(crate) fn user_agents(&self) -> Vec<String> {
        self.shared.lock().unwrap().user_agents.clone()
    }

    pub(crate) fn hits(&self, path: &str) -> usize {
        self.shared
            .lock()
            .unwrap()
            .hits
            .iter()
            .filter(|hit| hit.as_str() == path)
            .count()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_one(mut stream: TcpStream, shared: Arc<Mutex<Shared>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    let head = String::from_utf8_lossy(&buf).into_owned();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let user_agent = head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case("user-agent")
            .then(|| value.trim().to_string())
    });

    let route = {
        let mut guard = shared.lock().unwrap();
        guard.hits.push(path.clone());
        if let Some(agent) = user_agent {
            guard.user_agents.push(agent);
        }
        guard.routes.get(&path).cloned()
    };
    let route = route.unwrap_or_else(|| Route::new(&path, 404, "not found"));
    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }
    let response = format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        route.body.len(),
        route.body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
