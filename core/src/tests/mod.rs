use std::{
    net::TcpListener,
    path::PathBuf,
    thread::{self, JoinHandle},
};

use tempfile::TempDir;
use tiny_http::{Response, Server};

use crate::instance::{Instance, Workspace, WorkspaceId};

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

pub struct TestServer {
    pub address: String,
    handle: JoinHandle<Vec<ReceivedRequest>>,
}

impl TestServer {
    /// Wait the expected requests count and return them
    pub fn requests(self) -> Vec<ReceivedRequest> {
        self.handle.join().unwrap()
    }
}

/// Serve `count` requests on loopback, answering with given (status, body)
pub fn serve<F>(count: usize, respond: F) -> TestServer
where
    F: Fn(&ReceivedRequest) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let handle = thread::spawn(move || {
        let mut received = vec![];
        for _ in 0..count {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let received_request = ReceivedRequest {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body,
            };
            let (status_code, response_body) = respond(&received_request);
            request
                .respond(Response::from_string(response_body).with_status_code(status_code))
                .unwrap();
            received.push(received_request);
        }
        received
    });

    TestServer {
        address: format!("127.0.0.1:{}", port),
        handle,
    }
}

/// Loopback address where nothing listen
pub fn unreachable_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("127.0.0.1:{}", port)
}

pub struct TestConfigFolder {
    _dir: TempDir,
    pub config_file_path: PathBuf,
    pub track_file_path: PathBuf,
}

pub fn config_folder() -> TestConfigFolder {
    let dir = tempfile::tempdir().unwrap();
    let config_file_path = dir.path().join(".trsync.conf");
    let track_file_path = dir.path().join(".trsync.conf.track");
    TestConfigFolder {
        _dir: dir,
        config_file_path,
        track_file_path,
    }
}

pub fn demo_instance() -> Instance {
    Instance::new("demo.example.org", "alice", "secret", false)
}

pub fn demo_workspaces() -> Vec<Workspace> {
    vec![Workspace::new(1, "Café"), Workspace::new(2, "Docs")]
}

pub fn ids(raw: &[i32]) -> Vec<WorkspaceId> {
    raw.iter().map(|id| WorkspaceId(*id)).collect()
}
