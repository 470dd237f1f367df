//! Test fixtures shared by the unit tests.
//!
//! `StubServer` answers HTTP requests with canned responses in order, one
//! connection per response, and records every request it receives.
//! `fake_tool` writes a shell script standing in for ssh or rsync.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct StubServer {
    pub base_url: String,
    listener: Option<TcpListener>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        Self {
            base_url,
            listener: Some(listener),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn start(responses: Vec<Vec<u8>>) -> Self {
        let mut server = Self::bind().await;
        server.serve(responses);
        server
    }

    /// Answer the next connections with `responses`, in order
    pub fn serve(&mut self, responses: Vec<Vec<u8>>) {
        let listener = self.listener.take().expect("serve called twice");
        let log = Arc::clone(&self.requests);
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Requests received so far, lowercased for header matching
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_lowercase())
            .collect()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Complete response with a body
pub fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        concat!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\n",
            "Content-Length: {}\r\nConnection: close\r\n\r\n"
        ),
        status,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

pub fn json_response(body: &str) -> Vec<u8> {
    http_response("200 OK", body.as_bytes())
}

/// Shell script that appends `<name> <args>` to `log` and exits with `exit_code`
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, log: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\necho \"{} $*\" >> '{}'\nexit {}\n",
        name,
        log.display(),
        exit_code
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Lines written by fake tools, in invocation order
pub fn tool_log(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}
