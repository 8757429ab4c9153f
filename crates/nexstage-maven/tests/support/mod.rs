//! A canned-response HTTP server for exercising the staging client.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use semver::Version;

use nexstage_maven::client::NexusClient;
use nexstage_maven::connection::ServerStatus;
use nexstage_maven::repository::NexusLayout;
use nexstage_maven::service::Capabilities;
use nexstage_maven::wait::WaitPolicy;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub body: String,
}

impl Received {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }
}

#[derive(Clone)]
struct Route {
    method: &'static str,
    path: String,
    status: u16,
    body: String,
}

#[derive(Default)]
pub struct StubServer {
    routes: Vec<Route>,
}

impl StubServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` on `/service/local/{resource}` with `status` and `body`.
    pub fn route(mut self, method: &'static str, resource: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            path: format!("/service/local/{resource}"),
            status,
            body: body.to_string(),
        });
        self
    }

    /// Serve in the background; unknown routes answer 404.
    pub fn start(self) -> RunningStub {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let routes = self.routes;
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let request = read_request(&stream);
                let route = routes
                    .iter()
                    .find(|r| r.method == request.method && r.path == request.path());
                log.lock().unwrap().push(request);
                let (status, body) = match route {
                    Some(r) => (r.status, r.body.clone()),
                    None => (404, r#"{"errors":[{"id":"*","msg":"not found"}]}"#.to_string()),
                };
                respond(stream, status, &body);
            }
        });
        RunningStub { base, received }
    }
}

pub struct RunningStub {
    pub base: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl RunningStub {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, resource: &str) -> Vec<Received> {
        let path = format!("/service/local/{resource}");
        self.received()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }

    /// A client for this server, as `connect` would build it for a Nexus 2
    /// with or without extended release.
    pub fn client(&self, extended_release: bool) -> NexusClient {
        NexusClient::new(
            Client::new(),
            NexusLayout::new(&self.base),
            None,
            ServerStatus {
                version: Version::new(2, 14, 20),
                raw_version: "2.14.20-02".to_string(),
                edition: "OSS".to_string(),
            },
            Capabilities { extended_release },
            WaitPolicy {
                pause: Duration::from_millis(10),
                timeout: Duration::from_secs(5),
            },
        )
    }
}

fn read_request(stream: &TcpStream) -> Received {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    Received {
        method,
        target,
        body: String::from_utf8(body).unwrap(),
    }
}

fn respond(mut stream: TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).unwrap();
    stream.flush().unwrap();
}

/// A repository resource body.
pub fn repository(id: &str, state: &str) -> String {
    format!(
        r#"{{"data":{{"repositoryId":"{id}","profileId":"p1","profileName":"Example","type":"{state}","transitioning":false}}}}"#
    )
}

/// An activity log whose latest `activity` recorded one failed rule.
pub fn failed_rule(activity: &str, rule: &str, message: &str) -> String {
    format!(
        r#"{{"data":[{{"name":"open","events":[]}},{{"name":"{activity}","events":[{{"name":"ruleFailed","properties":[{{"name":"typeId","value":"{rule}"}},{{"name":"failureMessage","value":"{message}"}}]}}]}}]}}"#
    )
}
