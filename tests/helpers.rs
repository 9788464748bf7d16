// Shared test helpers: a scripted transport and a scripted user interface.
//
// Integration tests drive AuthManager against these instead of a network.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use vo_auth::{
    AuthManager, CredentialRequest, HttpRequest, HttpResponse, Redirector, SchemeKind, Transport,
    TransportError, UserInterface, UserPass,
};

/// One canned response.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)] // Used by other test files
impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        self.raw_header(name, value.as_bytes())
    }

    /// Adds a header whose value need not be valid UTF-8.
    pub fn raw_header(mut self, name: &str, value: &[u8]) -> Self {
        self.headers.push((name.to_string(), value.to_vec()));
        self
    }

    pub fn body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    pub fn challenge(self, value: &str) -> Self {
        self.header("www-authenticate", value)
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::status(status).header("location", location)
    }
}

/// What the transport saw for one request.
#[derive(Clone, Debug)]
pub struct Seen {
    pub method: String,
    pub url: String,
    pub headers: HeaderMap,
    pub has_identity: bool,
}

#[allow(dead_code)] // Used by other test files
impl Seen {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Transport answering each URL from its own queue of replies.
///
/// The last reply for a URL is repeated once its queue is down to one.
/// Requests to unscripted URLs fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    seen: Mutex<Vec<Seen>>,
}

#[allow(dead_code)] // Used by other test files
impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_for(&self, url: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|s| s.url == url).collect()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url().to_string();
        self.seen.lock().unwrap().push(Seen {
            method: request.method().to_string(),
            url: url.clone(),
            headers: request.headers().clone(),
            has_identity: request.client_identity().is_some(),
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies.get_mut(&url);
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        let Some(reply) = reply else {
            return Err(TransportError::Request {
                url: request.url().clone(),
                reason: "no scripted reply".to_string(),
            });
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &reply.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_bytes(value).unwrap(),
            );
        }
        Ok(HttpResponse::new(
            request.url().clone(),
            reply.status,
            headers,
            Cursor::new(reply.body),
        ))
    }
}

/// User interface answering from a queue; `None` entries decline.
pub struct ScriptedUi {
    answers: Mutex<VecDeque<Option<UserPass>>>,
    retry: bool,
    asked: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

#[allow(dead_code)] // Used by other test files
impl ScriptedUi {
    pub fn new(answers: Vec<Option<(&str, &str)>>, retry: bool) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|a| a.map(|(u, p)| UserPass::new(u, p)))
                    .collect(),
            ),
            retry,
            asked: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn user(username: &str, password: &str) -> Arc<Self> {
        Self::new(vec![Some((username, password))], false)
    }

    /// Prompts shown so far, as `CredentialRequest` display strings.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl UserInterface for ScriptedUi {
    fn acquire_credentials(&self, request: &CredentialRequest<'_>) -> Option<UserPass> {
        self.asked.lock().unwrap().push(request.to_string());
        self.answers.lock().unwrap().pop_front().flatten()
    }

    fn can_retry(&self) -> bool {
        self.retry
    }

    fn message(&self, lines: &[String]) {
        self.messages.lock().unwrap().extend_from_slice(lines);
    }
}

/// Manager over a scripted transport with the default scheme order.
#[allow(dead_code)] // Used by other test files
pub fn manager(transport: &Arc<ScriptedTransport>, ui: Option<Arc<ScriptedUi>>) -> AuthManager {
    AuthManager::new(
        ui.map(|ui| ui as Arc<dyn UserInterface>),
        SchemeKind::default_preference(),
        Redirector::default(),
        transport.clone(),
    )
}

#[allow(dead_code)] // Used by other test files
pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}
