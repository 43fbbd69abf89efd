use log::{debug, info};
use miette::Diagnostic;
pub(crate) use reqwest::Method;
use reqwest::{blocking::Client, header::CONTENT_TYPE};
use serde_json::Value;

/// Who to authenticate as. Authentication only happens when there is a `user`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) user: Option<String>,
    pub(crate) password: Option<String>,
}

impl Credentials {
    /// Fill in a missing password for a known user by calling `prompt`, at most once.
    ///
    /// ## Errors
    /// Whatever `prompt` fails with.
    pub(crate) fn resolve<E>(
        user: Option<String>,
        password: Option<String>,
        prompt: impl FnOnce(&str) -> Result<String, E>,
    ) -> Result<Self, E> {
        let password = match (&user, password) {
            (Some(user), None) => Some(prompt(&format!("Password for {user}:"))?),
            (_, password) => password,
        };
        Ok(Self { user, password })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(&'static str, String)>,
    pub(crate) body: Option<String>,
    pub(crate) credentials: Credentials,
}

impl Request {
    pub(crate) fn new(method: Method, url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            credentials: credentials.clone(),
        }
    }

    #[must_use]
    pub(crate) fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    #[must_use]
    pub(crate) fn json_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    fn is_authenticated(&self) -> bool {
        self.credentials.user.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Response {
    pub(crate) url: String,
    pub(crate) status: u16,
    pub(crate) content_type: Option<String>,
    pub(crate) body: String,
}

impl Response {
    /// Decode the body as JSON.
    ///
    /// ## Errors
    /// If the server didn't say the body is JSON, or it isn't.
    pub(crate) fn json(&self) -> Result<Value, Error> {
        let content_type = self.content_type.as_deref().unwrap_or_default();
        if !content_type.contains("application/json") {
            return Err(Error::ContentType {
                url: self.url.clone(),
                content_type: content_type.to_string(),
            });
        }
        serde_json::from_str(&self.body).map_err(|source| Error::Json {
            url: self.url.clone(),
            source,
        })
    }
}

/// Something that can perform one HTTP exchange. Status codes are not interpreted here.
pub(crate) trait Transport {
    /// ## Errors
    /// When no response could be obtained at all.
    fn send(&self, request: &Request) -> Result<Response, Error>;
}

pub(crate) struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub(crate) fn new() -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("issue2branch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Result<Response, Error> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(user) = &request.credentials.user {
            builder = builder.basic_auth(user, request.credentials.password.as_ref());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let transport_err = |source| Error::Transport {
            url: request.url.clone(),
            source,
        };
        let response = builder.send().map_err(transport_err)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.text().map_err(transport_err)?;
        Ok(Response {
            url: request.url.clone(),
            status,
            content_type,
            body,
        })
    }
}

/// The single way trackers talk to the network during a run.
pub(crate) struct Gateway {
    transport: Box<dyn Transport>,
    warned_plaintext: bool,
}

impl Gateway {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            warned_plaintext: false,
        }
    }

    /// Perform `request`, failing on any status outside `2xx`.
    ///
    /// ## Errors
    /// 1. The transport failed
    /// 2. [`Error::UnexpectedStatus`]
    pub(crate) fn send(&mut self, request: &Request) -> Result<Response, Error> {
        println!("Requesting '{}'", request.url);
        info!("Requesting: {}:{}", request.method, request.url);
        if request.is_authenticated() && request.url.starts_with("http://") {
            self.warn_plaintext();
        }
        let response = self.transport.send(request)?;
        debug!("Response status code: {}", response.status);
        if !(200..300).contains(&response.status) {
            return Err(Error::UnexpectedStatus {
                url: request.url.clone(),
                status: response.status,
                authenticated: request.is_authenticated(),
            });
        }
        Ok(response)
    }

    /// [`Gateway::send`] a request and decode the JSON it answers with.
    pub(crate) fn fetch_json(&mut self, request: &Request) -> Result<Value, Error> {
        self.send(request)?.json()
    }

    fn warn_plaintext(&mut self) {
        debug!("Has already warned about plain http: {}", self.warned_plaintext);
        if self.warned_plaintext {
            return;
        }
        eprintln!("[WARNING] Sending credentials over plain http. Use an https URL to encrypt them.");
        self.warned_plaintext = true;
    }

    #[cfg(test)]
    pub(crate) fn has_warned(&self) -> bool {
        self.warned_plaintext
    }

    /// Forget that any one-time notices were shown.
    #[cfg(test)]
    pub(crate) fn reset_notices(&mut self) {
        self.warned_plaintext = false;
    }
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("Response status code for '{url}' was not 2xx: {status}. Authenticated: {authenticated}")]
    #[diagnostic(
        code(http::unexpected_status),
        help("Check the issue id and your credentials. 401 and 404 often mean the login is wrong.")
    )]
    UnexpectedStatus {
        url: String,
        status: u16,
        authenticated: bool,
    },
    #[error("Could not reach '{url}': {source}")]
    #[diagnostic(code(http::transport), help("Check your network connection."))]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Could not set up an HTTP client: {0}")]
    #[diagnostic(code(http::client))]
    Client(#[source] reqwest::Error),
    #[error("Expected JSON from '{url}' but got content type '{content_type}'")]
    #[diagnostic(
        code(http::content_type),
        help("The URL probably doesn't point at the tracker's API.")
    )]
    ContentType { url: String, content_type: String },
    #[error("Could not decode the JSON returned by '{url}': {source}")]
    #[diagnostic(code(http::json))]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
