//! Kennwort async client implementation.
//!
//! This module provides an async [`Client`] and [`ClientBuilder`] for the Kennwort
//! transactional email API.
//!
//! Every operation is one HTTP exchange:
//! 1) build the URL from the base URL and the endpoint path,
//! 2) attach the `Authorization: Bearer <token>` header plus form or query parameters,
//! 3) send it and decode the body as JSON, whatever the status code.

use crate::{Error, Page, Recipient, Result};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Async client for the Kennwort transactional email API.
///
/// The underlying `reqwest::Client` is a shared connection pool and this type is `Clone`;
/// create it once and clone as needed.
///
/// Responses are returned as raw [`serde_json::Value`]s. The client does not look at the
/// status code: an error payload from the service comes back as a normal `Ok` value, and
/// only transport failures and non-JSON bodies become errors.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    auth_header: HeaderValue,
    user_agent: HeaderValue,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("http", &"<reqwest::Client>")
            .field("auth_header", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Client {
    /// Create a [`ClientBuilder`] for the given API token.
    ///
    /// Use this when you need a proxy, a timeout, a different base URL, or your own
    /// `reqwest::Client`.
    ///
    /// # Examples
    /// ```no_run
    /// # use kennwort_client::Client;
    /// # fn main() -> Result<(), kennwort_client::Error> {
    /// let client = Client::builder("my-token")
    ///     .timeout(std::time::Duration::from_secs(10))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Create a client with default settings.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `token` is empty or cannot be sent as a header value.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(token).build()
    }

    /// Base URL every endpoint path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an email rendered from a template configured in the Kennwort dashboard.
    ///
    /// # Arguments
    /// * `template` - Template key.
    /// * `recipient` - Addressee; see [`Recipient`] for accepted forms.
    /// * `params` - Variables for the template subject and body. Sent JSON-encoded in a
    ///   single `params` form field. Pass `&serde_json::json!({})` when there are none.
    ///
    /// # Errors
    /// Returns [`Error::Params`] if `params` cannot be encoded, [`Error::Transport`] if
    /// the request fails, or [`Error::Decode`] if the response is not JSON.
    ///
    /// # Examples
    /// ```no_run
    /// # use kennwort_client::Client;
    /// # use serde_json::json;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kennwort_client::Error> {
    /// let client = Client::new("my-token")?;
    /// let response = client
    ///     .send_template_email("welcome", ("anna@example.com", "Anna"), &json!({ "code": 1234 }))
    ///     .await?;
    /// println!("{response}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_template_email<P>(
        &self,
        template: &str,
        recipient: impl Into<Recipient>,
        params: &P,
    ) -> Result<serde_json::Value>
    where
        P: Serialize + ?Sized,
    {
        let recipient = recipient.into();
        let params = serde_json::to_string(params).map_err(Error::Params)?;

        let mut form = vec![("template", Cow::Borrowed(template))];
        form.extend(Self::recipient_params(&recipient));
        form.push(("params", Cow::Owned(params)));

        let url = self.url("emails/send", &[]);
        self.request_json(Method::POST, &url, None, Some(form.as_slice()))
            .await
    }

    /// Send an email whose subject and HTML body are produced by the caller.
    ///
    /// # Arguments
    /// * `sender_id` - Sender identity id from the Kennwort dashboard.
    /// * `recipient` - Addressee; see [`Recipient`] for accepted forms.
    /// * `subject` - Subject line.
    /// * `body` - HTML body.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the request fails, or [`Error::Decode`] if the
    /// response is not JSON.
    pub async fn send_raw_email(
        &self,
        sender_id: &str,
        recipient: impl Into<Recipient>,
        subject: &str,
        body: &str,
    ) -> Result<serde_json::Value> {
        let recipient = recipient.into();

        let mut form: Vec<Param<'_>> = Self::recipient_params(&recipient).collect();
        form.push(("senderId", Cow::Borrowed(sender_id)));
        form.push(("subject", Cow::Borrowed(subject)));
        form.push(("body", Cow::Borrowed(body)));

        let url = self.url("emails/send-body", &[]);
        self.request_json(Method::POST, &url, None, Some(form.as_slice()))
            .await
    }

    /// Fetch the delivery status of a sent email.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the request fails, or [`Error::Decode`] if the
    /// response is not JSON.
    pub async fn get_email_status(&self, id: &str) -> Result<serde_json::Value> {
        let url = self.url("emails/{id}", &[("{id}", id)]);
        self.request_json(Method::GET, &url, None, None).await
    }

    /// List sender identities, one page at a time.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the request fails, or [`Error::Decode`] if the
    /// response is not JSON.
    ///
    /// # Examples
    /// ```no_run
    /// # use kennwort_client::{Client, Page};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kennwort_client::Error> {
    /// let client = Client::new("my-token")?;
    /// let senders = client.list_senders(Page::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_senders(&self, page: Page) -> Result<serde_json::Value> {
        let url = self.url("senders", &[]);
        self.request_json(Method::GET, &url, Some(page), None).await
    }

    /// List transactional templates, one page at a time.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the request fails, or [`Error::Decode`] if the
    /// response is not JSON.
    pub async fn list_templates(&self, page: Page) -> Result<serde_json::Value> {
        let url = self.url("transaction-templates", &[]);
        self.request_json(Method::GET, &url, Some(page), None).await
    }

    async fn request_json(
        &self,
        method: Method,
        url: &str,
        query: Option<Page>,
        form: Option<&[Param<'_>]>,
    ) -> Result<serde_json::Value> {
        tracing::debug!(
            method = %method,
            url = %url,
            query = ?query,
            fields = ?form.map(Self::field_names),
            "sending Kennwort API request"
        );

        let mut request = self.http.request(method, url).headers(self.headers());
        if let Some(page) = query {
            request = request.query(&page);
        }
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "received Kennwort API response"
        );
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                url = %url,
                "Kennwort API returned a non-success status"
            );
        }

        Self::decode(&body)
    }

    /// Append `path` to the base URL, then replace each placeholder literally.
    ///
    /// Replacement runs over the whole URL in order, so a value that itself contains a
    /// later placeholder token gets substituted again.
    fn url(&self, path: &str, replacements: &[(&str, &str)]) -> String {
        replacements.iter().fold(
            format!("{}{}", self.base_url, path),
            |url, (placeholder, value)| url.replace(placeholder, value),
        )
    }

    fn recipient_params(recipient: &Recipient) -> impl Iterator<Item = Param<'_>> {
        recipient
            .form_fields()
            .into_iter()
            .map(|(key, value)| -> Param<'_> { (key, Cow::Borrowed(value)) })
    }

    fn field_names<'a>(form: &'a [Param<'_>]) -> Vec<&'a str> {
        form.iter().map(|(key, _)| *key).collect()
    }

    fn decode(body: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(body).map_err(|source| Error::Decode {
            source,
            snippet: String::from_utf8_lossy(body).chars().take(200).collect(),
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers
    }
}

const BASE_URL: &str = "https://api.kennwort.ru/v1/";
const USER_AGENT_VALUE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

type Param<'a> = (&'a str, Cow<'a, str>);

/// Builder for configuring a Kennwort [`Client`].
///
/// Start with [`Client::builder`], then call [`ClientBuilder::build`].
///
/// # Defaults
/// - The production base URL `https://api.kennwort.ru/v1/`
/// - TLS certificates are verified (`danger_accept_invalid_certs = false`)
/// - No proxy
/// - Reqwest default timeout (none)
/// - User agent `kennwort-client/<version>`
#[derive(Clone)]
pub struct ClientBuilder {
    token: String,
    base_url: String,
    danger_accept_invalid_certs: bool,
    proxy: Option<String>,
    timeout: Option<Duration>,
    user_agent: String,
    http: Option<reqwest::Client>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("danger_accept_invalid_certs", &self.danger_accept_invalid_certs)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("http", &self.http.as_ref().map(|_| "<reqwest::Client>"))
            .finish()
    }
}

impl ClientBuilder {
    /// Create a new builder for `token` with default settings.
    ///
    /// See [`ClientBuilder`] for the list of defaults. The token is checked in
    /// [`ClientBuilder::build`].
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: BASE_URL.to_string(),
            danger_accept_invalid_certs: false,
            proxy: None,
            timeout: None,
            user_agent: USER_AGENT_VALUE.to_string(),
            http: None,
        }
    }

    /// Override the API base URL.
    ///
    /// Endpoint paths are appended to it; a missing trailing `/` is added.
    /// This is primarily useful for testing.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Configure whether to accept invalid TLS certificates (default: `false`).
    ///
    /// # Security
    /// Turning this on disables server authentication: anyone on the network path can
    /// read the API token and forge responses. Only use it against test servers.
    pub fn danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.danger_accept_invalid_certs = value;
        self
    }

    /// Set a proxy URL (e.g. `"http://127.0.0.1:8080"` or `"socks5://127.0.0.1:1080"`).
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set a request timeout applied to every operation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use an existing `reqwest::Client` instead of building one.
    ///
    /// TLS, proxy and timeout settings on this builder are then ignored.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the [`Client`].
    ///
    /// No network request is made here.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if:
    /// - the token is empty,
    /// - the token or user agent is not a valid header value,
    /// - the proxy URL is invalid or the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        if self.token.is_empty() {
            return Err(Error::Config(
                "API token is empty, check your TOKEN".to_string(),
            ));
        }

        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::Config("API token is not a valid header value".to_string()))?;
        auth_header.set_sensitive(true);

        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|_| Error::Config("user agent is not a valid header value".to_string()))?;

        let http = match self.http {
            Some(http) => http,
            None => {
                if self.danger_accept_invalid_certs {
                    tracing::warn!("TLS certificate verification is disabled");
                }

                let mut builder = reqwest::Client::builder()
                    .danger_accept_invalid_certs(self.danger_accept_invalid_certs);

                if let Some(proxy_url) = &self.proxy {
                    let proxy = reqwest::Proxy::all(proxy_url)
                        .map_err(|e| Error::Config(format!("invalid proxy URL: {e}")))?;
                    builder = builder.proxy(proxy);
                }

                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }

                builder
                    .build()
                    .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?
            }
        };

        let mut base_url = self.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Client {
            http,
            auth_header,
            user_agent,
            base_url,
        })
    }
}

#[cfg(test)]
impl Client {
    fn new_for_tests(base_url: String) -> Self {
        ClientBuilder::new("test-token")
            .base_url(base_url)
            .build()
            .expect("test client build failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn empty_token_is_a_config_error() {
        let result = Client::new("");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn token_with_newline_is_a_config_error() {
        let result = Client::new("abc\ndef");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = Client::new("secret-token").unwrap();
        let builder = Client::builder("secret-token");

        assert!(!format!("{client:?}").contains("secret-token"));
        assert!(!format!("{builder:?}").contains("secret-token"));
    }

    #[test]
    fn builder_defaults_verify_certificates() {
        let builder = ClientBuilder::new("t");
        assert!(!builder.danger_accept_invalid_certs);
        assert_eq!(builder.base_url, "https://api.kennwort.ru/v1/");
    }

    #[test]
    fn url_replaces_placeholder_and_appends_missing_slash() {
        let client = Client::new_for_tests("http://localhost:8080/v1".to_string());

        let url = client.url("emails/{id}", &[("{id}", "42")]);

        assert_eq!(url, "http://localhost:8080/v1/emails/42");
        assert!(!url.contains("{id}"));
    }

    #[tokio::test]
    async fn get_email_status_substitutes_id_and_sends_bearer_token() {
        let server = MockServer::start();

        let status_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/emails/42")
                .header("Authorization", "Bearer test-token");
            then.status(200).json_body(json!({ "id": 42, "status": "delivered" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client.get_email_status("42").await.unwrap();

        assert_eq!(response["status"], "delivered");
        status_mock.assert();
    }

    #[tokio::test]
    async fn list_senders_sends_page_query() {
        let server = MockServer::start();

        let senders_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/senders")
                .query_param("page", "2")
                .query_param("per-page", "10");
            then.status(200).json_body(json!([{ "id": 1, "email": "noreply@example.com" }]));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client.list_senders(Page::new(2, 10)).await.unwrap();

        assert_eq!(response[0]["id"], 1);
        senders_mock.assert();
    }

    #[tokio::test]
    async fn list_templates_uses_default_page() {
        let server = MockServer::start();

        let templates_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/transaction-templates")
                .query_param("page", "1")
                .query_param("per-page", "50");
            then.status(200).json_body(json!({ "items": [] }));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client.list_templates(Page::default()).await.unwrap();

        assert_eq!(response, json!({ "items": [] }));
        templates_mock.assert();
    }

    #[tokio::test]
    async fn send_template_email_encodes_params_as_json_field() {
        let server = MockServer::start();

        let send_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails/send")
                .header("Authorization", "Bearer test-token")
                .x_www_form_urlencoded_tuple("template", "welcome")
                .x_www_form_urlencoded_tuple("userEmail", "a@b.com")
                .x_www_form_urlencoded_tuple("params", r#"{"x":1}"#);
            then.status(200).json_body(json!({ "id": "abc" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client
            .send_template_email("welcome", "a@b.com", &json!({ "x": 1 }))
            .await
            .unwrap();

        assert_eq!(response["id"], "abc");
        send_mock.assert();
    }

    #[tokio::test]
    async fn send_raw_email_sends_named_recipient_and_content() {
        let server = MockServer::start();

        let send_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails/send-body")
                .x_www_form_urlencoded_tuple("userEmail", "a@b.com")
                .x_www_form_urlencoded_tuple("userName", "Anna")
                .x_www_form_urlencoded_tuple("senderId", "7")
                .x_www_form_urlencoded_tuple("subject", "Hello")
                .x_www_form_urlencoded_tuple("body", "<p>Hi</p>");
            then.status(200).json_body(json!({ "id": "def" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let recipient = [("a@b.com", "Anna"), ("ignored@b.com", "Ignored")];
        let response = client
            .send_raw_email("7", recipient, "Hello", "<p>Hi</p>")
            .await
            .unwrap();

        assert_eq!(response["id"], "def");
        send_mock.assert();
    }

    #[tokio::test]
    async fn error_status_with_json_body_is_returned_as_value() {
        let server = MockServer::start();

        let status_mock = server.mock(|when, then| {
            when.method(GET).path("/emails/1");
            then.status(500).json_body(json!({ "error": "oops" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client.get_email_status("1").await.unwrap();

        assert_eq!(response, json!({ "error": "oops" }));
        status_mock.assert();
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start();

        let _senders = server.mock(|when, then| {
            when.method(GET).path("/senders");
            then.status(200).body("<html>maintenance</html>");
        });

        let client = Client::new_for_tests(server.base_url());
        let result = client.list_senders(Page::default()).await;

        match result {
            Err(Error::Decode { snippet, .. }) => assert!(snippet.contains("maintenance")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let client = Client::new_for_tests("http://127.0.0.1:1/".to_string());

        let result = client.get_email_status("1").await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn send_template_email_sends_user_name_and_empty_params() {
        let server = MockServer::start();

        let send_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails/send")
                .x_www_form_urlencoded_tuple("template", "reset")
                .x_www_form_urlencoded_tuple("userEmail", "a@b.com")
                .x_www_form_urlencoded_tuple("userName", "Anna")
                .x_www_form_urlencoded_tuple("params", "{}");
            then.status(200).json_body(json!({ "id": "ghi" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let response = client
            .send_template_email("reset", ("a@b.com", "Anna"), &json!({}))
            .await
            .unwrap();

        assert_eq!(response["id"], "ghi");
        send_mock.assert();
    }

    #[tokio::test]
    async fn unencodable_params_fail_before_sending() {
        let server = MockServer::start();

        let send_mock = server.mock(|when, then| {
            when.method(POST).path("/emails/send");
            then.status(200).json_body(json!({ "id": "never" }));
        });

        let client = Client::new_for_tests(server.base_url());
        let params = HashMap::from([((1, 2), 3)]);
        let result = client.send_template_email("t", "a@b.com", &params).await;

        assert!(matches!(result, Err(Error::Params(_))));
        assert_eq!(send_mock.hits(), 0);
    }

    #[test]
    fn invalid_proxy_url_is_a_config_error() {
        let result = Client::builder("t").proxy("http://[invalid").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn injected_http_client_still_sends_auth_header() {
        let server = MockServer::start();

        let status_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/emails/7")
                .header("Authorization", "Bearer injected-token");
            then.status(200).json_body(json!({ "id": 7 }));
        });

        let client = Client::builder("injected-token")
            .base_url(server.base_url())
            .http_client(reqwest::Client::new())
            .build()
            .unwrap();
        let response = client.get_email_status("7").await.unwrap();

        assert_eq!(response["id"], 7);
        status_mock.assert();
    }

    #[tokio::test]
    async fn custom_user_agent_is_sent() {
        let server = MockServer::start();

        let senders_mock = server.mock(|when, then| {
            when.method(GET).path("/senders").header("user-agent", "x/1");
            then.status(200).json_body(json!([]));
        });

        let client = Client::builder("t")
            .base_url(server.base_url())
            .user_agent("x/1")
            .build()
            .unwrap();
        client.list_senders(Page::default()).await.unwrap();

        senders_mock.assert();
    }

    #[tokio::test]
    async fn timeout_surfaces_as_transport_error() {
        let server = MockServer::start();

        let _slow = server.mock(|when, then| {
            when.method(GET).path("/emails/1");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({ "id": 1 }));
        });

        let client = Client::builder("t")
            .base_url(server.base_url())
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let result = client.get_email_status("1").await;

        match result {
            Err(Error::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
