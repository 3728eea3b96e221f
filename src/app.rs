use crate::commands::{help_text, parse_line, ShellCommand};
use crate::config::{ttl_from_secs, ApiConfig, Config, TOKEN_ENV};
use crate::gateway::{
  ApiError, EnvToken, GatewayClient, GetOptions, OutgoingRequest, ReqwestTransport, ResponseInfo,
};
use color_eyre::Result;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const CLIENT_HEADER: HeaderName = HeaderName::from_static("x-cleandesk-client");
const CLIENT_ID: &str = concat!("cleandesk-cli/", env!("CARGO_PKG_VERSION"));

/// What a command produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Data(Value),
  Message(String),
  Quit,
}

impl Outcome {
  pub fn render(&self) -> Result<String> {
    Ok(match self {
      Outcome::Data(value) => serde_json::to_string_pretty(value)?,
      Outcome::Message(message) => message.clone(),
      Outcome::Quit => String::new(),
    })
  }
}

/// Main application state
pub struct App {
  client: Arc<GatewayClient>,
}

impl App {
  /// Build the gateway client described by `config` and wire up interceptors.
  pub fn new(config: &Config) -> Result<Self> {
    let transport = ReqwestTransport::new(config.api.request_timeout())?;
    let client = GatewayClient::with_transport(
      config.api.base_url.clone(),
      EnvToken::new(TOKEN_ENV),
      Arc::new(transport),
    )
    .with_default_ttl(config.api.cache_ttl()?);

    install_interceptors(&client, &config.api);
    info!(base_url = client.base_url(), "gateway client ready");

    Ok(Self::with_client(client))
  }

  pub fn with_client(client: GatewayClient) -> Self {
    Self {
      client: Arc::new(client),
    }
  }

  /// Run one command against the gateway.
  pub async fn execute(&self, command: ShellCommand) -> Result<Outcome> {
    let outcome = match command {
      ShellCommand::Get {
        endpoint,
        cache,
        ttl_secs,
      } => {
        let options = GetOptions {
          cache,
          ttl: ttl_secs.map(ttl_from_secs).transpose()?,
        };
        Outcome::Data(self.client.get_with(&endpoint, options).await?)
      }
      ShellCommand::Post { endpoint, body } => Outcome::Data(self.client.post(&endpoint, body).await?),
      ShellCommand::Put { endpoint, body } => Outcome::Data(self.client.put(&endpoint, body).await?),
      ShellCommand::Delete { endpoint } => Outcome::Data(self.client.delete(&endpoint).await?),
      ShellCommand::Clear { endpoint } => {
        let removed = self.client.clear_cache(endpoint.as_deref());
        Outcome::Message(format!("Removed {} cached response(s)", removed))
      }
      ShellCommand::Help => Outcome::Message(help_text()),
      ShellCommand::Quit => Outcome::Quit,
    };

    Ok(outcome)
  }

  /// Interactive loop over stdin. All commands share one client, and so one cache.
  pub async fn run_shell(&self) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
      write!(stdout, "cleandesk> ")?;
      stdout.flush()?;

      let Some(line) = lines.next_line().await? else {
        break;
      };

      let command = match parse_line(&line) {
        Ok(Some(command)) => command,
        Ok(None) => continue,
        Err(e) => {
          eprintln!("{}", e);
          continue;
        }
      };

      match self.execute(command).await {
        Ok(Outcome::Quit) => break,
        Ok(outcome) => writeln!(stdout, "{}", outcome.render()?)?,
        Err(e) => eprintln!("Error: {}", e),
      }
    }

    Ok(())
  }
}

/// Register the interceptors the CLI relies on.
fn install_interceptors(client: &GatewayClient, api: &ApiConfig) {
  client.add_request_interceptor(|mut request: OutgoingRequest| async move {
    request
      .options
      .headers
      .insert(CLIENT_HEADER, HeaderValue::from_static(CLIENT_ID));
    request
  });

  if let Some(field) = api.envelope_field.clone() {
    client.add_response_interceptor(move |_info: ResponseInfo, value: Value| {
      let field = field.clone();
      async move { unwrap_envelope(value, &field) }
    });
  }

  client.add_error_interceptor(|error: ApiError| async move {
    warn!(
      endpoint = %error.endpoint,
      kind = ?error.kind,
      status = error.status.map(|s| s.as_u16()),
      "{}",
      error.message
    );

    if error.is_unauthorized() {
      let message = format!("{} (is {} set?)", error.message, TOKEN_ENV);
      error.with_message(message)
    } else {
      error
    }
  });
}

/// Pull `field` out of an object payload; other payloads pass through.
fn unwrap_envelope(value: Value, field: &str) -> Value {
  match value {
    Value::Object(mut map) if map.contains_key(field) => map.remove(field).unwrap_or(Value::Null),
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::testing::{Reply, ScriptedTransport};
  use crate::gateway::NoToken;
  use reqwest::Method;
  use serde_json::json;

  const BASE: &str = "https://api.test";

  fn api_config(envelope_field: Option<&str>) -> ApiConfig {
    ApiConfig {
      base_url: BASE.to_string(),
      cache_ttl_secs: 60,
      request_timeout_secs: None,
      envelope_field: envelope_field.map(String::from),
    }
  }

  fn app(envelope_field: Option<&str>) -> (App, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = GatewayClient::with_transport(BASE, NoToken, transport.clone());
    install_interceptors(&client, &api_config(envelope_field));
    (App::with_client(client), transport)
  }

  fn command(line: &str) -> ShellCommand {
    parse_line(line).expect("parse").expect("non-blank line")
  }

  #[test]
  fn test_unwrap_envelope() {
    assert_eq!(unwrap_envelope(json!({"data": [1]}), "data"), json!([1]));
    assert_eq!(unwrap_envelope(json!({"items": [1]}), "data"), json!({"items": [1]}));
    assert_eq!(unwrap_envelope(json!([1, 2]), "data"), json!([1, 2]));
  }

  #[tokio::test]
  async fn test_shell_session_shares_cache() {
    let (app, transport) = app(None);
    let url = format!("{}/clients", BASE);
    transport
      .reply(Method::GET, &url, Reply::Json(200, json!([{"id": "1", "name": "Ann"}])))
      .reply(
        Method::GET,
        &url,
        Reply::Json(200, json!([{"id": "1", "name": "Ann"}, {"id": "2", "name": "Bob"}])),
      );
    transport.reply(Method::POST, &url, Reply::Json(201, json!({"id": "2", "name": "Bob"})));

    app.execute(command("get /clients")).await.expect("get");
    app.execute(command("get /clients")).await.expect("cached get");
    assert_eq!(transport.call_count(&Method::GET, &url), 1);

    app
      .execute(command(r#"post /clients {"name": "Bob"}"#))
      .await
      .expect("post");
    let listed = app.execute(command("get /clients")).await.expect("get");

    assert_eq!(transport.call_count(&Method::GET, &url), 2);
    match listed {
      Outcome::Data(Value::Array(items)) => assert_eq!(items.len(), 2),
      other => panic!("unexpected outcome: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_clear_reports_removed_entries() {
    let (app, transport) = app(None);
    transport.reply(Method::GET, &format!("{}/staff", BASE), Reply::Json(200, json!([])));

    app.execute(command("get /staff")).await.expect("get");
    let outcome = app.execute(command("clear")).await.expect("clear");
    assert_eq!(outcome, Outcome::Message("Removed 1 cached response(s)".to_string()));

    let outcome = app.execute(command("clear")).await.expect("clear again");
    assert_eq!(outcome, Outcome::Message("Removed 0 cached response(s)".to_string()));
  }

  #[tokio::test]
  async fn test_client_header_is_added() {
    let (app, transport) = app(None);
    transport.reply(Method::GET, &format!("{}/jobs", BASE), Reply::Json(200, json!([])));

    app.execute(command("get /jobs")).await.expect("get");

    let call = &transport.calls()[0];
    assert_eq!(call.headers[&CLIENT_HEADER], CLIENT_ID);
  }

  #[tokio::test]
  async fn test_envelope_is_unwrapped() {
    let (app, transport) = app(Some("data"));
    transport.reply(
      Method::GET,
      &format!("{}/business", BASE),
      Reply::Json(200, json!({"data": {"name": "Sparkle Co"}})),
    );

    let outcome = app.execute(command("get /business")).await.expect("get");
    assert_eq!(outcome, Outcome::Data(json!({"name": "Sparkle Co"})));
  }

  #[tokio::test]
  async fn test_unauthorized_error_mentions_token_variable() {
    let (app, transport) = app(None);
    transport.reply(
      Method::GET,
      &format!("{}/invoices", BASE),
      Reply::Json(401, json!({"message": "Token expired"})),
    );

    let err = app.execute(command("get /invoices")).await.expect_err("should fail");
    let message = err.to_string();
    assert!(message.starts_with("Token expired"));
    assert!(message.contains(TOKEN_ENV));
  }

  #[tokio::test]
  async fn test_out_of_range_ttl_is_rejected_before_sending() {
    let (app, transport) = app(None);
    transport.reply(Method::GET, &format!("{}/staff", BASE), Reply::Json(200, json!([])));

    let err = app
      .execute(command("get /staff --ttl 18446744073709551615"))
      .await
      .expect_err("ttl out of range");
    assert!(err.to_string().contains("out of range"));
    assert!(transport.calls().is_empty());
  }

  #[tokio::test]
  async fn test_help_and_quit() {
    let (app, _) = app(None);
    match app.execute(ShellCommand::Help).await.expect("help") {
      Outcome::Message(text) => assert!(text.contains("delete <endpoint>")),
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(app.execute(ShellCommand::Quit).await.expect("quit"), Outcome::Quit);
  }
}
