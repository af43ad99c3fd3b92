//! Command-line interface definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use gateway_client::{Auth, Verb};

use crate::error::Error;

/// Issue HTTP API calls through the gateway, or relay an API over HTTP.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "api-call", version, arg_required_else_help = true)]
pub struct Cli {
    /// Path to the TOML config (falls back to CONFIG_PATH, then ./api-call.toml)
    #[arg(short, long = "config", global = true, value_name = "PATH")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Issue one call and print the result as JSON
    Call(CallArgs),

    /// Serve `GET /relay/{*path}` through the gateway
    Relay,
}

/// One gateway call issued from the command line.
#[derive(Args, Debug, PartialEq)]
pub struct CallArgs {
    /// HTTP method
    #[arg(value_enum, ignore_case = true)]
    pub method: Method,

    /// Address appended to the configured host
    pub address: String,

    /// Send the stored credentials
    #[arg(long)]
    pub auth: bool,

    /// Send this bearer token instead of the stored credentials
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Query parameter, appended without escaping (repeatable)
    #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_query)]
    pub query: Vec<(String, String)>,

    /// JSON request body for POST, PUT and PATCH
    #[arg(long, value_name = "JSON", value_parser = parse_body)]
    pub body: Option<serde_json::Value>,

    /// Print the payload as raw text instead of parsing it as JSON
    #[arg(long)]
    pub text: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Method> for Verb {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Verb::Get,
            Method::Post => Verb::Post,
            Method::Put => Verb::Put,
            Method::Patch => Verb::Patch,
            Method::Delete => Verb::Delete,
        }
    }
}

impl CallArgs {
    pub fn verb(&self) -> Verb {
        self.method.into()
    }

    /// `--token` implies `--auth`.
    pub fn auth(&self) -> Auth {
        let token = self.token.as_deref().unwrap_or("");
        Auth::from_flags(self.auth || self.token.is_some(), token)
    }

    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

fn parse_query(raw: &str) -> Result<(String, String), Error> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| Error::InvalidQuery(raw.to_owned()))
}

fn parse_body(raw: &str) -> Result<serde_json::Value, Error> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    fn parse(line: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("api-call").chain(line.split_whitespace()))
    }

    fn call_args(line: &str) -> CallArgs {
        match parse(line).unwrap().command {
            Command::Call(call) => call,
            Command::Relay => panic!("expected call"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_get_with_query_and_auth() {
        let cli = parse("call get /users --auth --query page=2 --query q=a%20b").unwrap();
        assert_eq!(cli.config_path, None);
        let Command::Call(call) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(call.verb(), Verb::Get);
        assert_eq!(call.address, "/users");
        assert_eq!(call.auth(), Auth::Stored);
        assert_eq!(call.query_pairs(), vec![("page", "2"), ("q", "a%20b")]);
        assert!(!call.text);
    }

    #[test]
    fn method_is_case_insensitive() {
        assert_eq!(call_args("call DELETE /users/7").verb(), Verb::Delete);
        assert_eq!(call_args("call Patch /users/7").verb(), Verb::Patch);
    }

    #[test]
    fn token_implies_auth() {
        let call = call_args("call DELETE /users/7 --token T9");
        assert_eq!(call.auth(), Auth::Token("T9".into()));
    }

    #[test]
    fn no_auth_flag_is_anonymous() {
        let call = call_args(r#"call POST /users --body {"name":"ada"} --text"#);
        assert_eq!(call.auth(), Auth::Anonymous);
        assert_eq!(call.body, Some(serde_json::json!({"name": "ada"})));
        assert!(call.text);
    }

    #[test]
    fn config_flag_anywhere() {
        let cli = parse("relay --config /etc/api-call.toml").unwrap();
        assert_eq!(cli.config_path.as_deref(), Some("/etc/api-call.toml"));
        assert_eq!(cli.command, Command::Relay);

        let cli = parse("-c /etc/api-call.toml call get /x").unwrap();
        assert_eq!(cli.config_path.as_deref(), Some("/etc/api-call.toml"));
    }

    #[test]
    fn rejects_bad_input() {
        let kind = |line: &str| parse(line).unwrap_err().kind();
        assert_eq!(kind("call HEAD /x"), ErrorKind::InvalidValue);
        assert_eq!(kind("call GET /x --query page"), ErrorKind::ValueValidation);
        assert_eq!(kind("call POST /x --body {oops"), ErrorKind::ValueValidation);
        assert_eq!(kind("call GET"), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind("relay extra"), ErrorKind::UnknownArgument);
        assert_eq!(kind("call GET /x --token"), ErrorKind::InvalidValue);
        assert_eq!(
            kind(""),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn query_value_may_contain_equals() {
        assert_eq!(
            parse_query("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_query("=x"), Err(Error::InvalidQuery("=x".into())));
    }
}
