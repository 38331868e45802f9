use anyhow::{Context, Result};
use chrono::Duration;
use std::ffi::OsString;
use structopt::StructOpt;
use sweeper_prometheus::gateway::Credentials;

/// Long options that may also be spelled with a single dash, e.g. `-url`
const LONG_OPTIONS: &[&str] = &[
    "url", "timeout", "username", "password", "debug", "help", "version",
];

/// Long options that consume the following argument as their value
const VALUE_OPTIONS: &[&str] = &["url", "timeout", "username", "password"];

#[derive(Debug)]
pub struct Config {
    /// Enables debug logging, unless `RUST_LOG` says otherwise
    pub debug: bool,

    /// The push-gateway's base url.
    /// e.g. "http://pushgateway.monitoring:9091"
    pub url: String,

    /// Groups that haven't been pushed within this window are deleted.
    pub retention: Duration,

    /// Basic-auth credentials; only set when a username was given.
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Loads configuration from arguments, env and dotenv
    pub fn load() -> Result<Config> {
        // Attempts to find a `.env` file to initialize/extend the environment
        dotenv::dotenv().ok();

        // Load the config from arguments, then environment variables
        let env = Environment::from_iter(normalize_args(std::env::args_os()));
        Config::from_environment(env)
    }

    /// Like `load`, but reports bad arguments (and `--help`) as errors instead of exiting
    #[cfg(test)]
    pub fn try_from_args<I>(args: I) -> Result<Config>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let env = Environment::from_iter_safe(normalize_args(args))?;
        Config::from_environment(env)
    }

    fn from_environment(env: Environment) -> Result<Config> {
        let url = env
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::format_err!("URL is required"))?;
        let retention = Duration::try_minutes(env.timeout).context("invalid timeout")?;
        let credentials = if env.username.is_empty() {
            None
        } else {
            Some(Credentials {
                username: env.username,
                password: env.password,
            })
        };
        Ok(Config {
            debug: env.debug,
            url,
            retention,
            credentials,
        })
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "pushgateway-sweeper")]
struct Environment {
    /// Enables debug logging
    #[structopt(short, long)]
    debug: bool,

    /// The URL of the pushgateway
    #[structopt(long, env = "PUSHGATEWAY_URL", allow_hyphen_values = true)]
    url: Option<String>,

    /// Retention period in minutes
    #[structopt(
        long,
        env = "RETENTION_MINUTES",
        default_value = "60",
        allow_hyphen_values = true
    )]
    timeout: i64,

    /// Username to authenticate to the pushgateway
    #[structopt(
        long,
        env = "PUSHGATEWAY_USERNAME",
        default_value = "",
        allow_hyphen_values = true
    )]
    username: String,

    /// Password to authenticate to the pushgateway
    #[structopt(
        long,
        env = "PUSHGATEWAY_PASSWORD",
        default_value = "",
        allow_hyphen_values = true,
        hide_env_values = true
    )]
    password: String,
}

/// Rewrites single-dash long options (`-url x`, `-timeout=5`) to their double-dash form.
///
/// Option values and anything after `--` are passed through untouched.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut expect_value = false;
    let mut passthrough = false;
    for (i, arg) in args.into_iter().map(Into::into).enumerate() {
        if i == 0 || passthrough || expect_value {
            expect_value = false;
            normalized.push(arg);
            continue;
        }
        if arg.to_str() == Some("--") {
            passthrough = true;
            normalized.push(arg);
            continue;
        }
        let flag = match arg.to_str() {
            Some(flag) => flag,
            None => {
                normalized.push(arg);
                continue;
            }
        };
        let name = flag.trim_start_matches('-');
        let (name, has_value) = match name.find('=') {
            Some(eq) => (&name[..eq], true),
            None => (name, false),
        };
        let dashes = flag.len() - flag.trim_start_matches('-').len();
        if (dashes == 1 || dashes == 2) && LONG_OPTIONS.contains(&name) {
            expect_value = !has_value && VALUE_OPTIONS.contains(&name);
            normalized.push(format!("--{}", &flag[dashes..]).into());
        } else {
            normalized.push(arg);
        }
    }
    normalized
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pushgateway-sweeper")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn accepts_single_dash_long_options() {
        let config = Config::try_from_args(args(&[
            "-url",
            "http://localhost:9091",
            "-timeout=15",
            "-username",
            "admin",
            "-password",
            "-secret-",
        ]))
        .unwrap();
        assert_eq!(config.url, "http://localhost:9091");
        assert_eq!(config.retention, Duration::minutes(15));
        assert_eq!(
            config.credentials,
            Some(Credentials {
                username: "admin".into(),
                password: "-secret-".into(),
            })
        );
        assert!(!config.debug);
    }

    #[test]
    fn accepts_double_dash_long_options() {
        let config =
            Config::try_from_args(args(&["--url=http://localhost:9091", "--debug"])).unwrap();
        assert_eq!(config.url, "http://localhost:9091");
        assert_eq!(config.retention, Duration::minutes(60));
        assert_eq!(config.credentials, None);
        assert!(config.debug);
    }

    #[test]
    fn requires_url() {
        let err = Config::try_from_args(args(&["-timeout", "5"])).unwrap_err();
        assert_eq!(err.to_string(), "URL is required");

        let err = Config::try_from_args(args(&["-url", ""])).unwrap_err();
        assert_eq!(err.to_string(), "URL is required");
    }

    #[test]
    fn ignores_password_without_username() {
        let config =
            Config::try_from_args(args(&["-url", "http://gw", "-password", "secret"])).unwrap();
        assert_eq!(config.credentials, None);
    }

    #[test]
    fn accepts_negative_retention() {
        let config = Config::try_from_args(args(&["-url", "http://gw", "-timeout", "-5"])).unwrap();
        assert_eq!(config.retention, Duration::minutes(-5));
    }

    #[test]
    fn rejects_invalid_timeout() {
        assert!(Config::try_from_args(args(&["-url", "http://gw", "-timeout", "soon"])).is_err());
    }

    #[test]
    fn normalizes_only_known_options() {
        let normalized = normalize_args(args(&["-d", "-url", "-timeout", "-x", "--", "-url"]));
        let normalized = normalized
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            normalized,
            vec!["pushgateway-sweeper", "-d", "--url", "-timeout", "-x", "--", "-url"]
        );
    }
}
