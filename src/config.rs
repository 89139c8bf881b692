//! Run configuration.
//!
//! Every setting is resolved from the command line first, then the YAML
//! file, then the built-in default. The result is immutable for the run.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "ojala.yml";
pub const PASSWORD_ENV_VAR: &str = "OJALA_EMAIL_PASSWORD";

const DEFAULT_CONNECT_TIMEOUT_S: f64 = 5.0;
const DEFAULT_POLL_INTERVAL_S: f64 = 5.0;
const DEFAULT_SOUND_ENABLED: bool = true;
const DEFAULT_MESSAGE_ENABLED: bool = true;
const DEFAULT_EMAIL_ENABLED: bool = false;
const DEFAULT_EMAIL_TIMEOUT_S: f64 = 5.0;

/// Command line arguments. Everything is optional so that unset flags fall
/// through to the file.
#[derive(Debug, Default, Parser)]
#[command(name = "ojala", version)]
#[command(
    about = "Notifies you as soon as the cita previa website is back online, so you can be one of the first to get your cita"
)]
pub struct Args {
    /// Path to the YAML configuration file [default: ojala.yml]
    #[arg(short = 'C', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The connect timeout in seconds [default: 5]
    #[arg(short, long, value_name = "SECONDS")]
    pub connect_timeout: Option<f64>,

    /// The read timeout in seconds [default: unlimited]
    #[arg(short, long, value_name = "SECONDS")]
    pub read_timeout: Option<f64>,

    /// Pause between two polls, in seconds [default: 5]
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<f64>,

    /// Disable the sound
    #[arg(long)]
    pub no_sound: bool,

    /// Disable the output on the terminal
    #[arg(long)]
    pub no_message: bool,

    /// Comma-separated recipients to notify of a change
    #[arg(long, value_name = "ADDRESSES")]
    pub email_recipients: Option<String>,

    /// The SMTP server host
    #[arg(long, value_name = "HOST")]
    pub email_host: Option<String>,

    /// The SMTP server port
    #[arg(long, value_name = "PORT")]
    pub email_port: Option<u16>,

    /// The username to log in to the SMTP server
    #[arg(long, value_name = "USERNAME")]
    pub email_username: Option<String>,

    /// The password to log in to the SMTP server
    #[arg(long, value_name = "PASSWORD")]
    pub email_password: Option<String>,

    /// The "From" field of the email [default: the username]
    #[arg(long, value_name = "ADDRESS")]
    pub email_from_email: Option<String>,

    /// The email sending timeout in seconds [default: 5]
    #[arg(long, value_name = "SECONDS")]
    pub email_timeout: Option<f64>,

    /// Verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Debug mode
    #[arg(short, long)]
    pub debug: bool,
}

/// Layout of `ojala.yml`.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub request: RequestSection,
    pub notifications: NotificationsSection,
    pub verbose: Option<bool>,
    pub debug: Option<bool>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RequestSection {
    pub connect_timeout_s: Option<f64>,
    pub read_timeout_s: Option<f64>,
    pub poll_interval_s: Option<f64>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationsSection {
    pub sound: ToggleSection,
    pub message: ToggleSection,
    pub email: EmailSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToggleSection {
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EmailSection {
    pub enabled: Option<bool>,
    pub recipients: Option<Recipients>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: Option<String>,
    pub timeout_s: Option<f64>,
}

/// Recipients may be written as one comma-separated string or as a list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Recipients {
    Joined(String),
    List(Vec<String>),
}

impl Recipients {
    pub fn into_list(self) -> Vec<String> {
        let entries = match self {
            Recipients::Joined(joined) => joined.split(',').map(str::to_string).collect(),
            Recipients::List(list) => list,
        };
        entries
            .into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    }
}

impl FileConfig {
    /// # Errors
    ///
    /// Fails on unreadable files and invalid YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// # Errors
    ///
    /// Fails on invalid YAML or unknown keys.
    pub fn parse(content: &str) -> Result<FileConfig> {
        // An empty document is not a mapping, but it means "nothing set"
        if content.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// SMTP settings, only present when email is enabled.
#[derive(Clone, PartialEq)]
pub struct EmailConfig {
    pub recipients: Vec<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub timeout: Duration,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("recipients", &self.recipients)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The resolved configuration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub connect_timeout: Duration,
    /// `None` waits for the response indefinitely.
    pub read_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub sound_enabled: bool,
    pub message_enabled: bool,
    pub email: Option<EmailConfig>,
    pub verbose: bool,
    pub debug: bool,
}

impl Config {
    /// Loads `file` (if any) and merges it with `args`. Pick the file with
    /// [`locate_file`].
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, when it is not valid YAML, or
    /// when the merged settings are inconsistent.
    pub fn load(args: &Args, file: Option<&Path>) -> Result<Config> {
        let file = match file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Self::resolve(args, file, || dotenvy::var(PASSWORD_ENV_VAR).ok())
    }

    /// Merges command line values over file values over defaults.
    ///
    /// `env_password` is only consulted when email is enabled and no
    /// password was given explicitly.
    ///
    /// # Errors
    ///
    /// Fails on invalid durations or an incomplete email setup.
    pub fn resolve(
        args: &Args,
        file: FileConfig,
        env_password: impl FnOnce() -> Option<String>,
    ) -> Result<Config> {
        let request = file.request;
        let email = file.notifications.email;

        let connect_timeout = seconds(
            "connect timeout",
            args.connect_timeout
                .or(request.connect_timeout_s)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_S),
        )?;
        let read_timeout = args
            .read_timeout
            .or(request.read_timeout_s)
            .map(|s| seconds("read timeout", s))
            .transpose()?;
        let poll_interval = seconds(
            "poll interval",
            args.poll_interval
                .or(request.poll_interval_s)
                .unwrap_or(DEFAULT_POLL_INTERVAL_S),
        )?;

        let sound_enabled = args
            .no_sound
            .then_some(false)
            .or(file.notifications.sound.enabled)
            .unwrap_or(DEFAULT_SOUND_ENABLED);
        let message_enabled = args
            .no_message
            .then_some(false)
            .or(file.notifications.message.enabled)
            .unwrap_or(DEFAULT_MESSAGE_ENABLED);

        let email = if email.enabled.unwrap_or(DEFAULT_EMAIL_ENABLED) {
            Some(resolve_email(args, email, env_password)?)
        } else {
            None
        };

        Ok(Config {
            connect_timeout,
            read_timeout,
            poll_interval,
            sound_enabled,
            message_enabled,
            email,
            verbose: args.verbose.then_some(true).or(file.verbose).unwrap_or(false),
            debug: args.debug.then_some(true).or(file.debug).unwrap_or(false),
        })
    }

    /// Default `env_logger` filter for this run; `RUST_LOG` still wins.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

fn resolve_email(
    args: &Args,
    file: EmailSection,
    env_password: impl FnOnce() -> Option<String>,
) -> Result<EmailConfig> {
    let missing = |what: &str| Error::Config(format!("email is enabled but no {what} is set"));

    let recipients = args
        .email_recipients
        .clone()
        .map(Recipients::Joined)
        .or(file.recipients)
        .map(Recipients::into_list)
        .unwrap_or_default();
    if recipients.is_empty() {
        return Err(missing("recipient"));
    }

    let host = args
        .email_host
        .clone()
        .or(file.host)
        .ok_or_else(|| missing("host"))?;
    let port = args.email_port.or(file.port).ok_or_else(|| missing("port"))?;
    let username = args
        .email_username
        .clone()
        .or(file.username)
        .ok_or_else(|| missing("username"))?;
    let password = args
        .email_password
        .clone()
        .or(file.password)
        .or_else(env_password)
        .ok_or_else(|| missing("password"))?;
    let from_email = args
        .email_from_email
        .clone()
        .or(file.from_email)
        .unwrap_or_else(|| username.clone());
    let timeout = seconds(
        "email timeout",
        args.email_timeout
            .or(file.timeout_s)
            .unwrap_or(DEFAULT_EMAIL_TIMEOUT_S),
    )?;

    Ok(EmailConfig {
        recipients,
        host,
        port,
        username,
        password,
        from_email,
        timeout,
    })
}

fn seconds(what: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| Error::Config(format!("invalid {what} of {value}s: {e}")))
}

/// The explicit path if given, else `ojala.yml` in the working directory,
/// else the one in the user configuration directory.
pub fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("ojala").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
}
