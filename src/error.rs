use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Environment variable fetching error: {0}")]
    EnvVar(#[from] dotenvy::Error),
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("SMTP error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("Email message error: {0}")]
    EmailMessage(#[from] lettre::error::Error),
    #[error("Email delivery error: {0}")]
    Delivery(String),
    #[error("Email address error: {0}")]
    EmailAddress(#[from] lettre::address::AddressError),
    #[error("HTML selector error: {0}")]
    Selector(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
