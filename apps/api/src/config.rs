use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_TEMPLATE_PATH: &str = "resource/ph_Exit_Interview_Feedback_Form.docx";
const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or invalid.
#[derive(Clone)]
pub struct Config {
    /// HR mailbox; documents are sent from and to this address.
    pub sender_email: String,
    pub sender_password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub mail_timeout: Duration,
    /// Deadline for document generation plus delivery of one submission.
    pub submission_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let output_dir = PathBuf::from(require_env("OUTPUT_DIR")?);
        validate_output_dir(&output_dir)?;

        Ok(Config {
            sender_email: require_env("SENDER_EMAIL")?,
            sender_password: require_env("SENDER_PASSWORD")?,
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: env_or("SMTP_PORT", 587)?,
            template_path: std::env::var("TEMPLATE_PATH")
                .unwrap_or_else(|_| DEFAULT_TEMPLATE_PATH.to_string())
                .into(),
            output_dir,
            mail_timeout: Duration::from_secs(env_or("MAIL_TIMEOUT_SECS", 30)?),
            submission_timeout: Duration::from_secs(env_or("SUBMISSION_TIMEOUT_SECS", 60)?),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sender_email", &self.sender_email)
            .field("sender_password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("template_path", &self.template_path)
            .field("output_dir", &self.output_dir)
            .field("mail_timeout", &self.mail_timeout)
            .field("submission_timeout", &self.submission_timeout)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

/// Filled documents must go to a dedicated directory, never the filesystem root.
pub fn validate_output_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("OUTPUT_DIR must not be empty");
    }
    if path.has_root() && path.parent().is_none() {
        bail!("OUTPUT_DIR must not be the filesystem root");
    }
    if path.exists() && !path.is_dir() {
        bail!("OUTPUT_DIR '{}' exists but is not a directory", path.display());
    }
    Ok(())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Configuration for tests: local SMTP, short deadlines.
#[cfg(test)]
pub fn test_config(template_path: &Path, output_dir: &Path) -> Config {
    Config {
        sender_email: "hr@example.com".to_string(),
        sender_password: "secret".to_string(),
        smtp_host: "localhost".to_string(),
        smtp_port: 587,
        template_path: template_path.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        mail_timeout: Duration::from_secs(5),
        submission_timeout: Duration::from_secs(10),
        port: 0,
        rust_log: "debug".to_string(),
    }
}
