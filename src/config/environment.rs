// Start of file: /src/config/environment.rs

// * Environment configuration for the bot and its health server,
// * loaded once and shared through a singleton.

use std::{borrow::Cow, collections::HashMap, path::PathBuf, str::FromStr};
// * anyhow for convenient error handling
use anyhow::{anyhow, Context, Result};
// * once_cell for lazy static initialization
use once_cell::sync::Lazy;
use tracing::warn;

// ! Telegram rejects thumbnails above this size
pub const UPLOAD_THUMB_CAP_KB: u64 = 200;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_BODY_SIZE: usize = 65_536; // 64KB
const DEFAULT_TIMEOUT: u64 = 5; // 5 seconds
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT: u64 = 30;
const DEFAULT_SESSION_FILE: &str = "/tmp/thumb_bot.session";
const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
const DEFAULT_TARGET_THUMB_KB: u64 = 2000;
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
const DEFAULT_REUPLOAD_MAX_MB: u64 = 20;
const DEFAULT_PENDING_TTL_SECONDS: u64 = 86_400; // 1 day
const DEFAULT_MAX_PENDING_VIDEOS: usize = 10_000;

// * A struct containing all environment variables used by the app
#[derive(Clone)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub max_request_body_size: usize,
    pub default_timeout_seconds: u64,
    pub bot_token: String,
    pub api_id: Option<i64>,
    pub api_hash: Option<String>,
    pub telegram_api_url: Cow<'static, str>,
    pub poll_timeout_seconds: u64,
    pub session_file: PathBuf,
    pub ffmpeg_bin: Cow<'static, str>,
    pub target_thumb_kb: u64,
    pub aggressive_compression: bool,
    pub auto_delete: bool,
    pub max_concurrent_jobs: usize,
    pub reupload_max_mb: u64,
    pub pending_ttl_seconds: u64,
    pub max_pending_videos: usize,
}

// ! Hand-written so the token never reaches the logs
impl std::fmt::Debug for EnvironmentVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentVariables")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("default_timeout_seconds", &self.default_timeout_seconds)
            .field("bot_token", &"<redacted>")
            .field("api_id", &self.api_id)
            .field("api_hash", &self.api_hash.as_ref().map(|_| "<redacted>"))
            .field("telegram_api_url", &self.telegram_api_url)
            .field("poll_timeout_seconds", &self.poll_timeout_seconds)
            .field("session_file", &self.session_file)
            .field("ffmpeg_bin", &self.ffmpeg_bin)
            .field("target_thumb_kb", &self.target_thumb_kb)
            .field("aggressive_compression", &self.aggressive_compression)
            .field("auto_delete", &self.auto_delete)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("reupload_max_mb", &self.reupload_max_mb)
            .field("pending_ttl_seconds", &self.pending_ttl_seconds)
            .field("max_pending_videos", &self.max_pending_videos)
            .finish()
    }
}

// * Parses an optional numeric variable, naming the variable on failure
fn parse_var<T>(value: Option<&str>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|s| s.trim().parse::<T>().with_context(|| format!("Invalid {key} value")))
        .transpose()
}

// * Feature toggles are enabled only by the literal "1"
fn flag(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("1")
}

impl EnvironmentVariables {
    // * Loads environment variables from the process (and .env outside production).
    pub fn load() -> Result<Self> {
        // ? In non-production environments, attempt to load .env
        if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
            dotenv::dotenv().ok();
        }

        // * Collect all environment vars from the system and .env
        let vars: HashMap<String, String> = std::env::vars().collect();

        Self::from_lookup(|key: &str| vars.get(key).cloned())
    }

    // * Builds the configuration from any key lookup, providing defaults if missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // * Empty values count as unset
        let get_var = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        let bot_token: String = get_var("BOT_TOKEN")
            .ok_or_else(|| anyhow!("BOT_TOKEN is required"))?;

        let api_id: Option<i64> = parse_var(get_var("API_ID").as_deref(), "API_ID")?;
        let api_hash: Option<String> = get_var("API_HASH");

        let max_concurrent_jobs: usize =
            parse_var(get_var("MAX_CONCURRENT_JOBS").as_deref(), "MAX_CONCURRENT_JOBS")?
                .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS);

        if max_concurrent_jobs == 0 {
            return Err(anyhow!("Invalid MAX_CONCURRENT_JOBS value: must be at least 1"));
        }

        Ok(Self {
            environment: get_var("ENVIRONMENT")
                .map(Cow::Owned)
                .unwrap_or_else(|| {
                    warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                    Cow::Borrowed(DEFAULT_ENVIRONMENT)
                }),

            host: get_var("HOST")
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed(DEFAULT_HOST)),

            port: parse_var(get_var("PORT").as_deref(), "PORT")?.unwrap_or(DEFAULT_PORT),

            max_request_body_size: parse_var(
                get_var("MAX_REQUEST_BODY_SIZE").as_deref(),
                "MAX_REQUEST_BODY_SIZE",
            )?
            .unwrap_or(DEFAULT_MAX_BODY_SIZE),

            default_timeout_seconds: parse_var(
                get_var("DEFAULT_TIMEOUT_SECONDS").as_deref(),
                "DEFAULT_TIMEOUT_SECONDS",
            )?
            .unwrap_or(DEFAULT_TIMEOUT),

            bot_token,
            api_id,
            api_hash,

            telegram_api_url: get_var("TELEGRAM_API_URL")
                .map(|s: String| Cow::Owned(s.trim_end_matches('/').to_string()))
                .unwrap_or(Cow::Borrowed(DEFAULT_TELEGRAM_API_URL)),

            poll_timeout_seconds: parse_var(
                get_var("POLL_TIMEOUT_SECONDS").as_deref(),
                "POLL_TIMEOUT_SECONDS",
            )?
            .unwrap_or(DEFAULT_POLL_TIMEOUT),

            session_file: get_var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),

            ffmpeg_bin: get_var("FFMPEG_BIN")
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed(DEFAULT_FFMPEG_BIN)),

            target_thumb_kb: parse_var(get_var("TARGET_THUMB_KB").as_deref(), "TARGET_THUMB_KB")?
                .unwrap_or(DEFAULT_TARGET_THUMB_KB),

            aggressive_compression: flag(get_var("AGGRESSIVE_COMPRESSION").as_deref()),
            auto_delete: flag(get_var("AUTO_DELETE").as_deref()),
            max_concurrent_jobs,

            reupload_max_mb: parse_var(get_var("REUPLOAD_MAX_MB").as_deref(), "REUPLOAD_MAX_MB")?
                .unwrap_or(DEFAULT_REUPLOAD_MAX_MB),

            pending_ttl_seconds: parse_var(
                get_var("PENDING_TTL_SECONDS").as_deref(),
                "PENDING_TTL_SECONDS",
            )?
            .unwrap_or(DEFAULT_PENDING_TTL_SECONDS),

            max_pending_videos: parse_var(
                get_var("MAX_PENDING_VIDEOS").as_deref(),
                "MAX_PENDING_VIDEOS",
            )?
            .unwrap_or(DEFAULT_MAX_PENDING_VIDEOS),
        })
    }

    // * The size every thumbnail is squeezed under
    pub fn effective_target_kb(&self) -> u64 {
        self.target_thumb_kb.min(UPLOAD_THUMB_CAP_KB)
    }

    // * Videos up to this many bytes are re-uploaded with the new thumbnail
    pub fn reupload_limit_bytes(&self) -> u64 {
        self.reupload_max_mb.saturating_mul(1024 * 1024)
    }

    // * Returns a reference to the lazily-initialized environment configuration
    pub fn instance() -> Result<&'static Self> {
        static INSTANCE: Lazy<Result<EnvironmentVariables, String>> = Lazy::new(|| {
            let config: EnvironmentVariables =
                EnvironmentVariables::load().map_err(|e: anyhow::Error| format!("{e:#}"))?;

            if cfg!(debug_assertions) {
                tracing::debug!("Loaded environment configuration: {:#?}", config);
            }

            Ok(config)
        });

        INSTANCE.as_ref().map_err(|e: &String| anyhow!(e.clone()))
    }
}


// End of file: /src/config/environment.rs
