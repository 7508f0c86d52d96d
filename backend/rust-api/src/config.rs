use std::env;
use std::fmt;

pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com/";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
/// Largest second count `chrono::Duration` accepts.
pub const MAX_DURATION_SECS: i64 = i64::MAX / 1000;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub quiz: QuizConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct IdentityConfig {
    /// GitLab instance, without trailing slash.
    pub base_url: String,
    /// Personal access token with `read_user` scope. Identify is disabled without it.
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: normalize_base_url(DEFAULT_GITLAB_URL),
            token: None,
            timeout_secs: 10,
            cache_ttl_secs: 300,
        }
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub question_count: usize,
    pub save_debounce_secs: i64,
    pub session_ttl_secs: i64,
    /// JSON question bank to use instead of the bundled one.
    pub question_bank_path: Option<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_count: 15,
            save_debounce_secs: 10,
            session_ttl_secs: 3600,
            question_bank_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.server.bind_addr);

        let base_url = settings
            .get_string("identity.base_url")
            .or_else(|_| env::var("GITLAB_URL"))
            .map(|url| normalize_base_url(&url))
            .unwrap_or(defaults.identity.base_url);

        let token = settings
            .get_string("identity.token")
            .or_else(|_| env::var("GITLAB_PAT"))
            .ok()
            .filter(|token| !token.trim().is_empty());
        if token.is_none() {
            eprintln!("WARNING: GITLAB_PAT is not set, user identification will be unavailable");
        }

        let timeout_secs = positive_int(&settings, "identity.timeout_secs")
            .unwrap_or(defaults.identity.timeout_secs as i64) as u64;
        let cache_ttl_secs = non_negative_int(&settings, "identity.cache_ttl_secs")
            .unwrap_or(defaults.identity.cache_ttl_secs as i64) as u64;

        let question_count = positive_int(&settings, "quiz.question_count")
            .unwrap_or(defaults.quiz.question_count as i64) as usize;
        let save_debounce_secs = non_negative_int(&settings, "quiz.save_debounce_secs")
            .unwrap_or(defaults.quiz.save_debounce_secs);
        let session_ttl_secs = positive_int(&settings, "quiz.session_ttl_secs")
            .unwrap_or(defaults.quiz.session_ttl_secs);
        for (key, value) in [
            ("quiz.save_debounce_secs", save_debounce_secs),
            ("quiz.session_ttl_secs", session_ttl_secs),
        ] {
            if value > MAX_DURATION_SECS {
                return Err(config::ConfigError::Message(format!(
                    "{} must be at most {} seconds, got {}",
                    key, MAX_DURATION_SECS, value
                )));
            }
        }

        let question_bank_path = settings
            .get_string("quiz.question_bank_path")
            .ok()
            .filter(|path| !path.is_empty());

        Ok(Config {
            server: ServerConfig { bind_addr },
            identity: IdentityConfig {
                base_url,
                token,
                timeout_secs,
                cache_ttl_secs,
            },
            quiz: QuizConfig {
                question_count,
                save_debounce_secs,
                session_ttl_secs,
                question_bank_path,
            },
        })
    }
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn positive_int(settings: &config::Config, key: &str) -> Option<i64> {
    settings.get_int(key).ok().filter(|value| *value > 0)
}

fn non_negative_int(settings: &config::Config, key: &str) -> Option<i64> {
    settings.get_int(key).ok().filter(|value| *value >= 0)
}
