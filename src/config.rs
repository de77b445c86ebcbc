use crate::error::{ConfigError, Result as AppResult};
use crate::game_logic::session::DEFAULT_SESSION_SIZE;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Directory with the page assets, served for any path the API does not claim.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: Vec::new(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ContentSourceType {
    File,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_source_type")]
    pub source_type: ContentSourceType,
    #[serde(default = "default_questions_dir")]
    pub questions_dir: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_library_path")]
    pub library_path: String,
    #[serde(default)]
    pub library_url: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            questions_dir: default_questions_dir(),
            base_url: None,
            library_path: default_library_path(),
            library_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuizConfig {
    #[serde(default = "default_questions_per_session")]
    pub questions_per_session: usize,
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
    #[serde(default = "default_game_id")]
    pub default_game_id: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions_per_session: default_questions_per_session(),
            reveal_delay_ms: default_reveal_delay_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            auto_advance: default_auto_advance(),
            default_game_id: default_game_id(),
        }
    }
}

impl QuizConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiz.questions_per_session == 0 {
            return Err(ConfigError::InvalidValue(
                "quiz.questions_per_session must be at least 1".to_string(),
            ));
        }
        if self.quiz.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "quiz.tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.quiz.default_game_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "quiz.default_game_id must not be empty".to_string(),
            ));
        }
        if self.content.source_type == ContentSourceType::Http && self.content.base_url.is_none()
        {
            return Err(ConfigError::Missing(
                "content.base_url is required for the http source".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_settings() -> AppResult<AppSettings> {
    let builder = Config::builder()
        .add_source(
            Environment::with_prefix("QUIZHALL")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .add_source(File::with_name("config").required(false));

    settings_from(builder)
}

fn settings_from(builder: ConfigBuilder<DefaultState>) -> AppResult<AppSettings> {
    let app_settings: AppSettings = builder.build()?.try_deserialize()?;
    app_settings.validate()?;
    Ok(app_settings)
}

fn default_port() -> u16 {
    3000
}

fn default_source_type() -> ContentSourceType {
    ContentSourceType::File
}

fn default_questions_dir() -> String {
    "assets/games".to_string()
}

fn default_library_path() -> String {
    "games_in_library.json".to_string()
}

fn default_questions_per_session() -> usize {
    DEFAULT_SESSION_SIZE
}

fn default_reveal_delay_ms() -> u64 {
    1200
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_auto_advance() -> bool {
    true
}

fn default_game_id() -> String {
    "capital-cities".to_string()
}
