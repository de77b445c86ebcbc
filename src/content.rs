use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ContentConfig, ContentSourceType};
use crate::error::ContentError;
use crate::game_logic::QuestionRecord;

/// Resolves a game identifier to its question pool.
#[async_trait]
pub trait QuestionSetLoader: Send + Sync {
    async fn load(&self, game_id: &str) -> Result<Vec<QuestionRecord>, ContentError>;
}

// Both document layouts occur in the question files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionSetDocument {
    List(Vec<QuestionRecord>),
    Wrapped { questions: Vec<QuestionRecord> },
}

/// Parses a question-set document: a bare array of questions or `{ "questions": [...] }`.
#[tracing::instrument(skip(content), fields(content.length = content.len()))]
pub fn parse_question_set(content: &str) -> Result<Vec<QuestionRecord>, ContentError> {
    let document: QuestionSetDocument = serde_json::from_str(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse question set: {}", e)))?;

    Ok(match document {
        QuestionSetDocument::List(questions) => questions,
        QuestionSetDocument::Wrapped { questions } => questions,
    })
}

/// Game identifiers end up in file paths and URLs, so only a conservative charset is
/// accepted.
pub fn validate_game_id(game_id: &str) -> Result<(), ContentError> {
    let valid = !game_id.is_empty()
        && game_id.len() <= 128
        && game_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ContentError::InvalidGameId(game_id.to_string()))
    }
}

pub(crate) async fn read_file(path: &Path, game_id: &str) -> Result<String, ContentError> {
    tracing::debug!(file.path = %path.display(), "Loading data from file");
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ContentError::NotFound(game_id.to_string())
        } else {
            ContentError::FileRead {
                path: path.display().to_string(),
                source: e,
            }
        }
    })
}

pub(crate) async fn fetch_url(
    client: &reqwest::Client,
    url: &str,
    game_id: &str,
) -> Result<String, ContentError> {
    tracing::debug!(http.url = %url, "Fetching data from URL");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ContentError::HttpFetch {
            url: url.to_string(),
            source: e,
        })?;

    if !response.status().is_success() {
        tracing::warn!(http.url = %url, http.status = %response.status(), "Content request failed");
        return Err(ContentError::NotFound(game_id.to_string()));
    }

    response.text().await.map_err(|e| ContentError::HttpFetch {
        url: url.to_string(),
        source: e,
    })
}

/// Reads `{questions_dir}/{game_id}.json`.
#[derive(Debug, Clone)]
pub struct FileQuestionSetLoader {
    questions_dir: PathBuf,
}

impl FileQuestionSetLoader {
    pub fn new(questions_dir: impl Into<PathBuf>) -> Self {
        Self {
            questions_dir: questions_dir.into(),
        }
    }
}

#[async_trait]
impl QuestionSetLoader for FileQuestionSetLoader {
    #[tracing::instrument(skip(self), fields(game.id = %game_id))]
    async fn load(&self, game_id: &str) -> Result<Vec<QuestionRecord>, ContentError> {
        validate_game_id(game_id)?;
        let path = self.questions_dir.join(format!("{}.json", game_id));
        let raw_content = read_file(&path, game_id).await?;
        let questions = parse_question_set(&raw_content)?;
        tracing::info!("Loaded {} questions for {}", questions.len(), game_id);
        Ok(questions)
    }
}

/// Fetches `{base_url}/{game_id}.json`.
#[derive(Debug, Clone)]
pub struct HttpQuestionSetLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuestionSetLoader {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, game_id: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), game_id)
    }
}

#[async_trait]
impl QuestionSetLoader for HttpQuestionSetLoader {
    #[tracing::instrument(skip(self), fields(game.id = %game_id))]
    async fn load(&self, game_id: &str) -> Result<Vec<QuestionRecord>, ContentError> {
        validate_game_id(game_id)?;
        let url = self.url_for(game_id);
        let raw_content = fetch_url(&self.client, &url, game_id).await?;
        let questions = parse_question_set(&raw_content)?;
        tracing::info!("Loaded {} questions for {}", questions.len(), game_id);
        Ok(questions)
    }
}

/// Pools held in memory, keyed by game identifier.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionSetLoader {
    games: std::collections::HashMap<String, Vec<QuestionRecord>>,
}

#[cfg(test)]
impl StaticQuestionSetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(mut self, game_id: impl Into<String>, questions: Vec<QuestionRecord>) -> Self {
        self.games.insert(game_id.into(), questions);
        self
    }
}

#[cfg(test)]
#[async_trait]
impl QuestionSetLoader for StaticQuestionSetLoader {
    async fn load(&self, game_id: &str) -> Result<Vec<QuestionRecord>, ContentError> {
        validate_game_id(game_id)?;
        self.games
            .get(game_id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(game_id.to_string()))
    }
}

#[tracing::instrument(skip(config, client), fields(
    content.source_type = ?config.source_type,
    content.questions_dir = %config.questions_dir,
    content.base_url = ?config.base_url
))]
pub fn loader_from_config(
    config: &ContentConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn QuestionSetLoader>, ContentError> {
    match config.source_type {
        ContentSourceType::File => Ok(Arc::new(FileQuestionSetLoader::new(
            config.questions_dir.clone(),
        ))),
        ContentSourceType::Http => {
            let base_url = config.base_url.as_ref().ok_or_else(|| {
                ContentError::Config("HTTP base URL required for http source".to_string())
            })?;
            Ok(Arc::new(HttpQuestionSetLoader::new(client, base_url.clone())))
        }
    }
}
