use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::ContentConfig;
use crate::content::{fetch_url, read_file};
use crate::error::ContentError;

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_DIFFICULTY: &str = "medium";
const DEFAULT_STARS: i64 = 3;
const MAX_SUGGESTIONS: usize = 7;

/// One game as listed in the library index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub game_id: String,
    pub game_name: String,
    #[serde(default)]
    pub game_icon: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub stars: Option<i64>,
}

impl LibraryEntry {
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn difficulty(&self) -> String {
        self.difficulty
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DIFFICULTY)
            .to_lowercase()
    }

    /// Star rating in `1..=5`; missing or zero counts as 3.
    pub fn stars(&self) -> u8 {
        let stars = match self.stars {
            Some(0) | None => DEFAULT_STARS,
            Some(stars) => stars,
        };
        stars.clamp(1, 5) as u8
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.game_id.clone(),
            game_name: self.game_name.clone(),
            game_icon: self.game_icon.clone(),
            category: self.category().to_string(),
            difficulty: self.difficulty(),
            stars: self.stars(),
        }
    }
}

/// Library entry with defaults applied, as served to the index page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameSummary {
    pub game_id: String,
    pub game_name: String,
    pub game_icon: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub stars: u8,
}

#[derive(Debug, Clone, Default)]
pub struct GameLibrary {
    entries: Vec<LibraryEntry>,
}

impl GameLibrary {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self { entries }
    }

    #[tracing::instrument(skip(content), fields(content.length = content.len()))]
    pub fn parse(content: &str) -> Result<Self, ContentError> {
        let entries: Vec<LibraryEntry> = serde_json::from_str(content)
            .map_err(|e| ContentError::Parse(format!("Failed to parse game library: {}", e)))?;
        Ok(Self::new(entries))
    }

    /// Loads the library index from `content.library_url` when set, otherwise from
    /// `content.library_path`.
    #[tracing::instrument(skip(config, client), fields(
        library.path = %config.library_path,
        library.url = ?config.library_url
    ))]
    pub async fn load(config: &ContentConfig, client: &reqwest::Client) -> Result<Self, ContentError> {
        let raw_content = match &config.library_url {
            Some(url) => fetch_url(client, url, "library").await?,
            None => read_file(Path::new(&config.library_path), "library").await?,
        };
        let library = Self::parse(&raw_content)?;
        tracing::info!(library.games.count = library.len(), "Loaded game library");
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, game_id: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.game_id == game_id)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.category().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Games in `category`; `"all"` selects every game.
    pub fn filter_by_category(&self, category: &str) -> Vec<&LibraryEntry> {
        if category == "all" {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|entry| entry.category() == category)
            .collect()
    }

    /// Case-insensitive substring match on name or category. An empty query matches
    /// everything.
    pub fn search(&self, query: &str) -> Vec<&LibraryEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|entry| {
                entry.game_name.to_lowercase().contains(&query)
                    || entry
                        .category
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&query)
            })
            .collect()
    }

    pub fn suggestions(&self, query: &str) -> Vec<&LibraryEntry> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let mut matches = self.search(query);
        matches.truncate(MAX_SUGGESTIONS);
        matches
    }
}

/// Maps game identifiers to display names.
#[derive(Debug, Clone, Default)]
pub struct TitleResolver {
    library: Arc<GameLibrary>,
}

impl TitleResolver {
    pub fn new(library: Arc<GameLibrary>) -> Self {
        Self { library }
    }

    pub fn resolve(&self, game_id: &str) -> String {
        match self.library.find(game_id) {
            Some(entry) => entry.game_name.clone(),
            None => {
                tracing::debug!(game.id = %game_id, "Game not in library, using fallback title");
                fallback_title(game_id)
            }
        }
    }

    pub fn page_title(&self, game_id: &str) -> String {
        format!("{} - Quiz Game", self.resolve(game_id))
    }
}

/// Turns an identifier into a display name: `-` and `_` become spaces and the first
/// letter of every word is upper-cased (`capital-cities` -> `Capital Cities`).
pub fn fallback_title(game_id: &str) -> String {
    let mut title = String::with_capacity(game_id.len());
    let mut at_word_start = true;
    for c in game_id.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        if c.is_alphanumeric() {
            if at_word_start {
                title.extend(c.to_uppercase());
            } else {
                title.push(c);
            }
            at_word_start = false;
        } else {
            title.push(c);
            at_word_start = true;
        }
    }
    title
}
