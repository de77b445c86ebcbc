use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::error::Result as WebResult;
use crate::game_logic::question::QuestionItem;
use crate::library::GameSummary;
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct GameListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GameDetails {
    pub game_id: String,
    pub title: String,
    pub page_title: String,
    pub question_count: usize,
    pub playable_questions: usize,
    pub session_length: usize,
}

pub async fn list_games_handler(
    State(app_state): State<AppState>,
    Query(query): Query<GameListQuery>,
) -> Json<Vec<GameSummary>> {
    tracing::debug!("HTTP: Received list_games request: {:?}", query);

    let category = query.category.as_deref().unwrap_or("all");
    let in_category = app_state.library.filter_by_category(category);
    let matches = app_state.library.search(query.q.as_deref().unwrap_or_default());

    let games = in_category
        .into_iter()
        .filter(|entry| matches.iter().any(|hit| hit.game_id == entry.game_id))
        .map(|entry| entry.summary())
        .collect();

    Json(games)
}

pub async fn list_categories_handler(State(app_state): State<AppState>) -> Json<Vec<String>> {
    Json(app_state.library.categories())
}

#[derive(Deserialize, Debug, Default)]
pub struct SuggestionQuery {
    pub q: Option<String>,
}

pub async fn suggestions_handler(
    State(app_state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<GameSummary>> {
    let suggestions = app_state
        .library
        .suggestions(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(|entry| entry.summary())
        .collect();
    Json(suggestions)
}

pub async fn game_details_handler(
    State(app_state): State<AppState>,
    Path(game_id): Path<String>,
) -> WebResult<Json<GameDetails>> {
    tracing::info!("HTTP: Received game_details request for {}", game_id);

    let records = app_state.loader.load(&game_id).await.map_err(|e| {
        tracing::warn!(game.id = %game_id, error = %e, "Failed to load question set");
        e
    })?;

    let playable_questions = records
        .iter()
        .filter(|record| QuestionItem::from_record(record).is_ok())
        .count();

    Ok(Json(GameDetails {
        title: app_state.titles.resolve(&game_id),
        page_title: app_state.titles.page_title(&game_id),
        question_count: records.len(),
        playable_questions,
        session_length: playable_questions.min(app_state.quiz_config.questions_per_session),
        game_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuizConfig;
    use crate::content::StaticQuestionSetLoader;
    use crate::game_logic::QuestionRecord;
    use crate::library::GameLibrary;
    use crate::web::WebError;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let mut questions: Vec<QuestionRecord> = (0..12)
            .map(|i| QuestionRecord::Open {
                question: format!("Q{}", i),
                correct_answer: "yes".to_string(),
                incorrect_answers: vec!["no".to_string()],
            })
            .collect();
        questions.push(QuestionRecord::Unrecognized(serde_json::json!({"bad": true})));

        let loader = StaticQuestionSetLoader::new()
            .with_game("capital-cities", questions)
            .with_game("tiny-quiz", vec![]);
        let library = GameLibrary::parse(
            r#"[
  { "game_id": "capital-cities", "game_name": "Capital Cities", "category": "Geography" },
  { "game_id": "movie-quotes", "game_name": "Movie Quotes", "category": "Entertainment" }
]"#,
        )
        .unwrap();
        AppState::new(Arc::new(loader), Arc::new(library), QuizConfig::default())
    }

    #[tokio::test]
    async fn test_list_games_filters() {
        let Json(all) = list_games_handler(State(test_state()), Query(GameListQuery::default())).await;
        assert_eq!(all.len(), 2);

        let Json(geo) = list_games_handler(
            State(test_state()),
            Query(GameListQuery {
                category: Some("Geography".to_string()),
                q: None,
            }),
        )
        .await;
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].game_id, "capital-cities");

        let Json(searched) = list_games_handler(
            State(test_state()),
            Query(GameListQuery {
                category: Some("all".to_string()),
                q: Some("movie".to_string()),
            }),
        )
        .await;
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].game_name, "Movie Quotes");
    }

    #[tokio::test]
    async fn test_categories() {
        let Json(categories) = list_categories_handler(State(test_state())).await;
        assert_eq!(categories, vec!["Entertainment", "Geography"]);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let Json(hits) = suggestions_handler(
            State(test_state()),
            Query(SuggestionQuery {
                q: Some("cap".to_string()),
            }),
        )
        .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stars, 3);

        let Json(none) =
            suggestions_handler(State(test_state()), Query(SuggestionQuery::default())).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_game_details() {
        let Json(details) =
            game_details_handler(State(test_state()), Path("capital-cities".to_string()))
                .await
                .unwrap();
        assert_eq!(details.title, "Capital Cities");
        assert_eq!(details.page_title, "Capital Cities - Quiz Game");
        assert_eq!(details.question_count, 13);
        assert_eq!(details.playable_questions, 12);
        assert_eq!(details.session_length, 10);

        let Json(tiny) = game_details_handler(State(test_state()), Path("tiny-quiz".to_string()))
            .await
            .unwrap();
        assert_eq!(tiny.title, "Tiny Quiz");
        assert_eq!(tiny.session_length, 0);

        let missing =
            game_details_handler(State(test_state()), Path("no-such-game".to_string())).await;
        assert!(matches!(missing, Err(WebError::GameNotFound(id)) if id == "no-such-game"));
    }
}
