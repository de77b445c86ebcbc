use std::sync::Arc;

use crate::config::QuizConfig;
use crate::content::QuestionSetLoader;
use crate::library::{GameLibrary, TitleResolver};

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn QuestionSetLoader>,
    pub library: Arc<GameLibrary>,
    pub titles: TitleResolver,
    pub quiz_config: Arc<QuizConfig>,
}

impl AppState {
    pub fn new(
        loader: Arc<dyn QuestionSetLoader>,
        library: Arc<GameLibrary>,
        quiz_config: QuizConfig,
    ) -> Self {
        Self {
            loader,
            titles: TitleResolver::new(Arc::clone(&library)),
            library,
            quiz_config: Arc::new(quiz_config),
        }
    }
}
