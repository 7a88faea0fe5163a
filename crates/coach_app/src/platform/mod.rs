use std::path::PathBuf;

use coach_core::{CatalogMsg, ExerciseMsg, QuestionRef, TutorialMsg};

mod app;
pub mod config;
mod effects;
mod render;

pub use app::run_app;

/// Where the exercises for this session come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Article(String),
    Question(QuestionRef),
    /// Print the questions exercises exist for, then exit.
    Questions,
    Tutorial(PathBuf),
    Quiz(PathBuf),
}

/// Everything the driver loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppMsg {
    Exercise(ExerciseMsg),
    Tutorial(TutorialMsg),
    Catalog(CatalogMsg),
}

/// Parses `site/id`, e.g. `stackoverflow/11227809`.
pub fn parse_question_ref(text: &str) -> anyhow::Result<QuestionRef> {
    match text.split_once('/') {
        Some((site, id)) if !site.trim().is_empty() && !id.trim().is_empty() => Ok(QuestionRef {
            site: site.trim().to_string(),
            question_id: id.trim().to_string(),
        }),
        _ => anyhow::bail!("expected `site/id`, got {text:?}"),
    }
}
