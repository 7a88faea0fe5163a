use std::path::PathBuf;

use clap::Parser;

mod platform;

/// Headless exercise player: fetches exercises or walks a tutorial and
/// talks to the code execution service.
#[derive(Debug, Parser)]
#[command(name = "coach", version)]
struct Cli {
    /// RON configuration file.
    #[arg(long, default_value = platform::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Generate exercises from this article text.
    #[arg(long)]
    article: Option<String>,

    /// Load the exercises prepared for a question, as `site/id`.
    #[arg(long)]
    question: Option<String>,

    /// List the questions exercises can be loaded for, then exit.
    #[arg(long)]
    list_questions: bool,

    /// Walk the tutorial described by this RON file.
    #[arg(long)]
    tutorial: Option<PathBuf>,

    /// Answer the multiple-choice question in this text file.
    #[arg(long)]
    quiz: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = platform::config::load(&cli.config)?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();
    coach_logging::initialize(&config.log_settings());
    config.report(&cli.config, from_file);

    let source = if let Some(text) = cli.source.article {
        platform::Source::Article(text)
    } else if let Some(text) = cli.source.question {
        platform::Source::Question(platform::parse_question_ref(&text)?)
    } else if cli.source.list_questions {
        platform::Source::Questions
    } else if let Some(path) = cli.source.tutorial {
        platform::Source::Tutorial(path)
    } else if let Some(path) = cli.source.quiz {
        platform::Source::Quiz(path)
    } else {
        anyhow::bail!("one of --article, --question, --list-questions, --tutorial or --quiz is required");
    };

    platform::run_app(config, source)
}
