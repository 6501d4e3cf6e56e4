use chrono::Utc;
use clap::Parser;
use crossterm::style::Stylize;
use parlance::{
    config::{ensure_api_key, Config, ConfigStore, FileConfigStore},
    logging,
    progress::ProgressStore,
    runtime::StdinReader,
    scheduler::{ExhaustionPolicy, KeywordScheduler},
    service::{needs_formula, FormulaicClient, Languages, FORMULA_VERSION},
    session::{self, SessionContext, SessionLoop, SessionSettings},
    storage::JsonFileStorage,
    vocabulary::SupportedVocabulary,
    Result,
};
use std::{io, path::PathBuf, process::ExitCode};
use tracing::{debug, error};

/// interactive vocabulary drills: translate generated phrases, get graded, keep your streak
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice a language one keyword at a time: parlance generates a phrase around each keyword, grades your translation and remembers what you have learned. Type /help during a session for commands."
)]
pub struct Cli {
    /// path of the config file to use
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// path of the learned-progress file (overrides the config for this run)
    #[clap(short = 'd', long)]
    data_file: Option<PathBuf>,

    /// play with this many lives; the session ends when they run out
    #[clap(short = 'l', long)]
    lives: Option<u32>,

    /// what to do once every keyword is learned
    #[clap(long, value_enum)]
    on_exhausted: Option<ExhaustionPolicy>,

    /// keyword list to practice
    #[clap(short = 'v', long, value_enum, default_value_t = SupportedVocabulary::Basic)]
    vocabulary: SupportedVocabulary,

    /// seed for the review-mode keyword picker
    #[clap(long)]
    seed: Option<u64>,

    /// log filter, e.g. "debug" or "parlance=trace" (default: $PARLANCE_LOG or "warn")
    #[clap(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Apply one-run overrides; these are never written back to the config file
    fn overrides(&self, mut cfg: Config) -> Config {
        if let Some(ref data_file) = self.data_file {
            cfg.data_file = data_file.clone();
        }
        if let Some(lives) = self.lives {
            cfg.lives = Some(lives);
        }
        if let Some(policy) = self.on_exhausted {
            cfg.on_exhausted = policy;
        }
        cfg
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(&logging::resolve_level(cli.log_level.as_deref()));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal error");
            eprintln!("{}", format!("error: {err}").red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let mut cfg = store.load()?;
    debug!(path = %store.path().display(), "config ready");

    let mut reader = StdinReader::new();
    ensure_api_key(&store, &mut cfg, &mut reader)?;

    let mut client = FormulaicClient::new(&cfg)?;
    if needs_formula(&cfg) {
        debug!(formula_id = %cfg.formula_id, "formula missing or outdated, creating new formula");
        cfg.formula_id = client.create_formula(&Languages::from(&cfg))?;
        cfg.formula_version = FORMULA_VERSION;
        store.save(&cfg)?;
    }

    let cfg = cli.overrides(cfg);
    let vocabulary = cli.vocabulary.load()?;
    let mut progress = ProgressStore::open(Box::new(JsonFileStorage::with_path(&cfg.data_file)))?;

    let mut stdout = io::stdout();
    session::welcome(&mut stdout, progress.stats(), Utc::now())?;

    let settings = SessionSettings::from(&cfg);
    let scheduler = match cli.seed {
        Some(seed) => KeywordScheduler::with_seed(cfg.on_exhausted, seed),
        None => KeywordScheduler::new(cfg.on_exhausted),
    };
    let ctx = SessionContext {
        settings: &settings,
        progress: &mut progress,
        service: &client,
        reader: &mut reader,
        out: &mut stdout,
    };

    let summary = SessionLoop::new(ctx, scheduler, &vocabulary.keywords).run()?;
    debug!(end = ?summary.end, "goodbye");
    Ok(())
}
