use std::fmt;
use std::sync::Arc;

use services::{
    ActivitySourceConfig, ActivityState, Clock, HttpActivitySource, HttpMediaFetcher,
    SessionError, SessionToken, StudyConfig, StudyHandle, StudyLoopService,
};
use study_core::model::{AnnotatedText, Qmti, Section, TtsSlides};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingToken,
    InvalidEndpoint { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingToken => {
                write!(f, "a session token is required (--token or STUDY_SESSION_TOKEN)")
            }
            ArgsError::InvalidEndpoint { raw } => write!(f, "invalid --endpoint value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--endpoint <url>] [--lang <code>] [--token <token>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --endpoint http://localhost:4649");
    eprintln!("  --lang es");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_API_ENDPOINT, STUDY_LANG, STUDY_SESSION_TOKEN,");
    eprintln!("  STUDY_HTTP_TIMEOUT_SECS, STUDY_PRELOAD_CONCURRENCY, RUST_LOG");
}

struct Args {
    source: ActivitySourceConfig,
    study: StudyConfig,
    token: SessionToken,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut source = ActivitySourceConfig::from_env();
        let mut study = StudyConfig::from_env();
        let mut token = std::env::var("STUDY_SESSION_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--endpoint" => {
                    let value = require_value(args, "--endpoint")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidEndpoint { raw: value });
                    }
                    source = source.with_endpoint(value);
                }
                "--lang" => {
                    study = study.with_language_code(require_value(args, "--lang")?);
                }
                "--token" => {
                    token = Some(require_value(args, "--token")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let token = token.map(SessionToken::new).ok_or(ArgsError::MissingToken)?;
        Ok(Self {
            source,
            study,
            token,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the study prompts.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    info!(
        endpoint = %args.source.endpoint,
        lang = %args.study.language_code,
        "starting study session"
    );

    let fetcher = Arc::new(HttpMediaFetcher::from_config(&args.source)?);
    let source = Arc::new(HttpActivitySource::new(args.source)?);
    let study = StudyLoopService::new(Clock::default(), source, fetcher).with_config(&args.study);

    let (session, handle) = study.open_session(args.token);
    let mut session_task = tokio::spawn(session.run());

    tokio::select! {
        finished = &mut session_task => {
            finished?.map_err(describe_session_error)?;
        }
        presented = present(handle) => {
            session_task.abort();
            presented?;
        }
    }
    Ok(())
}

fn describe_session_error(err: SessionError) -> SessionError {
    if err.is_recoverable() {
        eprintln!("network failure, run again to retry");
    } else {
        eprintln!("study session cannot continue");
    }
    err
}

type Input = Lines<BufReader<Stdin>>;

enum Step {
    Sent,
    Quit,
    SessionGone,
}

impl Step {
    fn from_send<E>(sent: Result<(), E>) -> Self {
        match sent {
            Ok(()) => Step::Sent,
            Err(_) => Step::SessionGone,
        }
    }
}

/// Renders each published state and turns typed answers into study events.
///
/// Returns when the learner quits, stdin closes, or the session ends.
async fn present(handle: StudyHandle) -> std::io::Result<()> {
    let mut states = handle.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = states.borrow_and_update().clone();
        match snapshot.activity() {
            None => println!("loading next activity..."),
            Some(activity) => match play_section(&handle, activity, &mut input).await? {
                Step::Sent => {}
                Step::Quit | Step::SessionGone => return Ok(()),
            },
        }

        if states.changed().await.is_err() {
            return Ok(());
        }
    }
}

async fn play_section(
    handle: &StudyHandle,
    activity: &ActivityState,
    input: &mut Input,
) -> std::io::Result<Step> {
    if let Some(progress) = activity.progress() {
        println!(
            "\n[section {}/{}]",
            progress.section_index + 1,
            progress.total_sections
        );
    }

    let cursor = activity.cursor();
    match activity.current_section() {
        Some(Section::TtsSlides(slides)) => {
            if !show_slides(slides, input).await? {
                return Ok(Step::Quit);
            }
            Ok(Step::from_send(handle.slides_finished(cursor).await))
        }
        Some(Section::Qmti(quiz)) => {
            let Some(choice) = ask_quiz(quiz, input).await? else {
                return Ok(Step::Quit);
            };
            Ok(Step::from_send(handle.choice_selected(cursor, choice).await))
        }
        None => Ok(Step::Sent),
    }
}

async fn show_slides(slides: &TtsSlides, input: &mut Input) -> std::io::Result<bool> {
    for (index, slide) in slides.slides().iter().enumerate() {
        println!("slide {} ({}, {})", index + 1, slide.audio, slide.image);
        print_text(&slide.text);
        println!("  press enter to continue, q to quit");
        match input.next_line().await? {
            Some(line) if line.trim() == "q" => return Ok(false),
            Some(_) => {}
            None => return Ok(false),
        }
    }
    Ok(true)
}

async fn ask_quiz(quiz: &Qmti, input: &mut Input) -> std::io::Result<Option<usize>> {
    println!("quiz ({})", quiz.prompt_audio());
    print_text(quiz.text());
    for (index, choice) in quiz.choices().iter().enumerate() {
        println!("  {}) {}", index + 1, choice.image);
    }

    loop {
        println!("  pick 1-{}, q to quit", quiz.choices().len());
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        let line = line.trim();
        if line == "q" {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=quiz.choices().len()).contains(&n) => return Ok(Some(n - 1)),
            _ => println!("  not a valid choice: {line}"),
        }
    }
}

fn print_text(text: &AnnotatedText) {
    println!("  {}", text.text);
    for translation in &text.translations {
        println!("    = {translation}");
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
