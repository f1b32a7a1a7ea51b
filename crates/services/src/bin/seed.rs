use std::fmt;

use chrono::{DateTime, Utc};
use retention_core::model::{Answers, SkillDraft, UserId};
use retention_core::quiz::generate_questions;
use services::{AppServices, Clock, ServiceConfig, init_tracing};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user: UserId,
    skills: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidSkills { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidSkills { raw } => write!(f, "invalid --skills value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse(config: &ServiceConfig) -> Result<Self, ArgsError> {
        let mut db_url = config.db_url.clone();
        let mut user = UserId::random();
        let mut skills = 4;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                }
                "--skills" => {
                    let value = require_value(&mut args, "--skills")?;
                    skills = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidSkills { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user,
            skills,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p services --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:retention.sqlite3)");
    eprintln!("  --user <uuid>             Owner of the seeded skills (default: random)");
    eprintln!("  --skills <n>              Number of sample skills to create (default: 4)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RETENTION_DB_URL, RETENTION_LOG_LEVEL (also read from .env)");
}

const SAMPLES: [(&str, &str, i32); 6] = [
    ("Spanish", "Languages", 70),
    ("Piano", "Music", 55),
    ("Rust", "Programming", 85),
    ("Chess openings", "Games", 60),
    ("Watercolor", "Art", 40),
    ("Statistics", "Math", 75),
];

/// Answer the first `correct` questions with the option the templates score as right.
fn answers_with(skill_name: &str, correct: usize) -> Answers {
    generate_questions(skill_name)
        .into_iter()
        .take(correct)
        .map(|q| (q.id, q.correct_index))
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env();
    init_tracing(&config.log_config());

    let args = Args::parse(&config).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = args.now.map_or(Clock::Default, Clock::fixed);
    let services = AppServices::new_sqlite(&args.db_url, clock).await?;
    let skill_service = services.skills();
    let quick_tests = services.quick_tests();

    for i in 0..args.skills {
        let idx = i as usize % SAMPLES.len();
        let (name, category, proficiency) = SAMPLES[idx];
        let created = skill_service
            .create_skill(
                args.user,
                SkillDraft::named(name)
                    .with_category(category)
                    .with_proficiency(proficiency),
            )
            .await?;

        let view = quick_tests
            .generate_test(created.skill.id(), args.user)
            .await?;
        let correct = (idx * 2) % (view.questions.len() + 1);
        let total_time = 20.0 + 25.0 * idx as f64;
        let submission = quick_tests
            .submit_test(view.id, args.user, answers_with(name, correct), total_time)
            .await?;

        tracing::info!(
            skill = name,
            accuracy = submission.results.accuracy,
            performance = submission.results.performance.label(),
            "seeded skill with one quiz"
        );
    }

    let overview = services
        .knowledge()
        .get_knowledge_overview(args.user)
        .await?;
    tracing::info!(
        user = %args.user,
        total_skills = overview.stats.total_skills,
        total_tests = overview.stats.total_tests,
        average_strength = overview.stats.average_strength,
        "seed complete"
    );
    println!("{}", serde_json::to_string_pretty(&overview.stats)?);

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
