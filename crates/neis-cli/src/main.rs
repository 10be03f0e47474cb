//! neis-cli: key provisioning, offline record synthesis, and incident history.
//!
//! Usage:
//!   neis-cli keygen
//!   neis-cli record --level middle [--file analysis.json]      (reads stdin without --file)
//!   neis-cli incidents --teacher <id> [--student <id>]
//!   neis-cli patterns --teacher <id> --student <id>
//!
//! Store location comes from `NEIS__STORAGE_PATH` / `config/neis.toml`; the field key from
//! `ENCRYPTION_KEY` (a `.env` file is honoured).

use neis_core::{
    generate_key, guide, CoreConfig, IncidentAnalysis, IncidentStore, SchoolLevel,
};
use std::io::Read;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Default)]
struct Args {
    level: Option<String>,
    file: Option<String>,
    teacher: Option<String>,
    student: Option<String>,
}

fn parse_args(mut rest: impl Iterator<Item = String>) -> Args {
    let mut args = Args::default();
    while let Some(a) = rest.next() {
        match a.as_str() {
            "--level" => args.level = rest.next(),
            "--file" => args.file = rest.next(),
            "--teacher" => args.teacher = rest.next(),
            "--student" => args.student = rest.next(),
            other => eprintln!("ignoring unknown argument: {other}"),
        }
    }
    args
}

fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut argv = std::env::args().skip(1);
    let command = argv.next().unwrap_or_default();
    let args = parse_args(argv);

    match command.as_str() {
        "keygen" => {
            println!("{}", generate_key());
            Ok(())
        }
        "record" => record(&args),
        "incidents" => incidents(&args),
        "patterns" => patterns(&args),
        _ => {
            usage();
            Ok(())
        }
    }
}

fn usage() {
    eprintln!("neis-cli: incident guidance records");
    eprintln!("  keygen                                   Print a fresh 64-hex ENCRYPTION_KEY");
    eprintln!("  record --level L [--file F]              Select a template and synthesize the NEIS record");
    eprintln!("                                           (L = elementary|middle|high|all; analysis JSON from F or stdin)");
    eprintln!("  incidents --teacher T [--student S]      List decrypted incidents");
    eprintln!("  patterns --teacher T --student S         Behaviour pattern report for a student");
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> CliResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| format!("{flag} is required").into())
}

fn record(args: &Args) -> CliResult<()> {
    let level: SchoolLevel = match args.level.as_deref() {
        Some(l) => l.parse()?,
        None => CoreConfig::load()?.default_school_level,
    };
    let json = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let analysis: IncidentAnalysis = serde_json::from_str(&json)?;
    let outcome = guide(&analysis, level);
    info!(template = outcome.template.id, level = %level, "record synthesized");
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn incidents(args: &Args) -> CliResult<()> {
    let teacher = required(&args.teacher, "--teacher")?;
    let config = CoreConfig::load()?;
    let store = IncidentStore::from_config(&config)?;
    let list = match args.student.as_deref() {
        Some(student) => store.list_decrypted_for_student(teacher, student)?,
        None => store.list_decrypted_for_teacher(teacher)?,
    };
    info!(count = list.len(), "incidents loaded");
    println!("{}", serde_json::to_string_pretty(&list)?);
    Ok(())
}

fn patterns(args: &Args) -> CliResult<()> {
    let teacher = required(&args.teacher, "--teacher")?;
    let student = required(&args.student, "--student")?;
    let config = CoreConfig::load()?;
    let store = IncidentStore::from_config(&config)?;
    match store.student_patterns(teacher, student)? {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => eprintln!("no incident history for student {student}"),
    }
    Ok(())
}
