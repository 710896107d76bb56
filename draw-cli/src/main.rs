use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use santa_sat::draw::{DrawError, DrawOptions, Orchestrator};
use santa_sat::operator::TerminalOperator;
use santa_sat::participant::{GroupId, ParticipantId, Year};
use santa_sat::sqlite::SqliteStore;
use santa_sat::{Lookback, OracleKind};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "santa-draw")]
#[command(about = "Draw Secret Santa assignments for a gift exchange group")]
#[command(version)]
struct Cli {
    /// SQLite database holding the groups. Asked for when omitted; it must already exist
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a group which has not been drawn this year, asking for the year and clusters
    Draw {
        /// Solver to use: minisat runs an external executable, varisat solves in process
        #[arg(
            long,
            default_value_t = OracleKind::Minisat,
            value_parser = PossibleValuesParser::new(OracleKind::names()).try_map(|name| name.parse::<OracleKind>()),
        )]
        oracle: OracleKind,

        /// Executable run by the minisat oracle
        #[arg(long)]
        oracle_path: Option<PathBuf>,

        /// Past years whose pairs may not repeat: latest, all or years:N
        #[arg(long, default_value = "latest")]
        lookback: Lookback,
    },
    /// Print the recorded pairs of a group for a year
    Show {
        /// Group id
        #[arg(short, long)]
        group: GroupId,

        /// Year drawn
        #[arg(short, long)]
        year: Year,

        /// Only print who this participant buys for
        #[arg(long)]
        giver: Option<ParticipantId>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut operator = TerminalOperator::new(io::stdin().lock(), io::stdout());

    let path = match cli.database {
        Some(path) => path,
        None => operator.ask_database_path()?,
    };
    let mut store = SqliteStore::open_existing(&path).with_context(|| format!("could not open {}", path.display()))?;

    match cli.command {
        Commands::Draw { oracle, oracle_path, lookback } => {
            debug!(%oracle, ?oracle_path, ?lookback, "starting draw");
            let report = Orchestrator::new(&mut store, oracle.build(oracle_path), DrawOptions { lookback }).run(&mut operator)?;
            operator.say(format_args!(
                "Drew {} pairs for {} in {}. Use `santa-draw show --group {} --year {}` to see them.",
                report.pairs.len(), report.group.name, report.year, report.group.id, report.year,
            ))?;
        }
        Commands::Show { group, year, giver: Some(giver) } => {
            match store.recipient_of(giver, group, year)? {
                Some(receiver) => operator.say(receiver)?,
                None => operator.say(format_args!("{giver} has no recipient in group {group} for {year}"))?,
            }
        }
        Commands::Show { group, year, giver: None } => {
            let pairs = store.assignments(group, year)?;
            if pairs.is_empty() {
                operator.say(format_args!("group {group} has no draw for {year}"))?;
            }
            for pair in pairs {
                operator.say(pair)?;
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(err.downcast_ref::<DrawError>().map_or(3, DrawError::exit_code))
        }
    }
}
