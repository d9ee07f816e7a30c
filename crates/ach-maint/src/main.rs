use ach_core::{EngineConfig, ReconciliationSweep, SweepReport};
use ach_maint::{run_simulator, telemetry, SimulatorConfig};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("ach-maint")
        .version(ach_core::VERSION)
        .about("Achievement ledger maintenance")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Default tracing filter when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Race concurrent reviewers against in-memory stores")
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .default_value("100")
                        .value_parser(value_parser!(usize))
                        .help("Number of achievements to race"),
                )
                .arg(
                    Arg::new("reviewers")
                        .long("reviewers")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent reviewers per race"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("sweep")
                .about("Reconcile documents against the reference ledger")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine config file (TOML)"),
                )
                .arg(
                    Arg::new("database-url")
                        .long("database-url")
                        .env("DATABASE_URL")
                        .help("Postgres connection string"),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .value_parser(value_parser!(usize))
                        .help("Override sweep.batch_size"),
                )
                .arg(
                    Arg::new("grace-secs")
                        .long("grace-secs")
                        .value_parser(value_parser!(u64))
                        .help("Override sweep.grace_period_secs"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report what would change without writing"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Validate a config file and print the effective settings")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    telemetry::init(level, matches.get_flag("log-json"))?;

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args).await,
        Some(("sweep", args)) => sweep(args).await,
        Some(("config", args)) => check_config(args),
        _ => unreachable!("subcommand_required"),
    }
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let config = SimulatorConfig {
        rounds: args.get_one::<usize>("rounds").copied().unwrap_or(100),
        reviewers: args.get_one::<usize>("reviewers").copied().unwrap_or(4),
        stop_on_first_violation: args.get_flag("stop-on-violation"),
    };
    tracing::info!(rounds = config.rounds, reviewers = config.reviewers, "starting simulator");

    let report = run_simulator(config).await.context("simulator aborted")?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }

    std::process::exit(if report.passed() { 0 } else { 1 });
}

fn load_config(args: &ArgMatches) -> anyhow::Result<EngineConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(size) = args.get_one::<usize>("batch-size") {
        config.sweep = config.sweep.with_batch_size(*size);
    }
    if let Some(secs) = args.get_one::<u64>("grace-secs") {
        config.sweep = config.sweep.with_grace_period_secs(*secs);
    }
    config.validate()?;
    Ok(config)
}

async fn sweep(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let dry_run = args.get_flag("dry-run");
    let url = args
        .get_one::<String>("database-url")
        .context("--database-url or DATABASE_URL is required")?;

    let report = run_sweep(url, &config, dry_run).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed > 0 {
        anyhow::bail!("{} documents could not be reconciled", report.failed);
    }
    Ok(())
}

#[cfg(feature = "postgres")]
async fn run_sweep(url: &str, config: &EngineConfig, dry_run: bool) -> anyhow::Result<SweepReport> {
    use ach_core::Stores;
    use ach_store::postgres::PostgresAchievementStore;
    use std::sync::Arc;

    let store = Arc::new(
        PostgresAchievementStore::connect(url)
            .await
            .context("connecting to postgres")?,
    );
    let stores = Stores {
        documents: store.clone(),
        ledger: store.clone(),
        history: store.clone(),
        notifications: store.clone(),
        directory: store,
    };

    let sweep = ReconciliationSweep::new(&stores, config.sweep);
    Ok(sweep.run(chrono::Utc::now(), dry_run).await?)
}

#[cfg(not(feature = "postgres"))]
async fn run_sweep(
    _url: &str,
    _config: &EngineConfig,
    _dry_run: bool,
) -> anyhow::Result<SweepReport> {
    anyhow::bail!("ach-maint was built without the `postgres` feature")
}

fn check_config(args: &ArgMatches) -> anyhow::Result<()> {
    let path = args
        .get_one::<PathBuf>("path")
        .context("config path is required")?;
    let config =
        EngineConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
