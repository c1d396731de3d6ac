use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use churnmap_core::{window_start, ChurnmapConfig, OutputFormat, CONFIG_FILE_NAME};
use churnmap_gitpulse::analysis::{AnalysisReport, Analyzer};
use churnmap_gitpulse::mining::{mine_history, MiningOptions};
use churnmap_gitpulse::paths::abbreviate;
use churnmap_gitpulse::sizes::DiskSizes;
use churnmap_store::store::HistoryStore;

#[derive(Parser)]
#[command(
    name = "churnmap",
    version,
    about = "Find risky code from git history",
    long_about = "Churnmap mines git history to find hotspots: files that change often,\n\
                   are large, and changed recently. It rolls churn up by directory and flags\n\
                   hotspots that only one person has touched lately.\n\n\
                   Examples:\n  \
                     churnmap analyze                       Mine (if needed) and report everything\n  \
                     churnmap analyze --analysis hotspots   Top hotspots only\n  \
                     churnmap analyze --refresh             Re-mine history before analyzing\n  \
                     churnmap mine --path ../other-repo     Store history for another repo\n  \
                     churnmap init                          Create a .churnmap.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .churnmap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract git history into the local database
    #[command(long_about = "Extract git history into the local database.\n\n\
        Walks the commit history with libgit2 and stores one row per changed file,\n\
        replacing anything stored before.\n\n\
        Examples:\n  churnmap mine\n  churnmap mine --path ../service --since 365")]
    Mine {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Only mine commits from the last N days (default: full history)
        #[arg(long)]
        since: Option<u64>,
    },
    /// Score hotspots, roll up directories, and check bus factor
    #[command(
        long_about = "Score hotspots, roll up directories, and check bus factor.\n\n\
        Mines history first when the database is empty or --refresh is given, then\n\
        stores the results back into the database.\n\n\
        Examples:\n  churnmap analyze\n  churnmap analyze --analysis bus-factor --window 180\n  churnmap analyze --analysis directories --depth 3"
    )]
    Analyze {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Analysis type
        #[arg(long, default_value = "all")]
        analysis: HistoryAnalysis,

        /// Maximum results to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Directory depth for the rollup; 0 keeps full directories
        #[arg(long)]
        depth: Option<usize>,

        /// Only count commits from the last N days
        #[arg(long)]
        since: Option<u64>,

        /// Bus factor window in days (default: 365)
        #[arg(long)]
        window: Option<u32>,

        /// Re-mine history even if the database has rows
        #[arg(long)]
        refresh: bool,
    },
    /// Create a default .churnmap.toml configuration file
    #[command(long_about = "Create a default .churnmap.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .churnmap.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HistoryAnalysis {
    /// Rank files by change frequency, size, and age
    Hotspots,
    /// Sum commits per directory
    Directories,
    /// Count commits per author
    Authors,
    /// Find hotspots with a single recent author
    BusFactor,
    /// Run all analyses
    All,
}

impl HistoryAnalysis {
    fn shows(self, section: HistoryAnalysis) -> bool {
        self == HistoryAnalysis::All || self == section
    }
}

const DEFAULT_CONFIG: &str = r#"# Churnmap Configuration

[scoring]
# Files need more than this many commits to be scored
# min_commits = 2
# Files changed within this many days score linearly, older ones decay
# recent_days = 180

[bus_factor]
# window_days = 365
# excluded_authors = ["GitHub"]

[sizes]
# Extensions that are never treated as code
# exclude_extensions = ["md", "lock", "jpg", "jpeg", "png", "gif", "yaml", "yml", "json", "xml", "scss"]

[history]
# branch = "main"
# exclude_paths = ["*.lock", "vendor/**"]
# max_files_per_commit = 50

[rollup]
# depth = 2

[database]
# path = ".churnmap/history.db"
"#;

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn ensure_git_repo(path: &Path) -> Result<()> {
    if !path.join(".git").exists() && git2::Repository::discover(path).is_err() {
        miette::bail!(miette::miette!(
            help = "Run churnmap from inside a git repository, or specify --path to one",
            "Not a git repository: {}",
            path.display()
        ));
    }
    Ok(())
}

fn database_path(repo: &Path, config: &ChurnmapConfig) -> PathBuf {
    if config.database.path.is_absolute() {
        config.database.path.clone()
    } else {
        repo.join(&config.database.path)
    }
}

fn spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn mine_into(
    store: &mut HistoryStore,
    path: &Path,
    config: &ChurnmapConfig,
    since: Option<u64>,
) -> Result<usize> {
    let options = MiningOptions {
        since_days: since,
        ..MiningOptions::from_config(config)?
    };

    eprintln!("Mining git history at {}...", path.display());
    let pb = spinner("Walking commits...");
    let rows = mine_history(path, &options).inspect_err(|_e| {
        if let Some(pb) = &pb {
            pb.finish_with_message("Failed");
        }
    })?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    store.replace_commits(&rows)?;
    Ok(rows.len())
}

fn print_json(report: &AnalysisReport, analysis: HistoryAnalysis, limit: usize) -> Result<()> {
    let mut json = serde_json::Map::new();

    if analysis.shows(HistoryAnalysis::Hotspots) {
        let top: Vec<_> = report.hotspots.iter().take(limit).collect();
        json.insert(
            "hotspots".into(),
            serde_json::to_value(&top).into_diagnostic()?,
        );
    }
    if analysis.shows(HistoryAnalysis::Directories) {
        json.insert(
            "directories".into(),
            serde_json::to_value(&report.directories).into_diagnostic()?,
        );
    }
    if analysis.shows(HistoryAnalysis::Authors) {
        let top: Vec<_> = report
            .authors
            .iter()
            .take(limit)
            .map(|(author, commits)| serde_json::json!({ "author": author, "commits": commits }))
            .collect();
        json.insert("authors".into(), serde_json::Value::from(top));
    }
    if analysis.shows(HistoryAnalysis::BusFactor) {
        json.insert(
            "busFactor".into(),
            serde_json::to_value(&report.bus_factor).into_diagnostic()?,
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(json)).into_diagnostic()?
    );
    Ok(())
}

fn print_markdown(report: &AnalysisReport, analysis: HistoryAnalysis, limit: usize) {
    println!("# Git History Analysis\n");

    if analysis.shows(HistoryAnalysis::Hotspots) {
        println!("## Hotspots\n");
        if report.hotspots.is_empty() {
            println!("No hotspots detected.\n");
        } else {
            println!("| Rank | File | Score | Commits | Size | Age (days) |");
            println!("|------|------|-------|---------|------|------------|");
            for (i, h) in report.hotspots.iter().take(limit).enumerate() {
                println!(
                    "| {} | `{}` | {:.1} | {} | {} | {} |",
                    i + 1,
                    h.file,
                    h.score,
                    h.commits,
                    h.complexity,
                    h.age_days,
                );
            }
            println!();
        }
    }

    if analysis.shows(HistoryAnalysis::Directories) {
        println!("## Directories\n");
        println!("| Directory | Commits |");
        println!("|-----------|---------|");
        for (dir, total) in report.directories.ranked().into_iter().take(limit) {
            let dir = if dir.is_empty() { "." } else { dir };
            println!("| `{dir}` | {total} |");
        }
        println!();
    }

    if analysis.shows(HistoryAnalysis::Authors) {
        println!("## Authors\n");
        for (author, commits) in report.authors.iter().take(limit) {
            println!("- **{author}**: {commits} commits");
        }
        println!();
    }

    if analysis.shows(HistoryAnalysis::BusFactor) {
        println!(
            "## Bus Factor (last {} days)\n",
            report.bus_factor.window_days
        );
        let single = report.bus_factor.single_owner();
        if single.is_empty() {
            println!("No single-owner hotspots.\n");
        } else {
            for (file, author) in single.iter().take(limit) {
                println!("- `{file}`: only **{author}**");
            }
            println!();
        }
    }
}

fn print_text(report: &AnalysisReport, analysis: HistoryAnalysis, limit: usize) {
    if analysis.shows(HistoryAnalysis::Hotspots) {
        println!("Hotspots (top {limit}):");
        println!("{:-<72}", "");
        if report.hotspots.is_empty() {
            println!("  No hotspots detected.");
        }
        for (i, h) in report.hotspots.iter().take(limit).enumerate() {
            println!(
                "{:>2}. {:<40} score={:.1}  commits={}  size={}  age={}d",
                i + 1,
                abbreviate(&h.file),
                h.score,
                h.commits,
                h.complexity,
                h.age_days,
            );
        }
        println!();
    }

    if analysis.shows(HistoryAnalysis::Directories) {
        println!(
            "Directories ({} total):",
            report.directories.directory_count
        );
        println!("{:-<72}", "");
        for (dir, total) in report.directories.ranked().into_iter().take(limit) {
            let dir = if dir.is_empty() { "." } else { dir };
            println!("  {:<50} {total}", abbreviate(dir));
        }
        println!();
    }

    if analysis.shows(HistoryAnalysis::Authors) {
        println!("Authors:");
        println!("{:-<72}", "");
        for (author, commits) in report.authors.iter().take(limit) {
            println!("  {author:<40} {commits}");
        }
        println!();
    }

    if analysis.shows(HistoryAnalysis::BusFactor) {
        println!(
            "Bus Factor (last {} days):",
            report.bus_factor.window_days
        );
        println!("{:-<72}", "");
        let entries = report.bus_factor.entries();
        if entries.is_empty() {
            println!("  No recent activity on hotspots.");
        }
        for entry in entries.iter().take(limit) {
            let marker = if entry.is_single_owner() {
                "  [single owner]"
            } else {
                ""
            };
            let authors: Vec<&str> = entry.authors.iter().map(String::as_str).collect();
            println!(
                "  {:<40} {}{marker}",
                abbreviate(&entry.file),
                authors.join(", ")
            );
        }
        println!();
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ChurnmapConfig::resolve(cli.config.as_deref(), Path::new("."))?;
    log::info!("format: {}", cli.format);

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Mine { ref path, since }) => {
            ensure_git_repo(path)?;
            let mut store = HistoryStore::open(&database_path(path, &config))?;
            mine_into(&mut store, path, &config, since)?;

            let stats = store.stats()?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# History Mined\n");
                    println!("- **Rows:** {}", stats.commit_rows);
                    println!("- **Commits:** {}", stats.distinct_commits);
                    println!("- **Files:** {}", stats.distinct_files);
                }
                OutputFormat::Text => {
                    println!(
                        "Stored {} rows ({} commits, {} files).",
                        stats.commit_rows, stats.distinct_commits, stats.distinct_files
                    );
                }
            }
        }
        Some(Command::Analyze {
            ref path,
            analysis,
            limit,
            depth,
            since,
            window,
            refresh,
        }) => {
            ensure_git_repo(path)?;

            let mut config = config.clone();
            if let Some(depth) = depth {
                config.rollup.depth = if depth == 0 { None } else { Some(depth) };
            }
            if let Some(window) = window {
                config.bus_factor.window_days = i64::from(window);
            }

            let mut store = HistoryStore::open(&database_path(path, &config))?;
            if refresh || store.commit_count()? == 0 {
                let mined = mine_into(&mut store, path, &config, None)?;
                eprintln!("Stored {mined} rows.");
            }

            let now = Utc::now();
            let mut analyzer = Analyzer::new(&config);
            if let Some(threshold) = since
                .and_then(|days| i64::try_from(days).ok())
                .and_then(|days| window_start(now, days))
            {
                analyzer = analyzer.since(threshold);
            }

            let sizes = DiskSizes::new(&config.sizes);
            let report = analyzer.run(&store, &sizes, path, now)?;
            report.persist(&mut store)?;
            log::info!(
                "{} hotspots, {} single-owner",
                report.hotspots.len(),
                report.bus_factor.single_owner().len()
            );

            match cli.format {
                OutputFormat::Json => print_json(&report, analysis, limit)?,
                OutputFormat::Markdown => print_markdown(&report, analysis, limit),
                OutputFormat::Text => print_text(&report, analysis, limit),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!(miette::miette!(
                    help = "Edit the existing file or remove it first",
                    "{CONFIG_FILE_NAME} already exists"
                ));
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "churnmap", &mut std::io::stdout());
        }
    }

    Ok(())
}
