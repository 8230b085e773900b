use clap::Parser;
use extdiff_common::{load_config, CommandTemplate, ExtdiffError};
use extdiff_core::{stage_and_invoke, ChangeEnumerator};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extdiff")]
#[command(author = "Extdiff Contributors")]
#[command(version = "0.1.0")]
#[command(
    about = "Compare two files or directory trees with an external program",
    long_about = None
)]
struct Cli {
    /// The base file or directory
    #[arg(required_unless_present = "list_tools")]
    a: Option<PathBuf>,

    /// The changed file or directory
    #[arg(required_unless_present = "list_tools")]
    b: Option<PathBuf>,

    /// The named external program to use (default diff)
    program: Option<String>,

    /// Custom command arguments; in each argument, {a} and {b} are replaced
    /// with the two staging directory paths
    #[arg(short, long, num_args = 1.., allow_hyphen_values = true)]
    command: Option<Vec<String>>,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// List the available named tools and exit
    #[arg(long)]
    list_tools: bool,

    /// Output a session report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    // Logs to stderr so pass-through and JSON output go cleanly to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run_diff(cli) {
        error!("extdiff failed: {}", e);
        // a cleanup failure on an otherwise successful run is reported but
        // does not turn the exit code into a failure
        if !matches!(
            e.downcast_ref::<ExtdiffError>(),
            Some(ExtdiffError::Cleanup(_))
        ) {
            std::process::exit(1);
        }
    }
}

fn run_diff(cli: Cli) -> anyhow::Result<()> {
    let loaded = load_config(false)?;
    let mut config = loaded.config;

    if !cli.ignore.is_empty() {
        config.ignore_patterns.extend(cli.ignore.clone());
    }
    if cli.follow_symlinks {
        config.follow_symlinks = true;
    }

    let registry = config.tool_registry();

    if cli.list_tools {
        for (name, template) in registry.iter() {
            println!("{:<12} {}", name, template.args.join(" "));
        }
        return Ok(());
    }

    // positionals are guaranteed present unless --list-tools was given
    let (Some(a), Some(b)) = (cli.a.clone(), cli.b.clone()) else {
        return Err(ExtdiffError::Config("missing comparison paths".to_string()).into());
    };

    if !a.exists() {
        return Err(ExtdiffError::Path(format!("Base path does not exist: {}", a.display())).into());
    }
    if !b.exists() {
        return Err(
            ExtdiffError::Path(format!("Changed path does not exist: {}", b.display())).into(),
        );
    }

    let template = match &cli.command {
        Some(args) => CommandTemplate::new(args.clone()),
        None => {
            let name = cli.program.as_deref().unwrap_or("diff");
            registry
                .get(name)
                .cloned()
                .ok_or_else(|| ExtdiffError::UnknownTool(name.to_string()))?
        }
    };

    info!("Comparing {} against {}", a.display(), b.display());

    let set = ChangeEnumerator::new(config).enumerate(&a, &b)?;

    // files that exist on only one side are reported, never staged
    if !cli.json {
        for note in &set.notes {
            println!("{note}");
        }
    }

    let tool_status = stage_and_invoke(&set.entries, &template)?;

    if cli.json {
        let report = JsonReport {
            a: a.to_string_lossy().to_string(),
            b: b.to_string_lossy().to_string(),
            changed: set
                .entries
                .iter()
                .map(|e| e.left_rel.to_string_lossy().to_string())
                .collect(),
            notes: set.notes,
            tool_status,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonReport {
    a: String,
    b: String,
    changed: Vec<String>,
    notes: Vec<String>,
    tool_status: Option<i32>,
}
