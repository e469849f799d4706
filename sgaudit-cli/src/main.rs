use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;

use sgaudit_core::inventory::{self, load_inventory};
use sgaudit_core::{AuditConfig, AuditReport, Check, SecurityGroup, Severity, audit};

#[derive(Parser)]
#[command(name = "sgaudit")]
#[command(about = "Audit security groups for permissions that open all ports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit security groups from DescribeSecurityGroups JSON
    Audit {
        /// Path to the inventory JSON file ("-" reads stdin)
        #[arg(default_value = "-")]
        file: PathBuf,

        /// Output format
        #[arg(long, short, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Path to an audit config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only run these checks (repeatable, overrides the config)
        #[arg(long = "check")]
        checks: Vec<Check>,

        /// Never report this group id (repeatable)
        #[arg(long = "ignore")]
        ignored_groups: Vec<String>,

        /// Exit with code 1 if any finding reaches the config's fail-on severity
        #[arg(long)]
        strict: bool,
    },
    /// List available checks
    Checks,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON report for machine consumption
    Json,
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Audit {
            file,
            format,
            config,
            checks,
            ignored_groups,
            strict,
        } => run_audit(
            &file,
            format,
            config.as_deref(),
            checks,
            ignored_groups,
            strict,
        ),
        Commands::Checks => {
            run_checks();
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "sgaudit", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
}

/// Merge the config file with command line overrides
fn build_config(
    path: Option<&Path>,
    checks: Vec<Check>,
    ignored_groups: Vec<String>,
) -> Result<AuditConfig, String> {
    let mut config = match path {
        Some(path) => AuditConfig::load(path).map_err(|e| e.to_string())?,
        None => AuditConfig::default(),
    };

    if !checks.is_empty() {
        config.checks = checks;
    }
    config.ignored_groups.extend(ignored_groups);

    Ok(config)
}

fn read_groups(file: &Path) -> Result<Vec<SecurityGroup>, String> {
    if file == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        inventory::parse_inventory(&content).map_err(|e| e.to_string())
    } else {
        load_inventory(file).map_err(|e| e.to_string())
    }
}

fn run_audit(
    file: &Path,
    format: OutputFormat,
    config_path: Option<&Path>,
    checks: Vec<Check>,
    ignored_groups: Vec<String>,
    strict: bool,
) -> Result<(), String> {
    let config = build_config(config_path, checks, ignored_groups)?;
    let groups = read_groups(file)?;

    let report = audit(&groups, &config);

    match format {
        OutputFormat::Table => {
            let table = render_table(&report)
                .map_err(|e| format!("Failed to render report: {}", e))?;
            print!("{}", table);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to serialize report: {}", e))?;
            println!("{}", json);
        }
    }

    if strict && report.has_severity_at_least(config.fail_on) {
        let flagged = report.flagged_groups().len();
        return Err(format!(
            "Findings at or above {} severity in {} {}",
            config.fail_on,
            flagged,
            if flagged == 1 { "security group" } else { "security groups" }
        ));
    }

    Ok(())
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    let label = format!("{:<6}", severity.to_string().to_uppercase());
    match severity {
        Severity::High => label.red().bold(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.normal(),
    }
}

fn render_table(report: &AuditReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    if report.is_clean() {
        let noun = if report.groups_audited == 1 {
            "security group"
        } else {
            "security groups"
        };
        writeln!(
            out,
            "{}",
            format!("✓ No findings in {} {}.", report.groups_audited, noun).green()
        )?;
        return Ok(out);
    }

    writeln!(out, "{}", "Security Group Findings:".cyan().bold())?;
    writeln!(out)?;

    for finding in &report.findings {
        writeln!(
            out,
            "  {} {} {} rule #{} ports {}  {}",
            severity_label(finding.severity),
            finding.group_id.as_deref().unwrap_or("-").bold(),
            finding.group_name.as_deref().unwrap_or("-"),
            finding.permission_index,
            finding.port_range,
            finding.check.description().dimmed()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{}", report.summary().to_string().bold())?;
    Ok(out)
}

fn run_checks() {
    println!("{}", "Available checks:".cyan().bold());
    for check in Check::ALL {
        println!(
            "  {:<20} {} {}",
            check.name(),
            severity_label(check.severity()),
            check.description()
        );
    }
}
