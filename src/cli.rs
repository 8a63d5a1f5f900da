use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "bunnyform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative DNS and CDN configuration for bunny.net", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file [default: <config dir>/bunnyform.toml]
    #[arg(long, env = "BUNNYFORM_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the configuration against every resource's rules
    Validate(TargetArgs),

    /// Show what apply would change
    Plan(TargetArgs),

    /// Make the remote match the configuration
    Apply(ApplyArgs),

    /// List managed resources
    State,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this resource type or resource (e.g. `dns`, `dns_record.www`)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this resource type or resource (e.g. `dns`, `dns_record.www`)
    pub target: Option<String>,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Give up on a resource whose entity is locked longer than this (seconds)
    #[arg(long, value_name = "SECS")]
    pub lock_timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "bunnyform",
            "-vv",
            "apply",
            "dns_record.www",
            "--dry-run",
            "-y",
            "-j",
            "8",
            "--lock-timeout",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("dns_record.www"));
        assert!(args.dry_run && args.yes);
        assert_eq!(args.jobs, 8);
        assert_eq!(args.lock_timeout, Some(30));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["bunnyform", "plan", "--config", "~/dns.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("~/dns.toml"));
        assert!(matches!(cli.command, Command::Plan(TargetArgs { target: None })));
    }
}
