//! Command-line entry point: synthesizes one deploy IAM stack from
//! environment configuration and prints its CloudFormation template.

use std::convert::Infallible;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use deploy_iam_synth::{flag_enabled, synthesize, StackKind, SynthConfig};
use log::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "deploy-iam", version, about)]
#[command(
    long_about = "Synthesize CloudFormation templates for the IAM users, groups and roles that deploy pipelines run as"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize a stack template
    Synth(SynthArgs),
    /// List the stacks that can be synthesized and the variables they read
    ListStacks,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StackArg {
    /// eventbridge-iam: publisher user for one event source
    Eventbridge,
    /// serverless-deploy-iam: deploy user and service role for a Serverless service
    Serverless,
    /// stack-deploy-iam: deploy user for a CDK stack
    Stack,
}

impl From<StackArg> for StackKind {
    fn from(value: StackArg) -> Self {
        match value {
            StackArg::Eventbridge => Self::EventBridge,
            StackArg::Serverless => Self::ServerlessDeploy,
            StackArg::Stack => Self::StackDeploy,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SynthArgs {
    /// Stack to synthesize
    #[arg(value_enum)]
    stack: StackArg,

    /// Event source the publisher user may put events for
    #[arg(long, env = "EVENT_SOURCE")]
    event_source: Option<String>,

    /// Serverless service name
    #[arg(long, env = "SERVICE_NAME")]
    service_name: Option<String>,

    /// Prefix for exported output names (defaults to the service name)
    #[arg(long, env = "EXPORT_PREFIX")]
    export_prefix: Option<String>,

    /// Grant security-group permissions for a shared VPC ("1" enables)
    #[arg(
        long,
        env = "ENABLE_VPC_PERMISSIONS",
        action = ArgAction::Set,
        value_parser = parse_flag,
        default_value = "0",
        value_name = "FLAG"
    )]
    enable_vpc_permissions: bool,

    /// Hash of the qualifier parameter values, used as their default
    #[arg(long, env = "PARAMETER_HASH")]
    parameter_hash: Option<String>,

    /// Name of the CDK stack to deploy
    #[arg(long, env = "STACK_NAME")]
    stack_name: Option<String>,

    /// Comma-separated JSON files holding extra policy statements
    #[arg(long = "custom-policy", env = "CUSTOM_POLICY", value_delimiter = ',')]
    custom_policy: Vec<String>,

    /// Write the template to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,
}

fn parse_flag(value: &str) -> Result<bool, Infallible> {
    Ok(flag_enabled(value))
}

impl SynthArgs {
    fn config(&self) -> SynthConfig {
        SynthConfig {
            event_source: self.event_source.clone(),
            service_name: self.service_name.clone(),
            export_prefix: self.export_prefix.clone(),
            enable_vpc_permissions: self.enable_vpc_permissions,
            parameter_hash: self.parameter_hash.clone(),
            stack_name: self.stack_name.clone(),
            custom_policy_paths: self
                .custom_policy
                .iter()
                .map(|path| path.trim())
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .collect(),
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn run_synth(args: &SynthArgs) -> Result<()> {
    let kind = StackKind::from(args.stack);
    let config = args.config();
    debug!("Configuration: {:?}", config);

    let stack = synthesize(kind, &config).with_context(|| format!("Failed to synthesize {}", kind))?;
    info!("Stack name: {}", stack.stack_name);

    let rendered = stack
        .template
        .to_json(!args.compact)
        .context("Failed to render template")?;

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", rendered))
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            info!("Template written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", rendered).context("Failed to write template to stdout")?;
        }
    }
    Ok(())
}

fn list_stacks() -> Result<()> {
    let mut stdout = io::stdout().lock();
    for kind in StackKind::ALL {
        writeln!(stdout, "{}\t{}", kind, kind.variables().join(","))
            .context("Failed to write stack list")?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Synth(args) => run_synth(args),
        Commands::ListStacks => list_stacks(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
