//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use podbench_core::{
    ConnectionProvider, CycleMode, DriverBuilder, RunConfig, ShutdownCoordinator, UnitTemplate,
};
use podbench_kube::{KubeConnector, PodExecutor, PodLifecycleClient};

/// podbench - load generator for pod create, exec and delete
#[derive(Parser, Debug)]
#[command(name = "podbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run settings, accepted before or after the subcommand
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the benchmark (default)
    Run,
    /// Validate the configuration and print it
    Validate,
}

/// Cycle mode as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// One cycle per worker
    Single,
    /// Cycle until interrupted or the duration elapses
    Repeat,
}

impl From<ModeArg> for CycleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => CycleMode::Single,
            ModeArg::Repeat => CycleMode::Repeat,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of concurrent workers, one pod each
    #[arg(long, global = true, env = "CONCURRENT_PODS", default_value_t = 10)]
    pub pods: usize,

    /// Run one cycle per worker or repeat until stopped
    #[arg(
        long,
        global = true,
        env = "CYCLE_MODE",
        value_enum,
        default_value_t = ModeArg::Single
    )]
    pub mode: ModeArg,

    /// Stop starting new cycles after this many seconds
    #[arg(long, global = true, env = "RUN_DURATION_SECS")]
    pub duration_secs: Option<u64>,

    /// Readiness poll interval in milliseconds
    #[arg(long, global = true, env = "READY_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Give up on readiness after this many seconds (0 waits forever)
    #[arg(long, global = true, env = "READY_TIMEOUT_SECS", default_value_t = 120)]
    pub ready_timeout_secs: u64,

    /// Namespace pods are created in
    #[arg(long, global = true, env = "POD_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Container image
    #[arg(long, global = true, env = "POD_IMAGE", default_value = "nginx:latest")]
    pub image: String,

    /// Service account the pods run as
    #[arg(long, global = true, env = "POD_SERVICE_ACCOUNT")]
    pub service_account: Option<String>,

    /// Prefix for generated pod names
    #[arg(long, global = true, env = "POD_NAME_PREFIX", default_value = "podbench")]
    pub name_prefix: String,

    /// Command executed in every pod, split on whitespace
    #[arg(long, global = true, env = "EXEC_COMMAND", default_value = "ls")]
    pub command: String,

    /// Kubeconfig used outside a cluster, a path list is merged (default: ~/.kube/config)
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Also write the report as JSON to this path
    #[arg(long, global = true, env = "REPORT_JSON")]
    pub report_json: Option<PathBuf>,
}

impl RunArgs {
    /// Library configuration for these arguments
    pub fn to_run_config(&self) -> RunConfig {
        let mut template = UnitTemplate::new(self.image.clone());
        if let Some(account) = &self.service_account {
            template = template.with_service_account(account.clone());
        }

        let ready_timeout = match self.ready_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let mut config = RunConfig::new(self.pods)
            .with_mode(self.mode.into())
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_ready_timeout(ready_timeout)
            .with_command(self.command.split_whitespace())
            .with_name_prefix(self.name_prefix.clone())
            .with_template(template);
        if let Some(secs) = self.duration_secs {
            config = config.with_duration(Duration::from_secs(secs));
        }
        config
    }
}

impl Cli {
    /// Dispatch to the selected command
    pub async fn run(self) -> Result<()> {
        match self.command {
            None | Some(Commands::Run) => run_benchmark(self.run).await,
            Some(Commands::Validate) => validate(&self.run),
        }
    }
}

fn validate(args: &RunArgs) -> Result<()> {
    let config = args.to_run_config();
    config.validate().context("Invalid configuration")?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("namespace: {}", args.namespace);
    println!("Configuration is valid");
    Ok(())
}

async fn run_benchmark(args: RunArgs) -> Result<()> {
    let config = args.to_run_config();
    config.validate().context("Invalid configuration")?;

    println!("\n{}", "=".repeat(70));
    println!("   podbench - pod lifecycle load generator");
    println!("{}", "=".repeat(70));
    println!();
    println!("Configuration:");
    println!("  Pods:          {}", config.slots);
    println!("  Mode:          {:?}", config.mode);
    println!("  Namespace:     {}", args.namespace);
    println!("  Image:         {}", config.template.image);
    println!("  Command:       {}", config.command.join(" "));
    match config.duration {
        Some(d) => println!("  Duration:      {}s", d.as_secs()),
        None => println!("  Duration:      unbounded"),
    }
    println!("{}", "=".repeat(70));
    println!();

    let mut connector = KubeConnector::new();
    if let Some(path) = &args.kubeconfig {
        connector = connector.with_kubeconfig(path.clone());
    }
    let client = connector
        .connect()
        .await
        .context("Failed to connect to the cluster")?;

    let lifecycle = Arc::new(PodLifecycleClient::new(client.clone(), args.namespace.clone()));
    let executor = Arc::new(PodExecutor::new(client, &args.namespace));

    let duration = config.duration;
    let driver = DriverBuilder::new()
        .config(config)
        .lifecycle(lifecycle)
        .executor(executor)
        .build()?;

    let shutdown = ShutdownCoordinator::start(duration);
    let report = driver.run_with_shutdown(&shutdown).await?;

    println!();
    println!("{report}");

    if let Some(path) = &args.report_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
