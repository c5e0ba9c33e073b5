//! droidplan CLI
//!
//! Resolve Android/Flutter build descriptors into validated build plans.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use droidplan_android::gradle::{self, Invocation};
use droidplan_android::{resolve_plan, validate, DescriptorSource, Environment, ResolveError, Resolver};
use droidplan_cli::output::{format_count, format_duration, report_violations, Status};
use droidplan_core::config::{Config, EngineKind};
use droidplan_core::error::{exit_codes, Error};
use droidplan_core::process;
use droidplan_telemetry::{TelemetryConfig, Timer};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "droidplan")]
#[command(about = "Resolve Android/Flutter build descriptors into validated build plans")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Build descriptor path (overrides [descriptor] path)
    #[arg(short, long, global = true, env = "DROIDPLAN_DESCRIPTOR")]
    descriptor: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the descriptor and list every violation
    Validate {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve the descriptor into a build plan
    Plan {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: PlanFormat,
        /// Write the plan to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve, then hand the plan to the build engine
    Build {
        /// Build variant
        #[arg(long, default_value = "release")]
        variant: String,
        /// Print the engine command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Diagnose environment
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanFormat {
    Json,
    Toml,
}

/// Everything a command needs, built once in `main`
struct Context {
    config: Config,
    source: DescriptorSource,
    descriptor_path: PathBuf,
    env: Environment,
    quiet: bool,
}

impl Context {
    fn resolver(&self) -> Resolver {
        Resolver::from_config(&self.config.schema)
    }

    fn info(&self, message: &str) {
        if !self.quiet {
            Status::info(message);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            Status::error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    droidplan_telemetry::init_with_config(TelemetryConfig::from_cli(
        &config.schema.logging,
        cli.verbose,
        cli.quiet,
    ))?;

    let descriptor_path = cli
        .descriptor
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.schema.descriptor.path));

    let ctx = Context {
        config,
        source: DescriptorSource::File(descriptor_path.clone()),
        descriptor_path,
        env: Environment::from_process(),
        quiet: cli.quiet,
    };

    let exit_code = match cli.command {
        Commands::Validate { json } => run_validate(&ctx, json),
        Commands::Plan { format, output } => run_plan(&ctx, format, output.as_deref()),
        Commands::Build { variant, dry_run } => run_build(&ctx, &variant, dry_run),
        Commands::Doctor => run_doctor(&ctx),
    };

    std::process::exit(exit_code);
}

fn fail(e: &Error) -> i32 {
    Status::error(&e.to_string());
    e.exit_code()
}

fn run_validate(ctx: &Context, json: bool) -> i32 {
    let descriptor = match ctx.resolver().load(&ctx.source, &ctx.env) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let report = validate(&descriptor);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => return fail(&Error::from(e)),
        }
    } else {
        report_violations(&report);
    }

    if report.is_valid() {
        if !json {
            ctx.info(&format!(
                "{} valid ({})",
                ctx.descriptor_path.display(),
                format_count(report.warnings().len(), "warning", "warnings")
            ));
        }
        exit_codes::SUCCESS
    } else {
        if !json {
            Status::error(&format!(
                "{} rejected",
                format_count(report.errors().len(), "violation", "violations")
            ));
        }
        exit_codes::VALIDATION_ERROR
    }
}

fn run_plan(ctx: &Context, format: PlanFormat, output: Option<&Path>) -> i32 {
    let timer = Timer::start("resolve");
    let (plan, report) = match ctx.resolver().resolve(&ctx.source, &ctx.env) {
        Ok(resolved) => resolved,
        Err(ResolveError::Load(e)) => return fail(&e),
        Err(ResolveError::Rejected(report)) => {
            report_violations(&report);
            Status::error(&format!(
                "No plan produced: {}",
                format_count(report.errors().len(), "violation", "violations")
            ));
            return exit_codes::VALIDATION_ERROR;
        }
    };
    let elapsed = timer.stop();
    report_violations(&report);

    let rendered = match format {
        PlanFormat::Json => plan.to_json(),
        PlanFormat::Toml => plan.to_toml(),
    };
    let rendered = match rendered {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &rendered) {
                return fail(&Error::from(e));
            }
            let digest = plan.digest().unwrap_or_default();
            ctx.info(&format!(
                "Plan written to {} in {} (sha256 {})",
                path.display(),
                format_duration(elapsed),
                digest
            ));
        }
        None => println!("{}", rendered),
    }

    exit_codes::SUCCESS
}

fn run_build(ctx: &Context, variant: &str, dry_run: bool) -> i32 {
    let resolver = ctx.resolver();
    let descriptor = match resolver.load(&ctx.source, &ctx.env) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let report = validate(&descriptor);
    report_violations(&report);
    if !report.is_valid() {
        Status::error("Refusing to build from an invalid descriptor");
        return exit_codes::VALIDATION_ERROR;
    }

    let plan = resolve_plan(&descriptor);
    let engine = &ctx.config.schema.engine;
    let invocation = match Invocation::for_variant(
        &plan,
        variant,
        engine,
        &ctx.config.schema.env,
        descriptor.signing.as_ref(),
    ) {
        Ok(inv) => inv,
        Err(e) => return fail(&e),
    };

    if dry_run {
        println!("{}", invocation.command_line());
        for name in invocation.env_names() {
            println!("  env {}=<redacted>", name);
        }
        return exit_codes::SUCCESS;
    }

    let project_dir = engine
        .project_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    ctx.info(&format!("Building {} with {}...", variant, invocation.program));
    match invocation.run(&project_dir) {
        Ok(()) => {
            Status::success("Build succeeded");
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_doctor(ctx: &Context) -> i32 {
    let mut healthy = true;

    Status::header("Environment Check");

    if ctx.descriptor_path.exists() {
        Status::success(&format!("descriptor: {}", ctx.descriptor_path.display()));
    } else {
        Status::error(&format!("descriptor: {} not found", ctx.descriptor_path.display()));
        healthy = false;
    }

    match ctx.config.path.as_ref() {
        Some(path) => Status::success(&format!("config: {}", path.display())),
        None => Status::info("config: defaults (no .droidplan.toml)"),
    }

    let engine = &ctx.config.schema.engine;
    match engine.kind {
        EngineKind::Flutter => match process::which_command("flutter") {
            Some(path) => {
                let version = process::run_command("flutter", &["--version"])
                    .ok()
                    .and_then(|r| r.stdout.lines().next().map(str::to_string))
                    .unwrap_or_else(|| path.display().to_string());
                Status::success(&format!("flutter: {}", version));
            }
            None => {
                Status::error("flutter: not found");
                healthy = false;
            }
        },
        EngineKind::Gradle => {
            let dir = PathBuf::from(engine.project_dir.as_deref().unwrap_or("."));
            let wrapper = dir.join(gradle::gradle_wrapper());
            if wrapper.exists() {
                Status::success(&format!("gradle wrapper: {}", wrapper.display()));
            } else {
                Status::error(&format!("gradle wrapper: {} not found", wrapper.display()));
                healthy = false;
            }
        }
    }

    if process::command_exists("java") {
        Status::success("java: installed");
    } else {
        Status::warning("java: not found");
    }

    match ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
        .iter()
        .find_map(|name| ctx.env.non_empty(name).map(|v| (*name, v)))
    {
        Some((name, value)) => Status::success(&format!("{}: {}", name, value)),
        None => Status::warning("ANDROID_HOME: not set"),
    }

    let names = &ctx.config.schema.env;
    for var in [&names.store_file, &names.store_password, &names.key_alias, &names.key_password] {
        if ctx.env.non_empty(var).is_some() {
            Status::success(&format!("{}: set", var));
        } else {
            Status::info(&format!("{}: not set", var));
        }
    }

    tracing::debug!(healthy, "Doctor finished");
    if healthy {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}
