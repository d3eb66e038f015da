use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rtc_engine_sdk::parameters::ParametersCommand;
use rtc_engine_sdk::{
    engine_version, init_logging, EngineConfig, EngineContext, ParameterBus, ParameterHandle,
    RtcEngine,
};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(
    name = "rtc_param",
    about = "Drive the RTC engine parameter bus from the command line"
)]
struct Cli {
    /// Engine config file (defaults to $RTC_ENGINE_CONFIG or assets/rtc_engine.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log engine activity to stderr
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the SDK version and build number
    Version,
    /// Apply settings and print the resulting settings surface
    Apply(ApplyArgs),
    /// Apply settings, then read one key with a typed getter
    Get {
        #[arg(long)]
        key: String,
        #[arg(long = "type", value_enum, default_value_t = ValueKind::String)]
        kind: ValueKind,
        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(Args, Debug)]
struct ApplyArgs {
    #[arg(long, default_value = "rtc-param-cli")]
    app_id: String,
    /// JSON profile file applied first
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Overlay the profile instead of replacing the settings surface
    #[arg(long)]
    merge: bool,
    /// `key=value` pair; the value is JSON, or a plain string when it does not parse
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// JSON object passed to set_parameters as-is
    #[arg(long)]
    parameters: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ValueKind {
    Bool,
    Int,
    Uint,
    Number,
    String,
    Object,
    Array,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        init_logging(tracing::Level::DEBUG);
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::load(),
    };

    match cli.command {
        Commands::Version => {
            let (version, build) = engine_version();
            println!("rtc_param {version} (build {build:#08x})");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply(args) => run_apply(config, &args),
        Commands::Get { key, kind, apply } => run_get(config, &apply, &key, kind),
    }
}

fn run_apply(config: EngineConfig, args: &ApplyArgs) -> Result<ExitCode> {
    let engine = prepared_engine(config, args)?;
    let profile = engine.profile().context("reading settings surface")?;
    let value: Value = serde_json::from_str(profile.as_str())?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    engine.release(true);
    Ok(ExitCode::SUCCESS)
}

fn run_get(config: EngineConfig, args: &ApplyArgs, key: &str, kind: ValueKind) -> Result<ExitCode> {
    let engine = prepared_engine(config, args)?;
    let handle = ParameterHandle::try_acquire(&engine).context("acquiring parameter bus")?;
    let value = handle.with(|bus| read_typed(&*bus, key, kind))??;

    println!(
        "{}",
        json!({ "key": key, "type": format!("{kind:?}").to_lowercase(), "value": value })
    );
    drop(handle);
    engine.release(true);
    Ok(ExitCode::SUCCESS)
}

fn prepared_engine(config: EngineConfig, args: &ApplyArgs) -> Result<RtcEngine> {
    let engine = RtcEngine::from_config(config);
    engine
        .initialize(EngineContext::new(args.app_id.clone()).test_only(true))
        .context("initializing engine")?;

    if let Some(path) = &args.profile {
        let profile = fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        engine
            .set_profile(&profile, args.merge)
            .with_context(|| format!("applying profile {}", path.display()))?;
    }

    if !args.set.is_empty() {
        let mut command = ParametersCommand::new();
        for pair in &args.set {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{pair}'"))?;
            if key.is_empty() {
                bail!("empty key in '{pair}'");
            }
            let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            command = command.set(key, value);
        }
        engine
            .set_parameters(&command.to_json())
            .context("applying --set values")?;
    }

    if let Some(parameters) = &args.parameters {
        engine
            .set_parameters(parameters)
            .context("applying --parameters")?;
    }

    Ok(engine)
}

fn read_typed(bus: &dyn ParameterBus, key: &str, kind: ValueKind) -> Result<Value> {
    let value = match kind {
        ValueKind::Bool => json!(bus.get_bool(key)?),
        ValueKind::Int => json!(bus.get_int(key)?),
        ValueKind::Uint => json!(bus.get_uint(key)?),
        ValueKind::Number => json!(bus.get_number(key)?),
        ValueKind::String => json!(bus.get_string(key)?.as_str()),
        ValueKind::Object => serde_json::from_str(bus.get_object(key)?.as_str())?,
        ValueKind::Array => serde_json::from_str(bus.get_array(key)?.as_str())?,
    };
    Ok(value)
}
