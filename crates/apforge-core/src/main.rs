#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{Context, Result};
use apforge_core::{dispatch_command, Cli, OutputFormat, ProvisionConfig, SystemProbe};
use clap::Parser;
use serde_json::{json, Value};

fn main() {
    let cli = Cli::parse();
    let format = cli.output_format;
    if let Err(err) = run(cli, format) {
        tracing::error!("{err:#}");
        emit_error(format, &err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_format: OutputFormat) -> Result<()> {
    let cfg = ProvisionConfig::load(cli.config_dir.clone()).context("loading configuration")?;

    let log_cfg = apforge_logging::fs::read_config(&cfg.state_root);
    let _logging_guards = apforge_logging::init("apforge", &cfg.state_root, &log_cfg, cli.debug)?;
    if let Err(err) = apforge_logging::run_retention(&cfg.state_root, "apforge", &log_cfg) {
        tracing::warn!("Log retention failed: {err:#}");
    }
    tracing::debug!("Configuration: {:?}", cfg);

    let probe = SystemProbe::new();
    let (message, data) = dispatch_command(&cfg, &probe, cli.command)?;
    emit_success(output_format, message, data)
}

fn emit_success(format: OutputFormat, message: String, data: Value) -> Result<()> {
    emit_payload(format, "ok", message, data)
}

fn emit_error(format: OutputFormat, err: &anyhow::Error) {
    let details: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
    let payload = json!({
        "status": "error",
        "message": err.to_string(),
        "details": details,
        "data": Value::Null,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            eprintln!("Error: {}", err);
            for detail in details.iter().skip(1) {
                eprintln!("  -> {}", detail);
            }
        }
    }
}

fn emit_payload(format: OutputFormat, status: &str, message: String, data: Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let payload = json!({
                "status": status,
                "message": message,
                "data": data,
            });
            println!("{}", payload);
        }
        OutputFormat::Text => println!("{message}"),
    }
    Ok(())
}
