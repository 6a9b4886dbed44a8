// src/bin/cash.rs

use anyhow::{Context, Result};
use cash::{
    OutputChannel, ProcessError, RunningProcess, SearchPath, StdioMode,
    cli::{Cli, parse_key_value_pairs},
    constants::EXIT_DRAIN_GRACE,
    core::config_loader::{default_config_path, load_config},
    models::CashConfig,
};
use clap::Parser;
use colored::*;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

/// The main entry point of the `cash` binary.
/// Runs the script and exits with its exit code; any other failure exits with 1.
#[tokio::main]
async fn main() {
    env_logger::init();

    match run_cli(Cli::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run_cli(cli: Cli) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => match default_config_path() {
            Ok(path) => load_config(&path)?,
            Err(e) => {
                log::debug!("{}; using default config", e);
                CashConfig::default()
            }
        },
    };

    // Flags take precedence over the config file.
    if let Some(shell) = &cli.shell {
        config.interpreter = Some(shell.clone());
    }
    if cli.ignore_exit_code {
        config.ignore_exit_code = true;
    }
    if let Some(cwd) = &cli.cwd {
        config.cwd = Some(cwd.clone());
    }
    config.env.extend(parse_key_value_pairs(&cli.env)?);

    let registry = config.registry(&SearchPath::from_env());
    let mut session = config.session(&registry)?;
    // The script reads the terminal directly; there is no input to forward.
    session.spawn_options.stdin = StdioMode::Inherit;
    let process = session.exec(&cli.script())?;

    let result = if cli.capture {
        let result = process.wait().await;
        print_captured(&process).await?;
        result
    } else {
        let forwarding = async {
            tokio::join!(
                forward(process.stdout(), io::stdout()),
                forward(process.stderr(), io::stderr()),
            );
        };
        tokio::pin!(forwarding);
        let settled = tokio::select! {
            () = &mut forwarding => None,
            result = process.wait() => Some(result),
        };
        match settled {
            Some(result) => {
                // Background children may keep the pipes open after the script exits.
                if tokio::time::timeout(EXIT_DRAIN_GRACE, &mut forwarding).await.is_err() {
                    log::debug!("Stopped forwarding output of pipes left open after exit");
                }
                result
            }
            None => process.wait().await,
        }
    };

    match result {
        Ok(finished) => Ok(finished.code),
        Err(ProcessError::NonZeroExit(code)) => {
            eprintln!("{}", format!("Script exited with code {code}.").red());
            Ok(code)
        }
        Err(e) => Err(e.into()),
    }
}

/// Copies a channel to `out` as chunks arrive, until the channel closes.
async fn forward(channel: Option<&OutputChannel>, mut out: impl AsyncWrite + Unpin) {
    let Some(channel) = channel else {
        return;
    };
    let mut stream = channel.follow();
    while let Some(chunk) = stream.next_chunk().await {
        match chunk {
            Ok(text) => {
                if let Err(e) = write_flushed(&mut out, &text).await {
                    log::warn!("Could not forward process output; stopping: {}", e);
                    return;
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                return;
            }
        }
    }
}

async fn write_flushed(out: &mut (impl AsyncWrite + Unpin), text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

async fn print_captured(process: &RunningProcess) -> Result<()> {
    if let Some(stdout) = process.stdout() {
        write_flushed(&mut io::stdout(), &stdout.snapshot()).await?;
    }
    if let Some(stderr) = process.stderr() {
        write_flushed(&mut io::stderr(), &stderr.snapshot()).await?;
    }
    Ok(())
}
