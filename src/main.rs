//! fxslog CLI: supervise a game-server process and log its console.
//!
//! The binary serves no live viewers: it logs to the daily files and the
//! terminal only. A host with a viewer transport embeds the library instead,
//! building the logger with a [`fxslog::live::LiveHub`] and seeding each
//! viewer through [`SharedLogger::attach_viewer`].

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::ChildStdin;
use tokio::sync::mpsc;
use tracing::{info, warn};

use fxslog::config::LoggerConfig;
use fxslog::logging;
use fxslog::terminal::QuietFlags;
use fxslog::{FxsLogger, SharedLogger, StdioSource};

/// Read size for the child's stdio pipes.
const PIPE_CHUNK_SIZE: usize = 8 * 1024;

/// Author recorded for commands typed on the supervisor's stdin.
const CONSOLE_AUTHOR: &str = "console";

/// fxslog: game-server console logger.
#[derive(Parser)]
#[command(name = "fxslog", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a server process and log its output.
    Run {
        /// Directory for the daily log files (overrides config).
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Do not mirror output to this terminal.
        #[arg(long)]
        quiet: bool,

        /// Program and arguments to supervise.
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
    /// Print the resolved configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = LoggerConfig::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            log_dir,
            quiet,
            program,
        } => {
            if let Some(dir) = log_dir {
                config.log_dir = dir;
            }
            config.quiet |= quiet;
            let _guard = logging::init_production(&config.diagnostics_dir, &config.log_level)?;
            run(config, program).await
        }
        Commands::CheckConfig => {
            logging::init_cli(&config.log_level);
            let rendered =
                toml::to_string_pretty(&config).context("failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn run(config: LoggerConfig, program: Vec<String>) -> Result<()> {
    let (program, args) = program.split_first().context("no program to run")?;

    let logger = SharedLogger::new(
        FxsLogger::builder(&config.log_dir)
            .quiet(Arc::new(QuietFlags::from_config(&config)))
            .flush_interval(config.flush_interval())
            .hitch_report_interval(config.hitch_report_interval())
            .build(),
    );
    let tasks = logger.spawn_tasks();

    let mut child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let pid = child
        .id()
        .map_or_else(|| "?".to_owned(), |id| id.to_string());
    info!(%pid, program = %program, log_dir = %config.log_dir.display(), "server spawned");
    logger.log_fxserver_spawn(&pid);

    let stdout = child.stdout.take().context("failed to capture child stdout")?;
    let stderr = child.stderr.take().context("failed to capture child stderr")?;
    let stdin = child.stdin.take().context("failed to capture child stdin")?;

    let stdout_pump = tokio::spawn(pump_stdio(logger.clone(), StdioSource::StdOut, stdout));
    let stderr_pump = tokio::spawn(pump_stdio(logger.clone(), StdioSource::StdErr, stderr));
    let commands = tokio::spawn(forward_commands(logger.clone(), stdin, spawn_stdin_reader()));

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = tokio::signal::ctrl_c() => None,
    };
    let status = match waited {
        Some(status) => status.context("failed to wait for server process")?,
        None => {
            info!("interrupt received, stopping server");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill server process");
            }
            child
                .wait()
                .await
                .context("failed to wait for server process")?
        }
    };

    for pump in [stdout_pump, stderr_pump] {
        if let Err(e) = pump.await {
            warn!(error = %e, "stdio pump task failed");
        }
    }
    commands.abort();

    logger.log_informational(&exit_message(status));
    info!(%status, "server exited");
    info!(usage = %logger.usage_stats(), "recent buffer at exit");

    if let Err(e) = tasks.shutdown().await {
        warn!(error = %e, "final log flush failed");
    }
    Ok(())
}

fn exit_message(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("FXServer exited with code {code}"),
        None => format!("FXServer terminated ({status})"),
    }
}

/// Forward raw chunks from one child pipe into the logger until EOF.
async fn pump_stdio(logger: SharedLogger, source: StdioSource, mut reader: impl AsyncRead + Unpin) {
    let mut buf = vec![0u8; PIPE_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => logger.ingest_output(source, buf.get(..n).unwrap_or_default()),
            Err(e) => {
                warn!(?source, error = %e, "failed to read server output");
                break;
            }
        }
    }
}

/// Read our stdin on a plain thread so a pending read never holds up exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read supervisor stdin");
                    break;
                }
            }
        }
    });
    rx
}

/// Relay typed lines to the server, logging each as an admin command.
async fn forward_commands(
    logger: SharedLogger,
    mut server_stdin: ChildStdin,
    mut typed: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = typed.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        logger.log_admin_command(CONSOLE_AUTHOR, &line);
        if let Err(e) = send_command(&mut server_stdin, &line).await {
            warn!(error = %e, "failed to forward command to server");
            break;
        }
    }
}

async fn send_command(server_stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    server_stdin.write_all(line.as_bytes()).await?;
    server_stdin.write_all(b"\n").await?;
    server_stdin.flush().await
}
