// src/lib.rs

pub mod browser;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::browser::WebDriverBrowser;
use crate::cli::{CliArgs, Command};
use crate::config::loader::{discover_config_path, load_and_validate, CONFIG_FILE_NAME};
use crate::config::model::{default_config_toml, ConfigFile, ScriptConfig};
use crate::engine::{
    spawn_stdin_reader, BackoffPolicy, ControlEvent, ManualCommand, ReloadOrchestrator, Session,
    SessionEnd, SessionOptions,
};
use crate::errors::DevloopError;
use crate::exec::{build_command, BuiltCommand, ProcessSupervisor};
use crate::types::Platform;
use crate::watch::{find_ignore_file, spawn_watcher, ChangeWatcher, PathMatcher};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("reading the working directory")?;
    match args.command {
        Command::Init => init_config(&cwd, args.config.as_deref()),
        Command::Run { script, dry_run } => {
            if dry_run {
                let path = resolve_config_path(&cwd, args.config.as_deref())?;
                let cfg = load_config(&path)?;
                return print_dry_run(&path, &cfg, &script);
            }
            run_script(&cwd, args.config.as_deref(), &script).await
        }
    }
}

/// Run sessions until one ends with `ex`, Ctrl-C, or an error.
///
/// `rc` ends the current session; the configuration is then read again and
/// a brand new orchestrator takes over.
async fn run_script(cwd: &Path, explicit_config: Option<&str>, script_name: &str) -> Result<()> {
    let mut lines = spawn_stdin_reader();
    loop {
        let path = resolve_config_path(cwd, explicit_config)?;
        let cfg = load_config(&path)?;
        match run_session(&path, &cfg, script_name, &mut lines).await? {
            SessionEnd::Stopped => return Ok(()),
            SessionEnd::ReloadConfig => info!(config = ?path, "reloading configuration"),
            SessionEnd::Failed(err) => return Err(err.into()),
        }
    }
}

async fn run_session(
    config_path: &Path,
    cfg: &ConfigFile,
    script_name: &str,
    lines: &mut mpsc::UnboundedReceiver<String>,
) -> Result<SessionEnd> {
    let (name, script) = select_script(config_path, cfg, script_name)?;
    let command = build_command(script, Platform::current())?;
    let settings = cfg.settings();
    let root = config_root_dir(config_path);
    let root = root.canonicalize().unwrap_or(root);

    info!(config = ?config_path, "using config file");
    info!(script = name, command = %command, url = script.browser_url().unwrap_or("-"), "starting");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(ProcessSupervisor::new(command, settings.stop_timeout()));
    let mut orchestrator = ReloadOrchestrator::new(supervisor, events_tx.clone());
    if let Some(url) = script.browser_url() {
        let policy = BackoffPolicy::new(settings.browser_wait_interval())
            .with_cap(settings.max_browser_wait_interval());
        orchestrator = orchestrator.with_browser(
            Arc::new(WebDriverBrowser::new(settings.browser)),
            url,
            policy,
        );
    }
    info!("{}", ManualCommand::help(script.browser_url().is_some()));

    let matcher = PathMatcher::discover(&root, &settings.include_only)?;
    let change_watcher = ChangeWatcher::new(matcher, settings.poll_interval(), move |path| {
        // Receiver gone means the session is over.
        let _ = events_tx.send(ControlEvent::Changed(path.to_path_buf()));
    })
    .with_content_hashing(settings.use_hash);
    let _watcher = spawn_watcher(&root, change_watcher)?;

    let options = SessionOptions {
        trigger_tick: settings.trigger_tick(),
        handle_ctrl_c: true,
    };
    let session = Session::new(Arc::new(orchestrator), events_rx, options);
    Ok(session.run(Some(lines)).await)
}

fn select_script<'a>(
    config_path: &Path,
    cfg: &'a ConfigFile,
    script_name: &str,
) -> Result<(&'a str, &'a ScriptConfig)> {
    cfg.find_script(script_name).ok_or_else(|| {
        let known: Vec<&str> = cfg.scripts().keys().map(String::as_str).collect();
        DevloopError::config(format!(
            "no script named `{script_name}` in {:?} (available: {})",
            config_path,
            known.join(", ")
        ))
        .into()
    })
}

fn resolve_config_path(cwd: &Path, explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(path)),
        None => discover_config_path(cwd).ok_or_else(|| {
            anyhow!(
                "no {CONFIG_FILE_NAME} found in {:?} or its parents; run `devloop init` to create one",
                cwd
            )
        }),
    }
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    load_and_validate(path).with_context(|| format!("loading config {:?}", path))
}

/// Directory that is watched: the one holding the config file.
///
/// A bare file name like "Devloop.toml" (parent = "") means the working
/// directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn init_config(cwd: &Path, explicit: Option<&str>) -> Result<()> {
    let path = explicit
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));
    if path.exists() {
        bail!("{:?} already exists; not overwriting it", path);
    }
    std::fs::write(&path, default_config_toml()?)
        .with_context(|| format!("writing {:?}", path))?;
    println!("created {}", path.display());
    Ok(())
}

fn print_dry_run(config_path: &Path, cfg: &ConfigFile, script_name: &str) -> Result<()> {
    let (name, script) = select_script(config_path, cfg, script_name)?;
    let command: BuiltCommand = build_command(script, Platform::current())?;
    let settings = cfg.settings();
    let root = config_root_dir(config_path);

    println!("devloop dry-run");
    println!("  config = {}", config_path.display());
    println!("  watch root = {}", root.display());
    match find_ignore_file(&root) {
        Some(file) => println!("  ignore file = {}", file.display()),
        None => println!("  ignore file = (none)"),
    }
    if !settings.include_only.is_empty() {
        println!("  include_only = {:?}", settings.include_only);
    }
    println!("  poll_interval = {}ms", settings.poll_interval);
    println!("  use_hash = {}", settings.use_hash);
    println!();

    println!("script {name}:");
    println!("  command: {command}");
    println!("  shell: {}", command.use_shell);
    if let Some(url) = script.browser_url() {
        println!("  url: {url}");
        println!("  browser: {}", settings.browser);
        println!("  browser_wait_interval = {}ms", settings.browser_wait_interval);
        match settings.max_browser_wait_interval() {
            Some(cap) => println!("  max_browser_wait_interval = {}ms", cap.as_millis()),
            None => println!("  max_browser_wait_interval = unbounded"),
        }
    }

    debug!("dry-run complete (nothing started)");
    Ok(())
}
