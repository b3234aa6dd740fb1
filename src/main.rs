use anyhow::{bail, Context};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use zsg::kernel::services::adapters::{ensure_settings_file, load_settings};
use zsg::kernel::services::ports::{PatternQuery, Query, RuleQuery, Strictness};
use zsg::kernel::SearchSession;

mod logging;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(name = "zsg", version, about = "Structural search and rewrite on top of ast-grep")]
struct Cli {
    /// Pattern to search for
    #[arg(short, long, conflicts_with = "rule")]
    pattern: Option<String>,
    /// Rewrite template applied to each match
    #[arg(short, long, default_value = "")]
    rewrite: String,
    /// AST kind to select inside the pattern
    #[arg(long, default_value = "")]
    selector: String,
    #[arg(long, default_value = "smart")]
    strictness: Strictness,
    #[arg(short, long, default_value = "")]
    lang: String,
    /// Comma separated paths or globs
    #[arg(short, long, default_value = "")]
    include: String,
    /// YAML rule file, used instead of --pattern
    #[arg(long)]
    rule: Option<PathBuf>,
    /// Workspace root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// ast-grep executable, overrides the settings file
    #[arg(long)]
    sg: Option<String>,
    /// Print patched file contents instead of matches
    #[arg(long, conflicts_with = "apply")]
    preview: bool,
    /// Write rewrites to disk
    #[arg(long)]
    apply: bool,
    /// Read one pattern per stdin line; each line replaces the previous search
    #[arg(long, conflicts_with_all = ["preview", "apply", "rule"])]
    interactive: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("zsg: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = load_settings();
    if let Some(sg) = cli.sg.clone() {
        settings.executable = sg;
    }
    let logging = logging::init(settings.log_filter.as_deref(), cli.verbose);
    if let Some(guard) = logging.as_ref().filter(|_| cli.verbose) {
        eprintln!("zsg: logging to {}", guard.log_dir().display());
    }
    if let Err(e) = ensure_settings_file() {
        tracing::warn!(error = %e, "ensure_settings_file failed");
    }

    let root = match cli.root.clone() {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone())
        .context("install Ctrl-C handler")?;

    let mut session = SearchSession::new(runtime.handle().clone(), &settings, Some(root));

    if cli.interactive {
        return run_interactive(&cli, &mut session, &interrupted);
    }

    let query = build_query(&cli, cli.pattern.clone())?;
    if (cli.preview || cli.apply) && !query.has_rewrite() {
        bail!("--preview and --apply need --rewrite or a rule");
    }
    session.submit(query);
    if !drive(&mut session, &interrupted) {
        eprintln!("zsg: search cancelled");
        return Ok(ExitCode::from(130));
    }

    if let Some(err) = session.results().last_error() {
        eprintln!("zsg: {err}");
        return Ok(ExitCode::FAILURE);
    }

    if cli.preview {
        print_previews(&session)?;
    } else if cli.apply {
        let summaries = session.commit_all()?;
        for s in &summaries {
            println!(
                "{}: {} applied, {} skipped",
                s.path.display(),
                s.applied,
                s.skipped
            );
        }
        if summaries.is_empty() {
            eprintln!("zsg: nothing to apply");
        }
    } else {
        print_results(&session)?;
    }

    Ok(ExitCode::SUCCESS)
}

fn build_query(cli: &Cli, pattern: Option<String>) -> anyhow::Result<Query> {
    if let Some(rule) = cli.rule.as_ref() {
        let rule_definition = std::fs::read_to_string(rule)
            .with_context(|| format!("read rule file {}", rule.display()))?;
        return Ok(Query::Rule(RuleQuery {
            rule_definition,
            include_filter: cli.include.clone(),
        }));
    }

    let Some(pattern) = pattern else {
        bail!("either --pattern or --rule is required");
    };
    Ok(Query::Pattern(PatternQuery {
        pattern,
        rewrite: cli.rewrite.clone(),
        strictness: cli.strictness,
        selector: cli.selector.clone(),
        language: cli.lang.clone(),
        include_filter: cli.include.clone(),
    }))
}

/// 返回 false 表示被 Ctrl-C 取消。
fn drive(session: &mut SearchSession, interrupted: &AtomicBool) -> bool {
    let mut cancelled = false;
    loop {
        if interrupted.swap(false, Ordering::Relaxed) {
            session.cancel();
            cancelled = true;
        }
        if session.wait_until_idle(POLL_INTERVAL) {
            return !cancelled;
        }
    }
}

fn run_interactive(
    cli: &Cli,
    session: &mut SearchSession,
    interrupted: &AtomicBool,
) -> anyhow::Result<ExitCode> {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    std::thread::Builder::new()
        .name("zsg-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawn stdin reader")?;

    let mut printed = true;
    let mut stdin_open = true;
    loop {
        if interrupted.swap(false, Ordering::Relaxed) {
            session.cancel();
        }

        match line_rx.try_recv() {
            Ok(line) => {
                let query = build_query(cli, Some(line))?;
                let session_id = session.submit(query);
                tracing::debug!(%session_id, "interactive query");
                printed = false;
            }
            Err(mpsc::TryRecvError::Disconnected) => stdin_open = false,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        session.wait_message(POLL_INTERVAL);

        if !printed && !session.results().is_searching() {
            match session.results().last_error() {
                Some(err) => eprintln!("zsg: {err}"),
                None => print_results(session)?,
            }
            printed = true;
        }

        if !stdin_open && printed {
            return Ok(ExitCode::SUCCESS);
        }
    }
}

fn print_results(session: &SearchSession) -> anyhow::Result<()> {
    let snapshot = session.results().snapshot();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for file in snapshot.files {
        writeln!(out, "{}", file.path)?;
        for m in &file.matches {
            let start = m.source.range.start;
            writeln!(out, "  {}:{}  {}", start.line + 1, start.column + 1, m.display_line)?;
            if let Some(replacement) = m.source.replacement.as_deref() {
                writeln!(out, "    => {replacement}")?;
            }
        }
    }
    out.flush()?;
    eprintln!(
        "{} matches in {} files",
        snapshot.total_matches, snapshot.file_count
    );
    Ok(())
}

fn print_previews(session: &SearchSession) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for file in session.results().files() {
        if !file.matches.iter().any(|m| m.source.replacement.is_some()) {
            continue;
        }
        let patched = session
            .preview_file(&file.path)
            .with_context(|| format!("preview {}", file.path))?;
        writeln!(out, "--- {}", file.path)?;
        out.write_all(&patched)?;
        if !patched.ends_with(b"\n") {
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
