use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use stack_runs::actions::run_actions::RunForm;
use stack_runs::api::HttpBackend;
use stack_runs::color::ColorDepth;
use stack_runs::config::loader;
use stack_runs::config::types::AppConfig;
use stack_runs::engine::{EngineHandle, RunsEngine};
use stack_runs::location::{Location, MemoryLocation};
use stack_runs::query::{self, ViewExtras};
use stack_runs::render::{self, RenderOptions};
use stack_runs::types::{FilterState, Pagination, RunKind, RunStatus, TimeRange};
use stack_runs::views::detail::DetailTab;
use stack_runs::views::runs::{NotificationLevel, RunsListView, RunsViewOptions};

/// Accepted formats for `--since` / `--until`, in local time.
const LOCAL_INPUT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

const EVENT_WAIT: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "stack-runs", version, about = "Stack runs console")]
struct Cli {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ViewArgs {
    /// Stack whose runs are shown.
    #[arg(long)]
    stack: u64,

    /// Location query to start from, e.g. `type=Apply&page=2`.
    #[arg(long)]
    view: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a stack's runs and print every applied page.
    Watch {
        #[command(flatten)]
        target: ViewArgs,
        #[arg(long = "type")]
        kind: Option<RunKind>,
        #[arg(long)]
        status: Option<RunStatus>,
        /// Start of the creation-time range (local time).
        #[arg(long, requires = "until")]
        since: Option<String>,
        /// End of the creation-time range (local time).
        #[arg(long, requires = "since")]
        until: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// Exit after the first applied page.
        #[arg(long)]
        once: bool,
    },
    /// Launch a run on a stack.
    Create {
        #[arg(long)]
        stack: u64,
        #[arg(long = "type")]
        kind: RunKind,
        #[arg(long)]
        workspace: Option<String>,
        /// Extra body field as `key=value`; JSON values are kept typed.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, serde_json::Value)>,
    },
    /// Print the result or log of one run.
    Show {
        #[command(flatten)]
        target: ViewArgs,
        #[arg(long)]
        run: u64,
        /// Print the execution log instead of the result.
        #[arg(long)]
        logs: bool,
    },
}

fn parse_field(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
    Ok((key.trim().to_owned(), value))
}

fn parse_local(raw: &str) -> Result<NaiveDateTime> {
    LOCAL_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .with_context(|| format!("unrecognised local time {raw:?} (use YYYY-MM-DDTHH:MM)"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    // Load config.
    let config = loader::load_config(cli.config.as_deref())?;

    let backend = HttpBackend::new(&config.server).context("building HTTP client")?;
    let engine = RunsEngine::new(Arc::new(backend), config.defaults.poll_interval()).start();

    tracing::info!("stack-runs starting against {}", config.server.base_url);

    let opts = RenderOptions {
        depth: Some(ColorDepth::detect()),
        date_format: config.defaults.date_format.clone(),
    };

    match cli.command {
        Commands::Watch {
            target,
            kind,
            status,
            since,
            until,
            page,
            page_size,
            once,
        } => {
            let time_range = match (since, until) {
                (Some(since), Some(until)) => Some(
                    TimeRange::from_wall_clock(&Local, parse_local(&since)?, parse_local(&until)?)
                        .context("time range does not exist in the local time zone")?,
                ),
                _ => None,
            };
            let mut view = mount(&config, engine, &target);
            if kind.is_some() || status.is_some() || time_range.is_some() {
                let form = view.form_mut();
                let current = form.values();
                form.set_kind(kind.or(current.kind));
                form.set_status(status.or(current.status));
                form.set_time_range(time_range.or(current.time_range));
                view.search();
            }
            if let Some(size) = page_size {
                view.change_page_size(size);
            }
            if let Some(page) = page {
                view.change_page(page);
            }
            watch(&mut view, once, &opts)
        }
        Commands::Create {
            stack,
            kind,
            workspace,
            fields,
        } => {
            let target = ViewArgs { stack, view: None };
            let mut view = mount(&config, engine, &target);
            let mut form = RunForm::new(Some(kind), workspace.or(config.defaults.workspace.clone()));
            for (key, value) in fields {
                form = form.with_field(key, value);
            }
            create(&mut view, form, config.server.timeout_secs, &opts)
        }
        Commands::Show { target, run, logs } => {
            let mut view = mount(&config, engine, &target);
            show(&mut view, run, logs, config.server.timeout_secs, &opts)
        }
    }
}

/// Mount the runs view on an in-memory location seeded from `--view` or the
/// configured defaults.
fn mount(config: &AppConfig, engine: EngineHandle, target: &ViewArgs) -> RunsListView<MemoryLocation> {
    let initial = target.view.clone().unwrap_or_else(|| {
        query::encode(
            &FilterState::default(),
            &Pagination {
                page_size: config.defaults.page_size,
                ..Pagination::default()
            },
            &ViewExtras::default(),
        )
    });
    RunsListView::mount(
        target.stack,
        engine,
        MemoryLocation::new("/runs", initial),
        RunsViewOptions {
            panel_key: None,
            project_name: config.defaults.project_name.clone(),
        },
    )
}

fn watch(view: &mut RunsListView<MemoryLocation>, once: bool, opts: &RenderOptions) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut shown = 0;
    loop {
        if view.wait(EVENT_WAIT) == 0 {
            continue;
        }
        if let Some(notification) = view.take_notification() {
            render::write_notification(&mut stdout, &notification, opts)?;
        }
        if view.applied_seq() == shown {
            continue;
        }
        shown = view.applied_seq();
        render::write_runs(
            &mut stdout,
            view.runs(),
            view.pagination(),
            &view.active_filters(),
            opts,
        )?;
        writeln!(stdout, "?{}\n", view.location().query())?;
        if once {
            return Ok(());
        }
    }
}

fn create(
    view: &mut RunsListView<MemoryLocation>,
    form: RunForm,
    timeout_secs: u64,
    opts: &RenderOptions,
) -> Result<()> {
    let kind = form.operation();
    view.open_create_form();
    view.submit(form, None);

    let deadline = Instant::now() + Duration::from_secs(timeout_secs.max(1) + 5);
    while view.is_create_pending() {
        if Instant::now() > deadline {
            bail!("timed out waiting for the {kind} run to be created");
        }
        view.wait(EVENT_WAIT);
    }

    match view.take_notification() {
        Some(n) if n.level == NotificationLevel::Success && !view.is_create_open() => {
            render::write_notification(&mut std::io::stdout(), &n, opts)?;
            Ok(())
        }
        Some(n) => bail!("creating {kind} run failed: {}", n.message),
        None => bail!("creating {kind} run failed"),
    }
}

fn show(
    view: &mut RunsListView<MemoryLocation>,
    run: u64,
    logs: bool,
    timeout_secs: u64,
    opts: &RenderOptions,
) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs.max(1) + 5);
    while view.applied_seq() == 0 {
        if Instant::now() > deadline {
            bail!("timed out waiting for the runs of stack {}", view.stack_id());
        }
        view.wait(EVENT_WAIT);
        if let Some(n) = view.take_notification() {
            bail!("listing runs failed: {}", n.message);
        }
    }

    if !view.open_detail(run) {
        bail!(
            "run {run} is not on page {} of stack {}",
            view.pagination().page,
            view.stack_id()
        );
    }
    if logs {
        view.detail_mut().select_tab(DetailTab::ExecLogs);
    }
    render::write_detail(&mut std::io::stdout(), view.detail(), opts)?;
    Ok(())
}
