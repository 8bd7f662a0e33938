use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use crater_files::app::{write_tree, Explorer};
use crater_files::config::Config;
use crater_files::services::listing::{
    DirectoryLister, FixtureLister, HttpLister, ListingManager, ListingScope,
};
use crater_files::services::{log_dirs, tracing_setup};
use crater_files::view::file_tree::{FileTree, NodeId};
use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "crater-tree")]
#[command(about = "Browse Crater storage spaces as a lazily loaded tree", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Storage API base URL (e.g. https://crater.example/api/v1)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Bearer token for the storage API
    #[arg(long, env = "CRATER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Listing endpoint family: files, rwfiles or admin
    #[arg(long, value_name = "SCOPE")]
    scope: Option<ListingScope>,

    /// Serve listings from a JSON fixture instead of the API
    #[arg(long, value_name = "PATH")]
    fixture: Option<PathBuf>,

    /// Item id selected on start
    #[arg(long, value_name = "ID")]
    select: Option<String>,

    /// Path to log file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Print the tree to stdout instead of opening the browser
    #[arg(long)]
    print: bool,

    /// Directory levels expanded by --print
    #[arg(long, value_name = "N", requires = "print")]
    depth: Option<usize>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the config and log locations and exit
    #[arg(long)]
    show_paths: bool,
}

/// Restores the terminal when the browser exits, including on error
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> AnyhowResult<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        if let Err(e) = stdout().execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to enter alternate screen");
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn load_config(args: &Args) -> AnyhowResult<Config> {
    let fallback = log_dirs::default_config_path();
    let mut config = Config::load_layered(args.config.as_deref(), fallback.as_deref())
        .context("Failed to load configuration")?;

    if let Some(base_url) = &args.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(token) = &args.token {
        config.api.token = Some(token.clone());
    }
    if let Some(scope) = args.scope {
        config.api.scope = scope;
    }
    if let Some(select) = &args.select {
        config.tree.initial_selected_item_id = Some(select.clone());
    }
    if let Some(depth) = args.depth {
        config.tree.print_depth = depth;
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = Some(log_file.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_lister(args: &Args, config: &Config) -> AnyhowResult<Arc<dyn DirectoryLister>> {
    if let Some(path) = &args.fixture {
        let lister = FixtureLister::from_file(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        tracing::info!("serving listings from fixture {:?}", path);
        return Ok(Arc::new(lister));
    }

    let lister = HttpLister::new(
        &config.api.base_url,
        config.api.scope,
        config.api.token.clone(),
        config.api.request_timeout(),
    )
    .context("Failed to create storage API client")?;
    tracing::info!("listing from {} ({})", config.api.base_url, config.api.scope);
    Ok(Arc::new(lister))
}

fn run_browser(
    explorer: &mut Explorer,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> AnyhowResult<()> {
    const FRAME_DURATION: Duration = Duration::from_millis(16); // 60fps
    let mut last_render = Instant::now();
    let mut needs_render = true;

    explorer.mount();

    loop {
        if explorer.process_async_messages() {
            needs_render = true;
        }

        if explorer.should_quit() {
            break;
        }

        if needs_render && last_render.elapsed() >= FRAME_DURATION {
            terminal.draw(|frame| explorer.render(frame))?;
            last_render = Instant::now();
            needs_render = false;
        }

        let timeout = if needs_render {
            FRAME_DURATION.saturating_sub(last_render.elapsed())
        } else {
            Duration::from_millis(50)
        };
        if !event::poll(timeout)? {
            continue;
        }

        match event::read()? {
            CrosstermEvent::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                if explorer.handle_key(key_event) {
                    needs_render = true;
                }
            }
            CrosstermEvent::Resize(_, _) => needs_render = true,
            _ => {}
        }
    }

    Ok(())
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    if args.show_paths {
        log_dirs::print_all_paths();
        return Ok(());
    }

    let config = load_config(&args)?;

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config.redacted())
            .context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    log_dirs::cleanup_stale_logs();
    let log_path = config
        .log_file
        .clone()
        .unwrap_or_else(log_dirs::main_log_path);
    tracing_setup::init_global(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
    tracing::info!("crater-tree starting, logging to {:?}", log_path);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("crater-tree-io")
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let lister = build_lister(&args, &config)?;
    let manager = Arc::new(ListingManager::with_cache_capacity(
        lister,
        config.tree.cache_capacity,
    ));
    let tree = FileTree::new(config.api.scope).with_initial_selection(
        config
            .tree
            .initial_selected_item_id
            .as_deref()
            .map(NodeId::new),
    );

    if args.print {
        let mut tree = tree;
        runtime.block_on(tree.load_to_depth(&*manager, config.tree.print_depth));
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_tree(&tree, &mut handle).context("Failed to print tree")?;
        handle.flush()?;
        return Ok(());
    }

    let mut explorer = Explorer::new(tree, manager, runtime.handle().clone());
    let result = {
        let _guard = TerminalGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))
            .context("Failed to create terminal")?;
        terminal.clear()?;
        run_browser(&mut explorer, &mut terminal)
    };

    // Picker use: the caller reads the chosen id from stdout
    if let Some(id) = explorer.tree().selected_item_id() {
        println!("{}", id);
    }
    tracing::info!("crater-tree exiting");

    result.context("Browser loop returned an error")
}
