mod app;
mod logging;
mod tui;
mod ui;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use nemo_core::{
    DirectoryConfig, DirectoryMetadata, EventLoop, NemoError, SortAttribute, SortCriteria,
    SortOrder, load_metadata, metadata_path_for,
};
use ratatui::{Terminal, backend::CrosstermBackend, style::Style, widgets::Widget};
use tracing::{info, warn};

use app::{Action, AppMode, AppState};
use tui::{AppEvent, EventHandler, handle_key};
use ui::{AppLayout, ConfirmView, Footer, Header, HelpView, ListView, OperationsView, Theme};

/// NEMO - terminal file browser with live operation progress
#[derive(Parser, Debug)]
#[command(name = "nemo")]
#[command(about = "Browse a folder tree, copy and delete files, and watch the operations run")]
#[command(version)]
struct Args {
    /// Folder to browse (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Show hidden files
    #[arg(short, long)]
    all: bool,

    /// Sort column: name, size, type or modified
    #[arg(short, long)]
    sort: Option<SortAttribute>,

    /// Sort in descending order
    #[arg(short, long)]
    reverse: bool,

    /// Mix folders with files instead of listing them first
    #[arg(long)]
    no_directories_first: bool,

    /// Neither read nor save per-folder view settings
    #[arg(long)]
    no_metadata: bool,
}

impl Args {
    /// Settings stored for the folder, overridden by flags given on the command line
    fn view_settings(&self, stored: Option<&DirectoryMetadata>) -> (SortCriteria, bool) {
        let mut sort = stored.map(|m| m.sort).unwrap_or_default();
        let mut show_hidden = stored.is_some_and(|m| m.show_hidden);

        if let Some(attribute) = self.sort {
            sort.attribute = attribute;
        }
        if self.reverse {
            sort.order = SortOrder::Descending;
        }
        if self.no_directories_first {
            sort.directories_first = false;
        }
        if self.all {
            show_hidden = true;
        }
        (sort, show_hidden)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _log_guard = logging::init();

    // Resolve path
    let path = args
        .path
        .clone()
        .canonicalize()
        .unwrap_or(args.path.clone());

    // Validate path
    if !path.exists() {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
    if !path.is_dir() {
        eprintln!("Error: Path is not a directory: {}", path.display());
        std::process::exit(1);
    }

    let metadata_dir = if args.no_metadata {
        None
    } else {
        dirs::cache_dir().map(|d| d.join("nemo").join("views"))
    };
    let stored = metadata_dir.as_ref().and_then(|dir| {
        match load_metadata(&metadata_path_for(&path, dir), &path) {
            Ok(meta) => Some(meta),
            Err(NemoError::PathNotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring stored view settings");
                None
            }
        }
    });
    let (sort, show_hidden) = args.view_settings(stored.as_ref());
    let config = DirectoryConfig {
        show_hidden,
        ..DirectoryConfig::default()
    };

    let mut event_loop = EventLoop::new();
    let mut state = AppState::new(path, sort, config, event_loop.handle(), metadata_dir);
    state.load_root()?;
    info!(root = %state.root_path.display(), sort = %sort.attribute, "Starting nemo");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run app
    let result = run_app(&mut terminal, &mut state, &mut event_loop);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    if state.operations.is_busy() {
        info!("Cancelling running operations");
    }
    state.operations.shutdown();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    event_loop: &mut EventLoop,
) -> Result<()> {
    let theme = Theme::default();
    let event_handler = EventHandler::new(50); // 50ms tick rate

    loop {
        // Progress notifications are delivered here, on the UI thread
        event_loop.dispatch_ready();
        state.poll_operations();

        let infos = state.operations.infos();
        let rows = state.rows();

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();
            let layout = AppLayout::new(area, infos.len());

            // Background
            frame
                .buffer_mut()
                .set_style(area, Style::default().bg(theme.bg));

            // Update visible height for scrolling
            state.visible_height = layout.list.height as usize;

            Header::new(state, &theme).render(layout.header, frame.buffer_mut());
            ListView::new(
                &state.model,
                &rows,
                state.selected_index,
                state.scroll_offset,
                &theme,
            )
            .render(layout.list, frame.buffer_mut());
            OperationsView::new(&infos, state.spinner_frame, &theme)
                .render(layout.operations, frame.buffer_mut());

            match state.mode {
                AppMode::Help => HelpView::new(&theme).render(area, frame.buffer_mut()),
                AppMode::Confirm => {
                    if let Some(pending) = &state.pending {
                        ConfirmView::new(pending, &theme).render(area, frame.buffer_mut());
                    }
                }
                AppMode::Browsing => {}
            }

            Footer::new(state.mode, state.message.as_ref(), &theme)
                .render(layout.footer, frame.buffer_mut());
        })?;

        // Wake up in time for the next scheduled delivery
        let deadline_in = event_loop
            .next_deadline()
            .map(|due| due.saturating_duration_since(Instant::now()));

        match event_handler.next(deadline_in)? {
            AppEvent::Key(key) => {
                let action = handle_key(key, state.mode);
                handle_action(state, action);
            }
            AppEvent::Resize => {
                // Terminal will redraw on next loop
            }
            AppEvent::Tick => {
                state.tick_spinner();
            }
        }

        if state.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_action(state: &mut AppState, action: Action) {
    match action {
        Action::MoveUp => state.move_up(),
        Action::MoveDown => state.move_down(),
        Action::PageUp => state.page_up(),
        Action::PageDown => state.page_down(),
        Action::GoToFirst => state.go_to_first(),
        Action::GoToLast => state.go_to_last(),
        Action::Expand => state.expand_selected(),
        Action::Collapse => state.collapse_selected(),
        Action::Toggle => state.toggle_selected(),
        Action::ShowHelp => state.show_help(),
        Action::HideHelp => state.hide_help(),
        Action::Delete => state.request_delete(),
        Action::Yank => state.yank(),
        Action::Paste => state.request_paste(),
        Action::Duplicate => state.duplicate_selected(),
        Action::Confirm => state.confirm(),
        Action::Dismiss => state.dismiss(),
        Action::CancelOperation => state.cancel_operation(),
        Action::TogglePause => state.toggle_pause(),
        Action::CycleSort => state.cycle_sort(),
        Action::ReverseSort => state.reverse_sort(),
        Action::ToggleDirectoriesFirst => state.toggle_directories_first(),
        Action::ToggleHidden => state.toggle_hidden(),
        Action::Refresh => state.refresh(),
        Action::Quit => state.quit(),
        Action::Tick => {}
    }
}
