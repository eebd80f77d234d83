mod console;
mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use directories::ProjectDirs;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, SystemTime},
};

use historia::bank::QuestionBank;
use historia::celebration::ConfettiBurst;
use historia::config::{Config, ConfigStore, FileConfigStore};
use historia::difficulty::DifficultyProfile;
use historia::runtime::{CrosstermEventSource, FixedTicker, GameEvent, GameEventSource, Runner, Ticker};
use historia::save::{SaveRecord, SaveStore};
use historia::session::{Intent, Session};

const TICK_RATE_MS: u64 = 100;
const TICKS_PER_SECOND: u64 = 1000 / TICK_RATE_MS;

/// history trivia tui with lives, timed rounds, power-ups, and saved games
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A history trivia TUI: answer shuffled multiple-choice rounds against the clock, spend power-ups, survive the anti-cheat window, and keep your progress in named save slots."
)]
pub struct Cli {
    /// difficulty profile to play under
    #[clap(short, long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// run the plain console front-end instead of the TUI
    #[clap(long)]
    console: bool,

    /// override the save file location
    #[clap(long)]
    save_file: Option<PathBuf>,

    /// list saved games and exit
    #[clap(long)]
    list_saves: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum DifficultyArg {
    Facil,
    Normal,
    Dificil,
    Hardcore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Categories,
    Difficulties,
    Saves,
    SlotEntry,
}

pub struct App {
    pub session: Session,
    pub store: SaveStore,
    pub config: Config,
    pub config_store: FileConfigStore,
    pub state: AppState,
    pub confetti: ConfettiBurst,
    pub saves: Vec<SaveRecord>,
    pub selected: usize,
    pub slot_input: String,
    pub status: String,
}

impl App {
    pub fn new(bank: QuestionBank, store: SaveStore, config: Config, config_store: FileConfigStore) -> Self {
        // An unknown configured difficulty falls back to normal instead of failing
        let profile = DifficultyProfile::by_name(&config.difficulty)
            .unwrap_or_else(DifficultyProfile::default_profile)
            .clone();
        Self {
            session: Session::with_profile(bank, profile),
            store,
            config,
            config_store,
            state: AppState::Playing,
            confetti: ConfettiBurst::new(),
            saves: Vec::new(),
            selected: 0,
            slot_input: String::new(),
            status: String::new(),
        }
    }

    fn persist_config(&self) {
        let _ = self.config_store.save(&self.config);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    let bank = QuestionBank::load();
    let store = match &cli.save_file {
        Some(path) => SaveStore::with_path(path),
        None => SaveStore::new(),
    };

    if cli.list_saves {
        let records = store.list();
        if records.is_empty() {
            println!("Sin partidas guardadas");
        }
        for record in records {
            println!("{} | Máx {} | {}", record.name, record.best_score, record.date);
        }
        return Ok(());
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    if let Some(arg) = cli.difficulty {
        config.difficulty = arg.to_string().to_lowercase();
    }

    if cli.console {
        console::run(bank, store, &config.difficulty)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(bank, store, config, config_store);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = run_app(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend, E: GameEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let mut tick_count: u64 = 0;
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let size = terminal.size().unwrap_or_default();
        match runner.step() {
            GameEvent::Tick => {
                tick_count += 1;
                app.confetti.update();
                if tick_count % TICKS_PER_SECOND == 0 && app.state == AppState::Playing {
                    let intents = app.session.on_tick(SystemTime::now());
                    apply_intents(app, intents, size.width, size.height);
                }
                let timer_visible = app.state == AppState::Playing
                    && app.session.snapshot().timer_running;
                if app.confetti.is_active || timer_visible {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            GameEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            GameEvent::FocusLost => {
                let intents = app.session.on_focus_lost(SystemTime::now());
                apply_intents(app, intents, size.width, size.height);
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            GameEvent::FocusGained => {
                app.session.on_focus_returned();
            }
            GameEvent::Key(key) => {
                if handle_key(app, key, size.width, size.height) {
                    break;
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    // Optional final save before the session is dropped
    if let Some(slot) = app.config.last_slot.clone() {
        if app.session.profile().can_save {
            let _ = app.session.save(&app.store, &slot);
        }
    }
    Ok(())
}

/// Act on the side effects a command requested.
fn apply_intents(app: &mut App, intents: Vec<Intent>, width: u16, height: u16) {
    for intent in intents {
        match intent {
            Intent::TimeExpired => {
                let follow_up = app.session.on_timeout();
                apply_intents(app, follow_up, width, height);
            }
            Intent::Celebrate => app.confetti.start(width, height),
            Intent::AutoSave => {
                if let Some(slot) = app.config.last_slot.clone() {
                    let _ = app.session.save(&app.store, &slot);
                }
            }
            Intent::RoundLost(_) | Intent::CategoryComplete => {}
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent, width: u16, height: u16) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    match app.state {
        AppState::Playing => handle_playing_key(app, key, width, height),
        AppState::Categories => {
            let count = app.session.bank().categories().len();
            if let Some(choice) = handle_menu_key(app, key, count) {
                match app.session.select_category(choice) {
                    Ok(intents) => {
                        app.status.clear();
                        apply_intents(app, intents, width, height);
                    }
                    Err(err) => app.status = err.to_string(),
                }
                app.state = AppState::Playing;
            }
            false
        }
        AppState::Difficulties => {
            let profiles = DifficultyProfile::all();
            if let Some(choice) = handle_menu_key(app, key, profiles.len()) {
                let name = profiles[choice].name;
                match app.session.select_difficulty(name) {
                    Ok(()) => {
                        app.config.difficulty = name.to_string();
                        app.persist_config();
                        app.status = format!("Dificultad cambiada a {name}.");
                    }
                    Err(err) => app.status = err.to_string(),
                }
                app.state = AppState::Playing;
            }
            false
        }
        AppState::Saves => {
            if app.saves.is_empty() {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    app.state = AppState::Playing;
                }
                return false;
            }
            if let Some(choice) = handle_menu_key(app, key, app.saves.len()) {
                let record = app.saves[choice].clone();
                let bank = app.session.bank().clone();
                app.session = Session::restore(bank, &record.state);
                app.config.last_slot = Some(record.name.clone());
                app.persist_config();
                app.status = format!("Partida cargada: {}", record.name);
                app.state = AppState::Playing;
            }
            false
        }
        AppState::SlotEntry => {
            match key.code {
                KeyCode::Esc => {
                    app.slot_input.clear();
                    app.state = AppState::Playing;
                }
                KeyCode::Backspace => {
                    app.slot_input.pop();
                }
                KeyCode::Enter => {
                    match app.session.save(&app.store, &app.slot_input) {
                        Ok(record) => {
                            app.status = "Partida guardada correctamente.".to_string();
                            app.config.last_slot = Some(record.name);
                            app.persist_config();
                        }
                        Err(err) => app.status = err.to_string(),
                    }
                    app.slot_input.clear();
                    app.state = AppState::Playing;
                }
                KeyCode::Char(c) => app.slot_input.push(c),
                _ => {}
            }
            false
        }
    }
}

fn handle_playing_key(app: &mut App, key: KeyEvent, width: u16, height: u16) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(c @ '1'..='9') => {
            let snapshot = app.session.snapshot();
            let index = (c as usize) - ('1' as usize);
            if let Some(option) = snapshot.options.get(index) {
                // Eliminated options stay on screen but are not selectable
                if !option.disabled {
                    let intents = app.session.submit_answer(&option.text);
                    apply_intents(app, intents, width, height);
                }
            }
        }
        KeyCode::Char('p') => match app.session.use_hint() {
            Ok(Some(_)) => app.status.clear(),
            Ok(None) => app.status = "No quedan pistas.".to_string(),
            Err(err) => app.status = err.to_string(),
        },
        KeyCode::Char('s') => match app.session.use_skip() {
            Ok(intents) => apply_intents(app, intents, width, height),
            Err(err) => app.status = err.to_string(),
        },
        KeyCode::Char('e') => {
            if let Err(err) = app.session.use_eliminate_two() {
                app.status = err.to_string();
            }
        }
        KeyCode::Char('i') => {
            if let Err(err) = app.session.use_investigate(SystemTime::now()) {
                app.status = err.to_string();
            }
        }
        KeyCode::Char('c') => {
            app.selected = app.session.snapshot().category_index;
            app.state = AppState::Categories;
        }
        KeyCode::Char('d') => {
            let current = app.session.snapshot().difficulty;
            app.selected = DifficultyProfile::all()
                .iter()
                .position(|p| p.name == current)
                .unwrap_or(0);
            app.state = AppState::Difficulties;
        }
        KeyCode::Char('l') => {
            app.saves = app.store.list();
            app.selected = 0;
            app.state = AppState::Saves;
        }
        KeyCode::Char('g') => {
            app.slot_input = app.config.last_slot.clone().unwrap_or_default();
            app.state = AppState::SlotEntry;
        }
        KeyCode::Char('n') => {
            let intents = app.session.new_game();
            app.status = "Nueva partida iniciada.".to_string();
            apply_intents(app, intents, width, height);
        }
        _ => {}
    }
    false
}

/// Shared up/down/enter/digit navigation for the picker screens. Returns the
/// confirmed index, if any; Esc falls back to the game.
fn handle_menu_key(app: &mut App, key: KeyEvent, count: usize) -> Option<usize> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Playing;
            None
        }
        KeyCode::Up => {
            app.selected = app.selected.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if app.selected + 1 < count {
                app.selected += 1;
            }
            None
        }
        KeyCode::Enter => Some(app.selected),
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            (index < count).then_some(index)
        }
        _ => None,
    }
}

fn init_tracing() {
    if std::env::var("RUST_LOG").is_err() {
        return;
    }
    let Some(project_dirs) = ProjectDirs::from("", "", "historia") else {
        return;
    };
    let log_dir = project_dirs.data_local_dir();
    if std::fs::create_dir_all(log_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(log_dir.join("historia.log")) else {
        return;
    };
    // The terminal belongs to ratatui; logs go to a file, never stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap().into_path();
        let store = SaveStore::with_path(dir.join("partidas.json"));
        let config_store = FileConfigStore::with_path(dir.join("config.json"));
        App::new(QuestionBank::load(), store, Config::default(), config_store)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn esc_quits_from_the_game_screen() {
        let mut app = test_app();

        assert!(handle_key(&mut app, press(KeyCode::Esc), 80, 24));
    }

    #[test]
    fn answering_with_a_digit_resolves_the_round() {
        let mut app = test_app();
        let before = app.session.snapshot().question_number;

        handle_key(&mut app, press(KeyCode::Char('1')), 80, 24);

        let after = app.session.snapshot();
        assert!(after.question_number != before || after.score > 0 || after.lives < 5);
    }

    #[test]
    fn category_picker_round_trip() {
        let mut app = test_app();

        handle_key(&mut app, press(KeyCode::Char('c')), 80, 24);
        assert_eq!(app.state, AppState::Categories);

        handle_key(&mut app, press(KeyCode::Down), 80, 24);
        handle_key(&mut app, press(KeyCode::Enter), 80, 24);

        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.session.snapshot().category_index, 1);
    }

    #[test]
    fn difficulty_picker_updates_config() {
        let mut app = test_app();

        handle_key(&mut app, press(KeyCode::Char('d')), 80, 24);
        assert_eq!(app.state, AppState::Difficulties);

        // First profile in the registry is facil
        handle_key(&mut app, press(KeyCode::Char('1')), 80, 24);

        assert_eq!(app.session.snapshot().difficulty, "facil");
        assert_eq!(app.config.difficulty, "facil");
    }

    #[test]
    fn slot_entry_saves_under_the_typed_name() {
        let mut app = test_app();

        handle_key(&mut app, press(KeyCode::Char('g')), 80, 24);
        assert_eq!(app.state, AppState::SlotEntry);
        for c in "Ana".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), 80, 24);
        }
        handle_key(&mut app, press(KeyCode::Enter), 80, 24);

        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.config.last_slot.as_deref(), Some("Ana"));
        assert_eq!(app.store.list().len(), 1);
    }

    #[test]
    fn empty_slot_name_reports_the_error() {
        let mut app = test_app();

        handle_key(&mut app, press(KeyCode::Char('g')), 80, 24);
        handle_key(&mut app, press(KeyCode::Enter), 80, 24);

        assert!(app.store.list().is_empty());
        assert!(!app.status.is_empty());
    }

    #[test]
    fn load_menu_with_no_saves_returns_on_esc() {
        let mut app = test_app();

        handle_key(&mut app, press(KeyCode::Char('l')), 80, 24);
        assert_eq!(app.state, AppState::Saves);
        handle_key(&mut app, press(KeyCode::Esc), 80, 24);

        assert_eq!(app.state, AppState::Playing);
    }

    #[test]
    fn saving_then_loading_restores_the_run() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Char('1')), 80, 24);
        handle_key(&mut app, press(KeyCode::Char('g')), 80, 24);
        for c in "Luis".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)), 80, 24);
        }
        handle_key(&mut app, press(KeyCode::Enter), 80, 24);
        let saved = app.session.to_saved_state();

        handle_key(&mut app, press(KeyCode::Char('l')), 80, 24);
        handle_key(&mut app, press(KeyCode::Enter), 80, 24);

        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.session.to_saved_state(), saved);
    }
}
