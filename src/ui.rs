use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use historia::celebration::ConfettiBurst;
use historia::difficulty::{DifficultyProfile, PowerUpKind};
use historia::session::Snapshot;
use historia::util::{format_seconds, lives_display};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;

const CONFETTI_COLORS: [Color; 4] = [
    Color::Rgb(0x63, 0x66, 0xf1),
    Color::Rgb(0x38, 0xbd, 0xf8),
    Color::Rgb(0xf4, 0x72, 0xb6),
    Color::Rgb(0x22, 0xc5, 0x5e),
];

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Playing => render_game(self, area, buf),
            AppState::Categories => {
                let items: Vec<String> = self
                    .session
                    .bank()
                    .categories()
                    .iter()
                    .map(|c| format!("{} ({} preguntas) · {}", c.name, c.questions.len(), c.description))
                    .collect();
                render_menu(area, buf, "Categorías disponibles", &items, self.selected);
            }
            AppState::Difficulties => {
                let items: Vec<String> = DifficultyProfile::all()
                    .iter()
                    .map(describe_profile)
                    .collect();
                render_menu(area, buf, "Dificultad", &items, self.selected);
            }
            AppState::Saves => {
                let items: Vec<String> = self
                    .saves
                    .iter()
                    .map(|record| {
                        format!(
                            "{} | Máx {} | {}",
                            record.name, record.best_score, record.date
                        )
                    })
                    .collect();
                if items.is_empty() {
                    render_menu(area, buf, "Partidas guardadas", &["Sin partidas guardadas".to_string()], 0);
                } else {
                    render_menu(area, buf, "Partidas guardadas", &items, self.selected);
                }
            }
            AppState::SlotEntry => render_slot_entry(self, area, buf),
        }
        render_confetti(&self.confetti, area, buf);
    }
}

fn render_game(app: &App, area: Rect, buf: &mut Buffer) {
    let snapshot = app.session.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // stats
            Constraint::Length(1), // power-ups
            Constraint::Length(1), // padding
            Constraint::Min(6),    // question + options
            Constraint::Length(2), // message + status
            Constraint::Length(1), // help
        ])
        .split(area);

    render_header(&snapshot, chunks[0], buf);
    render_stats(&snapshot, chunks[1], buf);
    render_power_ups(&snapshot, chunks[2], buf);
    render_question(&snapshot, chunks[4], buf);
    render_messages(app, &snapshot, chunks[5], buf);

    let help = Paragraph::new(Span::styled(
        "1-9 responder · p pista · s saltar · e eliminar · i investigar · c categorías · d dificultad · g guardar · l cargar · n nueva · esc salir",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    help.render(chunks[6], buf);
}

fn render_header(snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    let title = if snapshot.bonus_round {
        format!(" {} · ronda especial ★ ", snapshot.category_name)
    } else {
        format!(" {} ", snapshot.category_name)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Left);
    let inner = block.inner(area);
    block.render(area, buf);

    let line = Line::from(vec![
        Span::styled(
            "Historia Universal",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  ·  dificultad "),
        Span::styled(
            snapshot.difficulty.clone(),
            Style::default().fg(Color::Magenta),
        ),
    ]);
    Paragraph::new(line).render(inner, buf);
}

fn render_stats(snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    let mut spans = vec![
        Span::raw("Vidas: "),
        Span::styled(
            lives_display(snapshot.lives, snapshot.unlimited_lives),
            Style::default().fg(Color::Red),
        ),
        Span::raw(format!("   Puntaje: {}", snapshot.score)),
        Span::raw(format!(
            "   Pregunta {}/{}",
            snapshot.question_number, snapshot.question_total
        )),
    ];
    if snapshot.timer_running {
        let timer_style = if snapshot.time_remaining <= 5 {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::raw("   ⏱ "));
        spans.push(Span::styled(
            format_seconds(snapshot.time_remaining),
            timer_style,
        ));
    }
    if snapshot.grace_remaining > 0 {
        spans.push(Span::styled(
            format!("   investigando: {}s", snapshot.grace_remaining),
            Style::default().fg(Color::Yellow),
        ));
    }
    Paragraph::new(Line::from(spans)).render(area, buf);
}

fn render_power_ups(snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    let keys = ['p', 's', 'i', 'e'];
    let spans: Vec<Span> = PowerUpKind::ALL
        .iter()
        .zip(keys)
        .flat_map(|(kind, key)| {
            let count = snapshot.power_ups.remaining(*kind);
            let style = if count == 0 {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default().fg(Color::Cyan)
            };
            vec![
                Span::styled(format!("{} ({key}): {count}", kind.label()), style),
                Span::raw("   "),
            ]
        })
        .collect();
    Paragraph::new(Line::from(spans)).render(area, buf);
}

fn render_question(snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    let Some(prompt) = &snapshot.prompt else {
        let done = Paragraph::new(Span::styled(
            "¡Categoría completada!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        done.render(area, buf);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(2)])
        .split(area);

    // Centering a short prompt reads nicer; long prompts wrap left-aligned
    let alignment = if prompt.width() <= chunks[0].width as usize {
        Alignment::Center
    } else {
        Alignment::Left
    };
    Paragraph::new(Span::styled(
        prompt.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(alignment)
    .wrap(Wrap { trim: true })
    .render(chunks[0], buf);

    let mut lines = Vec::new();
    for (idx, option) in snapshot.options.iter().enumerate() {
        let line = if option.disabled {
            Line::from(Span::styled(
                format!("  {}. {}", idx + 1, option.text),
                Style::default()
                    .add_modifier(Modifier::DIM)
                    .add_modifier(Modifier::CROSSED_OUT),
            ))
        } else {
            Line::from(vec![
                Span::styled(
                    format!("  {}. ", idx + 1),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(option.text.clone()),
            ])
        };
        lines.push(line);
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_messages(app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    Paragraph::new(Span::raw(snapshot.message.clone())).render(chunks[0], buf);
    Paragraph::new(Span::styled(
        app.status.clone(),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[1], buf);
}

fn render_menu(area: Rect, buf: &mut Buffer, title: &str, items: &[String], selected: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Length(2), Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    Paragraph::new(Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .render(chunks[0], buf);

    let lines: Vec<Line> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            if idx == selected {
                Line::from(Span::styled(
                    format!("› {}. {item}", idx + 1),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::raw(format!("  {}. {item}", idx + 1)))
            }
        })
        .collect();
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "↑/↓ mover · enter elegir · esc volver",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

fn render_slot_entry(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    Paragraph::new(Span::styled(
        "Nombre de la partida",
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .render(chunks[0], buf);

    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(chunks[1]);
    block.render(chunks[1], buf);
    Paragraph::new(Line::from(vec![
        Span::raw(app.slot_input.clone()),
        Span::styled("▌", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .render(inner, buf);

    Paragraph::new(Span::styled(
        "enter guardar · esc cancelar",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

fn render_confetti(confetti: &ConfettiBurst, area: Rect, buf: &mut Buffer) {
    if !confetti.is_active {
        return;
    }
    for particle in &confetti.particles {
        let x = particle.x.round() as i32;
        let y = particle.y.round() as i32;
        if x >= area.x as i32
            && x < (area.x + area.width) as i32
            && y >= area.y as i32
            && y < (area.y + area.height) as i32
        {
            let color = CONFETTI_COLORS[particle.color_index % CONFETTI_COLORS.len()];
            buf.set_string(
                x as u16,
                y as u16,
                particle.symbol.to_string(),
                Style::default().fg(color),
            );
        }
    }
}

fn describe_profile(profile: &DifficultyProfile) -> String {
    let lives = if profile.unlimited_lives() {
        "vidas ilimitadas".to_string()
    } else {
        format!("{} vidas", profile.starting_lives)
    };
    let mut extras = Vec::new();
    if profile.hardcore_on_wrong_answer {
        extras.push("un fallo reinicia");
    }
    if !profile.can_save {
        extras.push("sin guardado");
    }
    let extras = if extras.is_empty() {
        String::new()
    } else {
        format!(" · {}", extras.join(" · "))
    };
    format!(
        "{}: {lives}, {}s por pregunta{extras}",
        profile.name, profile.normal_time_limit_secs
    )
}
