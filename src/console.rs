use std::io::{self, BufRead, Write};

use historia::bank::QuestionBank;
use historia::difficulty::DifficultyProfile;
use historia::save::SaveStore;
use historia::session::{Intent, Session};

/// Plain console front-end: numbered menus over stdin/stdout, no timers and
/// no power-ups. Exits cleanly from the "Salir" entry.
pub fn run(bank: QuestionBank, store: SaveStore, difficulty: &str) -> io::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    run_with(&mut input, &mut out, bank, store, difficulty)
}

/// Same loop over arbitrary streams, so tests can script a whole game.
pub fn run_with<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    bank: QuestionBank,
    store: SaveStore,
    difficulty: &str,
) -> io::Result<()> {
    let profile = DifficultyProfile::by_name(difficulty)
        .unwrap_or_else(DifficultyProfile::default_profile)
        .clone();
    loop {
        writeln!(out, "\n=== Juego de Historia Universal ===")?;
        let choice = prompt_choice(
            input,
            out,
            "Menú principal:",
            &["Iniciar nueva partida", "Cargar partida", "Salir"],
        )?;
        match choice {
            Some(0) => new_game(input, out, &bank, &store, &profile)?,
            Some(1) => resume_game(input, out, &bank, &store)?,
            _ => {
                writeln!(out, "Gracias por jugar. ¡Hasta pronto!")?;
                return Ok(());
            }
        }
    }
}

fn new_game<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    bank: &QuestionBank,
    store: &SaveStore,
    profile: &DifficultyProfile,
) -> io::Result<()> {
    let names: Vec<String> = bank.categories().iter().map(|c| c.name.clone()).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let Some(category) = prompt_choice(input, out, "Selecciona la categoría:", &name_refs)? else {
        return Ok(());
    };
    let mut session = Session::with_profile(bank.clone(), profile.clone());
    if let Err(err) = session.select_category(category) {
        writeln!(out, "{err}")?;
        return Ok(());
    }
    play(input, out, &mut session)?;
    offer_save(input, out, store, &session)
}

fn resume_game<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    bank: &QuestionBank,
    store: &SaveStore,
) -> io::Result<()> {
    let records = store.list();
    if records.is_empty() {
        writeln!(out, "No hay partidas guardadas.")?;
        return Ok(());
    }
    let labels: Vec<String> = records
        .iter()
        .map(|r| format!("{} | Máx {} | {}", r.name, r.best_score, r.date))
        .collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let Some(index) = prompt_choice(input, out, "Selecciona una partida:", &label_refs)? else {
        return Ok(());
    };
    let record = &records[index];
    let mut session = Session::restore(bank.clone(), &record.state);
    writeln!(out, "Reanudando partida: {}", record.name)?;
    play(input, out, &mut session)?;
    if let Err(err) = session.save(store, &record.name) {
        writeln!(out, "{err}")?;
    } else {
        writeln!(out, "Partida actualizada.")?;
    }
    Ok(())
}

fn play<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    session: &mut Session,
) -> io::Result<()> {
    loop {
        let snapshot = session.snapshot();
        let Some(prompt) = snapshot.prompt else {
            writeln!(out, "¡Felicidades! Has completado la categoría.")?;
            writeln!(out, "Puntaje obtenido: {}", snapshot.score)?;
            return Ok(());
        };
        if snapshot.bonus_round {
            writeln!(out, "★ Pregunta especial:")?;
        }
        let options: Vec<&str> = snapshot.options.iter().map(|o| o.text.as_str()).collect();
        let Some(choice) = prompt_choice(input, out, &prompt, &options)? else {
            return Ok(());
        };
        let intents = session.submit_answer(&snapshot.options[choice].text);
        writeln!(out, "{}", session.snapshot().message)?;
        if intents
            .iter()
            .any(|intent| matches!(intent, Intent::RoundLost(_)))
        {
            writeln!(out, "Puedes intentarlo de nuevo desde el menú.")?;
            return Ok(());
        }
    }
}

fn offer_save<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    store: &SaveStore,
    session: &Session,
) -> io::Result<()> {
    if !session.profile().can_save {
        return Ok(());
    }
    writeln!(out, "Nombre para guardar la partida (vacío para omitir):")?;
    let Some(name) = read_line(input)? else {
        return Ok(());
    };
    if name.trim().is_empty() {
        return Ok(());
    }
    match session.save(store, &name) {
        Ok(_) => writeln!(out, "Partida guardada correctamente."),
        Err(err) => writeln!(out, "{err}"),
    }
}

/// Print a numbered menu and read a valid 1-based selection. Returns None on
/// end of input.
fn prompt_choice<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    options: &[&str],
) -> io::Result<Option<usize>> {
    loop {
        writeln!(out, "\n{prompt}")?;
        for (index, option) in options.iter().enumerate() {
            writeln!(out, "  {}. {option}", index + 1)?;
        }
        write!(out, "Selecciona una opción: ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        if let Ok(number) = line.trim().parse::<usize>() {
            if (1..=options.len()).contains(&number) {
                return Ok(Some(number - 1));
            }
        }
        writeln!(out, "Opción inválida. Intenta nuevamente.")?;
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end().to_string()))
}
