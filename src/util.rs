/// Format a second count as `m:ss` for the round timer display.
pub fn format_seconds(total: u32) -> String {
    let minutes = total / 60;
    let seconds = total % 60;
    format!("{minutes}:{seconds:02}")
}

/// Lives indicator: hearts for finite lives, an infinity sign otherwise.
pub fn lives_display(lives: u32, unlimited: bool) -> String {
    if unlimited {
        "∞".to_string()
    } else {
        "♥".repeat(lives as usize)
    }
}
