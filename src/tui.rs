use crossterm::{
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
    },
};
use ratatui::prelude::*;
use std::io::{self, Stdout, stdout};
use std::panic;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Minimum required terminal dimensions
const MIN_WIDTH: u16 = 80;
const MIN_HEIGHT: u16 = 24;

/// Switches to the alternate screen in raw mode. A panic restores the
/// terminal before the panic message is printed.
pub fn init() -> io::Result<Tui> {
    let (width, height) = size()?;
    check_size(width, height)?;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore();
        default_hook(info);
    }));

    execute!(stdout(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

pub fn restore() -> io::Result<()> {
    execute!(stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

fn check_size(width: u16, height: u16) -> io::Result<()> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(io::Error::other(format!(
            "Terminal size too small. Required: {}x{}, Current: {}x{}\nPlease resize your terminal and try again.",
            MIN_WIDTH, MIN_HEIGHT, width, height
        )));
    }
    Ok(())
}
