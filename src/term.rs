// MIT License
// Copyright (c) 2024 Graham King

use std::io;
use std::io::Write;

const DEFAULT_WIDTH: usize = 80;

#[repr(C)]
struct Winsize {
    ws_row: u16,
    ws_col: u16,
    ws_xpixel: u16,
    ws_ypixel: u16,
}

pub fn get_terminal_width() -> usize {
    let mut winsize: Winsize = unsafe { std::mem::zeroed() };
    let fd = 1; // standard output
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) } == -1 || winsize.ws_col == 0 {
        // Not a terminal, e.g. piped into a file
        return DEFAULT_WIDTH;
    }
    winsize.ws_col as usize
}

/// One line of "[title          3 / 50]", redrawn in place
pub fn progress_line(title: &str, idx: usize, total: usize, width: usize) -> String {
    let progress = format!("{} / {total}", idx + 1);
    let room = width.saturating_sub(progress.len() + 3);
    let title: String = title.chars().take(room).collect();
    let spaces = " ".repeat(room - title.chars().count());
    format!("\r[{title}{spaces} {progress}]")
}

pub fn show_progress(title: &str, idx: usize, total: usize, width: usize) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", progress_line(title, idx, total, width))?;
    stdout.flush()
}
