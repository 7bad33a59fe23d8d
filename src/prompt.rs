//! Interactive prompting for the format command's partition interview.
//!
//! `ionicfs_core` otherwise never touches stdio directly, but prompting the
//! user for partition names/sizes is part of what `format` *is* rather than
//! a way of reporting a result, so it lives here rather than being pushed
//! up into the CLI layer and threaded back down as arguments.

use std::io::{self, BufRead, Write};

/// Shows `text` as a prompt and returns the line the user typed, without its
/// trailing newline. Simpler than the teacher's `utils::prompt::prompt` —
/// IonicFS never prompts for a hidden value, so there's no termios state to
/// save and restore.
pub fn prompt(text: &str) -> io::Result<String> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Asks `text` as a yes/no question, re-prompting on anything but
/// `y`/`Y`/`n`/`N`, matching the original tool's `readYesOrNo`.
pub fn prompt_yes_no(text: &str) -> io::Result<bool> {
    loop {
        let answer = prompt(&format!("{text} (y/n): "))?;
        match answer.as_str() {
            "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            _ => println!("Invalid input. Please enter 'y' or 'n'."),
        }
    }
}

/// Trims leading/trailing spaces, matching the original tool's `trim`
/// (which only strips `' '`, not all whitespace).
pub fn trim(s: &str) -> &str {
    s.trim_matches(' ')
}
