//! Line-based prompts on stderr, so `--json` output on stdout stays clean.

use anyhow::Context;
use std::io::{BufRead, Write};

/// Ask a question and read one line. Returns `None` on end of input or an
/// empty answer.
pub fn ask(question: &str) -> anyhow::Result<Option<String>> {
    eprint!("{question}: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let answer = line.trim();
    if read == 0 || answer.is_empty() {
        Ok(None)
    } else {
        Ok(Some(answer.to_string()))
    }
}

/// Offer a numbered list; accepts either the number or the value itself.
pub fn choose(label: &str, options: &[&str]) -> anyhow::Result<Option<String>> {
    eprintln!("{label}:");
    for (i, option) in options.iter().enumerate() {
        eprintln!("  {}) {option}", i + 1);
    }
    let Some(answer) = ask(&format!("Select {}", label.to_lowercase()))? else {
        return Ok(None);
    };
    Ok(Some(pick(&answer, options)))
}

fn pick(answer: &str, options: &[&str]) -> String {
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .map(|o| o.to_string())
        .unwrap_or_else(|| answer.to_string())
}

/// `[y/N]` confirmation; anything but y/yes is a no.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = ask(&format!("{question} [y/N]"))?;
    Ok(matches!(
        answer.as_deref().map(str::to_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}
