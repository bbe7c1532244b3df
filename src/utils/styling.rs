//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

use crate::pipeline::AnalysisConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌍 ", "");
pub static MONEY: Emoji<'_, '_> = Emoji("💰 ", "");

const BOX_WIDTH: usize = 56;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ╦═╗╔═╗╔╦╗╔═╗╦╦    ╔═╗╔═╗╔═╗╔═╗╔═╗╔═╗
    ╠╦╝║╣  ║ ╠═╣║║    ╚═╗║  ║ ║╠═╝║╣
    ╩╚═╚═╝ ╩ ╩ ╩╩╩═╝  ╚═╝╚═╝╚═╝╩  ╚═╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Customer segments, cohorts and lifetime value").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(input: &Path, config: &AnalysisConfig) {
    let line = "─".repeat(BOX_WIDTH - 2);

    let window = match config.filter.date_range {
        Some((start, end)) => format!("{} → {}", start, end),
        None => "all dates".to_string(),
    };
    let countries = if config.filter.countries.is_empty() {
        "all countries".to_string()
    } else {
        config
            .filter
            .countries
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(BOX_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:     {:<36}│",
        FOLDER,
        truncate_path(input, 35)
    );
    println!(
        "    │  {} Window:    {:<36}│",
        CALENDAR,
        truncate_string(&window, 35)
    );
    println!(
        "    │  {} Countries: {:<36}│",
        GLOBE,
        truncate_string(&countries, 35)
    );
    println!(
        "    │  {} Returns:   {:<36}│",
        CHART,
        config.filter.return_mode.to_string()
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Margin / retention / discount: {:<16}│",
        MONEY,
        style(format!(
            "{:.2} / {:.2} / {:.2}",
            config.margin_rate, config.retention_rate, config.discount_rate
        ))
        .yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Customer analysis complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }

    #[test]
    fn test_truncate_multibyte() {
        let s = "Österreich, España, Česko";
        let out = truncate_string(s, 10);
        assert!(out.starts_with("..."));
        assert_eq!(out.chars().count(), 10);
    }
}
