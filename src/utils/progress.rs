// src/utils/progress.rs

//! Progress printing helpers on top of the `log` facade.
//!
//! Provides consistent section headers, numbered steps and summaries for the
//! run output.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
