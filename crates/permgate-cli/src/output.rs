use colored::Colorize;
use permgate_core::{CacheStats, Decision, PermError};

pub fn print_decision(host: &str, key: &str, decision: Decision) {
    let label = match decision {
        Decision::Allow => "allow".green(),
        Decision::Deny => "deny".red(),
    };
    println!("{:<8} {host} ({})", label, key.dimmed());
}

pub fn print_lookup_error(host: &str, key: &str, err: &PermError) {
    println!("{:<8} {host} ({}): {err}", "error".yellow(), key.dimmed());
}

pub fn print_stats(stats: &CacheStats) {
    println!(
        "{}: {} entries, {} hits, {} misses ({:.1}% hit rate)",
        "Cache".cyan(),
        stats.size,
        stats.hits,
        stats.misses,
        stats.hit_rate()
    );
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
