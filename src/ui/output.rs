//! Line-oriented report output. Errors and warnings go to stderr.

use crate::scope::AvailableNode;
use crate::ui::{theme, Icons};

pub fn heading(text: &str) {
    let t = theme();
    println!("{} {}", Icons::ROCKET, t.paint(t.heading, text));
}

/// Command banner, suppressed by `FLOWREF_QUIET`
pub fn banner(title: &str, subtitle: &str) {
    if crate::output::is_quiet() {
        return;
    }
    let t = theme();
    println!();
    println!("  {}", t.paint(t.accent, title));
    println!("  {}", t.paint(t.label, subtitle));
    println!();
}

pub fn status(icon: &str, label: &str, value: &str) {
    let t = theme();
    println!("{} {}: {}", icon, t.paint(t.label, label), value);
}

/// `label: none`, for an empty scope or dependents list
pub fn nothing(label: &str) {
    let t = theme();
    println!("{} {}: none", t.paint(t.accent, Icons::INFO), t.paint(t.label, label));
}

pub fn success(label: &str) {
    let t = theme();
    println!("{} {}", Icons::CHECK, t.paint(t.clean, label));
}

pub fn error(label: &str) {
    let t = theme();
    eprintln!("{} {}", Icons::CROSS, t.paint(t.dangling, label));
}

pub fn warn(label: &str) {
    let t = theme();
    eprintln!("{} {}", Icons::WARN, t.paint(t.notice, label));
}

/// One picker group: the node heading, then a `token  dataType` line per variable
pub fn picker_group(group: &AvailableNode) {
    let t = theme();
    let title = format!(" {} ({}, {}) ", group.node_name, group.node_id, group.node_type);
    println!();
    println!("━{}━", t.paint(t.heading, &title));
    for var in &group.variables {
        println!("  {} {}", t.paint(t.token, &var.key), t.paint(t.data_type, &var.data_type));
    }
}

pub fn snapshot_clean(path: &str) {
    let t = theme();
    println!("  {}", t.paint(t.faded, &format!("{} ok", path)));
}

pub fn snapshot_with_issues(path: &str, dangling: usize) {
    let t = theme();
    println!(
        "{} {} {}",
        t.paint(t.notice, Icons::MOD),
        path,
        t.paint(t.dangling, &format!("({} dangling)", dangling))
    );
}

pub fn snapshot_removed(path: &str) {
    let t = theme();
    println!("{} {}", t.paint(t.dangling, Icons::DEL), path);
}
