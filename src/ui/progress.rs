use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::time::Duration;

fn interactive() -> bool {
    console::Term::stdout().is_term() && !crate::output::is_quiet()
}

/// Progress over a batch of snapshot files
pub struct CheckProgress {
    bar: ProgressBar,
}

impl CheckProgress {
    pub fn new(total_files: usize) -> Self {
        let bar = if interactive() {
            ProgressBar::new(total_files as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn start_file(&self, file: &str) {
        self.bar.set_message(format!("Checking: {}", file));
    }

    pub fn finish_file(&self) {
        self.bar.inc(1);
    }

    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }

    pub fn finish_with_summary(&self, duration: Duration, files: usize, nodes: usize, dangling: usize) {
        self.clear();
        let t = theme();
        println!();
        println!(
            "{} {}",
            t.paint(t.clean, Icons::CHECK),
            t.paint(t.clean, &format!("Checked in {}", HumanDuration(duration)))
        );
        println!(
            "  {} {}  {} {}  {} {}",
            t.paint(t.accent, Icons::FILE),
            files,
            t.paint(t.accent, Icons::LINK),
            nodes,
            t.paint(if dangling > 0 { t.dangling } else { t.notice }, Icons::WARN),
            dangling
        );
    }
}
