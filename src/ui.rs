//! User-facing terminal output.

use console::style;

/// Prints run output to stdout; silent when quiet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn info(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }

    pub fn success(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", style(format!("✔ {}", text.as_ref())).green().bold());
        }
    }

    pub fn warn(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", style(text.as_ref()).yellow());
        }
    }

    pub fn failure(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", style(format!("✖ {}", text.as_ref())).red().bold());
        }
    }

    pub fn cancelled(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", style(text.as_ref()).red());
        }
    }

    /// A generated message, shown before the review menu.
    pub fn message(&self, text: &str) {
        if !self.quiet {
            println!("{}\n", style(text).bold());
        }
    }

    /// Numbered file list under an underlined heading.
    pub fn files(&self, noun: &str, files: &[String]) {
        if self.quiet {
            return;
        }
        let plural = if files.len() == 1 { "" } else { "s" };
        println!(
            "{}",
            style(format!("Detected {} {noun} file{plural}:", files.len())).underlined()
        );
        for (idx, file) in files.iter().enumerate() {
            println!("     {}. {}", idx + 1, style(file).bold());
        }
    }

    /// Diff text with added and removed lines coloured.
    pub fn diff(&self, diff: &str) {
        if self.quiet {
            return;
        }
        println!("{}", style("Changes:").underlined());
        for line in diff.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                println!("{}", style(line).bold());
            } else if line.starts_with('+') {
                println!("{}", style(line).green());
            } else if line.starts_with('-') {
                println!("{}", style(line).red());
            } else if line.starts_with("@@") {
                println!("{}", style(line).cyan());
            } else {
                println!("{line}");
            }
        }
        println!();
    }
}
