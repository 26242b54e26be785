//! Synthesized diffs for untracked files.
//!
//! `git diff` never shows untracked files, so auto-select mode renders each
//! one as a pure addition against an empty file.

use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

/// Render an untracked file as a unified diff against `/dev/null`.
///
/// Returns `None` for files that cannot be read or that look binary (a NUL
/// byte or invalid UTF-8); callers skip those rather than failing detection.
pub fn synthesize_diff(root: &Path, path: &str) -> Option<String> {
    let bytes = match std::fs::read(root.join(path)) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Skipping unreadable untracked file {path}: {e}");
            return None;
        }
    };

    if bytes.contains(&0) {
        debug!("Skipping binary untracked file {path}");
        return None;
    }
    let Ok(content) = String::from_utf8(bytes) else {
        debug!("Skipping non-UTF-8 untracked file {path}");
        return None;
    };

    Some(render_addition(path, &content))
}

fn render_addition(path: &str, content: &str) -> String {
    let mut diff = String::new();
    let _ = writeln!(diff, "diff --git a/{path} b/{path}");
    let _ = writeln!(diff, "new file mode 100644");
    let _ = writeln!(diff, "index 0000000..0000000");
    let _ = writeln!(diff, "--- /dev/null");
    let _ = writeln!(diff, "+++ b/{path}");

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return diff;
    }

    let _ = writeln!(diff, "@@ -0,0 +1,{} @@", lines.len());
    for line in lines {
        let _ = writeln!(diff, "+{line}");
    }
    diff
}
