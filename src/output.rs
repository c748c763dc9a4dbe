/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// replies, summaries and diagnostics all go through one place.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Loaded 3 containers")
    fn status(&self, message: &str);

    /// Success message (e.g., "Configuration is valid")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Orphaned container found")
    fn warning(&self, message: &str);

    /// Error message (e.g., "Malformed input line")
    fn error(&self, message: &str);

    /// A blank line separator.
    fn blank(&self);
}

/// Standard CLI output: stdout for results, stderr for diagnostics.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn blank(&self) {
        println!();
    }
}
