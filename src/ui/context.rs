//! Terminal detection for the standard streams

use std::io::IsTerminal;

/// Which standard streams are attached to an interactive terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    stdin_terminal: bool,
    stdout_terminal: bool,
    stderr_terminal: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            stdin_terminal: std::io::stdin().is_terminal(),
            stdout_terminal: std::io::stdout().is_terminal(),
            stderr_terminal: std::io::stderr().is_terminal(),
        }
    }

    /// A context with no terminals attached (pipes everywhere)
    pub fn non_interactive() -> Self {
        Self {
            stdin_terminal: false,
            stdout_terminal: false,
            stderr_terminal: false,
        }
    }

    /// Override stdin detection
    pub fn with_stdin_terminal(mut self, terminal: bool) -> Self {
        self.stdin_terminal = terminal;
        self
    }

    /// Override stdout detection
    pub fn with_stdout_terminal(mut self, terminal: bool) -> Self {
        self.stdout_terminal = terminal;
        self
    }

    /// Override stderr detection
    pub fn with_stderr_terminal(mut self, terminal: bool) -> Self {
        self.stderr_terminal = terminal;
        self
    }

    /// Nothing can be piped in when stdin is a terminal
    pub fn stdin_is_terminal(&self) -> bool {
        self.stdin_terminal
    }

    /// Binary archives must not be written to a terminal
    pub fn stdout_is_terminal(&self) -> bool {
        self.stdout_terminal
    }

    /// Console progress renders on stderr
    pub fn stderr_is_terminal(&self) -> bool {
        self.stderr_terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_context() {
        let ctx = UiContext::non_interactive();
        assert!(!ctx.stdin_is_terminal());
        assert!(!ctx.stdout_is_terminal());
        assert!(!ctx.stderr_is_terminal());
    }

    #[test]
    fn overrides() {
        let ctx = UiContext::non_interactive()
            .with_stdout_terminal(true)
            .with_stderr_terminal(true);
        assert!(ctx.stdout_is_terminal());
        assert!(ctx.stderr_is_terminal());
        assert!(!ctx.stdin_is_terminal());
    }
}
