//! Platform shell strategy
//!
//! Stage commands are opaque shell lines; the shell that interprets them
//! is resolved once from the host OS, never from per-stage configuration.

use std::process::Command;

/// Host shell used to interpret stage commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    /// `sh -c <command>`
    Posix,
    /// `cmd.exe /C <command>`
    Windows,
}

impl Shell {
    /// Resolves the shell for the host OS
    pub fn host() -> Self {
        if cfg!(windows) {
            Shell::Windows
        } else {
            Shell::Posix
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Shell::Posix => "sh",
            Shell::Windows => "cmd.exe",
        }
    }

    pub fn command_flag(self) -> &'static str {
        match self {
            Shell::Posix => "-c",
            Shell::Windows => "/C",
        }
    }

    /// Builds a [`Command`] that runs `command_line` through this shell
    pub fn command(self, command_line: &str) -> Command {
        let mut command = Command::new(self.program());
        command.arg(self.command_flag()).arg(command_line);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_host_shell_on_unix() {
        assert_eq!(Shell::host(), Shell::Posix);
    }

    #[test]
    #[cfg(windows)]
    fn test_host_shell_on_windows() {
        assert_eq!(Shell::host(), Shell::Windows);
    }

    #[test]
    fn test_command_construction() {
        let shell = Shell::Posix;
        let command = shell.command("echo hello");
        assert_eq!(command.get_program(), "sh");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["-c", "echo hello"]);
    }
}
