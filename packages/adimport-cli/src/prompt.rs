use eyre::{Context, eyre};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum PasswordInputError {
    #[error("no password was entered")]
    Empty,
}

/// Accept the line read from the prompt, an empty line (or end of input)
/// aborts instead of binding without a password
pub fn require_password(input: String) -> Result<String, PasswordInputError> {
    if input.is_empty() {
        return Err(PasswordInputError::Empty);
    }

    Ok(input)
}

/// Prompt for a masked password on the terminal
///
/// Interrupting the prompt restores the terminal and fails instead of
/// killing the process
pub async fn prompt_password(prompt: String) -> eyre::Result<String> {
    let terminal = terminal::TerminalState::capture();
    let (tx, rx) = oneshot::channel();

    // Plain thread rather than a blocking task, an interrupted read must
    // not hold up the runtime shutdown
    std::thread::spawn(move || {
        let result = dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact();
        _ = tx.send(result);
    });

    let input = tokio::select! {
        result = rx => result
            .context("password prompt closed")?
            .context("failed to read password")?,
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for interrupt")?;
            if let Some(terminal) = terminal {
                terminal.restore();
            }
            eprintln!();
            return Err(eyre!("password prompt interrupted"));
        }
    };

    Ok(require_password(input)?)
}

/// Exit with a failure when interrupted, the prompt replaces the default
/// interrupt handling for the rest of the process
pub fn exit_on_interrupt() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted");
            std::process::exit(1);
        }
    });
}

#[cfg(unix)]
mod terminal {
    use std::{fs::File, mem::MaybeUninit, os::fd::AsRawFd};

    /// Terminal attributes captured before the prompt disables echo
    pub struct TerminalState {
        tty: File,
        termios: libc::termios,
    }

    impl TerminalState {
        pub fn capture() -> Option<Self> {
            let tty = File::open("/dev/tty").ok()?;
            let mut termios = MaybeUninit::<libc::termios>::uninit();

            // SAFETY: `tty` is an open descriptor and `termios` is only read
            // once tcgetattr reports it was filled
            let termios = unsafe {
                if libc::tcgetattr(tty.as_raw_fd(), termios.as_mut_ptr()) != 0 {
                    return None;
                }
                termios.assume_init()
            };

            Some(Self { tty, termios })
        }

        pub fn restore(&self) {
            // SAFETY: `tty` is still open and `termios` came from tcgetattr
            let result =
                unsafe { libc::tcsetattr(self.tty.as_raw_fd(), libc::TCSANOW, &self.termios) };
            if result != 0 {
                tracing::warn!("failed to restore terminal attributes");
            }
        }
    }
}

#[cfg(not(unix))]
mod terminal {
    pub struct TerminalState;

    impl TerminalState {
        pub fn capture() -> Option<Self> {
            None
        }

        pub fn restore(&self) {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            require_password(String::new()),
            Err(PasswordInputError::Empty)
        ));
    }

    #[test]
    fn test_password_is_accepted() {
        assert_eq!(require_password("Secret123!".to_string()).unwrap(), "Secret123!");
        assert_eq!(require_password(" ".to_string()).unwrap(), " ");
    }
}
