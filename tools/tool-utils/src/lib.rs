//! Helpers shared by the operator-facing tools: terminal prompts and
//! external command invocation

use eyre::Result;
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

/// The output of an external command whose streams were captured
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the command exited successfully
    pub success: bool,
    /// The captured stdout, lossily decoded
    pub stdout: String,
    /// The captured stderr, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Whether either stream contains the given (case-insensitive) needle
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.stdout.to_lowercase().contains(&needle) || self.stderr.to_lowercase().contains(&needle)
    }
}

/// Execute a command and capture its output instead of streaming it
///
/// A non-zero exit status is not an error here; callers inspect
/// [`CommandOutput::success`] and the captured streams
pub fn run_command_captured(mut cmd: Command) -> Result<CommandOutput> {
    let output = cmd.stdin(Stdio::null()).output()?;
    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// General function to prompt for input with a specific message
pub fn prompt_for_input(prompt: &str) -> io::Result<String> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    read_input(prompt, &mut stdin.lock(), &mut stdout.lock())
}

/// Prompt for a yes/no answer, anything other than `y`/`yes` is a no
pub fn prompt_for_confirmation(prompt: &str) -> io::Result<bool> {
    let answer = prompt_for_input(&format!("{prompt} (y/n)"))?;
    Ok(is_affirmative(&answer))
}

/// Write the prompt to `output` and read one trimmed line from `input`
fn read_input(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<String> {
    write!(output, "{}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Whether an answer reads as a yes
fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::{is_affirmative, read_input};

    #[test]
    fn test_read_input_trims_line() {
        let mut input = "  0xabc \n".as_bytes();
        let mut output = Vec::new();
        let line = read_input("Enter address", &mut input, &mut output).unwrap();

        assert_eq!(line, "0xabc");
        assert_eq!(String::from_utf8(output).unwrap(), "Enter address: ");
    }

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yeah"));
    }
}
