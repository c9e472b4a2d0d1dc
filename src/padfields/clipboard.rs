use crate::context::ClipboardAccessor;
use crate::error::{FieldsError, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Reads the system clipboard through the platform's command line tools.
/// - macOS: pbpaste
/// - Linux: xclip, falling back to xsel
/// - Windows: powershell Get-Clipboard
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ClipboardAccessor for SystemClipboard {
    fn current_text(&self) -> Result<Option<String>> {
        read_clipboard().map(|text| if text.is_empty() { None } else { Some(text) })
    }
}

/// Copies text to the system clipboard in an OS-specific way.
/// - macOS: uses pbcopy
/// - Linux: uses xclip or xsel
/// - Windows: uses clip.exe
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        pipe_into("pbcopy", &[], text)
    }

    #[cfg(target_os = "linux")]
    {
        pipe_into("xclip", &["-selection", "clipboard"], text)
            .or_else(|_| pipe_into("xsel", &["--clipboard", "--input"], text))
            .map_err(|e| FieldsError::Clipboard(format!("{}. Install xclip or xsel.", e)))
    }

    #[cfg(target_os = "windows")]
    {
        pipe_into("clip", &[], text)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = text;
        Err(FieldsError::Clipboard(
            "Clipboard not supported on this platform".to_string(),
        ))
    }
}

/// Returns the current clipboard text.
pub fn read_clipboard() -> Result<String> {
    #[cfg(target_os = "macos")]
    {
        capture("pbpaste", &[])
    }

    #[cfg(target_os = "linux")]
    {
        capture("xclip", &["-selection", "clipboard", "-o"])
            .or_else(|_| capture("xsel", &["--clipboard", "--output"]))
            .map_err(|e| FieldsError::Clipboard(format!("{}. Install xclip or xsel.", e)))
    }

    #[cfg(target_os = "windows")]
    {
        capture("powershell", &["-NoProfile", "-Command", "Get-Clipboard"])
            .map(|text| text.trim_end_matches(['\r', '\n']).to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(FieldsError::Clipboard(
            "Clipboard not supported on this platform".to_string(),
        ))
    }
}

#[allow(dead_code)]
fn pipe_into(program: &str, args: &[&str], text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| FieldsError::Clipboard(format!("Failed to spawn {}: {}", program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| FieldsError::Clipboard(format!("Failed to write to {}: {}", program, e)))?;
    }

    let status = child
        .wait()
        .map_err(|e| FieldsError::Clipboard(format!("Failed to wait for {}: {}", program, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(FieldsError::Clipboard(format!("{} exited with error", program)))
    }
}

#[allow(dead_code)]
fn capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| FieldsError::Clipboard(format!("Failed to spawn {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(FieldsError::Clipboard(format!("{} exited with error", program)));
    }
    String::from_utf8(output.stdout)
        .map_err(|_| FieldsError::Clipboard(format!("{} returned non UTF-8 text", program)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_a_clipboard_error() {
        let err = capture("padfields-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, FieldsError::Clipboard(_)));
        let err = pipe_into("padfields-no-such-program", &[], "x").unwrap_err();
        assert!(err.to_string().starts_with("Clipboard error: Failed to spawn"));
    }
}
