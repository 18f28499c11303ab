use arboard::Clipboard;

/// Put `text` on the system clipboard with line endings normalized to `\n`.
pub fn copy_text(text: &str) -> Result<(), anyhow::Error> {
    let normalized = text.lines().collect::<Vec<_>>().join("\n");
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(normalized)?;
    Ok(())
}
