//! Prompt command implementations

use anyhow::{Context, Result};
use spendbot_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// Print each prompt in effect, noting whether an override replaced the default
pub fn cmd_prompts_show() -> Result<()> {
    let library = PromptLibrary::new();

    for id in PromptId::all() {
        let prompt = library
            .get(*id)
            .with_context(|| format!("Failed to load prompt {}", id.as_str()))?;

        let source = match &prompt.override_path {
            Some(path) => format!("override at {}", path.display()),
            None => "built-in".to_string(),
        };
        println!(
            "📝 {} v{} ({})",
            prompt.metadata.id, prompt.metadata.version, source
        );
        println!();
        println!("{}", prompt.content.trim_end());
        println!();
    }

    Ok(())
}

/// Print the directory searched for `<prompt id>.md` overrides
pub fn cmd_prompts_path() -> Result<()> {
    let dir = default_prompts_dir().context("No local data directory on this system")?;
    println!("{}", dir.display());

    if !dir.exists() {
        eprintln!();
        eprintln!(
            "Not created yet. Add {}.md there to replace the built-in prompt.",
            PromptId::ClassifyIntent.as_str()
        );
    }

    Ok(())
}
