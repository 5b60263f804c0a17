use crate::settings::StoredSettings;
use anyhow::Context;
use clap::Parser;
use cohost_core::tools::ToolKind;
use std::{fs, path::PathBuf};

/// Cohost: a voice agent that listens in and speaks when addressed by name.
#[derive(Parser, Debug)]
#[command(name = "cohost", version, about)]
pub struct Cli {
    /// Name the agent answers to.
    #[arg(long)]
    pub name: Option<String>,

    /// Voice used for spoken replies.
    #[arg(long)]
    pub voice: Option<String>,

    /// Realtime model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Comma separated phrases that end an active dialogue.
    #[arg(long)]
    pub stop_words: Option<String>,

    /// File holding the instruction template (`{agentName}` is replaced).
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,

    /// Do not offer this tool to the agent. Repeatable.
    #[arg(long = "disable-tool", value_parser = parse_tool)]
    pub disabled_tools: Vec<ToolKind>,

    /// Persist the resulting settings for later runs.
    #[arg(long)]
    pub save: bool,

    /// Forget previously saved settings before applying these options.
    #[arg(long)]
    pub clear_settings: bool,

    /// Stream raw 24 kHz mono PCM16 audio from stdin to the session.
    #[arg(long)]
    pub audio_stdin: bool,
}

fn parse_tool(name: &str) -> Result<ToolKind, String> {
    ToolKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown tool '{name}' (expected one of: {})", known.join(", "))
    })
}

impl Cli {
    /// Overlays command line options onto saved settings.
    pub fn apply(&self, settings: &mut StoredSettings) -> anyhow::Result<()> {
        if let Some(name) = &self.name {
            settings.agent_name = name.clone();
        }
        if let Some(voice) = &self.voice {
            settings.voice = voice.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(stop_words) = &self.stop_words {
            settings.stop_words = stop_words.clone();
        }
        if let Some(path) = &self.instructions_file {
            settings.system_prompt = fs::read_to_string(path)
                .with_context(|| format!("Failed to read instructions from {}", path.display()))?;
        }
        for tool in &self.disabled_tools {
            settings.tools.set(*tool, false);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_flags_leave_settings_untouched() {
        let cli = Cli::try_parse_from(["cohost"]).unwrap();
        let mut settings = StoredSettings::default();
        let before = settings.clone();
        cli.apply(&mut settings).unwrap();
        assert_eq!(settings, before);
        assert!(!cli.save && !cli.audio_stdin);
    }

    #[test]
    fn flags_override_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "You are {{agentName}}, a quiz host.").unwrap();

        let cli = Cli::try_parse_from([
            "cohost",
            "--name",
            "Nova",
            "--voice",
            "verse",
            "--stop-words",
            "later, enough",
            "--instructions-file",
            file.path().to_str().unwrap(),
            "--disable-tool",
            "calculator",
            "--disable-tool",
            "web_search",
            "--save",
        ])
        .unwrap();
        let mut settings = StoredSettings::default();
        cli.apply(&mut settings).unwrap();

        assert_eq!(settings.agent_name, "Nova");
        assert_eq!(settings.voice, "verse");
        assert_eq!(settings.stop_words, "later, enough");
        assert_eq!(settings.system_prompt, "You are {agentName}, a quiz host.");
        assert!(!settings.tools.calculator);
        assert!(!settings.tools.web_search);
        assert!(settings.tools.date_time);
        assert!(cli.save);
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = Cli::try_parse_from(["cohost", "--disable-tool", "teleport"]).unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn missing_instructions_file_is_an_error() {
        let cli =
            Cli::try_parse_from(["cohost", "--instructions-file", "/nonexistent/prompt.md"])
                .unwrap();
        let mut settings = StoredSettings::default();
        assert!(cli.apply(&mut settings).is_err());
    }
}
