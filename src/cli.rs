use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "necture",
    about = "Turn YouTube lectures into clean study notes",
    version
)]
pub struct Cli {
    /// Address to serve the web UI on [default: 127.0.0.1:8501]
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Gemini model used to write the notes [default: gemini-1.5-flash]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Caption language to request [default: en]
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Config file to read instead of ~/.config/necture/config.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print resolved settings to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
