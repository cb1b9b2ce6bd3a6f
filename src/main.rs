//! `eureka` command line front end. See `eureka --help`.

use clap::Parser;
use eureka::{
    app::Report, theme::Theme, Generator, PromptRequest, Settings, Variant,
};
use std::{path::PathBuf, process::ExitCode};

/// Your AI-powered app idea generator 💡
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Theme config file. Overrides `EUREKA_THEME_PATH`.
    #[arg(long, global = true)]
    theme: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Name, tagline and a primary color, written to the theme config.
    Palette(Submit),
    /// A full app concept with a domain check and a downloadable document.
    Idea(Submit),
}

#[derive(clap::Args, Debug)]
struct Submit {
    /// A keyword, idea, or area of interest to start 🏁
    prompt: Option<String>,
    /// Surprise me! 🎲 Ignores the prompt.
    #[arg(short, long)]
    lucky: bool,
    /// Write the styled page here.
    #[arg(long)]
    html: Option<PathBuf>,
}

const GET_STARTED: &str = "Get started by entering a keyword, idea, or area of interest to receive an AI-generated app concept. Or pass `--lucky` to get a random app idea 💡";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(theme) = args.theme {
        settings.theme_path = theme;
    }

    // Without a token there is nothing to do.
    let client = settings.client().map_err(eureka::app::Error::from)?;

    let theme = settings.theme_file();
    let current = match theme.read() {
        Ok(current) => {
            log::debug!("Current theme: {:?}", current);
            current
        }
        Err(error) => {
            log::warn!("Could not read the theme: {}", error);
            Theme::default()
        }
    };

    let (variant, submit) = match args.command {
        Command::Palette(submit) => (Variant::Palette, submit),
        Command::Idea(submit) => (Variant::Idea, submit),
    };

    let Some(request) =
        PromptRequest::resolve(variant, submit.prompt.as_deref(), submit.lucky)
    else {
        println!("{GET_STARTED}");
        return Ok(());
    };

    println!("Prompt: {}", request.text);
    eprintln!("Generating your unique app idea... This might take a moment 🚀");

    let generator =
        Generator::new(client, settings.model.clone(), settings.whois(), theme)
            .with_theme(current);

    match generator.generate(&request).await? {
        Report::Palette(report) => {
            print!("{}", report.summary);
            if let Some(path) = submit.html {
                std::fs::write(&path, report.page.as_ref())?;
                println!("Page written to {}", path.display());
            }
        }
        Report::Idea(report) => {
            println!("{}", report.markdown);
            match submit.html {
                Some(path) => {
                    std::fs::write(&path, report.page.as_ref())?;
                    println!(
                        "Page with the {} download written to {}",
                        report.filename,
                        path.display()
                    );
                }
                None => println!("{}", report.link),
            }
        }
    }

    Ok(())
}
