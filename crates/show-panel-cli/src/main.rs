//! ODROID-SHOW Control Tool
//!
//! CLI for driving the ODROID-SHOW display over its serial link.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use show_panel_hw::{ScreenContext, ROTATION_NORTH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "showctl")]
#[command(about = "Control tool for the ODROID-SHOW display")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// Write each command through immediately instead of batching
    #[arg(long)]
    unbuffered: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write text to the display
    Write {
        text: String,

        /// Foreground color name (black, red, green, yellow, blue,
        /// magenta, cyan, white)
        #[arg(long)]
        color: Option<String>,

        /// Pad the text to fill the rest of the row
        #[arg(long)]
        fill: bool,
    },
    /// Erase the screen and home the cursor
    Clear,
    /// Set the backlight brightness
    Backlight {
        /// Brightness percentage (0-100)
        percent: u8,
    },
    /// Set the display rotation
    Rotation {
        /// Rotation code (0-3); even codes select vertical orientation
        code: u8,
    },
    /// Set the text scale factor
    TextSize {
        /// Positive scale factor
        size: u32,
    },
    /// Draw a raw RGB565 image file
    Image {
        /// Path to pre-formatted RGB565 pixel data
        path: String,

        #[arg(long, default_value = "0")]
        x: u32,

        #[arg(long, default_value = "0")]
        y: u32,

        #[arg(long, default_value = "240")]
        width: u32,

        #[arg(long, default_value = "320")]
        height: u32,
    },
    /// Restore the display to its factory state
    Reset,
    /// Show a short hello-world demo
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut screen = ScreenContext::open(&cli.device, !cli.unbuffered)
        .with_context(|| format!("Failed to open display at {}", cli.device))?;

    match cli.command {
        Commands::Write { text, color, fill } => {
            if let Some(name) = &color {
                screen.set_foreground_color(name).await?;
            }
            if fill {
                screen.write_line(&text).await?;
            } else {
                screen.write_text(&text).await?;
            }
        }
        Commands::Clear => {
            screen.erase_screen().await?;
            screen.cursor_to_home().await?;
            println!("Display cleared");
        }
        Commands::Backlight { percent } => {
            if percent > 100 {
                anyhow::bail!("Brightness must be between 0 and 100");
            }
            screen.set_backlight_brightness_percent(percent).await?;
            println!("Backlight set to {}%", percent);
        }
        Commands::Rotation { code } => {
            screen.set_rotation(code).await?;
            println!("Orientation is now: {}", screen.orientation());
        }
        Commands::TextSize { size } => {
            screen.set_text_size(size).await?;
            println!(
                "Text size set to {} ({} columns, {} rows)",
                size,
                screen.columns(),
                screen.rows()
            );
        }
        Commands::Image {
            path,
            x,
            y,
            width,
            height,
        } => {
            let pixels = std::fs::read(&path)
                .with_context(|| format!("Failed to read image file {}", path))?;
            screen.draw_image(&pixels, x, y, width, height).await?;
        }
        Commands::Reset => {
            screen.restore_defaults().await?;
            println!("Display restored to defaults");
        }
        Commands::Demo => {
            screen.erase_screen().await?;
            screen.restore_defaults().await?;
            screen.set_rotation(ROTATION_NORTH).await?;
            screen.set_background_color("white").await?;
            screen.set_foreground_color("red").await?;
            screen.write_text("Hello World!!!").await?;
        }
    }

    screen.flush().await?;
    Ok(())
}
