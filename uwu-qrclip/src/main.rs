mod ascii;
mod clipboard;
mod clipboard_writer;
mod dispatch;
mod image_io;
mod qr_decoder;
mod qr_encoder;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{error, info, warn};
use qr_encoder::QrConfig;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Ecc {
    L,
    M,
    Q,
    H,
}

impl From<Ecc> for qrcode::EcLevel {
    fn from(ecc: Ecc) -> Self {
        match ecc {
            Ecc::L => qrcode::EcLevel::L,
            Ecc::M => qrcode::EcLevel::M,
            Ecc::Q => qrcode::EcLevel::Q,
            Ecc::H => qrcode::EcLevel::H,
        }
    }
}

#[derive(Parser)]
#[command(name = "uwu-qrclip")]
#[command(about = "🌸 「simple and cute clipboard qr code bridge」 🌸")]
struct Cli {
    // read from a file instead of the clipboard when decoding
    #[arg(short = 'i', long, value_name = "FILE", conflicts_with = "text")]
    input: Option<PathBuf>,

    #[arg(
        short = 'b',
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(0..=64),
        help = "Quiet zone width in modules"
    )]
    border: u32,

    #[arg(short = 'e', long, value_enum, default_value_t = Ecc::M, help = "Error correction level")]
    ecc: Ecc,

    #[arg(
        short = 's',
        long,
        value_name = "VERSION",
        value_parser = clap::value_parser!(i16).range(1..=40),
        help = "Fixed qr version instead of the smallest that fits"
    )]
    size: Option<i16>,

    #[arg(
        short = 'p',
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..=100),
        help = "Pixels per module in the copied image"
    )]
    pixels: u32,

    #[arg(long, help = "Print dark modules as ink in the terminal")]
    no_invert: bool,

    // everything from the first word on is the text to encode
    #[arg(value_name = "TEXT", trailing_var_arg = true, allow_hyphen_values = true)]
    text: Vec<String>,
}

impl Cli {
    fn payload(&self) -> Option<String> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text.join(" "))
        }
    }

    fn qr_config(&self) -> QrConfig {
        QrConfig {
            border: self.border,
            ec_level: self.ecc.into(),
            version: self.size,
            module_px: self.pixels,
            invert: !self.no_invert,
            ..QrConfig::default()
        }
    }
}

fn main() {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    if let Err(e) = ctrlc::set_handler(|| {
        println!("\n{}", "「bye」 interrupted, exiting".yellow());
        std::process::exit(0);
    }) {
        warn!("could not install ctrl-c handler: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        println!("{} {:#}", "「error」".red().bold(), e);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut out = std::io::stdout().lock();

    match cli.payload() {
        Some(text) => {
            info!("encoding {} bytes of text", text.len());
            let writer = clipboard_writer::platform_writer();
            dispatch::encode_to_clipboard(&text, &cli.qr_config(), writer.as_ref(), &mut out)
        }
        None => {
            let img = match &cli.input {
                Some(path) => {
                    info!("reading QR code from file: {}", path.display());
                    let img = image_io::read_image_from_file(path)
                        .with_context(|| format!("could not open {}", path.display()))?;
                    Some(img)
                }
                None => {
                    info!("reading QR code from clipboard");
                    clipboard::read().into_image()
                }
            };
            dispatch::decode_to_clipboard(img, clipboard::write_text, &mut out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("uwu-qrclip").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn arguments_are_joined_with_spaces() {
        let cli = parse(&["hello", "world"]);
        assert_eq!(cli.payload().as_deref(), Some("hello world"));
    }

    #[test]
    fn no_arguments_means_decode() {
        assert_eq!(parse(&[]).payload(), None);
        assert_eq!(parse(&["-i", "shot.png"]).payload(), None);
    }

    #[test]
    fn options_before_the_text_configure_the_code() {
        let cli = parse(&["-b", "4", "-e", "h", "-s", "7", "-p", "3", "--no-invert", "hi"]);
        let config = cli.qr_config();

        assert_eq!(cli.payload().as_deref(), Some("hi"));
        assert_eq!(config.border, 4);
        assert_eq!(config.ec_level, qrcode::EcLevel::H);
        assert_eq!(config.version, Some(7));
        assert_eq!(config.module_px, 3);
        assert!(!config.invert);
    }

    #[test]
    fn hyphens_after_the_text_are_text() {
        let cli = parse(&["say", "-b", "--loud"]);
        assert_eq!(cli.payload().as_deref(), Some("say -b --loud"));
        assert_eq!(cli.border, 2);
    }

    #[test]
    fn size_limits_match_the_encoder() {
        let cli = parse(&["-b", "64", "-p", "100", "x"]);
        assert_eq!(cli.border, qr_encoder::MAX_BORDER);
        assert_eq!(cli.pixels, qr_encoder::MAX_MODULE_PX);
    }

    #[test]
    fn defaults_give_the_default_config() {
        assert_eq!(parse(&["x"]).qr_config(), QrConfig::default());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let bad = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("uwu-qrclip").chain(args.iter().copied())).is_err()
        };
        assert!(bad(&["-s", "41", "x"]));
        assert!(bad(&["-p", "0", "x"]));
        assert!(bad(&["-p", "101", "x"]));
        assert!(bad(&["-b", "65", "x"]));
        assert!(bad(&["-b", "2147483647", "x"]));
        assert!(bad(&["-e", "z", "x"]));
        assert!(bad(&["-i", "a.png", "text"]));
    }
}
