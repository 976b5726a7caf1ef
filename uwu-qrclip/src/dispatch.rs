use crate::ascii::render_ascii;
use crate::clipboard::ClipboardError;
use crate::clipboard_writer::ImageWriter;
use crate::qr_decoder::decode_qr_codes;
use crate::qr_encoder::{QrConfig, encode};
use anyhow::Result;
use colored::Colorize;
use image::DynamicImage;
use log::{debug, info, warn};
use std::io::Write;

pub fn print_usage(out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{} {}",
        "「no image」".yellow().bold(),
        "there is no image in the clipboard".yellow()
    )?;
    writeln!(out, "{}", "usage:".green())?;
    writeln!(out, "  decode: copy an image, then run uwu-qrclip")?;
    writeln!(out, "  encode: uwu-qrclip 'text to encode'")?;
    Ok(())
}

/// Decodes every QR code in `image`, prints the payloads joined by newlines
/// and hands the same text to `copy_text`.
pub fn decode_to_clipboard<F>(image: Option<DynamicImage>, copy_text: F, out: &mut impl Write) -> Result<()>
where
    F: FnOnce(&str) -> Result<(), ClipboardError>,
{
    let image = match image {
        Some(img) => img,
        None => return print_usage(out),
    };

    let mut payloads = Vec::new();
    for outcome in decode_qr_codes(&image) {
        match outcome {
            Ok(symbol) => {
                debug!(
                    "{} v{} ecc {}: {} bytes",
                    symbol.symbology,
                    symbol.version,
                    symbol.ecc_level,
                    symbol.payload.len()
                );
                payloads.push(symbol.payload);
            }
            Err(e) => writeln!(out, "{} {}", "「skipped」".red().bold(), e)?,
        }
    }

    if payloads.is_empty() {
        writeln!(
            out,
            "{} {}",
            "「not found」".yellow().bold(),
            "no qr code found in the image".yellow()
        )?;
        return Ok(());
    }

    let content = payloads.join("\n");
    writeln!(out, "{}", content)?;

    let found = format!("{} qr code(s)", payloads.len());
    match copy_text(&content) {
        Ok(()) => {
            info!("copied decoded text to clipboard");
            writeln!(
                out,
                "{} {} {}",
                "✓ 「found」".green().bold(),
                found.cyan(),
                "and copied the text to the clipboard".green()
            )?;
        }
        Err(e) => {
            warn!("could not copy decoded text: {}", e);
            writeln!(
                out,
                "{} {} {} {}",
                "✗ 「found」".yellow().bold(),
                found.cyan(),
                "but copying failed:".yellow(),
                e
            )?;
        }
    }

    Ok(())
}

/// Encodes `text`, prints it with its ASCII rendition and puts the image on
/// the clipboard through `writer`.
pub fn encode_to_clipboard(
    text: &str,
    config: &QrConfig,
    writer: &dyn ImageWriter,
    out: &mut impl Write,
) -> Result<()> {
    let qr = encode(text, config)?;
    debug!("rendering {:?} with a {} module border", qr.version(), config.border);

    writeln!(out, "{}", qr.text())?;
    write!(out, "{}", render_ascii(&qr, config.invert))?;

    match writer.write_image(&qr.to_image()) {
        Ok(()) => writeln!(
            out,
            "{} {}",
            "✓ 「copied」".green().bold(),
            "qr code image is on the clipboard".green()
        )?,
        Err(e) => {
            warn!("{} writer failed: {}", writer.name(), e);
            writeln!(
                out,
                "{} {} {}",
                "✗ 「not copied」".red().bold(),
                "could not put the qr code image on the clipboard:".red(),
                e
            )?;
        }
    }

    Ok(())
}
