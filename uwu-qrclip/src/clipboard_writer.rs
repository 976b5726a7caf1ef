use crate::clipboard::ClipboardError;
use image::DynamicImage;
#[cfg(any(windows, test))]
use image::ImageFormat;
use log::{debug, info};
#[cfg(any(target_os = "macos", test))]
use std::process::Child;
#[cfg(any(target_os = "macos", test))]
use std::time::{Duration, Instant};

#[cfg(any(windows, test))]
const BMP_FILE_HEADER_LEN: usize = 14;
#[cfg(target_os = "macos")]
const PBCOPY_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(any(target_os = "macos", test))]
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Places an image on the system clipboard.
pub trait ImageWriter {
    fn name(&self) -> &'static str;
    fn write_image(&self, img: &DynamicImage) -> Result<(), ClipboardError>;
}

/// Picks the writer for the running OS.
pub fn platform_writer() -> Box<dyn ImageWriter> {
    let writer: Box<dyn ImageWriter> = match std::env::consts::OS {
        #[cfg(windows)]
        "windows" => Box::new(WindowsClipboard),
        #[cfg(target_os = "macos")]
        "macos" => Box::new(Pasteboard {
            timeout: PBCOPY_TIMEOUT,
        }),
        #[cfg(target_os = "linux")]
        "linux" => Box::new(WaylandClipboard),
        os => Box::new(Unsupported::new(os)),
    };
    debug!("using {} clipboard writer", writer.name());
    writer
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn to_png(img: &DynamicImage) -> Result<Vec<u8>, ClipboardError> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// 24-bit bitmap without the file header, which is what `CF_DIB` holds.
#[cfg(any(windows, test))]
fn to_dib(img: &DynamicImage) -> Result<Vec<u8>, ClipboardError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut bmp = Vec::new();
    rgb.write_to(&mut std::io::Cursor::new(&mut bmp), ImageFormat::Bmp)?;
    Ok(bmp.split_off(BMP_FILE_HEADER_LEN))
}

#[cfg(windows)]
pub struct WindowsClipboard;

#[cfg(windows)]
impl ImageWriter for WindowsClipboard {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn write_image(&self, img: &DynamicImage) -> Result<(), ClipboardError> {
        use clipboard_win::{Clipboard, formats, raw};

        let dib = to_dib(img)?;
        debug!("prepared {} byte DIB", dib.len());

        // closed when the guard drops, whichever way we leave
        let _clip = Clipboard::new_attempts(10).map_err(|e| ClipboardError::Access(e.to_string()))?;
        raw::empty().map_err(|e| ClipboardError::Access(e.to_string()))?;
        raw::set_without_clear(formats::CF_DIB, &dib)
            .map_err(|e| ClipboardError::Access(e.to_string()))?;

        info!("copied {}x{} image as CF_DIB", img.width(), img.height());
        Ok(())
    }
}

#[cfg(target_os = "macos")]
pub struct Pasteboard {
    timeout: Duration,
}

#[cfg(target_os = "macos")]
impl ImageWriter for Pasteboard {
    fn name(&self) -> &'static str {
        "pbcopy"
    }

    fn write_image(&self, img: &DynamicImage) -> Result<(), ClipboardError> {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let png = to_png(img)?;
        debug!("piping {} png bytes to pbcopy", png.len());

        let mut child = Command::new("pbcopy")
            .args(["-Prefer", "png"])
            .stdin(Stdio::piped())
            .spawn()?;

        // stdin is dropped at the end of this block so pbcopy sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        wait_with_timeout(&mut child, self.timeout)?;
        info!("copied {}x{} image via pbcopy", img.width(), img.height());
        Ok(())
    }
}

#[cfg(any(target_os = "macos", test))]
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(), ClipboardError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                return Ok(());
            }
            return Err(ClipboardError::Access(format!(
                "clipboard helper exited with {}",
                status
            )));
        }

        if Instant::now() >= deadline {
            log::warn!("clipboard helper still running after {:?}, killing it", timeout);
            let _ = child.kill();
            let _ = child.wait();
            return Err(ClipboardError::Timeout(timeout));
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(target_os = "linux")]
pub struct WaylandClipboard;

#[cfg(target_os = "linux")]
impl ImageWriter for WaylandClipboard {
    fn name(&self) -> &'static str {
        "wl-clipboard"
    }

    fn write_image(&self, img: &DynamicImage) -> Result<(), ClipboardError> {
        use wl_clipboard_rs::copy::MimeType;

        let png = to_png(img)?;
        debug!("offering {} png bytes to the wayland compositor", png.len());
        crate::clipboard::wl_copy(png, MimeType::Specific("image/png".to_string()))?;
        info!("copied {}x{} image via wl-clipboard", img.width(), img.height());
        Ok(())
    }
}

pub struct Unsupported {
    os: &'static str,
}

impl Unsupported {
    pub fn new(os: &'static str) -> Self {
        Self { os }
    }
}

impl ImageWriter for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn write_image(&self, _img: &DynamicImage) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unsupported(self.os))
    }
}
