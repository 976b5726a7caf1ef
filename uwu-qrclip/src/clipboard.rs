use crate::image_io::{is_supported_image, read_image_from_file};
use colored::Colorize;
use image::DynamicImage;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard backend error: {0}")]
    Backend(#[from] arboard::Error),
    #[error("clipboard unavailable: {0}")]
    Access(String),
    #[error("image conversion failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("clipboard helper failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("clipboard helper did not finish within {0:?}")]
    Timeout(Duration),
    #[error("text needs a wayland clipboard, X11 selections do not outlive this process: {0}")]
    WaylandOnly(#[source] Box<ClipboardError>),
    #[error("copying images to the clipboard is not supported on {0}")]
    Unsupported(&'static str),
}

/// What the clipboard held when it was read.
#[derive(Debug)]
pub enum ClipboardContent {
    Image(DynamicImage),
    FilePathList(Vec<PathBuf>),
    Empty,
}

impl ClipboardContent {
    // only the first entry of a file list is opened
    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            Self::Image(img) => Some(img),
            Self::FilePathList(paths) => image_from_file_list(&paths),
            Self::Empty => None,
        }
    }
}

fn image_from_file_list(paths: &[PathBuf]) -> Option<DynamicImage> {
    let first = match paths.first() {
        Some(path) => path,
        None => {
            debug!("clipboard file list is empty");
            return None;
        }
    };

    if !is_supported_image(first) {
        debug!("first clipboard file is not an image: {}", first.display());
        return None;
    }

    match read_image_from_file(first) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("could not open clipboard file {}: {}", first.display(), e);
            None
        }
    }
}

// access failures are reported and read as an empty clipboard
pub fn read() -> ClipboardContent {
    match try_read() {
        Ok(content) => content,
        Err(e) => {
            error!("failed to read clipboard: {}", e);
            eprintln!("{} {}", "「clipboard」".red().bold(), e);
            ClipboardContent::Empty
        }
    }
}

fn try_read() -> Result<ClipboardContent, ClipboardError> {
    debug!("attempting to read image from clipboard using arboard");
    read_from(
        arboard::Clipboard::new().map_err(ClipboardError::from),
        try_arboard_image,
        wayland_image,
        |clipboard: &mut arboard::Clipboard| Ok(clipboard.get().file_list()?),
    )
}

fn is_content_missing(e: &ClipboardError) -> bool {
    matches!(e, ClipboardError::Backend(arboard::Error::ContentNotAvailable))
}

// arboard image, then the wayland image, then the arboard file list. A failed
// arboard constructor still lets the wayland read run.
fn read_from<C>(
    clipboard: Result<C, ClipboardError>,
    arboard_image: impl FnOnce(&mut C) -> Result<DynamicImage, ClipboardError>,
    wayland_image: impl FnOnce() -> Result<Option<DynamicImage>, ClipboardError>,
    file_list: impl FnOnce(&mut C) -> Result<Vec<PathBuf>, ClipboardError>,
) -> Result<ClipboardContent, ClipboardError> {
    let (mut clipboard, mut failure) = match clipboard {
        Ok(c) => (Some(c), None),
        Err(e) => {
            debug!("arboard unavailable: {}", e);
            (None, Some(e))
        }
    };

    if let Some(c) = clipboard.as_mut() {
        match arboard_image(c) {
            Ok(img) => return Ok(ClipboardContent::Image(img)),
            Err(e) if is_content_missing(&e) => debug!("no image in clipboard"),
            Err(e) => {
                debug!("arboard failed: {}", e);
                failure = Some(e);
            }
        }
    }

    // fallback to wl-clipboard-rs for wayland compat
    debug!("falling back to wl-clipboard-rs for wayland support");
    match wayland_image() {
        Ok(Some(img)) => {
            info!("successfully read image from clipboard using wl-clipboard-rs");
            return Ok(ClipboardContent::Image(img));
        }
        Ok(None) => {
            debug!("wayland clipboard holds no image");
            if clipboard.is_none() {
                failure = None;
            }
        }
        Err(wl_err) => debug!("wl-clipboard error: {}", wl_err),
    }

    if let Some(c) = clipboard.as_mut() {
        match file_list(c) {
            Ok(paths) => {
                info!("clipboard holds {} file path(s)", paths.len());
                return Ok(ClipboardContent::FilePathList(paths));
            }
            Err(e) if is_content_missing(&e) => debug!("no file list in clipboard"),
            Err(e) => return Err(e),
        }
    }

    failure.map_or(Ok(ClipboardContent::Empty), Err)
}

#[cfg(not(target_os = "linux"))]
fn wayland_image() -> Result<Option<DynamicImage>, ClipboardError> {
    Err(ClipboardError::Access("no wayland clipboard on this platform".into()))
}

fn try_arboard_image(clipboard: &mut arboard::Clipboard) -> Result<DynamicImage, ClipboardError> {
    let img_data = clipboard.get_image()?;

    debug!(
        "got image data: {}x{} pixels",
        img_data.width, img_data.height
    );

    let rgba_data = img_data.bytes.into_owned();
    let img = image::RgbaImage::from_raw(img_data.width as u32, img_data.height as u32, rgba_data)
        .ok_or_else(|| ClipboardError::Access("clipboard image has an invalid size".into()))?;

    info!(
        "successfully loaded image from clipboard via arboard ({}x{})",
        img.width(),
        img.height()
    );

    Ok(DynamicImage::ImageRgba8(img))
}

#[cfg(target_os = "linux")]
fn wayland_image() -> Result<Option<DynamicImage>, ClipboardError> {
    use std::io::Read;
    use wl_clipboard_rs::paste::{ClipboardType, Error, MimeType, Seat, get_contents};

    debug!("attempting to read image from Wayland clipboard");

    let mime_types = [
        MimeType::Specific("image/png"),
        MimeType::Specific("image/jpeg"),
        MimeType::Specific("image/jpg"),
        MimeType::Specific("image/bmp"),
    ];

    for mime_type in mime_types {
        debug!("trying mime type: {:?}", mime_type);
        match get_contents(ClipboardType::Regular, Seat::Unspecified, mime_type) {
            Ok((mut pipe, _)) => {
                let mut buffer = Vec::new();
                pipe.read_to_end(&mut buffer)?;

                let img = image::load_from_memory(&buffer)?;

                info!(
                    "successfully loaded image from clipboard via wl-clipboard ({}x{})",
                    img.width(),
                    img.height()
                );
                return Ok(Some(img));
            }
            Err(Error::NoMimeType) => debug!("mime type {:?} not available", mime_type),
            Err(Error::ClipboardEmpty) => {
                debug!("wayland clipboard is empty");
                return Ok(None);
            }
            Err(e) => return Err(ClipboardError::Access(e.to_string())),
        }
    }

    Ok(None)
}

// wl-clipboard-rs keeps serving the bytes from a forked process after we exit
#[cfg(target_os = "linux")]
pub fn wl_copy(bytes: Vec<u8>, mime: wl_clipboard_rs::copy::MimeType) -> Result<(), ClipboardError> {
    use wl_clipboard_rs::copy::{Options, Source};

    Options::new()
        .copy(Source::Bytes(bytes.into_boxed_slice()), mime)
        .map_err(|e| ClipboardError::Access(e.to_string()))
}

#[cfg(target_os = "linux")]
pub fn write_text(text: &str) -> Result<(), ClipboardError> {
    copy_text_wayland(text, |bytes| {
        wl_copy(bytes, wl_clipboard_rs::copy::MimeType::Text)
    })
}

#[cfg(not(target_os = "linux"))]
pub fn write_text(text: &str) -> Result<(), ClipboardError> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)?;
    info!("copied {} bytes of text via arboard", text.len());
    Ok(())
}

// an arboard-owned X11 selection is gone once we exit, so only wayland counts
#[cfg(any(target_os = "linux", test))]
fn copy_text_wayland(
    text: &str,
    copy: impl FnOnce(Vec<u8>) -> Result<(), ClipboardError>,
) -> Result<(), ClipboardError> {
    match copy(text.as_bytes().to_vec()) {
        Ok(()) => {
            info!("copied {} bytes of text via wl-clipboard", text.len());
            Ok(())
        }
        Err(e) => {
            warn!("wl-clipboard copy failed: {}", e);
            Err(ClipboardError::WaylandOnly(Box::new(e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(6, 4, Rgb([200, 10, 10]));
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();
        path
    }

    fn missing() -> ClipboardError {
        ClipboardError::Backend(arboard::Error::ContentNotAvailable)
    }

    fn no_display() -> Result<(), ClipboardError> {
        Err(ClipboardError::Access("no display".into()))
    }

    fn image_of(content: ClipboardContent) -> (u32, u32) {
        match content {
            ClipboardContent::Image(img) => (img.width(), img.height()),
            other => panic!("expected an image, got {:?}", other),
        }
    }

    #[test]
    fn wayland_is_read_when_arboard_cannot_start() {
        let content = read_from(
            no_display(),
            |_| panic!("no arboard clipboard to read from"),
            || Ok(Some(DynamicImage::new_rgb8(7, 5))),
            |_| panic!("no arboard clipboard to read from"),
        )
        .unwrap();

        assert_eq!(image_of(content), (7, 5));
    }

    #[test]
    fn reachable_wayland_without_image_is_not_an_error() {
        let content = read_from(
            no_display(),
            |_| panic!("no arboard clipboard to read from"),
            || Ok(None),
            |_| panic!("no arboard clipboard to read from"),
        )
        .unwrap();

        assert!(matches!(content, ClipboardContent::Empty));
    }

    #[test]
    fn no_backend_at_all_is_reported() {
        let result = read_from(
            no_display(),
            |_| panic!("no arboard clipboard to read from"),
            || Err(ClipboardError::Access("no compositor".into())),
            |_| panic!("no arboard clipboard to read from"),
        );

        match result {
            Err(ClipboardError::Access(msg)) => assert_eq!(msg, "no display"),
            other => panic!("expected the arboard error, got {:?}", other),
        }
    }

    #[test]
    fn arboard_image_wins_without_asking_wayland() {
        let content = read_from(
            Ok(()),
            |_| Ok(DynamicImage::new_rgb8(2, 9)),
            || panic!("wayland should not be asked"),
            |_| panic!("file list should not be asked"),
        )
        .unwrap();

        assert_eq!(image_of(content), (2, 9));
    }

    #[test]
    fn file_list_is_read_after_both_images_miss() {
        let content = read_from(
            Ok(()),
            |_| Err(missing()),
            || Err(ClipboardError::Access("no compositor".into())),
            |_| Ok(vec![PathBuf::from("/tmp/shot.png")]),
        )
        .unwrap();

        match content {
            ClipboardContent::FilePathList(paths) => {
                assert_eq!(paths, vec![PathBuf::from("/tmp/shot.png")])
            }
            other => panic!("expected a file list, got {:?}", other),
        }
    }

    #[test]
    fn nothing_anywhere_is_empty() {
        let content = read_from(Ok(()), |_| Err(missing()), || Ok(None), |_| Err(missing())).unwrap();
        assert!(matches!(content, ClipboardContent::Empty));
    }

    #[test]
    fn text_copy_succeeds_through_wayland() {
        let mut sent = Vec::new();
        copy_text_wayland("héllo", |bytes| {
            sent = bytes;
            Ok(())
        })
        .unwrap();
        assert_eq!(sent, "héllo".as_bytes());
    }

    #[test]
    fn text_copy_without_wayland_is_an_error() {
        let err = copy_text_wayland("lost on exit", |_| no_display()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no display"));
        assert!(msg.contains("X11"));
    }

    #[test]
    fn image_content_is_returned_as_is() {
        let img = DynamicImage::new_luma8(3, 3);
        let resolved = ClipboardContent::Image(img).into_image().unwrap();
        assert_eq!((resolved.width(), resolved.height()), (3, 3));
    }

    #[test]
    fn empty_content_has_no_image() {
        assert!(ClipboardContent::Empty.into_image().is_none());
        assert!(ClipboardContent::FilePathList(Vec::new()).into_image().is_none());
    }

    #[test]
    fn text_file_in_list_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "not an image").unwrap();

        let content = ClipboardContent::FilePathList(vec![txt]);
        assert!(content.into_image().is_none());
    }

    #[test]
    fn png_file_in_list_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "code.png");

        let img = ClipboardContent::FilePathList(vec![png]).into_image().unwrap();
        assert_eq!((img.width(), img.height()), (6, 4));
    }

    #[test]
    fn only_first_entry_is_consulted() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("readme.txt");
        std::fs::write(&txt, "hi").unwrap();
        let png = write_png(dir.path(), "second.png");

        let content = ClipboardContent::FilePathList(vec![txt, png]);
        assert!(content.into_image().is_none());
    }

    #[test]
    fn uppercase_extension_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "SHOT.PNG");

        assert!(ClipboardContent::FilePathList(vec![png]).into_image().is_some());
    }

    #[test]
    fn unreadable_image_file_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"definitely not png").unwrap();

        assert!(ClipboardContent::FilePathList(vec![broken]).into_image().is_none());
    }
}
