//! Background image decoding for the texture slots.
//!
//! Each configured slot gets its own short-lived worker thread. Results come
//! back in completion order through a [`TextureSink`]; the window loop uses
//! its `EventLoopProxy` so a finished decode wakes the event loop.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use image::imageops::flip_vertical_in_place;

use crate::types::TextureSlots;

/// RGBA8 pixels ready for upload, bottom row first.
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

#[derive(Debug)]
pub enum TextureEvent {
    Loaded {
        slot: usize,
        path: PathBuf,
        image: DecodedImage,
    },
    Failed {
        slot: usize,
        path: PathBuf,
        error: anyhow::Error,
    },
}

impl TextureEvent {
    pub fn slot(&self) -> usize {
        match self {
            Self::Loaded { slot, .. } | Self::Failed { slot, .. } => *slot,
        }
    }
}

/// Destination for finished decodes.
pub trait TextureSink: Clone + Send + 'static {
    /// Returns `false` once the receiving side is gone.
    fn deliver(&self, event: TextureEvent) -> bool;
}

impl TextureSink for Sender<TextureEvent> {
    fn deliver(&self, event: TextureEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Decodes an image file and flips it so texel row 0 is the bottom row.
pub fn decode_image(path: &Path) -> Result<DecodedImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open texture at {}", path.display()))?;
    let mut rgba = image.to_rgba8();
    flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("texture at {} has no pixels", path.display()));
    }
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Starts one decode worker per populated slot.
pub fn spawn_texture_loads<S>(slots: &TextureSlots, sink: S) -> Result<Vec<JoinHandle<()>>>
where
    S: TextureSink,
{
    let mut handles = Vec::with_capacity(slots.len());
    for (slot, path) in slots.iter() {
        let path = path.clone();
        let sink = sink.clone();
        tracing::debug!(slot, path = %path.display(), "queueing texture load");
        let handle = thread::Builder::new()
            .name(format!("scrollshade-texture-{slot}"))
            .spawn(move || {
                let event = match decode_image(&path) {
                    Ok(image) => TextureEvent::Loaded { slot, path, image },
                    Err(error) => TextureEvent::Failed { slot, path, error },
                };
                if !sink.deliver(event) {
                    tracing::debug!(slot, "texture decoded after the window closed");
                }
            })
            .map_err(|err| anyhow!("failed to spawn texture loader for slot {slot}: {err}"))?;
        handles.push(handle);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path, width: u32, height: u32) {
        let mut image = RgbaImage::new(width, height);
        for x in 0..width {
            image.put_pixel(x, 0, Rgba([255, 0, 0, 255]));
            image.put_pixel(x, height - 1, Rgba([0, 0, 255, 255]));
        }
        image.save(path).unwrap();
    }

    #[test]
    fn decoded_images_are_flipped_vertically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        write_png(&path, 2, 3);

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        // the image's bottom row (blue) is uploaded first
        assert_eq!(&decoded.rgba[..4], &[0, 0, 255, 255]);
        assert_eq!(&decoded.rgba[decoded.rgba.len() - 4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn failures_are_reported_per_slot() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        write_png(&good, 4, 2);
        let corrupt = dir.path().join("corrupt.webp");
        std::fs::write(&corrupt, b"not an image").unwrap();

        let mut slots = TextureSlots::new();
        slots.set(0, dir.path().join("missing.png")).unwrap();
        slots.set(1, good.clone()).unwrap();
        slots.set(2, corrupt.clone()).unwrap();

        let (tx, rx) = unbounded();
        let handles = spawn_texture_loads(&slots, tx).unwrap();
        assert_eq!(handles.len(), 3);
        for handle in handles {
            handle.join().unwrap();
        }

        let mut events: Vec<TextureEvent> = rx.try_iter().collect();
        events.sort_by_key(TextureEvent::slot);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], TextureEvent::Failed { slot: 0, .. }));
        match &events[1] {
            TextureEvent::Loaded { slot, path, image } => {
                assert_eq!(*slot, 1);
                assert_eq!(path, &good);
                assert_eq!((image.width, image.height), (4, 2));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[2] {
            TextureEvent::Failed { path, error, .. } => {
                assert_eq!(path, &corrupt);
                assert!(format!("{error:#}").contains("corrupt.webp"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn empty_slots_spawn_nothing() {
        let (tx, rx) = unbounded();
        let handles = spawn_texture_loads(&TextureSlots::new(), tx).unwrap();
        assert!(handles.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
