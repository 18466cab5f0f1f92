use std::io::Cursor;

use gif::{DisposalMethod, Repeat};
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, Frame, ImageFormat};
use log::{debug, warn};
use thiserror::Error;

/// Used when the source doesn't declare a frame duration.
pub const DEFAULT_DELAY_MS: u32 = 100;
const ENCODE_SPEED: i32 = 10;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("couldn't decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("couldn't encode gif: {0}")]
    Encode(#[from] gif::EncodingError),
    #[error("couldn't finish gif: {0}")]
    Io(#[from] std::io::Error),
    #[error("image contains no frames")]
    NoFrames,
    #[error("canvas {0}x{1} exceeds the gif size limit")]
    TooLarge(u32, u32),
    #[error("frame {index} is {got:?}, canvas is {expected:?}")]
    FrameSize {
        index: usize,
        got: (u32, u32),
        expected: (u32, u32),
    },
}

#[derive(Debug)]
pub struct Transcoded {
    pub data: Vec<u8>,
    pub frame_count: usize,
    /// Delay applied to every frame, `None` for a still.
    pub delay_ms: Option<u32>,
}

impl Transcoded {
    pub fn is_animated(&self) -> bool {
        self.delay_ms.is_some()
    }
}

fn still_frame(data: &[u8]) -> Result<Vec<Frame>, TranscodeError> {
    let image = image::load_from_memory(data)?;
    Ok(vec![Frame::new(image.into_rgba8())])
}

fn decode_frames(data: &[u8]) -> Result<Vec<Frame>, TranscodeError> {
    let cursor = Cursor::new(data);
    let frames = match image::guess_format(data)? {
        ImageFormat::Gif => GifDecoder::new(cursor)?.into_frames().collect_frames()?,
        ImageFormat::Png => {
            let decoder = PngDecoder::new(cursor)?;
            if decoder.is_apng()? {
                decoder.apng()?.into_frames().collect_frames()?
            } else {
                still_frame(data)?
            }
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(cursor)?;
            if decoder.has_animation() {
                decoder.into_frames().collect_frames()?
            } else {
                still_frame(data)?
            }
        }
        _ => still_frame(data)?,
    };
    Ok(frames)
}

/// All frames of `data`, or the still image if frame decoding fails.
pub fn frames(data: &[u8]) -> Result<Vec<Frame>, TranscodeError> {
    let frames = match decode_frames(data) {
        Ok(frames) => frames,
        Err(err) => {
            warn!("couldn't decode frames ({err}), falling back to a still image");
            still_frame(data)?
        }
    };
    if frames.is_empty() {
        Err(TranscodeError::NoFrames)
    } else {
        Ok(frames)
    }
}

/// Declared duration of the last frame, applied to the whole animation.
fn global_delay_ms(frames: &[Frame]) -> u32 {
    let Some(last) = frames.last() else {
        return DEFAULT_DELAY_MS;
    };
    let (numer, denom) = last.delay().numer_denom_ms();
    match numer.checked_div(denom) {
        Some(0) | None => DEFAULT_DELAY_MS,
        Some(ms) => ms,
    }
}

fn encode_gif(frames: Vec<Frame>, delay_ms: Option<u32>) -> Result<Vec<u8>, TranscodeError> {
    let expected = frames[0].buffer().dimensions();
    let (width, height) = expected;
    let too_large = || TranscodeError::TooLarge(width, height);
    let w = u16::try_from(width).map_err(|_| too_large())?;
    let h = u16::try_from(height).map_err(|_| too_large())?;

    let mut encoder = gif::Encoder::new(Vec::new(), w, h, &[])?;
    if delay_ms.is_some() {
        encoder.set_repeat(Repeat::Infinite)?;
    }
    // gif delays are centiseconds
    let delay_cs = delay_ms.map(|ms| u16::try_from(ms / 10).unwrap_or(u16::MAX));

    for (index, frame) in frames.into_iter().enumerate() {
        let buffer = frame.into_buffer();
        let got = buffer.dimensions();
        if got != expected {
            return Err(TranscodeError::FrameSize {
                index,
                got,
                expected,
            });
        }
        let mut pixels = buffer.into_raw();
        let mut out = gif::Frame::from_rgba_speed(w, h, &mut pixels, ENCODE_SPEED);
        if let Some(delay) = delay_cs {
            out.delay = delay;
            out.dispose = DisposalMethod::Background;
        }
        encoder.write_frame(&out)?;
    }

    Ok(encoder.into_inner()?)
}

/// Re-encodes an animated rendition as an infinitely looping gif.
///
/// A source with a single frame becomes a still gif. Every frame gets the
/// last frame's declared delay rather than its own.
pub fn to_looping_gif(data: &[u8]) -> Result<Transcoded, TranscodeError> {
    let frames = frames(data)?;
    let frame_count = frames.len();

    if frame_count == 1 {
        debug!("animated rendition has a single frame, writing a still");
        return Ok(Transcoded {
            data: encode_gif(frames, None)?,
            frame_count,
            delay_ms: None,
        });
    }

    let delay_ms = global_delay_ms(&frames);
    Ok(Transcoded {
        data: encode_gif(frames, Some(delay_ms))?,
        frame_count,
        delay_ms: Some(delay_ms),
    })
}

/// Pixel size of the image the decoder exposes by default.
pub fn probe_size(data: &[u8]) -> Result<(u32, u32), TranscodeError> {
    let image = image::load_from_memory(data)?;
    Ok((image.width(), image.height()))
}
