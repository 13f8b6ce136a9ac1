//! Output side of the pipeline: snapshot sinks and the overlay renderer.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::RenderError;
use crate::tracker::{RenderRecord, TrackStatus};

use super::FrameSnapshot;

/// Consumer of per-frame snapshots.
pub trait RenderSink {
    /// `frame` is the source image when the upstream stage provided one.
    fn render(&mut self, snapshot: &FrameSnapshot, frame: Option<&RgbImage>) -> Result<(), RenderError>;
}

impl<S: RenderSink> RenderSink for Option<S> {
    fn render(&mut self, snapshot: &FrameSnapshot, frame: Option<&RgbImage>) -> Result<(), RenderError> {
        match self {
            Some(sink) => sink.render(snapshot, frame),
            None => Ok(()),
        }
    }
}

impl<A: RenderSink, B: RenderSink> RenderSink for (A, B) {
    fn render(&mut self, snapshot: &FrameSnapshot, frame: Option<&RgbImage>) -> Result<(), RenderError> {
        self.0.render(snapshot, frame)?;
        self.1.render(snapshot, frame)
    }
}

/// Writes one JSON object per frame.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, snapshot: &FrameSnapshot, _frame: Option<&RgbImage>) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Deterministic per-class colours drawn from a seeded generator.
///
/// Each class gets its own generator seeded from the palette seed and the
/// class id, so a colour does not depend on which classes were seen first.
/// Only classes actually drawn are stored.
#[derive(Debug, Clone)]
pub struct Palette {
    seed: u64,
    colors: BTreeMap<u32, Rgb<u8>>,
}

impl Palette {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            colors: BTreeMap::new(),
        }
    }

    pub fn color(&mut self, class_id: u32) -> Rgb<u8> {
        let seed = self.seed;
        *self.colors.entry(class_id).or_insert_with(|| {
            let mut rng = StdRng::seed_from_u64(seed ^ u64::from(class_id).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            Rgb([rng.r#gen(), rng.r#gen(), rng.r#gen()])
        })
    }

    /// Number of classes coloured so far.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Draws boxes and estimated positions onto a copy of each frame and
/// optionally saves it as a PNG.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    palette: Palette,
    output_dir: Option<PathBuf>,
    marker_radius: i32,
}

impl OverlayRenderer {
    pub fn new(palette_seed: u64) -> Self {
        Self {
            palette: Palette::new(palette_seed),
            output_dir: None,
            marker_radius: 4,
        }
    }

    /// Save every rendered frame as `frame_NNNNNN.png` under `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Draw all records onto `canvas`.
    ///
    /// Tracked boxes get a double outline, predicted ones a single outline.
    pub fn draw(&mut self, canvas: &mut RgbImage, records: &[RenderRecord]) {
        for record in records {
            let color = self.palette.color(record.class_id);
            let bbox = record.last_bbox;
            let outline = PixelRect::at(bbox.x.round() as i32, bbox.y.round() as i32)
                .of_size((bbox.width.round() as u32).max(1), (bbox.height.round() as u32).max(1));
            draw_hollow_rect_mut(canvas, outline, color);
            if record.status == TrackStatus::Tracked && outline.width() > 2 && outline.height() > 2 {
                let inner = PixelRect::at(outline.left() + 1, outline.top() + 1)
                    .of_size(outline.width() - 2, outline.height() - 2);
                draw_hollow_rect_mut(canvas, inner, color);
            }

            let (px, py) = record.estimated_position;
            draw_filled_circle_mut(
                canvas,
                (px.round() as i32, py.round() as i32),
                self.marker_radius,
                color,
            );
        }
    }
}

impl RenderSink for OverlayRenderer {
    fn render(&mut self, snapshot: &FrameSnapshot, frame: Option<&RgbImage>) -> Result<(), RenderError> {
        let Some(frame) = frame else {
            return Ok(());
        };
        let mut canvas = frame.clone();
        self.draw(&mut canvas, &snapshot.records);

        if let Some(dir) = &self.output_dir {
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("frame_{:06}.png", snapshot.frame_index));
            canvas.save(&path)?;
            trace!(path = %path.display(), "overlay written");
        }
        Ok(())
    }
}
