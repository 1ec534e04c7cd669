use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
    sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            image: Arc::new(image),
            captured_at,
            frame_id: Uuid::new_v4(),
            sequence,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width(), self.image.height())
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .field("sequence", &self.sequence)
            .field("size", &self.size())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(size: FrameSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn enclosing(points: &[(i32, i32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let x0 = x0.max(0) as u32;
        let y0 = y0.max(0) as u32;
        let x1 = x1.max(0) as u32;
        let y1 = y1.max(0) as u32;
        Some(Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)))
    }

    pub fn translated(self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grows the box by `padding` on every side and clamps it to the frame.
    ///
    /// The result always satisfies `x < W`, `y < H`, `1 <= width <= W - x`
    /// and `1 <= height <= H - y`.
    pub fn padded(self, padding: u32, bounds: FrameSize) -> Self {
        let pad = i64::from(padding);
        let (w_max, h_max) = (i64::from(bounds.width), i64::from(bounds.height));

        let x = (i64::from(self.x) - pad).clamp(0, (w_max - 1).max(0));
        let y = (i64::from(self.y) - pad).clamp(0, (h_max - 1).max(0));
        let width = (i64::from(self.width) + pad * 2).clamp(1, (w_max - x).max(1));
        let height = (i64::from(self.height) + pad * 2).clamp(1, (h_max - y).max(1));

        Self::new(x as u32, y as u32, width as u32, height as u32)
    }

    /// Intersects the box with the frame; an empty intersection yields the full frame.
    pub fn clamped(self, bounds: FrameSize) -> Self {
        if self.x >= bounds.width || self.y >= bounds.height {
            return Self::full(bounds);
        }
        let width = self.width.min(bounds.width - self.x);
        let height = self.height.min(bounds.height - self.y);
        if width == 0 || height == 0 {
            return Self::full(bounds);
        }
        Self::new(self.x, self.y, width, height)
    }

    pub fn is_full(&self, bounds: FrameSize) -> bool {
        *self == Self::full(bounds)
    }
}
