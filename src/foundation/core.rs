use crate::foundation::error::{SpriteError, SpriteResult};

pub use kurbo::{Point, Rect};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated, non-empty canvas.
    pub fn new(width: u32, height: u32) -> SpriteResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(self) -> SpriteResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SpriteError::validation(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Smallest canvas that holds every `(width, height)` pair.
    ///
    /// Returns `None` when `sizes` is empty.
    pub fn enclosing(sizes: impl IntoIterator<Item = (u32, u32)>) -> Option<Self> {
        sizes.into_iter().fold(None, |acc, (w, h)| {
            Some(match acc {
                None => Self {
                    width: w,
                    height: h,
                },
                Some(c) => Self {
                    width: c.width.max(w),
                    height: c.height.max(h),
                },
            })
        })
    }
}

/// Serialize a [`Point`] as a compact `[x, y]` pair.
pub(crate) mod point_pair {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(p: &Point, s: S) -> Result<S::Ok, S::Error> {
        [p.x, p.y].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Point, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(d)?;
        Ok(Point::new(x, y))
    }
}

/// Serialize a point sequence as `[[x, y], ...]`.
pub(crate) mod point_pairs {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(points: &[Point], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(points.len()))?;
        for p in points {
            seq.serialize_element(&[p.x, p.y])?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Point>, D::Error> {
        let raw = Vec::<[f64; 2]>::deserialize(d)?;
        Ok(raw.into_iter().map(|[x, y]| Point::new(x, y)).collect())
    }
}
