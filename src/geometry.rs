//! QuickDraw `Rect` and `Point`.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::QdError;

/// A QuickDraw point, stored vertical-first like the on-disk record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub v: i16,
    pub h: i16,
}

impl Point {
    pub const fn new(h: i16, v: i16) -> Self {
        Self { v, h }
    }

    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self, QdError> {
        let v = reader.read()?;
        let h = reader.read()?;
        Ok(Self { v, h })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write(self.v);
        writer.write(self.h);
    }
}

/// A QuickDraw rectangle with exclusive `bottom`/`right` edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub top: i16,
    pub left: i16,
    pub bottom: i16,
    pub right: i16,
}

impl Rect {
    pub const fn new(top: i16, left: i16, bottom: i16, right: i16) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// A rect at the origin with the given size.
    pub fn from_size(width: u32, height: u32) -> Result<Self, QdError> {
        let w = i16::try_from(width)
            .map_err(|_| QdError::TooBig(alloc::format!("width {width} exceeds 32767")))?;
        let h = i16::try_from(height)
            .map_err(|_| QdError::TooBig(alloc::format!("height {height} exceeds 32767")))?;
        Ok(Self::new(0, 0, h, w))
    }

    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self, QdError> {
        let top = reader.read()?;
        let left = reader.read()?;
        let bottom = reader.read()?;
        let right = reader.read()?;
        Ok(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Read a rect and reject inverted edges.
    pub fn read_valid(reader: &mut BinaryReader<'_>) -> Result<Self, QdError> {
        let rect = Self::read(reader)?;
        if !rect.is_valid() {
            return Err(QdError::invalid(alloc::format!("inverted rect {rect:?}")));
        }
        Ok(rect)
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write(self.top);
        writer.write(self.left);
        writer.write(self.bottom);
        writer.write(self.right);
    }

    #[inline]
    pub fn width(&self) -> i32 {
        i32::from(self.right) - i32::from(self.left)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        i32::from(self.bottom) - i32::from(self.top)
    }

    pub fn is_valid(&self) -> bool {
        self.bottom >= self.top && self.right >= self.left
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Whether `other` lies entirely inside this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.top >= self.top
            && other.left >= self.left
            && other.bottom <= self.bottom
            && other.right <= self.right
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.v >= self.top && p.v < self.bottom && p.h >= self.left && p.h < self.right
    }

    /// Move the rect by `(dh, dv)`; fails when a coordinate leaves i16 range.
    pub fn offset(&self, dh: i32, dv: i32) -> Result<Rect, QdError> {
        let shift = |c: i16, d: i32| {
            i16::try_from(i32::from(c) + d)
                .map_err(|_| QdError::invalid("rect coordinate out of range"))
        };
        Ok(Rect {
            top: shift(self.top, dv)?,
            left: shift(self.left, dh)?,
            bottom: shift(self.bottom, dv)?,
            right: shift(self.right, dh)?,
        })
    }

    /// Express this rect in the local space whose top-left is `origin`.
    pub fn align_to(&self, origin: Point) -> Result<Rect, QdError> {
        self.offset(-i32::from(origin.h), -i32::from(origin.v))
    }

    /// Overlap of two rects, or `None` when they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            top: self.top.max(other.top),
            left: self.left.max(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.min(other.right),
        };
        if r.is_empty() { None } else { Some(r) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_inclusive_of_edges() {
        let outer = Rect::new(0, 0, 10, 10);
        assert!(outer.contains_rect(&Rect::new(0, 0, 10, 10)));
        assert!(outer.contains_rect(&Rect::new(2, 3, 4, 5)));
        assert!(!outer.contains_rect(&Rect::new(2, 3, 11, 5)));
        assert!(outer.contains_point(Point::new(9, 9)));
        assert!(!outer.contains_point(Point::new(10, 0)));
    }

    #[test]
    fn align_to_origin() {
        let r = Rect::new(110, 220, 120, 240);
        let local = r.align_to(Point::new(200, 100)).unwrap();
        assert_eq!(local, Rect::new(10, 20, 20, 40));
        assert_eq!(local.width(), 20);
        assert_eq!(local.height(), 10);
    }

    #[test]
    fn intersect_disjoint() {
        let a = Rect::new(0, 0, 4, 4);
        assert_eq!(a.intersect(&Rect::new(4, 4, 8, 8)), None);
        assert_eq!(
            a.intersect(&Rect::new(2, -2, 8, 2)),
            Some(Rect::new(2, 0, 4, 2))
        );
    }

    #[test]
    fn read_valid_rejects_inverted() {
        let bytes = [0, 10, 0, 0, 0, 5, 0, 10];
        assert!(Rect::read_valid(&mut BinaryReader::new(&bytes)).is_err());
    }
}
