//! Growable composite canvas.
//!
//! The canvas covers the bounding box of every placed frame and carries its
//! own top-left corner in composite space. Placement grows the pixel buffer
//! as needed; a per-pixel coverage mask keeps unwritten regions black and
//! lets feathering average only against real content.

use image::GrayImage;

use crate::config::BlendPolicy;
use crate::core::types::PixelCorner;

/// The composite surface under construction.
pub struct Canvas {
    image: GrayImage,
    covered: Vec<bool>,
    corner: PixelCorner,
}

impl Canvas {
    /// Seed the canvas with the first frame at the composite origin.
    pub fn seed(frame: &GrayImage) -> Self {
        let covered = vec![true; (frame.width() * frame.height()) as usize];
        Self {
            image: frame.clone(),
            covered,
            corner: PixelCorner::ORIGIN,
        }
    }

    /// Canvas top-left corner in composite space: the component-wise minimum
    /// of every placed frame's corner.
    pub fn corner(&self) -> PixelCorner {
        self.corner
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Canvas extent as (height, width).
    pub fn size(&self) -> (u32, u32) {
        (self.image.height(), self.image.width())
    }

    /// Blend `frame` at composite corner `at`, growing the canvas to cover
    /// the union bounding box.
    pub fn blend(&mut self, frame: &GrayImage, at: PixelCorner, policy: BlendPolicy) {
        self.grow_to_cover(frame, at);

        let width = self.image.width() as usize;
        let off_x = (at.x - self.corner.x) as u32;
        let off_y = (at.y - self.corner.y) as u32;

        for fy in 0..frame.height() {
            for fx in 0..frame.width() {
                let cx = off_x + fx;
                let cy = off_y + fy;
                let new = frame.get_pixel(fx, fy)[0];
                let idx = cy as usize * width + cx as usize;

                let value = if self.covered[idx] && policy == BlendPolicy::Feather {
                    let old = self.image.get_pixel(cx, cy)[0];
                    ((old as u16 + new as u16) / 2) as u8
                } else {
                    new
                };

                self.image.put_pixel(cx, cy, image::Luma([value]));
                self.covered[idx] = true;
            }
        }

        self.corner = self.corner.min(&at);
    }

    /// Reallocate so the canvas contains `frame` placed at `at`.
    fn grow_to_cover(&mut self, frame: &GrayImage, at: PixelCorner) {
        let min_x = self.corner.x.min(at.x);
        let min_y = self.corner.y.min(at.y);
        let max_x = (self.corner.x + self.image.width() as i32)
            .max(at.x + frame.width() as i32);
        let max_y = (self.corner.y + self.image.height() as i32)
            .max(at.y + frame.height() as i32);

        let new_w = (max_x - min_x) as u32;
        let new_h = (max_y - min_y) as u32;
        if new_w == self.image.width() && new_h == self.image.height() {
            return;
        }

        let mut grown = GrayImage::new(new_w, new_h);
        let mut covered = vec![false; (new_w * new_h) as usize];

        let shift_x = (self.corner.x - min_x) as u32;
        let shift_y = (self.corner.y - min_y) as u32;
        let old_w = self.image.width() as usize;

        for y in 0..self.image.height() {
            for x in 0..self.image.width() {
                let dst_x = x + shift_x;
                let dst_y = y + shift_y;
                grown.put_pixel(dst_x, dst_y, *self.image.get_pixel(x, y));
                covered[dst_y as usize * new_w as usize + dst_x as usize] =
                    self.covered[y as usize * old_w + x as usize];
            }
        }

        self.image = grown;
        self.covered = covered;
        self.corner = PixelCorner::new(min_x, min_y);
    }
}
