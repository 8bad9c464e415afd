use rasterkit_abi::FbError;
use rasterkit_abi::pack;
use rasterkit_abi::pixel::PixelLayout;

/// A 2D drawing surface over a caller-supplied `&mut [u8]` slice.
///
/// The buffer is produced and owned outside this crate; `FrameBuffer`
/// borrows it for its own lifetime and interprets it through one of the
/// packing layouts in [`PixelLayout`]. Every operation clips to the
/// `width x height` rectangle, so out-of-bounds drawing is a silent no-op
/// and the slice is never indexed past the layout's byte footprint.
pub struct FrameBuffer<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: u32,
    layout: PixelLayout,
}

impl<'a> FrameBuffer<'a> {
    /// Construct a surface whose stride equals its width (after the
    /// format's alignment rounding).
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, FbError> {
        Self::with_stride(data, width, height, layout, width)
    }

    /// Construct a surface with an explicit row stride in pixels.
    ///
    /// The stride is clamped up to the width and rounded to the format's
    /// alignment; the slice must cover the resulting byte footprint.
    pub fn with_stride(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
        stride: u32,
    ) -> Result<Self, FbError> {
        let stride = layout.round_stride(stride.max(width));
        if data.len() < layout.min_buffer_len(stride, height) {
            return Err(FbError::BufferTooSmall);
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    /// Construct from a raw format tag, rejecting unknown tags.
    pub fn with_format_tag(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        tag: u32,
        stride: u32,
    ) -> Result<Self, FbError> {
        let layout = PixelLayout::from_u32(tag).ok_or(FbError::InvalidFormat)?;
        Self::with_stride(data, width, height, layout, stride)
    }

    /// Legacy constructor for 1-bit vertically packed surfaces.
    pub fn mono(data: &'a mut [u8], width: u32, height: u32) -> Result<Self, FbError> {
        Self::new(data, width, height, PixelLayout::MonoVlsb)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in pixels.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Bytes of the backing slice actually addressed by this surface.
    #[inline]
    pub fn used_len(&self) -> usize {
        self.layout.min_buffer_len(self.stride, self.height)
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Fill the whole surface with one color.
    pub fn fill(&mut self, col: u32) {
        let px = self.layout.encode(col);
        if self.width > 0 && self.height > 0 {
            pack::fill_rect(
                self.layout,
                self.data,
                self.stride,
                0,
                0,
                self.width,
                self.height,
                px,
            );
        }
    }

    /// Fill a rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, col: u32) {
        let px = self.layout.encode(col);
        self.fill_rect_px(x, y, w, h, px);
    }

    /// Read one pixel in its stored (encoded) form; `None` out of bounds.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(pack::get_px(
            self.layout,
            self.data,
            self.stride,
            x as u32,
            y as u32,
        ))
    }

    /// Write one pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, col: u32) {
        let px = self.layout.encode(col);
        self.put_px(x, y, px);
    }

    /// Horizontal line of `w` pixels starting at `(x, y)`.
    pub fn hline(&mut self, x: i32, y: i32, w: i32, col: u32) {
        self.fill_rect(x, y, w, 1, col);
    }

    /// Vertical line of `h` pixels starting at `(x, y)`.
    pub fn vline(&mut self, x: i32, y: i32, h: i32, col: u32) {
        self.fill_rect(x, y, 1, h, col);
    }

    /// Copy `src` onto this surface with its top-left corner at `(x, y)`.
    ///
    /// Both rectangles are clipped jointly. Pixels move in their encoded
    /// form, read through the source layout and written through this one,
    /// with no color conversion in between. When `key` is given, source
    /// pixels whose encoded value equals it are left untouched.
    pub fn blit(&mut self, src: &FrameBuffer<'_>, x: i32, y: i32, key: Option<u32>) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(src.width as i32).min(self.width as i32);
        let y1 = y.saturating_add(src.height as i32).min(self.height as i32);

        for dy in y0..y1 {
            let sy = (dy - y) as u32;
            for dx in x0..x1 {
                let sx = (dx - x) as u32;
                let v = pack::get_px(src.layout, src.data, src.stride, sx, sy);
                if key == Some(v) {
                    continue;
                }
                pack::set_px(
                    self.layout,
                    self.data,
                    self.stride,
                    dx as u32,
                    dy as u32,
                    v,
                );
            }
        }
    }

    /// Shift the surface contents by `(dx, dy)` in place.
    ///
    /// Rows and columns are walked in the direction that keeps every read
    /// ahead of the write that would clobber it. Source pixels outside the
    /// surface are never read, so the vacated strip keeps its old contents.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let w = self.width as i32;
        let h = self.height as i32;
        if dx as i64 >= w as i64
            || dx as i64 <= -(w as i64)
            || dy as i64 >= h as i64
            || dy as i64 <= -(h as i64)
        {
            return;
        }

        let (xs, xe) = if dx >= 0 { (dx, w) } else { (0, w + dx) };
        let (ys, ye) = if dy >= 0 { (dy, h) } else { (0, h + dy) };

        let row = |fb: &mut Self, y: i32| {
            if dx >= 0 {
                for x in (xs..xe).rev() {
                    fb.move_px(x - dx, y - dy, x, y);
                }
            } else {
                for x in xs..xe {
                    fb.move_px(x - dx, y - dy, x, y);
                }
            }
        };

        if dy >= 0 {
            for y in (ys..ye).rev() {
                row(self, y);
            }
        } else {
            for y in ys..ye {
                row(self, y);
            }
        }
    }

    /// Clipped fill of a pre-encoded pixel value.
    pub(crate) fn fill_rect_px(&mut self, x: i32, y: i32, w: i32, h: i32, px: u32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w - 1).min(self.width as i32 - 1);
        let y1 = y.saturating_add(h - 1).min(self.height as i32 - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }
        pack::fill_rect(
            self.layout,
            self.data,
            self.stride,
            x0 as u32,
            y0 as u32,
            (x1 - x0 + 1) as u32,
            (y1 - y0 + 1) as u32,
            px,
        );
    }

    /// Clipped write of a pre-encoded pixel value.
    pub(crate) fn put_px(&mut self, x: i32, y: i32, px: u32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        pack::set_px(self.layout, self.data, self.stride, x as u32, y as u32, px);
    }

    #[inline]
    fn move_px(&mut self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) {
        let v = pack::get_px(
            self.layout,
            self.data,
            self.stride,
            from_x as u32,
            from_y as u32,
        );
        pack::set_px(
            self.layout,
            self.data,
            self.stride,
            to_x as u32,
            to_y as u32,
            v,
        );
    }
}
