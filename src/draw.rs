//! A concrete backing for the opaque `DrawContext` interface spec.md §6
//! names but treats as an external collaborator. Grounded in
//! `sminez-penrose`'s `penrose_ui::core` module (status-bar rendering via
//! the `x11` crate's `xft`/`xlib` modules against an off-screen pixmap) and
//! the `Drw`/`Clr`/`Cur` surface in
//! `examples/other_examples/8bd1a4a1_beamiter-rust-project__jwm-src-dwm.rs.rs`,
//! which names the exact operation set implemented here. Single-font only
//! (no per-glyph fallback chunking) — see SPEC_FULL.md §C.

use std::ffi::CString;
use std::os::raw::{c_int, c_uint};
use std::ptr;

use x11::xft::{
    XftColor, XftColorAllocName, XftColorFree, XftDraw, XftDrawCreate, XftDrawDestroy,
    XftDrawRect, XftDrawStringUtf8, XftFont, XftFontClose, XftFontOpenName, XftTextExtentsUtf8,
};
use x11::xlib::{
    self, Colormap, Cursor, Display, Drawable, GC, Pixmap, Visual, Window, XCreateFontCursor,
    XCreateGC, XCreatePixmap, XDefaultColormap, XDefaultDepth, XDefaultVisual, XFreeCursor,
    XFreeGC, XFreePixmap, XGCValues,
};
use x11::xrender::XGlyphInfo;

use crate::error::WmError;

/// An allocated Xft color (owns the underlying X server resources until
/// [`DrawContext::free`] is called — matches dwm's `Clr`, which is never
/// individually freed before process exit either).
#[derive(Debug, Clone, Copy)]
pub struct Clr {
    xft: XftColor,
}

impl Clr {
    pub fn pixel(&self) -> u64 {
        self.xft.pixel
    }
}

/// `[border, foreground, background]`, matching spec.md §6's
/// `color_scheme_create(color_triplet)`.
#[derive(Debug, Clone, Copy)]
pub struct Scheme {
    pub border: Clr,
    pub fg: Clr,
    pub bg: Clr,
}

#[derive(Debug, Clone, Copy)]
pub struct Cur {
    pub cursor: Cursor,
}

pub struct DrawContext {
    display: *mut Display,
    screen: c_int,
    visual: *mut Visual,
    colormap: Colormap,
    drawable: Pixmap,
    root: Window,
    gc: GC,
    xft_draw: *mut XftDraw,
    w: u32,
    h: u32,
    font: *mut XftFont,
    font_height: i32,
    schemes: Vec<Scheme>,
    current_scheme: usize,
}

unsafe impl Send for DrawContext {}

impl DrawContext {
    /// `create(display, screen, drawable, w, h)`.
    pub fn create(display: *mut Display, screen: c_int, root: Window, w: u32, h: u32) -> Result<Self, WmError> {
        unsafe {
            let visual = XDefaultVisual(display, screen);
            let colormap = XDefaultColormap(display, screen);
            let depth = XDefaultDepth(display, screen);
            let drawable = XCreatePixmap(display, root, w.max(1), h.max(1), depth as u32);
            let mut gcv: XGCValues = std::mem::zeroed();
            let gc = XCreateGC(display, drawable, 0, &mut gcv);
            let xft_draw = XftDrawCreate(display, drawable, visual, colormap);
            if xft_draw.is_null() {
                return Err(WmError::Draw("XftDrawCreate failed".into()));
            }
            Ok(DrawContext {
                display,
                screen,
                visual,
                colormap,
                drawable,
                root,
                gc,
                xft_draw,
                w,
                h,
                font: ptr::null_mut(),
                font_height: 0,
                schemes: Vec::new(),
                current_scheme: 0,
            })
        }
    }

    pub fn resize(&mut self, w: u32, h: u32) {
        unsafe {
            XFreePixmap(self.display, self.drawable);
            let depth = XDefaultDepth(self.display, self.screen);
            self.drawable = XCreatePixmap(self.display, self.root, w.max(1), h.max(1), depth as u32);
            XftDrawDestroy(self.xft_draw);
            self.xft_draw = XftDrawCreate(self.display, self.drawable, self.visual, self.colormap);
        }
        self.w = w;
        self.h = h;
    }

    /// `font_set_create(names)`. Only the first name is honored (no
    /// fallback chunking, see module docs); subsequent calls replace the
    /// current font.
    pub fn font_set_create(&mut self, names: &[String]) -> Result<(), WmError> {
        let name = names
            .first()
            .ok_or_else(|| WmError::Draw("no fonts configured".into()))?;
        let c_name = CString::new(name.as_str()).map_err(|e| WmError::Draw(e.to_string()))?;
        unsafe {
            if !self.font.is_null() {
                XftFontClose(self.display, self.font);
            }
            let font = XftFontOpenName(self.display, self.screen, c_name.as_ptr());
            if font.is_null() {
                return Err(WmError::Draw(format!("could not load font {}", name)));
            }
            self.font = font;
            self.font_height = (*font).ascent + (*font).descent;
        }
        Ok(())
    }

    pub fn font_height(&self) -> i32 {
        self.font_height
    }

    /// `font_text_width(text)`.
    pub fn font_text_width(&self, text: &str) -> u32 {
        if self.font.is_null() || text.is_empty() {
            return 0;
        }
        unsafe {
            let mut extents: XGlyphInfo = std::mem::zeroed();
            XftTextExtentsUtf8(
                self.display,
                self.font,
                text.as_ptr(),
                text.len() as c_int,
                &mut extents,
            );
            extents.xOff as u32
        }
    }

    /// `color_scheme_create(color_triplet)`. Returns an index used later by
    /// [`DrawContext::set_scheme`].
    pub fn color_scheme_create(&mut self, border: &str, fg: &str, bg: &str) -> Result<usize, WmError> {
        let alloc = |s: &str| -> Result<Clr, WmError> {
            let c = CString::new(s).map_err(|e| WmError::Draw(e.to_string()))?;
            unsafe {
                let mut xft: XftColor = std::mem::zeroed();
                if XftColorAllocName(self.display, self.visual, self.colormap, c.as_ptr(), &mut xft) == 0 {
                    return Err(WmError::Draw(format!("unparsable color {}", s)));
                }
                Ok(Clr { xft })
            }
        };
        let scheme = Scheme {
            border: alloc(border)?,
            fg: alloc(fg)?,
            bg: alloc(bg)?,
        };
        self.schemes.push(scheme);
        Ok(self.schemes.len() - 1)
    }

    pub fn cursor_create(&self, shape: c_uint) -> Cur {
        let cursor = unsafe { XCreateFontCursor(self.display, shape) };
        Cur { cursor }
    }

    pub fn cursor_free(&self, cur: Cur) {
        unsafe {
            XFreeCursor(self.display, cur.cursor);
        }
    }

    pub fn set_scheme(&mut self, idx: usize) {
        if idx < self.schemes.len() {
            self.current_scheme = idx;
        }
    }

    /// Border pixel value of scheme `idx`, for direct `XSetWindowBorder`
    /// calls made outside of bar rendering (`wm::manage`, focus changes).
    pub fn scheme_border_pixel(&self, idx: usize) -> u64 {
        self.schemes.get(idx).map(|s| s.border.pixel()).unwrap_or(0)
    }

    fn scheme(&self) -> Scheme {
        self.schemes[self.current_scheme]
    }

    /// `text(x, y, w, h, left_pad, text, invert) -> x_advanced`. Fills the
    /// `(x,y,w,h)` box with the background color (foreground if `invert`),
    /// draws `text` left-padded by `left_pad` in the foreground color
    /// (background if `invert`), and returns the x coordinate after the box.
    pub fn text(&self, x: i32, y: i32, w: u32, h: u32, left_pad: u32, text: &str, invert: bool) -> i32 {
        let scheme = self.scheme();
        let (bg, fg) = if invert {
            (scheme.fg, scheme.bg)
        } else {
            (scheme.bg, scheme.fg)
        };
        unsafe {
            XftDrawRect(self.xft_draw, &bg.xft, x, y, w, h);
            if !text.is_empty() && !self.font.is_null() {
                let baseline = y + (h as i32 + self.font_height) / 2 - (*self.font).descent;
                XftDrawStringUtf8(
                    self.xft_draw,
                    &fg.xft,
                    self.font,
                    x + left_pad as i32,
                    baseline,
                    text.as_ptr(),
                    text.len() as c_int,
                );
            }
        }
        x + w as i32
    }

    /// `rect(x, y, w, h, filled, invert)`.
    pub fn rect(&self, x: i32, y: i32, w: u32, h: u32, filled: bool, invert: bool) {
        let scheme = self.scheme();
        let color = if invert { scheme.bg } else { scheme.fg };
        unsafe {
            if filled {
                XftDrawRect(self.xft_draw, &color.xft, x, y, w, h);
            } else {
                // Hollow rect: four 1px-thick filled rects, avoiding the
                // separate XDrawRectangle/GC-color plumbing for a shape this
                // simple.
                XftDrawRect(self.xft_draw, &color.xft, x, y, w, 1);
                XftDrawRect(self.xft_draw, &color.xft, x, y, 1, h);
                XftDrawRect(self.xft_draw, &color.xft, x, y + h as i32 - 1, w, 1);
                XftDrawRect(self.xft_draw, &color.xft, x + w as i32 - 1, y, 1, h);
            }
        }
    }

    /// `map(window, x, y, w, h)`: blit the off-screen pixmap onto `window`.
    pub fn map(&self, window: Window, x: i32, y: i32, w: u32, h: u32) {
        unsafe {
            xlib::XCopyArea(self.display, self.drawable, window, self.gc, x, y, w, h, x, y);
            xlib::XSync(self.display, 0);
        }
    }

    pub fn free(&mut self) {
        unsafe {
            for s in self.schemes.drain(..) {
                XftColorFree(self.display, self.visual, self.colormap, &s.border.xft as *const _ as *mut _);
                XftColorFree(self.display, self.visual, self.colormap, &s.fg.xft as *const _ as *mut _);
                XftColorFree(self.display, self.visual, self.colormap, &s.bg.xft as *const _ as *mut _);
            }
            if !self.font.is_null() {
                XftFontClose(self.display, self.font);
                self.font = ptr::null_mut();
            }
            XftDrawDestroy(self.xft_draw);
            XFreeGC(self.display, self.gc);
            XFreePixmap(self.display, self.drawable);
        }
    }
}

impl Drop for DrawContext {
    fn drop(&mut self) {
        self.free();
    }
}
