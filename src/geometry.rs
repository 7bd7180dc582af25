//! ICCCM size hints and the constraint solver that snaps a requested
//! `(x, y, w, h)` onto a legal client geometry.

/// A plain screen-space rectangle. Used both for monitor/work areas and for
/// client geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn intersect_area(&self, other: &Rect) -> i32 {
        let dx = 0.max((self.x + self.w).min(other.x + other.w) - self.x.max(other.x));
        let dy = 0.max((self.y + self.h).min(other.y + other.h) - self.y.max(other.y));
        dx * dy
    }
}

/// Parsed `WM_NORMAL_HINTS`, plus the derived `is_fixed` flag.
///
/// Defaults to "no constraints" (everything zero), which is what a client
/// lacking `WM_NORMAL_HINTS` gets: `apply_size_hints` treats a zero field as
/// "no limit" throughout, matching ICCCM 4.1.2.3's optional-field semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeHints {
    pub basew: i32,
    pub baseh: i32,
    pub incw: i32,
    pub inch: i32,
    pub maxw: i32,
    pub maxh: i32,
    pub minw: i32,
    pub minh: i32,
    pub mina: f64,
    pub maxa: f64,
}

impl SizeHints {
    pub fn is_fixed(&self) -> bool {
        self.maxw > 0 && self.maxh > 0 && self.maxw == self.minw && self.maxh == self.minh
    }
}

/// Inputs to [`apply_size_hints`] that come from the client's current state
/// rather than the requested geometry.
pub struct HintContext<'a> {
    pub hints: &'a SizeHints,
    pub border_width: i32,
    pub is_floating: bool,
    /// The current layout on the client's monitor has an `arrange` function
    /// (i.e. it is not floating/no-op layout).
    pub layout_arranges: bool,
    pub resize_hints: bool,
}

/// Region `apply_size_hints` is allowed to place the client within: either
/// the work area of its monitor (non-interactive) or the full screen
/// (interactive, i.e. the user is dragging it).
pub struct Bounds {
    pub area: Rect,
    pub bar_height: i32,
}

/// Snap a requested `(x, y, w, h)` to a legal client geometry.
///
/// Returns the adjusted geometry and whether it differs from `(x, y, w, h)`
/// as given (not from the client's prior geometry — callers compare against
/// the client's stored geometry themselves to decide whether a round-trip
/// to X is needed).
///
/// Mirrors dwm's `applysizehints`: clamp into bounds first, then, if hint
/// respect is in effect (`resize_hints`, floating, or a no-arrange layout),
/// subtract base size, clamp aspect ratio, re-apply increments, restore
/// base size, and finally clamp to `[min, max]`.
pub fn apply_size_hints(
    ctx: &HintContext,
    bounds: &Bounds,
    interact: bool,
    mut x: i32,
    mut y: i32,
    mut w: i32,
    mut h: i32,
) -> (i32, i32, i32, i32) {
    w = w.max(1);
    h = h.max(1);

    let width = |w: i32| w + 2 * ctx.border_width;
    let height = |h: i32| h + 2 * ctx.border_width;

    if interact {
        let screen = &bounds.area;
        if x > screen.x + screen.w {
            x = screen.x + screen.w - width(w);
        }
        if y > screen.y + screen.h {
            y = screen.y + screen.h - height(h);
        }
        if x + width(w) < screen.x {
            x = screen.x;
        }
        if y + height(h) < screen.y {
            y = screen.y;
        }
    } else {
        let work = &bounds.area;
        if x >= work.x + work.w {
            x = work.x + work.w - width(w);
        }
        if y >= work.y + work.h {
            y = work.y + work.h - height(h);
        }
        if x + width(w) <= work.x {
            x = work.x;
        }
        if y + height(h) <= work.y {
            y = work.y;
        }
    }

    if h < bounds.bar_height {
        h = bounds.bar_height;
    }
    if w < bounds.bar_height {
        w = bounds.bar_height;
    }

    if ctx.resize_hints || ctx.is_floating || !ctx.layout_arranges {
        let hints = ctx.hints;
        let base_is_min = hints.basew == hints.minw && hints.baseh == hints.minh;

        if !base_is_min {
            w -= hints.basew;
            h -= hints.baseh;
        }

        if hints.mina > 0.0 && hints.maxa > 0.0 {
            let aspect = w as f64 / h as f64;
            if hints.maxa < aspect {
                w = (h as f64 * hints.maxa + 0.5) as i32;
            } else if hints.mina < 1.0 / aspect {
                h = (w as f64 * hints.mina + 0.5) as i32;
            }
        }

        if base_is_min {
            w -= hints.basew;
            h -= hints.baseh;
        }

        if hints.incw > 0 {
            w -= w % hints.incw;
        }
        if hints.inch > 0 {
            h -= h % hints.inch;
        }

        w = (w + hints.basew).max(hints.minw);
        h = (h + hints.baseh).max(hints.minh);
        if hints.maxw > 0 {
            w = w.min(hints.maxw);
        }
        if hints.maxh > 0 {
            h = h.min(hints.maxh);
        }
    }

    (x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(hints: SizeHints, resize_hints: bool) -> HintContext<'static> {
        // leak to satisfy the 'static bound in tests; fine, tests are short-lived.
        let hints: &'static SizeHints = Box::leak(Box::new(hints));
        HintContext {
            hints,
            border_width: 1,
            is_floating: false,
            layout_arranges: true,
            resize_hints,
        }
    }

    #[test]
    fn unconstrained_client_is_unchanged_within_bounds() {
        let bounds = Bounds {
            area: Rect::new(0, 16, 1920, 1064),
            bar_height: 16,
        };
        let (x, y, w, h) = apply_size_hints(
            &ctx(SizeHints::default(), false),
            &bounds,
            false,
            100,
            100,
            800,
            600,
        );
        assert_eq!((x, y, w, h), (100, 100, 800, 600));
    }

    #[test]
    fn clamps_minimum_dimension_to_bar_height() {
        let bounds = Bounds {
            area: Rect::new(0, 16, 1920, 1064),
            bar_height: 16,
        };
        let (_, _, w, h) = apply_size_hints(
            &ctx(SizeHints::default(), false),
            &bounds,
            false,
            0,
            16,
            1,
            1,
        );
        assert_eq!(w, 16);
        assert_eq!(h, 16);
    }

    #[test]
    fn respects_increment_hints_when_resize_hints_enabled() {
        let hints = SizeHints {
            basew: 10,
            baseh: 10,
            incw: 9,
            inch: 9,
            minw: 10,
            minh: 10,
            ..Default::default()
        };
        let bounds = Bounds {
            area: Rect::new(0, 16, 1920, 1064),
            bar_height: 16,
        };
        let (_, _, w, h) = apply_size_hints(&ctx(hints, true), &bounds, false, 0, 16, 100, 100);
        // base (10) + k*incw(9) == 100 -> 10 + 9*10 = 100 exactly, already aligned
        assert_eq!((w - 10) % 9, 0);
        assert_eq!((h - 10) % 9, 0);
    }

    #[test]
    fn is_idempotent() {
        let hints = SizeHints {
            basew: 10,
            baseh: 10,
            incw: 7,
            inch: 7,
            minw: 20,
            minh: 20,
            maxw: 500,
            maxh: 500,
            ..Default::default()
        };
        let bounds = Bounds {
            area: Rect::new(0, 16, 1920, 1064),
            bar_height: 16,
        };
        let once = apply_size_hints(&ctx(hints, true), &bounds, false, 50, 50, 233, 177);
        let twice = apply_size_hints(&ctx(hints, true), &bounds, false, once.0, once.1, once.2, once.3);
        assert_eq!(once, twice);
    }

    #[test]
    fn shrinks_width_when_aspect_exceeds_max() {
        let hints = SizeHints {
            mina: 0.5,
            maxa: 0.5,
            minw: 1,
            minh: 1,
            ..Default::default()
        };
        let bounds = Bounds {
            area: Rect::new(0, 0, 1920, 1080),
            bar_height: 0,
        };
        let c = HintContext {
            hints: &hints,
            border_width: 0,
            is_floating: true,
            layout_arranges: true,
            resize_hints: false,
        };
        let (_, _, w, h) = apply_size_hints(&c, &bounds, false, 0, 0, 400, 100);
        assert!((w as f64 / h as f64 - 0.5).abs() < 0.01);
    }

    #[test]
    fn is_fixed_when_min_equals_max() {
        let hints = SizeHints {
            minw: 200,
            minh: 100,
            maxw: 200,
            maxh: 100,
            ..Default::default()
        };
        assert!(hints.is_fixed());
    }
}
