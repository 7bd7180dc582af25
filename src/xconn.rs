//! The X Connection Facade: wraps the display handle and exposes a typed
//! operation for every protocol request/reply the core needs (spec.md §2,
//! §6). Kept as a thin struct around the raw Xlib handle, in the same style
//! `blinklad-rdwm` uses directly in `Rdwm` — the facade exists so the rest
//! of the core never touches `x11::xlib` FFI directly.

use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_long, c_uchar, c_uint, c_ulong};
use std::ptr;

use x11::xlib::{self, Display, Window, XEvent, XWindowAttributes, XWindowChanges};
use x11::xinerama;

use crate::geometry::{Rect, SizeHints};

pub struct XConn {
    pub display: *mut Display,
    pub screen: c_int,
    pub root: Window,
}

unsafe impl Send for XConn {}

impl XConn {
    pub fn open(name: Option<&str>) -> Option<Self> {
        let c_name = name.map(|n| CString::new(n).unwrap());
        let ptr_name = c_name.as_ref().map(|c| c.as_ptr()).unwrap_or(ptr::null());
        let display = unsafe { xlib::XOpenDisplay(ptr_name) };
        if display.is_null() {
            return None;
        }
        let screen = unsafe { xlib::XDefaultScreen(display) };
        let root = unsafe { xlib::XRootWindow(display, screen) };
        Some(XConn { display, screen, root })
    }

    pub fn display_width(&self) -> i32 {
        unsafe { xlib::XDisplayWidth(self.display, self.screen) }
    }

    pub fn display_height(&self) -> i32 {
        unsafe { xlib::XDisplayHeight(self.display, self.screen) }
    }

    pub fn sync(&self) {
        unsafe {
            xlib::XSync(self.display, 0);
        }
    }

    pub fn flush(&self) {
        unsafe {
            xlib::XFlush(self.display);
        }
    }

    pub fn select_root_input(&self) {
        unsafe {
            xlib::XSelectInput(
                self.display,
                self.root,
                xlib::SubstructureRedirectMask
                    | xlib::SubstructureNotifyMask
                    | xlib::ButtonPressMask
                    | xlib::PointerMotionMask
                    | xlib::EnterWindowMask
                    | xlib::LeaveWindowMask
                    | xlib::StructureNotifyMask
                    | xlib::PropertyChangeMask,
            );
        }
    }

    pub fn select_client_input(&self, w: Window) {
        unsafe {
            xlib::XSelectInput(
                self.display,
                w,
                xlib::EnterWindowMask
                    | xlib::FocusChangeMask
                    | xlib::PropertyChangeMask
                    | xlib::StructureNotifyMask,
            );
        }
    }

    pub fn query_tree(&self, w: Window) -> Vec<Window> {
        unsafe {
            let mut root: Window = 0;
            let mut parent: Window = 0;
            let mut children: *mut Window = ptr::null_mut();
            let mut n: c_uint = 0;
            if xlib::XQueryTree(self.display, w, &mut root, &mut parent, &mut children, &mut n) == 0 {
                return Vec::new();
            }
            let slice = if children.is_null() {
                &[]
            } else {
                std::slice::from_raw_parts(children, n as usize)
            };
            let out = slice.to_vec();
            if !children.is_null() {
                xlib::XFree(children as *mut _);
            }
            out
        }
    }

    pub fn get_window_attributes(&self, w: Window) -> Option<XWindowAttributes> {
        unsafe {
            let mut attrs: XWindowAttributes = std::mem::zeroed();
            if xlib::XGetWindowAttributes(self.display, w, &mut attrs) == 0 {
                None
            } else {
                Some(attrs)
            }
        }
    }

    pub fn get_transient_for(&self, w: Window) -> Option<Window> {
        unsafe {
            let mut trans: Window = 0;
            if xlib::XGetTransientForHint(self.display, w, &mut trans) != 0 && trans != 0 {
                Some(trans)
            } else {
                None
            }
        }
    }

    pub fn get_class_hint(&self, w: Window) -> (String, String) {
        unsafe {
            let mut hint: xlib::XClassHint = std::mem::zeroed();
            if xlib::XGetClassHint(self.display, w, &mut hint) == 0 {
                return ("broken".into(), "broken".into());
            }
            let class = if hint.res_class.is_null() {
                "broken".to_string()
            } else {
                CStr::from_ptr(hint.res_class).to_string_lossy().into_owned()
            };
            let instance = if hint.res_name.is_null() {
                "broken".to_string()
            } else {
                CStr::from_ptr(hint.res_name).to_string_lossy().into_owned()
            };
            if !hint.res_class.is_null() {
                xlib::XFree(hint.res_class as *mut _);
            }
            if !hint.res_name.is_null() {
                xlib::XFree(hint.res_name as *mut _);
            }
            (class, instance)
        }
    }

    pub fn fetch_name(&self, w: Window) -> String {
        unsafe {
            let mut text_prop: xlib::XTextProperty = std::mem::zeroed();
            // Prefer UTF-8 _NET_WM_NAME if the caller already resolved it;
            // this falls back to ICCCM WM_NAME via Xutf8TextPropertyToTextList
            // semantics approximated with XGetWMName for ASCII titles.
            if xlib::XGetWMName(self.display, w, &mut text_prop) != 0 && !text_prop.value.is_null() {
                let s = CStr::from_ptr(text_prop.value as *const i8)
                    .to_string_lossy()
                    .into_owned();
                xlib::XFree(text_prop.value as *mut _);
                return s;
            }
            String::new()
        }
    }

    /// Reads a single-atom property (e.g. `_NET_WM_WINDOW_TYPE`'s first
    /// value), returning `None` if unset.
    pub fn get_atom_prop(&self, w: Window, prop: xlib::Atom) -> Option<xlib::Atom> {
        self.get_atom_list_prop(w, prop).into_iter().next()
    }

    /// Reads a whole `ATOM[]` property (e.g. `_NET_WM_STATE`).
    pub fn get_atom_list_prop(&self, w: Window, prop: xlib::Atom) -> Vec<xlib::Atom> {
        unsafe {
            let mut actual_type: xlib::Atom = 0;
            let mut actual_format: c_int = 0;
            let mut nitems: c_ulong = 0;
            let mut bytes_after: c_ulong = 0;
            let mut data: *mut u8 = ptr::null_mut();
            let status = xlib::XGetWindowProperty(
                self.display,
                w,
                prop,
                0 as c_long,
                (c_long::MAX) / 4,
                0,
                xlib::XA_ATOM,
                &mut actual_type,
                &mut actual_format,
                &mut nitems,
                &mut bytes_after,
                &mut data,
            );
            if status != 0 || data.is_null() || nitems == 0 {
                if !data.is_null() {
                    xlib::XFree(data as *mut _);
                }
                return Vec::new();
            }
            let atoms = std::slice::from_raw_parts(data as *const xlib::Atom, nitems as usize).to_vec();
            xlib::XFree(data as *mut _);
            atoms
        }
    }

    /// `WM_HINTS`: `(is_urgent, never_focus)`. `never_focus` is the
    /// negation of the `InputHint` flag's `input` field (a client that
    /// explicitly asks not to receive input focus).
    pub fn get_wm_hints(&self, w: Window) -> (bool, bool) {
        unsafe {
            let hints = xlib::XGetWMHints(self.display, w);
            if hints.is_null() {
                return (false, false);
            }
            let h = &*hints;
            let urgent = h.flags & xlib::XUrgencyHint != 0;
            let never_focus = h.flags & xlib::InputHint != 0 && h.input == 0;
            xlib::XFree(hints as *mut _);
            (urgent, never_focus)
        }
    }

    /// Clears the urgency bit in `WM_HINTS`, leaving other fields intact.
    pub fn clear_urgency(&self, w: Window) {
        self.set_urgency(w, false);
    }

    /// Sets or clears the urgency bit in `WM_HINTS` (spec.md §B "seturgent"),
    /// so other clients reading the property see the same state our own
    /// `Client::is_urgent` mirror tracks.
    pub fn set_urgency(&self, w: Window, urgent: bool) {
        unsafe {
            let hints = xlib::XGetWMHints(self.display, w);
            if hints.is_null() {
                return;
            }
            if urgent {
                (*hints).flags |= xlib::XUrgencyHint;
            } else {
                (*hints).flags &= !xlib::XUrgencyHint;
            }
            xlib::XSetWMHints(self.display, w, hints);
            xlib::XFree(hints as *mut _);
        }
    }

    pub fn get_wm_normal_hints(&self, w: Window) -> SizeHints {
        unsafe {
            let mut hints: xlib::XSizeHints = std::mem::zeroed();
            let mut supplied: c_long = 0;
            let mut sh = SizeHints::default();
            if xlib::XGetWMNormalHints(self.display, w, &mut hints, &mut supplied) == 0 {
                hints.flags = xlib::PSize;
            }
            if hints.flags & xlib::PBaseSize != 0 {
                sh.basew = hints.base_width;
                sh.baseh = hints.base_height;
            } else if hints.flags & xlib::PMinSize != 0 {
                sh.basew = hints.min_width;
                sh.baseh = hints.min_height;
            }
            if hints.flags & xlib::PResizeInc != 0 {
                sh.incw = hints.width_inc;
                sh.inch = hints.height_inc;
            }
            if hints.flags & xlib::PMaxSize != 0 {
                sh.maxw = hints.max_width;
                sh.maxh = hints.max_height;
            }
            if hints.flags & xlib::PMinSize != 0 {
                sh.minw = hints.min_width;
                sh.minh = hints.min_height;
            } else if hints.flags & xlib::PBaseSize != 0 {
                sh.minw = hints.base_width;
                sh.minh = hints.base_height;
            }
            if hints.flags & xlib::PAspect != 0 && hints.min_aspect.x != 0 && hints.max_aspect.y != 0
            {
                sh.mina = hints.min_aspect.y as f64 / hints.min_aspect.x as f64;
                sh.maxa = hints.max_aspect.x as f64 / hints.max_aspect.y as f64;
            }
            sh
        }
    }

    pub fn move_resize(&self, w: Window, r: Rect) {
        unsafe {
            xlib::XMoveResizeWindow(self.display, w, r.x, r.y, r.w.max(1) as c_uint, r.h.max(1) as c_uint);
        }
    }

    pub fn move_window(&self, w: Window, x: i32, y: i32) {
        unsafe {
            xlib::XMoveWindow(self.display, w, x, y);
        }
    }

    pub fn configure_window(&self, w: Window, x: i32, y: i32, width: i32, height: i32, border_width: i32) {
        unsafe {
            let mut wc: XWindowChanges = std::mem::zeroed();
            wc.x = x;
            wc.y = y;
            wc.width = width;
            wc.height = height;
            wc.border_width = border_width;
            let mask = (xlib::CWX | xlib::CWY | xlib::CWWidth | xlib::CWHeight | xlib::CWBorderWidth) as u32;
            xlib::XConfigureWindow(self.display, w, mask, &mut wc);
        }
    }

    pub fn send_configure_notify(&self, w: Window, r: Rect, border_width: i32) {
        unsafe {
            let mut ce: xlib::XConfigureEvent = std::mem::zeroed();
            ce.type_ = xlib::ConfigureNotify;
            ce.display = self.display;
            ce.event = w;
            ce.window = w;
            ce.x = r.x;
            ce.y = r.y;
            ce.width = r.w;
            ce.height = r.h;
            ce.border_width = border_width;
            ce.above = 0;
            ce.override_redirect = 0;
            let mut ev = XEvent { configure: ce };
            xlib::XSendEvent(self.display, w, 0, xlib::StructureNotifyMask, &mut ev);
        }
    }

    pub fn set_border_width(&self, w: Window, bw: i32) {
        unsafe {
            let mut wc: XWindowChanges = std::mem::zeroed();
            wc.border_width = bw;
            xlib::XConfigureWindow(self.display, w, xlib::CWBorderWidth as u32, &mut wc);
        }
    }

    pub fn set_border_color(&self, w: Window, pixel: u64) {
        unsafe {
            xlib::XSetWindowBorder(self.display, w, pixel);
        }
    }

    pub fn map(&self, w: Window) {
        unsafe {
            xlib::XMapWindow(self.display, w);
        }
    }

    pub fn unmap(&self, w: Window) {
        unsafe {
            xlib::XUnmapWindow(self.display, w);
        }
    }

    pub fn raise(&self, w: Window) {
        unsafe {
            xlib::XRaiseWindow(self.display, w);
        }
    }

    pub fn lower_below(&self, w: Window, sibling: Window) {
        unsafe {
            let mut wc: XWindowChanges = std::mem::zeroed();
            wc.sibling = sibling;
            wc.stack_mode = xlib::Below;
            xlib::XConfigureWindow(self.display, w, (xlib::CWSibling | xlib::CWStackMode) as u32, &mut wc);
        }
    }

    pub fn set_input_focus(&self, w: Window) {
        unsafe {
            xlib::XSetInputFocus(self.display, w, xlib::RevertToPointerRoot, xlib::CurrentTime);
        }
    }

    pub fn revert_focus_to_pointer_root(&self) {
        unsafe {
            xlib::XSetInputFocus(
                self.display,
                xlib::PointerRoot as Window,
                xlib::RevertToPointerRoot,
                xlib::CurrentTime,
            );
        }
    }

    pub fn kill_client(&self, w: Window) {
        unsafe {
            xlib::XKillClient(self.display, w);
        }
    }

    pub fn next_event(&self) -> XEvent {
        unsafe {
            let mut ev: XEvent = std::mem::zeroed();
            xlib::XNextEvent(self.display, &mut ev);
            ev
        }
    }

    pub fn pending(&self) -> i32 {
        unsafe { xlib::XPending(self.display) }
    }

    /// Blocks for the next event matching `mask`, queuing (and leaving
    /// queued) anything else. Used by the modal `move_mouse`/`resize_mouse`
    /// loops to pump only pointer motion/button events while the grab is
    /// held (spec.md §4.7).
    pub fn mask_event(&self, mask: c_long) -> XEvent {
        unsafe {
            let mut ev: XEvent = std::mem::zeroed();
            xlib::XMaskEvent(self.display, mask, &mut ev);
            ev
        }
    }

    pub fn xinerama_active(&self) -> bool {
        unsafe { xinerama::XineramaIsActive(self.display) != 0 }
    }

    pub fn xinerama_query_screens(&self) -> Vec<Rect> {
        unsafe {
            let mut n: c_int = 0;
            let infos = xinerama::XineramaQueryScreens(self.display, &mut n);
            if infos.is_null() {
                return Vec::new();
            }
            let slice = std::slice::from_raw_parts(infos, n as usize);
            let out = slice
                .iter()
                .map(|s| Rect::new(s.x_org as i32, s.y_org as i32, s.width as i32, s.height as i32))
                .collect();
            xlib::XFree(infos as *mut _);
            out
        }
    }

    /// Matches dwm's `cleanup()`, which sets `DestroyAll` close-down mode
    /// before closing the display so the X server tears down every window
    /// and resource this connection still owns (bar windows, the supporting
    /// `wmcheckwin`) instead of orphaning them.
    pub fn close(&self) {
        unsafe {
            xlib::XSetCloseDownMode(self.display, xlib::DestroyAll);
            xlib::XCloseDisplay(self.display);
        }
    }

    /// `XQueryPointer` restricted to the root window: absolute pointer
    /// position plus the window directly under it (0 if none/on another
    /// screen), used to decide monitor crossings on `EnterNotify`/
    /// `MotionNotify` (spec.md §4.6).
    pub fn query_pointer_root(&self) -> (i32, i32, Window) {
        unsafe {
            let mut root_ret: Window = 0;
            let mut child_ret: Window = 0;
            let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) =
                (0, 0, 0, 0);
            let mut mask: c_uint = 0;
            xlib::XQueryPointer(
                self.display,
                self.root,
                &mut root_ret,
                &mut child_ret,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            );
            (root_x, root_y, child_ret)
        }
    }

    pub fn warp_pointer(&self, w: Window, x: i32, y: i32) {
        unsafe {
            xlib::XWarpPointer(self.display, 0, w, 0, 0, 0, 0, x, y);
        }
    }

    /// Grabs the pointer for a modal mouse-drag command (`move_mouse`/
    /// `resize_mouse`), reporting button motion with the given cursor
    /// shown. Returns whether the grab succeeded.
    pub fn grab_pointer_for_drag(&self, cursor: xlib::Cursor) -> bool {
        unsafe {
            xlib::XGrabPointer(
                self.display,
                self.root,
                0,
                (xlib::ButtonPressMask | xlib::ButtonReleaseMask | xlib::PointerMotionMask) as u32,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
                0,
                cursor,
                xlib::CurrentTime,
            ) == xlib::GrabSuccess
        }
    }

    pub fn ungrab_pointer(&self) {
        unsafe {
            xlib::XUngrabPointer(self.display, xlib::CurrentTime);
        }
    }

    /// Replays a synchronously-grabbed click-to-focus `ButtonPress` through
    /// to the client, so the click both focuses the window and is seen by
    /// the application (spec.md §6 "AllowEvents (ReplayPointer ...)").
    pub fn allow_replay_pointer(&self) {
        unsafe {
            xlib::XAllowEvents(self.display, xlib::ReplayPointer, xlib::CurrentTime);
        }
    }

    pub fn define_cursor(&self, w: Window, cursor: xlib::Cursor) {
        unsafe {
            xlib::XDefineCursor(self.display, w, cursor);
        }
    }

    /// Prefers `_NET_WM_NAME` (UTF-8) over `WM_NAME`, per spec.md §6.
    pub fn fetch_name_utf8(&self, w: Window, net_wm_name: xlib::Atom) -> String {
        if let Some(s) = self.get_utf8_text_prop(w, net_wm_name) {
            if !s.is_empty() {
                return s;
            }
        }
        self.fetch_name(w)
    }

    fn get_utf8_text_prop(&self, w: Window, atom: xlib::Atom) -> Option<String> {
        unsafe {
            let utf8_string = xlib::XInternAtom(self.display, b"UTF8_STRING\0".as_ptr() as *const i8, 0);
            let mut actual_type: xlib::Atom = 0;
            let mut actual_format: c_int = 0;
            let mut nitems: c_ulong = 0;
            let mut bytes_after: c_ulong = 0;
            let mut data: *mut u8 = ptr::null_mut();
            let status = xlib::XGetWindowProperty(
                self.display,
                w,
                atom,
                0,
                c_long::MAX / 4,
                0,
                utf8_string,
                &mut actual_type,
                &mut actual_format,
                &mut nitems,
                &mut bytes_after,
                &mut data,
            );
            if status != 0 || data.is_null() || nitems == 0 {
                if !data.is_null() {
                    xlib::XFree(data as *mut _);
                }
                return None;
            }
            let slice = std::slice::from_raw_parts(data, nitems as usize);
            let s = String::from_utf8_lossy(slice).into_owned();
            xlib::XFree(data as *mut _);
            Some(s)
        }
    }

    /// Reads `WM_NAME` off the root window — the `xsetroot`/status-line
    /// convention dwm's bar status text relies on.
    pub fn root_status_text(&self) -> String {
        self.fetch_name(self.root)
    }
}

/// Keysym/keycode helpers, kept next to the facade since they're display-
/// scoped operations (spec.md §6's `KeysymToKeycode`/`GetModifierMapping`).
pub mod keys {
    use super::*;

    pub fn keysym_to_keycode(dpy: *mut Display, keysym: xlib::KeySym) -> c_uchar {
        unsafe { xlib::XKeysymToKeycode(dpy, keysym) }
    }

    pub fn string_to_keysym(name: &str) -> Option<xlib::KeySym> {
        let c = CString::new(name).ok()?;
        let sym = unsafe { xlib::XStringToKeysym(c.as_ptr()) };
        if sym == xlib::NoSymbol as u64 {
            None
        } else {
            Some(sym)
        }
    }

    /// Finds which modifier bit (if any) the Num_Lock keysym maps to, per
    /// spec.md §B.2's numlock-discovery procedure.
    pub fn discover_numlock_mask(dpy: *mut Display) -> u32 {
        unsafe {
            let modmap = xlib::XGetModifierMapping(dpy);
            if modmap.is_null() {
                return 0;
            }
            let numlock_keysym = xlib::XK_Num_Lock as xlib::KeySym;
            let max_keypermod = (*modmap).max_keypermod as usize;
            let keycodes = std::slice::from_raw_parts((*modmap).modifiermap, 8 * max_keypermod);
            let mut mask = 0u32;
            for i in 0..8 {
                for j in 0..max_keypermod {
                    let kc = keycodes[i * max_keypermod + j];
                    if kc == 0 {
                        continue;
                    }
                    let sym = xlib::XKeycodeToKeysym(dpy, kc, 0);
                    if sym == numlock_keysym {
                        mask = 1 << i;
                    }
                }
            }
            xlib::XFreeModifiermap(modmap);
            mask
        }
    }
}
