//! Interned ICCCM/EWMH atom tables (spec.md §3.3).

use std::ffi::CString;
use x11::xlib::{Atom, Display, XInternAtom};

/// `WM_*` atoms used for ICCCM client-message protocols.
#[derive(Debug, Clone, Copy)]
pub struct WmAtoms {
    pub protocols: Atom,
    pub delete: Atom,
    pub state: Atom,
    pub take_focus: Atom,
}

/// `_NET_*` atoms used for the EWMH surface named in spec.md §6.
#[derive(Debug, Clone, Copy)]
pub struct NetAtoms {
    pub supported: Atom,
    pub wm_name: Atom,
    pub wm_state: Atom,
    pub wm_check: Atom,
    pub wm_fullscreen: Atom,
    pub active_window: Atom,
    pub wm_window_type: Atom,
    pub wm_window_type_dialog: Atom,
    pub client_list: Atom,
}

fn intern(dpy: *mut Display, name: &str) -> Atom {
    let c = CString::new(name).expect("atom name contains NUL");
    unsafe { XInternAtom(dpy, c.as_ptr(), 0) }
}

impl WmAtoms {
    pub fn intern(dpy: *mut Display) -> Self {
        WmAtoms {
            protocols: intern(dpy, "WM_PROTOCOLS"),
            delete: intern(dpy, "WM_DELETE_WINDOW"),
            state: intern(dpy, "WM_STATE"),
            take_focus: intern(dpy, "WM_TAKE_FOCUS"),
        }
    }
}

impl NetAtoms {
    pub fn intern(dpy: *mut Display) -> Self {
        NetAtoms {
            supported: intern(dpy, "_NET_SUPPORTED"),
            wm_name: intern(dpy, "_NET_WM_NAME"),
            wm_state: intern(dpy, "_NET_WM_STATE"),
            wm_check: intern(dpy, "_NET_SUPPORTING_WM_CHECK"),
            wm_fullscreen: intern(dpy, "_NET_WM_STATE_FULLSCREEN"),
            active_window: intern(dpy, "_NET_ACTIVE_WINDOW"),
            wm_window_type: intern(dpy, "_NET_WM_WINDOW_TYPE"),
            wm_window_type_dialog: intern(dpy, "_NET_WM_WINDOW_TYPE_DIALOG"),
            client_list: intern(dpy, "_NET_CLIENT_LIST"),
        }
    }

    /// The subset of `_NET_*` atoms this WM advertises support for, in the
    /// order written to `_NET_SUPPORTED`.
    pub fn supported_list(&self) -> [Atom; 9] {
        [
            self.supported,
            self.wm_name,
            self.wm_state,
            self.wm_check,
            self.wm_fullscreen,
            self.active_window,
            self.wm_window_type,
            self.wm_window_type_dialog,
            self.client_list,
        ]
    }
}
