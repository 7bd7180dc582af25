//! Host-level errors plus the X protocol error-handling discipline from
//! spec.md §7.

use std::os::raw::c_int;
use x11::xlib::{
    BadAccess, BadDrawable, BadMatch, BadWindow, ConfigureWindow, Display, GrabButton, GrabKey,
    SetInputFocus, XErrorEvent, XSetErrorHandler,
};

#[derive(Debug, thiserror::Error)]
pub enum WmError {
    #[error("cannot open X display (is $DISPLAY set?)")]
    NoDisplay,
    #[error("another window manager is already running")]
    AnotherWmRunning,
    #[error("failed to load configuration: {0}")]
    Config(String),
    #[error("failed to initialize draw context: {0}")]
    Draw(String),
}

/// Set once, permanently, after startup. Implements the "benign race"
/// filtering policy from spec.md §7.2: certain `(request_code, error_code)`
/// combinations are legitimate outcomes of racing an asynchronous X client's
/// destruction, and are swallowed; everything else is forwarded to Xlib's
/// default handler (which may terminate the process, matching dwm's
/// behavior for genuinely fatal errors).
pub unsafe extern "C" fn x_error_handler(_dpy: *mut Display, ev: *mut XErrorEvent) -> c_int {
    let ev = &*ev;
    if is_benign(ev.request_code as c_int, ev.error_code as c_int) {
        return 0;
    }
    log::error!(
        "fatal X error: request_code={} error_code={} resourceid={}",
        ev.request_code,
        ev.error_code,
        ev.resourceid
    );
    // Xlib's default handler calls exit(); we do not have a handle to it
    // here (it was never saved), so terminate the way dwm's `xerror`
    // ultimately does for truly fatal conditions.
    std::process::abort();
}

fn is_benign(request_code: c_int, error_code: c_int) -> bool {
    if error_code == BadWindow || error_code == BadDrawable {
        return true;
    }
    if error_code == BadMatch
        && (request_code == SetInputFocus as c_int || request_code == ConfigureWindow as c_int)
    {
        return true;
    }
    if error_code == BadAccess
        && (request_code == GrabButton as c_int || request_code == GrabKey as c_int)
    {
        return true;
    }
    false
}

/// Installed only during the startup competing-WM probe (spec.md §7.1):
/// selecting `SubstructureRedirectMask` on an already-managed root window
/// raises exactly one `BadAccess`, which this handler latches.
pub unsafe extern "C" fn x_error_start(_dpy: *mut Display, ev: *mut XErrorEvent) -> c_int {
    let ev = &*ev;
    if ev.error_code == BadAccess {
        WM_DETECTED.store(true, std::sync::atomic::Ordering::SeqCst);
    }
    0
}

pub static WM_DETECTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// A dummy handler that swallows every error, for the server-grabbed
/// critical sections in `unmanage` and `kill_selected` (spec.md §7.3).
pub unsafe extern "C" fn x_error_dummy(_dpy: *mut Display, _ev: *mut XErrorEvent) -> c_int {
    0
}

/// RAII guard implementing Design Note 5: "install dummy handler, do risky
/// op, reinstall real handler" as a scope guard. Acquiring it swaps in
/// [`x_error_dummy`]; dropping it restores [`x_error_handler`] on every exit
/// path, including early returns and panics during the guarded section.
pub struct ErrorGuard;

impl ErrorGuard {
    pub fn acquire() -> Self {
        unsafe {
            XSetErrorHandler(Some(x_error_dummy));
        }
        ErrorGuard
    }
}

impl Drop for ErrorGuard {
    fn drop(&mut self) {
        unsafe {
            XSetErrorHandler(Some(x_error_handler));
        }
    }
}
