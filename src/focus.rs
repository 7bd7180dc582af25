//! `focus(c)` and `restack(m)` (spec.md §4.5): the two operations that
//! decide which client owns input focus and the window stacking order of
//! the selected monitor.

use x11::xlib;

use crate::bar;
use crate::client::ClientId;
use crate::monitor::MonitorId;
use crate::wm::{Wm, SCHEME_NORMAL, SCHEME_SELECTED};

/// `unfocus(c, setfocus)`: paints `c` with the normal border color and,
/// if `setfocus`, reverts input focus to `PointerRoot` so no stale client
/// keeps receiving key events after it stops being selected.
pub fn unfocus(wm: &mut Wm, id: ClientId, setfocus: bool) {
    let window = match wm.arena.get(id) {
        Some(c) => c.window,
        None => return,
    };
    let pixel = wm.draw.scheme_border_pixel(SCHEME_NORMAL);
    wm.xconn.set_border_color(window, pixel);
    if setfocus {
        wm.xconn.revert_focus_to_pointer_root();
        unsafe {
            xlib::XDeleteProperty(wm.xconn.display, wm.xconn.root, wm.net_atoms.active_window);
        }
    }
}

/// `focus(c)`. `c = None` means "pick a replacement": the first visible
/// client in the selected monitor's focus stack, falling back to no
/// selection if the monitor has none (spec.md §4.5 Invariant: "the
/// selected client, if any, is always visible").
pub fn focus(wm: &mut Wm, c: Option<ClientId>) {
    let sel_mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };

    let target = match c {
        Some(id) if wm.monitors.get(sel_mon).map(|m| m.is_visible(&wm.arena, id)).unwrap_or(false) => Some(id),
        _ => wm.monitors.get(sel_mon).and_then(|m| m.first_visible_in_stack(&wm.arena)),
    };

    let previous = wm.monitors.get(sel_mon).and_then(|m| m.selected_client);
    if let Some(prev) = previous {
        if Some(prev) != target {
            unfocus(wm, prev, false);
        }
    }

    if let Some(id) = target {
        // Promote to the front of the focus stack (MRU order).
        if let Some(m) = wm.monitors.get_mut(sel_mon) {
            m.stack.retain(|&x| x != id);
            m.stack.insert(0, id);
            m.selected_client = Some(id);
        }

        let never_focus = wm.arena.get(id).map(|c| c.never_focus).unwrap_or(false);
        set_urgent(wm, id, false);
        let pixel = wm.draw.scheme_border_pixel(SCHEME_SELECTED);
        let window = wm.arena.get(id).unwrap().window;
        wm.xconn.set_border_color(window, pixel);

        if !never_focus {
            wm.xconn.set_input_focus(window);
            send_take_focus(wm, window);
        }
        unsafe {
            xlib::XChangeProperty(
                wm.xconn.display,
                wm.xconn.root,
                wm.net_atoms.active_window,
                xlib::XA_WINDOW,
                32,
                xlib::PropModeReplace,
                &window as *const xlib::Window as *const u8,
                1,
            );
        }
    } else {
        if let Some(m) = wm.monitors.get_mut(sel_mon) {
            m.selected_client = None;
        }
        wm.xconn.revert_focus_to_pointer_root();
        unsafe {
            xlib::XDeleteProperty(wm.xconn.display, wm.xconn.root, wm.net_atoms.active_window);
        }
    }

    bar::draw_bars(wm);
}

pub(crate) fn set_urgent(wm: &mut Wm, id: ClientId, urgent: bool) {
    if let Some(c) = wm.arena.get_mut(id) {
        c.is_urgent = urgent;
    }
}

/// `sendevent`: delivers a `WM_PROTOCOLS`/`WM_TAKE_FOCUS` client message if
/// the client opted in via `WM_PROTOCOLS` (spec.md §6 "SendEvent").
fn send_take_focus(wm: &Wm, window: xlib::Window) {
    if !supports_protocol(wm, window, wm.wm_atoms.take_focus) {
        return;
    }
    send_protocol_message(wm, window, wm.wm_atoms.take_focus);
}

pub fn send_delete(wm: &Wm, window: xlib::Window) -> bool {
    if !supports_protocol(wm, window, wm.wm_atoms.delete) {
        return false;
    }
    send_protocol_message(wm, window, wm.wm_atoms.delete);
    true
}

fn supports_protocol(wm: &Wm, window: xlib::Window, atom: xlib::Atom) -> bool {
    unsafe {
        let mut protocols: *mut xlib::Atom = std::ptr::null_mut();
        let mut n: i32 = 0;
        if xlib::XGetWMProtocols(wm.xconn.display, window, &mut protocols, &mut n) == 0 {
            return false;
        }
        let found = std::slice::from_raw_parts(protocols, n as usize).contains(&atom);
        xlib::XFree(protocols as *mut _);
        found
    }
}

fn send_protocol_message(wm: &Wm, window: xlib::Window, atom: xlib::Atom) {
    unsafe {
        let mut data = xlib::ClientMessageData::new();
        data.set_long(0, atom as i64);
        data.set_long(1, xlib::CurrentTime as i64);
        let event = xlib::XClientMessageEvent {
            type_: xlib::ClientMessage,
            serial: 0,
            send_event: 0,
            display: wm.xconn.display,
            window,
            message_type: wm.wm_atoms.protocols,
            format: 32,
            data,
        };
        let mut ev = xlib::XEvent { client_message: event };
        xlib::XSendEvent(wm.xconn.display, window, 0, xlib::NoEventMask, &mut ev);
    }
}

/// `restack(m)`: draws the bar, raises the selected client above its
/// siblings if floating or the layout doesn't arrange, then — when the
/// layout does arrange — walks the focus stack and lowers every tiled,
/// visible client directly below the previously-lowered sibling, starting
/// from the bar window (spec.md §4.5, matching dwm's `restack`).
pub fn restack(wm: &mut Wm, mon: MonitorId) {
    bar::draw_bar(wm, mon);

    let (selected, bar_window, arranges, floating_or_unmanaged, stack) = {
        let m = match wm.monitors.get(mon) {
            Some(m) => m,
            None => return,
        };
        let arranges = m.current_layout().arranges();
        let floating = m
            .selected_client
            .and_then(|id| wm.arena.get(id))
            .map(|c| c.is_floating)
            .unwrap_or(false);
        (m.selected_client, m.bar_window, arranges, floating || !arranges, m.stack.clone())
    };

    if let Some(id) = selected {
        if floating_or_unmanaged {
            let window = wm.arena.get(id).unwrap().window;
            wm.xconn.raise(window);
        }
    }

    if arranges {
        let mut sibling = bar_window;
        for id in stack {
            let is_visible = wm.monitors.get(mon).map(|m| m.is_visible(&wm.arena, id)).unwrap_or(false);
            let is_floating = wm.arena.get(id).map(|c| c.is_floating).unwrap_or(true);
            if is_floating || !is_visible {
                continue;
            }
            let window = wm.arena.get(id).unwrap().window;
            wm.xconn.lower_below(window, sibling);
            sibling = window;
        }
    }

    wm.xconn.sync();
    drain_enter_notify(wm);
}

/// Discards queued `EnterNotify` events generated by the restack itself,
/// so a raise doesn't immediately re-trigger focus-follows-mouse.
fn drain_enter_notify(wm: &mut Wm) {
    unsafe {
        let mut ev: xlib::XEvent = std::mem::zeroed();
        while xlib::XCheckMaskEvent(wm.xconn.display, xlib::EnterWindowMask, &mut ev) != 0 {}
    }
}
