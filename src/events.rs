//! The Event Dispatcher (spec.md §4.6): one handler per X event type,
//! reached through a table keyed by the event-type constant (Design Note 3)
//! rather than the teacher's `match`-per-iteration dispatch. Built once via
//! `lazy_static` (already in the teacher's dependency stack) since the table
//! itself never changes after startup.

use x11::xlib::{self, XEvent};

use crate::bar;
use crate::commands;
use crate::focus;
use crate::geometry::Rect;
use crate::monitor::MonitorId;
use crate::wm::Wm;
use crate::xconn::keys;

type EventHandler = fn(&mut Wm, &XEvent);

lazy_static::lazy_static! {
    static ref DISPATCH: Vec<Option<EventHandler>> = build_dispatch_table();
}

fn build_dispatch_table() -> Vec<Option<EventHandler>> {
    let mut table: Vec<Option<EventHandler>> = vec![None; 64];
    table[xlib::ButtonPress as usize] = Some(on_button_press);
    table[xlib::ClientMessage as usize] = Some(on_client_message);
    table[xlib::ConfigureRequest as usize] = Some(on_configure_request);
    table[xlib::ConfigureNotify as usize] = Some(on_configure_notify);
    table[xlib::DestroyNotify as usize] = Some(on_destroy_notify);
    table[xlib::EnterNotify as usize] = Some(on_enter_notify);
    table[xlib::Expose as usize] = Some(on_expose);
    table[xlib::FocusIn as usize] = Some(on_focus_in);
    table[xlib::KeyPress as usize] = Some(on_key_press);
    table[xlib::MappingNotify as usize] = Some(on_mapping_notify);
    table[xlib::MapRequest as usize] = Some(on_map_request);
    table[xlib::MotionNotify as usize] = Some(on_motion_notify);
    table[xlib::PropertyNotify as usize] = Some(on_property_notify);
    table[xlib::UnmapNotify as usize] = Some(on_unmap_notify);
    table
}

/// Dispatches one event. The default arm (unlisted or out-of-range event
/// types) is a silent no-op, matching dwm's own sparsely-populated handler
/// array.
pub fn handle(wm: &mut Wm, ev: &XEvent) {
    let t = ev.get_type() as usize;
    let window = unsafe { ev.any }.window;
    log::trace!("event type={} window={:#x}", t, window);
    if let Some(Some(f)) = DISPATCH.get(t) {
        f(wm, ev);
    }
}

fn clean_mask(wm: &Wm, mask: u32) -> u32 {
    const RELEVANT: u32 = xlib::ShiftMask
        | xlib::ControlMask
        | xlib::Mod1Mask
        | xlib::Mod2Mask
        | xlib::Mod3Mask
        | xlib::Mod4Mask
        | xlib::Mod5Mask;
    mask & !(wm.numlock_mask | xlib::LockMask) & RELEVANT
}

fn switch_selected_monitor(wm: &mut Wm, mon: MonitorId) {
    if let Some(old) = wm.monitors.selected_id() {
        if old == mon {
            return;
        }
        if let Some(sel) = wm.monitors.get(old).and_then(|m| m.selected_client) {
            focus::unfocus(wm, sel, true);
        }
    }
    if let Some(idx) = wm.monitors.index_of(mon) {
        wm.monitors.selected = idx;
    }
    focus::focus(wm, None);
}

/// Click-to-focus plus bar hit-testing (spec.md §4.6 `ButtonPress`).
fn on_button_press(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.button };
    let clean = clean_mask(wm, e.state);

    if let Some(&mon) = wm.bar_windows.get(&e.window) {
        if let Some(idx) = wm.monitors.index_of(mon) {
            wm.monitors.selected = idx;
        }
        let region = bar::hit_test(wm, mon, e.x);
        let (click, tag_idx) = match region {
            bar::BarRegion::Tag(i) => ("tagbar", Some(i)),
            bar::BarRegion::LayoutSymbol => ("ltsymbol", None),
            bar::BarRegion::Status => ("status", None),
            bar::BarRegion::Title => ("title", None),
        };
        dispatch_button(wm, click, clean, e.button, tag_idx);
        return;
    }

    if e.window == wm.xconn.root {
        dispatch_button(wm, "rootwin", clean, e.button, None);
        return;
    }

    if let Some(id) = wm.arena.find_by_window(e.window) {
        let mon = wm.arena.get(id).unwrap().monitor;
        let already_selected =
            wm.monitors.selected_id() == Some(mon) && wm.monitors.get(mon).and_then(|m| m.selected_client) == Some(id);
        if !already_selected {
            switch_selected_monitor(wm, mon);
            focus::focus(wm, Some(id));
        }
        dispatch_button(wm, "clientwin", clean, e.button, None);
        wm.xconn.allow_replay_pointer();
    }
}

fn dispatch_button(wm: &mut Wm, click: &str, mods: u32, button: u32, tag_idx: Option<usize>) {
    let bindings = wm.config.buttons.clone();
    for b in &bindings {
        if b.click != click || b.button != button {
            continue;
        }
        if crate::wm::resolve_modifiers(&b.mods) != mods {
            continue;
        }
        let arg_spec = match tag_idx {
            Some(i) => crate::config::ArgSpec::Int((1u32 << i) as i32),
            None => b.arg.clone(),
        };
        if let Ok(action) = commands::resolve(&b.action, &arg_spec) {
            (action.func)(wm, &action.arg);
        }
        return;
    }
}

/// `_NET_WM_STATE` fullscreen toggling and `_NET_ACTIVE_WINDOW` urgency
/// marking (spec.md §4.6 `ClientMessage`).
fn on_client_message(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.client_message };
    if e.message_type == wm.net_atoms.wm_state {
        let id = match wm.arena.find_by_window(e.window) {
            Some(id) => id,
            None => return,
        };
        let action = e.data.get_long(0);
        let prop1 = e.data.get_long(1) as xlib::Atom;
        let prop2 = e.data.get_long(2) as xlib::Atom;
        if prop1 != wm.net_atoms.wm_fullscreen && prop2 != wm.net_atoms.wm_fullscreen {
            return;
        }
        let is_fullscreen = wm.arena.get(id).map(|c| c.is_fullscreen).unwrap_or(false);
        let target = match action {
            0 => false,                 // _NET_WM_STATE_REMOVE
            1 => true,                  // _NET_WM_STATE_ADD
            2 => !is_fullscreen,         // _NET_WM_STATE_TOGGLE
            _ => return,
        };
        wm.set_fullscreen(id, target);
    } else if e.message_type == wm.net_atoms.active_window {
        let id = match wm.arena.find_by_window(e.window) {
            Some(id) => id,
            None => return,
        };
        let mon = wm.arena.get(id).unwrap().monitor;
        let is_selected = wm.monitors.get(mon).and_then(|m| m.selected_client) == Some(id);
        if !is_selected {
            let window = wm.arena.get(id).unwrap().window;
            wm.xconn.set_urgency(window, true);
            focus::set_urgent(wm, id, true);
            bar::draw_bars(wm);
        }
    }
}

/// Translates floating/non-arranging clients and passes everything else
/// through as a synthetic `ConfigureNotify`, or forwards raw requests for
/// still-unmanaged windows (spec.md §4.6 `ConfigureRequest`, grounded in
/// dwm's `configurerequest`).
fn on_configure_request(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.configure_request };
    let id = match wm.arena.find_by_window(e.window) {
        Some(id) => id,
        None => {
            wm.xconn.configure_window(e.window, e.x, e.y, e.width, e.height, e.border_width);
            return;
        }
    };

    if e.value_mask & xlib::CWBorderWidth as u64 != 0 {
        if let Some(c) = wm.arena.get_mut(id) {
            c.border_width = e.border_width;
        }
        return;
    }

    let mon = wm.arena.get(id).unwrap().monitor;
    let (is_floating, arranges) = {
        let c = wm.arena.get(id).unwrap();
        let arranges = wm.monitors.get(mon).map(|m| m.current_layout().arranges()).unwrap_or(false);
        (c.is_floating, arranges)
    };

    if !(is_floating || !arranges) {
        let c = wm.arena.get(id).unwrap();
        wm.xconn.send_configure_notify(c.window, Rect::new(c.x, c.y, c.w, c.h), c.border_width);
        return;
    }

    let screen = wm.monitors.get(mon).unwrap().screen_area;
    if let Some(c) = wm.arena.get_mut(id) {
        if e.value_mask & xlib::CWX as u64 != 0 {
            c.oldx = c.x;
            c.x = screen.x + e.x;
        }
        if e.value_mask & xlib::CWY as u64 != 0 {
            c.oldy = c.y;
            c.y = screen.y + e.y;
        }
        if e.value_mask & xlib::CWWidth as u64 != 0 {
            c.oldw = c.w;
            c.w = e.width;
        }
        if e.value_mask & xlib::CWHeight as u64 != 0 {
            c.oldh = c.h;
            c.h = e.height;
        }
        if c.is_floating {
            if c.x + c.width() > screen.x + screen.w {
                c.x = screen.x + (screen.w - c.width()) / 2;
            }
            if c.y + c.height() > screen.y + screen.h {
                c.y = screen.y + (screen.h - c.height()) / 2;
            }
        }
    }

    if e.value_mask & (xlib::CWWidth | xlib::CWHeight) as u64 != 0 {
        wm.resize_client_in_place(id, true);
        return;
    }
    let visible = wm.monitors.get(mon).map(|m| m.is_visible(&wm.arena, id)).unwrap_or(false);
    let c = wm.arena.get(id).unwrap();
    if visible {
        wm.xconn.move_window(c.window, c.x, c.y);
    } else {
        wm.xconn.send_configure_notify(c.window, Rect::new(c.x, c.y, c.w, c.h), c.border_width);
    }
}

/// Root-window geometry changes trigger Xinerama re-discovery, draw-surface
/// and bar resize, and fullscreen-client re-fit (spec.md §4.6
/// `ConfigureNotify`).
fn on_configure_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.configure };
    if e.window != wm.xconn.root {
        return;
    }
    let size_changed = e.width != wm.sw || e.height != wm.sh;
    wm.sw = e.width;
    wm.sh = e.height;
    let geom_dirty = wm.update_geom();
    if !size_changed && !geom_dirty {
        return;
    }
    wm.draw.resize(wm.sw as u32, wm.sh as u32);
    resize_bars(wm);

    let fullscreen: Vec<_> = wm
        .arena
        .iter()
        .filter(|(_, c)| c.is_fullscreen)
        .map(|(id, c)| (id, c.monitor))
        .collect();
    for (id, mon) in fullscreen {
        if let Some(screen) = wm.monitors.get(mon).map(|m| m.screen_area) {
            if let Some(c) = wm.arena.get_mut(id) {
                c.x = screen.x;
                c.y = screen.y;
                c.w = screen.w;
                c.h = screen.h;
            }
            wm.resize_client_in_place(id, true);
        }
    }
    wm.arrange(None);
}

fn resize_bars(wm: &mut Wm) {
    let ids: Vec<MonitorId> = wm.monitors.iter().map(|m| m.id()).collect();
    for id in ids {
        let (bar_window, screen, bar_y) = {
            let m = wm.monitors.get(id).unwrap();
            (m.bar_window, m.screen_area, m.bar_y)
        };
        wm.xconn.move_resize(bar_window, Rect::new(screen.x, bar_y, screen.w, wm.bar_height));
    }
}

fn on_destroy_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.destroy_window };
    if let Some(id) = wm.arena.find_by_window(e.window) {
        wm.unmanage(id, true);
    }
}

/// A synthetic `UnmapNotify` (sent by `xwithdraw`-style tools, not the
/// kernel) only means "go to `WithdrawnState`"; a real one means the client
/// actually unmapped itself (spec.md §4.6 `UnmapNotify`).
fn on_unmap_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.unmap };
    if let Some(id) = wm.arena.find_by_window(e.window) {
        if e.send_event != 0 {
            wm.set_client_state(e.window, 0);
        } else {
            wm.unmanage(id, false);
        }
    }
}

/// Pointer-crossing focus-follows-mouse and monitor switching (spec.md §4.6
/// `EnterNotify`).
fn on_enter_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.crossing };
    if (e.mode != xlib::NotifyNormal || e.detail == xlib::NotifyInferior) && e.window != wm.xconn.root {
        return;
    }
    let id = wm.arena.find_by_window(e.window);
    let mon = id
        .and_then(|i| wm.arena.get(i).map(|c| c.monitor))
        .or_else(|| wm.monitors.at_point(e.x_root, e.y_root));
    let mon = match mon {
        Some(m) => m,
        None => return,
    };
    if wm.monitors.selected_id() != Some(mon) {
        switch_selected_monitor(wm, mon);
    }
    if let Some(cid) = id {
        if wm.monitors.get(mon).and_then(|m| m.selected_client) != Some(cid) {
            focus::focus(wm, Some(cid));
        }
    }
}

fn on_expose(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.expose };
    if e.count != 0 {
        return;
    }
    if let Some(&mon) = wm.bar_windows.get(&e.window) {
        bar::draw_bar(wm, mon);
    }
}

/// Re-asserts focus onto the selected client if something else stole it
/// (spec.md §4.6 `FocusIn`).
fn on_focus_in(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.focus_change };
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    let sel = match wm.monitors.get(mon).and_then(|m| m.selected_client) {
        Some(id) => id,
        None => return,
    };
    let window = match wm.arena.get(sel) {
        Some(c) => c.window,
        None => return,
    };
    if e.window != window {
        wm.xconn.set_input_focus(window);
    }
}

fn on_key_press(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.key };
    let clean = clean_mask(wm, e.state);
    let keysym = unsafe { xlib::XKeycodeToKeysym(wm.xconn.display, e.keycode as u8, 0) };
    let bindings = wm.config.keys.clone();
    for k in &bindings {
        let sym = match keys::string_to_keysym(&k.key) {
            Some(s) => s,
            None => continue,
        };
        if sym != keysym {
            continue;
        }
        if crate::wm::resolve_modifiers(&k.mods) != clean {
            continue;
        }
        if let Ok(action) = commands::resolve(&k.action, &k.arg) {
            (action.func)(wm, &action.arg);
        }
        return;
    }
}

/// Refreshes the keyboard mapping and regrabs keys when it changed (spec.md
/// §4.6 `MappingNotify`).
fn on_mapping_notify(wm: &mut Wm, ev: &XEvent) {
    let mut e = unsafe { ev.mapping };
    unsafe {
        xlib::XRefreshKeyboardMapping(&mut e);
    }
    if e.request == xlib::MappingKeyboard {
        wm.grab_keys();
    }
}

fn on_map_request(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.map_request };
    if wm.arena.find_by_window(e.window).is_some() {
        return;
    }
    if let Some(attrs) = wm.xconn.get_window_attributes(e.window) {
        if attrs.override_redirect == 0 {
            wm.manage(e.window);
        }
    }
}

/// Root-window pointer motion drives the same monitor-crossing switch as
/// `EnterNotify`, since a full-screen client can swallow entry events when
/// the pointer passes over the gap between monitors (spec.md §4.6
/// `MotionNotify`). Drag-local motion is consumed inside `move_mouse`/
/// `resize_mouse`'s own grab loop and never reaches here.
fn on_motion_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.motion };
    if e.window != wm.xconn.root {
        return;
    }
    if let Some(mon) = wm.monitors.at_point(e.x_root, e.y_root) {
        if wm.monitors.selected_id() != Some(mon) {
            switch_selected_monitor(wm, mon);
        }
    }
}

/// Title, size hints, WM hints, window type, transient-for, and the
/// root-window status string all arrive as `PropertyNotify` (spec.md §4.6).
fn on_property_notify(wm: &mut Wm, ev: &XEvent) {
    let e = unsafe { ev.property };
    if e.state == xlib::PropertyDelete {
        return;
    }
    if e.window == wm.xconn.root && e.atom == xlib::XA_WM_NAME {
        wm.update_status();
        bar::draw_bars(wm);
        return;
    }
    let id = match wm.arena.find_by_window(e.window) {
        Some(id) => id,
        None => return,
    };
    if e.atom == xlib::XA_WM_TRANSIENT_FOR {
        let window = wm.arena.get(id).unwrap().window;
        let is_floating = wm.arena.get(id).map(|c| c.is_floating).unwrap_or(true);
        if !is_floating && wm.xconn.get_transient_for(window).is_some() {
            if let Some(c) = wm.arena.get_mut(id) {
                c.is_floating = true;
            }
            let mon = wm.arena.get(id).unwrap().monitor;
            wm.arrange(Some(mon));
        }
    } else if e.atom == xlib::XA_WM_NORMAL_HINTS {
        wm.update_size_hints(id);
    } else if e.atom == xlib::XA_WM_HINTS {
        wm.update_wm_hints(id);
        bar::draw_bars(wm);
    } else if e.atom == wm.net_atoms.wm_window_type {
        wm.update_window_type(id);
    }

    if e.atom == xlib::XA_WM_NAME || e.atom == wm.net_atoms.wm_name {
        wm.update_title(id);
        let mon = wm.arena.get(id).unwrap().monitor;
        bar::draw_bar(wm, mon);
    }
}
