//! The command layer: `Arg` (spec.md §4.7) plus every named action a
//! `KeyBinding`/`ButtonBinding` can resolve to. `resolve` is called once at
//! startup so an unknown action name in the config file is a load-time
//! error rather than a silent no-op at the first keypress.

use crate::client::ClientId;
use crate::config::{ArgSpec, Config};
use crate::error::WmError;
use crate::layout::LayoutKind;
use crate::wm::Wm;

/// Resolved command argument. The `Ptr` variant only ever arises
/// internally (e.g. a layout swap passed straight from a menu handler); it
/// is never produced by [`ArgSpec`] deserialization.
#[derive(Debug, Clone)]
pub enum Arg {
    Int(i32),
    Uint(u32),
    Float(f64),
    Str(String),
    List(Vec<String>),
    None,
}

impl From<&ArgSpec> for Arg {
    fn from(spec: &ArgSpec) -> Self {
        match spec {
            ArgSpec::Int(i) => Arg::Int(*i),
            ArgSpec::Float(f) => Arg::Float(*f),
            ArgSpec::Str(s) => Arg::Str(s.clone()),
            ArgSpec::List(l) => Arg::List(l.clone()),
            ArgSpec::None => Arg::None,
        }
    }
}

pub type CommandFn = fn(&mut Wm, &Arg);

/// A binding, resolved once at load time: the function pointer to call and
/// the argument to call it with. Key/button bindings carry their own
/// modifiers and key/button code separately (`config.rs`); this only
/// covers the `action`/`arg` pair.
#[derive(Clone)]
pub struct ResolvedAction {
    pub func: CommandFn,
    pub arg: Arg,
}

/// Looks up `name` in the compiled-in registry. Returns
/// [`WmError::Config`] for an unknown action, so a typo in `config.toml`
/// is caught at startup rather than silently swallowed on the first
/// matching keypress.
pub fn resolve(name: &str, arg_spec: &ArgSpec) -> Result<ResolvedAction, WmError> {
    let func: CommandFn = match name {
        "view" => view,
        "toggle_view" => toggle_view,
        "tag" => tag,
        "toggle_tag" => toggle_tag,
        "focus_stack" => focus_stack,
        "focus_mon" => focus_mon,
        "tag_mon" => tag_mon,
        "zoom" => zoom,
        "set_mfact" => set_mfact,
        "change_masters_count" => change_masters_count,
        "set_layout" => set_layout,
        "toggle_floating" => toggle_floating,
        "toggle_fullscreen" => toggle_fullscreen,
        "toggle_bar" => toggle_bar,
        "set_gaps" => set_gaps,
        "kill_selected" => kill_selected,
        "move_mouse" => move_mouse,
        "resize_mouse" => resize_mouse,
        "spawn" => spawn,
        "quit" => quit,
        other => return Err(WmError::Config(format!("unknown action \"{}\"", other))),
    };
    Ok(ResolvedAction {
        func,
        arg: Arg::from(arg_spec),
    })
}

/// Validates every `keys`/`buttons` action name in `config` up front.
/// Called once from `main` right after [`Config::load`].
pub fn validate_all(config: &Config) -> Result<(), WmError> {
    for k in &config.keys {
        resolve(&k.action, &k.arg)?;
    }
    for b in &config.buttons {
        resolve(&b.action, &b.arg)?;
    }
    Ok(())
}

fn arg_as_uint(arg: &Arg) -> Option<u32> {
    match arg {
        Arg::Uint(u) => Some(*u),
        Arg::Int(i) if *i >= 0 => Some(*i as u32),
        _ => None,
    }
}

fn arg_as_int(arg: &Arg) -> Option<i32> {
    match arg {
        Arg::Int(i) => Some(*i),
        Arg::Uint(u) => Some(*u as i32),
        _ => None,
    }
}

fn arg_as_float(arg: &Arg) -> Option<f64> {
    match arg {
        Arg::Float(f) => Some(*f),
        _ => None,
    }
}

/// `view(tagmask)`: switch the selected monitor's visible tag-set,
/// preserving the previous one in the other tagset slot (spec.md §4.7).
pub fn view(wm: &mut Wm, arg: &Arg) {
    let tags = match arg_as_uint(arg) {
        Some(t) => t & wm.tag_mask,
        None => return,
    };
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(m) = wm.monitors.get_mut(mon) {
        if tags == m.current_tags() {
            return;
        }
        m.selected_tags_set ^= 1;
        if tags != 0 {
            m.tagset[m.selected_tags_set] = tags;
        }
    }
    crate::focus::focus(wm, None);
    wm.arrange(Some(mon));
}

pub fn toggle_view(wm: &mut Wm, arg: &Arg) {
    let tags = match arg_as_uint(arg) {
        Some(t) => t & wm.tag_mask,
        None => return,
    };
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    let new_tags = {
        let m = match wm.monitors.get(mon) {
            Some(m) => m,
            None => return,
        };
        m.current_tags() ^ tags
    };
    if new_tags == 0 {
        return;
    }
    if let Some(m) = wm.monitors.get_mut(mon) {
        m.tagset[m.selected_tags_set] = new_tags;
    }
    crate::focus::focus(wm, None);
    wm.arrange(Some(mon));
}

/// `tag(tagmask)`: move the selected client to `tagmask` (spec.md §4.7).
pub fn tag(wm: &mut Wm, arg: &Arg) {
    let tags = match arg_as_uint(arg) {
        Some(t) => t & wm.tag_mask,
        None => return,
    };
    if tags == 0 {
        return;
    }
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    if let Some(c) = wm.arena.get_mut(id) {
        c.tags = tags;
    }
    crate::focus::focus(wm, None);
    let mon = wm.arena.get(id).unwrap().monitor;
    wm.arrange(Some(mon));
}

pub fn toggle_tag(wm: &mut Wm, arg: &Arg) {
    let tags = match arg_as_uint(arg) {
        Some(t) => t,
        None => return,
    };
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let new_tags = wm.arena.get(id).map(|c| c.tags ^ (tags & wm.tag_mask)).unwrap_or(0);
    if new_tags == 0 {
        return;
    }
    if let Some(c) = wm.arena.get_mut(id) {
        c.tags = new_tags;
    }
    crate::focus::focus(wm, None);
    let mon = wm.arena.get(id).unwrap().monitor;
    wm.arrange(Some(mon));
}

/// `focus_stack(+1 | -1)`: move selection forward/backward through the
/// monitor's insertion list, visiting only visible clients.
pub fn focus_stack(wm: &mut Wm, arg: &Arg) {
    let dir = arg_as_int(arg).unwrap_or(1);
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    let m = match wm.monitors.get(mon) {
        Some(m) => m,
        None => return,
    };
    if m.clients.is_empty() {
        return;
    }
    let current = m.selected_client;
    let visible: Vec<ClientId> = m
        .clients
        .iter()
        .copied()
        .filter(|&id| m.is_visible(&wm.arena, id))
        .collect();
    if visible.is_empty() {
        return;
    }
    let next = match current.and_then(|c| visible.iter().position(|&x| x == c)) {
        Some(pos) => {
            let len = visible.len() as i64;
            let idx = ((pos as i64 + dir as i64).rem_euclid(len)) as usize;
            visible[idx]
        }
        None => visible[0],
    };
    crate::focus::focus(wm, Some(next));
    crate::focus::restack(wm, mon);
}

/// `focus_mon(+1 | -1)`: move input focus to the neighboring monitor,
/// without changing which client is selected there.
pub fn focus_mon(wm: &mut Wm, arg: &Arg) {
    let dir = arg_as_int(arg).unwrap_or(1);
    let cur = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(next) = wm.monitors.neighbor(cur, dir) {
        if next == cur {
            return;
        }
        let prev_selected = wm.monitors.get(cur).and_then(|m| m.selected_client);
        if let Some(id) = prev_selected {
            crate::focus::unfocus(wm, id, true);
        }
        if let Some(idx) = wm.monitors.index_of(next) {
            wm.monitors.selected = idx;
        }
        crate::focus::focus(wm, None);
    }
}

/// `tag_mon(+1 | -1)`: move the selected client to the neighboring
/// monitor, keeping its current tags.
pub fn tag_mon(wm: &mut Wm, arg: &Arg) {
    let dir = arg_as_int(arg).unwrap_or(1);
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let cur_mon = wm.arena.get(id).unwrap().monitor;
    let target = match wm.monitors.neighbor(cur_mon, dir) {
        Some(m) if m != cur_mon => m,
        _ => return,
    };
    if let Some(m) = wm.monitors.get_mut(cur_mon) {
        m.detach(id);
        m.detach_stack(id);
    }
    if let Some(c) = wm.arena.get_mut(id) {
        c.monitor = target;
    }
    if let Some(m) = wm.monitors.get_mut(target) {
        m.attach(id);
        m.attach_stack(id);
    }
    crate::focus::focus(wm, None);
    wm.arrange(None);
}

/// `zoom()`: promote the selected client to the head of the master
/// column, or demote it if it's already there.
pub fn zoom(wm: &mut Wm, _arg: &Arg) {
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let is_floating = wm.arena.get(id).map(|c| c.is_floating).unwrap_or(true);
    let arranges = wm.monitors.get(mon).map(|m| m.current_layout().arranges()).unwrap_or(false);
    if is_floating || !arranges {
        return;
    }
    let head = wm.monitors.get(mon).and_then(|m| m.next_tiled(&wm.arena, None));
    if head == Some(id) {
        if let Some(second) = wm.monitors.get(mon).and_then(|m| m.next_tiled(&wm.arena, Some(id))) {
            if let Some(m) = wm.monitors.get_mut(mon) {
                m.pop_to_master(second);
            }
        } else {
            return;
        }
    } else if let Some(m) = wm.monitors.get_mut(mon) {
        m.pop_to_master(id);
    }
    crate::focus::focus(wm, Some(id));
    wm.arrange(Some(mon));
}

/// `set_mfact(delta)`: adjust the master-area fraction, clamped to
/// `[0.05, 0.95]` (spec.md §4.7).
pub fn set_mfact(wm: &mut Wm, arg: &Arg) {
    let delta = match arg_as_float(arg) {
        Some(d) => d,
        None => return,
    };
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(m) = wm.monitors.get_mut(mon) {
        let base = if delta.abs() < 1.0 { m.mfact } else { 0.0 };
        let new = base + delta;
        m.mfact = new.max(0.05).min(0.95);
    }
    wm.arrange(Some(mon));
}

/// `change_masters_count(delta)`.
pub fn change_masters_count(wm: &mut Wm, arg: &Arg) {
    let delta = arg_as_int(arg).unwrap_or(0);
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(m) = wm.monitors.get_mut(mon) {
        m.masters_count = (m.masters_count + delta).max(0);
    }
    wm.arrange(Some(mon));
}

/// `set_layout(name)`: switches the selected monitor's current-tag
/// layout. Falls back silently if `name` doesn't match a configured
/// layout.
pub fn set_layout(wm: &mut Wm, arg: &Arg) {
    let kind = match arg {
        Arg::Str(s) => match s.as_str() {
            "tile" => Some(LayoutKind::Tile),
            "monocle" => Some(LayoutKind::Monocle),
            "floating" => Some(LayoutKind::Floating),
            _ => return,
        },
        Arg::None => None,
        _ => return,
    };
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(m) = wm.monitors.get_mut(mon) {
        m.set_current_layout(kind);
    }
    wm.arrange(Some(mon));
}

pub fn toggle_floating(wm: &mut Wm, _arg: &Arg) {
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let is_fullscreen = wm.arena.get(id).map(|c| c.is_fullscreen).unwrap_or(false);
    if is_fullscreen {
        return;
    }
    let mon = wm.arena.get(id).unwrap().monitor;
    if let Some(c) = wm.arena.get_mut(id) {
        c.is_floating = !c.is_floating;
        if c.is_floating {
            c.w = c.w.max(1);
            c.h = c.h.max(1);
        }
    }
    wm.arrange(Some(mon));
}

pub fn toggle_fullscreen(wm: &mut Wm, _arg: &Arg) {
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let is_fullscreen = wm.arena.get(id).map(|c| c.is_fullscreen).unwrap_or(false);
    wm.set_fullscreen(id, !is_fullscreen);
}

pub fn toggle_bar(wm: &mut Wm, _arg: &Arg) {
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    let (show, bar_window, screen, bar_y) = {
        let m = wm.monitors.get_mut(mon).unwrap();
        m.show_bar = !m.show_bar;
        m.recompute_work_area(wm.bar_height);
        (m.show_bar, m.bar_window, m.screen_area, m.bar_y)
    };
    if show {
        wm.xconn.move_resize(bar_window, crate::geometry::Rect::new(screen.x, bar_y, screen.w, wm.bar_height));
        wm.xconn.map(bar_window);
    } else {
        wm.xconn.unmap(bar_window);
    }
    wm.arrange(Some(mon));
}

pub fn set_gaps(wm: &mut Wm, arg: &Arg) {
    let delta = arg_as_int(arg).unwrap_or(0);
    let mon = match wm.monitors.selected_id() {
        Some(m) => m,
        None => return,
    };
    if let Some(m) = wm.monitors.get_mut(mon) {
        m.gap_px = (m.gap_px + delta).max(0);
    }
    wm.arrange(Some(mon));
}

/// `kill_selected()`: asks the client to self-terminate via
/// `WM_DELETE_WINDOW` if it supports that protocol, else forcibly kills
/// the X client connection (spec.md §4.7, §7.3's server-grab discipline).
pub fn kill_selected(wm: &mut Wm, _arg: &Arg) {
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let window = wm.arena.get(id).unwrap().window;
    if !crate::focus::send_delete(wm, window) {
        let _guard = crate::error::ErrorGuard::acquire();
        unsafe {
            x11::xlib::XGrabServer(wm.xconn.display);
        }
        wm.xconn.kill_client(window);
        wm.xconn.sync();
        unsafe {
            x11::xlib::XUngrabServer(wm.xconn.display);
        }
    }
}

/// `spawn(argv)`: forks, execs `argv[0]` with the configured arguments,
/// substituting the selected monitor's digit into `dmenucmd`'s `-m` slot
/// as dwm's `spawn()` does for `dmenucmd` specifically (spec.md §B
/// "scratch/menu digit substitution").
pub fn spawn(wm: &mut Wm, arg: &Arg) {
    let argv: Vec<String> = match arg {
        Arg::List(v) if !v.is_empty() => v.clone(),
        Arg::Str(s) if s == "dmenucmd" => {
            let mut v = wm.config.dmenucmd.clone();
            if let Some(slot) = wm.config.dmenu_monitor_slot() {
                let mon_num = wm.monitors.selected_id().and_then(|m| wm.monitors.get(m)).map(|m| m.num).unwrap_or(0);
                if slot < v.len() {
                    v[slot] = mon_num.to_string();
                }
            }
            v
        }
        _ => return,
    };
    crate::os::spawn(&argv);
}

/// Throttle for `move_mouse`/`resize_mouse` motion handling: dwm throttles
/// to the monitor refresh rate (`1000 / 60`); we throttle a bit tighter
/// since we also re-apply size hints on every accepted sample (spec.md §4.7
/// "~150Hz").
const DRAG_THROTTLE_MS: u64 = 1000 / 150;

/// `move_mouse()`: modal pointer grab that drags the selected client,
/// snapping to the origin monitor's work-area edges within
/// `config.snap` pixels, promoting a tiled client to floating the moment
/// the drag crosses the snap threshold, and re-homing the client to
/// whichever monitor contains its center once the button is released
/// (spec.md §4.7, grounded in dwm's `movemouse`).
pub fn move_mouse(wm: &mut Wm, _arg: &Arg) {
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let is_fullscreen = wm.arena.get(id).map(|c| c.is_fullscreen).unwrap_or(true);
    if is_fullscreen {
        return;
    }
    let origin_mon = wm.arena.get(id).unwrap().monitor;
    crate::focus::restack(wm, origin_mon);

    let (orig_x, orig_y) = {
        let c = wm.arena.get(id).unwrap();
        (c.x, c.y)
    };

    if !wm.xconn.grab_pointer_for_drag(wm.cursors.r#move) {
        return;
    }
    let (start_px, start_py, _) = wm.xconn.query_pointer_root();
    let mut last_time: u64 = 0;

    loop {
        let ev = wm.xconn.mask_event(drag_event_mask());
        match ev.get_type() {
            x11::xlib::MotionNotify => {
                let motion = unsafe { ev.motion };
                let t = motion.time as u64;
                if t.wrapping_sub(last_time) <= DRAG_THROTTLE_MS {
                    continue;
                }
                last_time = t;
                let mut nx = orig_x + (motion.x_root - start_px);
                let mut ny = orig_y + (motion.y_root - start_py);
                snap_to_work_area_edges(wm, id, origin_mon, &mut nx, &mut ny);

                let (is_floating, arranges) = client_floating_and_arranges(wm, id);
                if !is_floating && arranges {
                    let (cx, cy) = {
                        let c = wm.arena.get(id).unwrap();
                        (c.x, c.y)
                    };
                    if (nx - cx).abs() > wm.config.snap || (ny - cy).abs() > wm.config.snap {
                        if let Some(c) = wm.arena.get_mut(id) {
                            c.is_floating = true;
                        }
                    } else {
                        continue;
                    }
                }
                if let Some(c) = wm.arena.get_mut(id) {
                    c.x = nx;
                    c.y = ny;
                }
                wm.resize_client_in_place(id, true);
            }
            x11::xlib::ButtonRelease => break,
            _ => crate::events::handle(wm, &ev),
        }
    }
    wm.xconn.ungrab_pointer();
    rehome_after_drag(wm, id, origin_mon);
}

/// `resize_mouse()`: modal pointer grab that drags the selected client's
/// bottom-right corner to the pointer, warping the pointer there first so
/// the cursor tracks the corner from the start (spec.md §4.7, grounded in
/// dwm's `resizemouse`).
pub fn resize_mouse(wm: &mut Wm, _arg: &Arg) {
    let id = match selected_client(wm) {
        Some(id) => id,
        None => return,
    };
    let is_fullscreen = wm.arena.get(id).map(|c| c.is_fullscreen).unwrap_or(true);
    if is_fullscreen {
        return;
    }
    let origin_mon = wm.arena.get(id).unwrap().monitor;
    crate::focus::restack(wm, origin_mon);

    let (orig_x, orig_y, window, border_width) = {
        let c = wm.arena.get(id).unwrap();
        (c.x, c.y, c.window, c.border_width)
    };

    if !wm.xconn.grab_pointer_for_drag(wm.cursors.resize) {
        return;
    }
    let (corner_x, corner_y) = {
        let c = wm.arena.get(id).unwrap();
        (c.x + c.w + border_width - 1, c.y + c.h + border_width - 1)
    };
    wm.xconn.warp_pointer(window, corner_x, corner_y);
    let mut last_time: u64 = 0;

    loop {
        let ev = wm.xconn.mask_event(drag_event_mask());
        match ev.get_type() {
            x11::xlib::MotionNotify => {
                let motion = unsafe { ev.motion };
                let t = motion.time as u64;
                if t.wrapping_sub(last_time) <= DRAG_THROTTLE_MS {
                    continue;
                }
                last_time = t;
                let nw = (motion.x_root - orig_x - 2 * border_width + 1).max(1);
                let nh = (motion.y_root - orig_y - 2 * border_width + 1).max(1);

                let (is_floating, arranges) = client_floating_and_arranges(wm, id);
                if !is_floating && arranges {
                    continue;
                }
                if let Some(c) = wm.arena.get_mut(id) {
                    c.w = nw;
                    c.h = nh;
                }
                wm.resize_client_in_place(id, true);
            }
            x11::xlib::ButtonRelease => break,
            _ => crate::events::handle(wm, &ev),
        }
    }
    wm.xconn.ungrab_pointer();
    rehome_after_drag(wm, id, origin_mon);
}

fn drag_event_mask() -> std::os::raw::c_long {
    (x11::xlib::ButtonPressMask
        | x11::xlib::ButtonReleaseMask
        | x11::xlib::PointerMotionMask
        | x11::xlib::ExposureMask
        | x11::xlib::SubstructureRedirectMask) as std::os::raw::c_long
}

fn client_floating_and_arranges(wm: &Wm, id: ClientId) -> (bool, bool) {
    let c = match wm.arena.get(id) {
        Some(c) => c,
        None => return (false, false),
    };
    let arranges = wm
        .monitors
        .get(c.monitor)
        .map(|m| m.current_layout().arranges())
        .unwrap_or(false);
    (c.is_floating, arranges)
}

/// Snaps `nx`/`ny` to `origin_mon`'s work-area edges when within
/// `config.snap` pixels, evaluated against the monitor the drag started
/// on (not whichever monitor the pointer is currently over).
fn snap_to_work_area_edges(wm: &Wm, id: ClientId, origin_mon: crate::monitor::MonitorId, nx: &mut i32, ny: &mut i32) {
    let work = match wm.monitors.get(origin_mon) {
        Some(m) => m.work_area,
        None => return,
    };
    let (w, h, bw) = match wm.arena.get(id) {
        Some(c) => (c.w, c.h, c.border_width),
        None => return,
    };
    let width = w + 2 * bw;
    let height = h + 2 * bw;
    let snap = wm.config.snap;
    if (work.x - *nx).abs() < snap {
        *nx = work.x;
    } else if ((work.x + work.w) - (*nx + width)).abs() < snap {
        *nx = work.x + work.w - width;
    }
    if (work.y - *ny).abs() < snap {
        *ny = work.y;
    } else if ((work.y + work.h) - (*ny + height)).abs() < snap {
        *ny = work.y + work.h - height;
    }
}

/// After a drag ends, re-homes the client to whichever monitor contains
/// the greatest share of its final rectangle, migrating it between
/// monitors' insertion/focus lists if it crossed one (spec.md §4.7).
fn rehome_after_drag(wm: &mut Wm, id: ClientId, origin_mon: crate::monitor::MonitorId) {
    let rect = match wm.arena.get(id) {
        Some(c) => crate::geometry::Rect::new(c.x, c.y, c.w + 2 * c.border_width, c.h + 2 * c.border_width),
        None => return,
    };
    let target = wm.monitors.containing(rect).unwrap_or(origin_mon);
    if target != origin_mon {
        if let Some(m) = wm.monitors.get_mut(origin_mon) {
            m.detach(id);
            m.detach_stack(id);
        }
        if let Some(c) = wm.arena.get_mut(id) {
            c.monitor = target;
        }
        if let Some(m) = wm.monitors.get_mut(target) {
            m.attach(id);
            m.attach_stack(id);
            m.selected_client = Some(id);
        }
        wm.monitors.selected = wm.monitors.index_of(target).unwrap_or(wm.monitors.selected);
        crate::focus::focus(wm, Some(id));
        wm.arrange(None);
    } else {
        wm.arrange(Some(origin_mon));
    }
}

pub fn quit(wm: &mut Wm, _arg: &Arg) {
    wm.running = false;
}

fn selected_client(wm: &Wm) -> Option<ClientId> {
    wm.monitors.selected_id().and_then(|m| wm.monitors.get(m)).and_then(|m| m.selected_client)
}
