//! The global `Wm` context (Design Note 4): atoms, cursors, color schemes,
//! the monitor set, and the `running` flag threaded through every handler,
//! replacing the module-level `static mut` globals the teacher/original
//! carry. Also home to the lifecycle operations spanning multiple
//! components: `scan`, `update_geom`, `manage`/`unmanage`, and `arrange`
//! (spec.md §3.3, §4.3, §4.4, §4.6).

use std::collections::HashMap;
use std::os::raw::c_uint;

use x11::xlib::{self, Window, XSetWindowAttributes};

use crate::atoms::{NetAtoms, WmAtoms};
use crate::client::{Client, ClientArena, ClientId};
use crate::config::Config;
use crate::draw::{Cur, DrawContext};
use crate::error::{x_error_handler, x_error_start, WmError, ErrorGuard, WM_DETECTED};
use crate::geometry::Rect;
use crate::layout::{self, LayoutKind, Placement};
use crate::monitor::{tag_mask, Monitor, MonitorId, MonitorSet};
use crate::xconn::{keys, XConn};

pub const SCHEME_NORMAL: usize = 0;
pub const SCHEME_SELECTED: usize = 1;

pub struct Cursors {
    pub normal: Cur,
    pub resize: Cur,
    pub r#move: Cur,
}

/// Per-client button grab shape (X11 cursor font constants, defined in
/// `<X11/cursorfont.h>`; the `x11` crate exposes them as plain `c_uint`s).
const XC_LEFT_PTR: c_uint = 68;
const XC_SIZING: c_uint = 120;
const XC_FLEUR: c_uint = 52;

pub struct Wm {
    pub xconn: XConn,
    pub config: Config,
    pub arena: ClientArena,
    pub monitors: MonitorSet,
    pub wm_atoms: WmAtoms,
    pub net_atoms: NetAtoms,
    pub draw: DrawContext,
    pub cursors: Cursors,
    pub numlock_mask: u32,
    pub running: bool,
    pub wmcheckwin: Window,
    pub bar_height: i32,
    pub tag_mask: u32,
    pub sw: i32,
    pub sh: i32,
    /// window id -> monitor bar belongs to, for Expose/ButtonPress routing.
    pub bar_windows: HashMap<Window, MonitorId>,
    /// Status-line text read from the root window's `WM_NAME` (the
    /// `xsetroot` convention), shown right-aligned on the selected
    /// monitor's bar (spec.md §4.8).
    pub status_text: String,
}

impl Wm {
    pub fn new(config: Config) -> Result<Self, WmError> {
        let xconn = XConn::open(None).ok_or(WmError::NoDisplay)?;

        check_other_wm(&xconn);

        let wm_atoms = WmAtoms::intern(xconn.display);
        let net_atoms = NetAtoms::intern(xconn.display);

        let sw = xconn.display_width();
        let sh = xconn.display_height();

        let mut draw = DrawContext::create(xconn.display, xconn.screen, xconn.root, sw as u32, sh as u32)?;
        draw.font_set_create(&config.fonts)?;
        let bar_height = draw.font_height() + 2;

        let scheme0 = draw.color_scheme_create(
            &config.colors[0].border,
            &config.colors[0].foreground,
            &config.colors[0].background,
        )?;
        let scheme1 = draw.color_scheme_create(
            &config.colors[1].border,
            &config.colors[1].foreground,
            &config.colors[1].background,
        )?;
        debug_assert_eq!(scheme0, SCHEME_NORMAL);
        debug_assert_eq!(scheme1, SCHEME_SELECTED);

        let cursors = Cursors {
            normal: draw.cursor_create(XC_LEFT_PTR),
            resize: draw.cursor_create(XC_SIZING),
            r#move: draw.cursor_create(XC_FLEUR),
        };

        let numlock_mask = keys::discover_numlock_mask(xconn.display);

        let wmcheckwin = create_supporting_wm_check_window(&xconn, &net_atoms, &wm_atoms);

        let tag_mask_value = tag_mask(&config);

        let mut wm = Wm {
            xconn,
            config,
            arena: ClientArena::new(),
            monitors: MonitorSet::new(),
            wm_atoms,
            net_atoms,
            draw,
            cursors,
            numlock_mask,
            running: true,
            wmcheckwin,
            bar_height,
            tag_mask: tag_mask_value,
            sw,
            sh,
            bar_windows: HashMap::new(),
            status_text: String::new(),
        };

        wm.update_geom();
        wm.create_bars();
        wm.update_net_supported();
        wm.xconn.select_root_input();
        unsafe {
            xlib::XSetErrorHandler(Some(x_error_handler));
        }
        wm.xconn.sync();
        wm.status_text = wm.xconn.root_status_text();

        Ok(wm)
    }

    fn create_bars(&mut self) {
        let ids: Vec<MonitorId> = self.monitors.iter().map(|m| m.id()).collect();
        for id in ids {
            let (screen, y, show) = {
                let m = self.monitors.get(id).unwrap();
                (m.screen_area, m.bar_y, m.show_bar)
            };
            let win = unsafe {
                let mut attrs: XSetWindowAttributes = std::mem::zeroed();
                attrs.override_redirect = 1;
                attrs.background_pixmap = xlib::ParentRelative as u64;
                attrs.event_mask = xlib::ButtonPressMask | xlib::ExposureMask;
                xlib::XCreateWindow(
                    self.xconn.display,
                    self.xconn.root,
                    screen.x,
                    y,
                    screen.w as u32,
                    self.bar_height as u32,
                    0,
                    xlib::CopyFromParent as i32,
                    xlib::CopyFromParent as u32,
                    xlib::CopyFromParent as *mut xlib::Visual,
                    (xlib::CWOverrideRedirect | xlib::CWBackPixmap | xlib::CWEventMask) as u64,
                    &mut attrs,
                )
            };
            if let Some(m) = self.monitors.get_mut(id) {
                m.bar_window = win;
            }
            self.bar_windows.insert(win, id);
            if show {
                self.xconn.map(win);
            }
        }
    }

    fn update_net_supported(&self) {
        let list = self.net_atoms.supported_list();
        unsafe {
            xlib::XChangeProperty(
                self.xconn.display,
                self.xconn.root,
                self.net_atoms.supported,
                xlib::XA_ATOM,
                32,
                xlib::PropModeReplace,
                list.as_ptr() as *const u8,
                list.len() as i32,
            );
        }
    }

    /// Xinerama (re)discovery and reconciliation (spec.md §4.3).
    ///
    /// Returns whether any monitor geometry actually changed. Per REDESIGN
    /// FLAGS / Design Notes, this computes `dirty` by comparing the *old*
    /// rectangle before overwriting it (fixing the latent always-false bug
    /// noted for `configurenotify` in the original — see DESIGN.md).
    pub fn update_geom(&mut self) -> bool {
        let mut dirty = false;
        let reported = self.discover_screens();

        if reported.len() > self.monitors.len() {
            let existing = self.monitors.len();
            for (i, rect) in reported.iter().enumerate() {
                if i < existing {
                    let id = self.monitors.iter().nth(i).unwrap().id();
                    let m = self.monitors.get_mut(id).unwrap();
                    if m.screen_area != *rect {
                        m.screen_area = *rect;
                        m.recompute_work_area(self.bar_height);
                        dirty = true;
                    }
                } else {
                    let new_id = self.monitors.push(i as i32, *rect, &self.config);
                    if let Some(m) = self.monitors.get_mut(new_id) {
                        m.recompute_work_area(self.bar_height);
                    }
                    dirty = true;
                }
            }
        } else if reported.len() < self.monitors.len() {
            while self.monitors.len() > reported.len().max(1) {
                if let Some(mon) = self.monitors.remove_last() {
                    if let Some(head) = self.monitors.head_id() {
                        self.migrate_clients(&mon, head);
                    }
                }
            }
            for (i, rect) in reported.iter().enumerate() {
                if let Some(id) = self.monitors.iter().nth(i).map(|m| m.id()) {
                    let m = self.monitors.get_mut(id).unwrap();
                    if m.screen_area != *rect {
                        m.screen_area = *rect;
                        m.recompute_work_area(self.bar_height);
                        dirty = true;
                    }
                }
            }
        } else {
            for (i, rect) in reported.iter().enumerate() {
                if let Some(id) = self.monitors.iter().nth(i).map(|m| m.id()) {
                    let m = self.monitors.get_mut(id).unwrap();
                    if m.screen_area != *rect {
                        m.screen_area = *rect;
                        m.recompute_work_area(self.bar_height);
                        dirty = true;
                    }
                }
            }
        }

        if self.monitors.selected_id().is_none() {
            self.monitors.selected = 0;
        }
        dirty
    }

    fn discover_screens(&self) -> Vec<Rect> {
        if self.xconn.xinerama_active() {
            let screens = self.xconn.xinerama_query_screens();
            dedup_unique_geometry(screens)
        } else {
            vec![Rect::new(0, 0, self.xconn.display_width(), self.xconn.display_height())]
        }
    }

    /// Migrate every client on `from` to `to`, preserving stack order
    /// (Design Notes: "always migrates their clients to the head monitor" —
    /// preserved deliberately, see DESIGN.md).
    fn migrate_clients(&mut self, from: &Monitor, to: MonitorId) {
        let stack_order = from.stack.clone();
        for &id in &from.clients {
            if let Some(c) = self.arena.get_mut(id) {
                c.monitor = to;
            }
        }
        if let Some(dest) = self.monitors.get_mut(to) {
            for &id in from.clients.iter().rev() {
                dest.attach(id);
            }
            for &id in stack_order.iter().rev() {
                dest.attach_stack(id);
            }
        }
    }

    /// Query existing top-level windows at startup and manage the viewable,
    /// non-override-redirect ones (spec.md §3.3 "Lifecycles").
    pub fn scan(&mut self) {
        let children = self.xconn.query_tree(self.xconn.root);
        let mut transients = Vec::new();
        for &w in &children {
            if let Some(attrs) = self.xconn.get_window_attributes(w) {
                if attrs.override_redirect != 0 {
                    continue;
                }
                if let Some(trans) = self.xconn.get_transient_for(w) {
                    transients.push((w, trans));
                    continue;
                }
                if attrs.map_state == xlib::IsViewable {
                    self.manage(w);
                }
            }
        }
        for (w, _) in transients {
            if let Some(attrs) = self.xconn.get_window_attributes(w) {
                if attrs.map_state == xlib::IsViewable {
                    self.manage(w);
                }
            }
        }
    }

    /// `manage(w, attrs)` (spec.md §4.6).
    pub fn manage(&mut self, w: Window) {
        log::debug!("manage: window={:#x}", w);
        if self.arena.find_by_window(w).is_some() {
            return;
        }
        let attrs = match self.xconn.get_window_attributes(w) {
            Some(a) => a,
            None => return,
        };

        let selmon = self.monitors.selected_id().unwrap_or_else(|| self.monitors.head_id().unwrap());
        let mut client = Client::new(w, selmon, attrs.x, attrs.y, attrs.width, attrs.height, self.config.borderpx);
        client.set_name(&self.xconn.fetch_name_utf8(w, self.net_atoms.wm_name));

        let id = self.arena.insert(client);

        let transient_monitor = self.xconn.get_transient_for(w).and_then(|t| self.arena.find_by_window(t));
        if let Some(parent_id) = transient_monitor {
            if let Some(parent) = self.arena.get(parent_id) {
                let (mon, tags) = (parent.monitor, parent.tags);
                if let Some(c) = self.arena.get_mut(id) {
                    c.monitor = mon;
                    c.tags = tags;
                }
            }
        } else {
            self.apply_rules(id);
        }

        // Clamp position into the assigned monitor.
        let mon_work = {
            let mon_id = self.arena.get(id).unwrap().monitor;
            self.monitors.get(mon_id).unwrap().work_area
        };
        if let Some(c) = self.arena.get_mut(id) {
            if c.x + c.w > mon_work.x + mon_work.w && c.w <= mon_work.w {
                c.x = mon_work.x + mon_work.w - c.w;
            }
            if c.y + c.h > mon_work.y + mon_work.h && c.h <= mon_work.h {
                c.y = mon_work.y + mon_work.h - c.h;
            }
            c.x = c.x.max(mon_work.x);
            c.y = c.y.max(mon_work.y);
        }

        self.xconn.set_border_width(w, self.config.borderpx);
        self.xconn.set_border_color(w, self.scheme_pixel(SCHEME_NORMAL, true));
        {
            let c = self.arena.get(id).unwrap();
            self.xconn.send_configure_notify(w, Rect::new(c.x, c.y, c.w, c.h), c.border_width);
        }

        self.update_window_type(id);
        self.update_size_hints(id);
        self.update_wm_hints(id);

        // Center within the monitor if this placement would overflow the
        // work area (spec.md §4.6 manage() step 7), same recentering shape
        // ConfigureRequest uses for floating/no-arrange clients.
        {
            let mon_id = self.arena.get(id).unwrap().monitor;
            let work = self.monitors.get(mon_id).unwrap().work_area;
            if let Some(c) = self.arena.get_mut(id) {
                if c.x + c.width() > work.x + work.w {
                    c.x = work.x + (work.w - c.width()) / 2;
                }
                if c.y + c.height() > work.y + work.h {
                    c.y = work.y + (work.h - c.height()) / 2;
                }
            }
        }

        self.xconn.select_client_input(w);
        self.grab_buttons(id, false);

        let is_fixed = self.arena.get(id).unwrap().is_fixed;
        let has_transient = transient_monitor.is_some();
        if is_fixed || has_transient {
            if let Some(c) = self.arena.get_mut(id) {
                c.is_floating = true;
            }
        }
        let is_floating = self.arena.get(id).unwrap().is_floating;
        if is_floating {
            self.xconn.raise(w);
        }

        {
            let mon_id = self.arena.get(id).unwrap().monitor;
            let mon = self.monitors.get_mut(mon_id).unwrap();
            mon.attach(id);
            mon.attach_stack(id);
        }

        self.update_client_list();
        {
            let c = self.arena.get(id).unwrap();
            let (x, y, w2, h2) = (c.x, c.y, c.w, c.h);
            self.xconn.move_resize(w, Rect::new(x, y, w2, h2));
        }
        self.set_client_state(w, 1);

        let mon_of_new = self.arena.get(id).unwrap().monitor;
        if mon_of_new == self.monitors.selected_id().unwrap_or(mon_of_new) {
            self.unfocus_selected(mon_of_new);
        }
        if let Some(m) = self.monitors.get_mut(mon_of_new) {
            m.selected_client = Some(id);
        }
        self.arrange(Some(mon_of_new));
        self.xconn.map(w);
        crate::focus::focus(self, None);
    }

    /// `unmanage(c, destroyed)` (spec.md §4.6).
    pub fn unmanage(&mut self, id: ClientId, destroyed: bool) {
        let (mon_id, window, old_bw) = match self.arena.get(id) {
            Some(c) => (c.monitor, c.window, c.old_border_width),
            None => return,
        };
        log::debug!("unmanage: window={:#x} destroyed={}", window, destroyed);

        if let Some(m) = self.monitors.get_mut(mon_id) {
            m.detach(id);
            m.detach_stack(id);
        }

        if !destroyed {
            let _guard = ErrorGuard::acquire();
            unsafe {
                xlib::XGrabServer(self.xconn.display);
            }
            self.xconn.set_border_width(window, old_bw);
            self.ungrab_buttons(window);
            self.set_client_state(window, 0);
            self.xconn.sync();
            unsafe {
                xlib::XUngrabServer(self.xconn.display);
            }
        }

        self.arena.remove(id);
        crate::focus::focus(self, None);
        self.update_client_list();
        self.arrange(Some(mon_id));
    }

    fn apply_rules(&mut self, id: ClientId) {
        let (class, instance) = {
            let w = self.arena.get(id).unwrap().window;
            self.xconn.get_class_hint(w)
        };
        let name = self.arena.get(id).unwrap().name.clone();

        if let Some(c) = self.arena.get_mut(id) {
            c.is_floating = false;
            c.tags = 0;
        }

        let mut forced_monitor: Option<i32> = None;
        for rule in self.config.rules.clone() {
            let class_ok = rule.class.is_empty() || class.contains(&rule.class);
            let instance_ok = rule.instance.is_empty() || instance.contains(&rule.instance);
            let title_ok = rule.title.is_empty() || name.contains(&rule.title);
            if class_ok && instance_ok && title_ok {
                if let Some(c) = self.arena.get_mut(id) {
                    c.is_floating = rule.is_floating;
                    c.tags |= rule.tags;
                }
                if rule.monitor >= 0 {
                    forced_monitor = Some(rule.monitor);
                }
            }
        }

        if let Some(num) = forced_monitor {
            if let Some(mon) = self.monitors.iter().find(|m| m.num == num) {
                let mid = mon.id();
                if let Some(c) = self.arena.get_mut(id) {
                    c.monitor = mid;
                }
            }
        }

        let mon_tags = self.monitors.get(self.arena.get(id).unwrap().monitor).unwrap().current_tags();
        if let Some(c) = self.arena.get_mut(id) {
            c.tags = if c.tags & self.tag_mask != 0 {
                c.tags & self.tag_mask
            } else {
                mon_tags
            };
        }
    }

    pub(crate) fn update_size_hints(&mut self, id: ClientId) {
        let w = self.arena.get(id).unwrap().window;
        let hints = self.xconn.get_wm_normal_hints(w);
        if let Some(c) = self.arena.get_mut(id) {
            c.is_fixed = hints.is_fixed();
            c.hints = hints;
            c.hints_valid = true;
        }
    }

    /// `updatewindowtype`: reads `_NET_WM_STATE` and `_NET_WM_WINDOW_TYPE`
    /// and applies the fullscreen/dialog consequences eagerly, the same way
    /// `manage()` does in the jwm transliteration this is grounded on.
    pub(crate) fn update_window_type(&mut self, id: ClientId) {
        let w = match self.arena.get(id) {
            Some(c) => c.window,
            None => return,
        };
        let state = self.xconn.get_atom_prop(w, self.net_atoms.wm_state);
        let window_type = self.xconn.get_atom_prop(w, self.net_atoms.wm_window_type);

        if state == Some(self.net_atoms.wm_fullscreen) {
            self.set_fullscreen(id, true);
        }
        if window_type == Some(self.net_atoms.wm_window_type_dialog) {
            if let Some(c) = self.arena.get_mut(id) {
                c.is_floating = true;
            }
        }
    }

    /// `updatewmhints`: mirrors the urgency bit into `Client::is_urgent`
    /// and the `InputHint`'s `input` field into `Client::never_focus`. The
    /// selected client's urgency is never latched (spec.md §4.6: a client
    /// cannot mark itself urgent while focused).
    pub(crate) fn update_wm_hints(&mut self, id: ClientId) {
        let w = match self.arena.get(id) {
            Some(c) => c.window,
            None => return,
        };
        let (urgent, never_focus) = self.xconn.get_wm_hints(w);
        let is_selected = self
            .arena
            .get(id)
            .map(|c| self.monitors.get(c.monitor).map(|m| m.selected_client == Some(id)).unwrap_or(false))
            .unwrap_or(false);

        let keep_urgent = urgent && !is_selected;
        if urgent && is_selected {
            self.xconn.clear_urgency(w);
        }
        if let Some(c) = self.arena.get_mut(id) {
            c.never_focus = never_focus;
            c.is_urgent = keep_urgent;
        }
    }

    /// `setfullscreen` (spec.md §4.6): saves/restores the floating geometry
    /// and raises the client to cover its monitor's full screen area
    /// (not just the work area) while fullscreen.
    pub fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) {
        let (already, window) = match self.arena.get(id) {
            Some(c) => (c.is_fullscreen, c.window),
            None => return,
        };
        if fullscreen == already {
            return;
        }

        unsafe {
            let data: [xlib::Atom; 1] = if fullscreen { [self.net_atoms.wm_fullscreen] } else { [0] };
            let len = if fullscreen { 1 } else { 0 };
            xlib::XChangeProperty(
                self.xconn.display,
                window,
                self.net_atoms.wm_state,
                xlib::XA_ATOM,
                32,
                xlib::PropModeReplace,
                data.as_ptr() as *const u8,
                len,
            );
        }

        if fullscreen {
            if let Some(c) = self.arena.get_mut(id) {
                c.old_floating_state = c.is_floating;
                c.old_border_width = c.border_width;
                c.is_floating = true;
                c.is_fullscreen = true;
                c.border_width = 0;
            }
            let screen = {
                let c = self.arena.get(id).unwrap();
                self.monitors.get(c.monitor).unwrap().screen_area
            };
            if let Some(c) = self.arena.get_mut(id) {
                c.x = screen.x;
                c.y = screen.y;
                c.w = screen.w;
                c.h = screen.h;
            }
            self.xconn.raise(window);
            self.resize_client_in_place(id, true);
        } else {
            if let Some(c) = self.arena.get_mut(id) {
                c.is_fullscreen = false;
                c.is_floating = c.old_floating_state;
                c.border_width = c.old_border_width;
                c.x = c.oldx;
                c.y = c.oldy;
                c.w = c.oldw;
                c.h = c.oldh;
            }
            self.resize_client_in_place(id, false);
            let mon = self.arena.get(id).unwrap().monitor;
            self.arrange(Some(mon));
        }
    }

    pub fn set_client_state(&self, w: Window, state: i64) {
        let data: [i64; 2] = [state, 0];
        unsafe {
            xlib::XChangeProperty(
                self.xconn.display,
                w,
                self.wm_atoms.state,
                self.wm_atoms.state,
                32,
                xlib::PropModeReplace,
                data.as_ptr() as *const u8,
                2,
            );
        }
    }

    pub fn update_client_list(&self) {
        unsafe {
            xlib::XDeleteProperty(self.xconn.display, self.xconn.root, self.net_atoms.client_list);
        }
        for (_, c) in self.arena.iter() {
            unsafe {
                xlib::XChangeProperty(
                    self.xconn.display,
                    self.xconn.root,
                    self.net_atoms.client_list,
                    xlib::XA_WINDOW,
                    32,
                    xlib::PropModeAppend,
                    &c.window as *const Window as *const u8,
                    1,
                );
            }
        }
    }

    pub fn scheme_pixel(&self, scheme: usize, _border: bool) -> u64 {
        self.draw.scheme_border_pixel(scheme)
    }

    /// `arrange(monitor?)` (spec.md §4.4).
    pub fn arrange(&mut self, monitor: Option<MonitorId>) {
        let targets: Vec<MonitorId> = match monitor {
            Some(id) => vec![id],
            None => self.monitors.iter().map(|m| m.id()).collect(),
        };
        for id in &targets {
            self.showhide(*id);
        }
        for id in &targets {
            self.arrange_mon(*id);
        }
        for id in &targets {
            crate::focus::restack(self, *id);
        }
    }

    /// Two-pass `showhide` (Design Notes: the original's recursion depth
    /// equals the stack length; this walks the focus stack forward to show
    /// top-down and reverse to hide bottom-up, the equivalent iterative
    /// form).
    fn showhide(&mut self, mon: MonitorId) {
        let stack = self.monitors.get(mon).unwrap().stack.clone();

        for &id in &stack {
            if !self.monitors.get(mon).unwrap().is_visible(&self.arena, id) {
                continue;
            }
            let (x, y) = { let c = self.arena.get(id).unwrap(); (c.x, c.y) };
            self.xconn.move_window(self.arena.get(id).unwrap().window, x, y);
            let should_resize = {
                let c = self.arena.get(id).unwrap();
                let layout_arranges = self.monitors.get(mon).unwrap().current_layout().arranges();
                showhide_should_resize(layout_arranges, c.is_floating, c.is_fullscreen)
            };
            if should_resize {
                self.resize_client_in_place(id, false);
            }
        }

        for &id in stack.iter().rev() {
            if self.monitors.get(mon).unwrap().is_visible(&self.arena, id) {
                continue;
            }
            let c = self.arena.get(id).unwrap();
            let (win, width, y) = (c.window, c.width(), c.y);
            self.xconn.move_window(win, width * -2, y);
        }
    }

    fn arrange_mon(&mut self, mon: MonitorId) {
        let (work, gap, mfact, masters, kind) = {
            let m = self.monitors.get(mon).unwrap();
            (m.work_area, m.gap_px, m.mfact, m.masters_count, m.current_layout())
        };
        if let Some(m) = self.monitors.get_mut(mon) {
            m.layout_symbol = kind.symbol().to_string();
        }
        let visible = self.monitors.get(mon).unwrap().visible_tiled(&self.arena);
        let placements: Vec<Placement> = match kind {
            LayoutKind::Tile => layout::tile(work, gap, mfact, masters, visible.len()),
            LayoutKind::Monocle => layout::monocle(work, visible.len()),
            LayoutKind::Floating => Vec::new(),
        };
        for (id, p) in visible.into_iter().zip(placements.into_iter()) {
            if let Some(c) = self.arena.get_mut(id) {
                c.x = p.x;
                c.y = p.y;
                c.w = (p.w - 2 * c.border_width).max(1);
                c.h = (p.h - 2 * c.border_width).max(1);
            }
            self.resize_client_in_place(id, false);
        }
    }

    /// Applies `apply_size_hints` against the client's already-updated
    /// target geometry and issues the X configure if it changed. Returns
    /// whether the result differs from the current geometry, so callers
    /// can avoid no-op X round-trips (spec.md §4.1).
    pub fn resize_client_in_place(&mut self, id: ClientId, interact: bool) -> bool {
        use crate::geometry::{apply_size_hints, Bounds, HintContext};

        let mon = match self.arena.get(id) {
            Some(c) => c.monitor,
            None => return false,
        };
        let (work, arranges) = {
            let m = self.monitors.get(mon).unwrap();
            (m.work_area, m.current_layout().arranges())
        };
        let c = self.arena.get(id).unwrap();
        let ctx = HintContext {
            hints: &c.hints,
            border_width: c.border_width,
            is_floating: c.is_floating,
            layout_arranges: arranges,
            resize_hints: self.config.resize_hints,
        };
        let bounds = Bounds {
            area: if interact {
                Rect::new(0, 0, self.sw, self.sh)
            } else {
                work
            },
            bar_height: self.bar_height,
        };
        let (x, y, w, h) = apply_size_hints(&ctx, &bounds, interact, c.x, c.y, c.w, c.h);
        let changed = geometry_changed((c.x, c.y, c.w, c.h), (x, y, w, h));
        let window = c.window;
        let bw = c.border_width;
        if let Some(c) = self.arena.get_mut(id) {
            c.save_geometry();
            c.x = x;
            c.y = y;
            c.w = w;
            c.h = h;
        }
        if changed {
            self.xconn.configure_window(window, x, y, w, h, bw);
            self.xconn.send_configure_notify(window, Rect::new(x, y, w, h), bw);
            self.xconn.sync();
        }
        changed
    }

    fn grab_buttons(&mut self, id: ClientId, _focused: bool) {
        let w = match self.arena.get(id) {
            Some(c) => c.window,
            None => return,
        };
        self.ungrab_buttons(w);
        let modifier_combos = [0, xlib::LockMask, self.numlock_mask, self.numlock_mask | xlib::LockMask];
        for binding in self.config.buttons.clone() {
            if binding.click != "clientwin" {
                continue;
            }
            let base_mask = resolve_modifiers(&binding.mods);
            for extra in modifier_combos {
                unsafe {
                    xlib::XGrabButton(
                        self.xconn.display,
                        binding.button,
                        base_mask | extra,
                        w,
                        0,
                        (xlib::ButtonPressMask | xlib::ButtonReleaseMask) as u32,
                        xlib::GrabModeAsync,
                        xlib::GrabModeSync,
                        0,
                        0,
                    );
                }
            }
        }
    }

    fn ungrab_buttons(&self, w: Window) {
        unsafe {
            xlib::XUngrabButton(self.xconn.display, xlib::AnyButton as u32, xlib::AnyModifier, w);
        }
    }

    pub fn grab_keys(&self) {
        unsafe {
            xlib::XUngrabKey(self.xconn.display, xlib::AnyKey, xlib::AnyModifier, self.xconn.root);
        }
        let modifier_combos = [0, xlib::LockMask, self.numlock_mask, self.numlock_mask | xlib::LockMask];
        for binding in &self.config.keys {
            let keysym = match keys::string_to_keysym(&binding.key) {
                Some(k) => k,
                None => continue,
            };
            let code = keys::keysym_to_keycode(self.xconn.display, keysym);
            if code == 0 {
                continue;
            }
            let base_mask = resolve_modifiers(&binding.mods);
            for extra in modifier_combos {
                unsafe {
                    xlib::XGrabKey(
                        self.xconn.display,
                        code as i32,
                        base_mask | extra,
                        self.xconn.root,
                        1,
                        xlib::GrabModeAsync,
                        xlib::GrabModeAsync,
                    );
                }
            }
        }
    }

    /// Re-reads a client's title from `_NET_WM_NAME`/`WM_NAME` (spec.md §4.6
    /// `PropertyNotify`). Caller redraws the owning monitor's bar.
    pub fn update_title(&mut self, id: ClientId) {
        let w = match self.arena.get(id) {
            Some(c) => c.window,
            None => return,
        };
        let name = self.xconn.fetch_name_utf8(w, self.net_atoms.wm_name);
        if let Some(c) = self.arena.get_mut(id) {
            c.set_name(&name);
        }
    }

    /// Re-reads the root window's status text (spec.md §4.6 `PropertyNotify`
    /// "root-window status string").
    pub fn update_status(&mut self) {
        self.status_text = self.xconn.root_status_text();
    }

    fn unfocus_selected(&mut self, mon: MonitorId) {
        let sel = self.monitors.get(mon).and_then(|m| m.selected_client);
        if let Some(id) = sel {
            crate::focus::unfocus(self, id, true);
        }
    }
}

pub(crate) fn resolve_modifiers(names: &[String]) -> u32 {
    names.iter().fold(0u32, |acc, name| {
        acc | match name.to_lowercase().as_str() {
            "shift" => xlib::ShiftMask,
            "control" | "ctrl" => xlib::ControlMask,
            "mod1" | "alt" => xlib::Mod1Mask,
            "mod2" => xlib::Mod2Mask,
            "mod3" => xlib::Mod3Mask,
            "mod4" | "super" => xlib::Mod4Mask,
            "mod5" => xlib::Mod5Mask,
            "lock" => xlib::LockMask,
            _ => 0,
        }
    })
}

/// Whether `resize_client_in_place` needs to issue X calls at all: the
/// hint-adjusted geometry must differ from the client's current geometry
/// (spec.md §4.1 "returns whether the result differs... to avoid no-op X
/// round-trips").
fn geometry_changed(before: (i32, i32, i32, i32), after: (i32, i32, i32, i32)) -> bool {
    before != after
}

/// `showhide`'s per-client resize-trigger condition (dwm's `showhide()`:
/// `!c->mon->lt[...]->arrange || c->isfloating`): clients under a
/// non-arranging layout, or floating clients, get their geometry/hints
/// reconfirmed on every pass; fullscreen clients never do.
fn showhide_should_resize(layout_arranges: bool, is_floating: bool, is_fullscreen: bool) -> bool {
    (!layout_arranges || is_floating) && !is_fullscreen
}

/// `isuniquegeom` dedup (spec.md §4.3): screens with identical
/// `(x, y, w, h)` are merged into one monitor.
fn dedup_unique_geometry(screens: Vec<Rect>) -> Vec<Rect> {
    let mut out: Vec<Rect> = Vec::new();
    for s in screens {
        if !out.iter().any(|u| *u == s) {
            out.push(s);
        }
    }
    out
}

fn check_other_wm(xconn: &XConn) {
    WM_DETECTED.store(false, std::sync::atomic::Ordering::SeqCst);
    unsafe {
        xlib::XSetErrorHandler(Some(x_error_start));
        xlib::XSelectInput(
            xconn.display,
            xconn.root,
            xlib::SubstructureRedirectMask,
        );
        xlib::XSync(xconn.display, 0);
        // Swap back to the steady-state handler immediately; only this
        // narrow probe window needs the competing-WM detector installed.
        xlib::XSetErrorHandler(Some(x_error_handler));
        xlib::XSync(xconn.display, 0);
    }
    if WM_DETECTED.load(std::sync::atomic::Ordering::SeqCst) {
        log::error!("another window manager is already running");
        eprintln!("ridgewm: another window manager is already running");
        std::process::exit(1);
    }
}

fn create_supporting_wm_check_window(xconn: &XConn, net: &NetAtoms, _wm: &WmAtoms) -> Window {
    unsafe {
        let win = xlib::XCreateSimpleWindow(xconn.display, xconn.root, 0, 0, 1, 1, 0, 0, 0);
        xlib::XChangeProperty(
            xconn.display,
            win,
            net.wm_check,
            xlib::XA_WINDOW,
            32,
            xlib::PropModeReplace,
            &win as *const Window as *const u8,
            1,
        );
        let name = cstring_or_empty("ridgewm");
        xlib::XChangeProperty(
            xconn.display,
            win,
            net.wm_name,
            xlib::XInternAtom(xconn.display, b"UTF8_STRING\0".as_ptr() as *const i8, 0),
            8,
            xlib::PropModeReplace,
            name.as_ptr() as *const u8,
            name.as_bytes().len() as i32,
        );
        xlib::XChangeProperty(
            xconn.display,
            xconn.root,
            net.wm_check,
            xlib::XA_WINDOW,
            32,
            xlib::PropModeReplace,
            &win as *const Window as *const u8,
            1,
        );
        win
    }
}

fn cstring_or_empty(s: &str) -> std::ffi::CString {
    std::ffi::CString::new(s).unwrap_or_default()
}

impl Drop for Wm {
    fn drop(&mut self) {
        self.xconn.close();
        log::info!("closed display OK");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_changed_is_false_for_identical_geometry() {
        let g = (10, 20, 300, 400);
        assert!(!geometry_changed(g, g));
    }

    #[test]
    fn geometry_changed_is_true_when_any_field_differs() {
        assert!(geometry_changed((0, 0, 100, 100), (1, 0, 100, 100)));
        assert!(geometry_changed((0, 0, 100, 100), (0, 1, 100, 100)));
        assert!(geometry_changed((0, 0, 100, 100), (0, 0, 101, 100)));
        assert!(geometry_changed((0, 0, 100, 100), (0, 0, 100, 101)));
    }

    #[test]
    fn showhide_resizes_floating_clients_under_any_layout() {
        assert!(showhide_should_resize(true, true, false));
        assert!(showhide_should_resize(false, true, false));
    }

    #[test]
    fn showhide_resizes_tiled_clients_only_under_a_non_arranging_layout() {
        assert!(showhide_should_resize(false, false, false));
        assert!(!showhide_should_resize(true, false, false));
    }

    #[test]
    fn showhide_never_resizes_fullscreen_clients() {
        assert!(!showhide_should_resize(true, true, true));
        assert!(!showhide_should_resize(false, true, true));
        assert!(!showhide_should_resize(false, false, true));
    }
}
