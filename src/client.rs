//! The per-client record and its arena. Replaces dwm's intrusive
//! pointer-linked `Client` list with arena-allocated records keyed by a
//! stable integer handle (Design Note 1): the insertion list and focus
//! stack become two independent `Vec<ClientId>` sequences owned by each
//! [`crate::monitor::Monitor`], rather than `next`/`snext` pointers baked
//! into the record itself.

use std::collections::HashMap;
use x11::xlib::Window;

use crate::geometry::SizeHints;
use crate::monitor::MonitorId;

/// Stable handle to a managed client. Never reused within a process
/// lifetime, so a stale `ClientId` from a destroyed client can never alias
/// a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

/// Global tag vocabulary size ceiling (spec.md §3.1: "≤31 tags").
pub const MAX_TAGS: u32 = 31;

#[derive(Debug, Clone)]
pub struct Client {
    pub window: Window,
    pub name: String,

    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub oldx: i32,
    pub oldy: i32,
    pub oldw: i32,
    pub oldh: i32,

    pub border_width: i32,
    pub old_border_width: i32,

    pub hints: SizeHints,
    pub hints_valid: bool,

    pub tags: u32,

    pub is_floating: bool,
    pub is_fixed: bool,
    pub is_urgent: bool,
    pub never_focus: bool,
    pub is_fullscreen: bool,
    pub old_floating_state: bool,

    pub monitor: MonitorId,
}

impl Client {
    pub fn new(window: Window, monitor: MonitorId, x: i32, y: i32, w: i32, h: i32, border_width: i32) -> Self {
        Client {
            window,
            name: String::new(),
            x,
            y,
            w,
            h,
            oldx: x,
            oldy: y,
            oldw: w,
            oldh: h,
            border_width,
            old_border_width: 0,
            hints: SizeHints::default(),
            hints_valid: false,
            tags: 0,
            is_floating: false,
            is_fixed: false,
            is_urgent: false,
            never_focus: false,
            is_fullscreen: false,
            old_floating_state: false,
            monitor,
        }
    }

    pub fn width(&self) -> i32 {
        self.w + 2 * self.border_width
    }

    pub fn height(&self) -> i32 {
        self.h + 2 * self.border_width
    }

    pub fn save_geometry(&mut self) {
        self.oldx = self.x;
        self.oldy = self.y;
        self.oldw = self.w;
        self.oldh = self.h;
    }

    /// Truncated to 256 bytes per spec.md §3.1.
    pub fn set_name(&mut self, name: &str) {
        let mut bytes = name.as_bytes();
        if bytes.len() > 256 {
            // Snap to a char boundary at or before byte 256.
            let mut cut = 256;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            bytes = &bytes[..cut];
        }
        self.name = String::from_utf8_lossy(bytes).into_owned();
    }
}

/// Owns every managed [`Client`], keyed by [`ClientId`].
#[derive(Debug, Default)]
pub struct ClientArena {
    clients: HashMap<ClientId, Client>,
    next_id: u64,
}

impl ClientArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Client) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.clients.insert(id, client);
        id
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        self.clients.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn find_by_window(&self, window: Window) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| c.window == window)
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.clients.iter().map(|(id, c)| (*id, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorId;

    #[test]
    fn ids_are_never_reused() {
        let mut arena = ClientArena::new();
        let mon = MonitorId::new_for_test(0);
        let a = arena.insert(Client::new(1, mon, 0, 0, 100, 100, 1));
        arena.remove(a);
        let b = arena.insert(Client::new(2, mon, 0, 0, 100, 100, 1));
        assert_ne!(a, b);
    }

    #[test]
    fn name_is_truncated_to_256_bytes() {
        let mut c = Client::new(1, MonitorId::new_for_test(0), 0, 0, 1, 1, 0);
        let long = "x".repeat(1000);
        c.set_name(&long);
        assert!(c.name.len() <= 256);
    }
}
