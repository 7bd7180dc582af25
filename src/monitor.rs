//! The monitor set: per-output screen/work areas, tag-sets, and the two
//! client orderings dwm calls the insertion list and the focus stack
//! (spec.md §3.2, §4.2, §4.3).

use x11::xlib::Window;

use crate::client::{ClientArena, ClientId, MAX_TAGS};
use crate::config::Config;
use crate::geometry::Rect;
use crate::layout::LayoutKind;

/// Arena handle for a [`Monitor`]. Stable across `update_geom` reconciliation
/// even though monitors can be created/destroyed as Xinerama geometry
/// changes (spec.md §4.3) — a disappearing monitor simply stops existing in
/// the arena; no id is ever reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(u32);

impl MonitorId {
    #[cfg(test)]
    pub fn new_for_test(n: u32) -> Self {
        MonitorId(n)
    }
}

pub fn tag_mask(config: &Config) -> u32 {
    if config.tags.len() >= MAX_TAGS as usize {
        u32::MAX
    } else {
        (1u32 << config.tags.len()) - 1
    }
}

#[derive(Debug)]
pub struct Monitor {
    id: MonitorId,
    pub num: i32,

    /// Full screen rectangle as reported by Xinerama (or the whole display).
    pub screen_area: Rect,
    /// Screen area minus the bar strip, when `show_bar`.
    pub work_area: Rect,

    pub bar_window: Window,
    pub bar_y: i32,
    pub show_bar: bool,
    pub top_bar: bool,

    pub gap_px: i32,
    pub mfact: f64,
    pub masters_count: i32,

    /// Two tag-set slots so `view()` can restore the previous view by a
    /// single XOR on `selected_tags_set` (spec.md §3.2).
    pub tagset: [u32; 2],
    pub selected_tags_set: usize,

    /// Per-tag-index current layout (spec.md Design Notes: `view(i)` also
    /// calls `set_layout_index`, entangling tag index with layout memory —
    /// preserved here deliberately, see DESIGN.md).
    pub layout_per_tag: Vec<LayoutKind>,
    /// Per-tag-index remembered previous layout, so `set_layout(L?)` can
    /// "toggle the symbol" when `L` is omitted or repeats the current
    /// layout, matching dwm's `sellt` slot flip in `setlayout()`.
    prev_layout_per_tag: Vec<LayoutKind>,
    pub layout_symbol: String,

    /// Insertion order: drives tiling order and "next" traversal.
    pub clients: Vec<ClientId>,
    /// Most-recently-focused-first order: drives focus fallback.
    pub stack: Vec<ClientId>,
    pub selected_client: Option<ClientId>,
}

impl Monitor {
    pub fn new(id: MonitorId, num: i32, screen_area: Rect, config: &Config) -> Self {
        let ntags = config.tags.len().max(1);
        Monitor {
            id,
            num,
            screen_area,
            work_area: screen_area,
            bar_window: 0,
            bar_y: screen_area.y,
            show_bar: config.show_bar,
            top_bar: config.top_bar,
            gap_px: config.gap_px,
            mfact: config.mfact,
            masters_count: config.masters_count,
            tagset: [1, 1],
            selected_tags_set: 0,
            layout_per_tag: vec![LayoutKind::Tile; ntags.max(config.layouts.len().max(1))],
            prev_layout_per_tag: vec![LayoutKind::Monocle; ntags.max(config.layouts.len().max(1))],
            layout_symbol: config
                .layouts
                .first()
                .map(|l| l.symbol.clone())
                .unwrap_or_default(),
            clients: Vec::new(),
            stack: Vec::new(),
            selected_client: None,
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn current_tags(&self) -> u32 {
        self.tagset[self.selected_tags_set]
    }

    pub fn recompute_work_area(&mut self, bar_height: i32) {
        self.work_area = self.screen_area;
        if self.show_bar {
            if self.top_bar {
                self.work_area.y += bar_height;
            }
            self.work_area.h -= bar_height;
            self.bar_y = if self.top_bar {
                self.screen_area.y
            } else {
                self.screen_area.y + self.screen_area.h - bar_height
            };
        } else {
            self.bar_y = -bar_height;
        }
    }

    pub fn is_visible(&self, arena: &ClientArena, id: ClientId) -> bool {
        arena
            .get(id)
            .map(|c| c.tags & self.current_tags() != 0)
            .unwrap_or(false)
    }

    /// Push to the head of the insertion list.
    pub fn attach(&mut self, id: ClientId) {
        self.clients.insert(0, id);
    }

    /// Push to the head of the focus stack.
    pub fn attach_stack(&mut self, id: ClientId) {
        self.stack.insert(0, id);
    }

    /// Unlink from the insertion list. If `id` was `selected_client`,
    /// promotion of a new selection is the caller's responsibility (it
    /// depends on visibility, which needs the arena) — see
    /// [`Monitor::detach_stack`] and `focus::focus`.
    pub fn detach(&mut self, id: ClientId) {
        self.clients.retain(|&c| c != id);
    }

    /// Unlink from the focus stack. If `id` was `selected_client`, clears
    /// it; callers promote a replacement via `focus::focus(None)`.
    pub fn detach_stack(&mut self, id: ClientId) {
        self.stack.retain(|&c| c != id);
        if self.selected_client == Some(id) {
            self.selected_client = None;
        }
    }

    /// Advance from `from` over hidden or floating clients in insertion
    /// order. `from = None` starts at the head. O(n) total across a full
    /// traversal.
    pub fn next_tiled(&self, arena: &ClientArena, from: Option<ClientId>) -> Option<ClientId> {
        let start = match from {
            None => 0,
            Some(id) => self.clients.iter().position(|&c| c == id)? + 1,
        };
        self.clients[start..]
            .iter()
            .copied()
            .find(|&id| self.next_tiled_candidate(arena, id))
    }

    fn next_tiled_candidate(&self, arena: &ClientArena, id: ClientId) -> bool {
        match arena.get(id) {
            Some(c) => !c.is_floating && self.is_visible(arena, id),
            None => false,
        }
    }

    /// All tiled, visible clients in insertion order.
    pub fn visible_tiled(&self, arena: &ClientArena) -> Vec<ClientId> {
        self.clients
            .iter()
            .copied()
            .filter(|&id| self.next_tiled_candidate(arena, id))
            .collect()
    }

    /// First visible client walking the focus stack, used by `focus::focus`
    /// fallback.
    pub fn first_visible_in_stack(&self, arena: &ClientArena) -> Option<ClientId> {
        self.stack
            .iter()
            .copied()
            .find(|&id| self.is_visible(arena, id))
    }

    /// Detach + attach to head (promotes to master position). Does not
    /// focus or arrange; callers (command layer) do that.
    pub fn pop_to_master(&mut self, id: ClientId) {
        self.detach(id);
        self.attach(id);
    }

    pub fn current_layout(&self) -> LayoutKind {
        let idx = self.selected_tags_set_layout_index();
        self.layout_per_tag
            .get(idx)
            .copied()
            .unwrap_or(LayoutKind::Tile)
    }

    /// `set_layout(L?)`: `None` or `L` matching the current layout flips to
    /// the remembered previous layout for this tag slot (dwm's `sellt ^= 1`
    /// toggle); any other `L` replaces the current layout and remembers it
    /// as the new toggle target.
    pub fn set_current_layout(&mut self, layout: Option<LayoutKind>) {
        let idx = self.selected_tags_set_layout_index();
        if idx >= self.layout_per_tag.len() {
            return;
        }
        let current = self.layout_per_tag[idx];
        let next = match layout {
            None => self.prev_layout_per_tag[idx],
            Some(l) if l == current => self.prev_layout_per_tag[idx],
            Some(l) => l,
        };
        self.prev_layout_per_tag[idx] = current;
        self.layout_per_tag[idx] = next;
    }

    /// `view(i)`'s per-tag layout memory is keyed by tag index, not by
    /// monitor — see the Design Notes entanglement this spec preserves.
    /// We approximate "the tag index of the current view" as the lowest set
    /// bit of the current tag-set, matching dwm's `m->sellt` indexing by the
    /// tag that was last explicitly `view()`ed.
    fn selected_tags_set_layout_index(&self) -> usize {
        let tags = self.current_tags();
        if tags == 0 {
            return 0;
        }
        tags.trailing_zeros() as usize
    }
}

#[derive(Debug, Default)]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
    next_id: u32,
    pub selected: usize,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, num: i32, screen_area: Rect, config: &Config) -> MonitorId {
        let id = MonitorId(self.next_id);
        self.next_id += 1;
        self.monitors.push(Monitor::new(id, num, screen_area, config));
        id
    }

    pub fn remove_last(&mut self) -> Option<Monitor> {
        self.monitors.pop()
    }

    pub fn get(&self, id: MonitorId) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> {
        self.monitors.iter_mut().find(|m| m.id() == id)
    }

    pub fn index_of(&self, id: MonitorId) -> Option<usize> {
        self.monitors.iter().position(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Monitor> {
        self.monitors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Monitor> {
        self.monitors.iter_mut()
    }

    pub fn selected_id(&self) -> Option<MonitorId> {
        self.monitors.get(self.selected).map(|m| m.id())
    }

    pub fn head_id(&self) -> Option<MonitorId> {
        self.monitors.first().map(|m| m.id())
    }

    /// Monitor in the given direction from `from`, wrapping. `dir` is `+1`
    /// or `-1`.
    pub fn neighbor(&self, from: MonitorId, dir: i32) -> Option<MonitorId> {
        let n = self.monitors.len();
        if n == 0 {
            return None;
        }
        let idx = self.index_of(from)?;
        let next = ((idx as i64 + dir as i64).rem_euclid(n as i64)) as usize;
        Some(self.monitors[next].id())
    }

    /// The monitor whose screen rectangle contains `(x, y)`, used to decide
    /// pointer-crossing monitor switches on `EnterNotify`/`MotionNotify`
    /// (spec.md §4.6).
    pub fn at_point(&self, x: i32, y: i32) -> Option<MonitorId> {
        self.monitors
            .iter()
            .find(|m| {
                x >= m.screen_area.x
                    && x < m.screen_area.x + m.screen_area.w
                    && y >= m.screen_area.y
                    && y < m.screen_area.y + m.screen_area.h
            })
            .map(|m| m.id())
    }

    /// The monitor whose screen rectangle has the greatest intersection
    /// area with `rect`, falling back to the selected monitor. Used to
    /// re-home a client after a mouse drag (spec.md §4.7 `move_mouse`/
    /// `resize_mouse`: "re-homes the client to the monitor under its
    /// center").
    pub fn containing(&self, rect: Rect) -> Option<MonitorId> {
        self.monitors
            .iter()
            .max_by_key(|m| m.screen_area.intersect_area(&rect))
            .map(|m| m.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn view_swap_is_involutive() {
        let config = Config::default();
        let mut m = Monitor::new(MonitorId::new_for_test(0), 0, Rect::new(0, 0, 100, 100), &config);
        let initial = m.tagset;
        m.tagset[1 - m.selected_tags_set] = m.tagset[m.selected_tags_set];
        m.selected_tags_set ^= 1;
        m.tagset[1 - m.selected_tags_set] = m.tagset[m.selected_tags_set];
        m.selected_tags_set ^= 1;
        assert_eq!(m.tagset, initial);
    }

    #[test]
    fn neighbor_wraps_around() {
        let config = Config::default();
        let mut set = MonitorSet::new();
        let a = set.push(0, Rect::default(), &config);
        let b = set.push(1, Rect::default(), &config);
        assert_eq!(set.neighbor(a, 1), Some(b));
        assert_eq!(set.neighbor(a, -1), Some(b));
        assert_eq!(set.neighbor(b, 1), Some(a));
    }
}
