//! The per-monitor status/tag/title bar (spec.md §4.8), driven entirely by
//! `Wm`'s model state through the `DrawContext` operations enumerated in
//! spec.md §6. Grounded in `sminez-penrose`'s status-bar widget loop
//! (compute geometry for each region left-to-right, draw, `map`) and the
//! `drawbar` control flow named by spec.md itself.

use crate::monitor::MonitorId;
use crate::wm::{Wm, SCHEME_NORMAL, SCHEME_SELECTED};

/// Redraws the bar on `mon`. A no-op if the monitor has no bar window or
/// the bar is hidden (the caller still owns deciding whether to call this
/// at all — `toggle_bar` unmaps instead of skipping redraws).
pub fn draw_bar(wm: &mut Wm, mon: MonitorId) {
    let (bar_window, screen, is_selected, show_bar) = {
        let m = match wm.monitors.get(mon) {
            Some(m) => m,
            None => return,
        };
        (m.bar_window, m.screen_area, wm.monitors.selected_id() == Some(mon), m.show_bar)
    };
    if bar_window == 0 || !show_bar {
        return;
    }

    let bar_w = screen.w as u32;
    let bar_h = wm.bar_height as u32;

    // Status text, right-aligned, only drawn on the selected monitor —
    // every other monitor's bar reserves no space for it.
    let status_w = if is_selected {
        wm.draw.font_text_width(&wm.status_text) + 2 * TEXT_PAD
    } else {
        0
    };

    wm.draw.set_scheme(SCHEME_NORMAL);
    wm.draw.rect(0, 0, bar_w, bar_h, true, false);

    let mut x = 0i32;
    if is_selected {
        wm.draw.set_scheme(SCHEME_NORMAL);
        wm.draw.text(
            (bar_w - status_w) as i32,
            0,
            status_w,
            bar_h,
            TEXT_PAD,
            &wm.status_text,
            false,
        );
    }

    // Tag cells: left-aligned, one per configured tag, filled when any
    // client on this monitor occupies it, hollow square indicator when
    // selected-client-only membership would otherwise be invisible.
    let tags = wm.config.tags.clone();
    let occupied = tag_occupancy(wm, mon);
    let urgent = tag_urgency(wm, mon);
    let current = wm.monitors.get(mon).map(|m| m.current_tags()).unwrap_or(0);

    for (i, name) in tags.iter().enumerate() {
        let bit = 1u32 << i;
        let selected_tag = current & bit != 0;
        let scheme = if selected_tag { SCHEME_SELECTED } else { SCHEME_NORMAL };
        wm.draw.set_scheme(scheme);
        let w = wm.draw.font_text_width(name) + 2 * TEXT_PAD;
        let invert = urgent & bit != 0;
        x = wm.draw.text(x, 0, w, bar_h, TEXT_PAD, name, invert);
        if occupied & bit != 0 {
            let indicator_w = (w / 6).max(2);
            wm.draw.rect(x - w as i32 + 2, 2, indicator_w, indicator_w, true, selected_tag);
        }
    }

    // Layout symbol.
    let symbol = wm.monitors.get(mon).map(|m| m.layout_symbol.clone()).unwrap_or_default();
    wm.draw.set_scheme(SCHEME_NORMAL);
    let ltw = wm.draw.font_text_width(&symbol) + 2 * TEXT_PAD;
    x = wm.draw.text(x, 0, ltw, bar_h, TEXT_PAD, &symbol, false);

    // Remainder: selected client's title.
    let remaining = (bar_w as i32 - status_w as i32 - x).max(0) as u32;
    if remaining > 0 {
        let (title, floating, fixed) = selected_client_title(wm, mon);
        let scheme = if is_selected { SCHEME_SELECTED } else { SCHEME_NORMAL };
        wm.draw.set_scheme(scheme);
        wm.draw.text(x, 0, remaining, bar_h, TEXT_PAD, &title, false);
        if floating {
            let side = (bar_h / 6).max(2);
            wm.draw.rect(x + 2, 2, side, side, fixed, false);
        }
    } else {
        wm.draw.set_scheme(SCHEME_NORMAL);
    }

    wm.draw.map(bar_window, 0, 0, bar_w, bar_h);
}

const TEXT_PAD: u32 = 4;

fn tag_occupancy(wm: &Wm, mon: MonitorId) -> u32 {
    let m = match wm.monitors.get(mon) {
        Some(m) => m,
        None => return 0,
    };
    m.clients.iter().fold(0u32, |acc, &id| {
        wm.arena.get(id).map(|c| acc | c.tags).unwrap_or(acc)
    })
}

fn tag_urgency(wm: &Wm, mon: MonitorId) -> u32 {
    let m = match wm.monitors.get(mon) {
        Some(m) => m,
        None => return 0,
    };
    m.clients.iter().fold(0u32, |acc, &id| {
        wm.arena
            .get(id)
            .filter(|c| c.is_urgent)
            .map(|c| acc | c.tags)
            .unwrap_or(acc)
    })
}

fn selected_client_title(wm: &Wm, mon: MonitorId) -> (String, bool, bool) {
    let sel = wm.monitors.get(mon).and_then(|m| m.selected_client);
    match sel.and_then(|id| wm.arena.get(id)) {
        Some(c) => (c.name.clone(), c.is_floating, c.is_fixed),
        None => (String::new(), false, false),
    }
}

/// Redraws every monitor's bar. Called after operations that can change
/// any monitor's visible state (focus changes, tag switches, arrange).
pub fn draw_bars(wm: &mut Wm) {
    let ids: Vec<MonitorId> = wm.monitors.iter().map(|m| m.id()).collect();
    for id in ids {
        draw_bar(wm, id);
    }
}

/// Resolves which on-bar region an x-coordinate click landed in, for
/// `ButtonPress` dispatch (spec.md §4.6). Returns a zero-based tag index
/// for a tag-cell click, or a named region otherwise.
pub enum BarRegion {
    Tag(usize),
    LayoutSymbol,
    Status,
    Title,
}

pub fn hit_test(wm: &Wm, mon: MonitorId, x: i32) -> BarRegion {
    let mut cursor = 0i32;
    for (i, name) in wm.config.tags.iter().enumerate() {
        let w = wm.draw.font_text_width(name) as i32 + 2 * TEXT_PAD as i32;
        if x < cursor + w {
            return BarRegion::Tag(i);
        }
        cursor += w;
    }
    let symbol = wm.monitors.get(mon).map(|m| m.layout_symbol.clone()).unwrap_or_default();
    let ltw = wm.draw.font_text_width(&symbol) as i32 + 2 * TEXT_PAD as i32;
    if x < cursor + ltw {
        return BarRegion::LayoutSymbol;
    }
    cursor += ltw;

    let screen_w = wm.monitors.get(mon).map(|m| m.screen_area.w).unwrap_or(0);
    let status_w = wm.draw.font_text_width(&wm.status_text) as i32 + 2 * TEXT_PAD as i32;
    if wm.monitors.selected_id() == Some(mon) && x >= screen_w - status_w {
        return BarRegion::Status;
    }
    let _ = cursor;
    BarRegion::Title
}
