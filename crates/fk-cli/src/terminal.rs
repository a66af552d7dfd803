//! Terminal rendering of the overlay and countdown.

use fk_core::{CountdownView, OverlayView, Renderer};

/// Prints each frame to stdout.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn show_overlay(&mut self, view: &OverlayView) {
        print!("{}", format_overlay(view));
    }

    fn show_countdown(&mut self, view: &CountdownView) {
        println!("{}", format_countdown(view));
    }

    fn clear(&mut self) {
        println!("Overlay removed");
    }
}

pub fn format_overlay(view: &OverlayView) -> String {
    let mut out = format!("Blocked: {}\n  [{}]\n", view.host, view.grant_label);
    if !view.stats.is_empty() {
        out.push_str("  Blocked today:\n");
        for (host, count) in &view.stats {
            out.push_str(&format!("    {host:<30} {count}\n"));
        }
    }
    out
}

pub fn format_countdown(view: &CountdownView) -> String {
    let marker = if view.urgent { " (!)" } else { "" };
    format!("Exempt: {} left{marker}", view.label)
}
