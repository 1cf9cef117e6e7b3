//! Hidden admin entry: rapid clicks on the public header logo.
//!
//! The browser runs `gesture_client.js`; the thresholds it reads from the
//! logo's data attributes come from the constants below. The script is the
//! only runtime implementation. `AdminEntryGesture` in the tests mirrors it
//! step for step so the click rules are checked here.

use crate::web::escape_html;

pub const ADMIN_ENTRY_CLICKS: u32 = 7;
pub const ADMIN_ENTRY_WINDOW_MS: u64 = 1000;
pub const ADMIN_ENTRY_TARGET: &str = "/admin/login";

pub const GESTURE_SCRIPT: &str = concat!(
    "<script>\n",
    include_str!("gesture_client.js"),
    "\n</script>",
);

/// Mirror of the click handler in `gesture_client.js`.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureStep {
    Counting(u32),
    Navigate,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminEntryGesture {
    count: u32,
    last_click_ms: Option<u64>,
}

#[cfg(test)]
impl AdminEntryGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Registers a click at `at_ms` (milliseconds on any monotonic clock).
    pub fn click(&mut self, at_ms: u64) -> GestureStep {
        let within_window = self
            .last_click_ms
            .is_some_and(|last| at_ms.saturating_sub(last) <= ADMIN_ENTRY_WINDOW_MS);
        self.last_click_ms = Some(at_ms);

        if !within_window {
            self.count = 1;
            return GestureStep::Counting(1);
        }

        self.count += 1;
        if self.count >= ADMIN_ENTRY_CLICKS {
            self.count = 0;
            return GestureStep::Navigate;
        }
        GestureStep::Counting(self.count)
    }
}

/// Logo button carrying the gesture thresholds.
pub fn render_logo_button(site_title: &str) -> String {
    format!(
        r#"<button type="button" class="logo" id="site-logo" aria-label="{title}" data-admin-clicks="{clicks}" data-admin-window-ms="{window}" data-admin-target="{target}"><span class="logo-mark">A</span></button>"#,
        title = escape_html(site_title),
        clicks = ADMIN_ENTRY_CLICKS,
        window = ADMIN_ENTRY_WINDOW_MS,
        target = ADMIN_ENTRY_TARGET,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_at(gesture: &mut AdminEntryGesture, times: &[u64]) -> Vec<GestureStep> {
        times.iter().map(|at| gesture.click(*at)).collect()
    }

    #[test]
    fn seven_quick_clicks_navigate() {
        let mut gesture = AdminEntryGesture::new();
        let steps = click_at(&mut gesture, &[0, 200, 400, 600, 800, 1000, 1200]);
        assert_eq!(steps.last(), Some(&GestureStep::Navigate));
        assert_eq!(gesture.count(), 0);
    }

    #[test]
    fn exactly_one_second_apart_still_counts() {
        let mut gesture = AdminEntryGesture::new();
        let times: Vec<u64> = (0..7).map(|i| 5_000 + i * 1000).collect();
        assert_eq!(
            click_at(&mut gesture, &times).last(),
            Some(&GestureStep::Navigate)
        );
    }

    #[test]
    fn a_late_click_restarts_at_one() {
        let mut gesture = AdminEntryGesture::new();
        click_at(&mut gesture, &[0, 100, 200, 300, 400, 500]);
        assert_eq!(gesture.count(), 6);

        assert_eq!(gesture.click(1_600), GestureStep::Counting(1));
        assert_eq!(gesture.count(), 1);
    }

    #[test]
    fn six_clicks_then_a_late_one_do_not_navigate() {
        let mut gesture = AdminEntryGesture::new();
        let steps = click_at(&mut gesture, &[0, 100, 200, 300, 400, 500, 2_000]);
        assert!(!steps.contains(&GestureStep::Navigate));
    }

    #[test]
    fn counting_resumes_after_navigation() {
        let mut gesture = AdminEntryGesture::new();
        click_at(&mut gesture, &[0, 100, 200, 300, 400, 500, 600]);
        assert_eq!(gesture.click(700), GestureStep::Counting(1));
    }

    #[test]
    fn script_reads_thresholds_from_the_logo() {
        for needle in [
            "getElementById('site-logo')",
            "dataset.adminClicks",
            "dataset.adminWindowMs",
            "dataset.adminTarget",
            "now - lastClick <= windowMs",
            "count = 1;",
            "count >= requiredClicks",
            "count = 0;",
        ] {
            assert!(GESTURE_SCRIPT.contains(needle), "{needle}");
        }
        assert!(render_logo_button("APEX").contains(r#"id="site-logo""#));
    }

    #[test]
    fn logo_exposes_thresholds() {
        let html = render_logo_button("Platform <APEX>");
        assert!(html.contains(r#"data-admin-clicks="7""#));
        assert!(html.contains(r#"data-admin-window-ms="1000""#));
        assert!(html.contains("Platform &lt;APEX&gt;"));
    }
}
