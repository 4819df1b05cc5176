//! Hover controller.
//!
//! A sans-IO state machine: the host feeds it pointer events stamped with a
//! monotonic [`Instant`], polls it when [`HoverController::next_deadline`]
//! passes, executes the [`FetchRequest`]s it hands back and reports the
//! results. It never performs I/O or reads the clock for timers itself.
//!
//! ```text
//! Idle --enter--> Pending --delay--> Shown --leave--> Hiding --200ms--> Idle
//!                    |                  ^                |
//!                    +--leave--> Idle   +---re-enter-----+
//! ```
//!
//! Click or disable tears everything down from any state. Only one session
//! exists at a time; each gets a fresh generation so results that arrive
//! for a superseded session are cached but never displayed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use linkpeek_core::{LinkFilter, PreviewResult};
use tokio::time::Instant;
use url::Url;

use crate::cache::{CACHE_RETENTION, PreviewCache};
use crate::render::{PagePoint, PanelContent, PreviewPanel, PreviewRenderer, Viewport};
use crate::settings::Settings;

/// Grace period before a panel the pointer has left is removed.
pub const HIDE_DELAY: Duration = Duration::from_millis(200);

/// Host-assigned identity of a link element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u64);

/// The link currently being tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverSession {
    pub link: LinkId,
    pub url: Url,
    pub pointer: PagePoint,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverState {
    Idle,
    Pending { session: HoverSession, show_at: Instant },
    Shown { session: HoverSession },
    Hiding { session: HoverSession, hide_at: Instant },
    Disabled,
}

impl HoverState {
    fn session(&self) -> Option<&HoverSession> {
        match self {
            Self::Pending { session, .. } | Self::Shown { session } | Self::Hiding { session, .. } => {
                Some(session)
            }
            Self::Idle | Self::Disabled => None,
        }
    }
}

/// A preview the host must fetch and report back via
/// [`HoverController::preview_resolved`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,
    pub link: LinkId,
    pub generation: u64,
}

pub struct HoverController {
    settings: Settings,
    filter: LinkFilter,
    state: HoverState,
    cache: PreviewCache,
    renderer: PreviewRenderer,
    viewport: Viewport,
    panel: Option<PreviewPanel>,
    next_generation: u64,
}

impl HoverController {
    /// Controller for links on `page`.
    pub fn new(page: Url, settings: Settings, viewport: Viewport) -> Self {
        let state = if settings.enabled {
            HoverState::Idle
        } else {
            HoverState::Disabled
        };

        Self {
            renderer: PreviewRenderer::new(settings.panel_size()),
            filter: LinkFilter::new(page),
            settings,
            state,
            cache: PreviewCache::new(),
            viewport,
            panel: None,
            next_generation: 0,
        }
    }

    pub fn state(&self) -> &HoverState {
        &self.state
    }

    pub fn panel(&self) -> Option<&PreviewPanel> {
        self.panel.as_ref()
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // -- pointer events --

    pub fn pointer_entered_link(&mut self, link: LinkId, href: &str, pointer: PagePoint, now: Instant) {
        if matches!(self.state, HoverState::Disabled) {
            return;
        }
        let Some(url) = self.filter.qualify(href) else {
            return;
        };

        match &mut self.state {
            HoverState::Pending { session, .. } if session.link == link => {
                session.pointer = pointer;
                return;
            }
            HoverState::Shown { session } if session.link == link => return,
            HoverState::Hiding { session, .. } if session.link == link => {
                self.state = HoverState::Shown {
                    session: session.clone(),
                };
                return;
            }
            _ => {}
        }

        self.teardown();
        self.next_generation += 1;
        let session = HoverSession {
            link,
            url,
            pointer,
            generation: self.next_generation,
        };
        tracing::debug!(link = link.0, url = %session.url, "hover pending");
        self.state = HoverState::Pending {
            session,
            show_at: now + self.settings.show_delay(),
        };
    }

    pub fn pointer_moved(&mut self, link: LinkId, pointer: PagePoint) {
        if let HoverState::Pending { session, .. } = &mut self.state
            && session.link == link
        {
            session.pointer = pointer;
        }
    }

    pub fn pointer_left_link(&mut self, link: LinkId, now: Instant) {
        match &self.state {
            HoverState::Pending { session, .. } if session.link == link => {
                tracing::debug!(link = link.0, "hover cancelled before delay");
                self.state = HoverState::Idle;
            }
            HoverState::Shown { session } if session.link == link => {
                self.state = HoverState::Hiding {
                    session: session.clone(),
                    hide_at: now + HIDE_DELAY,
                };
            }
            _ => {}
        }
    }

    pub fn pointer_entered_panel(&mut self, _now: Instant) {
        if let HoverState::Hiding { session, .. } = &self.state {
            self.state = HoverState::Shown {
                session: session.clone(),
            };
        }
    }

    pub fn pointer_left_panel(&mut self, now: Instant) {
        if let HoverState::Shown { session } = &self.state {
            self.state = HoverState::Hiding {
                session: session.clone(),
                hide_at: now + HIDE_DELAY,
            };
        }
    }

    /// A click anywhere on the page.
    pub fn clicked(&mut self) {
        if !matches!(self.state, HoverState::Disabled) {
            self.teardown();
        }
    }

    // -- settings --

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        let disabled = matches!(self.state, HoverState::Disabled);

        if enabled && disabled {
            self.state = HoverState::Idle;
            tracing::debug!("previews enabled");
        } else if !enabled && !disabled {
            self.teardown();
            self.state = HoverState::Disabled;
            tracing::debug!("previews disabled");
        }
    }

    /// Apply updated settings. A new delay applies from the next hover.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.renderer.set_size(settings.panel_size());
        let enabled = settings.enabled;
        self.settings = settings;
        self.set_enabled(enabled);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // -- timers and results --

    /// Earliest armed timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            HoverState::Pending { show_at, .. } => Some(*show_at),
            HoverState::Hiding { hide_at, .. } => Some(*hide_at),
            _ => None,
        }
    }

    /// Fire whichever timer is due at `now`.
    ///
    /// Returns a fetch to perform when a preview is shown without a cached
    /// result; a loading panel is displayed in the meantime.
    pub fn poll(&mut self, now: Instant) -> Option<FetchRequest> {
        match &self.state {
            HoverState::Pending { session, show_at } if now >= *show_at => {
                let session = session.clone();
                self.state = HoverState::Shown {
                    session: session.clone(),
                };

                if let Some(entry) = self.cache.get(&session.url) {
                    tracing::debug!(url = %session.url, "preview cache hit");
                    let content = PanelContent::from_result(&session.url, entry.result.clone());
                    self.display(content, &session);
                    return None;
                }

                tracing::debug!(url = %session.url, "preview cache miss");
                self.display(
                    PanelContent::Loading {
                        url: session.url.clone(),
                    },
                    &session,
                );
                Some(FetchRequest {
                    url: session.url,
                    link: session.link,
                    generation: session.generation,
                })
            }
            HoverState::Hiding { hide_at, .. } if now >= *hide_at => {
                self.teardown();
                None
            }
            _ => None,
        }
    }

    /// Record the outcome of a [`FetchRequest`].
    ///
    /// The result is always cached. It is displayed only if the request
    /// belongs to the current session and that session's panel is up.
    /// Returns whether the panel was updated.
    pub fn preview_resolved(&mut self, request: FetchRequest, result: PreviewResult) -> bool {
        self.cache.insert(&request.url, result.clone(), Utc::now());

        let current = match &self.state {
            HoverState::Shown { session } | HoverState::Hiding { session, .. }
                if session.generation == request.generation =>
            {
                session.clone()
            }
            _ => {
                tracing::debug!(url = %request.url, "stale preview cached, not displayed");
                return false;
            }
        };

        self.display(PanelContent::from_result(&request.url, result), &current);
        true
    }

    /// Drop cache entries past the retention window.
    pub fn sweep_cache(&mut self, now: DateTime<Utc>) -> usize {
        self.cache.sweep_expired(now, CACHE_RETENTION)
    }

    fn display(&mut self, content: PanelContent, session: &HoverSession) {
        self.panel = Some(self.renderer.render(content, session.pointer, self.viewport));
    }

    fn teardown(&mut self) {
        if let Some(session) = self.state.session() {
            tracing::debug!(link = session.link.0, "hover torn down");
        }
        self.panel = None;
        if !matches!(self.state, HoverState::Disabled) {
            self.state = HoverState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkpeek_core::{FailureKind, PreviewPage};

    const A: LinkId = LinkId(1);
    const B: LinkId = LinkId(2);
    const HREF_A: &str = "https://a.example/article";
    const HREF_B: &str = "https://b.example/post";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn controller() -> HoverController {
        HoverController::new(
            Url::parse("https://host.example/page").unwrap(),
            Settings::default(),
            Viewport::new(1280.0, 800.0),
        )
    }

    fn at() -> PagePoint {
        PagePoint::new(100.0, 100.0)
    }

    fn page_for(url: &Url) -> PreviewResult {
        PreviewResult::Page(PreviewPage::new(
            "<p>ok</p>".to_string(),
            "OK".to_string(),
            url.to_string(),
        ))
    }

    /// Hover A long enough to show it and return the fetch it asked for.
    fn show_a(c: &mut HoverController, t0: Instant) -> FetchRequest {
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.poll(t0 + ms(800)).unwrap()
    }

    // -- debounce --

    #[test]
    fn enter_arms_show_timer() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        assert!(matches!(c.state(), HoverState::Pending { .. }));
        assert_eq!(c.next_deadline(), Some(t0 + ms(800)));
        assert!(c.panel().is_none());
    }

    #[test]
    fn leave_before_delay_cancels() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.pointer_left_link(A, t0 + ms(300));

        assert_eq!(c.state(), &HoverState::Idle);
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.poll(t0 + ms(800)), None);
        assert!(c.panel().is_none());
    }

    #[test]
    fn poll_before_deadline_does_nothing() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        assert_eq!(c.poll(t0 + ms(799)), None);
        assert!(matches!(c.state(), HoverState::Pending { .. }));
    }

    #[test]
    fn reentering_pending_link_keeps_timer() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.pointer_entered_link(A, HREF_A, PagePoint::new(5.0, 5.0), t0 + ms(500));
        assert_eq!(c.next_deadline(), Some(t0 + ms(800)));
    }

    #[test]
    fn newer_link_supersedes_pending() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.pointer_entered_link(B, HREF_B, at(), t0 + ms(400));

        // A's timer would have fired at 800; only B's at 1200 exists.
        assert_eq!(c.poll(t0 + ms(800)), None);
        let request = c.poll(t0 + ms(1200)).unwrap();
        assert_eq!(request.link, B);
        assert_eq!(request.url.as_str(), HREF_B);
    }

    #[test]
    fn ignores_unqualified_links() {
        let mut c = controller();
        let t0 = Instant::now();
        for href in ["#top", "/local", "mailto:x@example.com", "javascript:void(0)"] {
            c.pointer_entered_link(A, href, at(), t0);
            assert_eq!(c.state(), &HoverState::Idle, "{href}");
        }
    }

    #[test]
    fn pointer_moved_updates_pending_position() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.pointer_moved(A, PagePoint::new(200.0, 150.0));
        c.poll(t0 + ms(800));
        assert_eq!(c.panel().unwrap().position, PagePoint::new(210.0, 160.0));
    }

    #[test]
    fn custom_delay() {
        let mut c = controller();
        c.apply_settings(Settings {
            delay: 250,
            ..Settings::default()
        });
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        assert_eq!(c.next_deadline(), Some(t0 + ms(250)));
    }

    // -- show and fetch --

    #[test]
    fn cache_miss_shows_loading_and_requests_fetch() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);

        assert_eq!(request.url.as_str(), HREF_A);
        assert!(matches!(c.state(), HoverState::Shown { .. }));
        assert!(c.panel().unwrap().content.is_loading());
    }

    #[test]
    fn result_replaces_loading_panel() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);
        let url = request.url.clone();

        assert!(c.preview_resolved(request, page_for(&url)));
        assert!(matches!(c.panel().unwrap().content, PanelContent::Page(_)));
        assert!(c.cache().get(&url).is_some());
    }

    #[test]
    fn cache_hit_displays_without_fetch() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);
        let url = request.url.clone();
        c.preview_resolved(request, page_for(&url));
        c.clicked();

        // A different link element pointing at the same URL.
        let t1 = t0 + ms(5000);
        c.pointer_entered_link(B, HREF_A, at(), t1);
        assert_eq!(c.poll(t1 + ms(800)), None);
        assert!(matches!(c.panel().unwrap().content, PanelContent::Page(_)));
    }

    #[test]
    fn cached_errors_replay_verbatim() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);
        c.preview_resolved(request, PreviewResult::failed(FailureKind::Timeout));
        assert!(matches!(
            &c.panel().unwrap().content,
            PanelContent::Failed { message, .. } if message == "Request timeout"
        ));
        c.clicked();

        let t1 = t0 + ms(3000);
        c.pointer_entered_link(A, HREF_A, at(), t1);
        assert_eq!(c.poll(t1 + ms(800)), None);
        assert!(matches!(
            &c.panel().unwrap().content,
            PanelContent::Failed { message, .. } if message == "Request timeout"
        ));
    }

    #[test]
    fn stale_result_is_cached_not_displayed() {
        let mut c = controller();
        let t0 = Instant::now();
        let stale = show_a(&mut c, t0);
        let stale_url = stale.url.clone();

        // Move on to B before A's fetch returns.
        c.pointer_entered_link(B, HREF_B, at(), t0 + ms(900));
        let fresh = c.poll(t0 + ms(1700)).unwrap();

        assert!(!c.preview_resolved(stale, page_for(&stale_url)));
        assert!(c.cache().get(&stale_url).is_some());
        assert!(c.panel().unwrap().content.is_loading());

        let fresh_url = fresh.url.clone();
        assert!(c.preview_resolved(fresh, page_for(&fresh_url)));
    }

    #[test]
    fn result_after_teardown_is_cached_only() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);
        let url = request.url.clone();
        c.clicked();

        assert!(!c.preview_resolved(request, page_for(&url)));
        assert!(c.panel().is_none());
        assert_eq!(c.cache().len(), 1);
    }

    // -- hiding --

    #[test]
    fn leaving_shown_link_hides_after_grace() {
        let mut c = controller();
        let t0 = Instant::now();
        show_a(&mut c, t0);
        c.pointer_left_link(A, t0 + ms(1000));

        assert!(matches!(c.state(), HoverState::Hiding { .. }));
        assert_eq!(c.next_deadline(), Some(t0 + ms(1200)));
        assert!(c.panel().is_some());

        c.poll(t0 + ms(1200));
        assert_eq!(c.state(), &HoverState::Idle);
        assert!(c.panel().is_none());
    }

    #[test]
    fn moving_onto_panel_keeps_it() {
        let mut c = controller();
        let t0 = Instant::now();
        show_a(&mut c, t0);
        c.pointer_left_link(A, t0 + ms(1000));
        c.pointer_entered_panel(t0 + ms(1100));

        assert!(matches!(c.state(), HoverState::Shown { .. }));
        c.poll(t0 + ms(1300));
        assert!(c.panel().is_some());

        c.pointer_left_panel(t0 + ms(2000));
        c.poll(t0 + ms(2200));
        assert!(c.panel().is_none());
    }

    #[test]
    fn reentering_link_during_grace_keeps_panel() {
        let mut c = controller();
        let t0 = Instant::now();
        show_a(&mut c, t0);
        c.pointer_left_link(A, t0 + ms(1000));
        c.pointer_entered_link(A, HREF_A, at(), t0 + ms(1100));

        assert!(matches!(c.state(), HoverState::Shown { .. }));
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn entering_other_link_replaces_panel() {
        let mut c = controller();
        let t0 = Instant::now();
        show_a(&mut c, t0);
        c.pointer_entered_link(B, HREF_B, at(), t0 + ms(1000));

        assert!(c.panel().is_none());
        assert!(matches!(c.state(), HoverState::Pending { session, .. } if session.link == B));
    }

    // -- click and enable --

    #[test]
    fn click_tears_down_everything() {
        let mut c = controller();
        let t0 = Instant::now();
        c.pointer_entered_link(A, HREF_A, at(), t0);
        c.clicked();
        assert_eq!(c.state(), &HoverState::Idle);
        assert_eq!(c.next_deadline(), None);

        show_a(&mut c, t0);
        c.clicked();
        assert!(c.panel().is_none());
    }

    #[test]
    fn disabling_stops_everything() {
        let mut c = controller();
        let t0 = Instant::now();
        show_a(&mut c, t0);
        c.set_enabled(false);

        assert_eq!(c.state(), &HoverState::Disabled);
        assert!(c.panel().is_none());

        c.pointer_entered_link(B, HREF_B, at(), t0 + ms(2000));
        assert_eq!(c.state(), &HoverState::Disabled);
        c.clicked();
        assert_eq!(c.state(), &HoverState::Disabled);

        c.set_enabled(true);
        assert_eq!(c.state(), &HoverState::Idle);
    }

    #[test]
    fn starts_disabled_from_settings() {
        let c = HoverController::new(
            Url::parse("https://host.example/").unwrap(),
            Settings {
                enabled: false,
                ..Settings::default()
            },
            Viewport::new(800.0, 600.0),
        );
        assert_eq!(c.state(), &HoverState::Disabled);
    }

    #[test]
    fn settings_resize_panel() {
        let mut c = controller();
        c.apply_settings(Settings {
            preview_width: 640,
            preview_height: 480,
            ..Settings::default()
        });
        let t0 = Instant::now();
        show_a(&mut c, t0);
        assert_eq!(c.panel().unwrap().size.width, 640.0);
        assert_eq!(c.panel().unwrap().size.height, 480.0);
    }

    #[test]
    fn sweep_uses_retention_window() {
        let mut c = controller();
        let t0 = Instant::now();
        let request = show_a(&mut c, t0);
        let url = request.url.clone();
        c.preview_resolved(request, page_for(&url));

        assert_eq!(c.sweep_cache(Utc::now()), 0);
        assert_eq!(c.sweep_cache(Utc::now() + chrono::TimeDelta::hours(25)), 1);
        assert!(c.cache().is_empty());
    }
}
