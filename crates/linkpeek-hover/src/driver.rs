//! Event loop that runs a [`HoverController`] against real time and a real
//! [`PreviewClient`].
//!
//! Single task, cooperative: host events, the controller's next timer and
//! in-flight fetches are multiplexed with `tokio::select!`. Superseded fetches
//! are left to finish so their results still reach the cache.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use linkpeek_core::PreviewResult;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::client::PreviewClient;
use crate::controller::{FetchRequest, HoverController, LinkId};
use crate::render::{PagePoint, PreviewPanel, Viewport};
use crate::settings::Settings;

/// Input from the host page.
#[derive(Debug, Clone)]
pub enum HoverEvent {
    LinkEntered {
        link: LinkId,
        href: String,
        pointer: PagePoint,
    },
    PointerMoved {
        link: LinkId,
        pointer: PagePoint,
    },
    LinkLeft {
        link: LinkId,
    },
    PanelEntered,
    PanelLeft,
    Clicked,
    SettingsChanged(Settings),
    ViewportChanged(Viewport),
    /// Sent periodically by the host's expiry scheduler.
    SweepCache,
}

pub struct HoverDriver<C> {
    controller: HoverController,
    client: Arc<C>,
    panels: watch::Sender<Option<PreviewPanel>>,
}

impl<C: PreviewClient + 'static> HoverDriver<C> {
    /// Returns the driver and a receiver the host draws panels from.
    pub fn new(controller: HoverController, client: C) -> (Self, watch::Receiver<Option<PreviewPanel>>) {
        let (panels, rx) = watch::channel(None);
        let driver = Self {
            controller,
            client: Arc::new(client),
            panels,
        };
        (driver, rx)
    }

    /// Run until the event channel closes, then hand back the controller.
    pub async fn run(mut self, mut events: mpsc::Receiver<HoverEvent>) -> HoverController {
        let mut in_flight = FuturesUnordered::new();

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event, Instant::now()),
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    if let Some(request) = self.controller.poll(Instant::now()) {
                        tracing::debug!(url = %request.url, "requesting preview");
                        in_flight.push(fetch(Arc::clone(&self.client), request));
                    }
                }
                Some((request, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.controller.preview_resolved(request, result);
                }
            }

            self.publish();
        }

        self.controller
    }

    fn handle(&mut self, event: HoverEvent, now: Instant) {
        let c = &mut self.controller;
        match event {
            HoverEvent::LinkEntered { link, href, pointer } => {
                c.pointer_entered_link(link, &href, pointer, now)
            }
            HoverEvent::PointerMoved { link, pointer } => c.pointer_moved(link, pointer),
            HoverEvent::LinkLeft { link } => c.pointer_left_link(link, now),
            HoverEvent::PanelEntered => c.pointer_entered_panel(now),
            HoverEvent::PanelLeft => c.pointer_left_panel(now),
            HoverEvent::Clicked => c.clicked(),
            HoverEvent::SettingsChanged(settings) => c.apply_settings(settings),
            HoverEvent::ViewportChanged(viewport) => c.set_viewport(viewport),
            HoverEvent::SweepCache => {
                c.sweep_cache(chrono::Utc::now());
            }
        }
    }

    fn publish(&self) {
        let panel = self.controller.panel().cloned();
        self.panels.send_if_modified(|current| {
            if *current == panel {
                false
            } else {
                *current = panel;
                true
            }
        });
    }
}

fn fetch<C: PreviewClient>(
    client: Arc<C>,
    request: FetchRequest,
) -> impl Future<Output = (FetchRequest, PreviewResult)> + Send {
    async move {
        let result = client.request_preview(&request.url).await;
        (request, result)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use linkpeek_core::{FailureKind, PreviewPage};
    use tokio::task::JoinHandle;
    use url::Url;

    use super::*;
    use crate::render::PanelContent;

    const A: LinkId = LinkId(1);
    const HREF_A: &str = "https://a.example/article";

    /// Client that records calls and answers after a fixed latency.
    #[derive(Clone)]
    struct FakeClient {
        calls: Arc<Mutex<Vec<Url>>>,
        latency: Duration,
        result: Option<PreviewResult>,
    }

    impl FakeClient {
        fn new(latency: Duration, result: Option<PreviewResult>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                latency,
                result,
            }
        }

        fn calls(&self) -> Vec<Url> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PreviewClient for FakeClient {
        async fn request_preview(&self, url: &Url) -> PreviewResult {
            self.calls.lock().unwrap().push(url.clone());
            tokio::time::sleep(self.latency).await;
            self.result.clone().unwrap_or_else(|| {
                PreviewResult::Page(PreviewPage::new(
                    "<p>ok</p>".to_string(),
                    "OK".to_string(),
                    url.to_string(),
                ))
            })
        }
    }

    struct Harness {
        events: mpsc::Sender<HoverEvent>,
        panels: watch::Receiver<Option<PreviewPanel>>,
        task: JoinHandle<HoverController>,
    }

    impl Harness {
        fn start(client: FakeClient) -> Self {
            let controller = HoverController::new(
                Url::parse("https://host.example/").unwrap(),
                Settings::default(),
                Viewport::new(1280.0, 800.0),
            );
            let (driver, panels) = HoverDriver::new(controller, client);
            let (events, rx) = mpsc::channel(16);
            let task = tokio::spawn(driver.run(rx));
            Self { events, panels, task }
        }

        async fn send(&self, event: HoverEvent) {
            self.events.send(event).await.unwrap();
        }

        fn content(&self) -> Option<PanelContent> {
            self.panels.borrow().as_ref().map(|p| p.content.clone())
        }

        async fn finish(self) -> HoverController {
            drop(self.events);
            self.task.await.unwrap()
        }
    }

    fn enter(link: LinkId, href: &str) -> HoverEvent {
        HoverEvent::LinkEntered {
            link,
            href: href.to_string(),
            pointer: PagePoint::new(50.0, 50.0),
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn brief_hover_makes_no_call() {
        let client = FakeClient::new(Duration::from_millis(50), None);
        let h = Harness::start(client.clone());

        h.send(enter(A, HREF_A)).await;
        sleep_ms(300).await;
        h.send(HoverEvent::LinkLeft { link: A }).await;
        sleep_ms(2000).await;

        assert!(h.content().is_none());
        h.finish().await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_hover_loads_then_shows() {
        let client = FakeClient::new(Duration::from_millis(100), None);
        let h = Harness::start(client.clone());

        h.send(enter(A, HREF_A)).await;
        sleep_ms(850).await;
        assert!(matches!(h.content(), Some(PanelContent::Loading { .. })));

        sleep_ms(150).await;
        assert!(matches!(h.content(), Some(PanelContent::Page(_))));

        h.finish().await;
        assert_eq!(client.calls(), vec![Url::parse(HREF_A).unwrap()]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_hover_served_from_cache() {
        let client = FakeClient::new(Duration::from_millis(100), None);
        let h = Harness::start(client.clone());

        h.send(enter(A, HREF_A)).await;
        sleep_ms(1000).await;
        h.send(HoverEvent::Clicked).await;
        sleep_ms(10).await;
        assert!(h.content().is_none());

        // Another element linking to the same destination.
        h.send(enter(LinkId(7), HREF_A)).await;
        sleep_ms(801).await;
        assert!(matches!(h.content(), Some(PanelContent::Page(_))));

        h.finish().await;
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_error_is_shown_and_cached() {
        let timeout = PreviewResult::failed(FailureKind::Timeout);
        let client = FakeClient::new(Duration::from_secs(10), Some(timeout.clone()));
        let h = Harness::start(client.clone());

        h.send(enter(A, HREF_A)).await;
        sleep_ms(800 + 10_000 + 10).await;
        assert!(matches!(
            h.content(),
            Some(PanelContent::Failed { message, .. }) if message == "Request timeout"
        ));

        let controller = h.finish().await;
        let cached = controller.cache().get(&Url::parse(HREF_A).unwrap()).unwrap();
        assert_eq!(cached.result, timeout);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_fetch_still_fills_cache() {
        let client = FakeClient::new(Duration::from_millis(500), None);
        let h = Harness::start(client.clone());

        h.send(enter(A, HREF_A)).await;
        sleep_ms(900).await;
        h.send(enter(LinkId(2), "https://b.example/")).await;
        sleep_ms(450).await;

        // A's response landed at 1300ms while B was pending.
        assert!(h.content().is_none());

        let controller = h.finish().await;
        assert!(controller.cache().get(&Url::parse(HREF_A).unwrap()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_period_hides_panel() {
        let client = FakeClient::new(Duration::from_millis(10), None);
        let h = Harness::start(client);

        h.send(enter(A, HREF_A)).await;
        sleep_ms(900).await;
        h.send(HoverEvent::LinkLeft { link: A }).await;
        sleep_ms(100).await;
        assert!(h.content().is_some());

        h.send(HoverEvent::PanelEntered).await;
        sleep_ms(500).await;
        assert!(h.content().is_some());

        h.send(HoverEvent::PanelLeft).await;
        sleep_ms(250).await;
        assert!(h.content().is_none());

        h.finish().await;
    }
}
