//! Periodic progress poller.
//!
//! One poller per loaded session: its abort handle lives in the model next to
//! the session, and every path that ends or replaces the session cancels it.

use tokio::time::MissedTickBehavior;

use crate::model::AppModel;

use super::AppController;

impl AppController {
    /// (Re)start polling the transport position. Any previous poller is cancelled.
    pub(crate) fn start_progress_poller(&self, model: &mut AppModel) {
        let shared_model = self.model.clone();
        let transport = self.transport.clone();
        let interval = self.progress_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let mut model = shared_model.lock().await;
                if !model.session().is_loaded() {
                    break;
                }
                let current = transport.current_time();
                let duration = transport.duration();
                if !model.update_progress(current, duration) {
                    tracing::trace!(current, "Progress update suppressed by seek latch");
                }
            }
        });

        model.replace_progress_task(handle.abort_handle());
        tracing::trace!(interval_ms = interval.as_millis() as u64, "Progress poller started");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::test_support::{track, Harness};
    use crate::transport::TransportState;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poller_tracks_transport_position() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.transport.set_position(3.0, 200.0);
        h.controller
            .handle_transport_event(h.event(TransportState::Playing).await)
            .await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        settle().await;

        let info = h.controller.playback_info().await;
        assert_eq!(info.progress_seconds, 3.0);
        assert_eq!(info.duration_seconds, 200.0);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_yields_to_seek_latch() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.controller
            .handle_transport_event(h.event(TransportState::Playing).await)
            .await;

        h.controller.begin_seek().await;
        h.transport.set_position(5.0, 100.0);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(h.controller.playback_info().await.progress_seconds, 0.0);

        h.controller.end_seek(50.0).await.unwrap();
        h.transport.set_position(51.0, 100.0);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(h.controller.playback_info().await.progress_seconds, 51.0);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_does_not_outlive_the_session() {
        let h = Harness::new();
        h.controller.play_track(track("a")).await.unwrap();
        h.controller
            .handle_transport_event(h.event(TransportState::Playing).await)
            .await;
        assert!(h.controller.model.lock().await.has_progress_task());

        h.controller
            .handle_transport_event(h.event(TransportState::Paused).await)
            .await;
        assert!(!h.controller.model.lock().await.has_progress_task());

        h.controller
            .handle_transport_event(h.event(TransportState::Playing).await)
            .await;
        h.controller.close().await;
        assert!(!h.controller.model.lock().await.has_progress_task());

        h.transport.set_position(9.0, 10.0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(h.controller.playback_info().await.progress_seconds, 0.0);
    }
}
