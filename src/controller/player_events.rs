//! Transport event listener

use tokio::task::JoinHandle;

use crate::model::{Notice, PlaybackState};
use crate::transport::{TransportEvent, TransportEventReceiver, TransportState};

use super::playback::Direction;
use super::AppController;

impl AppController {
    pub fn start_player_event_listener(&self, mut events: TransportEventReceiver) -> JoinHandle<()> {
        let controller = self.clone();
        tracing::info!("Starting transport event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if controller.model.lock().await.should_quit() {
                    tracing::debug!("Transport event listener shutting down");
                    break;
                }
                controller.handle_transport_event(event).await;
            }
        })
    }

    /// React to one transport callback. Runs as a single transition under the model lock.
    ///
    /// Lifecycle events from a load that has since been replaced or closed are dropped.
    pub async fn handle_transport_event(&self, event: TransportEvent) {
        let mut model = self.model.lock().await;

        match event {
            TransportEvent::Ready { load } => {
                if !model.is_current_load(load) {
                    tracing::debug!(load, "Ignoring ready from a replaced load");
                    return;
                }
                tracing::debug!(load, "TransportEvent::Ready");
                match self.transport.play() {
                    Ok(()) => model.set_playing(true),
                    Err(e) => {
                        self.transport_failed(&mut model, e.into());
                    }
                }
            }
            TransportEvent::StateChanged { load, state } if !model.is_current_load(load) => {
                tracing::debug!(load, ?state, "Ignoring state change from a replaced load");
            }
            TransportEvent::StateChanged { state: TransportState::Playing, .. } => {
                tracing::trace!("TransportEvent::Playing");
                model.set_playing(true);
                model.set_duration(self.transport.duration());
                self.start_progress_poller(&mut model);
            }
            TransportEvent::StateChanged { state: TransportState::Paused, .. } => {
                tracing::debug!("TransportEvent::Paused");
                model.set_playing(false);
                model.cancel_progress_task();
            }
            TransportEvent::StateChanged { state: TransportState::Ended, .. } => {
                tracing::debug!(state = ?model.state(), "TransportEvent::Ended");
                model.cancel_progress_task();
                model.set_playing(false);
                model.reset_position();

                if model.state() == PlaybackState::PlayingInPlaylist {
                    // Failures are already reported on the model
                    let _ = self.step_locked(&mut model, Direction::Next).await;
                } else {
                    self.close_locked(&mut model);
                }
            }
            TransportEvent::Error(e) => {
                tracing::error!(error = %e, "TransportEvent::Error");
                self.close_locked(&mut model);
                model.set_notice(Notice::error(format!("Player error: {}. Playback stopped.", e)));
            }
        }
    }
}
