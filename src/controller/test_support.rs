//! Shared fixtures for engine tests

use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::model::{AppModel, LibraryStore, Track};
use crate::transport::{LoadId, LoadOptions, Transport, TransportEvent, TransportState};

use super::AppController;

#[derive(Clone, Debug, PartialEq)]
pub enum TransportCall {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(f64),
}

#[derive(Default)]
struct Recorded {
    calls: Vec<TransportCall>,
    fail_load: bool,
    fail_play: bool,
    loads: LoadId,
    current_time: f64,
    duration: f64,
}

/// Transport that records every control call and never emits events.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<StdMutex<Recorded>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn loaded_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Load(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.inner.lock().unwrap().fail_load = fail;
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.inner.lock().unwrap().fail_play = fail;
    }

    pub fn set_position(&self, current_time: f64, duration: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.current_time = current_time;
        inner.duration = duration;
    }

    fn record(&self, call: TransportCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl Transport for RecordingTransport {
    fn load(&self, track_id: &str, _options: &LoadOptions) -> Result<LoadId, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_load {
            return Err(TransportError::Load {
                track_id: track_id.to_string(),
                reason: "widget crashed".to_string(),
            });
        }
        inner.loads += 1;
        inner.calls.push(TransportCall::Load(track_id.to_string()));
        Ok(inner.loads)
    }

    fn play(&self) -> Result<(), TransportError> {
        if self.inner.lock().unwrap().fail_play {
            return Err(TransportError::Command("autoplay blocked".to_string()));
        }
        self.record(TransportCall::Play);
        Ok(())
    }

    fn pause(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Pause);
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Stop);
        Ok(())
    }

    fn seek(&self, seconds: f64) -> Result<(), TransportError> {
        self.record(TransportCall::Seek(seconds));
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().current_time
    }

    fn duration(&self) -> f64 {
        self.inner.lock().unwrap().duration
    }
}

pub struct Harness {
    pub controller: AppController,
    pub transport: RecordingTransport,
    pub store: LibraryStore,
}

impl Harness {
    pub fn new() -> Self {
        let store = LibraryStore::open_in_memory(None).expect("in-memory store");
        let transport = RecordingTransport::default();
        let controller = AppController::new(
            Arc::new(Mutex::new(AppModel::new())),
            store.clone(),
            Arc::new(transport.clone()),
        );
        Self {
            controller,
            transport,
            store,
        }
    }

    /// Create a playlist holding tracks with the given ids.
    pub async fn playlist(&self, name: &str, ids: &[&str]) -> i64 {
        let playlist = self.store.create_playlist(name).await.unwrap();
        for id in ids {
            self.store
                .add_video_to_playlist(playlist.id, track(id))
                .await
                .unwrap();
        }
        playlist.id
    }

    pub async fn playing(&self) -> Option<String> {
        self.controller
            .model
            .lock()
            .await
            .playing_track_id()
            .map(str::to_string)
    }

    pub async fn index(&self) -> usize {
        self.controller.model.lock().await.cursor().index()
    }

    pub async fn snapshot_ids(&self) -> Vec<String> {
        self.controller
            .model
            .lock()
            .await
            .cursor()
            .snapshot()
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    /// A lifecycle event for whatever the session currently has loaded.
    pub async fn event(&self, state: TransportState) -> TransportEvent {
        TransportEvent::StateChanged {
            load: self.current_load().await,
            state,
        }
    }

    pub async fn ready(&self) -> TransportEvent {
        TransportEvent::Ready {
            load: self.current_load().await,
        }
    }

    pub async fn current_load(&self) -> LoadId {
        self.controller
            .model
            .lock()
            .await
            .current_load()
            .unwrap_or_default()
    }

    pub async fn notice(&self) -> String {
        self.controller
            .model
            .lock()
            .await
            .notice()
            .map(|n| n.message.clone())
            .unwrap_or_default()
    }
}

pub fn track(id: &str) -> Track {
    Track {
        channel_label: "Channel".to_string(),
        ..Track::new(id, id.to_uppercase())
    }
}
