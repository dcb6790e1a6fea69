// Application state for HTTP handlers
use crate::application::engine::EngineEvent;
use crate::infrastructure::frame_store::FrameStore;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    pub frames: FrameStore,
    pub events: mpsc::Sender<EngineEvent>,
}
