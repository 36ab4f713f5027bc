//! Two-track editing core: the state store, the playback synchronizer that
//! keeps two host media elements in step with one playhead, drag
//! reconciliation, and the session that wires them to background loading.

pub mod config;
pub mod drag;
pub mod session;
pub mod state;
pub mod sync;
pub mod view;

pub use config::{ConfigError, EditorConfig, LoadPlacement};
pub use drag::{DragReconciler, DragState};
pub use session::{Editor, LoadStatus};
pub use state::{reduce, Action, EditorState, PlaybackPhase, Store, StoreHandle};
pub use sync::Synchronizer;
pub use view::{TimelineView, TrackBarView};
