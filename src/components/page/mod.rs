mod actor;
pub mod calendar_selector;
mod engine;
pub mod injector;
pub mod locator;
pub mod memory;
pub mod overlay;
pub mod selectors;
pub mod tree;

pub use actor::{PageActor, PageActorHandle, PageCommand, PageTask};
pub use calendar_selector::{CalendarSwitch, OptionPick};
pub use engine::{EventOutcome, PageEngine, RefreshRequester, Scheduler, Timer};
pub use locator::{FieldBinding, FieldLocator, ScanReport};
pub use memory::{ElementSpec, MemoryPage};
pub use overlay::{Navigation, Overlay, OverlayPosition, OverlayRow, OverlayView};
pub use tree::{
    EventKind, Key, NodeId, OverlaySurface, PageHost, PageTree, Rect, StructureNotifier,
    SyntheticEvent,
};
