pub mod events;
pub mod nav;
pub mod scanner;
pub mod state;
pub mod verification;

// Re-export the main controller types to make them easily accessible
// to the binary that wires the app shell together.
pub use events::{ScannerEvent, UiEvent, VerificationEvent};
pub use nav::{visibility, NavPresenter, NavView};
pub use scanner::{ScannerController, ScannerState};
pub use state::AppState;
pub use verification::{SchedulePage, ScheduleForm, VerificationManager};
