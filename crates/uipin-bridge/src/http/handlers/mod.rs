//! Bridge request handlers.

mod events;
mod misc;
mod tasks;

pub use events::task_events;
pub use misc::{health_check, overlay_script};
pub use tasks::{cancel_task, create_task, submit_task};
