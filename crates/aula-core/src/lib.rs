pub mod config;
pub mod context;
pub mod dialog;
pub mod dialogs;
pub mod engine;
pub mod error;
pub mod interruption;
pub mod records;
pub mod services;
pub mod step;
pub mod timex;
pub mod turn_lock;

pub use config::*;
pub use context::*;
pub use dialog::*;
pub use engine::*;
pub use error::*;
pub use interruption::*;
pub use records::*;
pub use services::*;
pub use turn_lock::*;
