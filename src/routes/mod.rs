pub mod callbacks;

pub use callbacks::{callback_router, callback_routes};
