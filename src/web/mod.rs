pub mod admin;
pub mod admin_utils;
pub mod auth;
pub mod gesture;
pub mod public;
pub mod router;
pub mod session;
pub mod state;
pub mod templates;
pub mod uploads;

pub use session::AdminSession;
pub use state::AppState;
pub use templates::{escape_html, render_login_page};
