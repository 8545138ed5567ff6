pub mod auth;
pub mod camera;
pub mod email;
pub mod rest;

pub use auth::RestAuthAdapter;
pub use camera::FrameSourceCamera;
pub use email::SmtpEmailAdapter;
pub use rest::RestDataAdapter;
