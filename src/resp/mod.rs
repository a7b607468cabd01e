pub mod json;
pub mod jwt;
pub mod problem;
pub mod toast;
pub mod util;
