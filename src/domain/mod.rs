pub mod category;
pub mod email;
pub mod stats;
