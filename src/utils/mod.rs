pub mod email;
pub mod error;
pub mod gemini;
pub mod hashing;
pub mod helpers;
pub mod id_set;
pub mod model;
pub mod timestamp;
pub mod uploads;
