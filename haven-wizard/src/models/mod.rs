pub mod log;
pub mod requests;
pub mod responses;
pub mod state;
