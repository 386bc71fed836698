// Start of file: /src/utils/mod.rs

/*
    * HTTP helpers for the health server: layer error mapping and the
    * JSON response envelope.
*/

pub mod error_handler;
pub mod response_handler;

// End of file: /src/utils/mod.rs
