pub mod extractor;
pub mod password;
pub mod session;
