pub mod equipment;
pub mod request;
pub mod result;
