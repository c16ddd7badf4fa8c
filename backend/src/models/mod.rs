pub mod assignment;
pub mod contact;
pub mod message;
pub mod session;
pub mod volunteer;
