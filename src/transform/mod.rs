pub mod envsub;
pub mod fetch;
pub mod substitute;
