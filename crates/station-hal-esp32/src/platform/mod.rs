pub mod lcd;
pub mod led;
