pub mod dht22;
pub mod ultrasonic;
