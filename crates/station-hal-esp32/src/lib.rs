#![no_std]

//! ESP32 board adapters for the sensor station core traits.

pub mod network;
pub mod platform;
pub mod sensors;
