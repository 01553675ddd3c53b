#![cfg_attr(not(test), no_std)]

//! Board-agnostic controller logic for the sensor station.
//!
//! Every HTTP request runs one full cycle through this crate: the query string
//! is decoded into commands, the commands mutate [`state::DeviceState`], the
//! sensors are refreshed, the character display is redrawn and a response body
//! is selected. Hardware is reached only through the collaborator traits
//! ([`sensor::ClimateSensor`], [`sensor::RangeSensor`],
//! [`display::CharDisplay`], [`router::Actuator`]).

pub mod command;
pub mod config;
pub mod display;
pub mod response;
pub mod router;
pub mod sensor;
pub mod state;
pub mod text_policy;
