//! Per-request dispatch: apply commands, refresh sensors, redraw, pick a response.

use log::{debug, info, warn};

use crate::{
    command::{ModeCommand, ParsedCommand},
    config::StationConfig,
    display::{CharDisplay, DisplayFrame, DisplayStateMachine},
    response::Snapshot,
    sensor::{ClimateSensor, RangeSensor, SensorReader},
    state::{DeviceState, DisplayMode},
};

/// Binary output (the status LED).
pub trait Actuator {
    type Error;

    fn set_on(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Current output level as driven.
    fn is_on(&mut self) -> bool;
}

/// Which of the three request shapes arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestTarget {
    /// Browser probe (`favicon.ico`); answered by closing the connection.
    Noise,
    /// JSON snapshot (`GET /data`).
    Data,
    /// HTML control page.
    Page,
}

impl RequestTarget {
    pub fn classify(raw_request: &str) -> Self {
        if raw_request.contains("favicon.ico") {
            Self::Noise
        } else if raw_request.contains("GET /data") {
            Self::Data
        } else {
            Self::Page
        }
    }
}

/// Outcome of one request cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Response {
    /// Close without writing anything.
    Close,
    Json(Snapshot),
    Page { actuator_on: bool },
}

pub struct RequestRouter<C, R, D, A>
where
    C: ClimateSensor,
    R: RangeSensor,
    D: CharDisplay,
    A: Actuator,
{
    sensors: SensorReader<C, R>,
    display: D,
    actuator: A,
    machine: DisplayStateMachine,
    display_fault_logged: bool,
}

impl<C, R, D, A> RequestRouter<C, R, D, A>
where
    C: ClimateSensor,
    R: RangeSensor,
    D: CharDisplay,
    A: Actuator,
{
    pub fn new(
        sensors: SensorReader<C, R>,
        display: D,
        actuator: A,
        config: &StationConfig,
    ) -> Self {
        Self {
            sensors,
            display,
            actuator,
            machine: DisplayStateMachine::new(config.display_columns),
            display_fault_logged: false,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Runs one full request cycle against `state`.
    pub fn handle(&mut self, state: &mut DeviceState, raw_request: &str) -> Response {
        let target = RequestTarget::classify(raw_request);
        if target == RequestTarget::Noise {
            debug!("router: dropping noise request");
            return Response::Close;
        }

        let command = ParsedCommand::parse(raw_request);
        self.apply(state, &command);

        if let Err(err) = self.sensors.measure(state) {
            warn!("router: climate read failed ({})", err.kind());
        }

        self.refresh_display(state);

        match target {
            RequestTarget::Data => {
                // Independent of any pulse fired while rendering the display.
                let distance = self.sensors.measure_distance();
                state.record_distance(distance);
                Response::Json(Snapshot {
                    temperature: state.temperature(),
                    humidity: state.humidity(),
                    distance,
                })
            }
            _ => Response::Page {
                actuator_on: self.actuator.is_on(),
            },
        }
    }

    /// Redraws the display for the current mode. Failures are logged once per streak.
    pub fn refresh_display(&mut self, state: &mut DeviceState) -> Option<DisplayFrame> {
        let sensors = &mut self.sensors;
        match self
            .machine
            .render(state, &mut self.display, || sensors.measure_distance())
        {
            Ok(frame) => {
                self.display_fault_logged = false;
                Some(frame)
            }
            Err(_) => {
                if !self.display_fault_logged {
                    warn!("router: display write failed");
                    self.display_fault_logged = true;
                }
                None
            }
        }
    }

    fn apply(&mut self, state: &mut DeviceState, command: &ParsedCommand) {
        if let Some(actuator) = command.actuator {
            if self.actuator.set_on(actuator.is_on()).is_err() {
                warn!("router: actuator write failed");
            } else {
                info!("router: led {}", if actuator.is_on() { "on" } else { "off" });
            }
        }

        match command.mode {
            Some(ModeCommand::Distance) => state.set_display_mode(DisplayMode::Distance),
            Some(ModeCommand::Temperature) => state.set_display_mode(DisplayMode::Temperature),
            Some(ModeCommand::Clear) => state.clear_message(),
            Some(ModeCommand::Custom) => state.set_display_mode(DisplayMode::Custom),
            None => {}
        }

        // A message always wins over a mode command in the same request.
        if let Some(message) = command.message.as_deref() {
            state.set_custom_message(message);
        }

        if let Some(mode) = command.mode {
            debug!("router: mode command {:?} -> {:?}", mode, state.display_mode());
        }
    }
}

#[cfg(test)]
mod tests;
