//! Response bodies rendered from device state. Rendering never mutates state.

use core::fmt::{self, Write};

use crate::{state::DeviceState, text_policy::write_html_escaped};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Buffer sizes that fit every body the renderer produces.
pub const HEAD_BYTES: usize = 128;
pub const JSON_BYTES: usize = 96;
pub const PAGE_BYTES: usize = 4096;

/// Values served by the JSON data endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub temperature: f32,
    pub humidity: f32,
    pub distance: Option<f32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResponseRenderer {
    refresh_interval_ms: u32,
}

impl ResponseRenderer {
    pub const fn new(refresh_interval_ms: u32) -> Self {
        Self {
            refresh_interval_ms,
        }
    }

    /// Status line and headers for a `200 OK` with a body of `content_length` bytes.
    pub fn head<W: Write>(
        &self,
        out: &mut W,
        content_type: &str,
        content_length: usize,
    ) -> fmt::Result {
        write!(
            out,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: {content_type}\r\n\
             Content-Length: {content_length}\r\n\
             Connection: close\r\n\
             \r\n"
        )
    }

    /// `{"temp": .., "hum": .., "distance": ..|null}`
    ///
    /// Temperature and humidity are already rounded to tenths; the distance is
    /// written at full precision.
    pub fn json<W: Write>(&self, out: &mut W, snapshot: &Snapshot) -> fmt::Result {
        write!(
            out,
            "{{\"temp\": {:.1}, \"hum\": {:.1}, \"distance\": ",
            snapshot.temperature, snapshot.humidity
        )?;
        match snapshot.distance {
            Some(cm) => write!(out, "{cm:?}")?,
            None => out.write_str("null")?,
        }
        out.write_char('}')
    }

    /// Full control page.
    pub fn page<W: Write>(
        &self,
        out: &mut W,
        state: &DeviceState,
        actuator_on: bool,
    ) -> fmt::Result {
        out.write_str(PAGE_HEAD)?;

        write!(
            out,
            "<body>\n  <h2>ESP Sensor Server</h2>\n  <p>LED is <strong>{}</strong></p>\n",
            if actuator_on { "ON" } else { "OFF" }
        )?;
        out.write_str(
            "  <p><a href=\"/?led=on\"><button class=\"button\">ON</button></a>\n     \
             <a href=\"/?led=off\"><button class=\"button button2\">OFF</button></a></p>\n",
        )?;
        if state.sensor_error() {
            out.write_str("  <p style='color:red'>Sensor error</p>\n")?;
        }
        write!(
            out,
            "  <div id=\"sensors\">\n    <p>Temperature: {:.1}&deg;C</p>\n    \
             <p>Humidity: {:.1}%</p>\n  </div>\n",
            state.temperature(),
            state.humidity()
        )?;
        match state.last_distance() {
            Some(cm) => write!(out, "  <p>Last distance: {cm:.1} cm</p>\n")?,
            None => out.write_str("  <p>Last distance: unavailable</p>\n")?,
        }

        write!(
            out,
            "  <div class=\"mode-info\">\n    \
             <p>Current Display Mode: <strong>{}</strong></p>\n    <p>\n      \
             <a href=\"/?mode=distance\"><button class=\"button button3\">Show Distance</button></a>\n      \
             <a href=\"/?mode=temperature\"><button class=\"button button4\">Show Temperature</button></a>\n      \
             <a href=\"/?mode=clear\"><button class=\"button\">Clear LCD</button></a>\n    \
             </p>\n  </div>\n",
            state.display_mode().label()
        )?;

        out.write_str(
            "  <hr>\n  <h3>Send Custom Message to LCD</h3>\n  \
             <form action=\"/\" method=\"get\">\n    \
             <input type=\"text\" name=\"msg\" placeholder=\"Enter a message... \">\n    \
             <input type=\"submit\" value=\"Send\">\n  </form>\n",
        )?;
        if !state.custom_message().is_empty() {
            out.write_str("  <p>LCD Message: ")?;
            write_html_escaped(out, state.custom_message())?;
            out.write_str("</p>\n")?;
        }

        write!(
            out,
            "  <script>\n  setInterval(function(){{\n      \
             fetch('/data').then(r => r.json()).then(data => {{\n          \
             document.getElementById(\"sensors\").innerHTML =\n              \
             \"<p>Temperature: \" + data.temp + \"&deg;C</p>\" +\n              \
             \"<p>Humidity: \" + data.hum + \"%</p>\";\n      \
             }});\n  }}, {});\n  </script>\n</body></html>",
            self.refresh_interval_ms
        )
    }
}

const PAGE_HEAD: &str = "<!DOCTYPE html><html>\n\
<head><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<meta http-equiv=\"Cache-Control\" content=\"no-cache, no-store, must-revalidate\">\n\
<meta http-equiv=\"Pragma\" content=\"no-cache\">\n\
<meta http-equiv=\"Expires\" content=\"0\">\n\
<style>\n\
body { font-family: Arial; text-align:center; }\n\
.button { background:#e7bd3b; padding:14px; font-size:20px; color:white; border:none; margin:5px; }\n\
.button2 { background:#4286f4; }\n\
.button3 { background:#4CAF50; }\n\
.button4 { background:#f44336; }\n\
input[type=text] { padding:10px; font-size:16px; width: 80%; }\n\
.mode-info { margin: 15px; padding: 10px; background: #f0f0f0; border-radius: 5px; }\n\
</style></head>\n";
