//! Runtime tunables shared by the core and the board loop.

/// Characters per display row on the 1602 panel.
pub const DISPLAY_COLUMNS: u8 = 16;
/// Visible display rows.
pub const DISPLAY_ROWS: u8 = 2;
/// Upper bound for a pulse-echo wait before the reading counts as a timeout.
pub const ECHO_TIMEOUT_US: u32 = 30_000;
/// Text shown in Custom mode right after boot.
pub const READY_BANNER: &str = "ESP Sensor Ready";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StationConfig {
    pub display_columns: u8,
    pub display_rows: u8,
    pub echo_timeout_us: u32,
    pub http_port: u16,
    /// Pause after every request/response cycle.
    pub request_pause_ms: u64,
    pub socket_timeout_secs: u64,
    /// Client-side polling period of the JSON snapshot on the HTML page.
    pub refresh_interval_ms: u32,
    pub ready_banner: &'static str,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            display_columns: DISPLAY_COLUMNS,
            display_rows: DISPLAY_ROWS,
            echo_timeout_us: ECHO_TIMEOUT_US,
            http_port: 80,
            request_pause_ms: 100,
            socket_timeout_secs: 10,
            refresh_interval_ms: 3_000,
            ready_banner: READY_BANNER,
        }
    }
}

