#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{DriveMode, Flex, Input, InputConfig, Level, Output, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, I2c},
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ClientConfig, ModeConfig};
use log::{LevelFilter, info, warn};
use static_cell::StaticCell;
use station_core::{
    config::StationConfig,
    router::RequestRouter,
    sensor::SensorReader,
    state::DeviceState,
};
use station_hal_esp32::{
    network::{ConnectivityHandle, WifiConfig},
    platform::{lcd::CharLcd, led::Led},
    sensors::{dht22::Dht22, ultrasonic::Ultrasonic},
};

#[path = "main/server.rs"]
mod server;
#[path = "main/wifi.rs"]
mod wifi;

const LCD_I2C_ADDRESS: u8 = 0x27;
const LCD_I2C_KHZ: u32 = 400;
const WIFI_RETRY_BACKOFF_MIN_SECS: u64 = 2;
const WIFI_RETRY_BACKOFF_MAX_SECS: u64 = 120;
const NETWORK_POLL_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;

const WIFI_SSID: &str = env!(
    "STATION_WIFI_SSID",
    "Set STATION_WIFI_SSID in .env or your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "STATION_WIFI_PASSWORD",
    "Set STATION_WIFI_PASSWORD in .env or your environment before building/flashing."
);
const WIFI_CONFIG: WifiConfig = WifiConfig::new(WIFI_SSID, WIFI_PASSWORD);

static CONNECTIVITY: ConnectivityHandle = ConnectivityHandle::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<3>> = StaticCell::new();

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Parks the firmware after an unrecoverable bring-up failure.
async fn halt() -> ! {
    loop {
        Timer::after_secs(1).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: sensor station starting");

    let station_config = StationConfig::default();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Wiring used by this board:
    // LCD SDA=GPIO21 SCL=GPIO22, TRIG=GPIO27 ECHO=GPIO26, DHT22=GPIO4, LED=GPIO2
    let i2c_config = I2cConfig::default().with_frequency(Rate::from_khz(LCD_I2C_KHZ));
    let i2c = match I2c::new(peripherals.I2C0, i2c_config) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO21)
            .with_scl(peripherals.GPIO22),
        Err(err) => {
            info!("lcd i2c config failed: {:?}", err);
            halt().await
        }
    };
    let lcd_config = hd44780_i2c::Config::default()
        .with_address(LCD_I2C_ADDRESS)
        .with_geometry(station_config.display_columns, station_config.display_rows);
    let mut display = CharLcd::new(i2c, Delay::new(), lcd_config);
    if let Err(err) = display.initialize() {
        esp_println::println!("display: initialize failed");
        warn!("display initialize failed: {:?}", err);
    } else {
        esp_println::println!("display: initialize ok");
    }

    let trig = Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default());
    let echo = Input::new(
        peripherals.GPIO26,
        InputConfig::default().with_pull(Pull::None),
    );
    let ranger = Ultrasonic::new(trig, echo, Delay::new(), station_config.echo_timeout_us);

    let mut dht_pin = Flex::new(peripherals.GPIO4);
    dht_pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    dht_pin.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
    dht_pin.set_input_enable(true);
    dht_pin.set_output_enable(true);
    let climate = match Dht22::new(dht_pin, Delay::new()) {
        Ok(sensor) => sensor,
        Err(err) => {
            info!("dht22 pin setup failed: {:?}", err);
            halt().await
        }
    };

    let led = Led::new(Output::new(
        peripherals.GPIO2,
        Level::Low,
        OutputConfig::default(),
    ));

    let mut router = RequestRouter::new(
        SensorReader::new(climate, ranger),
        display,
        led,
        &station_config,
    );
    let mut state = DeviceState::new(station_config.ready_banner);
    if router.refresh_display(&mut state).is_some() {
        esp_println::println!("display: ready banner shown");
    }

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            halt().await
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                halt().await
            }
        };

    let client_config = ClientConfig::default()
        .with_ssid(WIFI_CONFIG.ssid.into())
        .with_password(WIFI_CONFIG.password.into());
    let wifi_mode = ModeConfig::Client(client_config);
    if let Err(err) = wifi_controller.set_config(&wifi_mode) {
        info!("wifi mode config failed: {:?}", err);
        halt().await
    }

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<3>::new()),
        0x3E51_A0C7_22D4_9B10,
    );

    info!(
        "Station started: http_port={} echo_timeout_us={} request_pause_ms={}",
        station_config.http_port, station_config.echo_timeout_us, station_config.request_pause_ms
    );
    info!("LCD pins: SDA=GPIO21 SCL=GPIO22 addr=0x{:02x}", LCD_I2C_ADDRESS);
    info!("Sensor pins: TRIG=GPIO27 ECHO=GPIO26 DHT22=GPIO4 LED=GPIO2");
    info!("Wi-Fi bootstrap configured from env; ssid={}", WIFI_CONFIG.ssid);

    CONNECTIVITY.mark_connecting();

    let net_future = net_runner.run();
    let wifi_future = wifi::connection_loop(
        &mut wifi_controller,
        stack,
        &CONNECTIVITY,
        station_config.http_port,
    );
    let server_future = server::serve(
        stack,
        &CONNECTIVITY,
        &mut router,
        &mut state,
        &station_config,
    );

    let _ = embassy_futures::join::join3(net_future, wifi_future, server_future).await;
    unreachable!()
}
