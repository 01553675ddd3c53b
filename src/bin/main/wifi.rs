use embassy_net::Stack;
use embassy_time::{Duration as EmbassyDuration, Timer, WithTimeout};
use esp_radio::wifi::WifiController;
use log::info;
use station_hal_esp32::network::ConnectivityHandle;

use super::{
    DHCP_TIMEOUT_SECS, NETWORK_POLL_INTERVAL_MS, WIFI_RETRY_BACKOFF_MAX_SECS,
    WIFI_RETRY_BACKOFF_MIN_SECS,
};

fn retry_backoff_secs(consecutive_failures: u32) -> u64 {
    // 2, 4, 8, 16, 32, 64, 120, 120, ...
    let shift = consecutive_failures.min(6);
    WIFI_RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(WIFI_RETRY_BACKOFF_MAX_SECS)
}

async fn wait_before_retry(consecutive_failures: &mut u32) {
    let delay_secs = retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "wifi retrying in {}s (consecutive_failures={})",
        delay_secs, *consecutive_failures
    );
    Timer::after_secs(delay_secs).await;
}

fn publish_link(stack: Stack<'_>, connectivity: &ConnectivityHandle) -> bool {
    let address = stack.config_v4().map(|config| config.address.address());
    let link_up = stack.is_link_up();
    connectivity.update_link(link_up, address);
    link_up && address.is_some()
}

pub(super) async fn connection_loop(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    connectivity: &'static ConnectivityHandle,
    http_port: u16,
) -> ! {
    let mut consecutive_failures = 0u32;

    loop {
        connectivity.mark_connecting();

        if !wifi_controller.is_started().unwrap_or(false) {
            if let Err(err) = wifi_controller.start_async().await {
                info!("wifi start failed: {:?}", err);
                connectivity.mark_disconnected();
                wait_before_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        if let Err(err) = wifi_controller.connect_async().await {
            info!("wifi connect failed: {:?}", err);
            connectivity.mark_disconnected();
            let _ = wifi_controller.disconnect_async().await;
            wait_before_retry(&mut consecutive_failures).await;
            continue;
        }

        match stack
            .wait_config_up()
            .with_timeout(EmbassyDuration::from_secs(DHCP_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                publish_link(stack, connectivity);
                let snapshot = connectivity.snapshot();
                match snapshot.address {
                    Some(address) => info!(
                        "wifi connected; control page at http://{}:{}/ (revision {})",
                        address, http_port, snapshot.revision
                    ),
                    None => info!("wifi connected but lease vanished before publish"),
                }
            }
            Err(_) => {
                info!("dhcp timeout; forcing reconnect");
                connectivity.update_link(stack.is_link_up(), None);
                let _ = wifi_controller.disconnect_async().await;
                wait_before_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        consecutive_failures = 0;

        loop {
            let serving = publish_link(stack, connectivity);
            let is_connected = matches!(wifi_controller.is_connected(), Ok(true));

            if !(serving && is_connected) {
                let snapshot = connectivity.snapshot();
                info!(
                    "wifi state lost (link_up={} has_ipv4={} connected={}); reconnecting",
                    snapshot.link_up,
                    snapshot.address.is_some(),
                    is_connected
                );
                break;
            }

            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
        }

        connectivity.mark_disconnected();
        let _ = wifi_controller.disconnect_async().await;
        wait_before_retry(&mut consecutive_failures).await;
    }
}
