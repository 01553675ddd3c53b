use embassy_net::{
    Stack,
    tcp::{Error as TcpError, TcpSocket},
};
use embassy_time::{Duration as EmbassyDuration, Timer};
use heapless::String as HeaplessString;
use log::{debug, info, warn};
use station_core::{
    config::StationConfig,
    display::CharDisplay,
    response::{
        HEAD_BYTES, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, PAGE_BYTES, ResponseRenderer,
    },
    router::{Actuator, RequestRouter, Response},
    sensor::{ClimateSensor, RangeSensor},
    state::DeviceState,
    text_policy::truncate_chars,
};
use station_hal_esp32::network::ConnectivityHandle;

/// Bytes of request text considered per connection.
const REQUEST_BYTES: usize = 1024;
const TX_BUFFER_BYTES: usize = 2048;
const REQUEST_LOG_CHARS: usize = 100;
const ACCEPT_RETRY_MS: u64 = 200;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ServerError {
    Tcp(TcpError),
    /// Peer stopped accepting bytes mid-response.
    WriteZero,
    BodyOverflow,
}

impl From<TcpError> for ServerError {
    fn from(err: TcpError) -> Self {
        Self::Tcp(err)
    }
}

/// Accepts one connection at a time and answers it from the shared device state.
#[allow(
    clippy::large_stack_frames,
    reason = "request and response buffers live for the whole server loop"
)]
pub(super) async fn serve<C, R, D, A>(
    stack: Stack<'_>,
    connectivity: &'static ConnectivityHandle,
    router: &mut RequestRouter<C, R, D, A>,
    state: &mut DeviceState,
    config: &StationConfig,
) -> !
where
    C: ClimateSensor,
    R: RangeSensor,
    D: CharDisplay,
    A: Actuator,
{
    let renderer = ResponseRenderer::new(config.refresh_interval_ms);
    let mut rx_buffer = [0u8; REQUEST_BYTES];
    let mut tx_buffer = [0u8; TX_BUFFER_BYTES];
    let mut request = [0u8; REQUEST_BYTES];
    let mut head: HeaplessString<HEAD_BYTES> = HeaplessString::new();
    let mut body: HeaplessString<PAGE_BYTES> = HeaplessString::new();
    let mut last_revision = u32::MAX;

    loop {
        stack.wait_config_up().await;

        let snapshot = connectivity.snapshot();
        if snapshot.revision != last_revision && snapshot.is_serving() {
            last_revision = snapshot.revision;
            if let Some(address) = snapshot.address {
                info!("http: listening on {}:{}", address, config.http_port);
            }
        }

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(EmbassyDuration::from_secs(config.socket_timeout_secs)));

        if let Err(err) = socket.accept(config.http_port).await {
            warn!("http: accept failed: {:?}", err);
            Timer::after_millis(ACCEPT_RETRY_MS).await;
            continue;
        }

        let outcome = handle_connection(
            &mut socket,
            &mut request,
            &mut head,
            &mut body,
            router,
            state,
            &renderer,
        )
        .await;
        if let Err(err) = outcome {
            warn!("http: connection failed: {:?}", err);
        }

        socket.close();
        let _ = socket.flush().await;
        socket.abort();

        Timer::after_millis(config.request_pause_ms).await;
    }
}

async fn handle_connection<C, R, D, A>(
    socket: &mut TcpSocket<'_>,
    request: &mut [u8; REQUEST_BYTES],
    head: &mut HeaplessString<HEAD_BYTES>,
    body: &mut HeaplessString<PAGE_BYTES>,
    router: &mut RequestRouter<C, R, D, A>,
    state: &mut DeviceState,
    renderer: &ResponseRenderer,
) -> Result<(), ServerError>
where
    C: ClimateSensor,
    R: RangeSensor,
    D: CharDisplay,
    A: Actuator,
{
    let len = read_request(socket, request).await?;
    let text = valid_prefix(&request[..len]);
    debug!("http: request {:?}", truncate_chars(text, REQUEST_LOG_CHARS));

    head.clear();
    body.clear();
    let content_type = match router.handle(state, text) {
        Response::Close => return Ok(()),
        Response::Json(snapshot) => {
            renderer
                .json(body, &snapshot)
                .map_err(|_| ServerError::BodyOverflow)?;
            JSON_CONTENT_TYPE
        }
        Response::Page { actuator_on } => {
            renderer
                .page(body, state, actuator_on)
                .map_err(|_| ServerError::BodyOverflow)?;
            HTML_CONTENT_TYPE
        }
    };
    renderer
        .head(head, content_type, body.len())
        .map_err(|_| ServerError::BodyOverflow)?;

    write_all(socket, head.as_bytes()).await?;
    write_all(socket, body.as_bytes()).await?;
    socket.flush().await?;
    Ok(())
}

/// Reads until the end of the header block, a full buffer, or EOF.
async fn read_request(
    socket: &mut TcpSocket<'_>,
    buf: &mut [u8; REQUEST_BYTES],
) -> Result<usize, ServerError> {
    let mut total = 0usize;
    while total < buf.len() {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
        if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(total)
}

/// Longest prefix of `bytes` that is valid UTF-8.
fn valid_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => core::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or(""),
    }
}

async fn write_all(socket: &mut TcpSocket<'_>, mut bytes: &[u8]) -> Result<(), ServerError> {
    while !bytes.is_empty() {
        let written = socket.write(bytes).await?;
        if written == 0 {
            return Err(ServerError::WriteZero);
        }
        bytes = &bytes[written..];
    }
    Ok(())
}
