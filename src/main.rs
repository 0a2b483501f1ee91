use lumatrix::device::monitor::connection_status_text;
use lumatrix::{
    ApiConfig, ConnectionMonitor, DeviceSyncLoop, FieldSource, HttpDeviceApi, shared_device_state,
};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::init();

    println!("=== Lumatrix ===");
    println!("LED array controller client\n");

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.4.1".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000u16);

    let config = ApiConfig::new(host, port);
    println!("Controller: {}", config.base_url());

    let api = match HttpDeviceApi::new(config) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    let monitor = ConnectionMonitor::new(Arc::clone(&api));
    let status = monitor.check_connection();
    println!("Connection: {}", connection_status_text(&status));
    if !status.is_connected {
        eprintln!("Controller unreachable, giving up");
        return;
    }

    let mut sync = DeviceSyncLoop::new(api, shared_device_state());
    let state = sync.state();
    sync.activate();
    println!("\nSync loop started, polling every 2s (Ctrl-C to quit)\n");

    loop {
        std::thread::sleep(Duration::from_secs(2));
        if let Ok(device) = state.lock() {
            let mode_tag = match device.mode_source() {
                FieldSource::Local => " (pending)",
                FieldSource::Remote => "",
            };
            println!(
                "{} [{}] ch={} mode={}{} delay={}ms",
                device.device_name,
                device.device_serial,
                device.device_channel_count,
                device.mode(),
                mode_tag,
                device.delay(),
            );
        }
    }
}
