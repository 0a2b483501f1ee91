// Connection monitor - periodic reachability checks against the controller

use super::api::DeviceApi;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between connection checks
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Response time beyond which a connection is reported as degraded
const SLOW_RESPONSE: Duration = Duration::from_secs(5);

const IDLE_SLICE: Duration = Duration::from_millis(100);

/// Result of the most recent connection check. Owned by the monitor, mutated
/// only by its check cycle, never persisted.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub last_checked: DateTime<Utc>,
    pub response_time: Option<Duration>,
    pub error: Option<String>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            is_connected: false,
            last_checked: Utc::now(),
            response_time: None,
            error: None,
        }
    }
}

/// Severity bucket for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLevel {
    Ok,
    Warning,
    Error,
}

pub type StatusListener = Box<dyn Fn(&ConnectionStatus) + Send + 'static>;

/// Checks device reachability on demand or on a fixed schedule, and fans the
/// resulting [`ConnectionStatus`] out to registered listeners.
pub struct ConnectionMonitor<A: DeviceApi + 'static> {
    api: Arc<A>,
    status: Arc<Mutex<ConnectionStatus>>,
    listeners: Arc<Mutex<Vec<StatusListener>>>,
    active: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<A: DeviceApi + 'static> ConnectionMonitor<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            status: Arc::new(Mutex::new(ConnectionStatus::default())),
            listeners: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Snapshot of the latest status
    pub fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    pub fn add_listener(&self, listener: impl Fn(&ConnectionStatus) + Send + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Run one check now and report the outcome
    pub fn check_connection(&self) -> ConnectionStatus {
        Self::run_check(self.api.as_ref(), &self.status, &self.listeners)
    }

    fn run_check(
        api: &A,
        status: &Mutex<ConnectionStatus>,
        listeners: &Mutex<Vec<StatusListener>>,
    ) -> ConnectionStatus {
        let next = match api.ping() {
            Ok(response_time) => ConnectionStatus {
                is_connected: true,
                last_checked: Utc::now(),
                response_time: Some(response_time),
                error: None,
            },
            Err(e) => ConnectionStatus {
                is_connected: false,
                last_checked: Utc::now(),
                response_time: None,
                error: Some(e.to_string()),
            },
        };

        if let Ok(mut current) = status.lock() {
            *current = next.clone();
        }
        if let Ok(listeners) = listeners.lock() {
            for listener in listeners.iter() {
                listener(&next);
            }
        }

        next
    }

    /// Start periodic checks, beginning with an immediate one. Restarting
    /// replaces the previous schedule.
    pub fn start_monitoring(&mut self, interval: Duration) {
        self.stop_monitoring();
        self.active.store(true, Ordering::SeqCst);

        let api = Arc::clone(&self.api);
        let status = Arc::clone(&self.status);
        let listeners = Arc::clone(&self.listeners);
        let active = Arc::clone(&self.active);

        self.worker = Some(thread::spawn(move || {
            while active.load(Ordering::SeqCst) {
                Self::run_check(api.as_ref(), &status, &listeners);

                let mut waited = Duration::ZERO;
                while waited < interval && active.load(Ordering::SeqCst) {
                    let slice = IDLE_SLICE.min(interval - waited);
                    thread::sleep(slice);
                    waited += slice;
                }
            }
        }));
    }

    /// Stop periodic checks; idempotent
    pub fn stop_monitoring(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<A: DeviceApi + 'static> Drop for ConnectionMonitor<A> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// "N/A", "438ms" or "1.2s"
pub fn format_response_time(response_time: Option<Duration>) -> String {
    match response_time {
        None => "N/A".to_string(),
        Some(d) if d < Duration::from_secs(1) => format!("{}ms", d.as_millis()),
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
    }
}

/// One-line status text for display
pub fn connection_status_text(status: &ConnectionStatus) -> String {
    if status.is_connected {
        format!("Connected ({})", format_response_time(status.response_time))
    } else {
        status
            .error
            .clone()
            .unwrap_or_else(|| "Disconnected".to_string())
    }
}

/// Map a status to a severity bucket (slow-but-alive is a warning)
pub fn connection_level(status: &ConnectionStatus) -> ConnectionLevel {
    if !status.is_connected {
        return ConnectionLevel::Error;
    }
    match status.response_time {
        Some(rt) if rt > SLOW_RESPONSE => ConnectionLevel::Warning,
        _ => ConnectionLevel::Ok,
    }
}
