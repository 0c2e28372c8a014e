use std::fmt::Write as _;

#[macro_export]
macro_rules! link_trace {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! link_debug {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! link_info {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Info) {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! link_warn {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Warn) {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! link_error {
    ($($arg:tt)*) => {
        if log::log_enabled!(log::Level::Error) {
            log::error!($($arg)*);
        }
    };
}

/// Installs an `env_logger` driven by `RUST_LOG` (default filter `info`).
/// Calling it more than once is harmless.
pub fn init_logger() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).is_test(cfg!(test)).try_init();
}

/// Renders `data` as space separated hex plus a printable-ASCII column.
pub fn hex_dump(data: &[u8]) -> (String, String) {
    let mut hex = String::with_capacity(data.len() * 3);
    let mut ascii = String::with_capacity(data.len());
    for &b in data {
        let _ = write!(hex, "{b:02x} ");
        ascii.push(if (0x20..0x7f).contains(&b) { b as char } else { '.' });
    }
    (hex, ascii)
}

/// Logs a traffic buffer at trace level.
pub(crate) fn trace_bytes(direction: &str, peer: &str, data: &[u8]) {
    if log::log_enabled!(log::Level::Trace) {
        let (hex, ascii) = hex_dump(data);
        log::trace!("{direction} {} bytes {peer} data: {hex}", data.len());
        log::trace!("ASCII: {ascii}");
    }
}
