//! Structured Logging with Sensitive Data Redaction
//!
//! Records are written to stderr as `key=value` pairs. Field values are
//! redacted by key name:
//! - passwords, seeds, private keys and ciphertexts are fully redacted
//! - addresses are shortened to prefix and suffix
//! - digests and transaction ids are shortened
//!
//! Debug records are dropped unless the current call runs inside a
//! `with_debug(true, ..)` scope. The setting is per thread and restored
//! when the scope ends.

use std::cell::Cell;
use std::fmt;

thread_local! {
    static DEBUG_SCOPE: Cell<bool> = Cell::new(false);
}

/// Run `f` with debug records enabled or disabled on this thread.
///
/// The previous setting is restored when `f` returns or unwinds.
pub fn with_debug<T>(enabled: bool, f: impl FnOnce() -> T) -> T {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            DEBUG_SCOPE.with(|scope| scope.set(self.0));
        }
    }

    let _restore = Restore(DEBUG_SCOPE.with(|scope| scope.replace(enabled)));
    f()
}

pub fn is_debug_enabled() -> bool {
    DEBUG_SCOPE.with(|scope| scope.get())
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (auto-redacts by key name)
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_if_sensitive(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Render without the timestamp
    pub fn render(&self) -> String {
        let fields_str = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");

        if fields_str.is_empty() {
            format!("{} [{}] {}", self.level, self.module, self.message)
        } else {
            format!("{} [{}] {} | {}", self.level, self.module, self.message, fields_str)
        }
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

const SECRET_KEYS: &[&str] = &[
    "private", "secret", "seed", "mnemonic", "password", "passphrase", "ciphertext",
    "signing_key",
];

const ADDRESS_KEYS: &[&str] = &["address", "to", "from", "signer", "recipient"];

const HASH_KEYS: &[&str] = &["txid", "transaction_id", "tx_hash", "digest", "hash"];

fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    if SECRET_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }
    if ADDRESS_KEYS.iter().any(|k| key_lower == *k || key_lower.ends_with(&format!("_{}", k))) {
        return redact_address(value);
    }
    if HASH_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_hash(value);
    }

    value.to_string()
}

fn redact_value(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }
    if value.len() <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", value.len())
    }
}

/// Show the first 8 and last 4 chars of a `0x` address
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    let suffix_len = 4;
    if trimmed.len() <= prefix_len + suffix_len + 3 || !trimmed.is_ascii() {
        return redact_value(trimmed);
    }

    format!(
        "{}...{}",
        &trimmed[..prefix_len],
        &trimmed[trimmed.len() - suffix_len..]
    )
}

fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() <= 20 || !trimmed.is_ascii() {
        return trimmed.to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    format!(
        "{}...{}",
        &trimmed[..prefix_len],
        &trimmed[trimmed.len() - 6..]
    )
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for error logging
#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_value() {
        assert_eq!(redact_value(""), "[EMPTY]");
        assert_eq!(redact_value("abc"), "[REDACTED]");
        assert_eq!(redact_value("correct horse"), "[REDACTED:13chars]");
    }

    #[test]
    fn test_redact_address() {
        let redacted = redact_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert_eq!(redacted, "0xf39fd6...2266");
    }

    #[test]
    fn test_redact_hash() {
        let hash = "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53";
        assert_eq!(redact_hash(hash), "0xdaf5a779ae...4c8e53");
        assert_eq!(redact_hash("0x1234"), "0x1234");
    }

    #[test]
    fn test_log_entry_redacts_by_key() {
        let entry = LogEntry::new(LogLevel::Info, "test", "Signing")
            .field("password", "hunter2hunter2")
            .field("encrypted_seed", "aabbccdd")
            .field("to", "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")
            .field("nonce", "0x1")
            .field("public_key", "02abcdef");

        let rendered = entry.render();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("aabbccdd"));
        assert!(rendered.contains("to=0xf39fd6...2266"));
        assert!(rendered.contains("nonce=0x1"));
        assert!(rendered.contains("public_key=02abcdef"));
    }

    #[test]
    fn test_debug_scope_is_restored() {
        assert!(!is_debug_enabled());

        let inner = with_debug(true, || {
            assert!(is_debug_enabled());
            with_debug(false, is_debug_enabled)
        });
        assert!(!inner);
        assert!(!is_debug_enabled());

        let unwound = std::panic::catch_unwind(|| {
            with_debug(true, || {
                if is_debug_enabled() {
                    panic!("unwinding inside a debug scope");
                }
            })
        });
        assert!(unwound.is_err());
        assert!(!is_debug_enabled());
    }

    #[test]
    fn test_debug_scope_is_per_thread() {
        with_debug(true, || {
            let other = std::thread::spawn(is_debug_enabled).join().unwrap();
            assert!(!other);
            assert!(is_debug_enabled());
        });
    }
}
