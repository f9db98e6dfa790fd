//! Session identifier format: `session_<timestamp>_<hex16>`.

use chrono::Utc;
use uuid::Uuid;

/// Mint a session id: millisecond timestamp plus 16 random hex chars.
pub fn generate_session_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let simple = Uuid::new_v4().simple().to_string();
    format!("session_{millis}_{}", &simple[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }
}
