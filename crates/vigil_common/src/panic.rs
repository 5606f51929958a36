//! Turning caught panics into error messages.

use std::any::Any;

/// Extracts the message from a panic payload caught by `catch_unwind`.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    #[test]
    fn static_and_formatted_messages() {
        let payload = catch_unwind(|| panic!("plain")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "plain");

        let file = "a.ts";
        let payload = catch_unwind(|| panic!("bad {file}")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "bad a.ts");
    }

    #[test]
    fn other_payloads() {
        let payload = catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
