use std::any::Any;
use std::fmt;

/// Displays a panic payload caught with `catch_unwind`.
///
/// String payloads print as-is; anything else falls back to `Debug`.
#[derive(Debug)]
pub(crate) struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

pub(crate) fn format_panic(payload: Box<dyn Any + Send>) -> PanicMessage {
    PanicMessage(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_string_payloads() {
        assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
        assert_eq!(format_panic(Box::new(String::from("bang"))).to_string(), "bang");
        assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
    }
}
