use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

/// Body of the no-load report POST.
///
/// Field order and formatting are part of the wire contract:
/// `{"timestamp":"<uptime ms>","current":<amps, 2dp>,"occupied":true}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoLoadEvent {
    /// Device uptime in milliseconds, sent as a decimal string
    #[serde(rename = "timestamp", with = "uptime_ms")]
    pub uptime_ms: u64,
    /// Measured load current in amps
    #[serde(serialize_with = "two_decimals")]
    pub current: f32,
    pub occupied: bool,
}

impl NoLoadEvent {
    /// No-load events are only raised for occupied rooms.
    pub fn new(uptime_ms: u64, current: f32) -> Self {
        Self { uptime_ms, current, occupied: true }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

// Emits the number token verbatim so 2.0 goes out as 2.00, not 2.0.
fn two_decimals<S: Serializer>(v: &f32, s: S) -> Result<S::Ok, S::Error> {
    if !v.is_finite() {
        return Err(S::Error::custom(format!("current is not a finite number: {}", v)));
    }
    let raw = RawValue::from_string(format!("{:.2}", v)).map_err(S::Error::custom)?;
    raw.serialize(s)
}

mod uptime_ms {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_device_payload() {
        let ev = NoLoadEvent::new(123_456, 0.024);
        let s = serde_json::to_string(&ev).unwrap();
        assert_eq!(s, r#"{"timestamp":"123456","current":0.02,"occupied":true}"#);
    }

    #[test]
    fn current_rounds_to_two_decimals() {
        let s = serde_json::to_string(&NoLoadEvent::new(1, 0.456)).unwrap();
        assert!(s.contains(r#""current":0.46,"#), "{}", s);
    }

    #[test]
    fn whole_amps_keep_trailing_zeros() {
        let s = serde_json::to_string(&NoLoadEvent::new(1, 2.0)).unwrap();
        assert!(s.contains(r#""current":2.00,"#), "{}", s);
    }

    #[test]
    fn non_finite_current_is_rejected() {
        assert!(NoLoadEvent::new(1, f32::INFINITY).to_json().is_err());
        assert!(NoLoadEvent::new(1, f32::NAN).to_json().is_err());
    }

    #[test]
    fn receiver_can_parse_payload() {
        let body = NoLoadEvent::new(98_765, 0.31).to_json().unwrap();
        let back: NoLoadEvent = serde_json::from_slice(&body).unwrap();
        assert_eq!(back.uptime_ms, 98_765);
        assert!(back.occupied);
        assert!((back.current - 0.31).abs() < 1e-6);
    }
}
