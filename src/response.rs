use serde::Serialize;

/// `{ "success": true, "message": ..., ...data }`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct NoData {}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
        }
    }
}

impl Envelope<NoData> {
    pub fn ack(message: &'static str) -> Self {
        Self::ok(message, NoData {})
    }
}
