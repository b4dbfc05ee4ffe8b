use bytes::Bytes;

/// One unit of data flowing through a pipeline edge.
///
/// The core imposes no internal structure; whether an edge carries text or
/// raw bytes is a per-stage configuration choice (see [`OutputMode`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Text(String),
    Binary(Bytes),
}

impl Record {
    /// Borrow the textual content, if this is a text record.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Record::Text(text) => Some(text),
            Record::Binary(_) => None,
        }
    }

    /// Consume the record as raw bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Record::Text(text) => Bytes::from(text.into_bytes()),
            Record::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Record::Text(text) => text.len(),
            Record::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Record {
    fn from(text: String) -> Self {
        Record::Text(text)
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Record::Text(text.to_owned())
    }
}

impl From<Bytes> for Record {
    fn from(bytes: Bytes) -> Self {
        Record::Binary(bytes)
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Record::Binary(Bytes::from(bytes))
    }
}

/// Whether a stage emits its output as text or raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Binary,
}

impl OutputMode {
    pub(crate) fn wrap(self, bytes: Vec<u8>) -> Record {
        match self {
            OutputMode::Text => Record::Text(String::from_utf8_lossy(&bytes).into_owned()),
            OutputMode::Binary => Record::Binary(Bytes::from(bytes)),
        }
    }
}
