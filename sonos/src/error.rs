use crate::streaming::subscription::SubscriptionError;

/// Known UPnP error codes and their descriptions.
const UPNP_ERROR_CODES: &[(u16, &str)] = &[
  (400, "Bad Request"),
  (401, "Invalid Action"),
  (402, "Invalid Args"),
  (404, "Invalid Var"),
  (412, "Precondition Failed"),
  (501, "Action Failed"),
  (600, "Argument Value Invalid"),
  (601, "Argument Value Out of Range"),
  (602, "Option Action Not Implemented"),
  (603, "Out Of Memory"),
  (604, "Human Intervention Required"),
  (605, "String Argument Too Long"),
  (606, "Action Not Authorized"),
  (607, "Signature Failure"),
  (608, "Signature Missing"),
  (609, "Not Encrypted"),
  (610, "Invalid Sequence"),
  (611, "Invalid Control Url"),
  (612, "No Such Session"),
  (701, "Invalid transition"),
  (702, "No content"),
  (712, "Unsupported Play Mode"),
  (714, "Illegal MIME-Type"),
];

/// Look up the human readable description of a UPnP error code.
pub fn describe_error_code(code: u16) -> Option<&'static str> {
  UPNP_ERROR_CODES
    .iter()
    .find(|(known, _)| *known == code)
    .map(|(_, description)| *description)
}

#[derive(Debug, thiserror::Error)]
pub enum SonosError {
  #[error("Transport error: {0}")]
  Transport(String),

  #[error("UPnP Error {code} ({}) received from {ip}", .description.unwrap_or("null"))]
  Protocol {
    code: u16,
    description: Option<&'static str>,
    ip: String,
    raw: String,
  },

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  #[error("Failed to parse device response: {0}")]
  Parse(String),

  #[error("Discovery failed: {0}")]
  Discovery(String),

  #[error(transparent)]
  Subscription(#[from] SubscriptionError),

  #[error("Operation was cancelled")]
  Cancelled,
}

impl SonosError {
  /// Build a protocol error for `code`, resolving the description from the
  /// known error table.
  pub fn protocol(code: u16, ip: impl Into<String>, raw: impl Into<String>) -> Self {
    SonosError::Protocol {
      code,
      description: describe_error_code(code),
      ip: ip.into(),
      raw: raw.into(),
    }
  }

  /// The UPnP error code if this is a protocol error.
  pub fn protocol_code(&self) -> Option<u16> {
    match self {
      SonosError::Protocol { code, .. } => Some(*code),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for SonosError {
  fn from(err: reqwest::Error) -> Self {
    SonosError::Transport(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, SonosError>;
