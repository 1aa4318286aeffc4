use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";
pub const SSDP_ALL: &str = "ssdp:all";
pub const USER_AGENT: &str = "Linux UPnP/1.0 Sonos/42.2-52113 (sonos-upnp)";

/// A device as seen in a single discovery response: who answered, plus the
/// raw headers it sent. Header names are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
  address: IpAddr,
  headers: HashMap<String, String>,
}

impl DeviceDescriptor {
  pub fn new(address: IpAddr, headers: HashMap<String, String>) -> Self {
    let headers = headers
      .into_iter()
      .map(|(name, value)| (name.trim().to_ascii_uppercase(), value))
      .collect();
    Self { address, headers }
  }

  /// A descriptor for a device whose address is known but which never
  /// answered a discovery query.
  pub fn from_address(address: IpAddr) -> Self {
    Self {
      address,
      headers: HashMap::new(),
    }
  }

  pub fn address(&self) -> IpAddr {
    self.address
  }

  /// URL of the root device description.
  pub fn location(&self) -> Option<&str> {
    self.field("LOCATION")
  }

  pub fn server(&self) -> Option<&str> {
    self.field("SERVER")
  }

  pub fn search_target(&self) -> Option<&str> {
    self.field("ST")
  }

  pub fn unique_service_name(&self) -> Option<&str> {
    self.field("USN")
  }

  /// Look up any header captured at discovery time (case-insensitive).
  pub fn field(&self, name: &str) -> Option<&str> {
    self.headers.get(&name.to_ascii_uppercase()).map(String::as_str)
  }

  pub fn fields(&self) -> &HashMap<String, String> {
    &self.headers
  }
}

/// SSDP client for device discovery
pub struct SsdpClient {
  socket: UdpSocket,
  timeout: Duration,
}

impl SsdpClient {
  /// Create a new SSDP client that listens for answers for at most `timeout`
  pub fn new(timeout: Duration) -> Result<Self, Error> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
    socket.set_multicast_loop_v4(true)?;

    Ok(Self { socket, timeout })
  }

  /// Send one M-SEARCH datagram and return an iterator over the answers
  /// that arrive before the timeout elapses.
  pub fn search(&self, mx: u8, search_target: Option<&str>) -> Result<SsdpResponseIterator<'_>, Error> {
    let request = build_search_request(mx, self.timeout, search_target);
    log::debug!("Sending M-SEARCH for {}", search_target.unwrap_or(SSDP_ALL));

    self.socket.send_to(request.as_bytes(), SSDP_MULTICAST_ADDR)?;

    Ok(SsdpResponseIterator::new(&self.socket, Instant::now() + self.timeout))
  }
}

/// Build the M-SEARCH request, clamping the load balancing delay to 1..=5.
pub fn build_search_request(mx: u8, timeout: Duration, search_target: Option<&str>) -> String {
  let mx = if (1..=5).contains(&mx) {
    mx
  } else {
    log::warn!("Load balancing delay should be within [1-5] seconds. A default of 1s is assumed");
    1
  };

  if u64::from(mx) >= timeout.as_secs() {
    log::warn!(
      "Load balancing delay ({}s) is not lower than the timeout ({:?}); some devices may not be discovered",
      mx,
      timeout
    );
  }

  let target = match search_target {
    Some(target) if !target.trim().is_empty() => target.trim(),
    _ => SSDP_ALL,
  };

  format!(
    "M-SEARCH * HTTP/1.1\r\n\
      HOST: {}\r\n\
      MAN: \"ssdp:discover\"\r\n\
      MX: {}\r\n\
      ST: {}\r\n\
      USER-AGENT: {}\r\n\
      \r\n",
    SSDP_MULTICAST_ADDR, mx, target, USER_AGENT
  )
}

/// Iterator for SSDP responses. Ends once the deadline passes.
pub struct SsdpResponseIterator<'a> {
  socket: &'a UdpSocket,
  buffer: [u8; 2048],
  deadline: Instant,
  finished: bool,
}

impl<'a> SsdpResponseIterator<'a> {
  fn new(socket: &'a UdpSocket, deadline: Instant) -> Self {
    Self {
      socket,
      buffer: [0; 2048],
      deadline,
      finished: false,
    }
  }
}

impl<'a> Iterator for SsdpResponseIterator<'a> {
  type Item = Result<DeviceDescriptor, Error>;

  fn next(&mut self) -> Option<Self::Item> {
    while !self.finished {
      let remaining = self.deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        self.finished = true;
        break;
      }
      if let Err(e) = self.socket.set_read_timeout(Some(remaining)) {
        self.finished = true;
        return Some(Err(e));
      }

      match self.socket.recv_from(&mut self.buffer) {
        Ok((size, from)) => match parse_ssdp_response(&self.buffer[..size], from) {
          Some(descriptor) => return Some(Ok(descriptor)),
          None => {
            log::debug!("Dropped unparseable discovery datagram from {}", from);
          }
        },
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
          self.finished = true;
        }
        Err(e) => {
          self.finished = true;
          return Some(Err(e));
        }
      }
    }
    None
  }
}

/// Parse a discovery datagram into a descriptor. Returns `None` for
/// datagrams that are not UTF-8 or carry no headers.
pub fn parse_ssdp_response(datagram: &[u8], from: SocketAddr) -> Option<DeviceDescriptor> {
  let text = std::str::from_utf8(datagram).ok()?;

  let mut headers = HashMap::new();
  for line in text.lines() {
    if let Some((name, value)) = split_header_line(line) {
      headers.insert(name, value);
    }
  }

  if headers.is_empty() {
    return None;
  }

  Some(DeviceDescriptor::new(from.ip(), headers))
}

/// Split a line like "HEADER: value" into an upper-cased name and trimmed value
fn split_header_line(line: &str) -> Option<(String, String)> {
  let (name, value) = line.split_once(':')?;
  let name = name.trim();
  if name.is_empty() || name.contains(' ') {
    return None;
  }
  Some((name.to_ascii_uppercase(), value.trim().to_string()))
}
