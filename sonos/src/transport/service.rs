/// Controllable services on a Sonos device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
  AvTransport,
  RenderingControl,
  DeviceProperties,
  ContentDirectory,
  ZoneGroupTopology,
}

impl Service {
  /// Get the UPnP service type string for SOAP requests
  pub fn urn(&self) -> &'static str {
    match self {
      Service::AvTransport => "urn:schemas-upnp-org:service:AVTransport:1",
      Service::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
      Service::DeviceProperties => "urn:schemas-upnp-org:service:DeviceProperties:1",
      Service::ContentDirectory => "urn:schemas-upnp-org:service:ContentDirectory:1",
      Service::ZoneGroupTopology => "urn:upnp-org:serviceId:ZoneGroupTopology",
    }
  }

  /// Get the control URL path for this service
  pub fn control_path(&self) -> &'static str {
    match self {
      Service::AvTransport => "/MediaRenderer/AVTransport/Control",
      Service::RenderingControl => "/MediaRenderer/RenderingControl/Control",
      Service::DeviceProperties => "/DeviceProperties/Control",
      Service::ContentDirectory => "/MediaServer/ContentDirectory/Control",
      Service::ZoneGroupTopology => "/ZoneGroupTopology/Control",
    }
  }
}

/// Event sources a control point subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventService {
  RenderingControl,
  AvTransport,
  Queue,
  ZoneGroupTopology,
}

impl EventService {
  pub const ALL: [EventService; 4] = [
    EventService::RenderingControl,
    EventService::AvTransport,
    EventService::Queue,
    EventService::ZoneGroupTopology,
  ];

  /// Get the event subscription URL path for this service
  pub fn path(&self) -> &'static str {
    match self {
      EventService::RenderingControl => "/MediaRenderer/RenderingControl/Event",
      EventService::AvTransport => "/MediaRenderer/AVTransport/Event",
      EventService::Queue => "/MediaRenderer/Queue/Event",
      EventService::ZoneGroupTopology => "/ZoneGroupTopology/Event",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_control_endpoints() {
    assert_eq!(Service::AvTransport.control_path(), "/MediaRenderer/AVTransport/Control");
    assert_eq!(Service::ZoneGroupTopology.urn(), "urn:upnp-org:serviceId:ZoneGroupTopology");
    assert_eq!(Service::DeviceProperties.urn(), "urn:schemas-upnp-org:service:DeviceProperties:1");
  }

  #[test]
  fn test_event_paths_are_distinct() {
    let mut paths: Vec<_> = EventService::ALL.iter().map(|s| s.path()).collect();
    paths.dedup();
    assert_eq!(paths.len(), 4);
    assert_eq!(EventService::Queue.path(), "/MediaRenderer/Queue/Event");
  }
}
