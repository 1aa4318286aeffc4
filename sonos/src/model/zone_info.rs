/// The zone group a device belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub name: String,
    pub id: String,
    /// Identifiers of every device in the group, in the order reported.
    pub members: Vec<String>,
}

impl ZoneInfo {
    pub fn new(name: impl Into<String>, id: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            members,
        }
    }

    /// Parse the comma separated member list of `GetZoneGroupAttributes`.
    pub fn parse_members(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_grouped(&self) -> bool {
        self.members.len() > 1
    }
}
