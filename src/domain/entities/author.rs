use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat participant access level, lowest to highest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    #[default]
    User,
    #[serde(alias = "subscriber")]
    Sub,
    Vip,
    #[serde(alias = "moderator")]
    Mod,
    #[serde(alias = "owner", alias = "broadcaster")]
    Host,
}

impl Privilege {
    pub const ALL: [Privilege; 5] = [
        Privilege::User,
        Privilege::Sub,
        Privilege::Vip,
        Privilege::Mod,
        Privilege::Host,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::User => "User",
            Privilege::Sub => "Sub",
            Privilege::Vip => "VIP",
            Privilege::Mod => "Mod",
            Privilege::Host => "Host",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "everyone" | "none" => Ok(Privilege::User),
            "sub" | "subscriber" => Ok(Privilege::Sub),
            "vip" => Ok(Privilege::Vip),
            "mod" | "moderator" => Ok(Privilege::Mod),
            "host" | "owner" | "broadcaster" => Ok(Privilege::Host),
            other => Err(format!("unknown privilege '{}'", other)),
        }
    }
}

/// Platform roles reported for the sender of a chat line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Roles {
    pub subscriber: bool,
    pub vip: bool,
    pub moderator: bool,
    pub host: bool,
}

impl Roles {
    /// Collapse the role flags into the highest privilege they grant
    pub fn privilege(&self) -> Privilege {
        if self.host {
            Privilege::Host
        } else if self.moderator {
            Privilege::Mod
        } else if self.vip {
            Privilege::Vip
        } else if self.subscriber {
            Privilege::Sub
        } else {
            Privilege::User
        }
    }

    /// Roles that grant exactly `privilege`
    pub fn from_privilege(privilege: Privilege) -> Self {
        Self {
            subscriber: privilege == Privilege::Sub,
            vip: privilege == Privilege::Vip,
            moderator: privilege == Privilege::Mod,
            host: privilege == Privilege::Host,
        }
    }
}

/// The sender of a chat line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    pub name: String,
    pub id: String,
    pub roles: Roles,
}

impl Author {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            roles: Roles::default(),
        }
    }

    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.roles = Roles::from_privilege(privilege);
        self
    }

    pub fn privilege(&self) -> Privilege {
        self.roles.privilege()
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
