//! Core types for helios-client

use crate::aggregate::PageShape;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource families exposed by the API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Weather and traffic alerts
    Alerts,
    /// Traffic and weather cameras
    Cameras,
    /// Point observations derived from camera imagery
    Observations,
    /// User-curated image collections
    Collections,
}

impl ResourceKind {
    /// Every resource kind
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Alerts,
        ResourceKind::Cameras,
        ResourceKind::Observations,
        ResourceKind::Collections,
    ];

    /// URL path segment under the API root
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::Alerts => "alerts",
            ResourceKind::Cameras => "cameras",
            ResourceKind::Observations => "observations",
            ResourceKind::Collections => "collections",
        }
    }

    /// Response shape returned by this resource's index interface
    pub fn page_shape(self) -> PageShape {
        match self {
            ResourceKind::Collections => PageShape::Results,
            ResourceKind::Alerts | ResourceKind::Cameras | ResourceKind::Observations => {
                PageShape::Features
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == wanted)
            .ok_or_else(|| Error::InvalidQuery(format!("unknown resource '{s}'")))
    }
}

/// Which media sub-route of an asset to fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaRoute {
    /// `/<resource>/<id>/preview`
    Preview,
    /// `/<resource>/<id>/images/<time>`
    Image(String),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_follow_resource_family() {
        assert_eq!(ResourceKind::Alerts.page_shape(), PageShape::Features);
        assert_eq!(ResourceKind::Cameras.page_shape(), PageShape::Features);
        assert_eq!(ResourceKind::Observations.page_shape(), PageShape::Features);
        assert_eq!(ResourceKind::Collections.page_shape(), PageShape::Results);
    }

    #[test]
    fn parse_and_display_agree() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
        }
        assert_eq!(" Cameras ".parse::<ResourceKind>().unwrap(), ResourceKind::Cameras);
        assert!("satellites".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ResourceKind::Observations).unwrap();
        assert_eq!(json, "\"observations\"");
        let kind: ResourceKind = serde_json::from_str("\"collections\"").unwrap();
        assert_eq!(kind, ResourceKind::Collections);
    }
}
