use std::fmt;
use std::str::FromStr;

/// How vertices are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveKind {
    /// Unconnected points
    Points,
    /// Independent line segments
    Lines,
    /// Closed polyline
    LineLoop,
    /// Open polyline
    LineStrip,
    /// Independent triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

impl PrimitiveKind {
    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineLoop => "line-loop",
            Self::LineStrip => "line-strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
            Self::TriangleFan => "triangle-fan",
        }
    }

    /// Whether the primitive produces surface triangles
    pub fn is_triangles(self) -> bool {
        matches!(self, Self::Triangles | Self::TriangleStrip | Self::TriangleFan)
    }

    /// Parse a primitive name, falling back to [`PrimitiveKind::Triangles`].
    ///
    /// Returns the kind and whether the fallback was taken.
    pub fn parse_or_default(name: &str) -> (Self, bool) {
        match name.parse() {
            Ok(kind) => (kind, false),
            Err(()) => (Self::Triangles, true),
        }
    }
}

impl FromStr for PrimitiveKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "points" => Self::Points,
            "lines" => Self::Lines,
            "line-loop" => Self::LineLoop,
            "line-strip" => Self::LineStrip,
            "triangles" => Self::Triangles,
            "triangle-strip" => Self::TriangleStrip,
            "triangle-fan" => Self::TriangleFan,
            _ => return Err(()),
        };
        Ok(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
