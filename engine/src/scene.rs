//! Scene graph seam between the engine and whatever actually paints.
//!
//! The engine never touches a DOM, a GPU or an SVG serializer. It drives an
//! abstract retained scene: ordered groups of primitives addressed by opaque
//! ids, plus a single popup overlay per scene. [`crate::headless::HeadlessScene`]
//! is the in-memory implementation used by hosts that only need state (and by
//! the tests); renderer-backed implementations live with the host.

/// Handle for a drawing group. Meaningless outside the scene that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u32);

/// Handle for a primitive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Path,
    Circle,
    Line,
    Text,
}

/// Attributes a primitive can carry. Numeric and string values are kept
/// apart so transitions know what they can interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    D,
    Cx,
    Cy,
    R,
    X,
    Y,
    X2,
    Y2,
    Text,
    Fill,
    Stroke,
    StrokeWidth,
    StrokeOpacity,
    FillOpacity,
    Opacity,
    StrokeDasharray,
    StrokeDashoffset,
    StrokeLinecap,
    FontSize,
    FontFamily,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Num(f64),
    Str(String),
}

impl AttrValue {
    pub fn as_num(&self) -> Option<f64> {
        match self {
            AttrValue::Num(n) => Some(*n),
            AttrValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Num(_) => None,
            AttrValue::Str(s) => Some(s),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Num(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

pub trait SceneGraph {
    /// Add a drawing group. `first` puts it at the bottom of the paint
    /// order instead of on top.
    fn create_group(&mut self, name: &str, first: bool) -> GroupId;

    /// Remove a group and every node in it.
    fn remove_group(&mut self, group: GroupId);

    fn create_node(&mut self, group: GroupId, kind: NodeKind) -> NodeId;

    /// Unknown ids are a no-op: a transition may outlive its node.
    fn remove_node(&mut self, node: NodeId);

    /// Write an attribute. Unknown node ids are a no-op.
    fn set_attr(&mut self, node: NodeId, attr: Attr, value: AttrValue);

    fn attr(&self, node: NodeId, attr: Attr) -> Option<AttrValue>;

    /// Move the node to the top of its group's paint order.
    fn raise(&mut self, node: NodeId);

    /// Total geometric length of a path node, 0 for anything else.
    fn path_length(&self, node: NodeId) -> f64;

    fn show_popup(&mut self, x: f64, y: f64, content: &str);

    /// Reposition the popup without touching its content.
    fn move_popup(&mut self, x: f64, y: f64);

    fn hide_popup(&mut self);

    fn set_num(&mut self, node: NodeId, attr: Attr, value: f64) {
        self.set_attr(node, attr, AttrValue::Num(value));
    }

    fn set_str(&mut self, node: NodeId, attr: Attr, value: &str) {
        self.set_attr(node, attr, AttrValue::Str(value.to_string()));
    }
}
