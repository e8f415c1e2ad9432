//! In-memory scene graph. Holds groups, nodes and attributes exactly as the
//! engine wrote them, so hosts can serialize the state or diff it, and tests
//! can assert on it. Path lengths are measured from the `d` string with the
//! same command vocabulary the engine emits (M, L, S, Z).

use std::collections::HashMap;

use crate::scene::{Attr, AttrValue, GroupId, NodeId, NodeKind, SceneGraph};

#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_id: u32,
    group_order: Vec<GroupId>,
    groups: HashMap<GroupId, GroupState>,
    nodes: HashMap<NodeId, NodeState>,
    popup: PopupState,
}

#[derive(Debug)]
struct GroupState {
    name: String,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct NodeState {
    group: GroupId,
    kind: NodeKind,
    attrs: HashMap<Attr, AttrValue>,
}

#[derive(Debug, Default)]
pub struct PopupState {
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub content: String,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    /// Group names in paint order, bottom first.
    pub fn group_names(&self) -> Vec<&str> {
        self.group_order
            .iter()
            .filter_map(|id| self.groups.get(id))
            .map(|group| group.name.as_str())
            .collect()
    }

    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.group_order
            .iter()
            .copied()
            .find(|id| self.groups.get(id).is_some_and(|g| g.name == name))
    }

    /// Children of a group in paint order, bottom first.
    pub fn nodes_in(&self, group: GroupId) -> &[NodeId] {
        self.groups.get(&group).map(|g| g.children.as_slice()).unwrap_or(&[])
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_attr(&self, node: NodeId, attr: Attr) -> Option<f64> {
        self.nodes.get(&node)?.attrs.get(&attr)?.as_num()
    }

    pub fn str_attr(&self, node: NodeId, attr: Attr) -> Option<&str> {
        self.nodes.get(&node)?.attrs.get(&attr)?.as_str()
    }

    fn fresh_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl SceneGraph for HeadlessScene {
    fn create_group(&mut self, name: &str, first: bool) -> GroupId {
        let id = GroupId(self.fresh_id());
        self.groups.insert(
            id,
            GroupState { name: name.to_string(), children: Vec::new() },
        );
        if first {
            self.group_order.insert(0, id);
        } else {
            self.group_order.push(id);
        }
        id
    }

    fn remove_group(&mut self, group: GroupId) {
        if let Some(state) = self.groups.remove(&group) {
            for node in state.children {
                self.nodes.remove(&node);
            }
            self.group_order.retain(|id| *id != group);
        }
    }

    fn create_node(&mut self, group: GroupId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.fresh_id());
        self.nodes.insert(id, NodeState { group, kind, attrs: HashMap::new() });
        if let Some(state) = self.groups.get_mut(&group) {
            state.children.push(id);
        }
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.remove(&node) {
            if let Some(group) = self.groups.get_mut(&state.group) {
                group.children.retain(|id| *id != node);
            }
        }
    }

    fn set_attr(&mut self, node: NodeId, attr: Attr, value: AttrValue) {
        if let Some(state) = self.nodes.get_mut(&node) {
            state.attrs.insert(attr, value);
        }
    }

    fn attr(&self, node: NodeId, attr: Attr) -> Option<AttrValue> {
        self.nodes.get(&node)?.attrs.get(&attr).cloned()
    }

    fn raise(&mut self, node: NodeId) {
        let Some(group) = self.nodes.get(&node).map(|n| n.group) else {
            return;
        };
        if let Some(state) = self.groups.get_mut(&group) {
            state.children.retain(|id| *id != node);
            state.children.push(node);
        }
    }

    fn path_length(&self, node: NodeId) -> f64 {
        match self.str_attr(node, Attr::D) {
            Some(d) => measure_path(d),
            None => 0.0,
        }
    }

    fn show_popup(&mut self, x: f64, y: f64, content: &str) {
        self.popup.visible = true;
        self.popup.x = x;
        self.popup.y = y;
        self.popup.content = content.to_string();
    }

    fn move_popup(&mut self, x: f64, y: f64) {
        if self.popup.visible {
            self.popup.x = x;
            self.popup.y = y;
        }
    }

    fn hide_popup(&mut self) {
        self.popup.visible = false;
    }
}

const CURVE_SAMPLES: u32 = 32;

/// Walk a path string and sum the segment lengths. Smooth cubics are
/// sampled; everything else is exact.
fn measure_path(d: &str) -> f64 {
    let mut normalized = String::with_capacity(d.len() + 16);
    for c in d.chars() {
        if c.is_ascii_alphabetic() {
            normalized.push(' ');
            normalized.push(c);
            normalized.push(' ');
        } else if c == ',' {
            normalized.push(' ');
        } else {
            normalized.push(c);
        }
    }

    let mut tokens = normalized.split_whitespace();
    let mut total = 0.0;
    let mut cursor = (0.0, 0.0);
    let mut start = (0.0, 0.0);

    while let Some(command) = tokens.next() {
        match command {
            "M" | "m" => {
                let Some(point) = read_pair(&mut tokens) else { break };
                cursor = point;
                start = point;
            }
            "L" | "l" => {
                let Some(point) = read_pair(&mut tokens) else { break };
                total += distance(cursor, point);
                cursor = point;
            }
            "S" | "s" => {
                let Some(control) = read_pair(&mut tokens) else { break };
                let Some(end) = read_pair(&mut tokens) else { break };
                total += smooth_curve_length(cursor, control, end);
                cursor = end;
            }
            "Z" | "z" => {
                total += distance(cursor, start);
                cursor = start;
            }
            _ => {}
        }
    }
    total
}

fn read_pair<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<(f64, f64)> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    Some((x, y))
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

/// Arc length of a smooth cubic. With no preceding curve the reflected
/// first control point collapses onto the current point.
fn smooth_curve_length(from: (f64, f64), control: (f64, f64), to: (f64, f64)) -> f64 {
    let mut length = 0.0;
    let mut prev = from;
    for i in 1..=CURVE_SAMPLES {
        let t = f64::from(i) / f64::from(CURVE_SAMPLES);
        let point = cubic_point(from, from, control, to, t);
        length += distance(prev, point);
        prev = point;
    }
    length
}

fn cubic_point(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}
