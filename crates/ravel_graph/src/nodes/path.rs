// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path node: a position moved along a line or a closed spline by a
//! parameter `t`, plus the world-position step source.

use super::read_enum;
use crate::evaluation::{ErrorState, EvaluationError, NodeIo};
use crate::node::{NodeBehavior, NodeView, ProducerInfo};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, Value, Vector3};

const DEFAULT_FORWARD: Vector3 = Vector3::new(0.0, 0.0, 1.0);
const DEFAULT_DELTA: Vector3 = Vector3::new(0.1, 0.1, 0.1);

/// What `t` moves along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PathMode {
    /// Start plus `t` along the X axis
    #[default]
    AlongX = 0,
    /// Start plus `t` along the Y axis
    AlongY = 1,
    /// Start plus `t` along the Z axis
    AlongZ = 2,
    /// Start plus `t` along the normalized `forward` input
    AlongVector = 3,
    /// Closed spline through the `points` input, `t` in [0, 1) per lap
    ClosedSpline = 4,
}

impl PathMode {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AlongX),
            1 => Some(Self::AlongY),
            2 => Some(Self::AlongZ),
            3 => Some(Self::AlongVector),
            4 => Some(Self::ClosedSpline),
            _ => None,
        }
    }

    fn inputs(self) -> &'static [&'static str] {
        match self {
            Self::AlongX | Self::AlongY | Self::AlongZ => &["t"],
            Self::AlongVector => &["t", "forward"],
            Self::ClosedSpline => &["t", "points"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::AlongX => "x",
            Self::AlongY => "y",
            Self::AlongZ => "z",
            Self::AlongVector => "vector",
            Self::ClosedSpline => "spline",
        }
    }
}

/// Periodic cubic spline through a closed loop of points, parametrized by
/// chord length. Evaluated in `f64`; positions are narrowed on output.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSpline {
    // Cumulative chord length at every point, closing point included
    knots: Vec<f64>,
    points: Vec<[f64; 3]>,
    // Second derivative at every point, per axis
    moments: Vec<[f64; 3]>,
}

impl ClosedSpline {
    /// Fit a loop through `points`. Consecutive duplicates (the last
    /// point repeating the first included) are dropped. Loops of one or
    /// two distinct points degrade to a constant or a back-and-forth
    /// line. Returns `None` for an empty slice.
    pub fn through(points: &[Vector3]) -> Option<Self> {
        let mut loop_points: Vec<[f64; 3]> = Vec::with_capacity(points.len() + 1);
        for p in points {
            let p = [f64::from(p.x), f64::from(p.y), f64::from(p.z)];
            if loop_points.last() != Some(&p) {
                loop_points.push(p);
            }
        }
        while loop_points.len() > 1 && loop_points.last() == loop_points.first() {
            loop_points.pop();
        }
        let first = *loop_points.first()?;
        loop_points.push(first);

        let mut knots = Vec::with_capacity(loop_points.len());
        let mut length = 0.0;
        knots.push(length);
        for pair in loop_points.windows(2) {
            length += distance(pair[0], pair[1]);
            knots.push(length);
        }

        let segments = loop_points.len() - 1;
        let mut moments = vec![[0.0; 3]; loop_points.len()];
        if segments >= 3 {
            let widths: Vec<f64> = knots.windows(2).map(|k| k[1] - k[0]).collect();
            for axis in 0..3 {
                let values: Vec<f64> = loop_points.iter().map(|p| p[axis]).collect();
                for (i, m) in periodic_moments(&widths, &values).into_iter().enumerate() {
                    moments[i][axis] = m;
                }
            }
            moments[segments] = moments[0];
        }

        Some(Self {
            knots,
            points: loop_points,
            moments,
        })
    }

    /// Total length of one lap
    pub fn length(&self) -> f64 {
        self.knots.last().copied().unwrap_or(0.0)
    }

    /// Position at lap fraction `t`; whole laps wrap, negative `t` runs backwards
    pub fn at(&self, t: f32) -> Vector3 {
        let length = self.length();
        let segments = self.knots.len().saturating_sub(1);
        if segments == 0 || length <= 0.0 {
            return self.points.first().map_or(Vector3::default(), |p| narrow(*p));
        }

        let s = f64::from(t).rem_euclid(1.0) * length;
        let i = self
            .knots
            .partition_point(|k| *k <= s)
            .saturating_sub(1)
            .min(segments - 1);
        let (x0, x1) = (self.knots[i], self.knots[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - s, s - x0);
        let (p0, p1) = (self.points[i], self.points[i + 1]);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);

        narrow(std::array::from_fn(|axis| {
            m0[axis] * a * a * a / (6.0 * h)
                + m1[axis] * b * b * b / (6.0 * h)
                + (p0[axis] / h - m0[axis] * h / 6.0) * a
                + (p1[axis] / h - m1[axis] * h / 6.0) * b
        }))
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(&b).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt()
}

fn narrow(p: [f64; 3]) -> Vector3 {
    Vector3::new(p[0] as f32, p[1] as f32, p[2] as f32)
}

/// Second derivatives of the periodic cubic spline through `values`
/// (one more than `widths`, last equal to first). Requires three or more
/// segments of nonzero width.
fn periodic_moments(widths: &[f64], values: &[f64]) -> Vec<f64> {
    let n = widths.len();
    let mut sub = Vec::with_capacity(n);
    let mut diag = Vec::with_capacity(n);
    let mut sup = Vec::with_capacity(n);
    let mut rhs = Vec::with_capacity(n);
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let (hp, hi) = (widths[prev], widths[i]);
        sub.push(hp);
        diag.push(2.0 * (hp + hi));
        sup.push(hi);
        let slope_next = (values[i + 1] - values[i]) / hi;
        let slope_prev = (values[i] - values[prev]) / hp;
        rhs.push(6.0 * (slope_next - slope_prev));
    }
    solve_cyclic(&sub, &diag, &sup, &rhs)
}

/// Cyclic tridiagonal solve: corners are `sup[n-1]` (bottom left) and
/// `sub[0]` (top right). Sherman-Morrison over two plain solves.
fn solve_cyclic(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let alpha = sup[n - 1];
    let beta = sub[0];
    let gamma = -diag[0];

    let mut adjusted = diag.to_vec();
    adjusted[0] = diag[0] - gamma;
    adjusted[n - 1] = diag[n - 1] - alpha * beta / gamma;

    let x = solve_tridiagonal(sub, &adjusted, sup, rhs);
    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = alpha;
    let z = solve_tridiagonal(sub, &adjusted, sup, &u);

    let factor = (x[0] + beta * x[n - 1] / gamma) / (1.0 + z[0] + beta * z[n - 1] / gamma);
    x.iter().zip(&z).map(|(x, z)| x - factor * z).collect()
}

// Thomas algorithm; sub[0] and sup[n-1] are ignored
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];
    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - sub[i] * c[i - 1];
        c[i] = if i + 1 < n { sup[i] / m } else { 0.0 };
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / m;
    }
    for i in (0..n - 1).rev() {
        d[i] -= c[i] * d[i + 1];
    }
    d
}

/// Publishes a position moved along a path by `t`
#[derive(Debug)]
pub struct PathNode {
    mode: PathMode,
    pending_mode: Option<PathMode>,
    start: Vector3,
    forward: Vector3,
    spline: Option<ClosedSpline>,
    error: ErrorState,
}

impl Default for PathNode {
    fn default() -> Self {
        Self {
            mode: PathMode::AlongX,
            pending_mode: None,
            start: Vector3::default(),
            forward: DEFAULT_FORWARD,
            spline: None,
            error: ErrorState::default(),
        }
    }
}

impl PathNode {
    /// Current mode
    pub fn mode(&self) -> PathMode {
        self.pending_mode.unwrap_or(self.mode)
    }

    /// Switch mode. Inputs are renamed on the next update.
    pub fn set_mode(&mut self, mode: PathMode) {
        self.pending_mode = Some(mode);
    }

    /// Origin of the line modes
    pub fn set_start(&mut self, start: Vector3) {
        self.start = start;
    }

    fn spline_position(&mut self, io: &mut NodeIo<'_>, t: f32) -> Option<Vector3> {
        io.ensure_input_type("points", KindSet::from(Kind::Vector3List));
        let Some(input) = io.input("points") else {
            self.error.report(io.id(), EvaluationError::MissingInput("points".into()));
            return None;
        };
        if self.spline.is_none() || input.is_dirty() {
            self.spline = input.get::<Vec<Vector3>>().ok().and_then(|p| ClosedSpline::through(p.as_slice()));
        }
        match &self.spline {
            Some(spline) => Some(spline.at(t)),
            None => {
                self.error.report(io.id(), EvaluationError::MissingInput("points".into()));
                None
            }
        }
    }
}

impl NodeBehavior for PathNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();

        if let Some(mode) = self.pending_mode.take() {
            if mode != self.mode {
                self.mode = mode;
                self.spline = None;
                self.forward = DEFAULT_FORWARD;
                io.set_inputs_ordered(mode.inputs());
            }
        }

        io.ensure_input_type("t", KindSet::from(Kind::Float));
        let t = io.input_as::<f32>("t").unwrap_or(0.0);

        let position = match self.mode {
            PathMode::AlongX => self.start + Vector3::new(t, 0.0, 0.0),
            PathMode::AlongY => self.start + Vector3::new(0.0, t, 0.0),
            PathMode::AlongZ => self.start + Vector3::new(0.0, 0.0, t),
            PathMode::AlongVector => {
                io.ensure_input_type("forward", KindSet::from(Kind::Vector3));
                if let Some(direction) = io.input_as::<Vector3>("forward") {
                    if direction.length() > f32::EPSILON {
                        self.forward = direction.normalized();
                    }
                }
                self.start + self.forward * t
            }
            PathMode::ClosedSpline => match self.spline_position(io, t) {
                Some(position) => position,
                // Keep the last position until points arrive
                None => return,
            },
        };

        self.error.clear();
        io.publish(0, Value::Vector3(position));
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("mode", self.mode.label());
        if self.mode != PathMode::ClosedSpline {
            view.row("start", Value::Vector3(self.start));
        }
        for output in ports.outputs() {
            view.row(output.name.as_str(), output.value.value());
        }
        self.error.render(view);
    }

    fn on_connection(&mut self, input: &str, _producer: &ProducerInfo) {
        if input == "points" {
            self.spline = None;
        }
    }

    fn on_disconnect(&mut self, input: &str) {
        match input {
            "points" => self.spline = None,
            "forward" => self.forward = DEFAULT_FORWARD,
            _ => {}
        }
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&(self.mode as u8))?;
        buffer.add(&self.pending_mode.map(|m| m as u8))?;
        buffer.add(&self.start)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.mode = read_enum(buffer, "path mode", PathMode::from_u8)?;
        self.pending_mode = match buffer.get::<Option<u8>>()? {
            Some(raw) => Some(
                PathMode::from_u8(raw).ok_or_else(|| SerializationError::Shape(format!("unknown path mode {raw}")))?,
            ),
            None => None,
        };
        self.start = buffer.get()?;
        self.spline = None;
        Ok(())
    }
}

/// Publishes the per-step world-position offset
#[derive(Debug)]
pub struct WorldPosNode {
    delta: Vector3,
    pending: Option<Vector3>,
}

impl Default for WorldPosNode {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            pending: None,
        }
    }
}

impl WorldPosNode {
    /// Offset, including an edit not yet applied
    pub fn delta(&self) -> Vector3 {
        self.pending.unwrap_or(self.delta)
    }

    /// Change the offset. Published on the next update.
    pub fn set_delta(&mut self, delta: Vector3) {
        self.pending = Some(delta);
    }
}

impl NodeBehavior for WorldPosNode {
    fn initialize(&mut self, ports: &mut PortDirectory) {
        if let Some(output) = ports.output_mut(0) {
            output.value.set_value(Value::Vector3(self.delta));
        }
    }

    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        if let Some(delta) = self.pending.take() {
            self.delta = delta;
            io.publish(0, Value::Vector3(delta));
        }
    }

    fn render(&self, _ports: &PortDirectory, view: &mut NodeView) {
        view.row("delta", Value::Vector3(self.delta));
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&self.delta)?;
        buffer.add(&self.pending)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.delta = buffer.get()?;
        self.pending = buffer.get()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{NodeId, NodeType};
    use crate::nodes::{testing, NodeKind};

    fn square() -> Vec<Vector3> {
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ]
    }

    fn assert_near(actual: Vector3, expected: Vector3) {
        assert!(
            (actual - expected).length() < 1e-5,
            "expected {expected:?}, got {actual:?}"
        );
    }

    fn path(graph: &mut Graph, id: NodeId) -> &mut PathNode {
        match graph.node_mut(id).map(|n| n.kind_mut()) {
            Some(NodeKind::Path(node)) => node,
            _ => panic!("not a path node"),
        }
    }

    fn position(graph: &Graph, id: NodeId) -> Vector3 {
        match testing::output(graph, id, 0) {
            Value::Vector3(v) => v,
            other => panic!("expected a position, got {other:?}"),
        }
    }

    #[test]
    fn test_spline_passes_through_points_and_closes() {
        let spline = ClosedSpline::through(&square()).unwrap();
        assert!((spline.length() - 4.0).abs() < 1e-12);
        assert_near(spline.at(0.0), Vector3::new(0.0, 0.0, 0.0));
        assert_near(spline.at(0.25), Vector3::new(1.0, 0.0, 0.0));
        assert_near(spline.at(0.5), Vector3::new(1.0, 1.0, 0.0));
        assert_near(spline.at(0.75), Vector3::new(0.0, 1.0, 0.0));
        assert_near(spline.at(1.0), spline.at(0.0));
    }

    #[test]
    fn test_spline_wraps_whole_laps_and_negative_t() {
        let spline = ClosedSpline::through(&square()).unwrap();
        assert_near(spline.at(1.25), Vector3::new(1.0, 0.0, 0.0));
        assert_near(spline.at(-0.25), Vector3::new(0.0, 1.0, 0.0));
        assert_near(spline.at(2.5), spline.at(0.5));
    }

    #[test]
    fn test_spline_is_smooth_across_the_seam() {
        let spline = ClosedSpline::through(&square()).unwrap();
        // The square is symmetric about x = y, so both sides of the seam mirror
        let before = spline.at(0.99);
        let after = spline.at(0.01);
        assert!((before.x - after.y).abs() < 1e-5);
        assert!((before.y - after.x).abs() < 1e-5);
        assert!((spline.at(0.999) - spline.at(0.001)).length() < 0.01);

        // Curves outward between corners
        let mid = spline.at(0.125);
        assert!((mid.x - 0.5).abs() < 1e-5);
        assert!(mid.y < -0.1);
    }

    #[test]
    fn test_repeated_closing_point_is_ignored() {
        let mut closed = square();
        closed.push(Vector3::new(0.0, 0.0, 0.0));
        closed.insert(1, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(ClosedSpline::through(&closed), ClosedSpline::through(&square()));
    }

    #[test]
    fn test_degenerate_loops() {
        assert_eq!(ClosedSpline::through(&[]), None);

        let single = ClosedSpline::through(&[Vector3::new(2.0, 3.0, 4.0)]).unwrap();
        assert_eq!(single.at(0.7), Vector3::new(2.0, 3.0, 4.0));

        let pair = ClosedSpline::through(&[Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)]).unwrap();
        assert_near(pair.at(0.25), Vector3::new(1.0, 0.0, 0.0));
        assert_near(pair.at(0.5), Vector3::new(2.0, 0.0, 0.0));
        assert_near(pair.at(0.75), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_line_modes_move_from_start() {
        let mut graph = Graph::default();
        let t = testing::source(&mut graph, Value::Float(2.0));
        let id = graph.create_node(NodeType::Path);
        graph.connect(t, 0, id, 0).unwrap();
        path(&mut graph, id).set_start(Vector3::new(1.0, 1.0, 1.0));
        testing::frame(&mut graph);
        assert_eq!(position(&graph, id), Vector3::new(3.0, 1.0, 1.0));

        path(&mut graph, id).set_mode(PathMode::AlongZ);
        testing::frame(&mut graph);
        assert_eq!(position(&graph, id), Vector3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn test_along_vector_normalizes_forward() {
        let mut graph = Graph::default();
        let t = testing::source(&mut graph, Value::Float(10.0));
        let forward = testing::source(&mut graph, Value::Vector3(Vector3::new(0.0, 3.0, 4.0)));
        let id = graph.create_node(NodeType::Path);
        path(&mut graph, id).set_mode(PathMode::AlongVector);
        testing::frame(&mut graph);
        assert_eq!(graph.node(id).unwrap().ports().input_names(), vec!["t", "forward"]);

        graph.connect(t, 0, id, 0).unwrap();
        graph.connect(forward, 0, id, 1).unwrap();
        testing::frame(&mut graph);
        assert_near(position(&graph, id), Vector3::new(0.0, 6.0, 8.0));
    }

    #[test]
    fn test_spline_mode_follows_connected_points() {
        let mut graph = Graph::default();
        let t = testing::source(&mut graph, Value::Float(0.25));
        let points = testing::source(&mut graph, Value::Vector3List(square()));
        let id = graph.create_node(NodeType::Path);
        path(&mut graph, id).set_mode(PathMode::ClosedSpline);
        testing::frame(&mut graph);
        assert_eq!(graph.node(id).unwrap().ports().input_names(), vec!["t", "points"]);
        // No points yet, so nothing is published
        assert_eq!(testing::output(&graph, id, 0), Value::Empty);
        assert_eq!(
            path(&mut graph, id).error.get(),
            Some(&EvaluationError::MissingInput("points".into()))
        );

        graph.connect(t, 0, id, 0).unwrap();
        graph.connect(points, 0, id, 1).unwrap();
        testing::frame(&mut graph);
        assert_near(position(&graph, id), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(path(&mut graph, id).error.get(), None);

        graph.disconnect(id, 1);
        testing::frame(&mut graph);
        assert_near(position(&graph, id), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_mode_switch_drops_renamed_edges() {
        let mut graph = Graph::default();
        let forward = testing::source(&mut graph, Value::Vector3(Vector3::new(1.0, 0.0, 0.0)));
        let id = graph.create_node(NodeType::Path);
        path(&mut graph, id).set_mode(PathMode::AlongVector);
        testing::frame(&mut graph);
        graph.connect(forward, 0, id, 1).unwrap();
        assert_eq!(graph.edges().len(), 1);

        path(&mut graph, id).set_mode(PathMode::ClosedSpline);
        testing::frame(&mut graph);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_pending_mode_survives_save_and_load() {
        let mut graph = Graph::default();
        let id = graph.create_node(NodeType::Path);
        path(&mut graph, id).set_start(Vector3::new(0.0, 5.0, 0.0));
        path(&mut graph, id).set_mode(PathMode::ClosedSpline);
        let bytes = graph.save_scene().unwrap();

        let mut loaded = Graph::default();
        loaded.load_scene(&bytes).unwrap();
        assert_eq!(path(&mut loaded, id).mode(), PathMode::ClosedSpline);
        assert_eq!(path(&mut loaded, id).start, Vector3::new(0.0, 5.0, 0.0));
        testing::frame(&mut loaded);
        assert_eq!(loaded.node(id).unwrap().ports().input_names(), vec!["t", "points"]);
    }

    #[test]
    fn test_world_pos_publishes_delta() {
        let mut graph = Graph::default();
        let id = graph.create_node(NodeType::WorldPos);
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, id, 0), Value::Vector3(DEFAULT_DELTA));

        let edited = Vector3::new(0.0, 0.5, 0.0);
        match graph.node_mut(id).map(|n| n.kind_mut()) {
            Some(NodeKind::WorldPos(node)) => node.set_delta(edited),
            _ => panic!("not a world position node"),
        }
        let bytes = graph.save_scene().unwrap();

        let mut loaded = Graph::default();
        loaded.load_scene(&bytes).unwrap();
        testing::frame(&mut loaded);
        assert_eq!(testing::output(&loaded, id, 0), Value::Vector3(edited));
    }
}
