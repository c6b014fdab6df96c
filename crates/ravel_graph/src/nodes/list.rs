// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression-driven list generation over up to three dimensions.
//!
//! Element `(i, j, k)` lands at `i + j * sx + k * sx * sy`. Each component
//! of the element kind has its own expression; the variables `i`, `j`, `k`
//! and any user-declared extra variables are in scope.

use super::read_enum;
use crate::evaluation::{ErrorState, EvaluationError, NodeIo};
use crate::expr::{CompiledExpression, ExpressionEngine};
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, Value, Vector2, Vector3, Vector4};

const SIZE_INPUTS: [&str; 3] = ["sizex", "sizey", "sizez"];
const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];
const MAX_ELEMENTS: u64 = 1 << 20;

/// Element kind of a generated list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ListElement {
    /// 32-bit float
    #[default]
    Float = 0,
    /// 32-bit signed integer
    Int = 1,
    /// 32-bit unsigned integer
    UInt = 2,
    /// 2D vector
    Vector2 = 3,
    /// 3D vector
    Vector3 = 4,
    /// 4D vector
    Vector4 = 5,
}

impl ListElement {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Float),
            1 => Some(Self::Int),
            2 => Some(Self::UInt),
            3 => Some(Self::Vector2),
            4 => Some(Self::Vector3),
            5 => Some(Self::Vector4),
            _ => None,
        }
    }

    /// Number of expressions needed per element
    pub fn components(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::UInt => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 => 4,
        }
    }

    /// Kind of the generated list
    pub fn list_kind(self) -> Kind {
        match self {
            Self::Float => Kind::FloatList,
            Self::Int => Kind::IntList,
            Self::UInt => Kind::UIntList,
            Self::Vector2 => Kind::Vector2List,
            Self::Vector3 => Kind::Vector3List,
            Self::Vector4 => Kind::Vector4List,
        }
    }

    fn collect(self, elements: &[[f64; 4]]) -> Value {
        let f = |e: &[f64; 4], c: usize| e[c] as f32;
        match self {
            Self::Float => Value::FloatList(elements.iter().map(|e| f(e, 0)).collect()),
            Self::Int => Value::IntList(elements.iter().map(|e| e[0] as i32).collect()),
            Self::UInt => Value::UIntList(elements.iter().map(|e| e[0] as u32).collect()),
            Self::Vector2 => Value::Vector2List(elements.iter().map(|e| Vector2::new(f(e, 0), f(e, 1))).collect()),
            Self::Vector3 => Value::Vector3List(
                elements
                    .iter()
                    .map(|e| Vector3::new(f(e, 0), f(e, 1), f(e, 2)))
                    .collect(),
            ),
            Self::Vector4 => Value::Vector4List(
                elements
                    .iter()
                    .map(|e| Vector4::new(f(e, 0), f(e, 1), f(e, 2), f(e, 3)))
                    .collect(),
            ),
        }
    }
}

/// Number of size inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ListDimension {
    /// `sizex`
    #[default]
    One = 1,
    /// `sizex`, `sizey`
    Two = 2,
    /// `sizex`, `sizey`, `sizez`
    Three = 3,
}

impl ListDimension {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }
}

/// Generates a list from per-component expressions
#[derive(Debug)]
pub struct ListNode {
    element: ListElement,
    dimension: ListDimension,
    extra_vars: String,
    sources: [String; 4],
    compiled: [Option<CompiledExpression>; 4],
    ports_stale: bool,
    exprs_stale: bool,
    var_names: Vec<String>,
    last_shape: Option<(ListElement, [u32; 3])>,
    last_vars: Vec<f64>,
    error: ErrorState,
}

impl Default for ListNode {
    fn default() -> Self {
        Self {
            element: ListElement::Float,
            dimension: ListDimension::One,
            extra_vars: String::new(),
            sources: ["i".to_string(), "0".to_string(), "0".to_string(), "0".to_string()],
            compiled: Default::default(),
            ports_stale: true,
            exprs_stale: true,
            var_names: Vec::new(),
            last_shape: None,
            last_vars: Vec::new(),
            error: ErrorState::default(),
        }
    }
}

impl ListNode {
    /// Element kind
    pub fn element(&self) -> ListElement {
        self.element
    }

    /// Change the element kind
    pub fn set_element(&mut self, element: ListElement) {
        self.element = element;
    }

    /// Change the number of size inputs. Takes effect on the next update.
    pub fn set_dimension(&mut self, dimension: ListDimension) {
        self.dimension = dimension;
        self.ports_stale = true;
    }

    /// Declare extra variables, separated by semicolons. Each becomes a
    /// float input on the next update.
    pub fn set_extra_vars(&mut self, vars: impl Into<String>) {
        self.extra_vars = vars.into();
        self.ports_stale = true;
    }

    /// Set the expression for component `component` (0 = x ... 3 = w)
    pub fn set_expression(&mut self, component: usize, source: impl Into<String>) {
        if let Some(slot) = self.sources.get_mut(component) {
            *slot = source.into();
            self.exprs_stale = true;
        }
    }

    fn parse_extra_vars(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.extra_vars.split(';').map(str::trim) {
            let reserved = name.is_empty() || ["i", "j", "k"].contains(&name) || SIZE_INPUTS.contains(&name);
            if !reserved && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    fn input_names(&self) -> Vec<String> {
        SIZE_INPUTS[..self.dimension as usize]
            .iter()
            .map(|s| s.to_string())
            .chain(self.var_names.iter().cloned())
            .collect()
    }

    fn recompile(&mut self, engine: &ExpressionEngine) -> Result<(), EvaluationError> {
        for (slot, source) in self.compiled.iter_mut().zip(&self.sources) {
            *slot = if source.trim().is_empty() {
                None
            } else {
                Some(engine.compile(source)?)
            };
        }
        Ok(())
    }

    fn generate(&self, engine: &ExpressionEngine, size: [u32; 3], vars: &[f64]) -> Result<Value, EvaluationError> {
        let [sx, sy, sz] = size;
        let total = u64::from(sx) * u64::from(sy) * u64::from(sz);
        if total > MAX_ELEMENTS {
            return Err(EvaluationError::Custom(format!(
                "list of {total} elements exceeds the limit of {MAX_ELEMENTS}"
            )));
        }

        let mut bindings: Vec<(&str, f64)> = vec![("i", 0.0), ("j", 0.0), ("k", 0.0)];
        bindings.extend(self.var_names.iter().map(String::as_str).zip(vars.iter().copied()));

        let components = self.element.components();
        let mut elements = Vec::with_capacity(total as usize);
        for k in 0..sz {
            for j in 0..sy {
                for i in 0..sx {
                    bindings[0].1 = f64::from(i);
                    bindings[1].1 = f64::from(j);
                    bindings[2].1 = f64::from(k);
                    let mut element = [0.0; 4];
                    for (c, slot) in element.iter_mut().enumerate().take(components) {
                        if let Some(expr) = &self.compiled[c] {
                            *slot = engine.eval(expr, &bindings)?;
                        }
                    }
                    elements.push(element);
                }
            }
        }
        Ok(self.element.collect(&elements))
    }
}

impl NodeBehavior for ListNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        let mut force = false;

        if self.ports_stale {
            self.ports_stale = false;
            self.var_names = self.parse_extra_vars();
            let names = self.input_names();
            io.set_inputs_ordered(&names);
            force = true;
        }

        if self.exprs_stale {
            self.exprs_stale = false;
            match self.recompile(io.expressions()) {
                Ok(()) => self.error.clear(),
                Err(error) => {
                    self.error.report(io.id(), error);
                    return;
                }
            }
            force = true;
        }

        let mut size = [1u32; 3];
        let mut has_size = false;
        for (name, extent) in SIZE_INPUTS.iter().zip(size.iter_mut()).take(self.dimension as usize) {
            io.ensure_input_type(name, KindSet::from(Kind::UInt));
            if let Some(value) = io.input_as::<u32>(name) {
                *extent = value;
                has_size = true;
            }
        }

        let mut vars = Vec::with_capacity(self.var_names.len());
        for name in &self.var_names {
            io.ensure_input_type(name, KindSet::from(Kind::Float));
            vars.push(io.input_as::<f32>(name).map_or(0.0, f64::from));
        }

        if !has_size {
            self.error
                .report(io.id(), EvaluationError::MissingInput(SIZE_INPUTS[0].to_string()));
            return;
        }

        let shape = (self.element, size);
        if !force && self.last_shape == Some(shape) && self.last_vars == vars {
            return;
        }

        match self.generate(io.expressions(), size, &vars) {
            Ok(list) => {
                self.error.clear();
                io.publish(0, list);
                self.last_shape = Some(shape);
                self.last_vars = vars;
            }
            Err(error) => self.error.report(io.id(), error),
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("kind", self.element.list_kind());
        view.row("dimension", self.dimension as u8);
        if !self.extra_vars.is_empty() {
            view.row("variables", &self.extra_vars);
        }
        for (name, source) in COMPONENTS.iter().zip(&self.sources).take(self.element.components()) {
            view.row(*name, source);
        }
        if let Some(output) = ports.output(0) {
            view.row("list", output.value.value());
        }
        self.error.render(view);
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&(self.element as u8))?;
        buffer.add(&(self.dimension as u8))?;
        buffer.add(&self.extra_vars)?;
        for source in &self.sources {
            buffer.add(source)?;
        }
        Ok(())
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.element = read_enum(buffer, "list element", ListElement::from_u8)?;
        self.dimension = read_enum(buffer, "list dimension", ListDimension::from_u8)?;
        self.extra_vars = buffer.get()?;
        for source in &mut self.sources {
            *source = buffer.get()?;
        }
        self.ports_stale = true;
        self.exprs_stale = true;
        self.last_shape = None;
        Ok(())
    }
}
