// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime-typed values carried by output ports.
//!
//! A [`TypedValue`] holds exactly one [`Value`] out of a closed set of kinds
//! plus the per-frame dirty flag that drives change propagation. The kind tag
//! space is split in two regions so that "is this a list" is a range check:
//! scalar kinds live below [`LIST_TAG_OFFSET`], list kinds at or above it.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// First tag of the list region
pub const LIST_TAG_OFFSET: u8 = 0x10;

macro_rules! vector_ops {
    ($name:ident { $($field:ident),+ }) => {
        impl $name {
            /// Combine two vectors component by component
            pub fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
                Self { $($field: f(self.$field, other.$field)),+ }
            }

            /// Apply `f` to every component
            pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
                Self { $($field: f(self.$field)),+ }
            }

            /// Components in declaration order
            pub fn as_slice(&self) -> &[f32] {
                bytemuck::cast_slice(std::slice::from_ref(self))
            }

            /// Dot product
            pub fn dot(self, other: Self) -> f32 {
                0.0 $(+ self.$field * other.$field)+
            }

            /// Euclidean length
            pub fn length(self) -> f32 {
                self.dot(self).sqrt()
            }

            /// Unit vector in the same direction, or `self` when the length is zero
            pub fn normalized(self) -> Self {
                let length = self.length();
                if length > 0.0 {
                    self.map(|c| c / length)
                } else {
                    self
                }
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a + b)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a - b)
            }
        }

        impl Mul for $name {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a * b)
            }
        }

        impl Div for $name {
            type Output = Self;
            fn div(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a / b)
            }
        }

        impl Mul<f32> for $name {
            type Output = Self;
            fn mul(self, rhs: f32) -> Self {
                self.map(|c| c * rhs)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "(")?;
                for (i, c) in self.as_slice().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c:.3}")?;
                }
                write!(f, ")")
            }
        }
    };
}

/// 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Vector2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vector2 {
    /// Create a new vector
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Vector3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vector3 {
    /// Create a new vector
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// 4D vector / RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Vector4 {
    /// X component (red)
    pub x: f32,
    /// Y component (green)
    pub y: f32,
    /// Z component (blue)
    pub z: f32,
    /// W component (alpha)
    pub w: f32,
}

impl Vector4 {
    /// Create a new vector
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

vector_ops!(Vector2 { x, y });
vector_ops!(Vector3 { x, y, z });
vector_ops!(Vector4 { x, y, z, w });

/// Interleaved mesh vertex buffer: position followed by normal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    /// `FLOATS_PER_VERTEX` floats per vertex
    pub vertices: Vec<f32>,
}

impl MeshData {
    /// Floats stored for every vertex (xyz position, xyz normal)
    pub const FLOATS_PER_VERTEX: usize = 6;

    /// Number of complete vertices in the buffer
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::FLOATS_PER_VERTEX
    }
}

/// Composite parameters consumed by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderData {
    /// Number of instances to draw
    pub instance_count: u32,
    /// Per-instance world position
    pub positions: Vec<Vector3>,
    /// Per-instance color
    pub colors: Vec<Vector4>,
    /// Vertex count of the instanced mesh (0 when none is connected)
    pub mesh_vertex_count: u32,
    /// Distance at which fog starts
    pub fog_min: f32,
    /// Distance at which fog is opaque
    pub fog_max: f32,
    /// Fog color
    pub fog_color: Vector3,
}

impl Default for RenderData {
    fn default() -> Self {
        Self {
            instance_count: 0,
            positions: Vec::new(),
            colors: Vec::new(),
            mesh_vertex_count: 0,
            fog_min: 10.0,
            fog_max: 50.0,
            fog_color: Vector3::new(0.7, 0.7, 0.7),
        }
    }
}

/// Kind tag of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    /// No value yet
    Empty = 0x00,
    /// 32-bit float
    Float = 0x01,
    /// 32-bit signed integer
    Int = 0x02,
    /// 32-bit unsigned integer
    UInt = 0x03,
    /// 2D vector
    Vector2 = 0x04,
    /// 3D vector
    Vector3 = 0x05,
    /// 4D vector
    Vector4 = 0x06,
    /// Fixed-size array of floats
    FloatArray = 0x07,
    /// Mesh vertex buffer
    Mesh = 0x08,
    /// Composite render parameters
    Render = 0x09,
    /// List of floats
    FloatList = 0x11,
    /// List of signed integers
    IntList = 0x12,
    /// List of unsigned integers
    UIntList = 0x13,
    /// List of 2D vectors
    Vector2List = 0x14,
    /// List of 3D vectors
    Vector3List = 0x15,
    /// List of 4D vectors
    Vector4List = 0x16,
}

impl Kind {
    /// Every kind, scalar region first
    pub const ALL: [Kind; 16] = [
        Kind::Empty,
        Kind::Float,
        Kind::Int,
        Kind::UInt,
        Kind::Vector2,
        Kind::Vector3,
        Kind::Vector4,
        Kind::FloatArray,
        Kind::Mesh,
        Kind::Render,
        Kind::FloatList,
        Kind::IntList,
        Kind::UIntList,
        Kind::Vector2List,
        Kind::Vector3List,
        Kind::Vector4List,
    ];

    /// Wire tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by its wire tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Whether this is a list kind
    pub const fn is_list(self) -> bool {
        self.tag() >= LIST_TAG_OFFSET
    }

    /// Element kind of a list, or the kind itself for scalars
    pub fn element(self) -> Kind {
        if self.is_list() {
            Self::from_tag(self.tag() - LIST_TAG_OFFSET).unwrap_or(Kind::Empty)
        } else {
            self
        }
    }

    /// List kind holding elements of this kind, if one exists
    pub fn list_of(self) -> Option<Kind> {
        match self {
            Kind::Float | Kind::Int | Kind::UInt | Kind::Vector2 | Kind::Vector3 | Kind::Vector4 => {
                Self::from_tag(self.tag() + LIST_TAG_OFFSET)
            }
            _ => None,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Kind::Empty => "empty",
            Kind::Float => "float",
            Kind::Int => "int",
            Kind::UInt => "uint",
            Kind::Vector2 => "Vector2",
            Kind::Vector3 => "Vector3",
            Kind::Vector4 => "Vector4",
            Kind::FloatArray => "float[]",
            Kind::Mesh => "mesh data",
            Kind::Render => "render data",
            Kind::FloatList => "list<float>",
            Kind::IntList => "list<int>",
            Kind::UIntList => "list<uint>",
            Kind::Vector2List => "list<Vector2>",
            Kind::Vector3List => "list<Vector3>",
            Kind::Vector4List => "list<Vector4>",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of kinds accepted by an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u32);

impl KindSet {
    /// Accepts nothing
    pub const NONE: KindSet = KindSet(0);

    /// Scalars and vectors
    pub const NUMERIC: KindSet = KindSet::of(&[
        Kind::Float,
        Kind::Int,
        Kind::UInt,
        Kind::Vector2,
        Kind::Vector3,
        Kind::Vector4,
    ]);

    /// Every list kind
    pub const LISTS: KindSet = KindSet::of(&[
        Kind::FloatList,
        Kind::IntList,
        Kind::UIntList,
        Kind::Vector2List,
        Kind::Vector3List,
        Kind::Vector4List,
    ]);

    /// Every non-empty, non-list kind
    pub const SINGLE: KindSet = KindSet::of(&[
        Kind::Float,
        Kind::Int,
        Kind::UInt,
        Kind::Vector2,
        Kind::Vector3,
        Kind::Vector4,
        Kind::FloatArray,
        Kind::Mesh,
        Kind::Render,
    ]);

    /// Build a set from a list of kinds
    pub const fn of(kinds: &[Kind]) -> Self {
        let mut bits = 0u32;
        let mut i = 0;
        while i < kinds.len() {
            bits |= 1 << (kinds[i] as u8);
            i += 1;
        }
        Self(bits)
    }

    /// Whether `kind` is in the set
    pub const fn contains(self, kind: Kind) -> bool {
        self.0 & (1 << (kind as u8)) != 0
    }

    /// Whether the set accepts nothing
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Union of two sets
    pub const fn union(self, other: KindSet) -> KindSet {
        KindSet(self.0 | other.0)
    }

    /// Kinds in the set, in tag order
    pub fn iter(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl From<Kind> for KindSet {
    fn from(kind: Kind) -> Self {
        KindSet::of(&[kind])
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(kind.name())?;
        }
        Ok(())
    }
}

/// Payload of a typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value yet
    #[default]
    Empty,
    /// 32-bit float
    Float(f32),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit unsigned integer
    UInt(u32),
    /// 2D vector
    Vector2(Vector2),
    /// 3D vector
    Vector3(Vector3),
    /// 4D vector
    Vector4(Vector4),
    /// Fixed-size array of floats
    FloatArray(Box<[f32]>),
    /// Mesh vertex buffer
    Mesh(MeshData),
    /// Composite render parameters
    Render(RenderData),
    /// List of floats
    FloatList(Vec<f32>),
    /// List of signed integers
    IntList(Vec<i32>),
    /// List of unsigned integers
    UIntList(Vec<u32>),
    /// List of 2D vectors
    Vector2List(Vec<Vector2>),
    /// List of 3D vectors
    Vector3List(Vec<Vector3>),
    /// List of 4D vectors
    Vector4List(Vec<Vector4>),
}

impl Value {
    /// Kind tag of this payload
    pub fn kind(&self) -> Kind {
        match self {
            Value::Empty => Kind::Empty,
            Value::Float(_) => Kind::Float,
            Value::Int(_) => Kind::Int,
            Value::UInt(_) => Kind::UInt,
            Value::Vector2(_) => Kind::Vector2,
            Value::Vector3(_) => Kind::Vector3,
            Value::Vector4(_) => Kind::Vector4,
            Value::FloatArray(_) => Kind::FloatArray,
            Value::Mesh(_) => Kind::Mesh,
            Value::Render(_) => Kind::Render,
            Value::FloatList(_) => Kind::FloatList,
            Value::IntList(_) => Kind::IntList,
            Value::UIntList(_) => Kind::UIntList,
            Value::Vector2List(_) => Kind::Vector2List,
            Value::Vector3List(_) => Kind::Vector3List,
            Value::Vector4List(_) => Kind::Vector4List,
        }
    }

    /// Element count of a list payload
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Value::FloatList(v) => Some(v.len()),
            Value::IntList(v) => Some(v.len()),
            Value::UIntList(v) => Some(v.len()),
            Value::Vector2List(v) => Some(v.len()),
            Value::Vector3List(v) => Some(v.len()),
            Value::Vector4List(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Raw bytes of a list payload, starting at the first element
    pub fn list_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::FloatList(v) => Some(bytemuck::cast_slice(v)),
            Value::IntList(v) => Some(bytemuck::cast_slice(v)),
            Value::UIntList(v) => Some(bytemuck::cast_slice(v)),
            Value::Vector2List(v) => Some(bytemuck::cast_slice(v)),
            Value::Vector3List(v) => Some(bytemuck::cast_slice(v)),
            Value::Vector4List(v) => Some(bytemuck::cast_slice(v)),
            _ => None,
        }
    }

    /// Encode the payload as raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ValueError> {
        if let Some(bytes) = self.list_bytes() {
            return Ok(bytes.to_vec());
        }
        Ok(match self {
            Value::Empty => Vec::new(),
            Value::Float(v) => bytemuck::bytes_of(v).to_vec(),
            Value::Int(v) => bytemuck::bytes_of(v).to_vec(),
            Value::UInt(v) => bytemuck::bytes_of(v).to_vec(),
            Value::Vector2(v) => bytemuck::bytes_of(v).to_vec(),
            Value::Vector3(v) => bytemuck::bytes_of(v).to_vec(),
            Value::Vector4(v) => bytemuck::bytes_of(v).to_vec(),
            Value::FloatArray(v) => bytemuck::cast_slice(v).to_vec(),
            Value::Mesh(mesh) => bytemuck::cast_slice(&mesh.vertices).to_vec(),
            Value::Render(data) => {
                bincode::serialize(data).map_err(|e| ValueError::Encoding(e.to_string()))?
            }
            // Handled by list_bytes above
            _ => Vec::new(),
        })
    }

    /// Decode a payload of `kind` from raw bytes
    pub fn from_bytes(kind: Kind, bytes: &[u8]) -> Result<Self, ValueError> {
        Ok(match kind {
            Kind::Empty if bytes.is_empty() => Value::Empty,
            Kind::Empty => return Err(ValueError::PayloadSize { kind, len: bytes.len() }),
            Kind::Float => Value::Float(read_pod(kind, bytes)?),
            Kind::Int => Value::Int(read_pod(kind, bytes)?),
            Kind::UInt => Value::UInt(read_pod(kind, bytes)?),
            Kind::Vector2 => Value::Vector2(read_pod(kind, bytes)?),
            Kind::Vector3 => Value::Vector3(read_pod(kind, bytes)?),
            Kind::Vector4 => Value::Vector4(read_pod(kind, bytes)?),
            Kind::FloatArray => Value::FloatArray(read_pods::<f32>(kind, bytes)?.into_boxed_slice()),
            Kind::Mesh => Value::Mesh(MeshData {
                vertices: read_pods(kind, bytes)?,
            }),
            Kind::Render => Value::Render(
                bincode::deserialize(bytes).map_err(|e| ValueError::Encoding(e.to_string()))?,
            ),
            Kind::FloatList => Value::FloatList(read_pods(kind, bytes)?),
            Kind::IntList => Value::IntList(read_pods(kind, bytes)?),
            Kind::UIntList => Value::UIntList(read_pods(kind, bytes)?),
            Kind::Vector2List => Value::Vector2List(read_pods(kind, bytes)?),
            Kind::Vector3List => Value::Vector3List(read_pods(kind, bytes)?),
            Kind::Vector4List => Value::Vector4List(read_pods(kind, bytes)?),
        })
    }
}

fn read_pod<T: Pod>(kind: Kind, bytes: &[u8]) -> Result<T, ValueError> {
    if bytes.len() != std::mem::size_of::<T>() {
        return Err(ValueError::PayloadSize { kind, len: bytes.len() });
    }
    Ok(bytemuck::pod_read_unaligned(bytes))
}

fn read_pods<T: Pod>(kind: Kind, bytes: &[u8]) -> Result<Vec<T>, ValueError> {
    if bytes.len() % std::mem::size_of::<T>() != 0 {
        return Err(ValueError::PayloadSize { kind, len: bytes.len() });
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

fn fmt_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    const SHOWN: usize = 4;
    write!(f, "[")?;
    for (i, item) in items.iter().take(SHOWN).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    if items.len() > SHOWN {
        write!(f, ", ... ({} items)", items.len())?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("-"),
            Value::Float(v) => write!(f, "{v:.3}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Vector2(v) => write!(f, "{v}"),
            Value::Vector3(v) => write!(f, "{v}"),
            Value::Vector4(v) => write!(f, "{v}"),
            Value::FloatArray(v) => fmt_list(f, v),
            Value::Mesh(mesh) => write!(f, "mesh ({} vertices)", mesh.vertex_count()),
            Value::Render(data) => write!(
                f,
                "render ({} instances, {} mesh vertices)",
                data.instance_count, data.mesh_vertex_count
            ),
            Value::FloatList(v) => fmt_list(f, v),
            Value::IntList(v) => fmt_list(f, v),
            Value::UIntList(v) => fmt_list(f, v),
            Value::Vector2List(v) => fmt_list(f, v),
            Value::Vector3List(v) => fmt_list(f, v),
            Value::Vector4List(v) => fmt_list(f, v),
        }
    }
}

/// Rust types that map onto exactly one value kind
pub trait ValueType: Sized {
    /// Kind tag of this type
    const KIND: Kind;

    /// Borrow the payload if it holds this type
    fn from_value(value: &Value) -> Option<&Self>;

    /// Mutably borrow the payload if it holds this type
    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;

    /// Wrap into a payload
    fn into_value(self) -> Value;
}

macro_rules! value_type {
    ($ty:ty, $variant:ident) => {
        impl ValueType for $ty {
            const KIND: Kind = Kind::$variant;

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

value_type!(f32, Float);
value_type!(i32, Int);
value_type!(u32, UInt);
value_type!(Vector2, Vector2);
value_type!(Vector3, Vector3);
value_type!(Vector4, Vector4);
value_type!(MeshData, Mesh);
value_type!(RenderData, Render);
value_type!(Vec<f32>, FloatList);
value_type!(Vec<i32>, IntList);
value_type!(Vec<u32>, UIntList);
value_type!(Vec<Vector2>, Vector2List);
value_type!(Vec<Vector3>, Vector3List);
value_type!(Vec<Vector4>, Vector4List);

/// A value together with its change flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedValue {
    value: Value,
    dirty: bool,
}

impl TypedValue {
    /// Create a value that starts out dirty
    pub fn new(value: Value) -> Self {
        Self { value, dirty: true }
    }

    /// Current payload
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Current kind
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Whether the payload is a list
    pub fn is_list(&self) -> bool {
        self.kind().is_list()
    }

    /// Whether the payload is a fixed-size array
    pub fn is_fixed_array(&self) -> bool {
        matches!(self.value, Value::FloatArray(_))
    }

    /// Whether no payload has been set
    pub fn is_empty(&self) -> bool {
        matches!(self.value, Value::Empty)
    }

    /// Whether the kind is one of `kinds`
    pub fn is_of(&self, kinds: KindSet) -> bool {
        kinds.contains(self.kind())
    }

    /// Borrow the payload as `T`
    pub fn get<T: ValueType>(&self) -> Result<&T, ValueError> {
        if self.is_fixed_array() {
            return Err(ValueError::ArrayAccess);
        }
        T::from_value(&self.value).ok_or(ValueError::TypeMismatch {
            expected: T::KIND,
            found: self.kind(),
        })
    }

    /// Mutably borrow the payload as `T`. Call [`mark_dirty`](Self::mark_dirty)
    /// after editing in place.
    pub fn get_mut<T: ValueType>(&mut self) -> Result<&mut T, ValueError> {
        if self.is_fixed_array() {
            return Err(ValueError::ArrayAccess);
        }
        let found = self.kind();
        T::from_value_mut(&mut self.value).ok_or(ValueError::TypeMismatch {
            expected: T::KIND,
            found,
        })
    }

    /// Borrow a fixed-size array payload
    pub fn get_array(&self) -> Result<&[f32], ValueError> {
        match &self.value {
            Value::FloatArray(values) => Ok(values),
            other => Err(ValueError::NotAnArray(other.kind())),
        }
    }

    /// Mutably borrow a fixed-size array payload
    pub fn get_array_mut(&mut self) -> Result<&mut [f32], ValueError> {
        match &mut self.value {
            Value::FloatArray(values) => Ok(values),
            other => Err(ValueError::NotAnArray(other.kind())),
        }
    }

    /// Replace the payload with `value`
    pub fn set<T: ValueType>(&mut self, value: T) {
        self.replace(value.into_value());
    }

    /// Replace the payload with a fixed-size array, reusing the buffer when
    /// the length matches
    pub fn set_array(&mut self, values: &[f32]) {
        match &mut self.value {
            Value::FloatArray(current) if current.len() == values.len() => {
                current.copy_from_slice(values);
                self.dirty = true;
            }
            _ => self.replace(Value::FloatArray(values.into())),
        }
    }

    /// Replace the payload with an arbitrary value
    pub fn set_value(&mut self, value: Value) {
        self.replace(value);
    }

    /// Replace the payload with `kind` decoded from raw bytes
    pub fn set_raw(&mut self, kind: Kind, bytes: &[u8]) -> Result<(), ValueError> {
        let value = Value::from_bytes(kind, bytes)?;
        self.replace(value);
        Ok(())
    }

    /// Raw payload bytes
    pub fn to_raw(&self) -> Result<Vec<u8>, ValueError> {
        self.value.to_bytes()
    }

    /// Element count when the payload is a list
    pub fn list_len(&self) -> Option<usize> {
        self.value.list_len()
    }

    /// Raw bytes of a list payload
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.value.list_bytes()
    }

    /// Whether the payload changed since the flag was last cleared
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset the change flag
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Flag an in-place edit
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn replace(&mut self, value: Value) {
        if value.kind() != self.kind() {
            tracing::debug!(from = %self.kind(), to = %value.kind(), "Typed value changed base kind");
        }
        self.value = value;
        self.dirty = true;
    }
}

impl From<Value> for TypedValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Error accessing a typed value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Stored kind differs from the requested one
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested kind
        expected: Kind,
        /// Stored kind
        found: Kind,
    },

    /// Value accessor used on a fixed-size array
    #[error("Value stores a fixed array; use the array accessor")]
    ArrayAccess,

    /// Array accessor used on a non-array value
    #[error("Value of kind {0} is not a fixed array")]
    NotAnArray(Kind),

    /// Raw bytes do not fit the kind
    #[error("Payload of {len} bytes does not fit kind {kind}")]
    PayloadSize {
        /// Target kind
        kind: Kind,
        /// Number of bytes supplied
        len: usize,
    },

    /// Unknown wire tag
    #[error("Unknown kind tag: {0:#04x}")]
    UnknownTag(u8),

    /// Structured payload failed to encode or decode
    #[error("Structured payload codec error: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_tags_are_offset() {
        for kind in Kind::ALL {
            assert_eq!(kind.is_list(), kind.tag() >= LIST_TAG_OFFSET);
            assert_eq!(Kind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(Kind::Vector3.list_of(), Some(Kind::Vector3List));
        assert_eq!(Kind::Vector3List.element(), Kind::Vector3);
        assert_eq!(Kind::Mesh.list_of(), None);
        assert_eq!(Kind::from_tag(0x42), None);
    }

    #[test]
    fn test_get_checks_kind() {
        let value = TypedValue::new(Value::Float(1.5));
        assert_eq!(value.get::<f32>(), Ok(&1.5));
        assert_eq!(
            value.get::<i32>(),
            Err(ValueError::TypeMismatch {
                expected: Kind::Int,
                found: Kind::Float
            })
        );
    }

    #[test]
    fn test_fixed_array_accessors_are_distinct() {
        let mut value = TypedValue::default();
        value.set_array(&[1.0, 2.0, 3.0, 4.0]);
        assert!(value.is_fixed_array());
        assert_eq!(value.get::<f32>(), Err(ValueError::ArrayAccess));
        assert_eq!(value.get_array().map(<[f32]>::len), Ok(4));

        let scalar = TypedValue::new(Value::UInt(3));
        assert_eq!(scalar.get_array(), Err(ValueError::NotAnArray(Kind::UInt)));
    }

    #[test]
    fn test_set_switches_kind_and_marks_dirty() {
        let mut value = TypedValue::new(Value::Float(1.0));
        value.clear_dirty();
        value.set(vec![Vector2::new(1.0, 2.0)]);
        assert_eq!(value.kind(), Kind::Vector2List);
        assert!(value.is_list());
        assert_eq!(value.list_len(), Some(1));
        assert_eq!(value.as_bytes().map(<[u8]>::len), Some(8));
        assert!(value.is_dirty());
    }

    #[test]
    fn test_raw_payload_restores_list() {
        let source = TypedValue::new(Value::Vector3List(vec![
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-1.0, 0.5, 0.0),
        ]));
        let bytes = source.to_raw().unwrap();

        let mut restored = TypedValue::default();
        restored.set_raw(Kind::Vector3List, &bytes).unwrap();
        assert_eq!(restored.value(), source.value());

        let err = restored.set_raw(Kind::Vector3List, &bytes[..7]).unwrap_err();
        assert_eq!(err, ValueError::PayloadSize { kind: Kind::Vector3List, len: 7 });
    }

    #[test]
    fn test_render_payload_uses_structured_codec() {
        let data = RenderData {
            instance_count: 2,
            positions: vec![Vector3::default(); 2],
            ..RenderData::default()
        };
        let bytes = Value::Render(data.clone()).to_bytes().unwrap();
        assert_eq!(Value::from_bytes(Kind::Render, &bytes), Ok(Value::Render(data)));
    }

    #[test]
    fn test_vector_arithmetic_is_component_wise() {
        let a = Vector4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vector4::new(2.0, 2.0, 2.0, 2.0);
        assert_eq!(a + b, Vector4::new(3.0, 4.0, 5.0, 6.0));
        assert_eq!(a / b, Vector4::new(0.5, 1.0, 1.5, 2.0));
        assert_eq!(a * 2.0, Vector4::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(Vector3::new(3.0, 0.0, 4.0).normalized(), Vector3::new(0.6, 0.0, 0.8));
    }

    #[test]
    fn test_kind_set_display() {
        let set = KindSet::of(&[Kind::UInt, Kind::Int]);
        assert!(set.contains(Kind::Int));
        assert!(!set.contains(Kind::Float));
        assert_eq!(set.to_string(), "int | uint");
        assert_eq!(KindSet::NONE.to_string(), "none");
        assert!(KindSet::LISTS.iter().all(Kind::is_list));
    }

    proptest! {
        #[test]
        fn prop_clear_then_check_is_clean(v in any::<f32>()) {
            let mut value = TypedValue::new(Value::Float(v));
            value.clear_dirty();
            prop_assert!(!value.is_dirty());
        }

        #[test]
        fn prop_set_then_check_is_dirty(start in any::<i32>(), next in any::<i32>()) {
            let mut value = TypedValue::new(Value::Int(start));
            value.clear_dirty();
            value.set(next);
            prop_assert!(value.is_dirty());
        }
    }
}
