//! Vertex formats and packed attribute encodings

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// Component type of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompType {
    F32,
    I32,
    U32,
    I16,
    U8,
    /// 10-10-10-2 packed signed normal in one 32-bit word
    I10,
}

impl CompType {
    pub fn size(self) -> usize {
        match self {
            CompType::F32 | CompType::I32 | CompType::U32 => 4,
            CompType::I16 => 2,
            CompType::U8 => 1,
            CompType::I10 => 4,
        }
    }
}

/// One named attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertAttr {
    pub name: &'static str,
    pub comp: CompType,
    pub len: usize,
}

impl VertAttr {
    pub fn size(&self) -> usize {
        // Packed normals store all components in one word
        if self.comp == CompType::I10 { 4 } else { self.comp.size() * self.len }
    }
}

/// Interleaved attribute layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertFormat {
    attrs: Vec<VertAttr>,
}

impl VertFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder style)
    pub fn attr(mut self, name: &'static str, comp: CompType, len: usize) -> Self {
        self.attrs.push(VertAttr { name, comp, len });
        self
    }

    pub fn attrs(&self) -> &[VertAttr] {
        &self.attrs
    }

    pub fn attr_len(&self) -> usize {
        self.attrs.len()
    }

    /// Bytes per vertex, padded to a multiple of 4
    pub fn stride(&self) -> usize {
        let size: usize = self.attrs.iter().map(VertAttr::size).sum();
        size.div_ceil(4) * 4
    }

    /// Byte offset of the named attribute
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for attr in &self.attrs {
            if attr.name == name {
                return Some(offset);
            }
            offset += attr.size();
        }
        None
    }
}

/// Normal packed as signed 10-10-10-2.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedNormal(pub u32);

fn pack_i10(x: f32) -> u32 {
    let v = (x.clamp(-1.0, 1.0) * 511.0).round() as i32;
    (v as u32) & 0x3ff
}

fn unpack_i10(bits: u32) -> f32 {
    // Sign-extend the 10-bit field
    let v = ((bits << 22) as i32) >> 22;
    v as f32 / 511.0
}

impl PackedNormal {
    /// Pack a unit vector with the 2-bit `w` flag (-1, 0 or 1).
    pub fn new(n: Vec3, w: i32) -> Self {
        let w = (w.clamp(-2, 1) as u32) & 0x3;
        Self(pack_i10(n.x) | (pack_i10(n.y) << 10) | (pack_i10(n.z) << 20) | (w << 30))
    }

    pub fn normal(self) -> Vec3 {
        Vec3::new(
            unpack_i10(self.0),
            unpack_i10(self.0 >> 10),
            unpack_i10(self.0 >> 20),
        )
    }

    pub fn w(self) -> i32 {
        (self.0 as i32) >> 30
    }

    pub fn with_w(self, w: i32) -> Self {
        let w = (w.clamp(-2, 1) as u32) & 0x3;
        Self((self.0 & 0x3fff_ffff) | (w << 30))
    }
}

/// Normal stored as four signed 16-bit components.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ShortNormal(pub [i16; 4]);

impl ShortNormal {
    pub fn new(n: Vec3, w: i16) -> Self {
        let c = |x: f32| (x.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        Self([c(n.x), c(n.y), c(n.z), w])
    }

    pub fn normal(self) -> Vec3 {
        let d = |x: i16| x as f32 / i16::MAX as f32;
        Vec3::new(d(self.0[0]), d(self.0[1]), d(self.0[2]))
    }

    pub fn w(self) -> i16 {
        self.0[3]
    }
}
