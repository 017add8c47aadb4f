//! UV coordinates per loop
//!
//! Everything is written during `init`; there are no element callbacks.

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::gpu::{CompType, VertFormat};
use crate::mesh::MAX_UV_LAYERS;
use super::{alloc_vbo, vbo_mut};

const UV_ATTR_NAMES: [&str; MAX_UV_LAYERS] = ["u0", "u1", "u2", "u3", "u4", "u5", "u6", "u7"];

pub struct UvExtract;

pub static UV: UvExtract = UvExtract;

/// Layers written, in attribute order.
///
/// Layers requested through the custom-data mask that exist on the mesh,
/// or the active layer when none were requested.
pub fn uv_layers_used(mr: &MeshRenderData) -> Vec<usize> {
    let available = mr.uv_layers().len();
    let used: Vec<usize> = mr.cd_used.uv_layers().filter(|&i| i < available).collect();
    if !used.is_empty() {
        return used;
    }
    if mr.active_uv() < available { vec![mr.active_uv()] } else { Vec::new() }
}

impl MeshExtract for UvExtract {
    type Data = ();
    type TaskData = ();

    fn name(&self) -> &'static str {
        "uv"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::Uv)
    }

    fn use_threading(&self) -> bool {
        false
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        let layers = uv_layers_used(mr);
        let mut format = VertFormat::new();
        for (attr, _) in layers.iter().enumerate() {
            format = format.attr(UV_ATTR_NAMES[attr], CompType::F32, 2);
        }
        if layers.is_empty() {
            // Keep the vertex layout valid for meshes without UVs
            format = format.attr("dummy", CompType::F32, 1);
        }
        alloc_vbo(slot, "uv", format, mr.loop_len, ctx)?;

        if layers.is_empty() {
            return Ok(());
        }
        let all = mr.uv_layers();
        let stride = layers.len() * 2;
        let data = vbo_mut(slot, "uv")?.components_mut::<f32>()?;
        for (attr, &layer) in layers.iter().enumerate() {
            for (l, uv) in all[layer].uvs.iter().take(mr.loop_len).enumerate() {
                let o = l * stride + attr * 2;
                data[o] = uv.x;
                data[o + 1] = uv.y;
            }
        }
        Ok(())
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) {}

    fn finish(&self, _mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), _task: ()) -> Result<()> {
        vbo_mut(slot, "uv")?.upload();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::core::types::Vec2;
    use crate::extract::extractors::test_util;
    use crate::extract::runner::RunMode;
    use crate::mesh::{CustomDataMask, MeshData, primitives};

    #[test]
    fn test_active_layer_by_default() {
        let data = MeshData::new(primitives::grid(2, 1));
        let slot = test_util::extract_simple(&UV, &data);
        let vbo = slot.as_vert().unwrap();
        assert_eq!(vbo.len(), 8);
        assert_eq!(vbo.format().stride(), 8);
        let uvs = vbo.data::<[f32; 2]>().unwrap();
        assert_eq!(uvs[2], [0.5, 1.0]);
    }

    #[test]
    fn test_requested_layers_interleaved() {
        let mut mesh = primitives::grid(1, 1);
        mesh.add_uv_layer("second", vec![Vec2::splat(0.25); 4]).unwrap();
        let data = MeshData::new(mesh);
        let flags = RunFlags::object_mode();
        let mut mr = test_util::render_data(&data, &flags, &[&UV]);
        mr.cd_used = CustomDataMask::uv(0) | CustomDataMask::uv(1) | CustomDataMask::uv(5);
        assert_eq!(uv_layers_used(&mr), vec![0, 1]);

        let slot = test_util::extract(&UV, &mr, RunMode::single_threaded());
        let vbo = slot.as_vert().unwrap();
        assert_eq!(vbo.format().attr_len(), 2);
        let uvs = vbo.data::<[f32; 4]>().unwrap();
        assert_eq!(uvs[1], [1.0, 0.0, 0.25, 0.25]);
    }

    #[test]
    fn test_no_layers_gives_dummy() {
        let data = MeshData::new(primitives::cube());
        let slot = test_util::extract_simple(&UV, &data);
        let vbo = slot.as_vert().unwrap();
        assert_eq!(vbo.format().offset_of("dummy"), Some(0));
        assert_eq!(vbo.len(), 24);
    }
}
