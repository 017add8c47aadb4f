//! UV area distortion per loop

use crate::cache::{BufferSlot, BufferType, VboType};
use crate::core::Result;
use crate::core::types::Vec3;
use crate::extract::extractor::{ExtractContext, MeshExtract};
use crate::extract::render_data::MeshRenderData;
use crate::extract::scratch::{SlotRuns, TaskMerge};
use crate::extract::types::IterDomain;
use crate::gpu::{CompType, VertFormat};
use crate::mesh::normals::polygon_area;
use crate::mesh::{BMesh, BmFace, Mesh, MeshPoly};
use super::{alloc_vbo, vbo_mut};

/// Summed 3D and UV areas of every face seen by a task.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AreaTotals {
    pub area: f32,
    pub uv_area: f32,
}

impl TaskMerge for AreaTotals {
    fn merge(&mut self, other: Self) {
        self.area += other.area;
        self.uv_area += other.uv_area;
    }
}

/// Signed ratio of the smaller to the larger area; negative when the UV
/// area is the larger one, zero for degenerate faces.
pub fn area_ratio(area: f32, uv_area: f32) -> f32 {
    if area >= f32::EPSILON && uv_area >= f32::EPSILON {
        if area > uv_area { uv_area / area } else { -(area / uv_area) }
    } else {
        0.0
    }
}

/// Normalize a face ratio by the mesh-wide ratio; result in `[0, 1]`.
pub fn area_ratio_to_stretch(ratio: f32, tot_ratio: f32, inv_tot_ratio: f32) -> f32 {
    let ratio = ratio * if ratio > 0.0 { tot_ratio } else { -inv_tot_ratio };
    if ratio > 1.0 { 1.0 / ratio } else { ratio }
}

pub struct StretchAreaExtract;

pub static STRETCH_AREA: StretchAreaExtract = StretchAreaExtract;

type Task = (SlotRuns<f32>, AreaTotals);

impl StretchAreaExtract {
    fn poly(&self, mr: &MeshRenderData, p: usize, task: &mut Task) {
        let loops = mr.poly_loops(p);
        let area = polygon_area(loops.clone().map(|l| mr.vert_co(mr.loop_vert(l) as usize)));
        let uv_area = match mr.uv_layers().get(mr.active_uv()) {
            Some(layer) => polygon_area(loops.map(|l| layer.uvs[l].extend(0.0))),
            None => 0.0,
        };
        task.0.set(p, area_ratio(area, uv_area));
        task.1.area += area;
        task.1.uv_area += uv_area;
    }
}

impl MeshExtract for StretchAreaExtract {
    type Data = ();
    type TaskData = Task;

    fn name(&self) -> &'static str {
        "stretch_area"
    }

    fn buffer(&self) -> BufferType {
        BufferType::Vbo(VboType::StretchArea)
    }

    fn iter_mesh(&self) -> IterDomain {
        IterDomain::POLY
    }

    fn use_threading(&self) -> bool {
        true
    }

    fn init(&self, mr: &MeshRenderData, ctx: &ExtractContext, slot: &mut BufferSlot) -> Result<()> {
        let format = VertFormat::new().attr("ratio", CompType::F32, 1);
        alloc_vbo(slot, "stretch_area", format, mr.loop_len, ctx)
    }

    fn task_data(&self, _mr: &MeshRenderData, _data: &()) -> Task {
        (SlotRuns::new(), AreaTotals::default())
    }

    fn iter_poly_mesh(&self, mr: &MeshRenderData, _mesh: &Mesh, _poly: &MeshPoly, index: usize, _data: &(), task: &mut Task) {
        self.poly(mr, index, task);
    }

    fn iter_poly_bm(&self, mr: &MeshRenderData, _bm: &BMesh, _face: &BmFace, index: usize, _data: &(), task: &mut Task) {
        self.poly(mr, index, task);
    }

    fn finish(&self, mr: &MeshRenderData, _ctx: &ExtractContext, slot: &mut BufferSlot, _data: (), task: Task) -> Result<()> {
        let (ratios, totals) = task;
        let mut poly_ratio = vec![0.0f32; mr.poly_len];
        ratios.scatter_into(&mut poly_ratio);

        let tot_ratio = if totals.area >= f32::EPSILON && totals.uv_area >= f32::EPSILON {
            totals.area / totals.uv_area
        } else {
            1.0
        };
        let vbo = vbo_mut(slot, "stretch_area")?;
        let out = vbo.data_mut::<f32>()?;
        for (p, &ratio) in poly_ratio.iter().enumerate() {
            let stretch = area_ratio_to_stretch(ratio, tot_ratio, 1.0 / tot_ratio);
            for l in mr.poly_loops(p) {
                out[l] = stretch;
            }
        }
        vbo.upload();
        log::trace!("stretch_area: area {:.3}, uv area {:.3}", totals.area, totals.uv_area);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::extract::extractors::test_util;
    use crate::mesh::{MeshData, primitives};

    #[test]
    fn test_area_ratio_sign() {
        assert_eq!(area_ratio(2.0, 1.0), 0.5);
        assert_eq!(area_ratio(1.0, 2.0), -0.5);
        assert_eq!(area_ratio(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_uniform_mapping_has_no_stretch() {
        let data = MeshData::new(primitives::grid(2, 2));
        let slot = test_util::extract_simple(&STRETCH_AREA, &data);
        let out = slot.as_vert().unwrap().data::<f32>().unwrap();
        assert_eq!(out.len(), 16);
        for &s in out {
            assert!((s - 1.0).abs() < 1e-4, "stretch {}", s);
        }
    }

    #[test]
    fn test_shrunk_face_is_stretched() {
        let mut mesh = primitives::grid(2, 1);
        // second face mapped to a quarter of its share
        let uvs: Vec<Vec2> = mesh.uv_layers[0]
            .uvs
            .iter()
            .enumerate()
            .map(|(l, &uv)| if l >= 4 { Vec2::new(0.5, 0.0) + (uv - Vec2::new(0.5, 0.0)) * 0.5 } else { uv })
            .collect();
        mesh.uv_layers[0].uvs = uvs;
        let data = MeshData::new(mesh);
        let slot = test_util::extract_simple(&STRETCH_AREA, &data);
        let out = slot.as_vert().unwrap().data::<f32>().unwrap();
        assert!(out[4] < out[0]);
        assert!(out[4] > 0.0 && out[4] <= 1.0);
    }

    #[test]
    fn test_missing_uvs_is_zero() {
        let data = MeshData::new(primitives::cube());
        let slot = test_util::extract_simple(&STRETCH_AREA, &data);
        let out = slot.as_vert().unwrap().data::<f32>().unwrap();
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
