use crate::types::*;

/// Everything needed to write one note into a slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSprite {
    pub position: [f32; 3],
    pub scale: [f32; 2],
    pub color: [f32; 3],
    pub texture_id: u32,
}

/// Reference to the write that produced a slot's current contents.
///
/// Resolves only while that write is still in the slot: a clear or a
/// wraparound overwrite invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub index: usize,
    serial: u64,
}

/// Fixed-capacity ring buffer of note instances, stored as parallel arrays
/// so each field uploads as one contiguous instance buffer.
#[derive(Debug, Clone)]
pub struct NoteInstanceStore {
    offsets: Vec<[f32; 3]>,
    scales: Vec<[f32; 2]>,
    tex_coord_offsets: Vec<[f32; 2]>,
    tex_coord_scales: Vec<[f32; 2]>,
    colors: Vec<[f32; 3]>,
    texture_ids: Vec<u32>,
    /// Serial of the write occupying each slot; 0 = cleared / never written.
    written: Vec<u64>,
    next_index: usize,
    next_serial: u64,
}

impl Default for NoteInstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteInstanceStore {
    pub fn new() -> Self {
        Self {
            offsets: vec![SENTINEL_OFFSET; MAX_NOTES],
            scales: vec![[0.0; 2]; MAX_NOTES],
            tex_coord_offsets: vec![[0.0; 2]; MAX_NOTES],
            tex_coord_scales: vec![[1.0; 2]; MAX_NOTES],
            colors: vec![[0.0; 3]; MAX_NOTES],
            texture_ids: vec![0; MAX_NOTES],
            written: vec![0; MAX_NOTES],
            next_index: 0,
            next_serial: 1,
        }
    }

    /// Write a note into the next slot, overwriting the oldest when full.
    pub fn spawn(&mut self, sprite: NoteSprite) -> SlotRef {
        let index = self.next_index;
        let serial = self.next_serial;

        self.offsets[index] = sprite.position;
        self.scales[index] = sprite.scale;
        self.tex_coord_offsets[index] = [0.0, 0.0];
        self.tex_coord_scales[index] = [1.0, 1.0];
        self.colors[index] = sprite.color;
        self.texture_ids[index] = sprite.texture_id;
        self.written[index] = serial;

        self.next_index = (index + 1) % MAX_NOTES;
        self.next_serial += 1;

        SlotRef { index, serial }
    }

    /// Scroll every slot, live or not, by one frame's velocity.
    pub fn advance(&mut self, velocity: [f32; 2]) {
        for offset in &mut self.offsets {
            offset[0] += velocity[0];
            offset[1] += velocity[1];
        }
    }

    /// Park every slot off-screen and invalidate all outstanding [`SlotRef`]s.
    pub fn clear_notes(&mut self) {
        self.offsets.fill(SENTINEL_OFFSET);
        self.written.fill(0);
    }

    /// Slot index for a reference, if the referenced write is still there.
    pub fn resolve(&self, slot: SlotRef) -> Option<usize> {
        (slot.index < MAX_NOTES && self.written[slot.index] == slot.serial).then_some(slot.index)
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Number of slots holding a note written since the last clear.
    pub fn live_count(&self) -> usize {
        self.written.iter().filter(|&&s| s != 0).count()
    }

    pub fn read_for_upload(&self) -> InstanceView<'_> {
        InstanceView {
            offsets: &self.offsets,
            scales: &self.scales,
            tex_coord_offsets: &self.tex_coord_offsets,
            tex_coord_scales: &self.tex_coord_scales,
            colors: &self.colors,
            texture_ids: &self.texture_ids,
        }
    }

    pub fn offset(&self, index: usize) -> [f32; 3] {
        self.offsets[index]
    }

    pub fn scale(&self, index: usize) -> [f32; 2] {
        self.scales[index]
    }

    pub fn tex_coord_window(&self, index: usize) -> ([f32; 2], [f32; 2]) {
        (self.tex_coord_offsets[index], self.tex_coord_scales[index])
    }

    pub fn color(&self, index: usize) -> [f32; 3] {
        self.colors[index]
    }

    pub fn texture_id(&self, index: usize) -> u32 {
        self.texture_ids[index]
    }

    /// Mutable geometry of one slot, for in-place adjustment.
    pub(crate) fn slot_mut(&mut self, index: usize) -> SlotGeometry<'_> {
        SlotGeometry {
            offset: &mut self.offsets[index],
            scale: &mut self.scales[index],
            tex_coord_offset: &mut self.tex_coord_offsets[index],
            tex_coord_scale: &mut self.tex_coord_scales[index],
        }
    }
}

pub(crate) struct SlotGeometry<'a> {
    pub offset: &'a mut [f32; 3],
    pub scale: &'a mut [f32; 2],
    pub tex_coord_offset: &'a mut [f32; 2],
    pub tex_coord_scale: &'a mut [f32; 2],
}

// ─── Upload views ───────────────────────────────────────────────────────────

/// Read-only view of the instance arrays. Every slice has `MAX_NOTES`
/// entries and index `i` in each describes the same slot.
#[derive(Debug, Clone, Copy)]
pub struct InstanceView<'a> {
    pub offsets: &'a [[f32; 3]],
    pub scales: &'a [[f32; 2]],
    pub tex_coord_offsets: &'a [[f32; 2]],
    pub tex_coord_scales: &'a [[f32; 2]],
    pub colors: &'a [[f32; 3]],
    pub texture_ids: &'a [u32],
}

impl InstanceView<'_> {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// True when slot `i` lies inside clip space (sprite extents included).
    pub fn is_visible(&self, i: usize) -> bool {
        let o = self.offsets[i];
        let s = self.scales[i];
        (o[0].abs() - s[0] * 0.5) <= 1.0 && (o[1].abs() - s[1] * 0.5) <= 1.0
    }
}

/// Owned copy of the instance arrays, reused frame to frame so the render
/// thread can drop the engine lock before uploading.
#[derive(Debug, Clone, Default)]
pub struct InstanceSnapshot {
    pub offsets: Vec<[f32; 3]>,
    pub scales: Vec<[f32; 2]>,
    pub tex_coord_offsets: Vec<[f32; 2]>,
    pub tex_coord_scales: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    pub texture_ids: Vec<u32>,
}

impl InstanceSnapshot {
    pub fn copy_from(&mut self, view: &InstanceView<'_>) {
        copy_into(&mut self.offsets, view.offsets);
        copy_into(&mut self.scales, view.scales);
        copy_into(&mut self.tex_coord_offsets, view.tex_coord_offsets);
        copy_into(&mut self.tex_coord_scales, view.tex_coord_scales);
        copy_into(&mut self.colors, view.colors);
        copy_into(&mut self.texture_ids, view.texture_ids);
    }

    pub fn view(&self) -> InstanceView<'_> {
        InstanceView {
            offsets: &self.offsets,
            scales: &self.scales,
            tex_coord_offsets: &self.tex_coord_offsets,
            tex_coord_scales: &self.tex_coord_scales,
            colors: &self.colors,
            texture_ids: &self.texture_ids,
        }
    }
}

fn copy_into<T: Copy>(dst: &mut Vec<T>, src: &[T]) {
    dst.clear();
    dst.extend_from_slice(src);
}
