//! Frame surfaces and the output bitstream buffer
//!
//! The surface pool is allocated once, sized to the device-reported
//! suggested count, and recycled for the whole session. A surface is owned
//! by the caller until submitted, then by the device until the completion
//! wait for the unit that consumed it — the device flips the lock flag on
//! submit and clears it when it no longer needs the surface as input or
//! reference.

use tracing::debug;

use crate::params::FrameGeometry;

/// Index of a surface within the session pool
pub type SurfaceId = usize;

/// One reusable raw-frame slot
#[derive(Debug)]
pub struct FrameSurface {
    /// Geometry this surface was allocated for
    pub info: FrameGeometry,
    /// Row pitch in bytes
    pub pitch: u32,
    /// Pixel storage (luma plane followed by interleaved chroma)
    pub data: Vec<u8>,
    locked: bool,
}

impl FrameSurface {
    fn allocate(info: FrameGeometry) -> Self {
        Self {
            info,
            pitch: info.surface_pitch(),
            data: vec![0; info.surface_bytes()],
            locked: false,
        }
    }

    /// Whether the device currently owns this surface
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Fixed pool of frame surfaces
#[derive(Debug)]
pub struct SurfacePool {
    surfaces: Vec<FrameSurface>,
}

impl SurfacePool {
    /// Allocate `count` surfaces for `geometry`
    pub fn allocate(count: u16, geometry: FrameGeometry) -> Self {
        debug!(
            count,
            bytes_each = geometry.surface_bytes(),
            "allocating surface pool"
        );
        Self {
            surfaces: (0..count).map(|_| FrameSurface::allocate(geometry)).collect(),
        }
    }

    /// First surface not owned by the device, if any
    pub fn find_free(&self) -> Option<SurfaceId> {
        self.surfaces.iter().position(|s| !s.locked)
    }

    /// Mark a surface as owned by the device
    pub fn lock(&mut self, id: SurfaceId) {
        self.surfaces[id].locked = true;
    }

    /// Return a surface to the caller
    pub fn unlock(&mut self, id: SurfaceId) {
        self.surfaces[id].locked = false;
    }

    /// Shared access to a surface
    pub fn get(&self, id: SurfaceId) -> &FrameSurface {
        &self.surfaces[id]
    }

    /// Mutable access to a surface (for filling raw frame data)
    pub fn get_mut(&mut self, id: SurfaceId) -> &mut FrameSurface {
        &mut self.surfaces[id]
    }

    /// Pool capacity
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether the pool holds no surfaces
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Number of surfaces currently owned by the device
    pub fn locked_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.locked).count()
    }
}

/// Growable output buffer for encoded units
///
/// Sized initially from the `buffer_size_kb` the device reports after
/// initialization. Capacity invariant: the buffer must be large enough for
/// one whole encoded unit, otherwise the submission is rejected with a
/// capacity condition and the buffer grows before the retry.
#[derive(Debug)]
pub struct BitstreamBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl BitstreamBuffer {
    /// Allocate with a capacity of `size_kb * 1000` bytes
    pub fn with_capacity_kb(size_kb: u32) -> Self {
        let max_len = size_kb as usize * 1000;
        Self {
            buf: Vec::with_capacity(max_len),
            max_len,
        }
    }

    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.max_len
    }

    /// Bytes of the current encoded unit
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer holds no unit
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Grow capacity to at least `required` bytes
    pub fn grow_to(&mut self, required: usize) {
        if required > self.max_len {
            debug!(from = self.max_len, to = required, "growing bitstream buffer");
            self.max_len = required;
            self.buf.reserve(required - self.buf.len());
        }
    }

    /// Append one encoded unit's bytes, respecting the capacity invariant
    pub fn append(&mut self, data: &[u8]) -> Result<(), crate::error::EncodeError> {
        if self.buf.len() + data.len() > self.max_len {
            return Err(crate::error::EncodeError::BitstreamOverflow {
                needed: self.buf.len() + data.len(),
                capacity: self.max_len,
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// The buffered unit's bytes
    pub fn unit(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the buffered unit (after the sink consumed it, or when output
    /// is suppressed)
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
