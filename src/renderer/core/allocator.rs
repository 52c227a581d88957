//! Transient Upload Allocator
//!
//! Linear sub-allocation of per-frame constants from pooled upload pages.
//!
//! # Lifetime
//!
//! ```text
//! frame F      allocate() ──► active pages
//! frame F+1    begin_frame() ──► pages of F retired (tagged F)
//!   ...
//! frame F+N    begin_frame() ──► pages of F free again   (N = frames in flight)
//! ```
//!
//! A page is never handed out while the GPU may still read a frame that used
//! it, without any explicit fence: the keep-alive window is the only
//! synchronization. Free pages that stay unused are released by
//! [`TransientAllocator::trim`].

use std::collections::VecDeque;

use crate::errors::Result;

use super::device::RenderDevice;
use super::resources::{BufferDesc, BufferId, BufferSlice};

/// Default size of one upload page.
pub const DEFAULT_PAGE_SIZE: u64 = 64 * 1024;

struct UploadPage {
    buffer: BufferId,
    capacity: u64,
    cursor: u64,
    /// Frames spent in the free list without being reused.
    idle_frames: u32,
}

impl UploadPage {
    fn try_allocate(&mut self, size: u64, alignment: u64) -> Option<u64> {
        let offset = self.cursor.next_multiple_of(alignment);
        if offset + size > self.capacity {
            return None;
        }
        self.cursor = offset + size;
        Some(offset)
    }
}

/// Frame-bounded upload allocator.
pub struct TransientAllocator {
    page_size: u64,
    frames_in_flight: u32,
    frame_index: u64,
    /// Pages written during the current frame.
    active: Vec<UploadPage>,
    /// Pages of earlier frames that the GPU may still read.
    retired: VecDeque<(u64, UploadPage)>,
    free: Vec<UploadPage>,
}

impl TransientAllocator {
    #[must_use]
    pub fn new(frames_in_flight: u32) -> Self {
        Self::with_page_size(frames_in_flight, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(frames_in_flight: u32, page_size: u64) -> Self {
        Self {
            page_size,
            frames_in_flight: frames_in_flight.max(1),
            frame_index: 0,
            active: Vec::new(),
            retired: VecDeque::new(),
            free: Vec::new(),
        }
    }

    /// Starts frame `frame_index`: retires the previous frame's pages and
    /// recycles those whose keep-alive window has passed.
    pub fn begin_frame(&mut self, frame_index: u64) {
        let previous = self.frame_index;
        for page in self.active.drain(..) {
            self.retired.push_back((previous, page));
        }
        self.frame_index = frame_index;

        let window = u64::from(self.frames_in_flight);
        while let Some((used_in, _)) = self.retired.front() {
            if used_in + window > frame_index {
                break;
            }
            if let Some((_, mut page)) = self.retired.pop_front() {
                page.cursor = 0;
                page.idle_frames = 0;
                self.free.push(page);
            }
        }

        for page in &mut self.free {
            page.idle_frames += 1;
        }
    }

    /// Copies `data` into transient memory and returns its location.
    pub fn allocate(&mut self, device: &mut dyn RenderDevice, data: &[u8]) -> Result<BufferSlice> {
        let alignment = device.binding_alignment().max(1);
        let size = (data.len() as u64).max(16).next_multiple_of(16);

        let slot = self
            .active
            .iter_mut()
            .enumerate()
            .find_map(|(i, page)| page.try_allocate(size, alignment).map(|offset| (i, offset)));

        let (page_index, offset) = match slot {
            Some(found) => found,
            None => {
                let mut page = self.acquire_page(device, size)?;
                let offset = page.try_allocate(size, alignment).unwrap_or(0);
                self.active.push(page);
                (self.active.len() - 1, offset)
            }
        };

        let buffer = self.active[page_index].buffer;
        device.write_buffer(buffer, offset, data);
        Ok(BufferSlice { buffer, offset, size })
    }

    fn acquire_page(&mut self, device: &mut dyn RenderDevice, min_size: u64) -> Result<UploadPage> {
        if let Some(index) = self.free.iter().position(|p| p.capacity >= min_size) {
            let mut page = self.free.swap_remove(index);
            page.idle_frames = 0;
            return Ok(page);
        }

        let capacity = min_size.max(self.page_size);
        let buffer = device.create_buffer(&BufferDesc {
            label: "Transient Upload Page".into(),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        })?;
        log::debug!("TransientAllocator: new upload page ({capacity} bytes)");
        Ok(UploadPage {
            buffer,
            capacity,
            cursor: 0,
            idle_frames: 0,
        })
    }

    /// Releases free pages that have been idle for more than `max_idle_frames`.
    pub fn trim(&mut self, device: &mut dyn RenderDevice, max_idle_frames: u32) {
        self.free.retain(|page| {
            let keep = page.idle_frames <= max_idle_frames;
            if !keep {
                device.destroy_buffer(page.buffer);
            }
            keep
        });
    }

    /// Destroys every page, including those still in flight.
    pub fn release_all(&mut self, device: &mut dyn RenderDevice) {
        for page in self.active.drain(..) {
            device.destroy_buffer(page.buffer);
        }
        for (_, page) in self.retired.drain(..) {
            device.destroy_buffer(page.buffer);
        }
        for page in self.free.drain(..) {
            device.destroy_buffer(page.buffer);
        }
    }

    /// Total number of pages owned (active, in flight and free).
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.active.len() + self.retired.len() + self.free.len()
    }

    #[inline]
    #[must_use]
    pub fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }
}
