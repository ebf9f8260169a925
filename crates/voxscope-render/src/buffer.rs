//! GPU buffer management.

use wgpu::util::DeviceExt;

/// Creates a vertex buffer from data.
pub fn create_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Writes `data` into `buffer`, growing it first when it is too small.
///
/// Returns true if the buffer was recreated, so callers can rebuild bind
/// groups that reference it.
pub fn write_or_grow<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &mut wgpu::Buffer,
    data: &[T],
    label: Option<&str>,
) -> bool {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    if bytes.is_empty() {
        return false;
    }
    if (bytes.len() as u64) <= buffer.size() {
        queue.write_buffer(buffer, 0, bytes);
        return false;
    }
    let usage = buffer.usage();
    buffer.destroy();
    *buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytes,
        usage,
    });
    true
}
