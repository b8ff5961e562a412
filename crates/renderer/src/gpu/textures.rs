use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::loader::DecodedImage;
use crate::types::TEXTURE_SLOTS;

/// Transparent black shown until a slot's image arrives.
const PLACEHOLDER_TEXEL: [u8; 4] = [0, 0, 0, 0];

/// `uTexture` never receives an image; it stays on a placeholder after the
/// loadable slots.
const UNASSIGNED_SLOT: usize = TEXTURE_SLOTS;
const BOUND_SLOTS: usize = TEXTURE_SLOTS + 1;

struct SlotTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
    loaded: bool,
}

/// GPU side of `uTexture1-3` plus the unassigned `uTexture`: one
/// texture/sampler pair per slot at set 1.
pub(crate) struct SlotTextures {
    slots: Vec<SlotTexture>,
    sampler: wgpu::Sampler,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl SlotTextures {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let slots: Vec<SlotTexture> = (0..BOUND_SLOTS)
            .map(|slot| {
                let label = if slot == UNASSIGNED_SLOT {
                    "unassigned texture".to_string()
                } else {
                    format!("placeholder texture #{}", slot + 1)
                };
                let texture = upload(
                    device,
                    queue,
                    &label,
                    1,
                    1,
                    &PLACEHOLDER_TEXEL,
                );
                SlotTexture {
                    view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                    _texture: texture,
                    size: (1, 1),
                    loaded: false,
                }
            })
            .collect();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("slot texture sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("slot texture layout"),
            entries: &layout_entries(),
        });
        let bind_group = create_bind_group(device, &layout, &slots, &sampler);

        Self {
            slots,
            sampler,
            layout,
            bind_group,
        }
    }

    pub(crate) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub(crate) fn is_loaded(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|entry| entry.loaded)
    }

    pub(crate) fn size(&self, slot: usize) -> Option<(u32, u32)> {
        self.slots.get(slot).map(|entry| entry.size)
    }

    /// Replaces the placeholder (or a previous image) in `slot`.
    pub(crate) fn install(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: usize,
        image: &DecodedImage,
        max_dimension: u32,
    ) -> anyhow::Result<()> {
        if slot >= TEXTURE_SLOTS {
            anyhow::bail!("texture slot {slot} exceeds supported slot count ({TEXTURE_SLOTS})");
        }
        if image.width > max_dimension || image.height > max_dimension {
            anyhow::bail!(
                "texture is {}x{}, GPU limit is {max_dimension}",
                image.width,
                image.height
            );
        }

        let texture = upload(
            device,
            queue,
            &format!("texture #{}", slot + 1),
            image.width,
            image.height,
            &image.rgba,
        );
        self.slots[slot] = SlotTexture {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
            size: (image.width, image.height),
            loaded: true,
        };
        self.bind_group = create_bind_group(device, &self.layout, &self.slots, &self.sampler);
        Ok(())
    }
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        data,
    )
}

/// Texture at `2 * slot`, sampler at `2 * slot + 1`.
fn layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(BOUND_SLOTS * 2);
    for slot in 0..BOUND_SLOTS as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot * 2,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot * 2 + 1,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: &[SlotTexture],
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let mut entries = Vec::with_capacity(slots.len() * 2);
    for (index, slot) in slots.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2,
            resource: wgpu::BindingResource::TextureView(&slot.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2 + 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("slot texture bind group"),
        layout,
        entries: &entries,
    })
}
