//! The single-volume scene driven by the interaction layer and drawn each frame.

use crate::resource::TextureStore;
use crate::shader::ShaderProgram;
use crate::transfer_function::TransferFunction;
use crate::volume::{VoxelVolume, TRANSFER_FUNCTION_SLOT};

/// A volume together with the transfer function that colors it.
#[derive(Debug, Default)]
pub struct Scene {
    pub volume: VoxelVolume,
    pub transfer_function: TransferFunction,
}

impl Scene {
    #[must_use]
    pub fn new(volume: VoxelVolume) -> Self {
        Self {
            volume,
            transfer_function: TransferFunction::new(),
        }
    }

    /// Reloads the volume and forces the lookup texture to be recreated.
    pub fn reload(&mut self, store: &mut dyn TextureStore) -> bool {
        let open = self.volume.reload(store);
        self.transfer_function.invalidate();
        self.transfer_function.upload(store);
        open
    }

    /// Uploads the lookup table if it changed.
    pub fn upload(&mut self, store: &mut dyn TextureStore) {
        self.transfer_function.upload(store);
    }

    /// Binds the lookup texture and draws the volume slices.
    pub fn draw(&self, program: &mut dyn ShaderProgram) {
        self.transfer_function
            .bind(Some(&mut *program), TRANSFER_FUNCTION_SLOT);
        self.volume.draw(Some(program));
    }

    /// Frees every texture owned by the scene.
    pub fn release(&mut self, store: &mut dyn TextureStore) {
        self.volume.close(store);
        self.transfer_function.release(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::HostTextureStore;

    #[test]
    fn test_reload_recreates_lookup_texture() {
        let mut store = HostTextureStore::new();
        let mut scene = Scene::default();
        scene.upload(&mut store);
        let first = scene.transfer_function.texture();
        assert!(first.is_some());

        assert!(!scene.reload(&mut store));
        let second = scene.transfer_function.texture();
        assert_ne!(first, second);
        assert!(!store.contains(first.unwrap_or_default()));
        assert_eq!(store.len(), 1);

        scene.release(&mut store);
        assert!(store.is_empty());
    }
}
