use crate::error::SimulationError;
use crate::gpu::{FieldTexture, InputView, TextureSpec};

/// One render target of a [`Slab`].
pub type Surface = FieldTexture;

/// Ping-pong pair of surfaces.
///
/// Passes write into `ping` and read from `pong`; [`Slab::swap`] runs after
/// every pass so `pong` always holds the most recently computed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slab<S = Surface> {
    ping: S,
    pong: S,
}

impl<S> Slab<S> {
    pub fn from_parts(ping: S, pong: S) -> Self {
        Self { ping, pong }
    }

    /// Exchanges roles. No GPU work is issued.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.ping, &mut self.pong);
    }

    /// Surface holding the current field.
    pub fn current(&self) -> &S {
        &self.pong
    }

    /// Scratch surface the next pass writes.
    pub fn scratch(&self) -> &S {
        &self.ping
    }
}

impl Slab<Surface> {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        spec: &TextureSpec,
    ) -> Self {
        Self::from_parts(
            Surface::new(device, &format!("{label} ping"), width, height, spec),
            Surface::new(device, &format!("{label} pong"), width, height, spec),
        )
    }

    pub fn write_target(&self) -> &wgpu::TextureView {
        self.ping.view()
    }

    pub(crate) fn read_input(&self) -> InputView<'_> {
        self.pong.input()
    }

    pub fn width(&self) -> u32 {
        self.pong.width()
    }

    pub fn height(&self) -> u32 {
        self.pong.height()
    }

    /// Writes `texels` into both halves so neither holds stale data.
    pub fn fill(&self, queue: &wgpu::Queue, texels: &[[f32; 4]]) -> Result<(), SimulationError> {
        self.ping.upload(queue, texels)?;
        self.pong.upload(queue, texels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_twice_restores_roles() {
        let original = Slab::from_parts("a", "b");
        let mut slab = original.clone();
        slab.swap();
        assert_eq!(*slab.current(), "a");
        assert_eq!(*slab.scratch(), "b");
        slab.swap();
        assert_eq!(slab, original);
    }

    #[test]
    fn current_is_last_written() {
        let mut slab = Slab::from_parts(1, 0);
        // A pass writes into scratch, then swaps.
        slab.swap();
        assert_eq!(*slab.current(), 1);
    }
}
